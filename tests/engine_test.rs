//! End-to-end tests for the enhancement controller
//!
//! Every scenario drives the full state machine through a scripted channel.
//! A drained script behaves like a vanished window, so the open-ended
//! gold-adaptive loops terminate with a channel error once their script
//! runs out; the assertions then inspect the session the run left behind.

use forgeloop::channel::scripted::ScriptedChannel;
use forgeloop::channel::{ChannelError, CommandKind};
use forgeloop::config::EngineConfig;
use forgeloop::controller::{Controller, Mode, RunEnd};
use forgeloop::item::ItemCategory;
use forgeloop::stats::{StatsAggregator, StatsStore};
use tokio::sync::broadcast;

const KEEPER: &str = "⚔️새로운 검 획득: [+0] 광선검";

fn controller(
    channel: ScriptedChannel,
    mode: Mode,
) -> (Controller<ScriptedChannel>, broadcast::Sender<()>) {
    let stats = StatsAggregator::new(StatsStore::open_in_memory().unwrap());
    let (tx, rx) = broadcast::channel(1);
    let controller = Controller::new(channel, stats, mode, &EngineConfig::default(), rx);
    (controller, tx)
}

fn success(before: u32) -> String {
    format!("〖✨강화 성공✨ +{} → +{}〗", before, before + 1)
}

#[tokio::test(start_paused = true)]
async fn gold_adaptive_sells_at_target_and_resets() {
    let mut channel = ScriptedChannel::new();
    // Initial sync: the held item is a keeper, and the buffer shows gold.
    channel.push_response(&format!("{KEEPER}\n현재 보유 골드: 150,000G"));
    // Nine straight successes, +0 through +9.
    for level in 0..9 {
        channel.push_response(&success(level));
    }
    // The target sale, then a keeper so the sell sub-loop stops.
    channel.push_response("판매 완료! 현재 보유 골드: 200,000G");
    channel.push_response(KEEPER);

    let (mut controller, _tx) = controller(channel, Mode::GoldAdaptive);
    let err = controller.run().await.unwrap_err();
    assert!(err.downcast_ref::<ChannelError>().is_some());

    let session = controller.session();
    // 150,000G puts the target at +9; reaching it sold and reset the level.
    assert_eq!(session.target_level, 9);
    assert_eq!(session.current_level, 0);
    assert_eq!(session.cycles_completed, 1);
    assert_eq!(session.attempts, 9);
    assert_eq!(session.successes, 9);
    assert_eq!(session.current_gold, Some(200_000));
}

#[tokio::test(start_paused = true)]
async fn gold_adaptive_records_each_pre_enhance_level() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.db");

    let mut channel = ScriptedChannel::new();
    channel.push_response(KEEPER);
    for level in 0..3 {
        channel.push_response(&success(level));
    }
    channel.push_response("〖💦강화 유지💦〗");
    channel.push_response("〖💦강화 유지💦〗");

    let stats = StatsAggregator::new(StatsStore::open(&path).unwrap());
    let (_tx, rx) = broadcast::channel(1);
    let mut controller = Controller::new(
        channel,
        stats,
        Mode::GoldAdaptive,
        &EngineConfig::default(),
        rx,
    );
    controller.run().await.unwrap_err();
    controller.close().unwrap();

    let store = StatsStore::open(&path).unwrap();
    for level in 0..3 {
        let row = store.stats(level).unwrap().unwrap();
        assert_eq!(row.successes, 1, "success at +{level}");
    }
    // Both maintains landed at the level the item was holding.
    let row = store.stats(3).unwrap().unwrap();
    assert_eq!(row.stays, 2);
    assert_eq!(row.tries, row.successes + row.stays + row.breaks);
}

#[tokio::test(start_paused = true)]
async fn destroy_with_special_replacement_keeps_the_item() {
    let mut channel = ScriptedChannel::new();
    channel.push_response(KEEPER);
    channel.push_response(&success(0));
    channel.push_response("〖💥강화 파괴💥〗 『[+1] 낡은 검』 → 『[+0] 광선검』");

    let (mut controller, _tx) = controller(channel, Mode::GoldAdaptive);
    controller.run().await.unwrap_err();

    let session = controller.session();
    assert_eq!(session.destroys, 1);
    assert_eq!(session.current_level, 0);
    assert_eq!(session.category, ItemCategory::Special);
    // No sell was issued for the keeper replacement.
    assert!(!controller
        .channel()
        .sent()
        .contains(&CommandKind::Sell));
}

#[tokio::test(start_paused = true)]
async fn destroy_with_sellable_replacement_sells_it_off() {
    let mut channel = ScriptedChannel::new();
    channel.push_response(KEEPER);
    channel.push_response("〖💥강화 파괴💥〗 『[+0] 광선검』 → 『[+0] 낡은 검』");
    // Sub-loop: the new drop announces as sellable, gets sold, then a keeper.
    channel.push_response("⚔️새로운 검 획득: [+0] 낡은 검");
    channel.push_response(&format!("{KEEPER}\n현재 보유 골드: 25,000G"));

    let (mut controller, _tx) = controller(channel, Mode::GoldAdaptive);
    controller.run().await.unwrap_err();

    let session = controller.session();
    assert_eq!(session.current_gold, Some(25_000));
    assert_eq!(session.target_level, 7);
    assert!(controller.channel().sent().contains(&CommandKind::Sell));
}

#[tokio::test(start_paused = true)]
async fn insufficient_gold_sells_and_restarts() {
    let mut channel = ScriptedChannel::new();
    channel.push_response(KEEPER);
    channel.push_response("이런, 골드가 부족해 보이는군!");
    channel.push_response("판매 완료! 현재 보유 골드: 12,000G");
    channel.push_response(KEEPER);

    let (mut controller, _tx) = controller(channel, Mode::GoldAdaptive);
    controller.run().await.unwrap_err();

    let session = controller.session();
    assert_eq!(session.current_level, 0);
    assert_eq!(session.current_gold, Some(12_000));
    // 12,000G sits below the first threshold.
    assert_eq!(session.target_level, 6);
    assert_eq!(
        controller.channel().sent(),
        &[CommandKind::Enhance, CommandKind::Sell, CommandKind::Enhance]
    );
}

#[tokio::test(start_paused = true)]
async fn zero_tier_refusal_enhances_once_then_resells() {
    let mut channel = ScriptedChannel::new();
    // The initial sub-loop runs into the +0 refusal straight away. The
    // refusal text itself carries no announcement, so the sell keeps going.
    channel.push_response("0강검은 가치가 없어서 판매할 수 없다네");
    channel.push_response(&format!("{}\n남은 골드: 30,000G", success(0)));
    channel.push_response(KEEPER);

    let (mut controller, _tx) = controller(channel, Mode::GoldAdaptive);
    controller.run().await.unwrap_err();

    let session = controller.session();
    assert_eq!(session.current_gold, Some(30_000));
    // Detour: one enhance, then the retried sell, then the next cycle.
    assert_eq!(
        &controller.channel().sent()[..2],
        &[CommandKind::Enhance, CommandKind::Sell]
    );
}

#[tokio::test(start_paused = true)]
async fn sale_notice_enhances_once_then_resells() {
    let mut channel = ScriptedChannel::new();
    // The sale notice means the replacement is a fresh +0 item, so the
    // sub-loop must enhance once before the next sale can go through.
    channel.push_response("〖검 판매〗");
    channel.push_response(&format!("{}\n남은 골드: 45,000G", success(0)));
    channel.push_response(KEEPER);

    let (mut controller, _tx) = controller(channel, Mode::GoldAdaptive);
    controller.run().await.unwrap_err();

    let session = controller.session();
    // Gold from the detour's enhance reply feeds the target.
    assert_eq!(session.current_gold, Some(45_000));
    assert_eq!(session.target_level, 7);
    assert_eq!(
        &controller.channel().sent()[..2],
        &[CommandKind::Enhance, CommandKind::Sell]
    );
}

#[tokio::test(start_paused = true)]
async fn send_failure_retries_without_counting_an_attempt() {
    let mut channel = ScriptedChannel::new();
    channel.push_response(KEEPER);
    channel.push_response(&success(0));
    channel.fail_next_sends(1);

    let (mut controller, _tx) = controller(channel, Mode::GoldAdaptive);
    controller.run().await.unwrap_err();

    let session = controller.session();
    assert_eq!(session.attempts, 1);
    assert_eq!(session.successes, 1);
}

#[tokio::test(start_paused = true)]
async fn success_level_jump_is_trusted_but_session_still_moves() {
    let mut channel = ScriptedChannel::new();
    channel.push_response(KEEPER);
    channel.push_response("〖✨강화 성공✨ +0 → +5〗");

    let (mut controller, _tx) = controller(channel, Mode::GoldAdaptive);
    controller.run().await.unwrap_err();

    // The reported level wins even when it is not one above the old level.
    assert_eq!(controller.session().current_level, 5);
}

#[tokio::test(start_paused = true)]
async fn upgrade_reaching_cap_ends_the_run() {
    let mut channel = ScriptedChannel::new();
    // Probe: a sellable weapon already at +16.
    channel.push_response("『[+16] 낡은 검』");
    channel.push_response("〖✨강화 성공✨ +16 → +17〗");

    let (mut controller, _tx) = controller(channel, Mode::UpgradeToCap);
    let end = controller.run().await.unwrap();
    assert_eq!(end, RunEnd::CapReached);

    let session = controller.session();
    assert_eq!(session.current_level, 17);
    assert_eq!(session.successes, 1);
    assert_eq!(controller.channel().sent(), &[CommandKind::Enhance]);
}

#[tokio::test(start_paused = true)]
async fn upgrade_special_item_sells_at_thirteen() {
    let mut channel = ScriptedChannel::new();
    // Probe: a beam sword at +12 targets +13, not +17.
    channel.push_response("『[+12] 광선검』");
    channel.push_response("전설의 『[+13] 광선검』 강화에 성공했다!");
    channel.push_response("판매! 현재 보유 골드: 500,000G\n⚔️새로운 검 획득: [+0] 낡은 검");

    let (mut controller, _tx) = controller(channel, Mode::UpgradeToCap);
    controller.run().await.unwrap_err();

    let session = controller.session();
    assert_eq!(session.current_level, 0);
    assert_eq!(session.current_gold, Some(500_000));
    // The replacement announces as a generic weapon, so the cap moves to +17.
    assert_eq!(session.category, ItemCategory::Sellable);
    assert_eq!(session.target_level, 17);
    assert!(controller.channel().sent().contains(&CommandKind::Sell));
}

#[tokio::test(start_paused = true)]
async fn upgrade_destroy_rederives_the_category() {
    let mut channel = ScriptedChannel::new();
    channel.push_response("『[+3] 낡은 검』");
    channel.push_response("〖💥강화 파괴💥〗 『[+3] 낡은 검』 → 『[+0] 광선검』");

    let (mut controller, _tx) = controller(channel, Mode::UpgradeToCap);
    controller.run().await.unwrap_err();

    let session = controller.session();
    assert_eq!(session.category, ItemCategory::Special);
    assert_eq!(session.current_level, 0);
    // No sell sub-loop in upgrade mode, even for a sellable wreck.
    assert_eq!(session.target_level, 13);
}

#[tokio::test(start_paused = true)]
async fn shutdown_between_cycles_ends_cleanly() {
    let mut channel = ScriptedChannel::new();
    channel.push_response(KEEPER);

    let (mut controller, tx) = controller(channel, Mode::GoldAdaptive);
    tx.send(()).unwrap();

    let end = controller.run().await.unwrap();
    assert_eq!(end, RunEnd::Cancelled);
}
