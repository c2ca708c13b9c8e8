//! Enhancement session controller
//!
//! The state machine driving the whole loop: issue an enhance command, wait
//! for the bot, classify the reply, record statistics, then sell or recover
//! depending on the active policy variant. One logical actor owns every
//! piece of state; all waiting is plain sleep-based polling.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::channel::{CommandKind, MessageChannel};
use crate::config::EngineConfig;
use crate::item::{self, ItemCategory};
use crate::outcome::{self, Outcome};
use crate::policy;
use crate::stats::StatsAggregator;

/// Which policy variant drives the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sell at a gold-derived target level and restart, forever.
    GoldAdaptive,
    /// Push the held item to +17 (sellable) or +13 (special); +17 ends the
    /// whole run.
    UpgradeToCap,
}

/// Terminal level for sellable items in upgrade mode; reaching it ends the
/// process.
pub const UPGRADE_CAP: u32 = 17;
/// Special items are sold at this level instead of being pushed to the cap.
pub const SPECIAL_CAP: u32 = 13;

// Messages that interrupt the sell sub-loop. Both mean the sale did not
// happen and one enhancement makes the item sellable again.
const ZERO_TIER_SELL_REFUSAL: &str = "0강검은 가치가 없어서 판매할 수 없다네";
const SWORD_SOLD_NOTICE: &str = "〖검 판매〗";

/// Mutable session state, owned and mutated only by the controller.
#[derive(Debug, Clone)]
pub struct Session {
    /// Enhancement tier of the item in hand.
    pub current_level: u32,
    /// Last observed gold balance; unknown until the bot first reports one.
    pub current_gold: Option<i64>,
    /// Level at which the active policy sells or terminates.
    pub target_level: u32,
    /// Category of the item in hand.
    pub category: ItemCategory,
    pub attempts: u64,
    pub successes: u64,
    pub maintains: u64,
    pub destroys: u64,
    pub cycles_completed: u64,
    pub started_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            current_level: 0,
            current_gold: None,
            target_level: policy::target_level_for_gold(None),
            category: ItemCategory::Sellable,
            attempts: 0,
            successes: 0,
            maintains: 0,
            destroys: 0,
            cycles_completed: 0,
            started_at: Utc::now(),
        }
    }
}

/// Why the run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Upgrade-to-cap reached +17.
    CapReached,
    /// Shutdown signal observed between cycles.
    Cancelled,
}

pub struct Controller<C: MessageChannel> {
    channel: C,
    stats: StatsAggregator,
    mode: Mode,
    result_delay: Duration,
    cycle_pause: Duration,
    session: Session,
    shutdown: broadcast::Receiver<()>,
}

impl<C: MessageChannel> Controller<C> {
    pub fn new(
        channel: C,
        stats: StatsAggregator,
        mode: Mode,
        engine: &EngineConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            channel,
            stats,
            mode,
            result_delay: engine.result_delay(),
            cycle_pause: engine.cycle_pause(),
            session: Session::new(),
            shutdown,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Explicit finalizer: commits the last partial statistics buffer. The
    /// driver runs this exactly once, on every exit path.
    pub fn close(self) -> Result<()> {
        self.stats.close()
    }

    /// Drive the session until the policy terminates it, the channel gives
    /// up on the window, or a shutdown signal arrives between cycles.
    pub async fn run(&mut self) -> Result<RunEnd> {
        match self.mode {
            Mode::GoldAdaptive => self.run_gold_adaptive().await,
            Mode::UpgradeToCap => self.run_upgrade_to_cap().await,
        }
    }

    async fn run_gold_adaptive(&mut self) -> Result<RunEnd> {
        info!("========================================");
        info!("🔥 enhancement session started (gold-adaptive, runs until stopped)");
        info!("========================================");

        // Dump whatever junk items the inventory starts with, then derive
        // the first target from the gold observed along the way.
        self.sell_until_good_item().await?;
        self.session.target_level = policy::target_level_for_gold(self.session.current_gold);
        self.log_gold_and_target();

        loop {
            if self.shutdown_requested() {
                info!("🛑 shutdown requested, ending session");
                return Ok(RunEnd::Cancelled);
            }
            self.cycle_banner();

            if !self.channel.send_command(CommandKind::Enhance).await {
                warn!("  command delivery failed, retrying the cycle");
                sleep(self.cycle_pause).await;
                continue;
            }
            sleep(self.result_delay).await;

            let Some(text) = self.channel.await_response().await? else {
                warn!("  no response text, retrying the cycle");
                continue;
            };
            self.session.attempts += 1;

            self.observe_enhance_gold(&text);

            match outcome::classify(&text) {
                Outcome::Success(new_level) => {
                    self.apply_success(new_level)?;
                    if self.session.current_level >= self.session.target_level {
                        self.sell_and_restart().await?;
                    }
                }
                Outcome::Maintain => self.apply_maintain()?,
                Outcome::Destroy => {
                    self.apply_destroy()?;
                    if item::is_sellable_after_destroy(&text, true) {
                        self.sell_until_good_item().await?;
                    } else {
                        self.session.category = ItemCategory::Special;
                    }
                    self.session.target_level =
                        policy::target_level_for_gold(self.session.current_gold);
                    self.session.current_level = 0;
                }
                Outcome::InsufficientGold => {
                    info!("  💸 out of gold, selling the current item");
                    self.sell_once().await?;
                    self.sell_until_good_item().await?;
                    self.session.target_level =
                        policy::target_level_for_gold(self.session.current_gold);
                    self.session.current_level = 0;
                    info!(
                        "  🔄 restarting with a fresh item (target +{})",
                        self.session.target_level
                    );
                }
                Outcome::Unrecognized => {
                    warn!("  ⚠️ could not classify the response");
                    debug!("  [debug] received text: {}…", preview(&text));
                }
            }

            sleep(self.cycle_pause).await;
        }
    }

    async fn run_upgrade_to_cap(&mut self) -> Result<RunEnd> {
        info!("========================================");
        info!("🔥 upgrade session started");
        info!("   sellable weapons go to +{UPGRADE_CAP}, special items sell at +{SPECIAL_CAP}");
        info!("   reaching +{UPGRADE_CAP} ends the run");
        info!("========================================");

        // Probe the held item's category once before the first attempt.
        match self.channel.read_latest().await? {
            Some(text) => {
                self.session.category = item::current_item_category(&text);
                if let Some(level) = outcome::current_item_level(&text) {
                    self.session.current_level = level;
                }
                info!(
                    "  📌 starting item is {}, pushing to +{}",
                    describe(self.session.category),
                    cap_for(self.session.category)
                );
            }
            None => {
                self.session.category = ItemCategory::Sellable;
                info!("  📌 could not read the held item, assuming sellable (+{UPGRADE_CAP})");
            }
        }
        self.session.target_level = cap_for(self.session.category);

        loop {
            if self.shutdown_requested() {
                info!("🛑 shutdown requested, ending session");
                return Ok(RunEnd::Cancelled);
            }
            self.session.target_level = cap_for(self.session.category);
            self.cycle_banner();

            if !self.channel.send_command(CommandKind::Enhance).await {
                warn!("  command delivery failed, retrying the cycle");
                sleep(self.cycle_pause).await;
                continue;
            }
            sleep(self.result_delay).await;

            let Some(text) = self.channel.await_response().await? else {
                warn!("  no response text, retrying the cycle");
                continue;
            };
            self.session.attempts += 1;

            // Gold is tracked for reporting only; the targets are fixed caps.
            if let Some(gold) = outcome::gold_after_enhance(&text) {
                self.session.current_gold = Some(gold);
            }

            match outcome::classify(&text) {
                Outcome::Success(new_level) => {
                    self.apply_success(new_level)?;

                    if self.session.current_level >= UPGRADE_CAP {
                        self.final_banner();
                        return Ok(RunEnd::CapReached);
                    }
                    if self.session.category == ItemCategory::Special
                        && self.session.current_level >= SPECIAL_CAP
                    {
                        info!("  🎉 special item reached +{SPECIAL_CAP}, selling it");
                        let sale = self.sell_once().await?;
                        self.session.category = ItemCategory::from_sellable(
                            sale.as_deref().map_or(true, item::is_sellable_announcement),
                        );
                        self.session.current_level = 0;
                        info!(
                            "  🔄 restarting with a fresh item ({}, +{})",
                            describe(self.session.category),
                            cap_for(self.session.category)
                        );
                    }
                }
                Outcome::Maintain => self.apply_maintain()?,
                Outcome::Destroy => {
                    self.apply_destroy()?;
                    self.session.category =
                        ItemCategory::from_sellable(item::is_sellable_after_destroy(&text, true));
                    self.session.current_level = 0;
                    info!(
                        "  🔄 new item in hand ({}, +{})",
                        describe(self.session.category),
                        cap_for(self.session.category)
                    );
                }
                Outcome::InsufficientGold => {
                    info!("  💸 out of gold, selling the current item");
                    let sale = self.sell_once().await?;
                    self.session.category = ItemCategory::from_sellable(
                        sale.as_deref().map_or(true, item::is_sellable_announcement),
                    );
                    self.session.current_level = 0;
                    info!(
                        "  🔄 restarting with a fresh item ({}, +{})",
                        describe(self.session.category),
                        cap_for(self.session.category)
                    );
                }
                Outcome::Unrecognized => {
                    warn!("  ⚠️ could not classify the response");
                    debug!("  [debug] received text: {}…", preview(&text));
                }
            }

            sleep(self.cycle_pause).await;
        }
    }

    /// Success bookkeeping shared by both variants: record at the
    /// pre-enhance level, then trust the reported level. A jump that is not
    /// exactly one step is surfaced, not corrected.
    fn apply_success(&mut self, new_level: u32) -> Result<()> {
        let before = self.session.current_level;
        self.stats.record_success(before)?;
        if new_level != before + 1 {
            warn!("  ⚠️ reported level +{new_level} is not one above +{before}");
        }
        self.session.current_level = new_level;
        self.session.successes += 1;
        info!("  ✨ enhancement succeeded → +{new_level}");
        Ok(())
    }

    fn apply_maintain(&mut self) -> Result<()> {
        self.stats.record_stay(self.session.current_level)?;
        self.session.maintains += 1;
        info!(
            "  💦 enhancement held (still +{})",
            self.session.current_level
        );
        Ok(())
    }

    fn apply_destroy(&mut self) -> Result<()> {
        self.stats.record_break(self.session.current_level)?;
        self.session.destroys += 1;
        info!("  💥 item destroyed → +0");
        Ok(())
    }

    /// Target reached in gold-adaptive mode: sell, sync gold and target from
    /// the sale, then cycle junk drops away and start over at +0.
    async fn sell_and_restart(&mut self) -> Result<()> {
        self.session.cycles_completed += 1;
        info!(
            "  🎉 target +{} reached, selling (cycle #{} complete)",
            self.session.target_level, self.session.cycles_completed
        );

        self.sell_once().await?;
        self.sell_until_good_item().await?;
        self.session.target_level = policy::target_level_for_gold(self.session.current_gold);
        self.session.current_level = 0;
        info!(
            "  🔄 restarting with a fresh item (target +{})",
            self.session.target_level
        );
        Ok(())
    }

    /// One sell command plus its response; updates gold (and target, in
    /// gold-adaptive mode) from the sale text. Returns the response.
    async fn sell_once(&mut self) -> Result<Option<String>> {
        self.channel.send_command(CommandKind::Sell).await;
        sleep(self.result_delay).await;
        let text = self.channel.await_response().await?;
        if let Some(sale) = text.as_deref() {
            self.observe_sale_gold(sale);
        }
        Ok(text)
    }

    /// Sell until the held item is no longer a disposable drop.
    ///
    /// Two bot messages interrupt the plain sell cadence, and both get the
    /// same detour: one enhancement, then the sale is retried. A +0 item
    /// cannot be sold, and a completed-sale notice means the replacement is
    /// a fresh +0 item in the same position.
    async fn sell_until_good_item(&mut self) -> Result<Option<String>> {
        info!("  🔄 selling until a good item turns up");
        let mut text = self.channel.await_response().await?;
        let mut sale_count = 0u32;

        while let Some(current) = text.as_deref() {
            if !item::is_sellable_announcement(current) {
                break;
            }

            if current.contains(ZERO_TIER_SELL_REFUSAL) {
                info!("    ⚠️ +0 items cannot be sold, enhancing once first");
                text = self.enhance_then_resell().await?;
                continue;
            }
            if current.contains(SWORD_SOLD_NOTICE) {
                info!("    🔨 sale notice seen, enhancing once before the next sale");
                text = self.enhance_then_resell().await?;
                continue;
            }

            self.observe_sale_gold(current);

            sale_count += 1;
            debug!("    sale #{sale_count}");
            self.channel.send_command(CommandKind::Sell).await;
            sleep(self.result_delay).await;
            text = self.channel.await_response().await?;
        }

        if let Some(current) = text.as_deref() {
            self.observe_sale_gold(current);
        }
        self.session.category = ItemCategory::Special;
        info!("  ✅ good item in hand after {sale_count} sales");
        Ok(text)
    }

    /// The sub-loop detour: enhance once (noting gold), then issue the next
    /// sell and return its response.
    async fn enhance_then_resell(&mut self) -> Result<Option<String>> {
        self.channel.send_command(CommandKind::Enhance).await;
        sleep(self.result_delay).await;
        if let Some(enhanced) = self.channel.await_response().await?.as_deref() {
            if let Some(gold) = outcome::gold_after_enhance(enhanced) {
                self.session.current_gold = Some(gold);
            }
        }

        self.channel.send_command(CommandKind::Sell).await;
        sleep(self.result_delay).await;
        Ok(self.channel.await_response().await?)
    }

    /// Note a post-enhance gold reading and retarget if the policy moves.
    fn observe_enhance_gold(&mut self, text: &str) {
        if let Some(gold) = outcome::gold_after_enhance(text) {
            self.session.current_gold = Some(gold);
            self.retarget_from_gold("gold changed");
        }
    }

    /// Note a post-sale gold reading and retarget if the policy moves.
    fn observe_sale_gold(&mut self, text: &str) {
        if let Some(gold) = outcome::gold_after_sale(text) {
            self.session.current_gold = Some(gold);
            self.retarget_from_gold("gold after sale");
        }
    }

    fn retarget_from_gold(&mut self, label: &str) {
        if self.mode != Mode::GoldAdaptive {
            return;
        }
        let new_target = policy::target_level_for_gold(self.session.current_gold);
        if new_target != self.session.target_level {
            info!(
                "  💰 {label}: {}G → target moves +{} → +{new_target}",
                self.session.current_gold.unwrap_or_default(),
                self.session.target_level
            );
            self.session.target_level = new_target;
        }
    }

    fn shutdown_requested(&mut self) -> bool {
        !matches!(
            self.shutdown.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        )
    }

    fn log_gold_and_target(&self) {
        match self.session.current_gold {
            Some(gold) => info!(
                "  💰 current gold: {gold}G → target level: +{}",
                self.session.target_level
            ),
            None => info!(
                "  💰 gold unknown → target level: +{}",
                self.session.target_level
            ),
        }
    }

    fn cycle_banner(&self) {
        match self.session.current_gold {
            Some(gold) => info!(
                "[cycle #{}] [attempt #{}] level +{} | target +{} | gold {gold}G",
                self.session.cycles_completed + 1,
                self.session.attempts + 1,
                self.session.current_level,
                self.session.target_level,
            ),
            None => info!(
                "[cycle #{}] [attempt #{}] level +{} | target +{}",
                self.session.cycles_completed + 1,
                self.session.attempts + 1,
                self.session.current_level,
                self.session.target_level,
            ),
        }
    }

    fn final_banner(&self) {
        let elapsed = Utc::now() - self.session.started_at;
        info!("🏆 +{UPGRADE_CAP} reached!");
        info!("📊 final counters:");
        info!("   attempts:  {}", self.session.attempts);
        info!("   successes: {}", self.session.successes);
        info!("   maintains: {}", self.session.maintains);
        info!("   destroys:  {}", self.session.destroys);
        info!("   elapsed:   {} min", elapsed.num_minutes());
    }
}

fn cap_for(category: ItemCategory) -> u32 {
    if category.is_sellable() {
        UPGRADE_CAP
    } else {
        SPECIAL_CAP
    }
}

fn describe(category: ItemCategory) -> &'static str {
    if category.is_sellable() {
        "a sellable weapon"
    } else {
        "a special item"
    }
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
