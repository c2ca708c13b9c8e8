//! CLI interface for forgeloop

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::controller::Mode;
use crate::stats::StatsStore;

#[derive(Parser)]
#[command(name = "forgeloop")]
#[command(about = "Automated enhance-and-sell loop for a chat-driven forge game", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gold-adaptive loop: enhance to a gold-derived target, sell, repeat
    Money,
    /// Data-collection loop: same engine as `money`, separate log file
    Data,
    /// Push one item to +17 (+13 for special items), then exit
    Upgrade,
    /// Print the per-level statistics table
    Stats,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Money => run_engine(&config, Mode::GoldAdaptive, "enhance_money").await,
        Commands::Data => run_engine(&config, Mode::GoldAdaptive, "enhance_data").await,
        Commands::Upgrade => run_engine(&config, Mode::UpgradeToCap, "enhance_upgrade").await,
        Commands::Stats => print_stats(&config),
    }
}

#[cfg(feature = "desktop")]
async fn run_engine(config: &Config, mode: Mode, log_prefix: &str) -> Result<()> {
    use crate::controller::{Controller, RunEnd};
    use crate::stats::StatsAggregator;
    use tokio::sync::broadcast;

    let _log_guard = crate::logging::init(&config.logging.log_dir, log_prefix)?;

    let mut store = StatsStore::open(&config.storage.db_path)?;
    store.seed_baseline()?;
    let stats = StatsAggregator::new(store);

    let channel = crate::channel::desktop::DesktopChannel::new(config.window.title.clone());

    // Ctrl-C asks the controller to stop between cycles; the sender side
    // lives in the signal task for the whole run.
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let mut controller = Controller::new(channel, stats, mode, &config.engine, shutdown_rx);
    let result = controller.run().await;
    // The finalizer runs on every exit path so the last partial statistics
    // buffer reaches the database.
    controller.close()?;

    match result? {
        RunEnd::CapReached => {
            println!("🏆 cap reached, session complete");
            Ok(())
        }
        RunEnd::Cancelled => {
            println!("session stopped");
            Ok(())
        }
    }
}

#[cfg(not(feature = "desktop"))]
async fn run_engine(_config: &Config, _mode: Mode, _log_prefix: &str) -> Result<()> {
    anyhow::bail!("built without the `desktop` feature; no chat window channel available")
}

fn print_stats(config: &Config) -> Result<()> {
    let mut store = StatsStore::open(&config.storage.db_path)?;
    store.seed_baseline()?;
    let rows = store.all_stats()?;

    println!("\n========== enhancement statistics ==========");
    println!(
        "{:>5} {:>8} {:>8} {:>7} {:>7} {:>8} {:>8} {:>8}",
        "Level", "Try", "Success", "Stay", "Break", "SuccPer", "StayPer", "BrkPer"
    );
    println!("{}", "-".repeat(65));
    for row in rows {
        println!(
            "{:>5} {:>8} {:>8} {:>7} {:>7} {:>7.2}% {:>7.2}% {:>7.2}%",
            row.level,
            row.tries,
            row.successes,
            row.stays,
            row.breaks,
            row.success_pct,
            row.stay_pct,
            row.break_pct
        );
    }
    println!("{}", "=".repeat(65));
    Ok(())
}
