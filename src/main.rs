//! frost-signal: FCOJ frost / inventory advisory engine.
//!
//! Single-threaded Tokio application that:
//! 1. Syncs grove weather and futures RSI on an interval
//! 2. Tracks continuous frost exposure on a one-second clock
//! 3. Re-evaluates the market signal whenever an input changes
//! 4. Journals evaluations and renders trade blueprints

mod app;
mod config;
mod journal;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use common::{MarketContext, SignalInput};
use signal_engine::store::LAST_SNAPSHOT_KEY;
use signal_engine::{render_blueprint, FrostMonitor, SignalEvaluator, Snapshot, StateStore};

use crate::app::{frost_thresholds, open_journal, open_store, App};
use crate::journal::{JournalEvent, ResetReason};

/// Orange juice futures frost signal
#[derive(Parser)]
#[command(name = "frost-signal", about = "FCOJ frost and inventory signal engine")]
struct Cli {
    /// Path to the application config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the live loop until interrupted.
    Run,
    /// Run a single sync + evaluation and exit.
    Sync,
    /// Evaluate a signal from explicit inputs, no network.
    Evaluate(EvaluateArgs),
    /// Inspect or reset the frost exposure tracker.
    Frost {
        #[command(subcommand)]
        action: FrostAction,
    },
    /// Print the trade blueprint for the last cached evaluation.
    Blueprint,
}

#[derive(Subcommand)]
enum FrostAction {
    Status,
    Reset,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Current temperature (°F).
    #[arg(long, allow_hyphen_values = true)]
    temp: f64,
    /// Continuous hours below 28°F.
    #[arg(long, default_value_t = 0.0)]
    hours: f64,
    /// Inventory in millions of gallons.
    #[arg(long, default_value_t = 50.0)]
    inventory: f64,
    #[arg(long, default_value_t = 50.0)]
    rsi: f64,
    /// Month 1-12; defaults to the current month.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
    /// Brazil SPI-3 rainfall index.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    spi: f64,
    #[arg(long)]
    la_nina: bool,
    #[arg(long)]
    hurricane: bool,
    /// Hurricane center is more than 100 miles from Polk County.
    #[arg(long)]
    hurricane_far: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "frost_signal=info,signal_engine=info,weather_client=info,price_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config).context("loading configuration")?;
    let rules = config::load_rules(&cfg).context("loading market rules")?;

    match cli.command {
        Command::Run => {
            info!(
                "Starting frost-signal for {} ({}, {}) symbol={}",
                cfg.location.name, cfg.location.lat, cfg.location.lon, cfg.market.symbol
            );
            let mut app = App::new(cfg, rules)?;
            app.run().await?;
        }
        Command::Sync => {
            let mut app = App::new(cfg, rules)?;
            app.sync().await;
            app.frost_tick();
            let result = app.recompute();
            println!("{}", app.status_report());
            match result {
                Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                None => println!("Signal: unavailable"),
            }
        }
        Command::Evaluate(args) => {
            let input = SignalInput {
                current_temp_f: args.temp,
                hours_below_28: args.hours.max(0.0),
                current_inventory: args.inventory,
                market_context: MarketContext {
                    is_la_nina: args.la_nina,
                    is_hurricane_active: args.hurricane,
                    hurricane_center_far_from_polk: args.hurricane_far,
                    brazil_rainfall_index: args.spi,
                    current_month: args.month.unwrap_or_else(|| Utc::now().month()),
                },
                rsi_value: args.rsi,
            };
            let result = SignalEvaluator::new(rules).evaluate(&input);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Frost { action } => {
            let store = open_store(&cfg)?;
            let mut monitor =
                FrostMonitor::load(store, frost_thresholds(&cfg, &rules), Utc::now())?;
            if let FrostAction::Reset = action {
                monitor.reset()?;
                open_journal(&cfg)?.record(
                    Utc::now(),
                    JournalEvent::FrostReset {
                        reason: ResetReason::Manual,
                        temperature_f: None,
                    },
                );
            }
            let state = monitor.tracker().state();
            println!(
                "Frost exposure: {:.2}h ({}s), tracking={}, alert_shown={}",
                state.hours(),
                state.accumulated_seconds,
                state.is_tracking,
                state.alert_shown
            );
        }
        Command::Blueprint => {
            let store = open_store(&cfg)?;
            match store.get::<Snapshot>(LAST_SNAPSHOT_KEY)? {
                Some(snapshot) => print!("{}", render_blueprint(&snapshot)),
                None => println!("No evaluation cached yet; run `frost-signal sync` first."),
            }
        }
    }

    Ok(())
}
