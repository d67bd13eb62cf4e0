//! OKX leverage rebalancer.
//!
//! Keeps one perpetual-swap position at a fixed multiple of account equity,
//! rebalancing once a day at a configured UTC time.

mod api;
mod db;
mod error;
mod models;
mod notify;
mod trading;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::{Exchange, OkxClient};
use crate::db::Journal;
use crate::notify::{publish, TelegramNotifier, TradeSink};
use crate::trading::{Config, RebalanceOrchestrator, Scheduler, Settings, SystemClock};

/// OKX leverage rebalancer CLI.
#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Keep an OKX perpetual position at a fixed leverage of account equity", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daily scheduler (Ctrl+C to stop)
    Run,

    /// Run one rebalance now
    Rebalance,

    /// Show recent rebalance records
    History {
        /// Number of records to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: i64,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli.settings.log_level.to_lowercase()))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run => {
            let config = Config::from_settings(&cli.settings)?;
            let (orchestrator, sinks) = build(&config).await?;

            println!("\n{}\n", config);
            println!("Press Ctrl+C to stop.\n");

            let mut scheduler = Scheduler::new(config.schedule, SystemClock);
            scheduler
                .run(&orchestrator, &sinks, async {
                    tokio::signal::ctrl_c().await.ok();
                })
                .await;
        }

        Commands::Rebalance => {
            let config = Config::from_settings(&cli.settings)?;
            let (orchestrator, sinks) = build(&config).await?;

            info!(instrument = %config.instrument, "Manual rebalance");
            let record = orchestrator.rebalance().await;
            println!("\n{}", record);

            publish(&record, &sinks).await;

            if !record.success() {
                std::process::exit(1);
            }
        }

        Commands::History { limit } => {
            let journal = Journal::new(&cli.settings.database).await?;
            let records = journal.recent(limit).await?;

            if records.is_empty() {
                println!("No rebalance records yet. Use 'rebalancer rebalance' or 'rebalancer run'.");
                return Ok(());
            }

            println!(
                "\n{:>5} {:<20} {:<16} {:>12} {:>10} {:>10} {:>10}  {}",
                "#", "TIME (UTC)", "INSTRUMENT", "EQUITY", "PRICE", "POSITION", "TARGET", "RESULT"
            );
            println!("{}", "-".repeat(116));

            for r in &records {
                println!(
                    "{:>5} {:<20} {:<16} {:>12} {:>10} {:>10} {:>10}  {}",
                    r.id,
                    r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    truncate(&r.instrument, 16),
                    r.equity,
                    r.price,
                    r.position,
                    r.target.as_deref().unwrap_or("-"),
                    r.summary()
                );
            }

            let stats = journal.stats().await?;
            println!(
                "\nTotal: {} | Executed: {} | Simulated: {} | Held: {} | Failed: {}",
                stats.total, stats.executed, stats.simulated, stats.held, stats.failed
            );
        }

        Commands::Config => {
            let config = Config::from_settings(&cli.settings)?;
            println!("\n{}", config);
        }
    }

    Ok(())
}

/// Wire the exchange client, orchestrator and record sinks from config.
async fn build(config: &Config) -> Result<(RebalanceOrchestrator, Vec<Arc<dyn TradeSink>>)> {
    let client = OkxClient::with_base_url(
        config.base_url.clone(),
        config.credentials.clone(),
        config.http_timeout,
    )?
    .simulated(config.simulated);
    let exchange: Arc<dyn Exchange> = Arc::new(client);

    let orchestrator = RebalanceOrchestrator::new(exchange, config);

    let mut sinks: Vec<Arc<dyn TradeSink>> = vec![Arc::new(Journal::new(&config.database_url).await?)];
    if let Some(telegram) = &config.telegram {
        sinks.push(Arc::new(TelegramNotifier::new(telegram.clone())?));
    }

    Ok((orchestrator, sinks))
}

/// Truncate a string with ellipsis if too long.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
