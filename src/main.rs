//! LMSR Kelly Sizer - Entry Point
//!
//! Runs one decide-and-bet session over the markets listed in the
//! configuration file and prints the session summary.
//!
//! Wiring sequence:
//! 1. Load config (first CLI argument, default `config.toml`) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Build config-backed market source, fixed beliefs and paper sink
//! 4. Run the session, log the summary as JSON

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use lmsr_kelly_sizer::adapters::beliefs::FixedBelief;
use lmsr_kelly_sizer::adapters::markets::StaticMarketSource;
use lmsr_kelly_sizer::adapters::paper::PaperOrderSink;
use lmsr_kelly_sizer::config;
use lmsr_kelly_sizer::usecases::session::SessionRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&path)
        .with_context(|| format!("Failed to load configuration from {path}"))?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        dry_run = config.bot.dry_run,
        markets = config.markets.len(),
        strategy = ?config.policy.strategy,
        "Starting LMSR Kelly sizer"
    );

    if config.bot.dry_run {
        warn!("Dry-run mode - decisions computed but NO bets placed");
    }

    // ── 3. Wire adapters ────────────────────────────────────
    let markets = Arc::new(StaticMarketSource::from_config(&config.markets));
    let beliefs = Arc::new(FixedBelief::from_config(&config.markets)?);
    let sink = Arc::new(PaperOrderSink::new(config.bot.paper_balance)?);

    if beliefs.is_empty() {
        warn!("No market carries a belief - every market will error");
    }

    let runner = SessionRunner::new(
        markets,
        beliefs,
        sink,
        config.decision_policy(),
        config.sizing,
        config.session.clone(),
        config.bot.dry_run,
    )?;

    // ── 4. Run one session ──────────────────────────────────
    let summary = runner.run(&config.market_ids()).await?;

    let report = serde_json::to_string_pretty(&summary)
        .context("Failed to serialize session summary")?;
    info!(
        bets = summary.bets_placed,
        staked = %summary.total_staked,
        "Session complete"
    );
    println!("{report}");

    Ok(())
}
