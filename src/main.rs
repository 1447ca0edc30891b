//! Flowscan - Orderbook Imbalance Signal Engine
//!
//! Replays recorded market snapshots through the signal engine and reports
//! every position lifecycle.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use flowscan::adapters::cli::{CheckConfigCmd, CliApp, Command, RunCmd};
use flowscan::adapters::{JsonlJournalSink, LogSink, ReplayFeed};
use flowscan::application::{ReplayRunner, RunSummary};
use flowscan::config::{load_config, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let app = CliApp::parse();

    match app.command {
        Command::Run(cmd) => run_command(cmd, app.verbose, app.debug).await,
        Command::CheckConfig(cmd) => check_config_command(cmd, app.verbose, app.debug),
    }
}

/// RUST_LOG wins, then the CLI flags, then the configured level
fn init_logging(verbose: bool, debug: bool, configured: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if debug => EnvFilter::new("debug"),
        Err(_) if verbose => EnvFilter::new("info"),
        Err(_) => EnvFilter::try_new(configured)
            .with_context(|| format!("Invalid log level '{}'", configured))?,
    };

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;
    Ok(())
}

fn load(path: &Path) -> Result<Config> {
    load_config(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

async fn run_command(cmd: RunCmd, verbose: bool, debug: bool) -> Result<()> {
    let config = load(&cmd.config)?;
    init_logging(verbose, debug, &config.logging.level)?;
    tracing::info!("Starting flowscan replay of {}", cmd.replay.display());

    let mut runner = ReplayRunner::new(config.clone()).with_sink(Arc::new(LogSink::new()));

    let journal_path = cmd.journal.clone().or_else(|| config.logging.journal_path.clone());
    if let Some(path) = journal_path {
        let journal = JsonlJournalSink::open(&path)
            .await
            .with_context(|| format!("Failed to open journal {}", path.display()))?;
        runner = runner.with_sink(Arc::new(journal));
    }

    let mut feed = ReplayFeed::new(&cmd.replay)
        .with_capacity(config.engine.channel_capacity)
        .skip_malformed(cmd.skip_malformed);

    let stop = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        } else {
            // no signal handler available; run until the feed ends
            std::future::pending::<()>().await;
        }
    };

    let summary = runner
        .run(&mut feed, stop)
        .await
        .context("Replay failed")?;

    print_summary(&summary);
    tracing::info!("Flowscan stopped");
    Ok(())
}

fn check_config_command(cmd: CheckConfigCmd, verbose: bool, debug: bool) -> Result<()> {
    let config = load(&cmd.config)?;
    init_logging(verbose, debug, &config.logging.level)?;

    println!("✓ {} is valid", cmd.config.display());
    println!(
        "  entry: imbalance ≥ {:.2}, R:R ≥ {:.2}, {} confirming snapshot(s)",
        config.entry.imbalance_threshold,
        config.entry.min_reward_risk,
        config.engine.entry_persistence_samples
    );
    println!(
        "  exit: reversal ≥ {:.2} for {} samples after {}s hold, cadence {}ms",
        config.exit.reversal_threshold,
        config.exit.persistence_samples,
        config.exit.min_hold_secs,
        config.exit.snapshot_cadence_ms
    );
    println!(
        "  admission: {} concurrent, correlation > {:.2} rejected",
        config.admission.max_concurrent, config.admission.correlation_threshold
    );
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Replayed {} snapshots{}",
        summary.snapshots,
        if summary.interrupted { " (interrupted)" } else { "" }
    );
    if summary.skipped > 0 {
        println!("Skipped {} snapshots without a symbol", summary.skipped);
    }

    for worker in &summary.shutdown.workers {
        let stats = &worker.stats;
        println!(
            "  {:<12} snapshots {:>6}  opened {:>3}  closed {:>3}  rejected {:>5}  not admitted {:>3}",
            worker.symbol,
            stats.snapshots,
            stats.opened,
            stats.closed,
            stats.rejected,
            stats.admission_rejected
        );
    }

    let forced: Vec<_> = summary.shutdown.forced_closes().collect();
    if !forced.is_empty() {
        println!("Force-closed at shutdown (needs reconciliation):");
        for close in forced {
            println!(
                "  {} {} at {:.6} ({:+.3}%)",
                close.symbol, close.direction, close.exit_price, close.total_pnl_pct
            );
        }
    }

    let perf = &summary.performance;
    if perf.closed > 0 {
        println!(
            "Performance: {} closed, {} won / {} lost ({:.1}%), total {:+.3}%, avg {:+.3}%, best {:+.3}%, worst {:+.3}%",
            perf.closed,
            perf.wins,
            perf.losses,
            perf.win_rate(),
            perf.total_pnl_pct,
            perf.average_pnl_pct(),
            perf.best_pnl_pct,
            perf.worst_pnl_pct
        );
        println!(
            "  avg hold {:.1}s, max drawdown {:.3}%, sharpe {}",
            perf.average_hold_ms() as f64 / 1_000.0,
            perf.max_drawdown_pct(),
            perf.sharpe_ratio()
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "n/a".to_string())
        );
        println!(
            "  exits: tp1 {} / tp2 {} / stop {} / breakeven {} / reversal {} / forced {} ({} partial closes)",
            perf.tp1_exits,
            perf.tp2_exits,
            perf.stop_exits,
            perf.breakeven_exits,
            perf.reversal_exits,
            perf.forced_exits,
            perf.partial_closes
        );
    }

    if let Some(daily) = &summary.shutdown.daily {
        println!(
            "Admitted today: {} high / {} medium / {} low",
            daily.high, daily.medium, daily.low
        );
    }
    println!(
        "Events: {} dispatched, {} retries, {} dropped",
        summary.dispatch.delivered, summary.dispatch.retries, summary.dispatch.dropped
    );
}
