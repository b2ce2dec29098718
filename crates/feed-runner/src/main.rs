//! # feed-runner
//!
//! Main entry point for the trade feed.
//!
//! Loads a JSON configuration file, creates one exchange feed per configured
//! connection, and forwards normalized trades to stdout or the log until
//! Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! feed-runner config/thalex.json --log-level info --print-trades
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use feed_core::TradeReceiver;
use feed_core::logging::{LogOptions, init_logging};
use tracing::{debug, error, info, warn};

/// Exchange trade feed runner.
#[derive(Parser)]
#[command(name = "feed-runner", about = "Exchange trade feed runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output. Overrides `feed.log_path`.
    #[arg(long)]
    log_dir: Option<String>,

    /// Emit console logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Print every trade as a JSON line on stdout.
    #[arg(long)]
    print_trades: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration (logging needs its module name and log path)
    let config = feed_core::config::load_config(&cli.config)?;
    let module_name = config.module_name();
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());

    // 2. Initialize logging
    init_logging(&LogOptions {
        level: &cli.log_level,
        dir: log_dir.as_deref(),
        file_prefix: &module_name,
        json: cli.json_logs,
    });

    info!(
        "feed-runner starting: config={}, log_level={}, {} connection(s)",
        cli.config.display(),
        cli.log_level,
        config.connections.len(),
    );

    // 3. Create feeds from the connections array
    let (trades_tx, trades_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut feeds: Vec<Box<dyn feed_md::FeedModule>> = Vec::new();
    let mut next_slot = 0usize;

    for (idx, conn_config) in config.connections.iter().enumerate() {
        let name = format!("{}_{idx}", conn_config.exchange.to_lowercase());
        match feed_md::registry::create_feed(&name, conn_config, trades_tx.clone(), next_slot) {
            Ok(feed) => {
                info!("connection[{idx}]: created feed '{}' (exchange={})", feed.name(), conn_config.exchange);
                next_slot += conn_config.conn_count() as usize;
                feeds.push(feed);
            }
            Err(e) => {
                error!("connection[{idx}]: failed to create feed for '{}': {e:#}", conn_config.exchange);
            }
        }
    }
    drop(trades_tx);

    // 4. Consume trades
    let sink = tokio::spawn(consume_trades(trades_rx, cli.print_trades));

    // 5. Start all feeds
    for feed in &mut feeds {
        feed.start().await?;
        info!("feed '{}' started", feed.name());
    }

    info!("all {} feed(s) started, press Ctrl+C to stop", feeds.len());

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // 7. Stop all feeds gracefully
    for feed in &mut feeds {
        info!("stopping feed '{}'", feed.name());
        if let Err(e) = feed.stop().await {
            error!("error stopping '{}': {e}", feed.name());
        }
    }
    drop(feeds);

    match sink.await {
        Ok(count) => info!("all feeds stopped, {count} trade(s) received"),
        Err(e) => warn!("trade consumer ended abnormally: {e}"),
    }
    Ok(())
}

/// Drain trade batches until every adapter is gone.
async fn consume_trades(mut rx: TradeReceiver, print: bool) -> u64 {
    let mut count = 0u64;
    let stdout = std::io::stdout();

    while let Some(batch) = rx.recv().await {
        count += batch.trades.len() as u64;
        if !print {
            for trade in &batch.trades {
                debug!(
                    "[{}] conn={} {} {} {}@{} ts={}",
                    trade.exchange, batch.connection_id, trade.pair, trade.side, trade.size, trade.price, trade.timestamp
                );
            }
            continue;
        }

        let mut out = stdout.lock();
        for trade in &batch.trades {
            match serde_json::to_string(trade) {
                Ok(line) => {
                    if writeln!(out, "{line}").is_err() {
                        warn!("stdout closed, no longer printing trades");
                        return count;
                    }
                }
                Err(e) => warn!("failed to encode trade: {e}"),
            }
        }
    }
    count
}
