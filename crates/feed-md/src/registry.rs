//! Adapter registry: factory for creating feeds from config.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use feed_core::TradeSender;
use feed_core::config::ConnectionConfig;

use crate::feed::ExchangeFeed;
use crate::{ExchangeAdapter, FeedModule};

/// Create the adapter named by the `exchange` field.
pub fn create_adapter(config: &ConnectionConfig, trades_tx: TradeSender) -> Result<Arc<dyn ExchangeAdapter>> {
    match config.exchange.to_lowercase().as_str() {
        "thalex" => Ok(Arc::new(crate::thalex::build(config, trades_tx)?)),
        other => Err(anyhow!("Unknown exchange: {other}")),
    }
}

/// Create a feed for one connection entry. Its sockets use slot ids starting
/// at `first_slot`.
pub fn create_feed(
    name: &str,
    config: &ConnectionConfig,
    trades_tx: TradeSender,
    first_slot: usize,
) -> Result<Box<dyn FeedModule>> {
    let adapter = create_adapter(config, trades_tx)?;
    Ok(Box::new(ExchangeFeed::new(name.to_string(), config.clone(), adapter, first_slot)))
}
