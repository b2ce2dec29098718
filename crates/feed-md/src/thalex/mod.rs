//! THALEX trade adapter.
//!
//! One [`ThalexProtocol`] per configured connection, driven by the generic
//! [`AdapterDriver`]. The configured [`ChannelKind`] only decides what gets
//! subscribed; inbound frames of every channel revision are understood:
//!
//! - `trades.{pair}`: object trades, also via the legacy `subscription` push
//! - `book.{pair}.none.all.raw`: 5-tuples inside `notification.trades`
//! - `recent_trades.{pair}.single`: 6-tuples

pub mod config;
pub mod frames;
pub mod normalizer;

use anyhow::Result;
use feed_core::config::ConnectionConfig;
use feed_core::{ChannelKind, FeedError, Trade, TradeSender};
use serde_json::Value;

use self::config::ThalexConfig;
use crate::catalog::CatalogResolver;
use crate::driver::AdapterDriver;
use crate::protocol::{Frame, Protocol};

/// Identity stamped on every THALEX trade.
pub const THALEX_ID: &str = "THALEX";

pub const THALEX_WS_URL: &str = "wss://testnet.thalex.com/ws/api/v2";

pub const THALEX_PRODUCTS_URL: &str = "https://testnet.thalex.com/api/v2/public/instruments";

/// THALEX wire format.
#[derive(Debug, Clone)]
pub struct ThalexProtocol {
    channel: ChannelKind,
    catalog: CatalogResolver,
    ws_url: String,
    products_url: String,
}

impl ThalexProtocol {
    pub fn new(cfg: ThalexConfig) -> Self {
        Self { channel: cfg.channel, catalog: cfg.catalog, ws_url: cfg.ws_url, products_url: cfg.products_url }
    }

    /// Default endpoints and catalog, subscribing on `channel`.
    pub fn with_channel(channel: ChannelKind) -> Self {
        Self::new(ThalexConfig { channel, ..ThalexConfig::default() })
    }

    pub fn channel(&self) -> ChannelKind {
        self.channel
    }
}

impl Default for ThalexProtocol {
    fn default() -> Self {
        Self::new(ThalexConfig::default())
    }
}

impl Protocol for ThalexProtocol {
    fn id(&self) -> &str {
        THALEX_ID
    }

    fn ws_url(&self) -> &str {
        &self.ws_url
    }

    fn products_url(&self) -> &str {
        &self.products_url
    }

    fn channel_name(&self, pair: &str) -> String {
        self.channel.channel_name(pair)
    }

    fn build_subscribe_frame(&self, channel: &str, request_id: u64) -> String {
        frames::build_subscribe(channel, request_id)
    }

    fn build_unsubscribe_frame(&self, channel: &str, request_id: u64) -> String {
        frames::build_unsubscribe(channel, request_id)
    }

    fn heartbeat_frame(&self) -> String {
        frames::build_heartbeat()
    }

    fn classify_frame(&self, frame: &Value) -> Result<Frame, FeedError> {
        frames::classify(THALEX_ID, frame)
    }

    fn format_trade(&self, pair: &str, raw: &Value) -> Option<Trade> {
        normalizer::format_trade(THALEX_ID, pair, raw)
    }

    fn parse_catalog(&self, response: Option<&Value>) -> Vec<String> {
        self.catalog.resolve(response)
    }
}

/// Build a THALEX adapter from the connection config.
pub fn build(conn_config: &ConnectionConfig, trades_tx: TradeSender) -> Result<AdapterDriver<ThalexProtocol>> {
    let cfg = ThalexConfig::from_connection(conn_config)?;
    let heartbeat_interval = cfg.heartbeat_interval;
    Ok(AdapterDriver::new(ThalexProtocol::new(cfg), heartbeat_interval, trades_tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_names_per_revision() {
        assert_eq!(ThalexProtocol::with_channel(ChannelKind::Trades).channel_name("BTC-PERPETUAL"), "trades.BTC-PERPETUAL");
        assert_eq!(
            ThalexProtocol::with_channel(ChannelKind::Book).channel_name("BTC-PERPETUAL"),
            "book.BTC-PERPETUAL.none.all.raw"
        );
        assert_eq!(ThalexProtocol::default().channel_name("BTC-PERPETUAL"), "recent_trades.BTC-PERPETUAL.single");
    }

    #[test]
    fn classification_ignores_configured_channel() {
        let proto = ThalexProtocol::with_channel(ChannelKind::Trades);
        let frame = json!({
            "channel_name": "book.BTC-PERPETUAL.none.all.raw",
            "notification": {"trades": [["50001", "0.02", "sell", "1690000001", "false"]]}
        });
        match proto.classify_frame(&frame).unwrap() {
            Frame::Trades { trades, .. } => assert_eq!(trades.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn build_from_config() {
        let cfg = feed_core::config::parse_config(
            r#"{"connections":[{"exchange":"thalex","channel":"book","pairs":["BTC-PERPETUAL"]}]}"#,
        )
        .unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let driver = build(&cfg.connections[0], tx).unwrap();
        assert_eq!(driver.protocol().channel(), ChannelKind::Book);
        assert_eq!(driver.protocol().ws_url(), THALEX_WS_URL);
    }
}
