//! Configuration parsing for the trade feed.
//!
//! All settings come from a single JSON config file. The top-level structure
//! contains logging metadata and a `connections` array where each entry
//! describes one exchange adapter instance.
//!
//! # Example config
//!
//! ```json
//! {
//!   "feed": { "module_name": "thalex_feed", "log_path": "/tmp/log" },
//!   "connections": [{
//!     "exchange": "thalex",
//!     "channel": "recent_trades",
//!     "pairs": ["BTC-PERPETUAL"],
//!     "heartbeat_interval_ms": 30000,
//!     "fallback_products": ["BTC-PERPETUAL"],
//!     "product_allow_list": ["BTC-PERPETUAL", "ETH-PERPETUAL"]
//!   }]
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::FeedError;
use crate::types::ChannelKind;

/// Default keepalive interval (ms).
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Fallback catalog used when no fallback list is configured.
pub const DEFAULT_FALLBACK_PRODUCT: &str = "BTC-PERPETUAL";

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    pub feed: Option<ModuleMeta>,

    /// One entry per exchange adapter instance.
    pub connections: Vec<ConnectionConfig>,
}

impl AppConfig {
    /// Module name from the metadata block, defaulting to `"feed"`.
    pub fn module_name(&self) -> String {
        self.feed.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "feed".to_string())
    }

    /// Log directory from the metadata block.
    pub fn log_path(&self) -> Option<String> {
        self.feed.as_ref().and_then(|m| m.log_path.clone())
    }
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// A single adapter/connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Exchange identifier, e.g. `"thalex"`.
    pub exchange: String,

    /// Which trade channel family to subscribe to (default: `recent_trades`).
    pub channel: Option<ChannelKind>,

    /// WebSocket endpoint override.
    pub ws_url: Option<String>,

    /// Instrument listing endpoint override.
    pub products_url: Option<String>,

    /// Pairs to subscribe on every connection.
    pub pairs: Option<Vec<String>>,

    /// Subscribe to the whole fetched catalog when `pairs` is empty.
    pub fetch_products: Option<bool>,

    /// Keepalive interval in milliseconds.
    pub heartbeat_interval_ms: Option<u64>,

    /// Catalog returned when the exchange listing is missing or empty.
    pub fallback_products: Option<Vec<String>>,

    /// Only keep instruments whose name contains one of these identifiers.
    pub product_allow_list: Option<Vec<String>>,

    /// Number of parallel connections running the same subscriptions.
    pub conn_count: Option<u32>,
}

impl ConnectionConfig {
    /// Effective channel family.
    pub fn channel(&self) -> ChannelKind {
        self.channel.unwrap_or_default()
    }

    /// Effective keepalive interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS))
    }

    /// Configured pairs (possibly empty).
    pub fn pairs(&self) -> Vec<String> {
        self.pairs.clone().unwrap_or_default()
    }

    pub fn fetch_products(&self) -> bool {
        self.fetch_products.unwrap_or(false)
    }

    /// Non-empty fallback catalog.
    pub fn fallback_products(&self) -> Vec<String> {
        match &self.fallback_products {
            Some(list) if !list.is_empty() => list.clone(),
            _ => vec![DEFAULT_FALLBACK_PRODUCT.to_string()],
        }
    }

    pub fn product_allow_list(&self) -> Vec<String> {
        self.product_allow_list.clone().unwrap_or_default()
    }

    pub fn conn_count(&self) -> u32 {
        self.conn_count.unwrap_or(1).max(1)
    }

    /// Reject settings that cannot work at runtime.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.exchange.trim().is_empty() {
            return Err(FeedError::Config("exchange must not be empty".into()));
        }
        if self.heartbeat_interval_ms == Some(0) {
            return Err(FeedError::Config(format!("[{}] heartbeat_interval_ms must be > 0", self.exchange)));
        }
        if self.pairs().is_empty() && !self.fetch_products() {
            return Err(FeedError::Config(format!(
                "[{}] no pairs configured and fetch_products is disabled",
                self.exchange
            )));
        }
        Ok(())
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate config text.
pub fn parse_config(text: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = serde_json::from_str(text)?;
    for conn in &config.connections {
        conn.validate()?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied() {
        let cfg = parse_config(r#"{"connections":[{"exchange":"thalex","pairs":["BTC-PERPETUAL"]}]}"#).unwrap();
        let conn = &cfg.connections[0];
        assert_eq!(conn.channel(), ChannelKind::RecentTrades);
        assert_eq!(conn.heartbeat_interval(), Duration::from_millis(30_000));
        assert_eq!(conn.fallback_products(), vec!["BTC-PERPETUAL".to_string()]);
        assert!(conn.product_allow_list().is_empty());
        assert_eq!(conn.conn_count(), 1);
        assert_eq!(cfg.module_name(), "feed");
    }

    #[test]
    fn full_config() {
        let cfg = parse_config(
            r#"{
                "feed": {"module_name": "thalex_feed", "log_path": "/tmp/log"},
                "connections": [{
                    "exchange": "thalex",
                    "channel": "book",
                    "fetch_products": true,
                    "heartbeat_interval_ms": 5000,
                    "fallback_products": ["ETH-PERPETUAL"],
                    "product_allow_list": ["PERPETUAL"]
                }]
            }"#,
        )
        .unwrap();
        let conn = &cfg.connections[0];
        assert_eq!(conn.channel(), ChannelKind::Book);
        assert_eq!(conn.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(conn.fallback_products(), vec!["ETH-PERPETUAL".to_string()]);
        assert_eq!(cfg.log_path().as_deref(), Some("/tmp/log"));
    }

    #[test]
    fn empty_fallback_uses_default() {
        let cfg = parse_config(
            r#"{"connections":[{"exchange":"thalex","pairs":["X"],"fallback_products":[]}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.connections[0].fallback_products(), vec!["BTC-PERPETUAL".to_string()]);
    }

    #[test]
    fn rejects_zero_heartbeat() {
        let err = parse_config(
            r#"{"connections":[{"exchange":"thalex","pairs":["X"],"heartbeat_interval_ms":0}]}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_nothing_to_subscribe() {
        assert!(parse_config(r#"{"connections":[{"exchange":"thalex"}]}"#).is_err());
    }

    #[test]
    fn rejects_unknown_channel() {
        assert!(parse_config(r#"{"connections":[{"exchange":"thalex","pairs":["X"],"channel":"ticker"}]}"#).is_err());
    }
}
