//! THALEX-specific configuration extraction.
//!
//! Resolves the generic [`ConnectionConfig`] into endpoints, channel family,
//! keepalive interval and catalog rules, applying THALEX defaults.

use std::time::Duration;

use anyhow::{Result, bail};
use feed_core::ChannelKind;
use feed_core::config::ConnectionConfig;

use super::{THALEX_PRODUCTS_URL, THALEX_WS_URL};
use crate::catalog::CatalogResolver;

/// Parsed THALEX configuration.
#[derive(Debug, Clone)]
pub struct ThalexConfig {
    /// Trade channel family to subscribe to.
    pub channel: ChannelKind,
    /// WebSocket endpoint.
    pub ws_url: String,
    /// Instrument listing endpoint.
    pub products_url: String,
    /// Keepalive period.
    pub heartbeat_interval: Duration,
    pub catalog: CatalogResolver,
}

impl ThalexConfig {
    pub fn from_connection(conn: &ConnectionConfig) -> Result<Self> {
        conn.validate()?;

        let ws_url = conn.ws_url.clone().unwrap_or_else(|| THALEX_WS_URL.to_string());
        if !(ws_url.starts_with("wss://") || ws_url.starts_with("ws://")) {
            bail!("thalex: ws_url must be a ws:// or wss:// URL, got {ws_url}");
        }

        let products_url = conn.products_url.clone().unwrap_or_else(|| THALEX_PRODUCTS_URL.to_string());
        if !(products_url.starts_with("https://") || products_url.starts_with("http://")) {
            bail!("thalex: products_url must be an http(s) URL, got {products_url}");
        }

        Ok(Self {
            channel: conn.channel(),
            ws_url,
            products_url,
            heartbeat_interval: conn.heartbeat_interval(),
            catalog: CatalogResolver::from_connection(conn),
        })
    }
}

impl Default for ThalexConfig {
    fn default() -> Self {
        Self {
            channel: ChannelKind::default(),
            ws_url: THALEX_WS_URL.to_string(),
            products_url: THALEX_PRODUCTS_URL.to_string(),
            heartbeat_interval: Duration::from_millis(feed_core::config::DEFAULT_HEARTBEAT_INTERVAL_MS),
            catalog: CatalogResolver::new(Vec::new(), Vec::new()),
        }
    }
}
