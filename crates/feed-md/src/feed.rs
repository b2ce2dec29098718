//! Lifecycle of one configured exchange feed.
//!
//! `start` resolves the pair list (configured, or the fetched catalog), asks
//! the adapter for its endpoint and opens `conn_count` redundant sockets that
//! all share one [`ConnectionManager`]. `stop` unsubscribes and closes them.

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use feed_core::config::ConnectionConfig;
use feed_core::ws::{WsConnConfig, WsConnection};
use tracing::{info, warn};

use crate::manager::ConnectionManager;
use crate::{ExchangeAdapter, FeedModule};

pub struct ExchangeFeed {
    name: String,
    config: ConnectionConfig,
    adapter: Arc<dyn ExchangeAdapter>,
    /// First socket slot id; slots are numbered consecutively from here.
    first_slot: usize,
    manager: Option<Arc<ConnectionManager>>,
    connections: Vec<WsConnection>,
}

impl ExchangeFeed {
    pub fn new(name: String, config: ConnectionConfig, adapter: Arc<dyn ExchangeAdapter>, first_slot: usize) -> Self {
        Self { name, config, adapter, first_slot, manager: None, connections: Vec::new() }
    }

    /// Connection manager of a started feed, for runtime pair changes.
    pub fn manager(&self) -> Option<&Arc<ConnectionManager>> {
        self.manager.as_ref()
    }

    /// Configured pairs, or the adapter's catalog when none are configured
    /// and `fetch_products` is enabled.
    pub async fn resolve_pairs(&self) -> Vec<String> {
        let pairs = self.config.pairs();
        if !pairs.is_empty() || !self.config.fetch_products() {
            return pairs;
        }
        let products = self.adapter.fetch_products().await;
        info!("[{}] subscribing to {} catalog product(s)", self.name, products.len());
        products
    }
}

#[async_trait]
impl FeedModule for ExchangeFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> Result<()> {
        if self.manager.is_some() {
            bail!("[{}] already started", self.name);
        }

        let pairs = self.resolve_pairs().await;
        if pairs.is_empty() {
            warn!("[{}] starting with no pairs", self.name);
        }
        let url = self.adapter.get_url().await;
        let manager = Arc::new(ConnectionManager::new(Arc::clone(&self.adapter), pairs));

        let conn_count = self.config.conn_count() as usize;
        for slot in self.first_slot..self.first_slot + conn_count {
            let mut conn = WsConnection::new(WsConnConfig { url: url.clone(), id: slot });
            conn.start(manager.clone());
            self.connections.push(conn);
        }

        info!("[{}] {conn_count} connection(s) to {url} for {} pair(s)", self.name, manager.pairs().len());
        self.manager = Some(manager);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(manager) = self.manager.take() {
            let sent = manager.unsubscribe_all();
            info!("[{}] sent {sent} unsubscribe frame(s)", self.name);
        }
        for conn in &mut self.connections {
            conn.stop().await;
        }
        self.connections.clear();
        Ok(())
    }
}
