//! # feed-md
//!
//! Exchange trade adapters feeding the aggregator.
//!
//! ## Architecture
//!
//! Every exchange implements the [`Protocol`](protocol::Protocol) strategy
//! (frame spelling, classification, catalog rules). The generic
//! [`AdapterDriver`](driver::AdapterDriver) wraps a protocol and provides the
//! [`ExchangeAdapter`] contract: subscription bookkeeping, keepalive and trade
//! emission. A [`ConnectionManager`](manager::ConnectionManager) binds one
//! adapter to the sockets opened by `feed_core::ws`, and an
//! [`ExchangeFeed`](feed::ExchangeFeed) owns the whole lifecycle of one
//! configured connection entry.
//!
//! ## Shared infrastructure
//!
//! - [`connection`]: per-socket handle with subscription map
//! - [`keepalive`]: per-connection heartbeat tasks
//! - [`catalog`]: instrument listing resolution
//! - [`json_util`]: JSON parsing helpers

pub mod catalog;
pub mod connection;
pub mod driver;
pub mod feed;
pub mod json_util;
pub mod keepalive;
pub mod manager;
pub mod protocol;
pub mod registry;
pub mod thalex;

use anyhow::Result;
use async_trait::async_trait;
use feed_core::Trade;
use serde_json::Value;

use crate::connection::ApiConnection;

/// Contract every exchange adapter fulfils towards the connection owner.
///
/// One adapter may serve many connections at once; all per-connection state
/// lives on the [`ApiConnection`] passed to each hook. None of these calls
/// block, and none of them fail loudly: errors are logged and collapsed into
/// the return value.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Adapter identity, e.g. `"THALEX"`.
    fn id(&self) -> &str;

    /// WebSocket endpoint to connect to.
    async fn get_url(&self) -> String;

    /// Subscribe `pair` on `conn`. An already subscribed pair succeeds
    /// without sending anything.
    fn subscribe(&self, conn: &ApiConnection, pair: &str) -> bool;

    /// Unsubscribe `pair` on `conn`. Returns `false` if it was not subscribed.
    fn unsubscribe(&self, conn: &ApiConnection, pair: &str) -> bool;

    /// Handle one inbound text frame. `false` means unparseable or an
    /// exchange-reported error.
    fn on_message(&self, raw: &str, conn: &ApiConnection) -> bool;

    /// Connection opened.
    fn on_api_created(&self, conn: &ApiConnection);

    /// Connection closed.
    fn on_api_removed(&self, conn: &ApiConnection);

    /// Normalize one object-shaped trade.
    fn format_trade(&self, pair: &str, raw: &Value) -> Option<Trade>;

    /// Resolve an instrument listing into a non-empty symbol list.
    fn format_products(&self, catalog: Option<&Value>) -> Vec<String>;

    /// Fetch and resolve the instrument listing. Never empty.
    async fn fetch_products(&self) -> Vec<String>;
}

/// A runnable feed built from one connection config entry.
#[async_trait]
pub trait FeedModule: Send {
    /// Human-readable module name.
    fn name(&self) -> &str;
    /// Resolve pairs, connect and begin emitting trades.
    async fn start(&mut self) -> Result<()>;
    /// Unsubscribe everything and close all connections.
    async fn stop(&mut self) -> Result<()>;
}
