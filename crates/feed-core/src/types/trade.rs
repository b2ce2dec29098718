//! The canonical trade record emitted downstream.
//!
//! # Timestamp convention
//!
//! `timestamp` is always **milliseconds since Unix epoch**. Exchanges that
//! send seconds are scaled by the adapter before a `Trade` is built (see
//! [`time_util::to_epoch_ms`](crate::time_util::to_epoch_ms)).

use serde::Serialize;

use super::enums::{Side, TradeSource};

/// A single normalized trade, exchange-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    /// Adapter identity (e.g. `"THALEX"`).
    pub exchange: String,
    /// Symbol the trade belongs to.
    pub pair: String,
    /// Execution time, ms since epoch.
    pub timestamp: u64,
    pub price: f64,
    pub size: f64,
    pub side: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_taker: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<TradeSource>,
}

/// Connection identifier assigned by the connection owner.
pub type ConnectionId = u64;

/// Trades produced by one inbound frame on one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeBatch {
    pub connection_id: ConnectionId,
    pub trades: Vec<Trade>,
}

/// Sender half of the trade channel consumed by the aggregator.
pub type TradeSender = tokio::sync::mpsc::UnboundedSender<TradeBatch>;

/// Receiver half of the trade channel.
pub type TradeReceiver = tokio::sync::mpsc::UnboundedReceiver<TradeBatch>;
