//! Wire-protocol strategy plugged into the generic adapter driver.
//!
//! A [`Protocol`] knows how an exchange spells its control frames, how to
//! classify an inbound frame, and how to read its instrument listing. It holds
//! no per-connection state; the [`AdapterDriver`](crate::driver::AdapterDriver)
//! owns subscription bookkeeping, keepalive scheduling and trade emission.

use feed_core::{FeedError, Trade};
use serde_json::Value;

/// Result of classifying one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Subscription acknowledgement.
    Ack { id: Option<u64> },
    /// Exchange-reported error.
    Error { code: Option<i64>, message: String },
    /// Snapshot replay on a channel; never forwarded as live trades.
    Snapshot { channel: String },
    /// Market data notification, already normalized. May be empty.
    Trades { channel: String, trades: Vec<Trade> },
    /// Anything else (pong, unknown channel, future message types).
    Ignored,
}

/// Exchange-specific wire format.
pub trait Protocol: Send + Sync + 'static {
    /// Adapter identity, stamped on every trade.
    fn id(&self) -> &str;

    /// WebSocket endpoint.
    fn ws_url(&self) -> &str;

    /// Instrument listing endpoint.
    fn products_url(&self) -> &str;

    /// Channel name carrying trades for `pair`.
    fn channel_name(&self, pair: &str) -> String;

    fn build_subscribe_frame(&self, channel: &str, request_id: u64) -> String;

    fn build_unsubscribe_frame(&self, channel: &str, request_id: u64) -> String;

    /// Keepalive payload.
    fn heartbeat_frame(&self) -> String;

    /// Classify a parsed frame. `Err` means the frame was recognized but its
    /// payload is malformed.
    fn classify_frame(&self, frame: &Value) -> Result<Frame, FeedError>;

    /// Normalize one object-shaped trade.
    fn format_trade(&self, pair: &str, raw: &Value) -> Option<Trade>;

    /// Resolve an instrument listing into a non-empty symbol list.
    fn parse_catalog(&self, response: Option<&Value>) -> Vec<String>;
}
