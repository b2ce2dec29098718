//! Typed error definitions for the trade feed.
//!
//! Provides [`FeedError`] for failures inside the adapter and connection
//! layers. Adapter entry points never surface these to their callers; they are
//! logged and collapsed to a `bool` / `Option` sentinel. Application code wraps
//! them in `anyhow::Result` like any other `std::error::Error`.

use thiserror::Error;

/// Domain-specific errors for the trade feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// WebSocket connection, handshake, or communication error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Malformed inbound frame payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// Error reported by the exchange in an `error` field.
    #[error("protocol error (code {code:?}): {message}")]
    Protocol { code: Option<i64>, message: String },

    /// A single trade of the wrong arity or shape.
    #[error("validation error: {0}")]
    Validation(String),

    /// Instrument catalog fetch or decode failure.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Outbound frame could not be queued (connection gone).
    #[error("send error: {0}")]
    Send(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
