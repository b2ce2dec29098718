//! # feed-core
//!
//! Core crate for the trade feed, providing:
//!
//! - **Types** (`types`): the canonical [`Trade`] record, [`Side`], [`TradeSource`]
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): domain-specific `FeedError` via thiserror
//! - **WebSocket** (`ws`): reconnecting WS client driven by a handler
//! - **Time utilities** (`time_util`): wall-clock timestamps and epoch normalization
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod time_util;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use error::FeedError;
pub use types::*;
