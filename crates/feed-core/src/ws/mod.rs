//! WebSocket client with auto-reconnect, driven by a [`WsHandler`].

pub mod client;

pub use client::{OutboundSender, WsConnConfig, WsConnection, WsHandler};
