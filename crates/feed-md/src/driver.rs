//! Generic adapter driver.
//!
//! [`AdapterDriver`] turns any [`Protocol`] into an [`ExchangeAdapter`]. The
//! protocol decides what frames look like; the driver decides when they are
//! sent and what happens to their results:
//!
//! - subscribe/unsubscribe are two-phase: bookkeeping on the
//!   [`ApiConnection`] first, frame second, rollback if the send fails
//! - keepalive is started on open and stopped on close
//! - every inbound frame yields at most one [`TradeBatch`]

use std::time::Duration;

use async_trait::async_trait;
use feed_core::{FeedError, Trade, TradeBatch, TradeSender};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ExchangeAdapter;
use crate::catalog;
use crate::connection::ApiConnection;
use crate::keepalive::KeepaliveScheduler;
use crate::protocol::{Frame, Protocol};

/// [`ExchangeAdapter`] implementation shared by all protocols.
pub struct AdapterDriver<P: Protocol> {
    protocol: P,
    heartbeat_interval: Duration,
    keepalive: KeepaliveScheduler,
    trades_tx: TradeSender,
    http: reqwest::Client,
}

impl<P: Protocol> AdapterDriver<P> {
    pub fn new(protocol: P, heartbeat_interval: Duration, trades_tx: TradeSender) -> Self {
        Self { protocol, heartbeat_interval, keepalive: KeepaliveScheduler::new(), trades_tx, http: reqwest::Client::new() }
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn keepalive(&self) -> &KeepaliveScheduler {
        &self.keepalive
    }

    fn handle(&self, conn: &ApiConnection, frame: Frame) -> bool {
        let id = self.protocol.id();
        match frame {
            Frame::Ack { id: request_id } => {
                debug!("[{id}] ack for request {request_id:?} on connection {}", conn.id());
                true
            }
            Frame::Error { code, message } => {
                let err = FeedError::Protocol { code, message };
                warn!("[{id}] connection {}: {err}", conn.id());
                false
            }
            Frame::Snapshot { channel } => {
                debug!("[{id}] discarding snapshot on {channel}");
                true
            }
            Frame::Trades { channel, trades } => {
                if trades.is_empty() {
                    debug!("[{id}] no trades in notification on {channel}");
                } else {
                    self.emit(conn, trades);
                }
                true
            }
            Frame::Ignored => true,
        }
    }

    fn emit(&self, conn: &ApiConnection, trades: Vec<Trade>) {
        let batch = TradeBatch { connection_id: conn.id(), trades };
        if self.trades_tx.send(batch).is_err() {
            warn!("[{}] trade sink closed, dropping batch from connection {}", self.protocol.id(), conn.id());
        }
    }
}

#[async_trait]
impl<P: Protocol> ExchangeAdapter for AdapterDriver<P> {
    fn id(&self) -> &str {
        self.protocol.id()
    }

    async fn get_url(&self) -> String {
        self.protocol.ws_url().to_string()
    }

    fn subscribe(&self, conn: &ApiConnection, pair: &str) -> bool {
        let channel = self.protocol.channel_name(pair);
        if !conn.add_subscription(pair, &channel) {
            debug!("[{}] {pair} already subscribed on connection {}", self.id(), conn.id());
            return true;
        }

        let frame = self.protocol.build_subscribe_frame(&channel, conn.next_request_id());
        match conn.send(frame) {
            Ok(()) => {
                info!("[{}] subscribed {channel} on connection {}", self.id(), conn.id());
                true
            }
            Err(e) => {
                conn.remove_subscription(pair);
                warn!("[{}] subscribe {channel} failed: {e}", self.id());
                false
            }
        }
    }

    fn unsubscribe(&self, conn: &ApiConnection, pair: &str) -> bool {
        let Some(channel) = conn.remove_subscription(pair) else {
            debug!("[{}] {pair} not subscribed on connection {}", self.id(), conn.id());
            return false;
        };

        let frame = self.protocol.build_unsubscribe_frame(&channel, conn.next_request_id());
        match conn.send(frame) {
            Ok(()) => {
                info!("[{}] unsubscribed {channel} on connection {}", self.id(), conn.id());
                true
            }
            Err(e) => {
                warn!("[{}] unsubscribe {channel} failed: {e}", self.id());
                false
            }
        }
    }

    fn on_message(&self, raw: &str, conn: &ApiConnection) -> bool {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("[{}] unparseable frame on connection {}: {}", self.id(), conn.id(), FeedError::from(e));
                return false;
            }
        };

        match self.protocol.classify_frame(&value) {
            Ok(frame) => self.handle(conn, frame),
            Err(e) => {
                warn!("[{}] rejected frame on connection {}: {e}", self.id(), conn.id());
                false
            }
        }
    }

    fn on_api_created(&self, conn: &ApiConnection) {
        self.keepalive.start(conn, self.protocol.heartbeat_frame(), self.heartbeat_interval);
    }

    fn on_api_removed(&self, conn: &ApiConnection) {
        self.keepalive.stop(conn.id());
        let dropped = conn.clear_subscriptions();
        if dropped > 0 {
            debug!("[{}] connection {} closed with {dropped} subscription(s)", self.id(), conn.id());
        }
    }

    fn format_trade(&self, pair: &str, raw: &Value) -> Option<Trade> {
        self.protocol.format_trade(pair, raw)
    }

    fn format_products(&self, catalog: Option<&Value>) -> Vec<String> {
        self.protocol.parse_catalog(catalog)
    }

    async fn fetch_products(&self) -> Vec<String> {
        let url = self.protocol.products_url();
        match catalog::fetch_listing(&self.http, url).await {
            Ok(body) => self.format_products(Some(&body)),
            Err(e) => {
                warn!("[{}] {e}, using fallback catalog", self.id());
                self.format_products(None)
            }
        }
    }
}
