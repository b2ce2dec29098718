//! Per-connection handle shared between the connection owner and adapters.
//!
//! The connection owner creates one [`ApiConnection`] per open socket and
//! passes it to every adapter hook. Adapters never own the socket; they only
//! queue outbound frames and read/write the subscription bookkeeping stored
//! here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use feed_core::ws::OutboundSender;
use feed_core::{ConnectionId, FeedError, time_util};

/// Handle to one open exchange connection.
pub struct ApiConnection {
    id: ConnectionId,
    outbound: OutboundSender,
    /// pair → channel name.
    subscriptions: Mutex<AHashMap<String, String>>,
    next_request_id: AtomicU64,
}

impl ApiConnection {
    /// Wrap an open socket's outbound queue.
    ///
    /// Request ids start at the current wall-clock millisecond so ids stay
    /// unique across reconnects.
    pub fn new(id: ConnectionId, outbound: OutboundSender) -> Self {
        Self {
            id,
            outbound,
            subscriptions: Mutex::new(AHashMap::new()),
            next_request_id: AtomicU64::new(time_util::now_ms()),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Clone of the outbound queue, for scheduled senders.
    pub fn outbound(&self) -> OutboundSender {
        self.outbound.clone()
    }

    /// Queue a text frame on this connection.
    pub fn send(&self, frame: String) -> Result<(), FeedError> {
        self.outbound
            .send(frame)
            .map_err(|_| FeedError::Send(format!("connection {} is closed", self.id)))
    }

    /// Next control-frame request id.
    pub fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Record `pair` as subscribed on `channel`.
    ///
    /// Returns `false` if the pair was already subscribed (state unchanged).
    pub fn add_subscription(&self, pair: &str, channel: &str) -> bool {
        let mut subs = self.lock();
        if subs.contains_key(pair) {
            return false;
        }
        subs.insert(pair.to_string(), channel.to_string());
        true
    }

    /// Forget `pair`, returning the channel it was subscribed on.
    pub fn remove_subscription(&self, pair: &str) -> Option<String> {
        self.lock().remove(pair)
    }

    pub fn channel_for(&self, pair: &str) -> Option<String> {
        self.lock().get(pair).cloned()
    }

    pub fn is_subscribed(&self, pair: &str) -> bool {
        self.lock().contains_key(pair)
    }

    /// Subscribed pairs, sorted.
    pub fn subscribed_pairs(&self) -> Vec<String> {
        let mut pairs: Vec<String> = self.lock().keys().cloned().collect();
        pairs.sort();
        pairs
    }

    /// Drop all subscription state, returning how many entries were removed.
    pub fn clear_subscriptions(&self) -> usize {
        let mut subs = self.lock();
        let n = subs.len();
        subs.clear();
        n
    }

    fn lock(&self) -> MutexGuard<'_, AHashMap<String, String>> {
        self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ApiConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConnection")
            .field("id", &self.id)
            .field("subscriptions", &self.subscribed_pairs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn subscription_bookkeeping() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = ApiConnection::new(7, tx);
        assert!(conn.add_subscription("BTC-PERPETUAL", "trades.BTC-PERPETUAL"));
        assert!(!conn.add_subscription("BTC-PERPETUAL", "trades.BTC-PERPETUAL"));
        assert!(conn.add_subscription("ETH-PERPETUAL", "trades.ETH-PERPETUAL"));
        assert_eq!(conn.subscribed_pairs(), vec!["BTC-PERPETUAL", "ETH-PERPETUAL"]);
        assert_eq!(conn.channel_for("ETH-PERPETUAL").as_deref(), Some("trades.ETH-PERPETUAL"));
        assert_eq!(conn.remove_subscription("BTC-PERPETUAL").as_deref(), Some("trades.BTC-PERPETUAL"));
        assert_eq!(conn.remove_subscription("BTC-PERPETUAL"), None);
        assert_eq!(conn.clear_subscriptions(), 1);
        assert!(!conn.is_subscribed("ETH-PERPETUAL"));
    }

    #[test]
    fn request_ids_increase() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = ApiConnection::new(1, tx);
        let a = conn.next_request_id();
        let b = conn.next_request_id();
        assert_eq!(b, a + 1);
    }

    #[test]
    fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = ApiConnection::new(1, tx);
        assert!(conn.send("x".into()).is_ok());
        drop(rx);
        assert!(matches!(conn.send("y".into()), Err(FeedError::Send(_))));
    }
}
