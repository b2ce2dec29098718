//! Binds one adapter to the sockets of a [`WsConnection`](feed_core::ws::WsConnection).
//!
//! The manager keeps the desired pair set and one [`ApiConnection`] per live
//! socket session. Opening a session subscribes every desired pair; closing it
//! releases the adapter's per-connection state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use feed_core::ConnectionId;
use feed_core::ws::{OutboundSender, WsHandler};
use tracing::{debug, info};

use crate::ExchangeAdapter;
use crate::connection::ApiConnection;

pub struct ConnectionManager {
    adapter: Arc<dyn ExchangeAdapter>,
    pairs: Mutex<Vec<String>>,
    connections: Mutex<AHashMap<ConnectionId, Arc<ApiConnection>>>,
}

impl ConnectionManager {
    pub fn new(adapter: Arc<dyn ExchangeAdapter>, pairs: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(pairs.len());
        for pair in pairs {
            if !unique.contains(&pair) {
                unique.push(pair);
            }
        }
        Self { adapter, pairs: Mutex::new(unique), connections: Mutex::new(AHashMap::new()) }
    }

    pub fn adapter(&self) -> &Arc<dyn ExchangeAdapter> {
        &self.adapter
    }

    /// Desired pairs, in insertion order.
    pub fn pairs(&self) -> Vec<String> {
        lock(&self.pairs).clone()
    }

    pub fn connection_count(&self) -> usize {
        lock(&self.connections).len()
    }

    /// Add `pair` to the desired set and subscribe it on every live connection.
    ///
    /// Returns `false` if the pair was already desired.
    pub fn add_pair(&self, pair: &str) -> bool {
        {
            let mut pairs = lock(&self.pairs);
            if pairs.iter().any(|p| p == pair) {
                return false;
            }
            pairs.push(pair.to_string());
        }
        for conn in self.live() {
            self.adapter.subscribe(&conn, pair);
        }
        true
    }

    /// Remove `pair` from the desired set and unsubscribe it everywhere.
    ///
    /// Returns `false` if the pair was not desired.
    pub fn remove_pair(&self, pair: &str) -> bool {
        {
            let mut pairs = lock(&self.pairs);
            let Some(pos) = pairs.iter().position(|p| p == pair) else {
                return false;
            };
            pairs.remove(pos);
        }
        for conn in self.live() {
            self.adapter.unsubscribe(&conn, pair);
        }
        true
    }

    /// Unsubscribe every subscribed pair on every live connection, keeping
    /// the desired set. Returns the number of unsubscribe frames sent.
    pub fn unsubscribe_all(&self) -> usize {
        let mut sent = 0;
        for conn in self.live() {
            for pair in conn.subscribed_pairs() {
                if self.adapter.unsubscribe(&conn, &pair) {
                    sent += 1;
                }
            }
        }
        sent
    }

    fn live(&self) -> Vec<Arc<ApiConnection>> {
        lock(&self.connections).values().cloned().collect()
    }

    fn get(&self, session: ConnectionId) -> Option<Arc<ApiConnection>> {
        lock(&self.connections).get(&session).cloned()
    }
}

impl WsHandler for ConnectionManager {
    fn on_open(&self, session: ConnectionId, outbound: OutboundSender) {
        let conn = Arc::new(ApiConnection::new(session, outbound));
        // Lock order: pairs, then connections. A pair change either lands in
        // this snapshot or sees the connection as live.
        let pairs = {
            let desired = lock(&self.pairs);
            lock(&self.connections).insert(session, Arc::clone(&conn));
            desired.clone()
        };

        self.adapter.on_api_created(&conn);
        let subscribed = pairs.iter().filter(|pair| self.adapter.subscribe(&conn, pair)).count();

        // A remove_pair racing with the loop above may have unsubscribed
        // before we subscribed.
        let desired = self.pairs();
        for pair in pairs.iter().filter(|p| !desired.contains(p)) {
            self.adapter.unsubscribe(&conn, pair);
        }
        info!("[{}] session {session} open, {subscribed}/{} pair(s) subscribed", self.adapter.id(), pairs.len());
    }

    fn on_text(&self, session: ConnectionId, text: &str) {
        match self.get(session) {
            Some(conn) => {
                self.adapter.on_message(text, &conn);
            }
            None => debug!("[{}] frame for unknown session {session}", self.adapter.id()),
        }
    }

    fn on_close(&self, session: ConnectionId) {
        let removed = lock(&self.connections).remove(&session);
        if let Some(conn) = removed {
            self.adapter.on_api_removed(&conn);
            info!("[{}] session {session} closed", self.adapter.id());
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
