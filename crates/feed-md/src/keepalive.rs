//! Per-connection keepalive scheduling.
//!
//! Each connection has at most one heartbeat task. The task handle lives in a
//! side table keyed by connection id, so the scheduler can be shared by every
//! connection an adapter serves.
//!
//! ```text
//! stopped ──start()──► running ──stop()──► stopped
//!            running ──start()──► running   (no-op)
//!            stopped ──stop()───► stopped   (no-op)
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ahash::AHashMap;
use feed_core::ConnectionId;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::connection::ApiConnection;

/// Periodic heartbeat emitter for many connections.
#[derive(Default)]
pub struct KeepaliveScheduler {
    tasks: Mutex<AHashMap<ConnectionId, JoinHandle<()>>>,
}

impl KeepaliveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `payload` on `conn` every `interval`, first send after one interval.
    ///
    /// Returns `false` without scheduling anything if a heartbeat is already
    /// running for this connection or `interval` is zero. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, conn: &ApiConnection, payload: String, interval: Duration) -> bool {
        let id = conn.id();
        if interval.is_zero() {
            warn!("[keepalive] refusing zero interval for connection {id}");
            return false;
        }

        let mut tasks = self.lock();
        if tasks.get(&id).is_some_and(|task| !task.is_finished()) {
            debug!("[keepalive] already running for connection {id}");
            return false;
        }

        let outbound = conn.outbound();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // skip the immediate first tick

            loop {
                ticker.tick().await;
                if outbound.send(payload.clone()).is_err() {
                    debug!("[keepalive] connection {id} closed, heartbeat stopped");
                    break;
                }
            }
        });

        tasks.insert(id, task);
        debug!("[keepalive] started for connection {id} every {interval:?}");
        true
    }

    /// Cancel the heartbeat for `id`. Returns `false` if none was scheduled.
    pub fn stop(&self, id: ConnectionId) -> bool {
        match self.lock().remove(&id) {
            Some(task) => {
                task.abort();
                debug!("[keepalive] stopped for connection {id}");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, id: ConnectionId) -> bool {
        self.lock().get(&id).is_some_and(|task| !task.is_finished())
    }

    /// Number of scheduled heartbeats, including ones whose connection has
    /// gone away but were not stopped yet.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, AHashMap<ConnectionId, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for KeepaliveScheduler {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}
