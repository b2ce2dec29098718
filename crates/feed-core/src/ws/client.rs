//! Reconnecting WebSocket session runner.
//!
//! A [`WsConnection`] owns one background task per socket slot. The task
//! keeps a socket open for as long as it is not shut down:
//!
//! ```text
//! connect ──ok──► on_open ──► read/write ──closed──► on_close ──► backoff ──► connect
//!    └──err──► backoff ──► connect
//! ```
//!
//! Every (re)connect is a new session with a fresh [`ConnectionId`] and a
//! fresh outbound queue, so handler state keyed by session never leaks from
//! one socket into the next.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::FeedError;
use crate::types::ConnectionId;

/// Outbound text frame queue for one open socket.
pub type OutboundSender = mpsc::UnboundedSender<String>;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Lifecycle hooks invoked by the connection task.
///
/// Hooks run on the connection task and must not block.
pub trait WsHandler: Send + Sync + 'static {
    /// Socket is open. Frames sent on `outbound` are written in order.
    fn on_open(&self, session: ConnectionId, outbound: OutboundSender);
    /// One inbound text frame.
    fn on_text(&self, session: ConnectionId, text: &str);
    /// Socket closed (error, remote close or shutdown).
    fn on_close(&self, session: ConnectionId);
}

#[derive(Debug, Clone)]
pub struct WsConnConfig {
    /// e.g. `wss://testnet.thalex.com/ws/api/v2`
    pub url: String,
    /// Socket slot. Session ids of this slot start at `id * SESSION_STRIDE`.
    pub id: usize,
}

/// Session id spacing between connection slots.
pub const SESSION_STRIDE: ConnectionId = 1 << 32;

/// Exponential reconnect delay, 100 ms doubling up to 30 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
}

impl Backoff {
    pub const INITIAL: Duration = Duration::from_millis(100);
    pub const MAX: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self { current: Self::INITIAL }
    }

    /// Delay to wait now; the following call returns twice as much.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(Self::MAX);
        delay
    }

    pub fn reset(&mut self) {
        self.current = Self::INITIAL;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// One socket slot managed by a background tokio task.
pub struct WsConnection {
    pub config: WsConnConfig,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl WsConnection {
    pub fn new(config: WsConnConfig) -> Self {
        Self { config, shutdown: None, handle: None }
    }

    /// Spawn the session task. Calling `start` on a running connection does
    /// nothing.
    pub fn start(&mut self, handler: Arc<dyn WsHandler>) {
        if self.handle.is_some() {
            warn!("[ws-{}] already started", self.config.id);
            return;
        }
        let (tx, rx) = watch::channel(false);
        let config = self.config.clone();
        self.handle = Some(tokio::spawn(run(config, handler, rx)));
        self.shutdown = Some(tx);
    }

    /// Signal shutdown, flush queued frames and wait for the task to exit.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("[ws-{}] task ended abnormally: {e}", self.config.id);
            }
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Disconnected,
}

async fn run(config: WsConnConfig, handler: Arc<dyn WsHandler>, mut shutdown: watch::Receiver<bool>) {
    let slot = config.id;
    let mut session = slot as ConnectionId * SESSION_STRIDE;
    let mut backoff = Backoff::new();

    while !*shutdown.borrow() {
        info!("[ws-{slot}] connecting to {}", config.url);

        match connect_ws(&config).await {
            Ok(stream) => {
                backoff.reset();
                info!("[ws-{slot}] connected to {} (session {session})", extract_host(&config.url));

                let end = run_session(slot, session, stream, handler.as_ref(), &mut shutdown).await;
                handler.on_close(session);
                session += 1;
                if end == SessionEnd::Shutdown {
                    break;
                }
                let delay = backoff.next_delay();
                warn!("[ws-{slot}] disconnected, reconnecting in {delay:?}");
                if !sleep_or_shutdown(delay, &mut shutdown).await {
                    break;
                }
            }
            Err(e) => {
                let delay = backoff.next_delay();
                error!("[ws-{slot}] {e}, retrying in {delay:?}");
                if !sleep_or_shutdown(delay, &mut shutdown).await {
                    break;
                }
            }
        }
    }
    info!("[ws-{slot}] stopped");
}

/// Pump one open socket until it closes or shutdown is signalled.
async fn run_session(
    slot: usize,
    session: ConnectionId,
    stream: WsStream,
    handler: &dyn WsHandler,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut sink, mut source) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    handler.on_open(session, outbound_tx);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                // Flush frames queued by the handler (unsubscribes) before closing.
                while let Ok(frame) = outbound_rx.try_recv() {
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                let _ = sink.close().await;
                return SessionEnd::Shutdown;
            }

            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => handler.on_text(session, &text),
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    warn!("[ws-{slot}] close frame: {frame:?}");
                    return SessionEnd::Disconnected;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("[ws-{slot}] read error: {e}");
                    return SessionEnd::Disconnected;
                }
                None => {
                    warn!("[ws-{slot}] stream ended");
                    return SessionEnd::Disconnected;
                }
            },

            Some(frame) = outbound_rx.recv() => {
                debug!("[ws-{slot}] > {frame}");
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    error!("[ws-{slot}] write error: {e}");
                    return SessionEnd::Disconnected;
                }
            }
        }
    }
}

/// Sleep for `delay`. Returns `false` if shutdown was signalled meanwhile.
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = shutdown.changed() => return false,
    }
    !*shutdown.borrow()
}

async fn connect_ws(config: &WsConnConfig) -> Result<WsStream, FeedError> {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    let request = config
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| FeedError::WebSocket(format!("invalid url {}: {e}", config.url)))?;

    let (stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| FeedError::WebSocket(format!("connect to {} failed: {e}", config.url)))?;
    Ok(stream)
}

/// Host part of `url`, empty if it does not parse.
pub fn extract_host(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.host_str().map(str::to_string).unwrap_or_default(),
        Err(_) => String::new(),
    }
}
