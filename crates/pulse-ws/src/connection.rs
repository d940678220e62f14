//! WebSocket connection manager.
//!
//! Owns the transport lifecycle for one ticker stream:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Reconnecting -> Connecting -> ...
//!                                                 \-> MaxRetriesExhausted
//! ```
//!
//! Each `connect()` runs one session on a Tokio task. A session loops over
//! connection attempts, waiting `base_delay * attempt` between them, until
//! the retry ceiling is hit or the caller disconnects. Only one transport is
//! open at a time: a new session first waits for the previous one to finish.

use crate::error::{WsError, WsResult};
use crate::message::{parse_frame, RawTick};
use crate::reconnect::ReconnectPolicy;
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// All-market 24h ticker stream.
pub const DEFAULT_TICKER_URL: &str = "wss://stream.binance.com:9443/ws/!ticker@arr";

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Retries allowed after a close before giving up.
    pub max_reconnect_attempts: u32,
    /// Base delay for linear backoff.
    pub reconnect_base_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TICKER_URL.to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Terminal for the current session; only a new `connect()` leaves it.
    MaxRetriesExhausted,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::MaxRetriesExhausted => "max_retries_exhausted",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of parsed frames and state transitions.
///
/// Both callbacks run synchronously on the session task and must return
/// quickly. They are invoked while the connector holds its handler slot,
/// so they must not call `connect` or `disconnect` on the same manager.
pub trait FrameHandler: Send + Sync {
    /// One accepted frame, in arrival order.
    fn on_frame(&self, ticks: Vec<RawTick>);

    /// Connector state changed.
    fn on_state_change(&self, _state: ConnectionState) {}
}

/// Connection counters.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    reconnect_attempts: AtomicU64,
    connections_opened: AtomicU64,
}

impl ConnectionStats {
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_open(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Text frames received, including dropped ones.
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Frames dropped because they were not valid JSON.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    /// Reconnects scheduled over the manager's lifetime.
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Successful transport opens over the manager's lifetime.
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }
}

/// How a single connection ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    /// Stream ended; reconnect.
    Closed,
    /// Caller disconnected; stop.
    Cancelled,
}

/// State shared between the manager and its session task.
struct Shared {
    config: ConnectionConfig,
    state: RwLock<ConnectionState>,
    reconnect_count: RwLock<u32>,
    handler: Mutex<Option<Arc<dyn FrameHandler>>>,
    stats: ConnectionStats,
}

impl Shared {
    /// Move to `new` unless the session was cancelled.
    ///
    /// The cancellation check happens under the state lock, so a session
    /// cancelled by `disconnect()` can never overwrite the caller's state.
    fn transition(&self, token: &CancellationToken, new: ConnectionState) -> bool {
        {
            let mut state = self.state.write();
            if token.is_cancelled() {
                return false;
            }
            if *state == new {
                return true;
            }
            debug!(from = %*state, to = %new, "Connection state transition");
            *state = new;
        }

        let guard = self.handler.lock();
        if !token.is_cancelled() {
            if let Some(handler) = guard.as_ref() {
                handler.on_state_change(new);
            }
        }
        true
    }

    fn deliver(&self, token: &CancellationToken, ticks: Vec<RawTick>) {
        let guard = self.handler.lock();
        if token.is_cancelled() {
            return;
        }
        if let Some(handler) = guard.as_ref() {
            handler.on_frame(ticks);
        }
    }

    fn handle_text_frame(&self, token: &CancellationToken, text: &str) {
        self.stats.record_frame();

        match parse_frame(text) {
            Ok(Some(ticks)) => self.deliver(token, ticks),
            Ok(None) => {}
            Err(e) => {
                self.stats.record_dropped();
                warn!(error = %e, len = text.len(), "Dropping malformed frame");
            }
        }
    }

    async fn run_connection(
        &self,
        token: &CancellationToken,
        policy: &mut ReconnectPolicy,
    ) -> WsResult<ConnectionEnd> {
        info!(url = %self.config.url, "Connecting to WebSocket");

        let (ws_stream, _response) = tokio::select! {
            biased;
            () = token.cancelled() => return Ok(ConnectionEnd::Cancelled),
            result = connect_async_tls_with_config(&self.config.url, None, true, None) => result?,
        };
        let (mut write, mut read) = ws_stream.split();

        policy.reset();
        *self.reconnect_count.write() = 0;
        self.stats.record_open();
        if !self.transition(token, ConnectionState::Connected) {
            let _ = write.send(Message::Close(None)).await;
            return Ok(ConnectionEnd::Cancelled);
        }
        info!("WebSocket connected");

        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    info!("Disconnect requested, closing WebSocket");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Failed to send Close frame");
                    }
                    return Ok(ConnectionEnd::Cancelled);
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_frame(token, &text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "WebSocket closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok(ConnectionEnd::Closed);
                        }
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }
}

/// Run one session: connect, then reconnect with backoff until cancelled
/// or out of retries.
async fn run_session(
    shared: Arc<Shared>,
    token: CancellationToken,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        let _ = previous.await;
    }

    let mut policy = ReconnectPolicy::new(
        shared.config.reconnect_base_delay_ms,
        shared.config.max_reconnect_attempts,
    );

    loop {
        if token.is_cancelled() {
            return;
        }
        shared.transition(&token, ConnectionState::Connecting);

        match shared.run_connection(&token, &mut policy).await {
            Ok(ConnectionEnd::Cancelled) => {
                debug!("Session cancelled");
                return;
            }
            Ok(ConnectionEnd::Closed) => {
                info!("WebSocket connection closed");
            }
            Err(e) => {
                warn!(error = %e, "WebSocket connection lost");
            }
        }

        if token.is_cancelled() {
            return;
        }

        let Some(delay) = policy.next_delay() else {
            error!(
                attempts = policy.attempts(),
                "Max reconnection attempts reached"
            );
            shared.transition(&token, ConnectionState::MaxRetriesExhausted);
            return;
        };

        *shared.reconnect_count.write() = policy.attempts();
        shared.stats.record_reconnect_attempt();
        if !shared.transition(&token, ConnectionState::Reconnecting) {
            return;
        }
        warn!(
            attempt = policy.attempts(),
            max = policy.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            "Reconnecting"
        );

        tokio::select! {
            biased;
            () = token.cancelled() => {
                info!("Pending reconnect cancelled");
                return;
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}

#[derive(Default)]
struct SessionSlot {
    token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    session: Mutex<SessionSlot>,
}

impl ConnectionManager {
    /// Create a new connection manager. Nothing is opened until `connect`.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: RwLock::new(ConnectionState::Disconnected),
                reconnect_count: RwLock::new(0),
                handler: Mutex::new(None),
                stats: ConnectionStats::default(),
            }),
            session: Mutex::new(SessionSlot::default()),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Retries counted since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        *self.shared.reconnect_count.read()
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.shared.stats
    }

    /// Start (or keep) streaming into `handler`.
    ///
    /// Idempotent: while a session is connecting or connected, only the
    /// handler is replaced. A pending reconnect is cancelled and replaced by
    /// an immediate fresh session. From `Disconnected` or
    /// `MaxRetriesExhausted` a fresh session starts with a clean retry
    /// counter. Failures are never returned; they drive the reconnect path.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self, handler: Arc<dyn FrameHandler>) {
        let mut slot = self.session.lock();
        *self.shared.handler.lock() = Some(handler);

        let state = self.state();
        let running = slot.handle.as_ref().is_some_and(|h| !h.is_finished());
        if running
            && matches!(
                state,
                ConnectionState::Connecting | ConnectionState::Connected
            )
        {
            debug!(%state, "Session already active, handler replaced");
            return;
        }

        if let Some(token) = slot.token.take() {
            if state == ConnectionState::Reconnecting {
                info!("Cancelling pending reconnect for fresh connect");
            }
            token.cancel();
        }

        let token = CancellationToken::new();
        *self.shared.reconnect_count.write() = 0;
        self.shared.transition(&token, ConnectionState::Connecting);

        let previous = slot.handle.take();
        slot.handle = Some(tokio::spawn(run_session(
            self.shared.clone(),
            token.clone(),
            previous,
        )));
        slot.token = Some(token);
    }

    /// Caller-initiated teardown.
    ///
    /// Closes the transport if open, cancels any pending reconnect and
    /// forgets the handler. No frame or state callback is delivered after
    /// this returns, and the reconnect path is never taken.
    pub fn disconnect(&self) {
        let mut slot = self.session.lock();
        if let Some(token) = slot.token.take() {
            token.cancel();
        }
        self.shared.handler.lock().take();

        let mut state = self.shared.state.write();
        if *state != ConnectionState::Disconnected {
            info!(from = %*state, "Disconnected by caller");
        }
        *state = ConnectionState::Disconnected;
    }

    /// `disconnect()` and wait for the session task to finish closing.
    pub async fn shutdown(&self) {
        self.disconnect();
        let handle = self.session.lock().handle.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(token) = self.session.get_mut().token.take() {
            token.cancel();
        }
    }
}
