//! The connection manager: one logical connection to the match server.
//!
//! A [`ConnectionManager`] is single-use. It is created under one epoch,
//! connected once, and torn down with [`disconnect`](ConnectionManager::disconnect).
//! A reconnect always builds a new manager.
//!
//! Lifecycle signals fan out to any number of subscribers through four
//! channels (open, error, close, message). Each subscriber gets a
//! [`Subscription`], which stops yielding as soon as the manager is torn
//! down or its epoch is superseded, even if values were already queued.
//!
//! ```text
//!   connect() ──ok──→ [open] ──→ reader task ──→ [message]* ──→ [close]
//!       └──err──→ [error]                └──recv err──→ [error] → [close 1006]
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use broadside_protocol::{ClientCommand, encode_command};
use broadside_session::{EpochToken, LiveConnection, Screen};
use broadside_transport::{CloseInfo, Connection, Connector, Frame, WebSocketConnector};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ClientError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Close policy
// ---------------------------------------------------------------------------

/// What a close means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Intentional close (1000). Nothing to surface.
    Normal,
    /// Abnormal close on a lobby screen: reconnect silently.
    Recoverable,
    /// Abnormal close anywhere else: show the error screen.
    Fatal,
}

impl ClosePolicy {
    /// Classifies a close `code` received while `screen` is active.
    pub fn classify(code: u16, screen: Screen) -> Self {
        if code == CloseInfo::NORMAL {
            Self::Normal
        } else if screen.is_lobby() {
            Self::Recoverable
        } else {
            Self::Fatal
        }
    }
}

// ---------------------------------------------------------------------------
// Listeners and subscriptions
// ---------------------------------------------------------------------------

/// Open while the manager is neither torn down nor superseded.
#[derive(Debug)]
struct Gate {
    torn_down: AtomicBool,
    token: EpochToken,
}

impl Gate {
    fn is_open(&self) -> bool {
        !self.torn_down.load(Ordering::Acquire) && self.token.is_current()
    }
}

/// A fan-out list of subscribers for one event channel.
struct Listeners<T> {
    next_id: AtomicU64,
    senders: Mutex<Vec<(u64, mpsc::UnboundedSender<T>)>>,
}

impl<T> Listeners<T> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            senders: Mutex::new(Vec::new()),
        }
    }

    fn subscribe(self: &Arc<Self>, gate: &Arc<Gate>) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // A subscriber added after teardown gets a closed channel.
        if gate.is_open() {
            lock(&self.senders).push((id, tx));
        }
        Subscription {
            id,
            rx,
            listeners: Arc::downgrade(self),
            gate: Arc::clone(gate),
        }
    }

    fn remove(&self, id: u64) {
        lock(&self.senders).retain(|(sid, _)| *sid != id);
    }

    fn clear(&self) {
        lock(&self.senders).clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.senders).len()
    }
}

impl<T: Clone> Listeners<T> {
    fn emit(&self, value: T) {
        lock(&self.senders).retain(|(_, tx)| tx.send(value.clone()).is_ok());
    }
}

/// A handle on one subscriber of a manager event channel.
///
/// Dropping the subscription unsubscribes it.
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::UnboundedReceiver<T>,
    listeners: Weak<Listeners<T>>,
    gate: Arc<Gate>,
}

impl<T> Subscription<T> {
    /// Waits for the next value.
    ///
    /// Returns `None` once the manager has been torn down or its epoch
    /// superseded. Values still queued at that point are discarded.
    pub async fn recv(&mut self) -> Option<T> {
        if !self.gate.is_open() {
            return None;
        }
        let value = self.rx.recv().await?;
        self.gate.is_open().then_some(value)
    }

    /// Stops receiving. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

/// State shared between the manager and its reader task.
struct Channels {
    gate: Arc<Gate>,
    connected: AtomicBool,
    open: Arc<Listeners<()>>,
    error: Arc<Listeners<String>>,
    close: Arc<Listeners<CloseInfo>>,
    message: Arc<Listeners<String>>,
}

impl Channels {
    fn emit<T: Clone>(&self, listeners: &Listeners<T>, value: T) {
        if self.gate.is_open() {
            listeners.emit(value);
        }
    }
}

/// Owns one logical connection to the match server.
pub struct ConnectionManager<C: Connector = WebSocketConnector> {
    connector: C,
    url: String,
    connect_timeout: Duration,
    started: AtomicBool,
    channels: Arc<Channels>,
    conn: Mutex<Option<Arc<C::Connection>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Default bound on how long [`connect`](Self::connect) may take.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates an unconnected manager bound to the epoch of `token`.
    pub fn new(connector: C, url: impl Into<String>, token: EpochToken) -> Self {
        Self {
            connector,
            url: url.into(),
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            started: AtomicBool::new(false),
            channels: Arc::new(Channels {
                gate: Arc::new(Gate {
                    torn_down: AtomicBool::new(false),
                    token,
                }),
                connected: AtomicBool::new(false),
                open: Arc::new(Listeners::new()),
                error: Arc::new(Listeners::new()),
                close: Arc::new(Listeners::new()),
                message: Arc::new(Listeners::new()),
            }),
            conn: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Establishes the connection.
    ///
    /// Resolves once the transport is ready; `open` subscribers are
    /// notified before this returns. On failure `error` subscribers are
    /// notified and no close is emitted.
    ///
    /// # Errors
    /// - [`ClientError::AlreadyStarted`] on a second call
    /// - [`ClientError::ConnectTimeout`] if readiness takes too long
    /// - [`ClientError::Transport`] if the transport fails first, or the
    ///   manager was torn down while connecting
    pub async fn connect(&self) -> Result<(), ClientError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ClientError::AlreadyStarted);
        }
        let channels = &self.channels;

        let conn = match tokio::time::timeout(self.connect_timeout, self.connector.connect(&self.url)).await {
            Ok(Ok(conn)) => Arc::new(conn),
            Ok(Err(e)) => {
                tracing::warn!(url = %self.url, error = %e, "connect failed");
                channels.emit(&channels.error, e.to_string());
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(url = %self.url, timeout_ms = self.connect_timeout.as_millis() as u64, "connect timed out");
                channels.emit(&channels.error, "connect timed out".to_owned());
                return Err(ClientError::ConnectTimeout(self.connect_timeout));
            }
        };

        if !channels.gate.is_open() {
            // Torn down while the handshake was in flight.
            if let Err(e) = conn.close().await {
                tracing::trace!(error = %e, "close after late teardown failed");
            }
            return Err(broadside_transport::TransportError::ConnectionClosed(
                "disconnected while connecting".into(),
            )
            .into());
        }

        *lock(&self.conn) = Some(Arc::clone(&conn));
        channels.connected.store(true, Ordering::Release);
        tracing::info!(id = %conn.id(), url = %self.url, epoch = channels.gate.token.epoch(), "connection open");
        channels.emit(&channels.open, ());

        let reader = tokio::spawn(read_loop(conn, Arc::clone(channels)));
        *lock(&self.reader) = Some(reader);
        Ok(())
    }

    /// Serializes and sends one command.
    ///
    /// # Errors
    /// - [`ClientError::NotConnected`] before readiness or after teardown
    /// - [`ClientError::Protocol`] if the command cannot be encoded
    /// - [`ClientError::Transport`] if delivery fails
    pub async fn send(&self, command: &ClientCommand) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let conn = lock(&self.conn).clone().ok_or(ClientError::NotConnected)?;
        let text = encode_command(command)?;
        tracing::trace!(kind = command.kind(), "send");
        conn.send_text(&text).await?;
        Ok(())
    }

    /// `true` between readiness and close or teardown.
    pub fn is_connected(&self) -> bool {
        self.channels.connected.load(Ordering::Acquire) && self.channels.gate.is_open()
    }

    /// Tears the connection down. Idempotent.
    ///
    /// No subscriber hears anything from this manager afterwards. The
    /// transport close is sent from a background task.
    pub fn disconnect(&self) {
        let channels = &self.channels;
        if channels.gate.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        channels.connected.store(false, Ordering::Release);
        channels.open.clear();
        channels.error.clear();
        channels.close.clear();
        channels.message.clear();

        if let Some(reader) = lock(&self.reader).take() {
            reader.abort();
        }
        if let Some(conn) = lock(&self.conn).take() {
            tracing::debug!(id = %conn.id(), "disconnecting");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = conn.close().await {
                        tracing::trace!(error = %e, "close after disconnect failed");
                    }
                });
            }
        }
    }

    pub fn on_open(&self) -> Subscription<()> {
        self.channels.open.subscribe(&self.channels.gate)
    }

    /// Transport errors, as text.
    pub fn on_error(&self) -> Subscription<String> {
        self.channels.error.subscribe(&self.channels.gate)
    }

    pub fn on_close(&self) -> Subscription<CloseInfo> {
        self.channels.close.subscribe(&self.channels.gate)
    }

    /// Raw inbound text frames, in arrival order.
    pub fn on_message(&self) -> Subscription<String> {
        self.channels.message.subscribe(&self.channels.gate)
    }
}

impl<C: Connector> LiveConnection for ConnectionManager<C> {
    fn disconnect(&self) {
        ConnectionManager::disconnect(self);
    }

    fn is_connected(&self) -> bool {
        ConnectionManager::is_connected(self)
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Forwards frames until the connection ends.
async fn read_loop<K: Connection>(conn: Arc<K>, channels: Arc<Channels>) {
    loop {
        match conn.recv().await {
            Ok(Frame::Text(text)) => {
                tracing::trace!(id = %conn.id(), len = text.len(), "frame");
                channels.emit(&channels.message, text);
            }
            Ok(Frame::Closed(info)) => {
                channels.connected.store(false, Ordering::Release);
                if info.is_normal() {
                    tracing::info!(id = %conn.id(), close = %info, "connection closed");
                } else {
                    tracing::warn!(id = %conn.id(), close = %info, "connection closed abnormally");
                }
                channels.emit(&channels.close, info);
                return;
            }
            Err(e) => {
                channels.connected.store(false, Ordering::Release);
                tracing::warn!(id = %conn.id(), error = %e, "connection failed");
                channels.emit(&channels.error, e.to_string());
                channels.emit(&channels.close, CloseInfo::abnormal(e.to_string()));
                return;
            }
        }
    }
}
