//! Connection lifecycle: owns the WebSocket session, the bounded
//! reconnection policy and the driver task pumping inbound frames into the
//! subscription slot.
//!
//! Transport failures never surface to callers as errors; they are visible
//! only through [`ConnectionManager::status`]. The one fallible call is
//! `connect` with a malformed endpoint, which is a call-site bug.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::subscription::{SubscriptionController, SubscriptionSlot};
use crate::types::{ClientFrame, ConnectionState, ConnectionStatus, ServerFrame};
use crate::validate;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reconnection policy. Defaults mirror the dashboard's transport options:
/// 1 s base delay doubling up to 5 s, five attempts, 10 s handshake timeout.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub connect_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectOptions {
    /// Delay before the given (1-based) retry attempt: base doubled per
    /// attempt, capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << shift).min(self.max_delay)
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    /// Not a `ws://` or `wss://` URL. A programming error at the call site,
    /// rejected before any connection attempt.
    #[error("invalid websocket endpoint `{0}`")]
    InvalidEndpoint(String),
}

/// State shared between the manager, its driver task and subscription
/// handles.
pub(crate) struct Shared {
    status: Mutex<ConnectionStatus>,
    /// Outbound channel of the live connection, tagged with its id so a
    /// stale driver cannot clobber a successor's channel.
    outbound: Mutex<Option<(u64, mpsc::UnboundedSender<ClientFrame>)>>,
    subs: SubscriptionSlot,
    conn_seq: AtomicU64,
}

impl Shared {
    pub(crate) fn subs(&self) -> &SubscriptionSlot {
        &self.subs
    }

    pub(crate) fn live_connection(&self) -> Option<(u64, mpsc::UnboundedSender<ClientFrame>)> {
        self.outbound.lock().unwrap().clone()
    }
}

struct DriverControl {
    shutdown: watch::Sender<bool>,
    _handle: JoinHandle<()>,
}

/// Explicit connection instance owned by the hosting view. Create, connect,
/// read status snapshots, disconnect; nothing here is module-global, so
/// tests can run independent instances side by side.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    opts: ConnectOptions,
    control: Mutex<Option<DriverControl>>,
}

impl ConnectionManager {
    pub fn new(opts: ConnectOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                status: Mutex::new(ConnectionStatus {
                    state: ConnectionState::Disconnected,
                    connection_id: None,
                    attempts: 0,
                }),
                outbound: Mutex::new(None),
                subs: SubscriptionSlot::new(),
                conn_seq: AtomicU64::new(0),
            }),
            opts,
            control: Mutex::new(None),
        }
    }

    /// Start (or restart) the session toward `endpoint`. A no-op while
    /// already connected. Resets the attempt counter, so this is also how a
    /// caller resumes after retries were exhausted. Must be called from
    /// within a tokio runtime.
    pub fn connect(&self, endpoint: &str) -> Result<(), ConnectError> {
        let url = Url::parse(endpoint)
            .map_err(|_| ConnectError::InvalidEndpoint(endpoint.to_owned()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConnectError::InvalidEndpoint(endpoint.to_owned()));
        }

        let mut control = self.control.lock().unwrap();
        if self.status().state == ConnectionState::Connected {
            debug!("connect called while already connected; keeping session");
            return Ok(());
        }
        if let Some(prior) = control.take() {
            let _ = prior.shutdown.send(true);
        }
        {
            let mut status = self.shared.status.lock().unwrap();
            status.state = ConnectionState::Connecting;
            status.connection_id = None;
            status.attempts = 0;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(drive(
            endpoint.to_owned(),
            self.shared.clone(),
            self.opts.clone(),
            shutdown_rx,
        ));
        *control = Some(DriverControl {
            shutdown: shutdown_tx,
            _handle: handle,
        });
        Ok(())
    }

    /// Tear the session down: cancels any pending backoff timer, stops the
    /// driver and never re-triggers reconnection. Idempotent and safe to
    /// call from inside a delivery callback.
    pub fn disconnect(&self) {
        let prior = self.control.lock().unwrap().take();
        if let Some(prior) = prior {
            let _ = prior.shutdown.send(true);
        }
        *self.shared.outbound.lock().unwrap() = None;
        let mut status = self.shared.status.lock().unwrap();
        status.state = ConnectionState::Disconnected;
        status.connection_id = None;
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.lock().unwrap().clone()
    }

    /// Handle for the single live-data subscription on this connection.
    pub fn subscription(&self) -> SubscriptionController {
        SubscriptionController::new(self.shared.clone())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(ConnectOptions::default())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

enum SessionEnd {
    Shutdown,
    ServerClose,
    TransportError,
}

async fn drive(
    endpoint: String,
    shared: Arc<Shared>,
    opts: ConnectOptions,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;
    loop {
        debug!(%endpoint, attempt, "opening websocket");
        let handshake = tokio::time::timeout(opts.connect_timeout, connect_async(endpoint.as_str()));
        let outcome = tokio::select! {
            _ = shutdown.changed() => return,
            outcome = handshake => outcome,
        };
        let ws = match outcome {
            Ok(Ok((ws, _))) => ws,
            Ok(Err(err)) => {
                warn!(error = %err, "websocket handshake failed");
                attempt += 1;
                if !note_failure(&shared, attempt, &opts) {
                    return;
                }
                if !wait_backoff(&opts, attempt, &mut shutdown).await {
                    return;
                }
                continue;
            }
            Err(_) => {
                warn!(
                    timeout_ms = opts.connect_timeout.as_millis() as u64,
                    "websocket handshake timed out"
                );
                attempt += 1;
                if !note_failure(&shared, attempt, &opts) {
                    return;
                }
                if !wait_backoff(&opts, attempt, &mut shutdown).await {
                    return;
                }
                continue;
            }
        };

        attempt = 0;
        let connection_id = shared.conn_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        *shared.outbound.lock().unwrap() = Some((connection_id, outbound_tx.clone()));
        {
            let mut status = shared.status.lock().unwrap();
            status.state = ConnectionState::Connected;
            status.connection_id = Some(connection_id);
            status.attempts = 0;
        }
        info!(connection_id, "connected");

        // The server forgets interest on every transport reset: reissue the
        // queued subscription for this connection (at most once).
        if let Some(frame) = shared.subs.replay_frame(connection_id) {
            let _ = outbound_tx.send(frame);
        }

        let end = run_session(ws, &shared, outbound_rx, &mut shutdown).await;

        {
            let mut outbound = shared.outbound.lock().unwrap();
            if matches!(&*outbound, Some((id, _)) if *id == connection_id) {
                *outbound = None;
            }
        }

        match end {
            SessionEnd::Shutdown => return,
            SessionEnd::ServerClose => {
                {
                    let mut status = shared.status.lock().unwrap();
                    status.state = ConnectionState::Reconnecting;
                    status.connection_id = None;
                }
                // A deliberate server close is not a network fault: retry
                // immediately instead of waiting out the backoff.
                info!("server closed the connection; reconnecting immediately");
            }
            SessionEnd::TransportError => {
                attempt += 1;
                if !note_failure(&shared, attempt, &opts) {
                    return;
                }
                if !wait_backoff(&opts, attempt, &mut shutdown).await {
                    return;
                }
            }
        }
    }
}

/// Record a failed attempt. Returns whether the driver should keep trying;
/// on exhaustion the state goes terminal until an explicit `connect`.
fn note_failure(shared: &Shared, attempt: u32, opts: &ConnectOptions) -> bool {
    let exhausted = attempt >= opts.max_attempts;
    {
        let mut status = shared.status.lock().unwrap();
        status.connection_id = None;
        status.attempts = attempt;
        status.state = if exhausted {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Reconnecting
        };
    }
    if exhausted {
        warn!(attempts = attempt, "reconnection attempts exhausted; going idle until an explicit connect");
    }
    !exhausted
}

async fn wait_backoff(
    opts: &ConnectOptions,
    attempt: u32,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let delay = opts.backoff_delay(attempt);
    debug!(attempt, delay_ms = delay.as_millis() as u64, "waiting before reconnect");
    tokio::select! {
        _ = shutdown.changed() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

async fn run_session(
    ws: WsStream,
    shared: &Arc<Shared>,
    mut outbound: mpsc::UnboundedReceiver<ClientFrame>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                // Best-effort goodbye; the server requires no acknowledgment.
                let _ = sink.send(Message::Close(None)).await;
                return SessionEnd::Shutdown;
            }
            frame = outbound.recv() => {
                // The driver keeps a sender alive for the whole session, so
                // recv yields None only during teardown.
                let Some(frame) = frame else { return SessionEnd::Shutdown };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "failed to encode outbound frame");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    return SessionEnd::TransportError;
                }
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_frame(&text, shared),
                Some(Ok(Message::Close(_))) => return SessionEnd::ServerClose,
                Some(Ok(_)) => {} // binary/ping/pong
                Some(Err(err)) => {
                    warn!(error = %err, "websocket transport error");
                    return SessionEnd::TransportError;
                }
                None => return SessionEnd::TransportError,
            },
        }
    }
}

fn handle_frame(text: &str, shared: &Arc<Shared>) {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::BandwidthData { data }) => {
            let batch = validate::validate(&data);
            if batch.dropped > 0 {
                warn!(
                    dropped = batch.dropped,
                    kept = batch.samples.len(),
                    "dropped invalid samples from live batch"
                );
            }
            shared.subs.deliver(&batch.samples);
        }
        Ok(ServerFrame::Error { data }) => warn!(payload = %data, "server error event"),
        Ok(ServerFrame::Warning { data }) => warn!(payload = %data, "server warning event"),
        Ok(ServerFrame::Unknown) => debug!("ignoring unrecognized event"),
        Err(err) => debug!(error = %err, "ignoring unparseable frame"),
    }
}
