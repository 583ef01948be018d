/// Core Gateway implementation
use super::handlers::run_session;
use crate::config::GatewayConfig;
use crate::connection::state::SessionState;
use crate::connection::{transport, ConnectionState, SessionEnd, TransportSink};
use crate::error::{GatewayError, SessionFault};
use crate::protocol::GatewayMessage;
use derailed_events::EventBus;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Buffered faults per subscriber before the oldest are dropped.
const FAULT_CHANNEL_CAPACITY: usize = 64;

/// State shared between the [`Gateway`] handle and its receive task.
pub(crate) struct SessionShared {
    /// Coarse state, observable through `watch`
    pub(crate) state_tx: watch::Sender<ConnectionState>,
    /// Current session, `None` until the first connect
    pub(crate) session: RwLock<Option<SessionState>>,
    /// Outbound half of the transport while it is open
    pub(crate) writer: Mutex<Option<TransportSink>>,
    /// Fault channel for problems inside the receive loop
    pub(crate) faults: broadcast::Sender<SessionFault>,
}

impl SessionShared {
    fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (faults, _) = broadcast::channel(FAULT_CHANNEL_CAPACITY);
        Self {
            state_tx,
            session: RwLock::new(None),
            writer: Mutex::new(None),
            faults,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Whether `session_id` is still the session this gateway is running.
    pub(crate) async fn is_current(&self, session_id: Uuid) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.session_id == session_id)
    }

    pub(crate) async fn set_state(&self, session_id: Uuid, state: ConnectionState) {
        if self.is_current(session_id).await {
            let previous = self.state_tx.send_replace(state);
            if previous != state {
                info!("🔄 Gateway session {} {} -> {}", session_id, previous, state);
            }
        }
    }

    pub(crate) async fn record_sequence(&self, session_id: Uuid, sequence: u64) {
        if let Some(session) = self.session.write().await.as_mut() {
            if session.session_id == session_id {
                session.sequence = Some(sequence);
            }
        }
    }

    pub(crate) async fn mark_ack(&self, session_id: Uuid) {
        if let Some(session) = self.session.write().await.as_mut() {
            if session.session_id == session_id {
                session.ack_received = true;
            }
        }
    }

    pub(crate) fn report(&self, fault: SessionFault) {
        // No subscribers is fine; the fault has already been logged
        let _ = self.faults.send(fault);
    }

    pub(crate) async fn send(&self, message: &GatewayMessage) -> Result<(), GatewayError> {
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(GatewayError::NotConnected)?;

        let text = message.encode()?;
        debug!("📤 Sending op {} ({} bytes)", message.op, text.len());
        sink.send(Message::text(text)).await?;
        Ok(())
    }

    pub(crate) async fn identify(&self) -> Result<(), GatewayError> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.token.clone())
            .ok_or(GatewayError::NotConnected)?;

        self.send(&GatewayMessage::identify(&token)).await
    }

    /// Tears down the transport once the receive loop of `session_id` ends.
    pub(crate) async fn finish(&self, session_id: Uuid) -> Option<u64> {
        let session = self.session.read().await;
        let Some(session) = session.as_ref().filter(|s| s.session_id == session_id) else {
            return None;
        };
        let last_sequence = session.sequence;

        self.writer.lock().await.take();
        let previous = self.state_tx.send_replace(ConnectionState::Disconnected);
        info!("🔄 Gateway session {} {} -> {}", session_id, previous, ConnectionState::Disconnected);
        last_sequence
    }
}

/// Client for one logical gateway session over a WebSocket.
///
/// The gateway owns the transport, runs the HELLO → identify → READY
/// handshake from a background receive task, routes dispatches to its
/// [`EventBus`] and exposes [`Gateway::send`] for outbound messages.
///
/// # Examples
///
/// ```rust,no_run
/// use derailed_gateway::{ConnectionState, Gateway, GatewayConfig};
/// use derailed_events::Ready;
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let gateway = Gateway::new(GatewayConfig::new("wss://gateway.example.com"));
///
///     gateway.events().on(|ready: Ready| async move {
///         println!("ready: {}", ready.payload);
///         Ok(())
///     }).await?;
///
///     gateway.connect("my-token").await?;
///     gateway.wait_for_state(ConnectionState::Ready).await?;
///
///     let end = gateway.wait_until_closed().await?;
///     println!("session ended: {:?}", end.reason);
///     Ok(())
/// }
/// ```
pub struct Gateway {
    config: GatewayConfig,
    events: Arc<EventBus>,
    shared: Arc<SessionShared>,
    task: Mutex<Option<JoinHandle<SessionEnd>>>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("state", &self.shared.state())
            .finish()
    }
}

impl Gateway {
    /// Creates a disconnected gateway with its own event bus.
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_event_bus(config, Arc::new(EventBus::new()))
    }

    /// Creates a disconnected gateway that delivers to an existing bus.
    pub fn with_event_bus(config: GatewayConfig, events: Arc<EventBus>) -> Self {
        Self {
            config,
            events,
            shared: Arc::new(SessionShared::new()),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Event bus that receives READY and every dispatch.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Opens the configured transport and starts a session with `token`.
    ///
    /// The WebSocket (or proxy tunnel) is opened here; the HELLO, identify and
    /// READY exchange continues on the background receive task. Any previous
    /// session is aborted first.
    ///
    /// # Arguments
    ///
    /// * `token` - Authentication token sent in the identify request
    ///
    /// # Returns
    ///
    /// `Ok(())` once the transport is open and the session is awaiting HELLO.
    /// Fails with [`GatewayError::EmptyToken`] for an empty token, or with the
    /// URI, proxy or transport error that prevented the connection. Use
    /// [`Gateway::wait_for_state`] to observe the handshake.
    pub async fn connect(&self, token: &str) -> Result<(), GatewayError> {
        validate_token(token)?;
        info!("🌐 Connecting to gateway {}", self.config.uri);

        let stream = transport::open(&self.config).await?;
        let (sink, stream) = stream.split();
        self.attach(sink, stream, token).await
    }

    /// Starts a session over an already-open transport.
    ///
    /// This is what [`Gateway::connect`] does after the WebSocket handshake,
    /// and it is the seam for custom or in-memory transports.
    pub async fn attach<Si, St>(&self, sink: Si, stream: St, token: &str) -> Result<(), GatewayError>
    where
        Si: Sink<Message, Error = tungstenite::Error> + Send + 'static,
        St: Stream<Item = Result<Message, tungstenite::Error>> + Send + 'static,
    {
        validate_token(token)?;

        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            debug!("🛑 Aborting previous gateway session");
            previous.abort();
        }

        let session_id = Uuid::new_v4();
        *self.shared.session.write().await = Some(SessionState::new(session_id, token));
        *self.shared.writer.lock().await = Some(Box::pin(sink));
        self.shared.state_tx.send_replace(ConnectionState::AwaitingHello);
        info!("🔌 Gateway session {} open, awaiting hello", session_id);

        *task = Some(tokio::spawn(run_session(
            self.shared.clone(),
            self.events.clone(),
            Box::pin(stream),
            session_id,
        )));
        Ok(())
    }

    /// Serializes `message` and writes it to the transport.
    ///
    /// Fails with [`GatewayError::NotConnected`] when no transport is open.
    pub async fn send(&self, message: &GatewayMessage) -> Result<(), GatewayError> {
        self.shared.send(message).await
    }

    /// Sends the identify request with the token stored by `connect`.
    pub async fn identify(&self) -> Result<(), GatewayError> {
        self.shared.identify().await
    }

    /// Sends a Close frame and waits for the peer to finish the close.
    ///
    /// # Arguments
    ///
    /// * `grace` - How long to wait for the receive task to end after the
    ///   Close frame is written
    ///
    /// # Returns
    ///
    /// How the session ended. When the peer stays silent for `grace`, the
    /// receive task is aborted, the session is torn down as `Disconnected`
    /// and [`GatewayError::CloseTimeout`] is returned.
    pub async fn close(&self, grace: Duration) -> Result<SessionEnd, GatewayError> {
        {
            let mut writer = self.shared.writer.lock().await;
            let sink = writer.as_mut().ok_or(GatewayError::NotConnected)?;
            sink.send(Message::Close(None)).await?;
        }

        let mut handle = self
            .task
            .lock()
            .await
            .take()
            .ok_or(GatewayError::NotConnected)?;

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(joined) => joined.map_err(|e| GatewayError::SessionTask(e.to_string())),
            Err(_) => {
                warn!("⏰ Gateway did not answer the close within {:?}", grace);
                handle.abort();
                if let Some(session_id) = self.session_id().await {
                    self.shared.finish(session_id).await;
                }
                Err(GatewayError::CloseTimeout(grace))
            }
        }
    }

    /// Waits for the current receive task to end and returns how it ended.
    ///
    /// Only one caller can wait for a given session.
    pub async fn wait_until_closed(&self) -> Result<SessionEnd, GatewayError> {
        let handle = self
            .task
            .lock()
            .await
            .take()
            .ok_or(GatewayError::NotConnected)?;

        handle
            .await
            .map_err(|e| GatewayError::SessionTask(e.to_string()))
    }

    /// Whether a receive task exists and has not finished yet.
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Current coarse connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Resolves once the connection reaches `target`.
    ///
    /// Fails with [`GatewayError::NotConnected`] if the session is (or
    /// becomes) `Disconnected` before `target` is reached, unless `target`
    /// is `Disconnected` itself.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<(), GatewayError> {
        let mut receiver = self.watch_state();
        let reached = *receiver
            .wait_for(|state| *state == target || *state == ConnectionState::Disconnected)
            .await
            .map_err(|_| GatewayError::NotConnected)?;

        if reached == target {
            Ok(())
        } else {
            Err(GatewayError::NotConnected)
        }
    }

    /// Receiver for faults raised inside the receive loop.
    pub fn faults(&self) -> broadcast::Receiver<SessionFault> {
        self.shared.faults.subscribe()
    }

    /// Latest sequence number received in the current session.
    pub async fn sequence(&self) -> Option<u64> {
        self.shared
            .session
            .read()
            .await
            .as_ref()
            .and_then(|session| session.sequence)
    }

    /// Whether an ACK has arrived in the current session.
    pub async fn ack_received(&self) -> bool {
        self.shared
            .session
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.ack_received)
    }

    /// Identifier of the current (or last) session.
    pub async fn session_id(&self) -> Option<Uuid> {
        self.shared
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.session_id)
    }
}

fn validate_token(token: &str) -> Result<(), GatewayError> {
    if token.is_empty() {
        return Err(GatewayError::EmptyToken);
    }
    Ok(())
}
