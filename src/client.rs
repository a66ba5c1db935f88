//! Async client for the Fourline game protocol.
//!
//! [`FourlineClient`] is a thin handle that communicates with a background
//! transport loop task via an unbounded MPSC channel. The loop owns the
//! [`SessionController`]; every processed input (user intent, server frame,
//! transport change, timer firing) runs one transition and then emits a fresh
//! [`ClientEvent::View`] on a bounded channel returned from
//! [`FourlineClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//! let (client, mut events) = FourlineClient::start(transport, FourlineConfig::new());
//!
//! client.set_identity("alice")?;
//! client.quick_match()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::View(view) => { /* render */ }
//!         ClientEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::codec;
use crate::error::{FourlineError, Result};
use crate::session::{Action, SessionController, TimerKind, TransportStatus, UserIntent};
use crate::transport::Transport;
use crate::view::{project, ViewModel};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default delay between a finished game and the automatic session reset.
const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(10);

/// Default delay between a server-reported error and the forced reset.
const DEFAULT_ERROR_RESET_DELAY: Duration = Duration::from_secs(3);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`FourlineClient`].
///
/// All fields have sensible defaults; [`FourlineConfig::new`] is enough for
/// ordinary use.
///
/// # Tuning
///
/// ```
/// use fourline_client::client::FourlineConfig;
/// use std::time::Duration;
///
/// let config = FourlineConfig::new()
///     .with_event_channel_capacity(512)
///     .with_reset_delay(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct FourlineConfig {
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up, events are dropped (with a warning
    /// logged) to avoid blocking the transport loop. The `Disconnected`
    /// event is always delivered regardless of capacity.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful shutdown.
    ///
    /// When [`FourlineClient::shutdown`] is called, the background transport
    /// loop is given this much time to close the transport and emit a final
    /// `Disconnected` event. If the timeout expires the task is aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// How long a finished game stays on screen before the session resets.
    ///
    /// Defaults to **10 seconds**, matching the redirect countdown shown in
    /// the game-over announcement.
    pub reset_delay: Duration,
    /// How long a server-reported error stays on screen before the forced
    /// reset. Defaults to **3 seconds**.
    pub error_reset_delay: Duration,
}

impl FourlineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            reset_delay: DEFAULT_RESET_DELAY,
            error_reset_delay: DEFAULT_ERROR_RESET_DELAY,
        }
    }

    /// Set the capacity of the bounded event channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the delay before the post-game session reset.
    #[must_use]
    pub fn with_reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    /// Set the delay before the post-error forced reset.
    #[must_use]
    pub fn with_error_reset_delay(mut self, delay: Duration) -> Self {
        self.error_reset_delay = delay;
        self
    }
}

impl Default for FourlineConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Events ──────────────────────────────────────────────────────────

/// Events delivered to the consumer of a [`FourlineClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The transport loop is running.
    Connected,
    /// A fresh projection of the session, emitted after every transition.
    View(Box<ViewModel>),
    /// The leaderboard / room-list panels should refresh now.
    RefreshPanels,
    /// The transport loop has ended. Always the last event on the channel.
    Disconnected { reason: Option<String> },
}

// ── Shared state ────────────────────────────────────────────────────

/// Internal shared state between the client handle and the transport loop.
struct ClientState {
    connected: AtomicBool,
}

impl ClientState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
        }
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for the Fourline game protocol.
///
/// Created via [`FourlineClient::start`], which spawns a background transport
/// loop and returns this handle together with an event receiver.
///
/// All public methods queue a [`UserIntent`] to the transport loop over an
/// unbounded channel and return immediately (no round-trip await). Whether
/// an intent has any effect is decided by the session controller; for
/// example a move submitted off-turn is silently dropped.
pub struct FourlineClient {
    /// Sender half of the intent channel to the transport loop.
    cmd_tx: mpsc::UnboundedSender<UserIntent>,
    /// Shared state updated by the transport loop.
    state: Arc<ClientState>,
    /// Handle to the background transport loop task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Oneshot sender to signal the transport loop to shut down gracefully.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Timeout for the graceful shutdown.
    shutdown_timeout: Duration,
}

impl FourlineClient {
    /// Start the client transport loop and return a handle plus event receiver.
    ///
    /// # Arguments
    ///
    /// * `transport` — A connected [`Transport`] implementation.
    /// * `config` — Client configuration.
    ///
    /// # Returns
    ///
    /// A tuple of `(client_handle, event_receiver)`. The event receiver
    /// yields [`ClientEvent`]s until the transport closes or the client
    /// shuts down.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: FourlineConfig,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UserIntent>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<ClientEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = Arc::new(ClientState::new());
        let loop_state = Arc::clone(&state);
        let shutdown_timeout = config.shutdown_timeout;

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            event_tx,
            loop_state,
            shutdown_rx,
            config,
        ));

        let client = Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Choose a display name for this session.
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::NotConnected`] if the transport has closed.
    pub fn set_identity(&self, name: impl Into<String>) -> Result<()> {
        self.send(UserIntent::SetIdentity(name.into()))
    }

    /// Enter the quick-match queue.
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::NotConnected`] if the transport has closed.
    pub fn quick_match(&self) -> Result<()> {
        self.send(UserIntent::ChooseQuickMatch)
    }

    /// Create a named room and wait in it for an opponent.
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::NotConnected`] if the transport has closed.
    pub fn create_room(&self, room_name: impl Into<String>) -> Result<()> {
        self.send(UserIntent::ChooseCreateRoom {
            room_name: room_name.into(),
        })
    }

    /// Open the room browser.
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::NotConnected`] if the transport has closed.
    pub fn browse_rooms(&self) -> Result<()> {
        self.send(UserIntent::ChooseBrowseRooms)
    }

    /// Join a listed room by its id.
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::NotConnected`] if the transport has closed.
    pub fn join_room(&self, room_id: impl Into<String>) -> Result<()> {
        self.send(UserIntent::JoinRoomById {
            room_id: room_id.into(),
        })
    }

    /// Drop a disc in the given column.
    ///
    /// The move is only sent if a game is running and it is this client's
    /// turn; otherwise it is silently ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::NotConnected`] if the transport has closed.
    pub fn submit_move(&self, column: usize) -> Result<()> {
        self.send(UserIntent::SubmitMove { column })
    }

    /// Clear the session back to idle, closing the game connection.
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::NotConnected`] if the transport has closed.
    pub fn reset(&self) -> Result<()> {
        self.send(UserIntent::Reset)
    }

    /// Shut down the client, closing the transport and stopping the background task.
    ///
    /// After calling this method, the event receiver will yield `None` once
    /// the transport loop exits.
    pub async fn shutdown(&mut self) {
        debug!("FourlineClient: shutdown requested");

        // Signal the transport loop to shut down gracefully.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Await the transport loop with a timeout. If it doesn't exit in time,
        // abort it so the task cannot detach and run indefinitely.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("transport loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.connected.store(false, Ordering::Release);
    }

    /// Returns `true` if the transport is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Queue a `UserIntent` to the transport loop.
    fn send(&self, intent: UserIntent) -> Result<()> {
        if !self.state.connected.load(Ordering::Acquire) {
            return Err(FourlineError::NotConnected);
        }
        self.cmd_tx
            .send(intent)
            .map_err(|_| FourlineError::NotConnected)
    }
}

impl std::fmt::Debug for FourlineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FourlineClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for FourlineClient {
    fn drop(&mut self) {
        // `Drop` is synchronous so we cannot await a graceful shutdown.
        // The only safe action is to abort the spawned task, which causes
        // the transport loop future to be dropped immediately.  The
        // `shutdown_tx` oneshot is intentionally *not* sent here: sending
        // it would trigger a graceful path that calls async `transport.close()`,
        // but there is no executor context to drive it inside `Drop`.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Timers ──────────────────────────────────────────────────────────

/// The two deferred-reset tasks. Each slot holds the `JoinHandle` of a
/// spawned sleep that reports back through the tick channel.
#[derive(Default)]
struct Timers {
    finished: Option<tokio::task::JoinHandle<()>>,
    error: Option<tokio::task::JoinHandle<()>>,
}

impl Timers {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<tokio::task::JoinHandle<()>> {
        match kind {
            TimerKind::FinishedReset => &mut self.finished,
            TimerKind::ErrorReset => &mut self.error,
        }
    }

    fn schedule(
        &mut self,
        kind: TimerKind,
        delay: Duration,
        tick_tx: &mpsc::UnboundedSender<TimerKind>,
    ) {
        self.cancel(kind);
        let tick_tx = tick_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tick_tx.send(kind);
        });
        *self.slot(kind) = Some(handle);
        debug!(?kind, ?delay, "timer scheduled");
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some(handle) = self.slot(kind).take() {
            handle.abort();
            debug!(?kind, "timer cancelled");
        }
    }

    fn cancel_all(&mut self) {
        self.cancel(TimerKind::FinishedReset);
        self.cancel(TimerKind::ErrorReset);
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Background transport loop that multiplexes send/receive via `tokio::select!`.
///
/// Exits when:
/// - The intent channel closes (client handle dropped or shutdown called)
/// - The transport returns `None` (server closed connection)
/// - A transport error occurs
/// - The session controller asks for a disconnect (reset or deferred reset)
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<UserIntent>,
    event_tx: mpsc::Sender<ClientEvent>,
    state: Arc<ClientState>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    config: FourlineConfig,
) {
    debug!("transport loop started");

    let mut controller = SessionController::new();
    let mut timers = Timers::default();
    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<TimerKind>();

    // The transport handed to `start` is already connected.
    let actions = controller.handle_transport(TransportStatus::Opened);
    emit_event(&event_tx, ClientEvent::Connected).await;
    debug_assert!(actions.is_empty());
    emit_view(&event_tx, &controller).await;

    loop {
        let actions = tokio::select! {
            // Branch 1: user intent from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(intent) => {
                        debug!("handling user intent: {:?}", std::mem::discriminant(&intent));
                        controller.handle_intent(intent)
                    }
                    // Intent channel closed — client handle dropped.
                    None => {
                        debug!("intent channel closed, shutting down transport loop");
                        timers.cancel_all();
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                timers.cancel_all();
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                break;
            }

            // Branch 3: deferred reset fired
            kind = tick_rx.recv() => {
                match kind {
                    Some(kind) => {
                        timers.cancel(kind);
                        controller.handle_timer(kind)
                    }
                    // Unreachable: the loop owns a sender.
                    None => break,
                }
            }

            // Branch 4: incoming frame from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        match codec::decode(&text) {
                            Ok(event) => controller.handle_event(event),
                            Err(e) => {
                                warn!("dropping malformed server frame: {e} — raw: {text}");
                                continue;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        timers.cancel_all();
                        let _ = controller.handle_transport(
                            TransportStatus::Errored(e.to_string()),
                        );
                        emit_view(&event_tx, &controller).await;
                        emit_disconnected(
                            &event_tx,
                            &state,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    // Transport closed cleanly.
                    None => {
                        debug!("transport closed by server");
                        timers.cancel_all();
                        let _ = controller.handle_transport(TransportStatus::Closed);
                        emit_view(&event_tx, &controller).await;
                        emit_disconnected(&event_tx, &state, None).await;
                        break;
                    }
                }
            }
        };

        let mut disconnect = false;
        let mut send_failure: Option<String> = None;
        for action in actions {
            match action {
                Action::Connect => {
                    // The transport is connected up front; nothing to do.
                    debug!("connect requested, transport already up");
                }
                Action::Send(intent) => match codec::encode(&intent) {
                    Ok(json) => {
                        if let Err(e) = transport.send(json).await {
                            error!("transport send error: {e}");
                            send_failure = Some(format!("transport send error: {e}"));
                            break;
                        }
                    }
                    Err(e) => {
                        error!("failed to serialize intent: {e}");
                        // Serialization errors are programming bugs; don't kill the loop.
                    }
                },
                Action::ScheduleTimer(kind) => {
                    let delay = match kind {
                        TimerKind::FinishedReset => config.reset_delay,
                        TimerKind::ErrorReset => config.error_reset_delay,
                    };
                    timers.schedule(kind, delay, &tick_tx);
                }
                Action::CancelTimer(kind) => timers.cancel(kind),
                Action::Disconnect => disconnect = true,
                Action::RefreshPanels => {
                    emit_event(&event_tx, ClientEvent::RefreshPanels).await;
                }
            }
        }

        if let Some(reason) = send_failure {
            timers.cancel_all();
            let _ = controller.handle_transport(TransportStatus::Errored(reason.clone()));
            emit_view(&event_tx, &controller).await;
            emit_disconnected(&event_tx, &state, Some(reason)).await;
            break;
        }

        emit_view(&event_tx, &controller).await;

        if disconnect {
            debug!("session requested disconnect");
            timers.cancel_all();
            let _ = transport.close().await;
            emit_disconnected(&event_tx, &state, None).await;
            break;
        }
    }

    timers.cancel_all();
    debug!("transport loop exited");
}

/// Project the current session and emit it as a `View` event.
async fn emit_view(event_tx: &mpsc::Sender<ClientEvent>, controller: &SessionController) {
    let view = project(controller.session());
    emit_event(event_tx, ClientEvent::View(Box::new(view))).await;
}

/// Emit an event to the event channel. If the channel is full, log a warning
/// and drop the event to avoid blocking the transport loop.
async fn emit_event(event_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit a [`Disconnected`](ClientEvent::Disconnected) event and update state.
///
/// Uses `send().await` (blocking) instead of `try_send` because `Disconnected`
/// is always the last event on the channel and must never be silently dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<ClientEvent>,
    state: &ClientState,
    reason: Option<String>,
) {
    state.connected.store(false, Ordering::Release);
    let event = ClientEvent::Disconnected { reason };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::Intent;
    use crate::view::Panel;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// A mock transport that records sent messages and replays scripted responses.
    struct MockTransport {
        /// Messages that `recv()` will yield in order.
        incoming: VecDeque<Option<std::result::Result<String, FourlineError>>>,
        /// Recorded outgoing messages.
        sent: Arc<StdMutex<Vec<String>>>,
        /// Whether `close()` was called.
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, FourlineError>>>,
        ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), FourlineError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, FourlineError>> {
            if let Some(item) = self.incoming.pop_front() {
                // An explicit `None` entry signals a clean transport close;
                // `Some(result)` delivers the scripted message or error.
                item
            } else {
                // All scripted messages have been delivered — hang forever
                // so the transport loop stays alive until shutdown.
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), FourlineError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn start_json() -> String {
        r#"{"type":"start","gameId":"g_1","you":1,"opponent":"bob","state":{"rows":2,"cols":2,"board":[[0,0],[0,0]],"turn":1}}"#.to_owned()
    }

    /// Receive the next `View` event, skipping `RefreshPanels`.
    async fn next_view(events: &mut mpsc::Receiver<ClientEvent>) -> Box<ViewModel> {
        loop {
            match tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("event in time")
                .expect("channel open")
            {
                ClientEvent::View(view) => return view,
                ClientEvent::RefreshPanels => {}
                other => panic!("expected View event, got {other:?}"),
            }
        }
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn connected_then_initial_view_are_first_events() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let first = events.recv().await.unwrap();
        assert!(matches!(first, ClientEvent::Connected));

        let view = next_view(&mut events).await;
        assert_eq!(view.panel, Panel::IdentityEntry);
        assert_eq!(
            view.banner.text,
            "Ready to play! Enter your username and join."
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn quick_match_sends_join_message() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await; // initial view

        client.set_identity("alice").unwrap();
        let view = next_view(&mut events).await;
        assert_eq!(view.panel, Panel::ModeChooser);
        assert_eq!(view.banner.text, "Connected as alice");

        client.quick_match().unwrap();
        let view = next_view(&mut events).await;
        assert_eq!(view.panel, Panel::WaitingBanner);

        {
            let messages = sent.lock().unwrap();
            assert_eq!(messages.len(), 1);
            let intent: Intent = serde_json::from_str(&messages[0]).unwrap();
            assert_eq!(
                intent,
                Intent::Join {
                    username: "alice".into()
                }
            );
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn start_frame_projects_game_view() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(start_json()))]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await; // initial view
        client.set_identity("alice").unwrap();
        let _ = next_view(&mut events).await;

        let view = next_view(&mut events).await;
        assert_eq!(view.panel, Panel::Game);
        assert_eq!(view.banner.text, "🎮 Game started! Playing against bob");
        assert_eq!(
            view.turn_indicator.as_deref(),
            Some("🎯 Your turn! (Player 1)")
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn submit_move_sends_move_message() {
        let (transport, sent, _closed) = MockTransport::new(vec![Some(Ok(start_json()))]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await;
        client.set_identity("alice").unwrap();
        let _ = next_view(&mut events).await;
        let _ = next_view(&mut events).await; // game view

        client.submit_move(1).unwrap();
        let _ = next_view(&mut events).await;

        {
            let messages = sent.lock().unwrap();
            let last: Intent = serde_json::from_str(messages.last().unwrap()).unwrap();
            assert_eq!(
                last,
                Intent::Move {
                    game_id: "g_1".into(),
                    col: 1
                }
            );
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_frame_does_not_kill_the_loop() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok("not json at all".into())),
            Some(Ok(r#"{"type":"waiting","timeout":15}"#.into())),
        ]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await;

        // The malformed frame is dropped without a view; the waiting frame
        // that follows still comes through.
        let view = next_view(&mut events).await;
        assert_eq!(
            view.banner.text,
            "⏳ Waiting for opponent... (timeout: 15s)"
        );
        assert!(client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn finished_game_resets_after_delay_and_disconnects() {
        let finished = r#"{"type":"state","state":{"rows":2,"cols":2,"board":[[1,2],[1,2]],"turn":2},"status":"finished","result":"alice"}"#;
        let (transport, _sent, closed) = MockTransport::new(vec![
            Some(Ok(start_json())),
            Some(Ok(finished.to_owned())),
        ]);
        let config = FourlineConfig::new().with_reset_delay(Duration::from_millis(20));
        let (_client, mut events) = FourlineClient::start(transport, config);

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await;
        let _ = next_view(&mut events).await; // game view

        // No identity was chosen in this session, so the named winner
        // projects as a loss.
        let view = next_view(&mut events).await; // finished view
        assert_eq!(view.banner.text, "😔 alice won! You lost!");
        let announcement = view.announcement.as_ref().unwrap();
        assert_eq!(announcement.headline, "alice Won!");

        // The deferred reset fires, the session clears, the loop closes the
        // transport and delivers the final Disconnected.
        let view = next_view(&mut events).await;
        assert_eq!(view.panel, Panel::IdentityEntry);
        let last = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(last, ClientEvent::Disconnected { .. }));
        assert!(closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn server_error_frame_forces_reset_after_delay() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok(r#"{"error":"username taken"}"#.into())),
        ]);
        let config = FourlineConfig::new().with_error_reset_delay(Duration::from_millis(20));
        let (_client, mut events) = FourlineClient::start(transport, config);

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await;

        let view = next_view(&mut events).await;
        assert_eq!(view.banner.text, "username taken");

        let view = next_view(&mut events).await; // post-reset view
        assert_eq!(view.panel, Panel::IdentityEntry);
        let last = events.recv().await.unwrap();
        assert!(matches!(last, ClientEvent::Disconnected { .. }));
    }

    #[tokio::test]
    async fn room_start_emits_refresh_panels() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(start_json()))]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await;

        // The start frame's transition asks the panels to refresh.
        let mut saw_refresh = false;
        for _ in 0..2 {
            match tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .unwrap()
                .unwrap()
            {
                ClientEvent::RefreshPanels => saw_refresh = true,
                ClientEvent::View(_) => {}
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(saw_refresh);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn disconnected_on_transport_close() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(start_json())), None]);
        let (client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await;
        let _ = next_view(&mut events).await; // game view

        // Mid-game close forces the session back to idle with a notice.
        let view = next_view(&mut events).await;
        assert_eq!(view.banner.text, "Disconnected from server");
        let last = events.recv().await.unwrap();
        assert!(matches!(last, ClientEvent::Disconnected { reason: None }));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn transport_recv_error_emits_disconnected_with_reason() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            FourlineError::TransportReceive("boom".into()),
        ))]);
        let (client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await;
        let _ = next_view(&mut events).await; // error view

        let event = events.recv().await.unwrap();
        if let ClientEvent::Disconnected { reason } = event {
            assert!(reason.unwrap().contains("boom"));
        } else {
            panic!("expected Disconnected, got {event:?}");
        }
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn not_connected_error_after_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await;

        client.shutdown().await;

        let result = client.quick_match();
        assert!(matches!(result, Err(FourlineError::NotConnected)));
    }

    #[tokio::test]
    async fn shutdown_emits_disconnected_and_closes_transport() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected
        let _ = next_view(&mut events).await;

        client.shutdown().await;

        let event = events.recv().await.unwrap();
        if let ClientEvent::Disconnected { reason } = event {
            assert_eq!(reason.as_deref(), Some("client shut down"));
        } else {
            panic!("expected Disconnected, got {event:?}");
        }
        assert!(closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected

        client.shutdown().await;
        client.shutdown().await; // should not panic
    }

    #[tokio::test]
    async fn drop_without_explicit_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected

        // Drop the client without calling shutdown.
        drop(client);

        // The transport loop should eventually exit; the event channel
        // will close. We just verify we don't hang or panic.
        while let Some(_event) = events.recv().await {}
    }

    #[tokio::test]
    async fn config_defaults() {
        let config = FourlineConfig::new();
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.reset_delay, Duration::from_secs(10));
        assert_eq!(config.error_reset_delay, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn config_builder_methods() {
        let config = FourlineConfig::new()
            .with_event_channel_capacity(512)
            .with_shutdown_timeout(Duration::from_secs(5))
            .with_reset_delay(Duration::from_secs(2))
            .with_error_reset_delay(Duration::from_millis(500));
        assert_eq!(config.event_channel_capacity, 512);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.reset_delay, Duration::from_secs(2));
        assert_eq!(config.error_reset_delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn event_channel_capacity_is_clamped_to_one() {
        let config = FourlineConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[tokio::test]
    async fn event_channel_backpressure_does_not_block() {
        // More waiting frames than the channel can hold; views get dropped
        // but the loop must keep running and the final Disconnected must
        // still arrive.
        let mut incoming: Vec<Option<std::result::Result<String, FourlineError>>> = Vec::new();
        for timeout in 0..20 {
            incoming.push(Some(Ok(format!(
                r#"{{"type":"waiting","timeout":{timeout}}}"#
            ))));
        }
        incoming.push(None);

        let (transport, _sent, _closed) = MockTransport::new(incoming);
        let config = FourlineConfig::new().with_event_channel_capacity(1);
        let (_client, mut events) = FourlineClient::start(transport, config);

        // Let the channel fill up and events get dropped.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut count = 0;
        let mut saw_disconnected = false;
        while let Some(event) = events.recv().await {
            count += 1;
            if matches!(event, ClientEvent::Disconnected { .. }) {
                saw_disconnected = true;
            }
        }
        assert!(count >= 2, "expected at least 2 events, got {count}");
        assert!(count < 22, "expected backpressure to drop some events");
        assert!(saw_disconnected, "Disconnected must always be delivered");
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

        let _ = events.recv().await; // Connected

        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("FourlineClient"));
        assert!(debug_str.contains("connected"));

        client.shutdown().await;
    }
}
