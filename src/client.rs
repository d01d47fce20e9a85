//! Session driver for one game variant.
//!
//! [`GameClient`] is a thin handle that forwards user intents to a background
//! session loop over an unbounded MPSC channel. The loop owns the
//! [`ClientState`], the [`Channel`] and the [`ResumeStore`]; it applies pushes
//! and intents, carries out the resulting effects, and emits a fresh render on
//! the bounded [`ClientEvent`] channel returned from [`GameClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let connector = WebSocketConnector::new("ws://localhost:8000/dig");
//! let (client, mut events) =
//!     GameClient::<Dig>::start(connector, MemoryResumeStore::new(), ClientConfig::default());
//!
//! client.edit_join_form("AB", "Al", false)?;
//! client.submit_join()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::Render(view) => draw(&view),
//!         ClientEvent::Disconnected { .. } => show_offline(),
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelEvent};
use crate::error::{ClientError, Result};
use crate::game::GameVariant;
use crate::state::{session_router, ClientState, Effect, Effects, Intent, SessionRouter};
use crate::resume::ResumeStore;
use crate::transport::Connector;
use crate::view::{render, ClientView};

/// Default capacity of the bounded view channel.
const DEFAULT_VIEW_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`GameClient`].
///
/// # Example
///
/// ```
/// use parlor_client::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_view_channel_capacity(64)
///     .with_autobid_delay(Duration::from_millis(250));
/// assert_eq!(config.view_channel_capacity, 64);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Capacity of the bounded view channel.
    ///
    /// When the consumer falls behind, renders are dropped with a warning;
    /// each render supersedes the previous one. `Disconnected` is always
    /// delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub view_channel_capacity: usize,
    /// Time the session loop gets to close its connection on
    /// [`GameClient::shutdown`] before it is aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Delay between the bid control becoming enabled and an automatic bid.
    ///
    /// Defaults to **500 ms**.
    pub autobid_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            view_channel_capacity: DEFAULT_VIEW_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            autobid_delay: crate::state::DEFAULT_AUTOBID_DELAY,
        }
    }
}

impl ClientConfig {
    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_view_channel_capacity(mut self, capacity: usize) -> Self {
        self.view_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_autobid_delay(mut self, delay: Duration) -> Self {
        self.autobid_delay = delay;
        self
    }
}

// ── Events ──────────────────────────────────────────────────────────

/// What the session loop reports to the view sink.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent<V> {
    /// A connection was (re)established.
    Connected,
    /// The connection ended or could not be opened.
    Disconnected { reason: Option<String> },
    /// The full current view.
    Render(ClientView<V>),
    /// The newest log line should be scrolled into view.
    ScrollLog,
}

// ── Client handle ───────────────────────────────────────────────────

/// Async handle to one game session.
///
/// Created via [`GameClient::start`]. All interaction methods queue an
/// [`Intent`] for the session loop and return immediately; whether the intent
/// is allowed is decided by the loop against the current state.
pub struct GameClient<G: GameVariant> {
    intent_tx: mpsc::UnboundedSender<Intent<G::Intent>>,
    connected: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl<G: GameVariant> GameClient<G> {
    /// Spawn the session loop and return a handle plus the view receiver.
    ///
    /// The loop opens the channel immediately and reports the outcome as
    /// [`ClientEvent::Connected`] or [`ClientEvent::Disconnected`], followed
    /// by an initial render. Must be called from within a tokio runtime.
    #[must_use = "the view receiver must be used to receive renders"]
    pub fn start<S: ResumeStore>(
        connector: impl Connector,
        store: S,
        config: ClientConfig,
    ) -> (Self, mpsc::Receiver<ClientEvent<G::View>>) {
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        // tokio panics on a zero capacity.
        let capacity = config.view_channel_capacity.max(1);
        let (view_tx, view_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(false));

        let session = Session::<G, S> {
            state: ClientState::new(config.autobid_delay),
            router: session_router::<G>(),
            channel: Channel::new(connector).with_close_timeout(config.shutdown_timeout),
            store,
            view_tx,
            connected: Arc::clone(&connected),
            timers: JoinSet::new(),
        };
        let task = tokio::spawn(session_loop(session, intent_rx, shutdown_rx));

        let client = Self {
            intent_tx,
            connected,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (client, view_rx)
    }

    // ── Interactions ────────────────────────────────────────────────

    /// Queue any intent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the session loop has exited.
    pub fn dispatch(&self, intent: Intent<G::Intent>) -> Result<()> {
        self.intent_tx
            .send(intent)
            .map_err(|_| ClientError::NotConnected)
    }

    /// Overwrite the join form's raw values.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the session loop has exited.
    pub fn edit_join_form(
        &self,
        room: impl Into<String>,
        name: impl Into<String>,
        spectate: bool,
    ) -> Result<()> {
        self.dispatch(Intent::EditJoinForm {
            room: room.into(),
            name: name.into(),
            spectate,
        })
    }

    /// Submit the join form.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the session loop has exited.
    pub fn submit_join(&self) -> Result<()> {
        self.dispatch(Intent::SubmitJoin)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the session loop has exited.
    pub fn click_room(&self, room: impl Into<String>) -> Result<()> {
        self.dispatch(Intent::ClickRoom(room.into()))
    }

    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the session loop has exited.
    pub fn click_seat(&self, room: impl Into<String>, player: impl Into<String>) -> Result<()> {
        self.dispatch(Intent::ClickSeat {
            room: room.into(),
            player: player.into(),
        })
    }

    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the session loop has exited.
    pub fn start_game(&self) -> Result<()> {
        self.dispatch(Intent::StartGame)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the session loop has exited.
    pub fn undo(&self) -> Result<()> {
        self.dispatch(Intent::Undo)
    }

    /// Toggle the highlight from the log line at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the session loop has exited.
    pub fn click_log(&self, index: usize) -> Result<()> {
        self.dispatch(Intent::ClickLog(index))
    }

    /// Queue a game-specific intent, usually a cell's bound action.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the session loop has exited.
    pub fn perform(&self, intent: G::Intent) -> Result<()> {
        self.dispatch(Intent::Game(intent))
    }

    /// Stop the session loop, closing the channel.
    ///
    /// The view receiver yields `None` once the loop has exited.
    pub async fn shutdown(&mut self) {
        debug!(game = G::NAME, "GameClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }

        self.connected.store(false, Ordering::Release);
    }

    /// Returns `true` while the channel is believed to be open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl<G: GameVariant> std::fmt::Debug for GameClient<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameClient")
            .field("game", &G::NAME)
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl<G: GameVariant> Drop for GameClient<G> {
    fn drop(&mut self) {
        // No executor is available to drive a graceful close here.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Everything the session loop owns.
struct Session<G: GameVariant, S> {
    state: ClientState<G>,
    router: SessionRouter<G>,
    channel: Channel,
    store: S,
    view_tx: mpsc::Sender<ClientEvent<G::View>>,
    connected: Arc<AtomicBool>,
    /// Pending delayed intents (autobid).
    timers: JoinSet<G::Intent>,
}

/// Background loop that owns the session.
///
/// Exits when the shutdown signal fires or the client handle is dropped. A
/// lost connection does not end the loop; navigating back to the lobby
/// reopens it.
async fn session_loop<G: GameVariant, S: ResumeStore>(
    mut session: Session<G, S>,
    mut intent_rx: mpsc::UnboundedReceiver<Intent<G::Intent>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!(game = G::NAME, "session loop started");

    let mut nav_rx = session.store.on_change();
    let mut nav_open = true;

    session.connect().await;
    session.emit_render();

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                session.close(Some("client shut down".into())).await;
                break;
            }

            intent = intent_rx.recv() => {
                let Some(intent) = intent else {
                    debug!("intent channel closed, shutting down session loop");
                    session.close(Some("client shut down".into())).await;
                    break;
                };
                session.handle(intent).await;
            }

            event = session.channel.recv() => {
                session.on_channel_event(event).await;
            }

            changed = nav_rx.changed(), if nav_open => {
                if changed.is_err() {
                    debug!("resume store dropped its change feed");
                    nav_open = false;
                    continue;
                }
                let entry = nav_rx.borrow_and_update().clone();
                debug!(entry = ?entry, "navigation changed");
                session.handle(Intent::Navigate(entry)).await;
            }

            Some(done) = session.timers.join_next(), if !session.timers.is_empty() => {
                match done {
                    Ok(intent) => session.handle(Intent::Game(intent)).await,
                    Err(join_err) if join_err.is_cancelled() => {}
                    Err(join_err) => warn!("timer task failed: {join_err}"),
                }
            }
        }
    }

    debug!("session loop exited");
}

impl<G: GameVariant, S: ResumeStore> Session<G, S> {
    /// Open the channel and report the outcome.
    async fn connect(&mut self) {
        match self.channel.open().await {
            Ok(()) => {
                info!(game = G::NAME, "connected");
                self.connected.store(true, Ordering::Release);
                self.emit(ClientEvent::Connected);
            }
            Err(e) => {
                warn!(game = G::NAME, "failed to connect: {e}");
                self.state.disconnect();
                self.emit_disconnected(Some(e.to_string())).await;
            }
        }
    }

    /// Close the channel for good.
    async fn close(&mut self, reason: Option<String>) {
        self.timers.abort_all();
        self.channel.close().await;
        self.state.disconnect();
        self.emit_disconnected(reason).await;
    }

    /// Force-close the channel and open a fresh one.
    async fn reset(&mut self) {
        debug!("resetting channel");
        self.timers.abort_all();
        self.channel.close().await;
        self.connected.store(false, Ordering::Release);
        self.state.disconnect();
        self.connect().await;
    }

    async fn handle(&mut self, intent: Intent<G::Intent>) {
        match self.state.handle(intent) {
            Ok(effects) => self.run(effects).await,
            Err(e) => warn!("failed to handle intent: {e}"),
        }
        self.emit_render();
    }

    async fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Frame(frame) => match self.state.apply(&self.router, &frame) {
                Ok(effects) => self.run(effects).await,
                Err(e) => warn!(event = %frame.event, "dropping push: {e}"),
            },
            ChannelEvent::Closed { reason } => {
                info!(reason = ?reason, "connection lost");
                self.timers.abort_all();
                self.state.disconnect();
                self.emit_disconnected(reason).await;
            }
        }
        self.emit_render();
    }

    /// Carry out effects in order.
    async fn run(&mut self, effects: Effects<G::Intent>) {
        for effect in effects {
            match effect {
                Effect::Send(frame) => self.channel.send(frame),
                Effect::SaveResume(token) => {
                    debug!(title = %token.title(), "saving resume entry");
                    self.store.save(token);
                }
                Effect::MarkLobby => self.store.mark_lobby(),
                Effect::ResetChannel => self.reset().await,
                Effect::Schedule { delay, intent } => {
                    self.timers.spawn(async move {
                        tokio::time::sleep(delay).await;
                        intent
                    });
                }
                Effect::ScrollLog => self.emit(ClientEvent::ScrollLog),
            }
        }
    }

    fn emit_render(&self) {
        self.emit(ClientEvent::Render(render(&self.state)));
    }

    /// Emit an event, dropping it if the consumer has fallen behind.
    fn emit(&self, event: ClientEvent<G::View>) {
        match self.view_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("view channel full, dropping event: {:?}", std::mem::discriminant(&dropped));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("view channel closed, receiver dropped");
            }
        }
    }

    /// `Disconnected` is awaited rather than dropped when the sink is full.
    async fn emit_disconnected(&mut self, reason: Option<String>) {
        self.connected.store(false, Ordering::Release);
        if self
            .view_tx
            .send(ClientEvent::Disconnected { reason })
            .await
            .is_err()
        {
            debug!("view channel closed, receiver dropped");
        }
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
    use crate::games::dig::{Dig, DigIntent};
    use crate::protocol::Frame;
    use crate::resume::MemoryResumeStore;
    use crate::state::SessionStatus;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    // ── In-memory pipe ──────────────────────────────────────────────

    struct PipeTransport {
        incoming: mpsc::UnboundedReceiver<String>,
        outgoing: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl Transport for PipeTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), ClientError> {
            self.outgoing
                .send(message)
                .map_err(|_| ClientError::TransportClosed)
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ClientError>> {
            self.incoming.recv().await.map(Ok)
        }

        async fn close(&mut self) -> std::result::Result<(), ClientError> {
            Ok(())
        }
    }

    /// The server's half of one pipe.
    struct ServerEnd {
        to_client: Option<mpsc::UnboundedSender<String>>,
        from_client: mpsc::UnboundedReceiver<String>,
    }

    impl ServerEnd {
        fn push(&self, event: &str, data: Value) {
            let json = Frame::new(event, data).to_json().unwrap();
            self.to_client.as_ref().unwrap().send(json).unwrap();
        }

        /// Close the server side of the connection.
        fn hang_up(&mut self) {
            self.to_client = None;
        }

        async fn request(&mut self) -> Frame {
            let text = tokio::time::timeout(Duration::from_secs(2), self.from_client.recv())
                .await
                .expect("timed out waiting for a request")
                .expect("client side closed");
            Frame::from_json(&text).unwrap()
        }
    }

    fn pipe() -> (PipeTransport, ServerEnd) {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        (
            PipeTransport { incoming, outgoing },
            ServerEnd {
                to_client: Some(to_client),
                from_client,
            },
        )
    }

    struct PipeConnector {
        pending: VecDeque<PipeTransport>,
        connects: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for PipeConnector {
        async fn connect(&mut self) -> std::result::Result<Box<dyn Transport>, ClientError> {
            self.connects.fetch_add(1, Ordering::Relaxed);
            match self.pending.pop_front() {
                Some(transport) => Ok(Box::new(transport)),
                None => Err(ClientError::TransportClosed),
            }
        }
    }

    fn connector(count: usize) -> (PipeConnector, Vec<ServerEnd>, Arc<AtomicUsize>) {
        let (transports, servers): (VecDeque<_>, Vec<_>) = (0..count).map(|_| pipe()).unzip();
        let connects = Arc::new(AtomicUsize::new(0));
        (
            PipeConnector {
                pending: transports,
                connects: Arc::clone(&connects),
            },
            servers,
            connects,
        )
    }

    type Events = mpsc::Receiver<ClientEvent<<Dig as GameVariant>::View>>;

    /// Wait for the first render that satisfies `pred`.
    async fn render_where(
        events: &mut Events,
        pred: impl Fn(&ClientView<<Dig as GameVariant>::View>) -> bool,
    ) -> ClientView<<Dig as GameVariant>::View> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Some(ClientEvent::Render(view)) if pred(&view) => return view,
                    Some(_) => {}
                    None => panic!("view channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for render")
    }

    async fn event_where(
        events: &mut Events,
        pred: impl Fn(&ClientEvent<<Dig as GameVariant>::View>) -> bool,
    ) -> ClientEvent<<Dig as GameVariant>::View> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Some(event) if pred(&event) => return event,
                    Some(_) => {}
                    None => panic!("view channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    fn joined(server: &ServerEnd) {
        server.push("ensureLobby", json!(null));
        server.push(
            "joinedGame",
            json!({ "gameName": "AB", "playerName": "Al", "spectating": false }),
        );
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    #[test]
    fn session_loop_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}

        let (conn, _servers, _connects) = connector(0);
        let (view_tx, _view_rx) = mpsc::channel(1);
        let (_intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        let session = Session::<Dig, MemoryResumeStore> {
            state: ClientState::default(),
            router: session_router::<Dig>(),
            channel: Channel::new(conn),
            store: MemoryResumeStore::new(),
            view_tx,
            connected: Arc::new(AtomicBool::new(false)),
            timers: JoinSet::new(),
        };
        let fut = session_loop(session, intent_rx, shutdown_rx);
        assert_send(&fut);
    }

    #[tokio::test]
    async fn start_reports_connected_then_renders() {
        let (conn, _servers, _connects) = connector(1);
        let (client, mut events) =
            GameClient::<Dig>::start(conn, MemoryResumeStore::new(), ClientConfig::default());

        assert_eq!(events.recv().await, Some(ClientEvent::Connected));
        let view = render_where(&mut events, |_| true).await;
        assert_eq!(view.status, SessionStatus::Disconnected);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn failed_connect_reports_disconnected() {
        let (conn, _servers, _connects) = connector(0);
        let (client, mut events) =
            GameClient::<Dig>::start(conn, MemoryResumeStore::new(), ClientConfig::default());

        match events.recv().await {
            Some(ClientEvent::Disconnected { reason: Some(_) }) => {}
            other => panic!("expected Disconnected, got {other:?}"),
        }
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn join_flow_saves_resume_entry() {
        let (conn, mut servers, _connects) = connector(1);
        let store = MemoryResumeStore::new();
        let (client, mut events) =
            GameClient::<Dig>::start(conn, store.clone(), ClientConfig::default());
        let server = &mut servers[0];

        server.push("ensureLobby", json!(null));
        render_where(&mut events, |v| v.status == SessionStatus::Lobby).await;

        client.edit_join_form("ab", "Al", false).unwrap();
        client.submit_join().unwrap();
        assert_eq!(
            server.request().await,
            Frame::new(
                "joinRequest",
                json!({ "gameName": "AB", "playerName": "Al", "spectate": false })
            )
        );

        server.push(
            "joinedGame",
            json!({ "gameName": "AB", "playerName": "Al", "spectating": false }),
        );
        let view = render_where(&mut events, |v| v.status == SessionStatus::SeatedWaiting).await;
        assert!(!view.join_form.enabled);
        assert_eq!(store.titles(), vec!["lobby".to_string(), "Game AB".to_string()]);
    }

    #[tokio::test]
    async fn append_log_emits_scroll() {
        let (conn, servers, _connects) = connector(1);
        let (_client, mut events) =
            GameClient::<Dig>::start(conn, MemoryResumeStore::new(), ClientConfig::default());
        joined(&servers[0]);
        servers[0].push("appendLog", json!("Al bid 2"));
        event_where(&mut events, |e| *e == ClientEvent::ScrollLog).await;
    }

    #[tokio::test]
    async fn connection_loss_is_reported_and_loop_survives() {
        let (conn, mut servers, connects) = connector(2);
        let store = MemoryResumeStore::new();
        let (client, mut events) =
            GameClient::<Dig>::start(conn, store.clone(), ClientConfig::default());
        joined(&servers[0]);
        render_where(&mut events, |v| v.status == SessionStatus::SeatedWaiting).await;

        servers[0].hang_up();
        event_where(&mut events, |e| matches!(e, ClientEvent::Disconnected { .. })).await;
        let view = render_where(&mut events, |_| true).await;
        assert_eq!(view.status, SessionStatus::Disconnected);
        assert!(!client.is_connected());

        // Back to the lobby entry reopens the channel.
        assert!(store.back());
        event_where(&mut events, |e| *e == ClientEvent::Connected).await;
        assert_eq!(connects.load(Ordering::Relaxed), 2);
        servers[1].push("ensureLobby", json!(null));
        render_where(&mut events, |v| v.status == SessionStatus::Lobby).await;
    }

    #[tokio::test]
    async fn autobid_fires_after_delay() {
        let (conn, mut servers, _connects) = connector(1);
        let config = ClientConfig::default().with_autobid_delay(Duration::from_millis(20));
        let (client, mut events) = GameClient::<Dig>::start(conn, MemoryResumeStore::new(), config);
        let server = &mut servers[0];
        joined(server);
        server.push("gameStarted", json!(null));
        render_where(&mut events, |v| v.play_visible).await;

        client.perform(DigIntent::SetAutobid(true)).unwrap();
        server.push(
            "updateBids",
            json!({
                "acorns": 10,
                "players": [{ "name": "Al", "stamina": 2, "acorns": 0 }],
                "whoseTurn": null,
                "bidding": true
            }),
        );
        assert_eq!(
            server.request().await,
            Frame::new("bidRequest", json!({ "index": 0 }))
        );
    }

    #[tokio::test]
    async fn shutdown_closes_view_channel() {
        let (conn, _servers, _connects) = connector(1);
        let (mut client, mut events) =
            GameClient::<Dig>::start(conn, MemoryResumeStore::new(), ClientConfig::default());
        client.shutdown().await;

        let mut saw_disconnect = false;
        while let Some(event) = events.recv().await {
            if matches!(event, ClientEvent::Disconnected { .. }) {
                saw_disconnect = true;
            }
        }
        assert!(saw_disconnect);
        assert!(matches!(client.submit_join(), Err(ClientError::NotConnected)));
    }

    // ── Config ──────────────────────────────────────────────────────

    #[test]
    fn config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.view_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.autobid_delay, Duration::from_millis(500));
    }

    #[test]
    fn view_channel_capacity_is_clamped_to_one() {
        let config = ClientConfig::default().with_view_channel_capacity(0);
        assert_eq!(config.view_channel_capacity, 1);
    }

    #[tokio::test]
    async fn small_view_channel_drops_renders_not_disconnects() {
        let (conn, servers, _connects) = connector(1);
        let config = ClientConfig::default().with_view_channel_capacity(1);
        let (_client, mut events) =
            GameClient::<Dig>::start(conn, MemoryResumeStore::new(), config);
        for k in 0..20 {
            servers[0].push("appendLog", json!(format!("line {k}")));
        }
        drop(servers);
        // The channel keeps working and the disconnect is never dropped.
        event_where(&mut events, |e| matches!(e, ClientEvent::Disconnected { .. })).await;
    }

    // ── Shutdown timeout ────────────────────────────────────────────

    /// A transport whose `close` never completes.
    struct HangingCloseTransport;

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), ClientError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ClientError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), ClientError> {
            std::future::pending().await
        }
    }

    struct HangingConnector(Arc<StdMutex<bool>>);

    #[async_trait]
    impl Connector for HangingConnector {
        async fn connect(&mut self) -> std::result::Result<Box<dyn Transport>, ClientError> {
            *self.0.lock().unwrap() = true;
            Ok(Box::new(HangingCloseTransport))
        }
    }

    #[tokio::test]
    async fn custom_shutdown_timeout_is_used() {
        let opened = Arc::new(StdMutex::new(false));
        let config = ClientConfig::default().with_shutdown_timeout(Duration::from_millis(50));
        let (mut client, _events) = GameClient::<Dig>::start(
            HangingConnector(Arc::clone(&opened)),
            MemoryResumeStore::new(),
            config,
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(*opened.lock().unwrap());

        let started = tokio::time::Instant::now();
        client.shutdown().await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!client.is_connected());
    }
}
