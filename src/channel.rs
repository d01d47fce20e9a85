//! Channel adapter: one reopenable connection plus an event-name router.
//!
//! [`Channel`] owns the connection lifecycle. Opening spawns a background
//! connection loop that multiplexes outgoing frames and incoming text messages
//! over the [`Transport`] with `tokio::select!`; closing stops it. Both are
//! idempotent. Sending on a closed channel is silently dropped, since
//! reopening is the session's job, not the channel's.
//!
//! [`Router`] is the `onReceive` registry: exactly one handler per event name,
//! later registrations replacing earlier ones. Handlers are plain functions
//! over an explicitly passed state, so the router itself holds no state.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::protocol::Frame;
use crate::transport::{Connector, Transport};

/// Default time a closing connection loop gets to close its transport.
const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ── Router ──────────────────────────────────────────────────────────

/// A push handler: applies one frame to `S` and yields an output.
pub type Handler<S, O> = fn(&mut S, &Frame) -> Result<O>;

/// Event-name → handler registry.
pub struct Router<S, O> {
    handlers: HashMap<String, Handler<S, O>>,
}

impl<S, O> Default for Router<S, O> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S, O> Router<S, O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `event`, replacing any earlier one.
    pub fn on_receive(&mut self, event: impl Into<String>, handler: Handler<S, O>) {
        let event = event.into();
        if self.handlers.insert(event.clone(), handler).is_some() {
            debug!(event = %event, "replaced push handler");
        }
    }

    /// Whether a handler is registered for `event`.
    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Run the handler registered for the frame's event.
    ///
    /// Returns `None` when no handler is registered.
    pub fn dispatch(&self, state: &mut S, frame: &Frame) -> Option<Result<O>> {
        let handler = self.handlers.get(&frame.event)?;
        Some(handler(state, frame))
    }
}

impl<S, O> std::fmt::Debug for Router<S, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut events: Vec<&String> = self.handlers.keys().collect();
        events.sort();
        f.debug_struct("Router").field("events", &events).finish()
    }
}

// ── Channel ─────────────────────────────────────────────────────────

/// What the channel yields to its reader.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A push from the server.
    Frame(Frame),
    /// The connection ended. `reason` is `None` for a clean server close.
    Closed { reason: Option<String> },
}

/// A live connection: the handle side of one connection loop.
struct Connection {
    id: Uuid,
    cmd_tx: mpsc::UnboundedSender<Frame>,
    inbound: mpsc::UnboundedReceiver<ChannelEvent>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

/// A reopenable message channel to the game server.
pub struct Channel {
    connector: Box<dyn Connector>,
    conn: Option<Connection>,
    close_timeout: Duration,
}

impl Channel {
    pub fn new(connector: impl Connector) -> Self {
        Self {
            connector: Box::new(connector),
            conn: None,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Set how long [`close`](Self::close) waits for a graceful shutdown.
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Open a connection. Does nothing if one is already open.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if the connection cannot be established.
    pub async fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let transport = self.connector.connect().await?;

        let id = Uuid::new_v4();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(connection_loop(
            id,
            transport,
            cmd_rx,
            inbound_tx,
            shutdown_rx,
        ));

        debug!(connection = %id, "channel opened");
        self.conn = Some(Connection {
            id,
            cmd_tx,
            inbound,
            shutdown_tx: Some(shutdown_tx),
            task,
        });
        Ok(())
    }

    /// Close the connection, if any. Frames still in flight are discarded.
    pub async fn close(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        if let Some(tx) = conn.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match tokio::time::timeout(self.close_timeout, &mut conn.task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                warn!(connection = %conn.id, "connection loop terminated with join error: {join_err}");
            }
            Err(_) => {
                warn!(connection = %conn.id, "connection loop did not exit within timeout; aborting");
                conn.task.abort();
            }
        }
        debug!(connection = %conn.id, "channel closed");
    }

    /// Queue a frame for the server. Dropped if the channel is closed.
    pub fn send(&self, frame: Frame) {
        let Some(conn) = &self.conn else {
            debug!(event = %frame.event, "channel closed, dropping request");
            return;
        };
        if let Err(mpsc::error::SendError(frame)) = conn.cmd_tx.send(frame) {
            debug!(connection = %conn.id, event = %frame.event, "connection loop gone, dropping request");
        }
    }

    /// Wait for the next event. Pends forever while the channel is closed.
    ///
    /// Cancel-safe: only awaits an `mpsc` receive.
    pub async fn recv(&mut self) -> ChannelEvent {
        let Some(conn) = self.conn.as_mut() else {
            return std::future::pending().await;
        };
        match conn.inbound.recv().await {
            Some(ChannelEvent::Frame(frame)) => ChannelEvent::Frame(frame),
            Some(ChannelEvent::Closed { reason }) => {
                self.conn = None;
                ChannelEvent::Closed { reason }
            }
            None => {
                self.conn = None;
                ChannelEvent::Closed { reason: None }
            }
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("connection", &self.conn.as_ref().map(|c| c.id))
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        // No executor is available to drive a graceful close here.
        if let Some(conn) = self.conn.take() {
            conn.task.abort();
        }
    }
}

// ── Connection loop ─────────────────────────────────────────────────

/// Background loop for one connection.
///
/// Exits when:
/// - the shutdown signal fires or the command channel closes
/// - the transport returns `None` (server closed the connection)
/// - a transport error occurs
async fn connection_loop(
    id: Uuid,
    mut transport: Box<dyn Transport>,
    mut cmd_rx: mpsc::UnboundedReceiver<Frame>,
    inbound_tx: mpsc::UnboundedSender<ChannelEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!(connection = %id, "connection loop started");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(frame) = cmd else {
                    debug!(connection = %id, "command channel closed");
                    let _ = transport.close().await;
                    break;
                };
                match frame.to_json() {
                    Ok(json) => {
                        if let Err(e) = transport.send(json).await {
                            error!(connection = %id, "transport send error: {e}");
                            let _ = inbound_tx.send(ChannelEvent::Closed {
                                reason: Some(format!("transport send error: {e}")),
                            });
                            break;
                        }
                    }
                    Err(e) => {
                        error!(connection = %id, event = %frame.event, "failed to serialize request: {e}");
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!(connection = %id, "shutdown signal received");
                let _ = transport.close().await;
                break;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match Frame::from_json(&text) {
                        Ok(frame) => {
                            if inbound_tx.send(ChannelEvent::Frame(frame)).is_err() {
                                debug!(connection = %id, "channel reader dropped");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(connection = %id, "failed to decode push: {e}, raw: {text}");
                        }
                    },
                    Some(Err(e)) => {
                        error!(connection = %id, "transport receive error: {e}");
                        let _ = inbound_tx.send(ChannelEvent::Closed {
                            reason: Some(format!("transport receive error: {e}")),
                        });
                        break;
                    }
                    None => {
                        debug!(connection = %id, "transport closed by server");
                        let _ = inbound_tx.send(ChannelEvent::Closed { reason: None });
                        break;
                    }
                }
            }
        }
    }

    debug!(connection = %id, "connection loop exited");
}

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
    use crate::error::ClientError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    // ── Router ──────────────────────────────────────────────────────

    fn add_one(state: &mut Vec<&'static str>, _frame: &Frame) -> Result<usize> {
        state.push("one");
        Ok(1)
    }

    fn add_two(state: &mut Vec<&'static str>, _frame: &Frame) -> Result<usize> {
        state.push("two");
        Ok(2)
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut router: Router<Vec<&'static str>, usize> = Router::new();
        router.on_receive("tick", add_one);
        router.on_receive("tick", add_two);

        let mut state = Vec::new();
        let out = router
            .dispatch(&mut state, &Frame::new("tick", json!(null)))
            .unwrap()
            .unwrap();
        assert_eq!(out, 2);
        assert_eq!(state, vec!["two"]);
    }

    #[test]
    fn unknown_event_is_not_dispatched() {
        let mut router: Router<Vec<&'static str>, usize> = Router::new();
        router.on_receive("tick", add_one);
        let mut state = Vec::new();
        assert!(router
            .dispatch(&mut state, &Frame::new("tock", json!(null)))
            .is_none());
        assert!(state.is_empty());
        assert!(router.handles("tick"));
        assert!(!router.handles("tock"));
    }

    // ── Mock connection ─────────────────────────────────────────────

    struct ScriptedTransport {
        incoming: VecDeque<Option<std::result::Result<String, ClientError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), ClientError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ClientError>> {
            match self.incoming.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), ClientError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    struct ScriptedConnector {
        scripts: VecDeque<Vec<Option<std::result::Result<String, ClientError>>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
        connects: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&mut self) -> std::result::Result<Box<dyn Transport>, ClientError> {
            self.connects.fetch_add(1, Ordering::Relaxed);
            let incoming = self.scripts.pop_front().unwrap_or_default();
            Ok(Box::new(ScriptedTransport {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&self.sent),
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    #[allow(clippy::type_complexity)]
    fn scripted(
        scripts: Vec<Vec<Option<std::result::Result<String, ClientError>>>>,
    ) -> (
        Channel,
        Arc<StdMutex<Vec<String>>>,
        Arc<AtomicBool>,
        Arc<AtomicUsize>,
    ) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let connects = Arc::new(AtomicUsize::new(0));
        let connector = ScriptedConnector {
            scripts: VecDeque::from(scripts),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
            connects: Arc::clone(&connects),
        };
        (Channel::new(connector), sent, closed, connects)
    }

    // ── Channel ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn send_on_closed_channel_is_dropped_silently() {
        let (channel, sent, _closed, connects) = scripted(vec![]);
        channel.send(Frame::new("startGame", json!(null)));
        assert!(!channel.is_open());
        assert_eq!(connects.load(Ordering::Relaxed), 0);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let (mut channel, _sent, _closed, connects) = scripted(vec![vec![], vec![]]);
        channel.open().await.unwrap();
        channel.open().await.unwrap();
        assert_eq!(connects.load(Ordering::Relaxed), 1);
        channel.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent_and_closes_transport() {
        let (mut channel, _sent, closed, _connects) = scripted(vec![vec![]]);
        channel.open().await.unwrap();
        channel.close().await;
        channel.close().await;
        assert!(!channel.is_open());
        assert!(closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn frames_arrive_in_order_then_close_is_reported() {
        let (mut channel, _sent, _closed, _connects) = scripted(vec![vec![
            Some(Ok(r#"{"type":"removeLog","data":1}"#.into())),
            Some(Ok("not json".into())),
            Some(Ok(r#"{"type":"removeLog","data":2}"#.into())),
            None,
        ]]);
        channel.open().await.unwrap();

        assert_eq!(
            channel.recv().await,
            ChannelEvent::Frame(Frame::new("removeLog", json!(1)))
        );
        // The undecodable message is skipped.
        assert_eq!(
            channel.recv().await,
            ChannelEvent::Frame(Frame::new("removeLog", json!(2)))
        );
        assert_eq!(channel.recv().await, ChannelEvent::Closed { reason: None });
        assert!(!channel.is_open());
    }

    #[tokio::test]
    async fn receive_error_reports_reason() {
        let (mut channel, _sent, _closed, _connects) = scripted(vec![vec![Some(Err(
            ClientError::TransportReceive("reset".into()),
        ))]]);
        channel.open().await.unwrap();
        match channel.recv().await {
            ChannelEvent::Closed { reason: Some(reason) } => {
                assert!(reason.contains("reset"), "unexpected reason {reason}");
            }
            other => panic!("expected Closed with reason, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sent_frames_reach_the_transport() {
        let (mut channel, sent, _closed, _connects) = scripted(vec![vec![]]);
        channel.open().await.unwrap();
        channel.send(Frame::new("bidRequest", json!({ "index": 2 })));
        tokio::time::sleep(Duration::from_millis(50)).await;
        {
            let messages = sent.lock().unwrap();
            assert_eq!(messages.len(), 1);
            let frame = Frame::from_json(&messages[0]).unwrap();
            assert_eq!(frame, Frame::new("bidRequest", json!({ "index": 2 })));
        }
        channel.close().await;
    }

    #[tokio::test]
    async fn reopen_uses_a_fresh_connection() {
        let (mut channel, _sent, _closed, connects) = scripted(vec![
            vec![Some(Ok(r#"{"type":"ensureLobby"}"#.into()))],
            vec![Some(Ok(r#"{"type":"ensureLobby"}"#.into()))],
        ]);
        channel.open().await.unwrap();
        assert!(matches!(channel.recv().await, ChannelEvent::Frame(_)));
        channel.close().await;
        channel.open().await.unwrap();
        assert!(matches!(channel.recv().await, ChannelEvent::Frame(_)));
        assert_eq!(connects.load(Ordering::Relaxed), 2);
        channel.close().await;
    }
}
