#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for parlor client integration tests.
//!
//! [`loopback`] hands out a [`LoopbackConnector`] whose every connection is an
//! in-memory pipe, plus the matching [`ServerEnd`]s so a test can play the
//! server: push frames, read requests, hang up.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parlor_client::{ClientError, ClientEvent, ClientView, Connector, Frame, Transport};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// How long helpers wait before failing a test.
pub const WAIT: Duration = Duration::from_secs(2);

// ── Loopback transport ──────────────────────────────────────────────

pub struct LoopbackTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), ClientError> {
        self.outgoing
            .send(message)
            .map_err(|_| ClientError::TransportClosed)
    }

    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.incoming.close();
        Ok(())
    }
}

/// The server's side of one loopback connection.
pub struct ServerEnd {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    pub fn push(&self, event: &str, data: Value) {
        let text = Frame::new(event, data).to_json().unwrap();
        self.push_raw(text);
    }

    /// Send an arbitrary text message, decodable or not.
    pub fn push_raw(&self, text: impl Into<String>) {
        self.to_client
            .as_ref()
            .expect("server already hung up")
            .send(text.into())
            .expect("client transport gone");
    }

    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// Next request from the client.
    pub async fn request(&mut self) -> Frame {
        let text = tokio::time::timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for a request")
            .expect("client side closed");
        Frame::from_json(&text).unwrap()
    }

    /// Assert nothing arrives for a short while.
    pub async fn assert_silent(&mut self) {
        let got = tokio::time::timeout(Duration::from_millis(100), self.from_client.recv()).await;
        if let Ok(Some(text)) = got {
            panic!("unexpected request: {text}");
        }
    }
}

pub struct LoopbackConnector {
    pending: VecDeque<LoopbackTransport>,
    connects: Arc<AtomicUsize>,
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&mut self) -> Result<Box<dyn Transport>, ClientError> {
        self.connects.fetch_add(1, Ordering::Relaxed);
        match self.pending.pop_front() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no more loopback connections",
            ))),
        }
    }
}

/// A connector good for `connections` opens, the server ends in the same
/// order, and a counter of connection attempts.
pub fn loopback(connections: usize) -> (LoopbackConnector, Vec<ServerEnd>, Arc<AtomicUsize>) {
    let mut pending = VecDeque::new();
    let mut servers = Vec::new();
    for _ in 0..connections {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        pending.push_back(LoopbackTransport { incoming, outgoing });
        servers.push(ServerEnd {
            to_client: Some(to_client),
            from_client,
        });
    }
    let connects = Arc::new(AtomicUsize::new(0));
    (
        LoopbackConnector {
            pending,
            connects: Arc::clone(&connects),
        },
        servers,
        connects,
    )
}

// ── Event helpers ───────────────────────────────────────────────────

/// Wait for the first event matching `pred`, skipping the rest.
pub async fn next_event<V: std::fmt::Debug>(
    events: &mut mpsc::Receiver<ClientEvent<V>>,
    pred: impl Fn(&ClientEvent<V>) -> bool,
) -> ClientEvent<V> {
    tokio::time::timeout(WAIT, async {
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

/// Wait for the first render matching `pred`.
pub async fn next_render<V: std::fmt::Debug>(
    events: &mut mpsc::Receiver<ClientEvent<V>>,
    pred: impl Fn(&ClientView<V>) -> bool,
) -> ClientView<V> {
    let event = next_event(events, |e| matches!(e, ClientEvent::Render(view) if pred(view))).await;
    match event {
        ClientEvent::Render(view) => view,
        other => panic!("expected a render, got {other:?}"),
    }
}

// ── Payload builders ────────────────────────────────────────────────

pub fn joined_game(room: &str, player: &str, spectating: bool) -> Value {
    json!({ "gameName": room, "playerName": player, "spectating": spectating })
}

pub fn seats(names: &[(&str, bool)]) -> Value {
    Value::Array(
        names
            .iter()
            .map(|(name, connected)| json!({ "name": name, "connected": connected }))
            .collect(),
    )
}

pub fn join_request(room: &str, player: &str, spectate: bool) -> Frame {
    Frame::new(
        "joinRequest",
        json!({ "gameName": room, "playerName": player, "spectate": spectate }),
    )
}
