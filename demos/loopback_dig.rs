//! # Loopback Dig Demo
//!
//! Plays one round of the digging game against a tiny scripted server that
//! runs in the same process, so no real server is needed:
//!
//! 1. join room `AB` from the lobby
//! 2. start the game
//! 3. let autobid place the bid
//! 4. dig the first clickable cell
//!
//! ## Running
//!
//! ```sh
//! RUST_LOG=parlor_client=debug,loopback_dig=info cargo run --example loopback_dig
//! ```

use async_trait::async_trait;
use parlor_client::games::dig::{Dig, DigIntent};
use parlor_client::{
    ClientConfig, ClientError, ClientEvent, Connector, Frame, GameClient, MemoryResumeStore,
    SessionStatus, Transport,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;

// ── In-process connection ───────────────────────────────────────────

struct DuplexTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for DuplexTransport {
    async fn send(&mut self, message: String) -> Result<(), ClientError> {
        self.outgoing
            .send(message)
            .map_err(|_| ClientError::TransportClosed)
    }

    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Hands out its one connection, then refuses.
struct OneShotConnector(Option<DuplexTransport>);

#[async_trait]
impl Connector for OneShotConnector {
    async fn connect(&mut self) -> Result<Box<dyn Transport>, ClientError> {
        match self.0.take() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(ClientError::TransportClosed),
        }
    }
}

// ── Scripted server ─────────────────────────────────────────────────

fn empty_grid() -> Value {
    json!([[{}, {}, {}], [{}, {}, {}], [{}, {}, {}]])
}

async fn run_server(
    mut from_client: mpsc::UnboundedReceiver<String>,
    to_client: mpsc::UnboundedSender<String>,
) -> Result<(), ClientError> {
    let push = |event: &str, data: Value| -> Result<(), ClientError> {
        to_client
            .send(Frame::new(event, data).to_json()?)
            .map_err(|_| ClientError::TransportClosed)
    };

    push("ensureLobby", Value::Null)?;
    push("updateGames", json!([{ "name": "AB", "players": [] }]))?;

    while let Some(text) = from_client.recv().await {
        let frame = Frame::from_json(&text)?;
        tracing::info!(event = %frame.event, data = %frame.data, "server received");
        match frame.event.as_str() {
            "joinRequest" => {
                push(
                    "joinedGame",
                    json!({ "gameName": "AB", "playerName": "Al", "spectating": false }),
                )?;
                push(
                    "updatePlayers",
                    json!([{ "name": "Al", "connected": true }, { "name": "Bo", "connected": true }]),
                )?;
            }
            "startGame" => {
                push("gameStarted", json!({ "grid": empty_grid() }))?;
                push(
                    "updateBids",
                    json!({
                        "acorns": 10,
                        "players": [
                            { "name": "Al", "stamina": 3, "acorns": 0 },
                            { "name": "Bo", "stamina": 3, "acorns": 0, "bid": 0 }
                        ],
                        "whoseTurn": null,
                        "bidding": true
                    }),
                )?;
            }
            "bidRequest" => {
                let index = frame.data.get("index").and_then(Value::as_u64).unwrap_or(0);
                push("appendLog", json!(format!("Al bid {index}")))?;
                push(
                    "updateBids",
                    json!({
                        "acorns": 10,
                        "players": [
                            { "name": "Al", "stamina": 3, "acorns": 0, "current": true, "bid": index },
                            { "name": "Bo", "stamina": 3, "acorns": 0, "bid": 0 }
                        ],
                        "whoseTurn": "Al",
                        "bidding": false
                    }),
                )?;
                push("updateGrid", json!({ "grid": empty_grid(), "current": true }))?;
            }
            "digRequest" => {
                let i = frame.data.get("i").and_then(Value::as_u64).unwrap_or(0);
                let j = frame.data.get("j").and_then(Value::as_u64).unwrap_or(0);
                let mut grid = empty_grid();
                let cell = grid
                    .get_mut(i as usize)
                    .and_then(|row| row.get_mut(j as usize));
                if let Some(cell) = cell {
                    *cell = json!({ "dug": 2 });
                }
                push("updateGrid", json!({ "grid": grid, "current": false }))?;
                push("appendLog", json!({ "msg": "Al dug a 2", "pos": { "i": i, "j": j } }))?;
                // Round over.
                break;
            }
            other => tracing::warn!("server ignoring {other}"),
        }
    }
    Ok(())
}

// ── Client ──────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (to_client, incoming) = mpsc::unbounded_channel();
    let (outgoing, from_client) = mpsc::unbounded_channel();
    let server = tokio::spawn(run_server(from_client, to_client));

    let connector = OneShotConnector(Some(DuplexTransport { incoming, outgoing }));
    let config = ClientConfig::default().with_autobid_delay(std::time::Duration::from_millis(200));
    let (mut client, mut events) =
        GameClient::<Dig>::start(connector, MemoryResumeStore::new(), config);
    client.perform(DigIntent::SetAutobid(true))?;

    let mut joined = false;
    let mut started = false;
    let mut dug = false;
    while let Some(event) = events.recv().await {
        let view = match event {
            ClientEvent::Render(view) => view,
            ClientEvent::Disconnected { reason } => {
                tracing::info!(?reason, "server hung up");
                break;
            }
            ClientEvent::Connected | ClientEvent::ScrollLog => continue,
        };

        if view.status == SessionStatus::Lobby && !joined {
            client.edit_join_form("ab", "Al", false)?;
            client.submit_join()?;
            joined = true;
        }
        if view.start_visible && !started {
            client.start_game()?;
            started = true;
        }
        if !dug {
            if let Some(action) = view.game.grid.iter().flatten().find_map(|cell| cell.action) {
                client.perform(action)?;
                dug = true;
            }
        }
        if let Some(line) = view.log.last() {
            tracing::info!(pot = view.game.pot, "log: {}", line.text);
        }
    }

    client.shutdown().await;
    server.await??;
    Ok(())
}
