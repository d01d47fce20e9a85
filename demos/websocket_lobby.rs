//! # WebSocket Lobby Demo
//!
//! Connects a digging-game client to a running server, joins a room once the
//! lobby arrives, and logs every render until Ctrl+C or disconnect.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example websocket_lobby
//!
//! # Override the server URL, room and player name:
//! PARLOR_URL=ws://my-server:8000/dig PARLOR_ROOM=CD PARLOR_NAME=Bo \
//!     cargo run --example websocket_lobby
//! ```

use std::time::Duration;

use parlor_client::games::dig::Dig;
use parlor_client::{
    ClientConfig, ClientEvent, GameClient, MemoryResumeStore, SessionStatus, WebSocketConnector,
};

const DEFAULT_URL: &str = "ws://localhost:8000/dig";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("PARLOR_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let room = std::env::var("PARLOR_ROOM").unwrap_or_else(|_| "AB".to_string());
    let name = std::env::var("PARLOR_NAME").unwrap_or_else(|_| "Al".to_string());
    tracing::info!("connecting to {url}");

    let connector = WebSocketConnector::new(url).with_timeout(Duration::from_secs(5));
    let (mut client, mut events) =
        GameClient::<Dig>::start(connector, MemoryResumeStore::new(), ClientConfig::default());

    let mut join_sent = false;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("session ended");
                    break;
                };
                match event {
                    ClientEvent::Connected => tracing::info!("connected"),
                    ClientEvent::Disconnected { reason } => {
                        tracing::warn!(?reason, "disconnected");
                        break;
                    }
                    ClientEvent::ScrollLog => {}
                    ClientEvent::Render(view) => {
                        if let Some(error) = &view.error {
                            tracing::warn!("server says: {error}");
                        }
                        if view.status == SessionStatus::Lobby && !join_sent {
                            client.edit_join_form(room.as_str(), name.as_str(), false)?;
                            client.submit_join()?;
                            join_sent = true;
                        }
                        tracing::info!(
                            status = ?view.status,
                            room = ?view.room,
                            players = view.players.len(),
                            log = view.log.len(),
                            "render"
                        );
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
