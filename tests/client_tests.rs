#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end tests driving a [`GameClient`] against a loopback server.

mod common;

use std::sync::atomic::Ordering;

use common::{join_request, joined_game, loopback, next_event, next_render, seats};
use parlor_client::games::arrows::{ArrowIntent, Arrows};
use parlor_client::games::counting::Counting;
use parlor_client::games::dig::{Dig, DigIntent};
use parlor_client::{
    ClientConfig, ClientEvent, Frame, GameClient, MemoryResumeStore, SessionStatus,
};
use serde_json::json;

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn join_then_navigate_back_and_forward() {
    let (connector, mut servers, connects) = loopback(2);
    let store = MemoryResumeStore::new();
    let (client, mut events) =
        GameClient::<Dig>::start(connector, store.clone(), ClientConfig::default());

    servers[0].push("ensureLobby", json!(null));
    servers[0].push(
        "updateGames",
        json!([{ "name": "AB", "players": [{ "name": "Al", "connected": false }] }]),
    );
    let view = next_render(&mut events, |v| v.directory.is_some()).await;
    assert_eq!(view.status, SessionStatus::Lobby);

    client.edit_join_form("ab", "Al", false).unwrap();
    client.submit_join().unwrap();
    assert_eq!(servers[0].request().await, join_request("AB", "Al", false));

    servers[0].push("joinedGame", joined_game("AB", "Al", false));
    let view = next_render(&mut events, |v| v.status == SessionStatus::SeatedWaiting).await;
    assert!(!view.join_form.enabled);
    assert!(view.start_visible);
    assert_eq!(store.titles(), vec!["lobby".to_string(), "Game AB".to_string()]);

    // Back to the lobby: the channel is reset.
    assert!(store.back());
    next_event(&mut events, |e| *e == ClientEvent::Connected).await;
    assert_eq!(connects.load(Ordering::Relaxed), 2);
    servers[1].push("ensureLobby", json!(null));
    let view = next_render(&mut events, |v| v.status == SessionStatus::Lobby).await;
    assert!(view.join_form.enabled);

    // Forward again: the saved tuple is re-sent on the fresh connection.
    assert!(store.forward());
    assert_eq!(servers[1].request().await, join_request("AB", "Al", false));
    servers[1].push("joinedGame", joined_game("AB", "Al", false));
    next_render(&mut events, |v| v.status == SessionStatus::SeatedWaiting).await;
    assert_eq!(store.titles().len(), 2);
}

#[tokio::test]
async fn reclaiming_a_disconnected_seat_prefills_the_join() {
    let (connector, mut servers, _connects) = loopback(1);
    let (client, mut events) =
        GameClient::<Dig>::start(connector, MemoryResumeStore::new(), ClientConfig::default());

    servers[0].push("ensureLobby", json!(null));
    servers[0].push(
        "updateGames",
        json!([{ "name": "CD", "players": [{ "name": "Bo", "connected": false }] }]),
    );
    next_render(&mut events, |v| v.directory.is_some()).await;

    client.click_seat("CD", "Bo").unwrap();
    let view = next_render(&mut events, |v| v.join_form.name == "Bo").await;
    assert_eq!(view.join_form.room, "CD");
    let rooms = view.directory.unwrap();
    assert!(rooms[0].players[0].selected);

    client.submit_join().unwrap();
    assert_eq!(servers[0].request().await, join_request("CD", "Bo", false));
}

#[tokio::test]
async fn spectator_never_sees_start_or_undo() {
    let (connector, mut servers, _connects) = loopback(1);
    let (client, mut events) =
        GameClient::<Dig>::start(connector, MemoryResumeStore::new(), ClientConfig::default());

    servers[0].push("ensureLobby", json!(null));
    servers[0].push("joinedGame", joined_game("AB", "Sy", true));
    servers[0].push("updateSpectators", seats(&[("Sy", true)]));
    servers[0].push("showUndo", json!(true));
    let view = next_render(&mut events, |v| !v.spectators.is_empty()).await;
    assert_eq!(view.status, SessionStatus::Spectating);
    assert!(!view.start_visible);
    assert!(!view.undo_visible);
    assert!(view.spectators[0].is_local);

    client.start_game().unwrap();
    client.undo().unwrap();
    servers[0].assert_silent().await;
}

#[tokio::test]
async fn start_and_undo_for_seated_player() {
    let (connector, mut servers, _connects) = loopback(1);
    let (client, mut events) =
        GameClient::<Dig>::start(connector, MemoryResumeStore::new(), ClientConfig::default());

    servers[0].push("ensureLobby", json!(null));
    servers[0].push("joinedGame", joined_game("AB", "Al", false));
    next_render(&mut events, |v| v.start_visible).await;

    client.start_game().unwrap();
    assert_eq!(servers[0].request().await, Frame::new("startGame", json!(null)));

    servers[0].push("gameStarted", json!(null));
    servers[0].push("showUndo", json!(true));
    let view = next_render(&mut events, |v| v.undo_visible).await;
    assert!(view.play_visible);
    assert!(!view.start_visible);

    client.undo().unwrap();
    assert_eq!(servers[0].request().await, Frame::new("undoRequest", json!(null)));
}

#[tokio::test]
async fn error_slot_cleared_by_next_state_push() {
    let (connector, servers, _connects) = loopback(1);
    let (_client, mut events) =
        GameClient::<Dig>::start(connector, MemoryResumeStore::new(), ClientConfig::default());

    servers[0].push("ensureLobby", json!(null));
    servers[0].push("errorMsg", json!("room is full"));
    let view = next_render(&mut events, |v| v.error.is_some()).await;
    assert_eq!(view.error.as_deref(), Some("room is full"));

    servers[0].push("updateUnseated", seats(&[("Cy", true)]));
    let view = next_render(&mut events, |v| !v.unseated.is_empty()).await;
    assert_eq!(view.error, None);
}

#[tokio::test]
async fn bad_pushes_do_not_end_the_session() {
    let (connector, servers, _connects) = loopback(1);
    let (client, mut events) =
        GameClient::<Counting>::start(connector, MemoryResumeStore::new(), ClientConfig::default());

    servers[0].push("ensureLobby", json!(null));
    servers[0].push("joinedGame", joined_game("AB", "Al", false));
    servers[0].push("updateBoard", json!([1, 2, 3, 4]));
    servers[0].push_raw("definitely not json");
    servers[0].push("updateWeather", json!({ "sunny": true }));
    servers[0].push("updateBoard", json!([9, 9]));
    servers[0].push("appendLog", json!("still here"));

    let view = next_render(&mut events, |v| !v.log.is_empty()).await;
    let counters: Vec<&str> = view.game.counters.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(counters, vec!["1", "2", "3", "4"]);
    assert!(client.is_connected());
}

#[tokio::test]
async fn log_highlight_and_remove() {
    let (connector, servers, _connects) = loopback(1);
    let (client, mut events) =
        GameClient::<Dig>::start(connector, MemoryResumeStore::new(), ClientConfig::default());

    servers[0].push("ensureLobby", json!(null));
    servers[0].push("joinedGame", joined_game("AB", "Al", false));
    servers[0].push("gameStarted", json!({ "grid": [[{}, {}], [{}, {}]] }));
    servers[0].push("appendLog", json!("Al bid 1"));
    servers[0].push("appendLog", json!({ "msg": "Al dug", "pos": { "i": 0, "j": 1 } }));
    next_render(&mut events, |v| v.log.len() == 2).await;

    client.click_log(1).unwrap();
    let view = next_render(&mut events, |v| v.log.iter().any(|l| l.highlighted)).await;
    assert!(view.game.grid[0][1].highlighted);

    servers[0].push("removeLog", json!(1));
    let view = next_render(&mut events, |v| v.log.len() == 1).await;
    assert!(view.log.iter().all(|l| !l.highlighted));
    assert!(view.game.grid.iter().flatten().all(|c| !c.highlighted));
}

// ── Games ───────────────────────────────────────────────────────────

#[tokio::test]
async fn dig_grid_clicks_send_dig_requests() {
    let (connector, mut servers, _connects) = loopback(1);
    let (client, mut events) =
        GameClient::<Dig>::start(connector, MemoryResumeStore::new(), ClientConfig::default());

    servers[0].push("ensureLobby", json!(null));
    servers[0].push("joinedGame", joined_game("AB", "Al", false));
    servers[0].push("gameStarted", json!(null));
    servers[0].push(
        "updateGrid",
        json!({
            "grid": [
                [{}, {}, {}],
                [{}, { "dug": 3, "acorn": false }, {}],
                [{}, {}, {}]
            ],
            "current": true
        }),
    );
    let view = next_render(&mut events, |v| v.game.grid.len() == 3).await;
    let center = &view.game.grid[1][1];
    assert_eq!((center.text.as_str(), center.style), ("3", "yellow"));
    assert!(!center.is_clickable());
    let clickable = view.game.grid.iter().flatten().filter(|c| c.is_clickable()).count();
    assert_eq!(clickable, 8);

    let action = view.game.grid[2][0].action.unwrap();
    assert_eq!(action, DigIntent::Dig { i: 2, j: 0 });
    client.perform(action).unwrap();
    assert_eq!(
        servers[0].request().await,
        Frame::new("digRequest", json!({ "i": 2, "j": 0 }))
    );
}

#[tokio::test]
async fn arrows_drop_on_empty_cells_while_holding_a_piece() {
    let (connector, mut servers, _connects) = loopback(1);
    let (client, mut events) =
        GameClient::<Arrows>::start(connector, MemoryResumeStore::new(), ClientConfig::default());

    servers[0].push("ensureLobby", json!(null));
    servers[0].push("joinedGame", joined_game("AB", "Al", false));
    servers[0].push("gameStarted", json!(null));
    servers[0].push("updateBoard", json!([null, { "d": [0, 1, 2, 3] }, null]));
    servers[0].push(
        "updatePieces",
        json!({
            "pieces": [{ "d": [1, 1, 0, 0] }, { "d": [2, 0, 2, 0], "selected": true }],
            "currentPlayer": "Al"
        }),
    );
    let view = next_render(&mut events, |v| !v.game.hand.is_empty()).await;
    assert!(view.game.hand.iter().all(|c| !c.is_clickable()));
    assert_eq!(view.game.board[0].action, Some(ArrowIntent::Drop(0)));
    assert_eq!(view.game.board[1].action, None);
    assert_eq!(view.game.board[2].action, Some(ArrowIntent::Drop(2)));

    client.perform(ArrowIntent::Drop(2)).unwrap();
    assert_eq!(
        servers[0].request().await,
        Frame::new("dropRequest", json!({ "index": 2 }))
    );
}
