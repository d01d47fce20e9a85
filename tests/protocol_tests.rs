#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests: JSON fixtures as the game server sends them, and the
//! exact JSON of every request the client can send.

use parlor_client::games::arrows::{ArrowRequest, PiecesUpdate};
use parlor_client::games::counting::CountingRequest;
use parlor_client::games::dig::{BidsUpdate, DigRequest, GridUpdate};
use parlor_client::protocol::{
    CellRef, Frame, JoinedGame, LogEntry, Participant, RoomSummary, SessionRequest,
};
use parlor_client::ClientError;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

fn decode(text: &str) -> Frame {
    assert_ok!(Frame::from_json(text))
}

fn encoded<M: serde::Serialize>(request: &M) -> Value {
    let text = Frame::encode(request).unwrap().to_json().unwrap();
    serde_json::from_str(&text).unwrap()
}

// ════════════════════════════════════════════════════════════════════
// Server pushes
// ════════════════════════════════════════════════════════════════════

#[test]
fn ensure_lobby_without_data() {
    let frame = decode(r#"{"type":"ensureLobby"}"#);
    assert_eq!(frame.event, "ensureLobby");
    assert_eq!(frame.data, Value::Null);
}

#[test]
fn update_games_fixture() {
    let frame = decode(
        r#"{"type":"updateGames","data":[
            {"name":"AB","players":[{"name":"Al","connected":true},{"name":"Bo","connected":false}]},
            {"name":"CD","players":[]}
        ]}"#,
    );
    let rooms: Vec<RoomSummary> = frame.payload().unwrap();
    assert_eq!(rooms.len(), 2);
    assert_eq!(
        rooms[0].players[1],
        Participant {
            name: "Bo".into(),
            connected: false
        }
    );
}

#[test]
fn joined_game_fixture() {
    let frame = decode(
        r#"{"type":"joinedGame","data":{"gameName":"AB","playerName":"Al","spectating":true}}"#,
    );
    let joined: JoinedGame = frame.payload().unwrap();
    assert_eq!(joined.game_name, "AB");
    assert_eq!(joined.player_name, "Al");
    assert!(joined.spectating);
}

#[test]
fn append_log_accepts_text_and_linked_entries() {
    let plain: LogEntry = decode(r#"{"type":"appendLog","data":"Al joined"}"#)
        .payload()
        .unwrap();
    assert_eq!(plain.message(), "Al joined");
    assert_eq!(plain.position(), None);

    let linked: LogEntry =
        decode(r#"{"type":"appendLog","data":{"msg":"Al dug","pos":{"i":2,"j":1}}}"#)
            .payload()
            .unwrap();
    assert_eq!(linked.message(), "Al dug");
    assert_eq!(linked.position(), Some(CellRef { i: 2, j: 1 }));
}

#[test]
fn update_bids_fixture() {
    let frame = decode(
        r#"{"type":"updateBids","data":{
            "acorns":14,
            "players":[
                {"name":"Al","stamina":3,"acorns":2,"current":true,"socketId":"x1","bid":1},
                {"name":"Bo","stamina":5,"acorns":0,"current":false}
            ],
            "whoseTurn":"Bo",
            "bidding":true
        }}"#,
    );
    let bids: BidsUpdate = frame.payload().unwrap();
    assert_eq!(bids.acorns, 14);
    assert_eq!(bids.players[0].socket_id.as_deref(), Some("x1"));
    assert_eq!(bids.players[0].bid, Some(1));
    assert_eq!(bids.players[1].bid, None);
    assert_eq!(bids.whose_turn.as_deref(), Some("Bo"));
}

#[test]
fn update_grid_fixture() {
    let frame = decode(
        r#"{"type":"updateGrid","data":{"grid":[[{},{"dug":2}],[{"acorn":true},{"dug":0,"acorn":false}]],"current":false}}"#,
    );
    let grid: GridUpdate = frame.payload().unwrap();
    assert!(!grid.current);
    assert!(!grid.grid[0][0].is_revealed());
    assert!(grid.grid[1][0].is_treasure());
    assert_eq!(grid.grid[1][1].dug, Some(0));
}

#[test]
fn update_pieces_fixture() {
    let frame = decode(
        r#"{"type":"updatePieces","data":{"pieces":[{"d":[0,1,2,3]},{"d":[3,2,1,0],"selected":true}],"currentPlayer":"Al"}}"#,
    );
    let pieces: PiecesUpdate = frame.payload().unwrap();
    assert!(!pieces.pieces[0].selected);
    assert!(pieces.pieces[1].selected);
    assert_eq!(pieces.current_player.as_deref(), Some("Al"));
}

#[test]
fn payload_mismatch_is_invalid_payload() {
    let frame = decode(r#"{"type":"removeLog","data":"all"}"#);
    let err = assert_err!(frame.payload::<usize>());
    match err {
        ClientError::InvalidPayload { event, .. } => assert_eq!(event, "removeLog"),
        other => panic!("expected InvalidPayload, got {other:?}"),
    }
}

#[test]
fn frames_without_type_are_rejected() {
    assert_err!(Frame::from_json(r#"{"data":1}"#));
    assert_err!(Frame::from_json("[]"));
}

// ════════════════════════════════════════════════════════════════════
// Client requests
// ════════════════════════════════════════════════════════════════════

#[test]
fn session_requests() {
    assert_eq!(
        encoded(&SessionRequest::JoinRequest {
            game_name: "AB".into(),
            player_name: "Al".into(),
            spectate: false,
        }),
        json!({ "type": "joinRequest", "data": { "gameName": "AB", "playerName": "Al", "spectate": false } })
    );
    assert_eq!(encoded(&SessionRequest::StartGame), json!({ "type": "startGame" }));
    assert_eq!(encoded(&SessionRequest::UndoRequest), json!({ "type": "undoRequest" }));
}

#[test]
fn game_requests() {
    assert_eq!(
        encoded(&DigRequest::Bid { index: 3 }),
        json!({ "type": "bidRequest", "data": { "index": 3 } })
    );
    assert_eq!(
        encoded(&DigRequest::Dig { i: 0, j: 4 }),
        json!({ "type": "digRequest", "data": { "i": 0, "j": 4 } })
    );
    assert_eq!(
        encoded(&ArrowRequest::Pick { index: 1 }),
        json!({ "type": "pickRequest", "data": { "index": 1 } })
    );
    assert_eq!(
        encoded(&ArrowRequest::Drop { index: 5 }),
        json!({ "type": "dropRequest", "data": { "index": 5 } })
    );
    assert_eq!(
        encoded(&CountingRequest::SetMinReward { number: 2 }),
        json!({ "type": "setMinReward", "data": { "number": 2 } })
    );
    assert_eq!(
        encoded(&CountingRequest::SetMaxReward { number: 8 }),
        json!({ "type": "setMaxReward", "data": { "number": 8 } })
    );
}
