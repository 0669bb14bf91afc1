//! Integration tests for the Duelboard server over real WebSocket clients.

use std::time::Duration;

use duelboard::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

async fn start_server_with(builder: DuelboardServerBuilder) -> String {
    let server = builder.bind("127.0.0.1:0").build().await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    format!("ws://{addr}")
}

async fn start_server() -> String {
    start_server_with(DuelboardServer::builder()).await
}

async fn connect(url: &str) -> Client {
    let (ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws
}

async fn send(ws: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data });
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

async fn send_raw(ws: &mut Client, text: &str) {
    ws.send(Message::Text(text.to_owned().into())).await.unwrap();
}

/// Receives the next event, failing the test after two seconds.
async fn recv(ws: &mut Client) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(_) | Message::Binary(_) => {
                return serde_json::from_slice(&msg.into_data()).unwrap();
            }
            _ => continue,
        }
    }
}

/// Asserts nothing arrives for a short while.
async fn assert_silent(ws: &mut Client) {
    let next = tokio::time::timeout(Duration::from_millis(150), ws.next()).await;
    assert!(next.is_err(), "expected no event, got {next:?}");
}

async fn join(ws: &mut Client, room: &str, name: &str) -> ServerEvent {
    send(ws, "join", json!({ "room": room, "name": name })).await;
    recv(ws).await
}

/// Seats Alice (black) and Bob (white) in `room` and drains the
/// join-time events from both sockets.
async fn start_game(url: &str, room: &str) -> (Client, Client) {
    let mut alice = connect(url).await;
    let mut bob = connect(url).await;

    assert!(matches!(join(&mut alice, room, "Alice").await, ServerEvent::RoomJoined(_)));
    assert!(matches!(join(&mut bob, room, "Bob").await, ServerEvent::RoomJoined(_)));
    assert!(matches!(recv(&mut bob).await, ServerEvent::StartGame(_)));
    assert!(matches!(recv(&mut alice).await, ServerEvent::OpponentJoined(_)));
    assert!(matches!(recv(&mut alice).await, ServerEvent::StartGame(_)));

    (alice, bob)
}

// =========================================================================
// Build
// =========================================================================

#[tokio::test]
async fn test_build_zero_reap_interval_is_config_error() {
    let result = DuelboardServer::builder()
        .bind("127.0.0.1:0")
        .reap_interval(Duration::ZERO)
        .build()
        .await;

    assert!(matches!(
        result,
        Err(DuelboardError::Config { key: "reap_interval", .. })
    ));
}

#[tokio::test]
async fn test_build_zero_reap_interval_in_config_is_config_error() {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".into(),
        reap_interval: Duration::ZERO,
        ..ServerConfig::default()
    };

    let result = DuelboardServer::builder().config(config).build().await;

    assert!(matches!(result, Err(DuelboardError::Config { .. })));
}

// =========================================================================
// Join
// =========================================================================

#[tokio::test]
async fn test_join_two_players_both_receive_start_game() {
    let url = start_server().await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    match join(&mut alice, "R1", "Alice").await {
        ServerEvent::RoomJoined(joined) => {
            assert_eq!(joined.color, Role::First);
            assert_eq!(joined.current_turn, Role::First);
            assert_eq!(joined.player_name, "Alice");
            assert_eq!(joined.room_id, "R1");
            assert_eq!(joined.opponent_name, None);
            assert_eq!(joined.board.size(), DEFAULT_BOARD_SIZE);
        }
        other => panic!("expected room_joined, got {other:?}"),
    }

    match join(&mut bob, "R1", "Bob").await {
        ServerEvent::RoomJoined(joined) => {
            assert_eq!(joined.color, Role::Second);
            assert_eq!(joined.opponent_name.as_deref(), Some("Alice"));
        }
        other => panic!("expected room_joined, got {other:?}"),
    }

    match recv(&mut alice).await {
        ServerEvent::OpponentJoined(joined) => {
            assert_eq!(joined.opponent_name, "Bob");
            assert_eq!(joined.opponent_color, Role::Second);
        }
        other => panic!("expected opponent_joined, got {other:?}"),
    }

    for ws in [&mut alice, &mut bob] {
        match recv(ws).await {
            ServerEvent::StartGame(start) => {
                assert_eq!(start.current_turn, Role::First);
                assert_eq!(start.room_id, "R1");
                assert_eq!(start.player_names.first, "Alice");
                assert_eq!(start.player_names.second, "Bob");
            }
            other => panic!("expected start_game, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_join_in_binary_frame_is_accepted() {
    let url = start_server().await;
    let mut ws = connect(&url).await;
    let frame = json!({ "event": "join", "data": { "room": "R1", "name": "Alice" } });

    ws.send(Message::Binary(frame.to_string().into_bytes().into()))
        .await
        .unwrap();

    match recv(&mut ws).await {
        ServerEvent::RoomJoined(joined) => {
            assert_eq!(joined.room_id, "R1");
            assert_eq!(joined.player_name, "Alice");
        }
        other => panic!("expected room_joined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_numeric_room_id_is_normalized_to_string() {
    let url = start_server().await;
    let mut ws = connect(&url).await;

    send(&mut ws, "join", json!({ "room": 42, "name": "Alice" })).await;

    match recv(&mut ws).await {
        ServerEvent::RoomJoined(joined) => assert_eq!(joined.room_id, "42"),
        other => panic!("expected room_joined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_third_player_receives_room_full() {
    let url = start_server().await;
    let (_alice, _bob) = start_game(&url, "R1").await;
    let mut carol = connect(&url).await;

    assert_eq!(join(&mut carol, "R1", "Carol").await, ServerEvent::RoomFull {});
}

#[tokio::test]
async fn test_join_twice_receives_join_failed() {
    let url = start_server().await;
    let mut ws = connect(&url).await;
    join(&mut ws, "R1", "Alice").await;

    match join(&mut ws, "R2", "Alice").await {
        ServerEvent::JoinFailed { message } => assert_eq!(message, "You are already in a room"),
        other => panic!("expected join_failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_malformed_payload_receives_join_error() {
    let url = start_server().await;
    let mut ws = connect(&url).await;

    send(&mut ws, "join", json!({ "name": "Alice" })).await;
    assert!(matches!(recv(&mut ws).await, ServerEvent::JoinError { .. }));

    // The connection is still usable.
    assert!(matches!(join(&mut ws, "R1", "Alice").await, ServerEvent::RoomJoined(_)));
}

#[tokio::test]
async fn test_join_over_room_limit_receives_join_failed() {
    let config = RoomConfig {
        max_rooms: Some(1),
        ..RoomConfig::default()
    };
    let url = start_server_with(DuelboardServer::builder().room_config(config)).await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    join(&mut alice, "R1", "Alice").await;

    assert!(matches!(join(&mut bob, "R2", "Bob").await, ServerEvent::JoinFailed { .. }));
}

// =========================================================================
// Moves
// =========================================================================

#[tokio::test]
async fn test_move_valid_is_broadcast_to_both_players() {
    let url = start_server().await;
    let (mut alice, mut bob) = start_game(&url, "R1").await;

    send(&mut alice, "move", json!({ "room": "R1", "row": 0, "column": 0, "player": 2 })).await;

    for ws in [&mut alice, &mut bob] {
        match recv(ws).await {
            ServerEvent::MoveMade(made) => {
                assert_eq!((made.row, made.column, made.player), (0, 0, 2));
                assert_eq!(made.current_turn, Role::Second);
                assert_eq!(made.board.cell(0, 0), Some(2));
            }
            other => panic!("expected move_made, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_move_out_of_turn_is_rejected_to_sender_only() {
    let url = start_server().await;
    let (mut alice, mut bob) = start_game(&url, "R1").await;

    send(&mut alice, "move", json!({ "room": "R1", "row": 0, "column": 0, "player": 2 })).await;
    recv(&mut alice).await;
    recv(&mut bob).await;

    send(&mut alice, "move", json!({ "room": "R1", "row": 0, "column": 1, "player": 2 })).await;

    assert!(matches!(recv(&mut alice).await, ServerEvent::InvalidMove(_)));
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_move_occupied_cell_is_rejected() {
    let url = start_server().await;
    let (mut alice, mut bob) = start_game(&url, "R1").await;

    send(&mut alice, "move", json!({ "room": "R1", "row": 3, "column": 3, "player": 2 })).await;
    recv(&mut alice).await;
    recv(&mut bob).await;

    send(&mut bob, "move", json!({ "room": "R1", "row": 3, "column": 3, "player": 1 })).await;

    match recv(&mut bob).await {
        ServerEvent::InvalidMove(invalid) => assert!(invalid.reason.contains("occupied")),
        other => panic!("expected invalid_move, got {other:?}"),
    }
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_move_malformed_payload_receives_error() {
    let url = start_server().await;
    let (mut alice, _bob) = start_game(&url, "R1").await;

    send(&mut alice, "move", json!({ "room": "R1", "row": "zero" })).await;

    assert!(matches!(recv(&mut alice).await, ServerEvent::Error { .. }));
}

// =========================================================================
// Win relay
// =========================================================================

#[tokio::test]
async fn test_win_payload_is_echoed_to_both_players() {
    let url = start_server().await;
    let (mut alice, mut bob) = start_game(&url, "R1").await;
    let payload = json!({ "room": "R1", "winner": 2, "line": [[0, 0], [0, 4]] });

    send(&mut alice, "win", payload.clone()).await;

    for ws in [&mut alice, &mut bob] {
        assert_eq!(recv(ws).await, ServerEvent::GameOver(payload.clone()));
    }
}

// =========================================================================
// Malformed frames
// =========================================================================

#[tokio::test]
async fn test_non_json_frame_receives_error_and_connection_survives() {
    let url = start_server().await;
    let mut ws = connect(&url).await;

    send_raw(&mut ws, "not json at all").await;
    assert!(matches!(recv(&mut ws).await, ServerEvent::Error { .. }));

    assert!(matches!(join(&mut ws, "R1", "Alice").await, ServerEvent::RoomJoined(_)));
}

#[tokio::test]
async fn test_unknown_event_receives_error() {
    let url = start_server().await;
    let mut ws = connect(&url).await;

    send(&mut ws, "chat", json!({ "text": "hi" })).await;

    match recv(&mut ws).await {
        ServerEvent::Error { message } => assert!(message.contains("chat")),
        other => panic!("expected error, got {other:?}"),
    }
}

// =========================================================================
// Disconnect
// =========================================================================

#[tokio::test]
async fn test_disconnect_notifies_remaining_player() {
    let url = start_server().await;
    let (mut alice, mut bob) = start_game(&url, "R1").await;

    bob.close(None).await.unwrap();

    match recv(&mut alice).await {
        ServerEvent::OpponentLeft(left) => {
            assert_eq!(left.color, Role::Second);
            assert_eq!(left.name, "Bob");
        }
        other => panic!("expected opponent_left, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disconnect_frees_seat_for_new_player() {
    let url = start_server().await;
    let (mut alice, mut bob) = start_game(&url, "R1").await;

    bob.close(None).await.unwrap();
    assert!(matches!(recv(&mut alice).await, ServerEvent::OpponentLeft(_)));

    let mut carol = connect(&url).await;
    match join(&mut carol, "R1", "Carol").await {
        ServerEvent::RoomJoined(joined) => {
            assert_eq!(joined.color, Role::Second);
            assert_eq!(joined.opponent_name.as_deref(), Some("Alice"));
        }
        other => panic!("expected room_joined, got {other:?}"),
    }
}

// =========================================================================
// Idle reaping
// =========================================================================

#[tokio::test]
async fn test_idle_room_is_expired_and_player_can_rejoin() {
    let config = RoomConfig {
        idle_timeout: Some(Duration::from_millis(50)),
        ..RoomConfig::default()
    };
    let url = start_server_with(
        DuelboardServer::builder()
            .room_config(config)
            .reap_interval(Duration::from_millis(25)),
    )
    .await;
    let mut ws = connect(&url).await;

    join(&mut ws, "R1", "Alice").await;

    assert_eq!(
        recv(&mut ws).await,
        ServerEvent::RoomExpired {
            room_id: "R1".into()
        }
    );
    assert!(matches!(join(&mut ws, "R1", "Alice").await, ServerEvent::RoomJoined(_)));
}
