//! End-to-end tests: a real server on an ephemeral port, driven by real
//! WebSocket clients speaking the flat JSON protocol.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rangerace::{CoordinatorHandle, GameConfig, ServerBuilder, SessionState};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// =========================================================================
// Helpers
// =========================================================================

/// Game rules shrunk to test speed, with the round target pinned to 5.
fn fast_game() -> GameConfig {
    GameConfig {
        round_interval: Duration::from_millis(100),
        reset_delay: Duration::from_millis(300),
        target_range: 5..=5,
        ..GameConfig::default()
    }
}

async fn start_server(game: GameConfig) -> (SocketAddr, CoordinatorHandle) {
    let server = ServerBuilder::new()
        .bind("127.0.0.1:0")
        .game_config(game)
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("bound address");
    let pool = server.coordinator();
    tokio::spawn(server.run());
    (addr, pool)
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("client should connect");
    ws
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send");
}

/// Receives the next JSON event, skipping any non-text frames.
async fn recv_event(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("event should be JSON");
        }
    }
}

/// Receives events until one matches the predicate.
async fn recv_until(ws: &mut WsClient, pred: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..100 {
        let event = recv_event(ws).await;
        if pred(&event) {
            return event;
        }
    }
    panic!("expected event never arrived");
}

/// Connects and returns the client with the id assigned in its welcome.
async fn join(addr: SocketAddr) -> (WsClient, String) {
    let mut ws = connect(addr).await;
    // The welcome must be the very first event on a fresh connection.
    let welcome = recv_event(&mut ws).await;
    assert_eq!(welcome["type"], "game-info");
    assert_eq!(welcome["info"], "Welcome!");
    let id = welcome["clientID"]
        .as_str()
        .expect("welcome carries the assigned id")
        .to_string();
    (ws, id)
}

async fn play(ws: &mut WsClient, id: &str, name: &str) {
    send_json(
        ws,
        json!({ "clientID": id, "player": name, "playerMode": "play" }),
    )
    .await;
}

async fn guess(ws: &mut WsClient, id: &str, input1: u8, input2: u8) {
    send_json(
        ws,
        json!({
            "clientID": id,
            "player": "",
            "playerMode": "roundPlay",
            "input1": input1,
            "input2": input2,
        }),
    )
    .await;
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_welcome_assigns_a_fresh_id() {
    let (addr, _pool) = start_server(fast_game()).await;

    let (_ws_a, id_a) = join(addr).await;
    let (_ws_b, id_b) = join(addr).await;

    assert_eq!(id_a.len(), 32);
    assert!(id_a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(id_a, id_b);
}

#[tokio::test]
async fn test_join_notice_reaches_existing_clients() {
    let (addr, _pool) = start_server(fast_game()).await;

    let (mut ws_a, _id_a) = join(addr).await;
    let (_ws_b, _id_b) = join(addr).await;

    let notice = recv_until(&mut ws_a, |e| e["info"] == "New user joined").await;
    assert_eq!(notice["type"], "game-info");
    assert!(notice.get("clientID").is_none());
}

#[tokio::test]
async fn test_wrong_path_is_rejected() {
    let (addr, _pool) = start_server(fast_game()).await;

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/lobby")).await;
    assert!(result.is_err(), "upgrade outside /ws should fail");
}

#[tokio::test]
async fn test_two_players_start_a_session() {
    let (addr, pool) = start_server(fast_game()).await;

    let (mut ws_a, id_a) = join(addr).await;
    let (mut ws_b, id_b) = join(addr).await;
    play(&mut ws_a, &id_a, "alice").await;
    play(&mut ws_b, &id_b, "bob").await;

    let start = recv_until(&mut ws_a, |e| e["type"] == "game-start").await;
    assert_eq!(start["info"], "game started!");
    recv_until(&mut ws_b, |e| e["type"] == "game-start").await;

    let snap = pool.snapshot().await.expect("snapshot");
    assert_eq!(snap.session, SessionState::InSession);
    assert_eq!(snap.players.len(), 2);
}

#[tokio::test]
async fn test_rounds_score_guesses_and_publish_standings() {
    let (addr, _pool) = start_server(fast_game()).await;

    let (mut ws_a, id_a) = join(addr).await;
    let (mut ws_b, id_b) = join(addr).await;

    // The guess is stored before the session starts, so round 1 already
    // scores it: (3, 7) around target 5 is an inside hit worth +1.
    guess(&mut ws_a, &id_a, 3, 7).await;
    play(&mut ws_a, &id_a, "alice").await;
    play(&mut ws_b, &id_b, "bob").await;

    let info = recv_until(&mut ws_a, |e| e["type"] == "play-info").await;
    assert_eq!(info["info"], "nice, you guessed right!: 5");

    let sb = recv_until(&mut ws_a, |e| e["type"] == "scoreboard").await;
    assert_eq!(sb["info"], "round 1");
    let rows = sb["scoreboard"].as_array().expect("standings array");
    assert_eq!(rows.len(), 2);
    // alice's +1 beats bob's -1 for not guessing at all.
    assert_eq!(rows[0]["id"], id_a.as_str());
    assert_eq!(rows[0]["name"], "alice");
    assert_eq!(rows[0]["totalScore"], 1);
    assert_eq!(rows[1]["id"], id_b.as_str());
    assert_eq!(rows[1]["totalScore"], -1);
}

#[tokio::test]
async fn test_full_game_cycle() {
    let game = GameConfig {
        win_score: 5,
        // Wide enough for the mid-session join below to land before the
        // winning first round.
        round_interval: Duration::from_millis(300),
        ..fast_game()
    };
    let (addr, pool) = start_server(game).await;

    let (mut ws_a, id_a) = join(addr).await;
    let (mut ws_b, id_b) = join(addr).await;
    // An exact hit on the pinned target wins round 1 at win_score 5.
    guess(&mut ws_a, &id_a, 5, 5).await;
    play(&mut ws_a, &id_a, "alice").await;
    play(&mut ws_b, &id_b, "bob").await;
    recv_until(&mut ws_a, |e| e["type"] == "game-start").await;

    // carol arrives mid-session and queues for the next game.
    let (mut ws_c, id_c) = join(addr).await;
    play(&mut ws_c, &id_c, "carol").await;
    let wait = recv_until(&mut ws_c, |e| e["type"] == "player-wait").await;
    assert_eq!(wait["info"], "you can play when the next game begins!");

    // The winner hears its own result, then the announcement, the game end,
    // and the reset countdown, in that order.
    let info = recv_until(&mut ws_a, |e| e["type"] == "play-info").await;
    assert_eq!(info["info"], "exact match!: 5");
    let won = recv_event(&mut ws_a).await;
    assert_eq!(won["type"], "game-winner");
    assert_eq!(won["info"], "we have a winner!");
    assert_eq!(won["winner"]["id"], id_a.as_str());
    assert_eq!(won["winner"]["totalScore"], 5);
    let end = recv_event(&mut ws_a).await;
    assert_eq!(end["type"], "game-end");
    let countdown = recv_event(&mut ws_a).await;
    assert_eq!(countdown["type"], "game-info");
    assert!(
        countdown["info"]
            .as_str()
            .expect("countdown text")
            .starts_with("new game starts in")
    );

    // After the countdown carol is promoted; bob re-enters and a second
    // session starts with her in it.
    tokio::time::sleep(Duration::from_millis(500)).await;
    play(&mut ws_b, &id_b, "bob").await;
    recv_until(&mut ws_c, |e| e["type"] == "game-start").await;

    let snap = pool.snapshot().await.expect("snapshot");
    assert_eq!(snap.session, SessionState::InSession);
    assert_eq!(snap.players.len(), 2);
    assert!(snap.players.iter().any(|id| id.as_str() == id_c));
}

#[tokio::test]
async fn test_disconnect_notifies_remaining_clients() {
    let (addr, pool) = start_server(fast_game()).await;

    let (mut ws_a, _id_a) = join(addr).await;
    let (mut ws_b, _id_b) = join(addr).await;

    ws_b.close(None).await.expect("close");
    recv_until(&mut ws_a, |e| e["info"] == "User disconnected").await;

    let snap = pool.snapshot().await.expect("snapshot");
    assert_eq!(snap.connected.len(), 1);
}

#[tokio::test]
async fn test_invalid_json_closes_only_that_connection() {
    let (addr, pool) = start_server(fast_game()).await;

    let (mut ws_a, _id_a) = join(addr).await;
    let (mut ws_b, _id_b) = join(addr).await;

    send_json(&mut ws_a, json!({"clientID": 12345})).await;

    // The offender is dropped and everyone else hears about it.
    recv_until(&mut ws_b, |e| e["info"] == "User disconnected").await;
    let snap = pool.snapshot().await.expect("snapshot");
    assert_eq!(snap.connected.len(), 1);

    // The offender's socket winds down.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws_a.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "connection should close after bad input");
}
