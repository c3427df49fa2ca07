//! Integration tests for the WebSocket transport, using real sockets and a
//! real `tokio-tungstenite` client.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rangerace_transport::{WebSocketConnection, WebSocketTransport};
use tokio_tungstenite::tungstenite::Message;

type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const WRITE_DEADLINE: Duration = Duration::from_secs(5);

// =========================================================================
// Helpers
// =========================================================================

async fn bind() -> (WebSocketTransport, SocketAddr) {
    let transport = WebSocketTransport::bind("127.0.0.1:0")
        .await
        .expect("transport should bind");
    let addr = transport.local_addr().expect("bound address");
    (transport, addr)
}

async fn connect(addr: SocketAddr, path: &str) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("client should connect");
    ws
}

/// Accepts one connection and upgrades it on `/ws`.
fn accept_one(transport: WebSocketTransport) -> tokio::task::JoinHandle<WebSocketConnection> {
    tokio::spawn(async move {
        let pending = transport.accept().await.expect("accept");
        pending
            .upgrade("/ws", WRITE_DEADLINE)
            .await
            .expect("upgrade")
    })
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_upgrade_and_exchange_text() {
    let (transport, addr) = bind().await;

    let server = tokio::spawn(async move {
        let pending = transport.accept().await.expect("accept");
        assert!(pending.peer_addr().ip().is_loopback());
        pending
            .upgrade("/ws", WRITE_DEADLINE)
            .await
            .expect("upgrade")
    });

    let mut client = connect(addr, "/ws").await;
    let conn = server.await.expect("server task");

    client
        .send(Message::text("hello".to_string()))
        .await
        .expect("client send");
    let received = conn.recv().await.expect("server recv");
    assert_eq!(received.as_deref(), Some("hello"));

    conn.send("world").await.expect("server send");
    let reply = client.next().await.expect("client recv").expect("frame");
    assert_eq!(reply, Message::text("world".to_string()));
}

#[tokio::test]
async fn test_connection_ids_are_unique() {
    let (transport, addr) = bind().await;

    let server = tokio::spawn(async move {
        let first = transport.accept().await.expect("accept first");
        let first = first
            .upgrade("/ws", WRITE_DEADLINE)
            .await
            .expect("upgrade first");
        let second = transport.accept().await.expect("accept second");
        let second = second
            .upgrade("/ws", WRITE_DEADLINE)
            .await
            .expect("upgrade second");
        (first, second)
    });

    let _client_a = connect(addr, "/ws").await;
    let _client_b = connect(addr, "/ws").await;

    let (first, second) = server.await.expect("server task");
    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn test_wrong_path_is_rejected() {
    let (transport, addr) = bind().await;

    let server = tokio::spawn(async move {
        let pending = transport.accept().await.expect("accept");
        pending.upgrade("/ws", WRITE_DEADLINE).await
    });

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/definitely-not-ws")).await;
    assert!(result.is_err(), "client should be rejected");

    let upgraded = server.await.expect("server task");
    assert!(upgraded.is_err(), "upgrade should fail on the wrong path");
}

#[tokio::test]
async fn test_recv_returns_none_after_client_close() {
    let (transport, addr) = bind().await;
    let server = accept_one(transport);

    let mut client = connect(addr, "/ws").await;
    let conn = server.await.expect("server task");

    client.close(None).await.expect("client close");
    let received = conn.recv().await.expect("server recv");
    assert_eq!(received, None);
}

#[tokio::test]
async fn test_binary_frames_are_accepted_as_text() {
    let (transport, addr) = bind().await;
    let server = accept_one(transport);

    let mut client = connect(addr, "/ws").await;
    let conn = server.await.expect("server task");

    client
        .send(Message::binary(br#"{"playerMode":"play"}"#.to_vec()))
        .await
        .expect("client send");
    let received = conn.recv().await.expect("server recv");
    assert_eq!(received.as_deref(), Some(r#"{"playerMode":"play"}"#));
}

#[tokio::test]
async fn test_send_after_peer_is_gone_fails() {
    let (transport, addr) = bind().await;
    let server = accept_one(transport);

    let client = connect(addr, "/ws").await;
    let conn = server.await.expect("server task");
    drop(client);

    // The first send may still land in the OS buffer; keep writing until
    // the broken pipe surfaces.
    let mut failed = false;
    for _ in 0..20 {
        if conn.send("ping").await.is_err() {
            failed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(failed, "send should eventually fail on a dead peer");
}
