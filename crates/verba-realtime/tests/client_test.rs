use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use tokio::time::timeout;
use verba_realtime::types::TransportEvent;
use verba_realtime::{Client, Config, TransportState, connect_with_config};

const WAIT: Duration = Duration::from_secs(5);

/// Greets with one control message and one audio segment, answers the first
/// binary frame with its length, then hangs up.
async fn chatty_handler(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(chatty_socket)
}

async fn chatty_socket(mut socket: WebSocket) {
    let greeting = r#"{"type":"STATE_CHANGE","state":"SPEAKING"}"#;
    if socket.send(Message::Text(greeting.into())).await.is_err() {
        return;
    }
    if socket.send(Message::Binary(vec![1u8, 0, 2, 0].into())).await.is_err() {
        return;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Binary(bytes) = msg {
            let reply = format!(r#"{{"type":"TRANSCRIPT","text":"{}"}}"#, bytes.len());
            let _ = socket.send(Message::Text(reply.into())).await;
            break;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

/// Never says anything; stays until the client goes away.
async fn quiet_handler(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        while let Some(Ok(msg)) = socket.recv().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    })
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/ws", get(chatty_handler))
        .route("/quiet", get(quiet_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(url: &str) -> Config {
    Config::builder()
        .with_url(url)
        .with_connect_timeout(Duration::from_secs(2))
        .build()
}

#[tokio::test]
async fn test_events_arrive_in_order_and_remote_close_is_reported() {
    let addr = spawn_server().await;
    let (client, mut events) = connect_with_config(config_for(&format!("ws://{addr}/ws")))
        .await
        .expect("connect should succeed");
    assert_eq!(client.state(), TransportState::Open);

    let first = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(
        first,
        TransportEvent::Text(r#"{"type":"STATE_CHANGE","state":"SPEAKING"}"#.to_string())
    );
    let second = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(second, TransportEvent::Binary(vec![1, 0, 2, 0]));

    client.send_binary(vec![0u8; 6]);
    let third = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(
        third,
        TransportEvent::Text(r#"{"type":"TRANSCRIPT","text":"6"}"#.to_string())
    );

    let fourth = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert!(matches!(fourth, TransportEvent::Closed { .. }), "got {fourth:?}");
    assert_eq!(client.state(), TransportState::Closed);

    let stats = client.stats().unwrap();
    assert_eq!(stats.frames_sent(), 1);
    assert_eq!(stats.bytes_sent(), 6);
    assert_eq!(stats.binary_received(), 1);
    assert_eq!(stats.text_received(), 2);
}

#[tokio::test]
async fn test_intentional_close_is_silent() {
    let addr = spawn_server().await;
    let (mut client, mut events) = connect_with_config(config_for(&format!("ws://{addr}/quiet")))
        .await
        .unwrap();

    client.close();
    assert_eq!(client.state(), TransportState::Closed);

    let next = timeout(WAIT, events.recv()).await.unwrap();
    assert_eq!(next, None);

    // Closing again is a no-op.
    client.close();
    client.send_binary(vec![1, 2]);
    assert_eq!(client.stats().unwrap().frames_sent(), 0);
}

#[tokio::test]
async fn test_second_connect_while_open_is_rejected() {
    let addr = spawn_server().await;
    let mut client = Client::new(config_for(&format!("ws://{addr}/quiet")));
    let _events = client.connect().await.unwrap();
    assert!(client.connect().await.is_err());
    assert_eq!(client.state(), TransportState::Open);

    // After an intentional close the same client may open a fresh channel.
    client.close();
    let _events = client.connect().await.unwrap();
    assert_eq!(client.state(), TransportState::Open);
}

#[tokio::test]
async fn test_connect_failure_is_an_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client = Client::new(config_for(&format!("ws://{addr}/ws")));
    assert!(client.connect().await.is_err());
    assert_eq!(client.state(), TransportState::Idle);

    // Nothing to send to, nothing counted.
    client.send_binary(vec![0; 8]);
    assert_eq!(client.stats().unwrap().frames_sent(), 0);
}
