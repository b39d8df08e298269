//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mocking_hans::HansConfig;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Orchestrator config bound to loopback.
pub fn local_config() -> HansConfig {
    HansConfig {
        bind_host: "127.0.0.1".to_string(),
        ..HansConfig::default()
    }
}

pub fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub async fn ws_connect(url: &str) -> Client {
    let (ws, _) = connect_async(url).await.expect("websocket handshake failed");
    ws
}

pub async fn send_text(ws: &mut Client, text: &str) {
    ws.send(Message::text(text)).await.unwrap();
}

/// Next text frame, failing the test after five seconds.
pub async fn next_text(ws: &mut Client) -> String {
    let deadline = Duration::from_secs(5);
    loop {
        let frame = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap();
        match frame {
            Message::Text(text) => return text.as_str().to_string(),
            Message::Close(_) => panic!("connection closed"),
            _ => continue,
        }
    }
}

/// True when nothing arrives within `wait`.
pub async fn stays_silent(ws: &mut Client, wait: Duration) -> bool {
    tokio::time::timeout(wait, ws.next()).await.is_err()
}
