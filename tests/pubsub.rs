//! Pub/sub namespaces over /socket.io.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use mocking_hans::{
    AppOptions, Declarations, HandlerError, HandlerResult, Hans, HttpContext, MockApp, MockResponse, SharedState,
    Socket,
};
use serde_json::{json, Value};

mod common;

struct Chat {
    state: SharedState,
}

impl Chat {
    async fn on_connection(self: Arc<Self>, socket: Socket, _data: Value) -> Result<(), HandlerError> {
        let room = socket.clone();
        socket.on("say", move |data| {
            let room = room.clone();
            async move { room.emit("echo", data) }
        });
        let state = self.state.clone();
        socket.on("disconnect", move |_data| {
            state.update("left", |n| json!(n.as_u64().unwrap_or(0) + 1));
            async { Ok(()) }
        });
        socket.emit("welcome", json!({ "namespace": socket.namespace() }))
    }

    async fn on_shout(self: Arc<Self>, _socket: Socket, data: Value) -> Result<(), HandlerError> {
        self.state.set("last_shout", data)?;
        Ok(())
    }

    async fn on_crash(self: Arc<Self>, _socket: Socket, _data: Value) -> Result<(), HandlerError> {
        Err(HandlerError::msg("crash requested"))
    }

    async fn broadcast(self: Arc<Self>, ctx: HttpContext) -> HandlerResult {
        let delivered = ctx.pubsub().emit("/chat", "news", ctx.json()?);
        Ok(MockResponse::json(json!({ "delivered": delivered })).into())
    }
}

impl MockApp for Chat {
    fn options() -> AppOptions {
        AppOptions::new("Chat", 9201)
    }

    fn declare(app: &mut Declarations<'_, Self>) {
        app.socket_in("connection", "/chat", "on_connection", Self::on_connection)
            .socket_in("shout", "chat", "on_shout", Self::on_shout)
            .socket_in("crash", "/chat", "on_crash", Self::on_crash)
            .post("/broadcast", "broadcast", Self::broadcast);
    }

    fn create(state: SharedState) -> Self {
        Chat { state }
    }
}

fn frame(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_namespace_events_and_http_broadcast() {
    let mut hans = Hans::new(common::local_config());
    hans.register::<Chat>();
    let report = hans.bootstrap().await;
    assert!(report.all_running());
    assert_eq!(report.app("Chat").unwrap().pubsub().namespaces(), vec!["/chat".to_string()]);

    let mut ws = common::ws_connect("ws://127.0.0.1:9201/socket.io/chat").await;

    // Connection listeners run before the connect acknowledgement.
    let welcome = frame(&common::next_text(&mut ws).await);
    assert_eq!(welcome, json!({ "event": "welcome", "data": { "namespace": "/chat" } }));
    let connect = frame(&common::next_text(&mut ws).await);
    assert_eq!(connect["event"], "connect");
    assert!(connect["data"]["id"].is_string());

    common::send_text(&mut ws, r#"{"event":"say","data":"hello"}"#).await;
    assert_eq!(frame(&common::next_text(&mut ws).await), json!({ "event": "echo", "data": "hello" }));

    common::send_text(&mut ws, r#"{"event":"shout","data":{"volume":11}}"#).await;
    common::send_text(&mut ws, r#"{"event":"say","data":"after shout"}"#).await;
    common::next_text(&mut ws).await;
    assert_eq!(hans.state().get("last_shout"), Some(json!({ "volume": 11 })));

    let res = common::http()
        .post("http://127.0.0.1:9201/broadcast")
        .json(&json!({ "headline": "mock all the things" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "delivered": 1 }));
    assert_eq!(
        frame(&common::next_text(&mut ws).await),
        json!({ "event": "news", "data": { "headline": "mock all the things" } })
    );

    hans.shutdown();
}

#[tokio::test]
async fn test_unknown_namespace_and_failing_listener() {
    let mut hans = Hans::new(common::local_config());
    hans.register::<Lobby>();
    hans.bootstrap().await;

    let refused = tokio_tungstenite::connect_async("ws://127.0.0.1:9202/socket.io/nowhere").await;
    match refused {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), StatusCode::NOT_FOUND.as_u16())
        }
        other => panic!("expected 404, got {:?}", other.map(|_| ())),
    }

    let mut ws = common::ws_connect("ws://127.0.0.1:9202/socket.io").await;
    assert_eq!(frame(&common::next_text(&mut ws).await)["event"], "connect");

    // Plain text arrives as a "message" event.
    common::send_text(&mut ws, "ping").await;
    assert_eq!(frame(&common::next_text(&mut ws).await), json!({ "event": "pong", "data": "ping" }));

    common::send_text(&mut ws, r#"{"event":"crash"}"#).await;
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        use futures_util::StreamExt;
        loop {
            match ws.next().await {
                None | Some(Err(_)) => break,
                Some(Ok(msg)) if msg.is_close() => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "listener failure should close the socket");

    // Other clients are unaffected.
    let mut other = common::ws_connect("ws://127.0.0.1:9202/socket.io").await;
    assert_eq!(frame(&common::next_text(&mut other).await)["event"], "connect");

    hans.shutdown();
}

struct Lobby;

impl MockApp for Lobby {
    fn options() -> AppOptions {
        AppOptions::new("Lobby", 9202)
    }

    fn declare(app: &mut Declarations<'_, Self>) {
        app.socket("message", "on_message", |_app, socket: Socket, data: Value| async move {
            socket.emit("pong", data)
        })
        .socket("crash", "on_crash", |_app, _socket, _data| async {
            Err(HandlerError::msg("boom"))
        });
    }

    fn create(_state: SharedState) -> Self {
        Lobby
    }
}
