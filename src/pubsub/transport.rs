//! WebSocket transport of the pub/sub layer.
//!
//! Each connection is served by two tasks: the upgrade task reads frames and
//! dispatches events in arrival order, a writer task drains the socket's
//! outbound queue. Either side ending tears the connection down.

use std::panic::AssertUnwindSafe;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::error::HandlerError;
use crate::net::ConnectionKind;
use crate::pubsub::namespace::Namespace;
use crate::pubsub::protocol::Envelope;
use crate::pubsub::socket::{Outbound, Socket};
use crate::pubsub::{PubSubLayer, CONNECTION_EVENT, DISCONNECT_EVENT};

/// Mount path of the default namespace.
pub const ENDPOINT: &str = "/socket.io";

/// Routes accepting pub/sub connections for `layer`.
pub fn routes(layer: PubSubLayer) -> Router {
    Router::new()
        .route(ENDPOINT, any(default_namespace))
        .route("/socket.io/{*namespace}", any(named_namespace))
        .with_state(layer)
}

async fn default_namespace(State(layer): State<PubSubLayer>, ws: WebSocketUpgrade) -> Response {
    accept(layer, "/", ws)
}

async fn named_namespace(
    State(layer): State<PubSubLayer>,
    Path(namespace): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    accept(layer, &namespace, ws)
}

fn accept(layer: PubSubLayer, path: &str, ws: WebSocketUpgrade) -> Response {
    // Namespaces only exist once something listens on them.
    let Some(namespace) = layer.get(path) else {
        tracing::debug!(app = %layer.app(), namespace = %path, "Refusing unknown namespace");
        return (StatusCode::NOT_FOUND, "Invalid namespace").into_response();
    };

    ws.on_upgrade(move |socket| serve_connection(layer, namespace, socket))
}

pub(crate) async fn serve_connection(layer: PubSubLayer, namespace: Namespace, ws: WebSocket) {
    let guard = layer.tracker().track(ConnectionKind::PubSub, namespace.path());
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let socket = Socket::new(guard.id(), namespace.path(), tx);

    let mut writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Frame(text) => {
                    if sink.send(Message::text(text)).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    namespace.join(socket.clone());
    tracing::debug!(
        app = %layer.app(),
        namespace = %namespace.path(),
        socket = %socket.id(),
        "Socket connected"
    );

    let connected = run_all(namespace.listeners(CONNECTION_EVENT), |listener| {
        listener(socket.clone(), Value::Null)
    })
    .await
    .and_then(|()| socket.emit("connect", json!({ "id": socket.id().to_string() })));

    let mut writer_done = false;
    match connected {
        Ok(()) => loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let envelope = Envelope::decode(text.as_str());
                        if envelope.event == CONNECTION_EVENT || envelope.event == DISCONNECT_EVENT {
                            tracing::debug!(socket = %socket.id(), event = %envelope.event, "Ignoring reserved event from client");
                            continue;
                        }
                        if let Err(e) = dispatch(&socket, &namespace, &envelope.event, envelope.data).await {
                            log_failure(&layer, &socket, &envelope.event, &e);
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(socket = %socket.id(), error = %e, "Socket read failed");
                        break;
                    }
                },
                _ = &mut writer => {
                    writer_done = true;
                    break;
                }
            }
        },
        Err(e) => log_failure(&layer, &socket, CONNECTION_EVENT, &e),
    }

    namespace.leave(socket.id());
    if let Err(e) = dispatch(&socket, &namespace, DISCONNECT_EVENT, Value::Null).await {
        log_failure(&layer, &socket, DISCONNECT_EVENT, &e);
    }

    socket.disconnect();
    socket.clear_listeners();
    if !writer_done {
        let _ = writer.await;
    }

    tracing::debug!(
        app = %layer.app(),
        namespace = %namespace.path(),
        socket = %socket.id(),
        "Socket disconnected"
    );
    drop(guard);
}

/// Run the listeners for `event`: the socket's own first, then the
/// namespace's. Stops at the first failure.
async fn dispatch(socket: &Socket, namespace: &Namespace, event: &str, data: Value) -> Result<(), HandlerError> {
    run_all(socket.listeners(event), |listener| listener(data.clone())).await?;
    run_all(namespace.listeners(event), |listener| listener(socket.clone(), data.clone())).await
}

async fn run_all<L, F>(listeners: Vec<L>, mut call: F) -> Result<(), HandlerError>
where
    F: FnMut(&L) -> BoxFuture<'static, Result<(), HandlerError>>,
{
    for listener in &listeners {
        guarded(call(listener)).await?;
    }
    Ok(())
}

/// Await a listener, turning a panic into an error.
pub(crate) async fn guarded(fut: BoxFuture<'static, Result<(), HandlerError>>) -> Result<(), HandlerError> {
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(HandlerError::Failed("handler panicked".to_string())))
}

fn log_failure(layer: &PubSubLayer, socket: &Socket, event: &str, error: &HandlerError) {
    tracing::error!(
        app = %layer.app(),
        namespace = %socket.namespace(),
        socket = %socket.id(),
        event,
        error = %error,
        "Socket handler failed, closing connection"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn guarded_turns_panics_into_errors() {
        let ok = guarded(async { Ok(()) }.boxed()).await;
        assert!(ok.is_ok());

        let panicked = guarded(
            async {
                if true {
                    panic!("boom");
                }
                Ok(())
            }
            .boxed(),
        )
        .await;
        assert!(matches!(panicked, Err(HandlerError::Failed(_))));
    }

    #[tokio::test]
    async fn socket_listeners_run_before_namespace_listeners() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let namespace = Namespace::new("/".into());
        let (tx, _rx) = mpsc::unbounded_channel();
        let socket = Socket::new(crate::net::ConnectionId::from(1), "/", tx);

        let seen = order.clone();
        namespace.on("chat", move |_s, _d| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push("namespace");
                Ok(())
            }
        });
        let seen = order.clone();
        socket.on("chat", move |_d| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push("socket");
                Ok(())
            }
        });

        dispatch(&socket, &namespace, "chat", Value::Null).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["socket", "namespace"]);
    }

    #[tokio::test]
    async fn dispatch_stops_at_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let namespace = Namespace::new("/".into());
        let (tx, _rx) = mpsc::unbounded_channel();
        let socket = Socket::new(crate::net::ConnectionId::from(1), "/", tx);

        namespace.on("x", |_s, _d| async { Err(HandlerError::msg("nope")) });
        let counter = calls.clone();
        namespace.on("x", move |_s, _d| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        assert!(dispatch(&socket, &namespace, "x", Value::Null).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
