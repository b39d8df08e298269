//! Raw WebSocket endpoints.
//!
//! # Data Flow
//! ```text
//! HTTP request with `Upgrade: websocket`
//!     → upgrade_middleware (before routing)
//!         → All observers notified (every path)
//!         → Observer observers notified (path "/")
//!         → Routed handler whose namespace equals the path takes the connection
//!     → otherwise the request continues to the router
//! ```
//!
//! Observers never own the connection. An upgrade on "/" that only observers
//! care about is accepted and held open until the client leaves.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        FromRequestParts, Request, State,
    },
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use serde::Serialize;

use crate::declaration::{WebsocketScope, DEFAULT_NAMESPACE};
use crate::error::HandlerError;
use crate::net::{ConnectionGuard, ConnectionId, ConnectionKind, ConnectionTracker};
use crate::pubsub::transport::guarded;

/// An accepted raw WebSocket connection.
pub struct WsConnection {
    path: String,
    headers: HeaderMap,
    socket: WebSocket,
    guard: ConnectionGuard,
}

impl WsConnection {
    pub fn id(&self) -> ConnectionId {
        self.guard.id()
    }

    /// Path the client upgraded on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Headers of the upgrade request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Next message from the client; `None` once the connection is closed.
    pub async fn recv(&mut self) -> Option<Result<Message, HandlerError>> {
        self.socket
            .recv()
            .await
            .map(|msg| msg.map_err(HandlerError::from))
    }

    /// Next text message, skipping binary and control frames.
    pub async fn recv_text(&mut self) -> Option<Result<String, HandlerError>> {
        while let Some(msg) = self.recv().await {
            match msg {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    pub async fn send(&mut self, message: Message) -> Result<(), HandlerError> {
        Ok(self.socket.send(message).await?)
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), HandlerError> {
        self.send(Message::text(text.into())).await
    }

    pub async fn send_json<T: Serialize>(&mut self, value: &T) -> Result<(), HandlerError> {
        let text = serde_json::to_string(value)?;
        self.send_text(text).await
    }

    pub async fn close(mut self) -> Result<(), HandlerError> {
        self.send(Message::Close(None)).await
    }

    /// The underlying socket, for handlers that split it.
    pub fn into_inner(self) -> WebSocket {
        self.socket
    }
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection")
            .field("id", &self.guard.id())
            .field("path", &self.path)
            .finish()
    }
}

/// What observers learn about an upgrade.
#[derive(Debug, Clone)]
pub struct UpgradeEvent {
    pub event: String,
    pub path: String,
    pub headers: HeaderMap,
}

pub(crate) type AcceptFn = Arc<dyn Fn(WsConnection) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;
pub(crate) type NotifyFn = Arc<dyn Fn(UpgradeEvent) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

struct RoutedSocket {
    event: String,
    namespace: String,
    handler: String,
    accept: AcceptFn,
}

struct UpgradeObserver {
    event: String,
    scope: WebsocketScope,
    handler: String,
    notify: NotifyFn,
}

/// Raw WebSocket handlers of one application.
#[derive(Clone)]
pub(crate) struct UpgradeRoutes {
    inner: Arc<UpgradeInner>,
}

struct UpgradeInner {
    app: String,
    port: u16,
    tracker: ConnectionTracker,
    routed: Vec<RoutedSocket>,
    observers: Vec<UpgradeObserver>,
}

impl UpgradeRoutes {
    pub(crate) fn builder(app: &str, port: u16, tracker: ConnectionTracker) -> UpgradeRoutesBuilder {
        UpgradeRoutesBuilder {
            inner: UpgradeInner {
                app: app.to_string(),
                port,
                tracker,
                routed: Vec::new(),
                observers: Vec::new(),
            },
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.routed.is_empty() && self.inner.observers.is_empty()
    }

    fn routed_for(&self, path: &str) -> Option<&RoutedSocket> {
        self.inner.routed.iter().find(|r| r.namespace == path)
    }

    fn observers_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a UpgradeObserver> + 'a {
        self.inner.observers.iter().filter(move |o| match o.scope {
            WebsocketScope::All => true,
            _ => path == DEFAULT_NAMESPACE,
        })
    }
}

pub(crate) struct UpgradeRoutesBuilder {
    inner: UpgradeInner,
}

impl UpgradeRoutesBuilder {
    pub(crate) fn routed(&mut self, event: &str, namespace: &str, handler: &str, accept: AcceptFn) -> &mut Self {
        self.inner.routed.push(RoutedSocket {
            event: event.to_string(),
            namespace: namespace.to_string(),
            handler: handler.to_string(),
            accept,
        });
        self
    }

    pub(crate) fn observer(&mut self, event: &str, scope: WebsocketScope, handler: &str, notify: NotifyFn) -> &mut Self {
        self.inner.observers.push(UpgradeObserver {
            event: event.to_string(),
            scope,
            handler: handler.to_string(),
            notify,
        });
        self
    }

    pub(crate) fn build(self) -> UpgradeRoutes {
        UpgradeRoutes {
            inner: Arc::new(self.inner),
        }
    }
}

fn is_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Intercept WebSocket upgrades before they reach the router.
pub(crate) async fn upgrade_middleware(
    State(routes): State<UpgradeRoutes>,
    request: Request,
    next: Next,
) -> Response {
    if routes.is_empty() || !is_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let app = routes.inner.app.as_str();

    let mut observed = false;
    for observer in routes.observers_for(&path) {
        observed = true;
        let event = UpgradeEvent {
            event: observer.event.clone(),
            path: path.clone(),
            headers: request.headers().clone(),
        };
        if let Err(e) = guarded((observer.notify)(event)).await {
            tracing::error!(app, path = %path, handler = %observer.handler, error = %e, "WebSocket observer failed");
        }
    }

    let routed = routes.routed_for(&path);
    // "/" upgrades that only observers want are held open; anything else
    // carries on to the router.
    if routed.is_none() && !(observed && path == DEFAULT_NAMESPACE) {
        return next.run(request).await;
    }

    let (mut parts, _body) = request.into_parts();
    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };
    let headers = parts.headers;
    let guard = routes.inner.tracker.track(ConnectionKind::Websocket, &path);

    let Some(routed) = routed else {
        return upgrade.on_upgrade(move |socket| hold_open(socket, guard));
    };

    tracing::info!(app, port = routes.inner.port, "WS {} {}", routed.event, routed.namespace);
    let accept = Arc::clone(&routed.accept);
    let handler = routed.handler.clone();
    let app = app.to_string();
    upgrade.on_upgrade(move |socket| async move {
        let connection = WsConnection {
            path,
            headers,
            socket,
            guard,
        };
        let id = connection.id();
        if let Err(e) = guarded(accept(connection)).await {
            tracing::error!(app = %app, connection = %id, handler = %handler, error = %e, "WebSocket handler failed, connection closed");
        }
    })
}

async fn hold_open(mut socket: WebSocket, _guard: ConnectionGuard) {
    while let Some(Ok(msg)) = socket.next().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }
}
