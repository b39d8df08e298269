//! One connected pub/sub client.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::HandlerError;
use crate::net::ConnectionId;
use crate::pubsub::protocol::Envelope;

pub(crate) type SocketListener =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Instructions for the connection's writer task.
#[derive(Debug)]
pub(crate) enum Outbound {
    Frame(String),
    Close,
}

/// Handle to a connected client. Cheap to clone; all clones talk to the
/// same connection.
#[derive(Clone)]
pub struct Socket {
    inner: Arc<SocketInner>,
}

struct SocketInner {
    id: ConnectionId,
    namespace: String,
    outbound: mpsc::UnboundedSender<Outbound>,
    listeners: DashMap<String, Vec<SocketListener>>,
}

impl Socket {
    pub(crate) fn new(id: ConnectionId, namespace: &str, outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            inner: Arc::new(SocketInner {
                id,
                namespace: namespace.to_string(),
                outbound,
                listeners: DashMap::new(),
            }),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Send `event` to this client.
    pub fn emit(&self, event: &str, data: Value) -> Result<(), HandlerError> {
        let frame = Envelope::new(event, data).encode()?;
        self.inner
            .outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| HandlerError::Closed)
    }

    /// Listen for `event` from this client only.
    pub fn on<F, Fut>(&self, event: &str, listener: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let listener: SocketListener = Arc::new(move |data| listener(data).boxed());
        self.inner
            .listeners
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Close the connection after already queued frames are written.
    pub fn disconnect(&self) {
        let _ = self.inner.outbound.send(Outbound::Close);
    }

    pub fn is_connected(&self) -> bool {
        !self.inner.outbound.is_closed()
    }

    /// Listeners may hold clones of this socket; dropping them breaks the cycle.
    pub(crate) fn clear_listeners(&self) {
        self.inner.listeners.clear();
    }

    pub(crate) fn listeners(&self, event: &str) -> Vec<SocketListener> {
        self.inner
            .listeners
            .get(event)
            .map(|l| l.value().clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("id", &self.inner.id)
            .field("namespace", &self.inner.namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emit_encodes_envelope() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let socket = Socket::new(ConnectionId::from(1), "/", tx);
        socket.emit("greet", json!({"to": "you"})).unwrap();

        match rx.try_recv().unwrap() {
            Outbound::Frame(frame) => assert_eq!(frame, r#"{"event":"greet","data":{"to":"you"}}"#),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn emit_after_close_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        let socket = Socket::new(ConnectionId::from(1), "/", tx);
        drop(rx);
        assert!(!socket.is_connected());
        assert!(matches!(socket.emit("x", Value::Null), Err(HandlerError::Closed)));
    }

    #[test]
    fn listeners_are_per_event() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let socket = Socket::new(ConnectionId::from(1), "/", tx);
        socket.on("chat", |_data| async { Ok(()) });
        assert_eq!(socket.listeners("chat").len(), 1);
        assert!(socket.clone().listeners("other").is_empty());
    }
}
