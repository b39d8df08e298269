//! Namespaces: a named group of sockets with shared event listeners.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use crate::error::HandlerError;
use crate::net::ConnectionId;
use crate::pubsub::socket::Socket;

pub(crate) type NamespaceListener =
    Arc<dyn Fn(Socket, Value) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

#[derive(Clone)]
pub struct Namespace {
    inner: Arc<NamespaceInner>,
}

struct NamespaceInner {
    path: String,
    listeners: DashMap<String, Vec<NamespaceListener>>,
    sockets: DashMap<ConnectionId, Socket>,
}

impl Namespace {
    pub(crate) fn new(path: String) -> Self {
        Self {
            inner: Arc::new(NamespaceInner {
                path,
                listeners: DashMap::new(),
                sockets: DashMap::new(),
            }),
        }
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Listen for `event` on every socket of this namespace. `connection`
    /// fires once per joining socket with `null` data.
    pub fn on<F, Fut>(&self, event: &str, listener: F)
    where
        F: Fn(Socket, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on_boxed(event, Arc::new(move |socket, data| listener(socket, data).boxed()));
    }

    pub(crate) fn on_boxed(&self, event: &str, listener: NamespaceListener) {
        self.inner
            .listeners
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Queue `event` for every connected socket; returns how many accepted it.
    pub fn emit(&self, event: &str, data: Value) -> usize {
        self.sockets()
            .iter()
            .filter(|socket| socket.emit(event, data.clone()).is_ok())
            .count()
    }

    pub fn socket_count(&self) -> usize {
        self.inner.sockets.len()
    }

    pub fn sockets(&self) -> Vec<Socket> {
        self.inner.sockets.iter().map(|s| s.value().clone()).collect()
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.inner
            .listeners
            .get(event)
            .map(|l| !l.is_empty())
            .unwrap_or(false)
    }

    pub(crate) fn listeners(&self, event: &str) -> Vec<NamespaceListener> {
        self.inner
            .listeners
            .get(event)
            .map(|l| l.value().clone())
            .unwrap_or_default()
    }

    pub(crate) fn join(&self, socket: Socket) {
        self.inner.sockets.insert(socket.id(), socket);
    }

    pub(crate) fn leave(&self, id: ConnectionId) {
        self.inner.sockets.remove(&id);
    }

    pub fn same(&self, other: &Namespace) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("path", &self.inner.path)
            .field("sockets", &self.inner.sockets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubsub::socket::Outbound;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn emit_reaches_joined_sockets_only() {
        let ns = Namespace::new("/chat".into());
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let first = Socket::new(ConnectionId::from(1), "/chat", tx1);
        let second = Socket::new(ConnectionId::from(2), "/chat", tx2);
        ns.join(first.clone());
        ns.join(second.clone());

        assert_eq!(ns.emit("news", json!("hello")), 2);
        ns.leave(second.id());
        assert_eq!(ns.emit("news", json!("again")), 1);

        assert!(matches!(rx1.try_recv(), Ok(Outbound::Frame(f)) if f.contains("hello")));
        assert!(matches!(rx1.try_recv(), Ok(Outbound::Frame(f)) if f.contains("again")));
        assert!(matches!(rx2.try_recv(), Ok(Outbound::Frame(f)) if f.contains("hello")));
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn listeners_keep_registration_order() {
        let ns = Namespace::new("/".into());
        assert!(!ns.has_listeners("connection"));
        ns.on("connection", |_s, _d| async { Ok(()) });
        ns.on("connection", |_s, _d| async { Err(HandlerError::msg("second")) });
        assert!(ns.has_listeners("connection"));
        assert_eq!(ns.listeners("connection").len(), 2);
        assert!(ns.listeners("other").is_empty());
    }
}
