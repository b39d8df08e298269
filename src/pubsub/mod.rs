//! Pub/sub socket layer.
//!
//! # Data Flow
//! ```text
//! WS upgrade on /socket.io[/<namespace>]
//!     → transport.rs (accept, reader loop, writer task)
//!     → namespace.rs ("connection" listeners, membership, broadcast)
//!     → socket.rs (per-connection listeners, emit)
//! ```
//!
//! Frames are JSON text: `{"event": "...", "data": ...}` (see `protocol.rs`).
//! Events of one connection are handled in arrival order; socket listeners
//! run before namespace listeners for the same event. A listener error or
//! panic closes that connection only.

pub mod namespace;
pub mod protocol;
pub mod socket;
pub mod transport;

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::declaration::route::normalize_path;
use crate::net::ConnectionTracker;

pub use namespace::Namespace;
pub use protocol::Envelope;
pub use socket::Socket;

/// Event fired on a namespace when a socket joins it.
pub const CONNECTION_EVENT: &str = "connection";
/// Event fired on a socket when its peer goes away.
pub const DISCONNECT_EVENT: &str = "disconnect";

/// The pub/sub layer of one application.
#[derive(Clone)]
pub struct PubSubLayer {
    inner: Arc<LayerInner>,
}

struct LayerInner {
    app: String,
    namespaces: DashMap<String, Namespace>,
    tracker: ConnectionTracker,
}

impl PubSubLayer {
    pub fn new(app: impl Into<String>, tracker: ConnectionTracker) -> Self {
        Self {
            inner: Arc::new(LayerInner {
                app: app.into(),
                namespaces: DashMap::new(),
                tracker,
            }),
        }
    }

    pub fn app(&self) -> &str {
        &self.inner.app
    }

    /// Open `path`, creating the namespace on first use.
    pub fn namespace(&self, path: &str) -> Namespace {
        let path = normalize_path(path);
        self.inner
            .namespaces
            .entry(path.clone())
            .or_insert_with(|| Namespace::new(path))
            .clone()
    }

    /// An already opened namespace.
    pub fn get(&self, path: &str) -> Option<Namespace> {
        self.inner
            .namespaces
            .get(&normalize_path(path))
            .map(|ns| ns.clone())
    }

    pub fn namespaces(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.inner.namespaces.iter().map(|ns| ns.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Broadcast `event` to every socket of `namespace`; returns how many
    /// sockets it was queued for. Unknown namespaces reach nobody.
    pub fn emit(&self, namespace: &str, event: &str, data: Value) -> usize {
        self.get(namespace)
            .map(|ns| ns.emit(event, data))
            .unwrap_or(0)
    }

    pub(crate) fn tracker(&self) -> &ConnectionTracker {
        &self.inner.tracker
    }
}

impl std::fmt::Debug for PubSubLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubLayer")
            .field("app", &self.inner.app)
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_is_get_or_create() {
        let layer = PubSubLayer::new("T", ConnectionTracker::new("T"));
        assert!(layer.get("/chat").is_none());

        let a = layer.namespace("chat");
        let b = layer.namespace("/chat");
        assert!(a.same(&b));
        assert_eq!(layer.namespaces(), vec!["/chat".to_string()]);
        assert_eq!(layer.emit("/nobody", "x", Value::Null), 0);
    }
}
