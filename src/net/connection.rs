//! Live socket and websocket connections of one application.
//!
//! Upgraded connections outlive the request that opened them. Each one holds
//! a [`ConnectionGuard`] registered with its application's tracker, which
//! knows the kind of connection and the path it was opened on until the
//! guard is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

/// Identifies a connection within its application. Pub/sub clients receive
/// it as their socket id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

#[cfg(test)]
impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// A pub/sub client on a namespace.
    PubSub,
    /// A raw websocket handed to a routed handler or held for observers.
    Websocket,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionKind::PubSub => "pubsub",
            ConnectionKind::Websocket => "websocket",
        })
    }
}

/// One open connection as seen by its tracker.
#[derive(Debug, Clone)]
pub struct OpenConnection {
    pub id: ConnectionId,
    pub kind: ConnectionKind,
    pub path: String,
    pub opened_at: Instant,
}

#[derive(Debug)]
struct TrackerInner {
    app: String,
    next_id: AtomicU64,
    open: DashMap<ConnectionId, OpenConnection>,
}

/// Open connections of one application.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    inner: Arc<TrackerInner>,
}

impl ConnectionTracker {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                app: app.into(),
                next_id: AtomicU64::new(1),
                open: DashMap::new(),
            }),
        }
    }

    pub fn app(&self) -> &str {
        &self.inner.app
    }

    /// Register a connection opened on `path`. It stays listed until the
    /// returned guard is dropped.
    pub fn track(&self, kind: ConnectionKind, path: &str) -> ConnectionGuard {
        let id = ConnectionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.open.insert(
            id,
            OpenConnection {
                id,
                kind,
                path: path.to_string(),
                opened_at: Instant::now(),
            },
        );
        tracing::debug!(app = %self.inner.app, connection = %id, %kind, path, "Connection opened");
        ConnectionGuard {
            tracker: Arc::clone(&self.inner),
            id,
        }
    }

    pub fn active_count(&self) -> usize {
        self.inner.open.len()
    }

    /// Open connections on exactly `path`.
    pub fn open_on(&self, path: &str) -> usize {
        self.inner.open.iter().filter(|c| c.path == path).count()
    }

    /// Snapshot of the open connections, oldest first.
    pub fn connections(&self) -> Vec<OpenConnection> {
        let mut open: Vec<_> = self.inner.open.iter().map(|c| c.value().clone()).collect();
        open.sort_by_key(|c| c.id);
        open
    }
}

/// Keeps a connection listed with its tracker.
#[derive(Debug)]
pub struct ConnectionGuard {
    tracker: Arc<TrackerInner>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some((_, closed)) = self.tracker.open.remove(&self.id) {
            tracing::debug!(
                app = %self.tracker.app,
                connection = %self.id,
                kind = %closed.kind,
                path = %closed.path,
                open_ms = closed.opened_at.elapsed().as_millis() as u64,
                "Connection closed"
            );
        }
    }
}
