//! What bootstrap hands back.

use std::net::SocketAddr;

use tokio::task::JoinHandle;

use crate::error::HansError;
use crate::lifecycle::AppPhase;
use crate::net::{ConnectionTracker, OpenConnection};
use crate::pubsub::PubSubLayer;

/// An application that is serving.
#[derive(Debug)]
pub struct RunningApp {
    pub(crate) name: String,
    pub(crate) port: u16,
    pub(crate) local_addr: SocketAddr,
    pub(crate) phase: AppPhase,
    pub(crate) pubsub: PubSubLayer,
    pub(crate) tracker: ConnectionTracker,
    pub(crate) task: JoinHandle<()>,
}

impl RunningApp {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    /// The application's pub/sub layer, for pushing events from outside
    /// handlers.
    pub fn pubsub(&self) -> &PubSubLayer {
        &self.pubsub
    }

    /// Open socket and websocket connections.
    pub fn active_connections(&self) -> usize {
        self.tracker.active_count()
    }

    /// Open connections with their kind and path, oldest first.
    pub fn connections(&self) -> Vec<OpenConnection> {
        self.tracker.connections()
    }

    pub fn is_serving(&self) -> bool {
        !self.task.is_finished()
    }

    /// Wait for the server task to end, e.g. after [`Hans::shutdown`](crate::Hans::shutdown).
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!(app = %self.name, error = %e, "Server task aborted");
        }
    }
}

/// An application that could not be started, and why.
#[derive(Debug)]
pub struct FailedApp {
    /// Declared name, or the type name when the name itself was missing.
    pub app: String,
    pub error: HansError,
}

/// Outcome of [`Hans::bootstrap`](crate::Hans::bootstrap). One
/// application failing never stops the others.
#[derive(Debug, Default)]
pub struct Bootstrap {
    pub running: Vec<RunningApp>,
    pub failed: Vec<FailedApp>,
}

impl Bootstrap {
    pub fn app(&self, name: &str) -> Option<&RunningApp> {
        self.running.iter().find(|app| app.name == name)
    }

    pub fn failure(&self, name: &str) -> Option<&HansError> {
        self.failed.iter().find(|f| f.app == name).map(|f| &f.error)
    }

    pub fn all_running(&self) -> bool {
        self.failed.is_empty()
    }
}
