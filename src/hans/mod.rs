//! The bootstrap orchestrator.
//!
//! ```ignore
//! let mut hans = Hans::new(HansConfig::default());
//! hans.register::<Twitter>().register::<Weather>();
//! let report = hans.bootstrap().await;
//! ```
//!
//! Applications start one after another in registration order. Each one
//! reads its declarations, runs its `configure` callback, gets its singleton
//! from the registry, binds its port and serves. A failing application is
//! reported in [`Bootstrap::failed`] and the rest carry on.

pub mod mount;
pub mod report;

use std::sync::Arc;

use crate::app::{AppRegistry, MockApp, SharedState, State};
use crate::config::HansConfig;
use crate::declaration::{finalize_app, Declarations};
use crate::lifecycle::Shutdown;
use crate::metadata::{AppKey, MetadataStore};

use mount::{AppMount, Mount, MountContext};
pub use report::{Bootstrap, FailedApp, RunningApp};

pub struct Hans {
    config: HansConfig,
    store: MetadataStore,
    mounts: Vec<Box<dyn Mount>>,
    state: SharedState,
    registry: AppRegistry,
    shutdown: Shutdown,
}

impl Hans {
    pub fn new(config: HansConfig) -> Self {
        Self {
            config,
            store: MetadataStore::new(),
            mounts: Vec::new(),
            state: Arc::new(State::new()),
            registry: AppRegistry::new(),
            shutdown: Shutdown::new(),
        }
    }

    /// Collect the declarations of `A`. Registering a type twice is a no-op.
    pub fn register<A: MockApp>(&mut self) -> &mut Self {
        let key = AppKey::of::<A>();
        if self.mounts.iter().any(|m| m.key() == key) {
            tracing::warn!(app = %key, "Application registered twice, ignoring");
            return self;
        }

        let mut declarations = Declarations::<A>::new(&mut self.store);
        A::declare(&mut declarations);
        let handlers = declarations.into_handlers();
        finalize_app(&mut self.store, key, A::options());

        self.mounts.push(Box::new(AppMount::<A>::new(handlers)));
        self
    }

    /// State shared by every application.
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.store
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    pub fn config(&self) -> &HansConfig {
        &self.config
    }

    /// Start every registered application.
    pub async fn bootstrap(&self) -> Bootstrap {
        let mut report = Bootstrap::default();
        if self.mounts.is_empty() {
            tracing::warn!("Nothing to mock. Farewell, friend.");
            return report;
        }

        let ctx = MountContext {
            config: &self.config,
            store: &self.store,
            state: &self.state,
            registry: &self.registry,
            shutdown: &self.shutdown,
        };

        for mount in &self.mounts {
            match mount.mount(&ctx).await {
                Ok(app) => report.running.push(app),
                Err(error) => {
                    let key = mount.key();
                    let app = self
                        .store
                        .name(key)
                        .map(str::to_string)
                        .unwrap_or_else(|_| key.type_name().to_string());
                    if error.is_configuration() {
                        tracing::error!(app = %app, error = %error, "Application misconfigured, not started");
                    } else {
                        tracing::error!(app = %app, error = %error, "Application failed to start");
                    }
                    report.failed.push(FailedApp { app, error });
                }
            }
        }

        tracing::info!(
            running = report.running.len(),
            failed = report.failed.len(),
            "Bootstrap complete"
        );
        report
    }

    /// Stop every application server. Returns how many were still running.
    pub fn shutdown(&self) -> usize {
        let stopped = self.shutdown.trigger();
        tracing::info!(servers = stopped, "Shutdown requested");
        stopped
    }

    /// A handle that stops the servers from elsewhere, e.g. a signal task.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }
}

impl Default for Hans {
    fn default() -> Self {
        Self::new(HansConfig::default())
    }
}
