//! Application types and their runtime instances.
//!
//! A mock application is a plain struct implementing [`MockApp`]. The
//! orchestrator builds exactly one instance per type through the
//! [`AppRegistry`], handing it the process-wide [`State`].

pub mod registry;
pub mod state;

pub use registry::AppRegistry;
pub use state::{SharedState, State};

use crate::declaration::{AppOptions, Declarations};

/// A declared mock application.
pub trait MockApp: Send + Sync + Sized + 'static {
    /// Application configuration: name, port, middleware, directories.
    fn options() -> AppOptions;

    /// Bind handlers to routes, socket events and websocket namespaces.
    fn declare(app: &mut Declarations<'_, Self>);

    /// Build the singleton instance. Called at most once per orchestrator.
    fn create(state: SharedState) -> Self;
}
