//! Declarative mock servers.
//!
//! An application type declares its routes, socket events and websocket
//! endpoints; [`Hans`] turns every registered application into its own
//! listening server that dispatches to the declared handlers.

pub mod app;
pub mod config;
pub mod declaration;
pub mod error;
pub mod hans;
pub mod http;
pub mod lifecycle;
pub mod metadata;
pub mod net;
pub mod observability;
pub mod pubsub;

pub use app::{MockApp, SharedState, State};
pub use config::HansConfig;
pub use declaration::builder::HandlerResult;
pub use declaration::{AppOptions, Declarations, HttpMethod};
pub use error::{HandlerError, HansError};
pub use hans::{Bootstrap, Hans, RunningApp};
pub use http::{HttpContext, MockResponse, Reply, UpgradeEvent, WsConnection};
pub use lifecycle::{AppPhase, Shutdown};
pub use pubsub::{Namespace, PubSubLayer, Socket};
