//! Declaration surface.
//!
//! Applications describe themselves in two phases. `MockApp::declare` binds
//! handlers to routes, socket events and websocket namespaces through
//! [`Declarations`]; afterwards the `App` step ([`finalize_app`]) records the
//! application configuration and seeds empty defaults. Both phases write into
//! the [`MetadataStore`](crate::metadata::MetadataStore) with read-append-write,
//! so neither can clobber the other regardless of order.

pub mod app;
pub mod builder;
pub mod route;
pub mod socket;

use std::fmt;

use axum::routing::MethodFilter;
use serde::Serialize;

pub use app::{finalize_app, AppOptions, ConfigureFn};
pub use builder::{Declarations, HandlerTable};

/// HTTP methods a route can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub(crate) fn filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One HTTP route bound to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDeclaration {
    /// Always starts with "/".
    pub path: String,
    pub method: HttpMethod,
    pub handler: String,
}

/// A pub/sub namespace event bound to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketDeclaration {
    pub event: String,
    pub namespace: String,
    pub handler: String,
}

/// Which upgrade requests a raw websocket declaration answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WebsocketScope {
    /// Upgrades whose path equals the namespace exactly.
    Routed,
    /// Notified of upgrades to the default namespace "/".
    Observer,
    /// Notified of every upgrade.
    All,
}

/// A raw websocket upgrade bound to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebsocketDeclaration {
    pub event: String,
    pub namespace: String,
    pub handler: String,
    pub scope: WebsocketScope,
}

impl WebsocketDeclaration {
    /// Whether an upgrade to `path` triggers this declaration.
    pub fn matches(&self, path: &str) -> bool {
        match self.scope {
            WebsocketScope::Routed | WebsocketScope::Observer => self.namespace == path,
            WebsocketScope::All => true,
        }
    }
}

pub(crate) const DEFAULT_NAMESPACE: &str = "/";
