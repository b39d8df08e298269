//! Associative metadata storage.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::declaration::{ConfigureFn, RouteDeclaration, SocketDeclaration, WebsocketDeclaration};
use crate::error::HansError;
use crate::http::middleware::Middleware;
use crate::metadata::key::{AppKey, MetadataKey};

/// A value stored under one metadata key.
#[derive(Clone)]
pub enum MetadataValue {
    Routes(Vec<RouteDeclaration>),
    Sockets(Vec<SocketDeclaration>),
    Websockets(Vec<WebsocketDeclaration>),
    Name(String),
    Port(u16),
    Configure(ConfigureFn),
    Middleware(Vec<Middleware>),
    PublicDirectory(PathBuf),
    /// Handler name → middleware scoped to that handler's route.
    RouteMiddleware(HashMap<String, Vec<Middleware>>),
}

impl MetadataValue {
    /// The empty default seeded for a route-kind key.
    pub fn empty_list(key: MetadataKey) -> Option<Self> {
        match key {
            MetadataKey::Routes | MetadataKey::GraphqlRoutes => Some(Self::Routes(Vec::new())),
            MetadataKey::SocketRoutes => Some(Self::Sockets(Vec::new())),
            MetadataKey::NativeSocketRoutes => Some(Self::Websockets(Vec::new())),
            _ => None,
        }
    }

    pub fn as_routes(&self) -> Option<&[RouteDeclaration]> {
        match self {
            Self::Routes(routes) => Some(routes),
            _ => None,
        }
    }

    pub fn as_sockets(&self) -> Option<&[SocketDeclaration]> {
        match self {
            Self::Sockets(sockets) => Some(sockets),
            _ => None,
        }
    }

    pub fn as_websockets(&self) -> Option<&[WebsocketDeclaration]> {
        match self {
            Self::Websockets(websockets) => Some(websockets),
            _ => None,
        }
    }
}

impl fmt::Debug for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Routes(v) => f.debug_tuple("Routes").field(v).finish(),
            Self::Sockets(v) => f.debug_tuple("Sockets").field(v).finish(),
            Self::Websockets(v) => f.debug_tuple("Websockets").field(v).finish(),
            Self::Name(v) => f.debug_tuple("Name").field(v).finish(),
            Self::Port(v) => f.debug_tuple("Port").field(v).finish(),
            Self::Configure(_) => f.write_str("Configure(..)"),
            Self::Middleware(v) => write!(f, "Middleware({} callbacks)", v.len()),
            Self::PublicDirectory(v) => f.debug_tuple("PublicDirectory").field(v).finish(),
            Self::RouteMiddleware(v) => {
                f.debug_map().entries(v.iter().map(|(k, m)| (k, m.len()))).finish()
            }
        }
    }
}

/// Declarations accumulated before bootstrap, keyed by (application, key).
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: HashMap<(AppKey, MetadataKey), MetadataValue>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value under `(target, key)`.
    pub fn set(&mut self, target: AppKey, key: MetadataKey, value: MetadataValue) {
        self.entries.insert((target, key), value);
    }

    pub fn get(&self, target: AppKey, key: MetadataKey) -> Option<&MetadataValue> {
        self.entries.get(&(target, key))
    }

    pub fn has(&self, target: AppKey, key: MetadataKey) -> bool {
        self.entries.contains_key(&(target, key))
    }

    fn require<'a, T: ?Sized>(
        &'a self,
        target: AppKey,
        key: MetadataKey,
        read: impl FnOnce(&'a MetadataValue) -> Option<&'a T>,
    ) -> Result<&'a T, HansError> {
        self.get(target, key)
            .and_then(read)
            .ok_or_else(|| HansError::MissingMetadata {
                app: target.type_name().to_string(),
                key,
            })
    }

    pub fn routes(&self, target: AppKey) -> Result<&[RouteDeclaration], HansError> {
        self.require(target, MetadataKey::Routes, MetadataValue::as_routes)
    }

    pub fn graphql_routes(&self, target: AppKey) -> Result<&[RouteDeclaration], HansError> {
        self.require(target, MetadataKey::GraphqlRoutes, MetadataValue::as_routes)
    }

    pub fn socket_routes(&self, target: AppKey) -> Result<&[SocketDeclaration], HansError> {
        self.require(target, MetadataKey::SocketRoutes, MetadataValue::as_sockets)
    }

    pub fn native_socket_routes(&self, target: AppKey) -> Result<&[WebsocketDeclaration], HansError> {
        self.require(target, MetadataKey::NativeSocketRoutes, MetadataValue::as_websockets)
    }

    pub fn name(&self, target: AppKey) -> Result<&str, HansError> {
        self.require(target, MetadataKey::Name, |value| match value {
            MetadataValue::Name(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn port(&self, target: AppKey) -> Result<u16, HansError> {
        self.require(target, MetadataKey::Port, |value| match value {
            MetadataValue::Port(port) => Some(port),
            _ => None,
        })
        .copied()
    }

    pub fn configure(&self, target: AppKey) -> Option<&ConfigureFn> {
        match self.get(target, MetadataKey::Configuration) {
            Some(MetadataValue::Configure(configure)) => Some(configure),
            _ => None,
        }
    }

    /// Application-wide middleware in declaration order; empty when unset.
    pub fn app_middleware(&self, target: AppKey) -> &[Middleware] {
        match self.get(target, MetadataKey::AppMiddleware) {
            Some(MetadataValue::Middleware(middleware)) => middleware,
            _ => &[],
        }
    }

    pub fn public_directory(&self, target: AppKey) -> Result<&Path, HansError> {
        self.require(target, MetadataKey::PublicDirectory, |value| match value {
            MetadataValue::PublicDirectory(dir) => Some(dir.as_path()),
            _ => None,
        })
    }

    /// Middleware scoped to the route bound to `handler`; empty when unset.
    pub fn route_middleware(&self, target: AppKey, handler: &str) -> &[Middleware] {
        match self.get(target, MetadataKey::PerRouteMiddleware) {
            Some(MetadataValue::RouteMiddleware(map)) => {
                map.get(handler).map(Vec::as_slice).unwrap_or(&[])
            }
            _ => &[],
        }
    }
}
