//! Application-level declaration (`App`).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::State;
use crate::http::middleware::Middleware;
use crate::metadata::{AppKey, MetadataKey, MetadataStore, MetadataValue};

/// Initialization callback run once with the shared state before the
/// application is constructed.
pub type ConfigureFn = Arc<dyn Fn(&State) + Send + Sync>;

/// Configuration of one mock application.
#[derive(Clone)]
pub struct AppOptions {
    pub name: String,
    pub port: u16,
    pub middleware: Vec<Middleware>,
    pub public_directory: Option<PathBuf>,
    pub configure: Option<ConfigureFn>,
}

impl AppOptions {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
            middleware: Vec::new(),
            public_directory: None,
            configure: None,
        }
    }

    /// Append application-wide middleware. Runs in the order added.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn public_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_directory = Some(dir.into());
        self
    }

    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&State) + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(configure));
        self
    }
}

impl fmt::Debug for AppOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppOptions")
            .field("name", &self.name)
            .field("port", &self.port)
            .field("middleware", &self.middleware.len())
            .field("public_directory", &self.public_directory)
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

/// Record `options` for `target`, filling defaults.
///
/// Route-kind lists are only seeded when absent; lists already populated by
/// method declarations are left untouched.
pub fn finalize_app(store: &mut MetadataStore, target: AppKey, options: AppOptions) {
    let configure = options
        .configure
        .unwrap_or_else(|| Arc::new(|_: &State| {}));

    store.set(target, MetadataKey::Configuration, MetadataValue::Configure(configure));
    store.set(target, MetadataKey::Name, MetadataValue::Name(options.name));
    store.set(target, MetadataKey::Port, MetadataValue::Port(options.port));
    store.set(target, MetadataKey::AppMiddleware, MetadataValue::Middleware(options.middleware));
    // Without an explicit directory the orchestrator's configured one applies.
    if let Some(dir) = options.public_directory {
        store.set(target, MetadataKey::PublicDirectory, MetadataValue::PublicDirectory(dir));
    }

    for key in MetadataKey::ROUTE_KINDS {
        if !store.has(target, key) {
            if let Some(empty) = MetadataValue::empty_list(key) {
                store.set(target, key, empty);
            }
        }
    }

    tracing::debug!(app = %target, "application metadata finalized");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::route::add_route;
    use crate::declaration::HttpMethod;

    struct Fixture;

    #[test]
    fn seeds_every_route_kind() {
        let mut store = MetadataStore::new();
        let key = AppKey::of::<Fixture>();
        finalize_app(&mut store, key, AppOptions::new("A", 3000));

        for kind in MetadataKey::ROUTE_KINDS {
            assert!(store.has(key, kind), "{kind:?} not seeded");
        }
        assert!(store.routes(key).unwrap().is_empty());
        assert!(store.graphql_routes(key).unwrap().is_empty());
        assert!(store.socket_routes(key).unwrap().is_empty());
        assert!(store.native_socket_routes(key).unwrap().is_empty());
        assert!(store.configure(key).is_some());
        assert!(store.public_directory(key).is_err());
    }

    #[test]
    fn never_clobbers_method_declarations() {
        let mut store = MetadataStore::new();
        let key = AppKey::of::<Fixture>();
        add_route(&mut store, key, "/x", HttpMethod::Get, "x");
        finalize_app(&mut store, key, AppOptions::new("A", 3000));

        let routes = store.routes(key).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/x");
    }

    #[test]
    fn declarations_after_finalize_still_accumulate() {
        let mut store = MetadataStore::new();
        let key = AppKey::of::<Fixture>();
        finalize_app(&mut store, key, AppOptions::new("A", 3000));
        add_route(&mut store, key, "/late", HttpMethod::Post, "late");

        assert_eq!(store.routes(key).unwrap().len(), 1);
    }

    #[test]
    fn explicit_options_are_kept() {
        let mut store = MetadataStore::new();
        let key = AppKey::of::<Fixture>();
        finalize_app(
            &mut store,
            key,
            AppOptions::new("Twitter", 4000).public_directory("/srv/static"),
        );

        assert_eq!(store.name(key).unwrap(), "Twitter");
        assert_eq!(store.port(key).unwrap(), 4000);
        assert_eq!(store.public_directory(key).unwrap(), std::path::Path::new("/srv/static"));
    }
}
