//! Groups declared routes by path into one router.
//!
//! Every path is checked against the matcher before it is kept, so a path
//! the router would refuse fails the application's bootstrap with an error
//! instead of a panic.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use axum::{
    routing::{any, MethodRouter},
    Router,
};

use crate::declaration::route::router_path;
use crate::declaration::{HttpMethod, RouteDeclaration};
use crate::error::HansError;
use crate::http::dispatch::{method_router, RouteTarget};
use crate::http::middleware::{wrap_method_router, Middleware};

/// Check every declared path of `app` without binding any handler.
pub(crate) fn check_paths(app: &str, routes: &[RouteDeclaration]) -> Result<(), HansError> {
    let mut check = PathCheck::new(app);
    for route in routes {
        check.admit(&route.path)?;
    }
    Ok(())
}

struct Admitted {
    declared: String,
    path: String,
    shape: String,
}

/// Paths accepted so far, mirrored into a router without handlers.
struct PathCheck {
    app: String,
    admitted: Vec<Admitted>,
    trial: Router,
}

impl PathCheck {
    fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
            admitted: Vec::new(),
            trial: Router::new(),
        }
    }

    /// Router path for `declared`, or why it cannot be served next to the
    /// paths admitted before it.
    fn admit(&mut self, declared: &str) -> Result<String, HansError> {
        let path = router_path(declared);
        if self.admitted.iter().any(|a| a.path == path) {
            return Ok(path);
        }

        let shape = shape(&path);
        if let Some(other) = self.admitted.iter().find(|a| a.shape == shape) {
            return Err(self.conflict(&other.declared, declared));
        }

        check_syntax(&path).map_err(|reason| self.invalid(declared, reason))?;

        match try_route(self.trial.clone(), &path) {
            Ok(trial) => self.trial = trial,
            Err(reason) => {
                // A path the router takes on its own clashes with an earlier one.
                let alone = try_route(Router::new(), &path).is_ok();
                let clash = self
                    .admitted
                    .iter()
                    .filter(|_| alone)
                    .find(|a| try_route(Router::new(), &a.path).and_then(|r| try_route(r, &path)).is_err());
                return Err(match clash {
                    Some(other) => self.conflict(&other.declared, declared),
                    None => self.invalid(declared, reason),
                });
            }
        }

        self.admitted.push(Admitted {
            declared: declared.to_string(),
            path: path.clone(),
            shape,
        });
        Ok(path)
    }

    fn conflict(&self, first: &str, second: &str) -> HansError {
        HansError::ConflictingRoutes {
            app: self.app.clone(),
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    fn invalid(&self, declared: &str, reason: String) -> HansError {
        HansError::InvalidRoute {
            app: self.app.clone(),
            path: declared.to_string(),
            reason,
        }
    }
}

struct PathEntry {
    path: String,
    methods: HashSet<HttpMethod>,
    router: Option<MethodRouter>,
    middleware: Vec<Middleware>,
    middleware_from: HashSet<String>,
}

/// Declared routes of one application, keyed by router path.
pub(crate) struct RouteTable {
    app: String,
    check: PathCheck,
    entries: Vec<PathEntry>,
}

impl RouteTable {
    pub(crate) fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
            check: PathCheck::new(app),
            entries: Vec::new(),
        }
    }

    /// Add one declaration. The first binding of a method and path wins;
    /// later ones are ignored with a warning.
    pub(crate) fn add(
        &mut self,
        route: &RouteDeclaration,
        target: RouteTarget,
        middleware: &[Middleware],
    ) -> Result<(), HansError> {
        let path = self.check.admit(&route.path)?;

        let index = match self.entries.iter().position(|e| e.path == path) {
            Some(index) => index,
            None => {
                self.entries.push(PathEntry {
                    path,
                    methods: HashSet::new(),
                    router: None,
                    middleware: Vec::new(),
                    middleware_from: HashSet::new(),
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[index];

        if !entry.methods.insert(route.method) {
            tracing::warn!(
                app = %self.app,
                method = %route.method,
                path = %route.path,
                handler = %route.handler,
                "Route already declared, keeping the first handler"
            );
            return Ok(());
        }

        if entry.middleware_from.insert(route.handler.clone()) {
            entry.middleware.extend(middleware.iter().cloned());
        }

        let handler = method_router(route.method, target);
        entry.router = Some(match entry.router.take() {
            Some(existing) => existing.merge(handler),
            None => handler,
        });

        tracing::debug!(app = %self.app, method = %route.method, path = %route.path, handler = %route.handler, "Route registered");
        Ok(())
    }

    #[cfg(test)]
    fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub(crate) fn into_router(self) -> Router {
        self.entries.into_iter().fold(Router::new(), |router, entry| match entry.router {
            Some(method_router) => router.route(&entry.path, wrap_method_router(method_router, &entry.middleware)),
            None => router,
        })
    }
}

/// Router path with capture names erased, so `/a/{id}` and `/a/{name}`
/// compare equal.
fn shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn check_syntax(path: &str) -> Result<(), String> {
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        if segment.matches('{').count() != segment.matches('}').count() {
            return Err(format!("unbalanced braces in segment `{segment}`"));
        }
        if segment.contains("{}") || segment.contains("{*}") {
            return Err("parameter without a name".to_string());
        }
        if segment.contains("{*") && i != last {
            return Err("a wildcard is only allowed as the last segment".to_string());
        }
    }
    Ok(())
}

/// Register `path` on `router`, turning the router's panic into its message.
fn try_route(router: Router, path: &str) -> Result<Router, String> {
    panic::catch_unwind(AssertUnwindSafe(|| router.route(path, any(|| async {}))))
        .map_err(|payload| panic_reason(payload.as_ref()))
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "refused by the router".to_string()
    }
}
