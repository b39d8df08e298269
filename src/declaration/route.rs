//! Route declarations (`Get`, `Post`, `Put`, `Delete`, per-route middleware).

use crate::declaration::{HttpMethod, RouteDeclaration};
use crate::http::middleware::Middleware;
use crate::metadata::{AppKey, MetadataKey, MetadataStore, MetadataValue};

/// Prefix `path` with "/" when missing.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Translate express-style segments into the router's capture syntax:
/// `:id` becomes `{id}`, a lone `*` becomes a catch-all.
pub fn router_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if segment == "*" {
                "{*wildcard}".to_string()
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Append a route to `target`'s Routes list.
pub fn add_route(
    store: &mut MetadataStore,
    target: AppKey,
    path: &str,
    method: HttpMethod,
    handler: &str,
) {
    let mut routes = store
        .get(target, MetadataKey::Routes)
        .and_then(MetadataValue::as_routes)
        .map(<[_]>::to_vec)
        .unwrap_or_default();

    routes.push(RouteDeclaration {
        path: normalize_path(path),
        method,
        handler: handler.to_string(),
    });

    store.set(target, MetadataKey::Routes, MetadataValue::Routes(routes));
}

/// Append middleware that only runs for the route bound to `handler`.
pub fn add_route_middleware(
    store: &mut MetadataStore,
    target: AppKey,
    handler: &str,
    middleware: Middleware,
) {
    let mut map = match store.get(target, MetadataKey::PerRouteMiddleware) {
        Some(MetadataValue::RouteMiddleware(map)) => map.clone(),
        _ => Default::default(),
    };
    map.entry(handler.to_string()).or_default().push(middleware);
    store.set(target, MetadataKey::PerRouteMiddleware, MetadataValue::RouteMiddleware(map));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture;

    #[test]
    fn prefixes_missing_slash() {
        assert_eq!(normalize_path("users"), "/users");
        assert_eq!(normalize_path("/users"), "/users");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn translates_params() {
        assert_eq!(router_path("/users/:id"), "/users/{id}");
        assert_eq!(router_path("/users/:id/posts/:post"), "/users/{id}/posts/{post}");
        assert_eq!(router_path("/files/*"), "/files/{*wildcard}");
        assert_eq!(router_path("/plain"), "/plain");
        assert_eq!(router_path("/"), "/");
    }

    #[test]
    fn preserves_declaration_order() {
        let mut store = MetadataStore::new();
        let key = AppKey::of::<Fixture>();
        add_route(&mut store, key, "a", HttpMethod::Get, "first");
        add_route(&mut store, key, "/b", HttpMethod::Get, "second");
        add_route(&mut store, key, "/a", HttpMethod::Delete, "third");

        let handlers: Vec<_> = store
            .routes(key)
            .unwrap()
            .iter()
            .map(|r| (r.path.as_str(), r.method, r.handler.as_str()))
            .collect();
        assert_eq!(
            handlers,
            vec![
                ("/a", HttpMethod::Get, "first"),
                ("/b", HttpMethod::Get, "second"),
                ("/a", HttpMethod::Delete, "third"),
            ]
        );
    }
}
