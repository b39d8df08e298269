//! Method-level declarations for one application type.
//!
//! ```ignore
//! impl MockApp for Twitter {
//!     fn declare(app: &mut Declarations<'_, Self>) {
//!         app.get("/timeline", "timeline", Self::timeline)
//!             .post("tweets", "tweet", Self::tweet)
//!             .websocket("connection", "/stream", "stream", Self::stream);
//!     }
//!     // ...
//! }
//! ```
//!
//! Every binding records a declaration in the metadata store and keeps the
//! callable in a [`HandlerTable`] under the handler name, which is what the
//! orchestrator resolves declarations against.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use crate::app::MockApp;
use crate::declaration::route::{add_route, add_route_middleware};
use crate::declaration::socket::{add_socket, add_websocket};
use crate::declaration::{HttpMethod, DEFAULT_NAMESPACE};
use crate::error::HandlerError;
use crate::http::middleware::Middleware;
use crate::http::request::HttpContext;
use crate::http::response::Reply;
use crate::http::websocket::{UpgradeEvent, WsConnection};
use crate::metadata::{AppKey, MetadataStore};
use crate::pubsub::Socket;

pub type HandlerResult = Result<Reply, HandlerError>;

pub(crate) type RouteHandler<A> =
    Arc<dyn Fn(Arc<A>, HttpContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;
pub(crate) type SocketHandler<A> =
    Arc<dyn Fn(Arc<A>, Socket, Value) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;
pub(crate) type WebsocketHandler<A> =
    Arc<dyn Fn(Arc<A>, WsConnection) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;
pub(crate) type ObserverHandler<A> =
    Arc<dyn Fn(Arc<A>, UpgradeEvent) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Handlers of one application, by name.
pub struct HandlerTable<A> {
    pub(crate) routes: HashMap<String, RouteHandler<A>>,
    pub(crate) sockets: HashMap<String, SocketHandler<A>>,
    pub(crate) websockets: HashMap<String, WebsocketHandler<A>>,
    pub(crate) observers: HashMap<String, ObserverHandler<A>>,
}

impl<A> Default for HandlerTable<A> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            sockets: HashMap::new(),
            websockets: HashMap::new(),
            observers: HashMap::new(),
        }
    }
}

impl<A> HandlerTable<A> {
    pub fn len(&self) -> usize {
        self.routes.len() + self.sockets.len() + self.websockets.len() + self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collects the declarations of application `A`.
pub struct Declarations<'s, A> {
    store: &'s mut MetadataStore,
    target: AppKey,
    handlers: HandlerTable<A>,
}

impl<'s, A: MockApp> Declarations<'s, A> {
    pub(crate) fn new(store: &'s mut MetadataStore) -> Self {
        Self {
            store,
            target: AppKey::of::<A>(),
            handlers: HandlerTable::default(),
        }
    }

    pub(crate) fn into_handlers(self) -> HandlerTable<A> {
        self.handlers
    }

    /// Bind `handler` to `method path`. A name may be bound to several
    /// routes; binding it again replaces the callable for all of them.
    pub fn route<F, Fut>(&mut self, method: HttpMethod, path: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, HttpContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        add_route(self.store, self.target, path, method, name);
        self.handlers
            .routes
            .insert(name.to_string(), Arc::new(move |app, ctx| handler(app, ctx).boxed()));
        self
    }

    pub fn get<F, Fut>(&mut self, path: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, HttpContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(HttpMethod::Get, path, name, handler)
    }

    pub fn post<F, Fut>(&mut self, path: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, HttpContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(HttpMethod::Post, path, name, handler)
    }

    pub fn put<F, Fut>(&mut self, path: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, HttpContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(HttpMethod::Put, path, name, handler)
    }

    pub fn delete<F, Fut>(&mut self, path: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, HttpContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(HttpMethod::Delete, path, name, handler)
    }

    /// Run `middleware` in front of the route(s) bound to handler `name`.
    pub fn middleware(&mut self, name: &str, middleware: Middleware) -> &mut Self {
        add_route_middleware(self.store, self.target, name, middleware);
        self
    }

    /// Bind a pub/sub event on the default namespace.
    pub fn socket<F, Fut>(&mut self, event: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, Socket, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.socket_in(event, DEFAULT_NAMESPACE, name, handler)
    }

    /// Bind a pub/sub event on `namespace`. The handler receives the socket
    /// that triggered the event and its payload (`null` for `connection`).
    pub fn socket_in<F, Fut>(&mut self, event: &str, namespace: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, Socket, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        add_socket(self.store, self.target, event, namespace, name);
        self.handlers.sockets.insert(
            name.to_string(),
            Arc::new(move |app, socket, data| handler(app, socket, data).boxed()),
        );
        self
    }

    /// Hand upgrades whose path equals `namespace` to `handler`.
    pub fn websocket<F, Fut>(&mut self, event: &str, namespace: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, WsConnection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        add_websocket(self.store, self.target, event, Some(namespace), name, false);
        self.handlers
            .websockets
            .insert(name.to_string(), Arc::new(move |app, ws| handler(app, ws).boxed()));
        self
    }

    /// Observe connections on the default namespace "/".
    pub fn websocket_observer<F, Fut>(&mut self, event: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, UpgradeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        add_websocket(self.store, self.target, event, None, name, false);
        self.insert_observer(name, handler)
    }

    /// Observe every upgrade request regardless of path.
    pub fn websocket_observer_all<F, Fut>(&mut self, event: &str, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, UpgradeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        add_websocket(self.store, self.target, event, None, name, true);
        self.insert_observer(name, handler)
    }

    fn insert_observer<F, Fut>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(Arc<A>, UpgradeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.handlers
            .observers
            .insert(name.to_string(), Arc::new(move |app, event| handler(app, event).boxed()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SharedState;
    use crate::declaration::{finalize_app, AppOptions};
    use crate::http::response::MockResponse;

    struct Shop;

    impl Shop {
        async fn list(self: Arc<Self>, _ctx: HttpContext) -> HandlerResult {
            Ok(MockResponse::json(serde_json::json!([])).into())
        }
    }

    impl MockApp for Shop {
        fn options() -> AppOptions {
            AppOptions::new("Shop", 3100)
        }

        fn declare(app: &mut Declarations<'_, Self>) {
            app.get("/items", "list", Self::list)
                .post("items", "create", |_app, _ctx| async {
                    Ok(MockResponse::generic("created")
                        .status(axum::http::StatusCode::CREATED)
                        .into())
                })
                .middleware("list", crate::http::middleware::from_fn(|req, next| next.run(req)))
                .socket("connection", "on_connect", |_app, _socket, _data| async { Ok(()) })
                .websocket("connection", "/feed", "feed", |_app, _ws| async { Ok(()) })
                .websocket_observer("connection", "observe", |_app, _event| async { Ok(()) });
        }

        fn create(_state: SharedState) -> Self {
            Shop
        }
    }

    #[test]
    fn records_declarations_and_handlers() {
        let mut store = MetadataStore::new();
        let mut declarations = Declarations::<Shop>::new(&mut store);
        Shop::declare(&mut declarations);
        let handlers = declarations.into_handlers();
        finalize_app(&mut store, AppKey::of::<Shop>(), Shop::options());

        let key = AppKey::of::<Shop>();
        let routes = store.routes(key).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].handler, "list");
        assert_eq!(routes[1].path, "/items");
        assert_eq!(routes[1].method, HttpMethod::Post);
        assert_eq!(store.socket_routes(key).unwrap().len(), 1);
        assert_eq!(store.native_socket_routes(key).unwrap().len(), 2);
        assert_eq!(store.route_middleware(key, "list").len(), 1);
        assert!(store.route_middleware(key, "create").is_empty());

        assert_eq!(handlers.len(), 5);
        assert!(handlers.routes.contains_key("create"));
        assert!(handlers.observers.contains_key("observe"));
    }
}
