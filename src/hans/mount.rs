//! Turning one application's declarations into a running server.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::app::{AppRegistry, MockApp, SharedState};
use crate::config::HansConfig;
use crate::declaration::{HandlerTable, WebsocketScope};
use crate::error::HansError;
use crate::hans::report::RunningApp;
use crate::http::dispatch::RouteTarget;
use crate::http::routes::{check_paths, RouteTable};
use crate::http::server::{AppServer, ServerParts};
use crate::http::websocket::UpgradeRoutes;
use crate::lifecycle::{AppPhase, Shutdown};
use crate::metadata::{AppKey, MetadataStore};
use crate::net::{self, ConnectionTracker};
use crate::pubsub::{transport, PubSubLayer, CONNECTION_EVENT};

/// What every mount needs from the orchestrator.
pub(crate) struct MountContext<'a> {
    pub config: &'a HansConfig,
    pub store: &'a MetadataStore,
    pub state: &'a SharedState,
    pub registry: &'a AppRegistry,
    pub shutdown: &'a Shutdown,
}

/// Type-erased bootstrap of one registered application.
pub(crate) trait Mount: Send + Sync {
    fn key(&self) -> AppKey;

    fn mount<'a>(&'a self, ctx: &'a MountContext<'a>) -> BoxFuture<'a, Result<RunningApp, HansError>>;
}

pub(crate) struct AppMount<A> {
    key: AppKey,
    handlers: HandlerTable<A>,
}

impl<A: MockApp> AppMount<A> {
    pub(crate) fn new(handlers: HandlerTable<A>) -> Self {
        Self {
            key: AppKey::of::<A>(),
            handlers,
        }
    }

    /// Check every declaration against the handler table before anything
    /// is bound.
    fn validate(&self, store: &MetadataStore, name: &str) -> Result<(), HansError> {
        let routes = store.routes(self.key)?;
        let sockets = store.socket_routes(self.key)?;
        let websockets = store.native_socket_routes(self.key)?;
        store.graphql_routes(self.key)?;

        for route in routes {
            resolve(&self.handlers.routes, name, "route", &route.handler)?;
            if !sockets.is_empty()
                && (route.path == transport::ENDPOINT || route.path.starts_with("/socket.io/"))
            {
                return Err(HansError::ConflictingRoutes {
                    app: name.to_string(),
                    first: route.path.clone(),
                    second: transport::ENDPOINT.to_string(),
                });
            }
        }
        check_paths(name, routes)?;
        for socket in sockets {
            resolve(&self.handlers.sockets, name, "socket", &socket.handler)?;
        }
        for ws in websockets {
            if ws.event != CONNECTION_EVENT {
                return Err(HansError::UnsupportedEvent {
                    app: name.to_string(),
                    event: ws.event.clone(),
                    namespace: ws.namespace.clone(),
                });
            }
            match ws.scope {
                WebsocketScope::Routed => {
                    resolve(&self.handlers.websockets, name, "websocket", &ws.handler)?;
                }
                WebsocketScope::Observer | WebsocketScope::All => {
                    resolve(&self.handlers.observers, name, "websocket observer", &ws.handler)?;
                }
            }
        }
        Ok(())
    }

    async fn start(&self, ctx: &MountContext<'_>) -> Result<RunningApp, HansError> {
        let key = self.key;
        let store = ctx.store;
        let mut phase = AppPhase::Unconfigured;

        let name = store.name(key)?.to_string();
        let port = store.port(key)?;
        if port == 0 {
            return Err(HansError::InvalidPort { app: name, port });
        }
        self.validate(store, &name)?;

        // A rejected duplicate must not touch the shared state.
        let instance = ctx.registry.get_or_create::<A>(&name, ctx.state)?;
        if let Some(configure) = store.configure(key) {
            configure(ctx.state);
        }
        let tracker = ConnectionTracker::new(name.clone());
        phase.advance(&name, AppPhase::ServerCreated);

        let listener = net::listener::bind(&name, &ctx.config.bind_host, port).await?;
        let local_addr = listener.local_addr().map_err(|source| HansError::Transport {
            app: name.clone(),
            port,
            source,
        })?;
        tracing::info!(app = %name, port, "Started {} on localhost:{}", name, port);
        phase.advance(&name, AppPhase::Listening);

        let pubsub = PubSubLayer::new(name.clone(), tracker.clone());
        let sockets = store.socket_routes(key)?;
        for socket in sockets {
            let handler = resolve(&self.handlers.sockets, &name, "socket", &socket.handler)?.clone();
            let instance = Arc::clone(&instance);
            pubsub.namespace(&socket.namespace).on_boxed(
                &socket.event,
                Arc::new(move |sock, data| handler(Arc::clone(&instance), sock, data)),
            );
            tracing::debug!(app = %name, namespace = %socket.namespace, event = %socket.event, handler = %socket.handler, "Socket event registered");
        }
        phase.advance(&name, AppPhase::SocketsRegistered);

        let mut upgrades = UpgradeRoutes::builder(&name, port, tracker.clone());
        for ws in store.native_socket_routes(key)? {
            let instance = Arc::clone(&instance);
            match ws.scope {
                WebsocketScope::Routed => {
                    let handler = resolve(&self.handlers.websockets, &name, "websocket", &ws.handler)?.clone();
                    upgrades.routed(
                        &ws.event,
                        &ws.namespace,
                        &ws.handler,
                        Arc::new(move |conn| handler(Arc::clone(&instance), conn)),
                    );
                }
                WebsocketScope::Observer | WebsocketScope::All => {
                    let handler =
                        resolve(&self.handlers.observers, &name, "websocket observer", &ws.handler)?.clone();
                    upgrades.observer(
                        &ws.event,
                        ws.scope,
                        &ws.handler,
                        Arc::new(move |event| handler(Arc::clone(&instance), event)),
                    );
                }
            }
        }
        phase.advance(&name, AppPhase::WebsocketsRegistered);

        let files_root = Arc::new(
            store
                .public_directory(key)
                .map(PathBuf::from)
                .unwrap_or_else(|_| ctx.config.public_directory.clone()),
        );
        let app_name: Arc<str> = Arc::from(name.as_str());
        let mut routes = RouteTable::new(&name);
        for route in store.routes(key)? {
            let handler = resolve(&self.handlers.routes, &name, "route", &route.handler)?.clone();
            let instance = Arc::clone(&instance);
            let target = RouteTarget {
                app: Arc::clone(&app_name),
                handler: route.handler.clone(),
                call: Arc::new(move |req| handler(Arc::clone(&instance), req)),
                files_root: Arc::clone(&files_root),
                pubsub: pubsub.clone(),
            };
            routes.add(route, target, store.route_middleware(key, &route.handler))?;
        }
        phase.advance(&name, AppPhase::RoutesRegistered);

        let server = AppServer::new(ServerParts {
            app: name.clone(),
            port,
            routes,
            app_middleware: store.app_middleware(key).to_vec(),
            pubsub: (!sockets.is_empty()).then(|| pubsub.clone()),
            upgrades: upgrades.build(),
            public_directory: files_root.as_ref().clone(),
        });

        let shutdown = ctx.shutdown.subscribe();
        let task_name = name.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = server.run(listener, shutdown).await {
                tracing::error!(app = %task_name, error = %e, "HTTP server failed");
            }
        });

        Ok(RunningApp {
            name,
            port,
            local_addr,
            phase,
            pubsub,
            tracker,
            task,
        })
    }
}

impl<A: MockApp> Mount for AppMount<A> {
    fn key(&self) -> AppKey {
        self.key
    }

    fn mount<'a>(&'a self, ctx: &'a MountContext<'a>) -> BoxFuture<'a, Result<RunningApp, HansError>> {
        self.start(ctx).boxed()
    }
}

fn resolve<'h, H>(
    handlers: &'h HashMap<String, H>,
    app: &str,
    kind: &'static str,
    handler: &str,
) -> Result<&'h H, HansError> {
    handlers.get(handler).ok_or_else(|| HansError::UnknownHandler {
        app: app.to_string(),
        kind,
        handler: handler.to_string(),
    })
}
