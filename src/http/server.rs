//! Per-application HTTP server.
//!
//! # Layers (outermost first)
//! ```text
//! SetRequestId → PropagateRequestId → raw WebSocket upgrades → access log
//!     → declared routes (app middleware, per-route middleware, handler)
//!     → pub/sub endpoint (/socket.io)
//!     → static files from the public directory, else 404
//! ```

use std::future::IntoFuture;
use std::path::PathBuf;

use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
};

use crate::http::middleware::{access_log, wrap_router, AccessLog, Middleware};
use crate::http::request::MAX_BODY_BYTES;
use crate::http::routes::RouteTable;
use crate::http::websocket::{upgrade_middleware, UpgradeRoutes};
use crate::pubsub::{transport, PubSubLayer};

/// Everything one application serves.
pub(crate) struct ServerParts {
    pub app: String,
    pub port: u16,
    pub routes: RouteTable,
    pub app_middleware: Vec<Middleware>,
    /// Mounted only when the application declared socket events.
    pub pubsub: Option<PubSubLayer>,
    pub upgrades: UpgradeRoutes,
    pub public_directory: PathBuf,
}

/// HTTP server of one mock application.
pub struct AppServer {
    app: String,
    port: u16,
    router: Router,
}

impl AppServer {
    pub(crate) fn new(parts: ServerParts) -> Self {
        let app = parts.app.clone();
        let port = parts.port;
        let router = Self::build_router(parts);
        Self { app, port, router }
    }

    fn build_router(parts: ServerParts) -> Router {
        let mut router = wrap_router(parts.routes.into_router(), &parts.app_middleware)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));
        if let Some(pubsub) = parts.pubsub {
            router = router.merge(transport::routes(pubsub));
        }

        router
            .fallback_service(ServeDir::new(&parts.public_directory))
            .layer(from_fn_with_state(
                AccessLog {
                    app: parts.app,
                    port: parts.port,
                },
                access_log,
            ))
            .layer(from_fn_with_state(parts.upgrades, upgrade_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until `shutdown` fires. Open connections are not
    /// drained.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::debug!(app = %self.app, address = %addr, "HTTP server starting");

        tokio::select! {
            result = axum::serve(listener, self.router).into_future() => result?,
            _ = shutdown.recv() => {
                tracing::info!(app = %self.app, port = self.port, "HTTP server stopped");
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn into_router(self) -> Router {
        self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ConnectionTracker;
    use axum::{body::Body, extract::Request, http::StatusCode};
    use tower::ServiceExt;

    fn parts(public_directory: PathBuf) -> ServerParts {
        ServerParts {
            app: "T".to_string(),
            port: 1,
            routes: RouteTable::new("T"),
            app_middleware: Vec::new(),
            pubsub: None,
            upgrades: UpgradeRoutes::builder("T", 1, ConnectionTracker::new("T")).build(),
            public_directory,
        }
    }

    #[tokio::test]
    async fn serves_static_files_and_sets_request_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi").unwrap();
        let router = AppServer::new(parts(dir.path().to_path_buf())).into_router();

        let res = router
            .clone()
            .oneshot(Request::builder().uri("/hello.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));

        let res = router
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn keeps_client_request_id() {
        let dir = tempfile::tempdir().unwrap();
        let router = AppServer::new(parts(dir.path().to_path_buf())).into_router();
        let res = router
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()["x-request-id"], "abc");
    }
}
