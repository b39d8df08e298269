//! Route handler invocation.
//!
//! Builds the request context, calls the bound handler and writes its reply.
//! Handler failures never take the server down: `BadRequest` answers 400,
//! every other error and any panic answers 500.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{RawPathParams, Request},
    response::{IntoResponse, Response},
    routing::{on, MethodRouter},
};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::declaration::builder::HandlerResult;
use crate::declaration::HttpMethod;
use crate::error::HandlerError;
use crate::http::request::HttpContext;
use crate::http::response::{flush, Reply};
use crate::pubsub::PubSubLayer;

pub(crate) type RouteFn = Arc<dyn Fn(HttpContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A handler bound to one declared route, with what it needs at request time.
#[derive(Clone)]
pub(crate) struct RouteTarget {
    pub app: Arc<str>,
    pub handler: String,
    pub call: RouteFn,
    pub files_root: Arc<PathBuf>,
    pub pubsub: PubSubLayer,
}

/// A method router answering `method` with `target`.
pub(crate) fn method_router(method: HttpMethod, target: RouteTarget) -> MethodRouter {
    on(method.filter(), move |params: RawPathParams, request: Request| {
        let target = target.clone();
        async move { handle(target, params, request).await }
    })
}

async fn handle(target: RouteTarget, params: RawPathParams, request: Request) -> Response {
    let ctx = match HttpContext::from_request(params, request, target.pubsub.clone()).await {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&target, e),
    };

    let result = AssertUnwindSafe((target.call)(ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(HandlerError::msg("handler panicked")));

    match result {
        Ok(Reply::Mock(response)) => flush(response, &target.files_root).await,
        Ok(Reply::Handled(response)) => response,
        Err(e) => error_response(&target, e),
    }
}

fn error_response(target: &RouteTarget, error: HandlerError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(app = %target.app, handler = %target.handler, error = %error, "Route handler failed");
        (status, "Internal Server Error").into_response()
    } else {
        tracing::warn!(app = %target.app, handler = %target.handler, error = %error, "Request rejected");
        (status, error.to_string()).into_response()
    }
}
