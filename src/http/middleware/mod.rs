//! Request middleware.
//!
//! User middleware is a plain async function of the request and the rest of
//! the chain. Application-wide middleware wraps every declared route, the
//! first declared running outermost. Per-route middleware wraps only the
//! path of the route it was declared for.

pub mod access_log;

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::MethodRouter,
    Router,
};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

pub use access_log::{access_log, AccessLog};

/// A middleware function: inspect or replace the request, call `next.run`
/// (or not) and return the response.
pub type Middleware = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// Box an async function as [`Middleware`].
///
/// ```ignore
/// let cors = from_fn(|req, next| async move {
///     let mut res = next.run(req).await;
///     res.headers_mut().insert("access-control-allow-origin", HeaderValue::from_static("*"));
///     res
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req, next| f(req, next).boxed())
}

/// Wrap `router` so that `middleware[0]` sees requests first.
pub(crate) fn wrap_router(router: Router, middleware: &[Middleware]) -> Router {
    // Router::layer makes the last layer outermost.
    middleware.iter().rev().fold(router, |router, mw| {
        let mw = Arc::clone(mw);
        router.layer(axum::middleware::from_fn(move |req: Request, next: Next| mw(req, next)))
    })
}

/// Same as [`wrap_router`] for a single path.
pub(crate) fn wrap_method_router(route: MethodRouter, middleware: &[Middleware]) -> MethodRouter {
    middleware.iter().rev().fold(route, |route, mw| {
        let mw = Arc::clone(mw);
        route.layer(axum::middleware::from_fn(move |req: Request, next: Next| mw(req, next)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::HeaderValue, routing::get};
    use tower::ServiceExt;

    fn tag(name: &'static str) -> Middleware {
        from_fn(move |mut req: Request, next: Next| async move {
            let seen = req
                .headers()
                .get("x-trail")
                .and_then(|v| v.to_str().ok())
                .map(|v| format!("{v},{name}"))
                .unwrap_or_else(|| name.to_string());
            req.headers_mut()
                .insert("x-trail", HeaderValue::from_str(&seen).unwrap());
            next.run(req).await
        })
    }

    async fn trail(req: Request) -> String {
        req.headers()
            .get("x-trail")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    async fn body(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn first_declared_runs_first() {
        let router = wrap_router(Router::new().route("/", get(trail)), &[tag("a"), tag("b"), tag("c")]);
        let res = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body(res).await, "a,b,c");
    }

    #[tokio::test]
    async fn route_middleware_stays_on_its_path() {
        let router = Router::new()
            .route("/guarded", wrap_method_router(get(trail), &[tag("guard")]))
            .route("/open", get(trail));

        let guarded = router
            .clone()
            .oneshot(Request::builder().uri("/guarded").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body(guarded).await, "guard");

        let open = router
            .oneshot(Request::builder().uri("/open").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body(open).await, "");
    }

    #[tokio::test]
    async fn middleware_may_short_circuit() {
        let deny = from_fn(|_req, _next| async {
            Response::builder().status(403).body(Body::empty()).unwrap()
        });
        let router = wrap_router(Router::new().route("/", get(trail)), &[deny]);
        let res = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), 403);
    }
}
