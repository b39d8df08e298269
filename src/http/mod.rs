//! HTTP and raw WebSocket handling.
//!
//! # Data Flow
//! ```text
//! Request
//!     → server.rs (request id, upgrade interception, access log)
//!     → routes.rs (declared routes grouped by path, middleware)
//!     → dispatch.rs (HttpContext from request.rs, handler call)
//!     → response.rs (Reply flushed: generic, JSON, XML via xml.rs, file)
//! ```

pub(crate) mod dispatch;
pub mod middleware;
pub mod request;
pub mod response;
pub(crate) mod routes;
pub mod server;
pub mod websocket;
pub mod xml;

pub use middleware::Middleware;
pub use request::HttpContext;
pub use response::{MockResponse, Reply, ResponseBody};
pub use server::AppServer;
pub use websocket::{UpgradeEvent, WsConnection};
