//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Application port
//!     → listener.rs (bind per application, report transport errors)
//!     → axum::serve (HTTP/1.1, upgrades)
//!     → connection.rs (ids, kinds and paths of open socket/websocket connections)
//! ```

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionKind, ConnectionTracker, OpenConnection};
