//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap (per application, phase.rs):
//!     Unconfigured → ServerCreated → Listening
//!         → SocketsRegistered → WebsocketsRegistered → RoutesRegistered
//!
//! Shutdown (shutdown.rs):
//!     Hans::shutdown / Ctrl+C → every application server stops accepting
//! ```

pub mod phase;
pub mod shutdown;

pub use phase::AppPhase;
pub use shutdown::Shutdown;
