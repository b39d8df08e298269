//! Observability subsystem.
//!
//! Structured `tracing` events everywhere; the subscriber is installed once
//! by the binary (logging.rs). Every HTTP response carries an
//! `x-request-id` that also appears in the access log.

pub mod logging;

pub use logging::init_tracing;
