//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! hans.toml (optional)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → HansConfig (validated, immutable)
//!     → owned by the orchestrator for its lifetime
//! ```
//!
//! Application declarations are not configuration: they live in process
//! metadata. The file only tunes the orchestrator itself.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::HansConfig;
