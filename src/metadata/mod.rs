//! Declaration metadata.
//!
//! # Data Flow
//! ```text
//! MockApp::declare  ──(append routes / sockets / websockets)──┐
//!                                                            ▼
//! MockApp::options  ──(App: name, port, defaults)──▶  MetadataStore
//!                                                            │
//!                                  Hans::bootstrap ◀─────────┘ (typed reads)
//! ```
//!
//! Entries are keyed by `(AppKey, MetadataKey)`. The store never merges:
//! declaration helpers read, append and write back.

pub mod key;
pub mod store;

pub use key::{AppKey, MetadataKey};
pub use store::{MetadataStore, MetadataValue};
