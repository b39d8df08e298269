//! Configuration schema definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the orchestrator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HansConfig {
    /// Host every application listener binds to. Ports come from the
    /// application declarations.
    pub bind_host: String,

    /// Root for `File` responses.
    pub public_directory: PathBuf,

    /// Default `tracing` filter, overridden by `RUST_LOG`.
    pub log_filter: String,
}

impl Default for HansConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            public_directory: default_public_directory(),
            log_filter: "mocking_hans=info,tower_http=info".to_string(),
        }
    }
}

/// `<cwd>/public/`, falling back to a relative `public/` when the working
/// directory is unavailable.
pub fn default_public_directory() -> PathBuf {
    std::env::current_dir()
        .map(|cwd| cwd.join("public"))
        .unwrap_or_else(|_| PathBuf::from("public"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: HansConfig = toml::from_str(r#"bind_host = "127.0.0.1""#).unwrap();
        assert_eq!(config.bind_host, "127.0.0.1");
        assert!(config.public_directory.ends_with("public"));
        assert!(config.log_filter.contains("mocking_hans"));
    }
}
