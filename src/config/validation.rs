//! Configuration validation.
//!
//! Serde handles the syntax; this checks the values. All problems are
//! reported together rather than stopping at the first one.

use std::fmt;

use crate::config::schema::HansConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &HansConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bind_host.trim().is_empty() {
        errors.push(ValidationError {
            field: "bind_host",
            message: "must not be empty".to_string(),
        });
    } else if config.bind_host.contains(':') && config.bind_host.parse::<std::net::Ipv6Addr>().is_err() {
        errors.push(ValidationError {
            field: "bind_host",
            message: format!("`{}` must be a host without a port", config.bind_host),
        });
    }

    if config.public_directory.as_os_str().is_empty() {
        errors.push(ValidationError {
            field: "public_directory",
            message: "must not be empty".to_string(),
        });
    }

    if config.log_filter.trim().is_empty() {
        errors.push(ValidationError {
            field: "log_filter",
            message: "must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
