//! Error taxonomy.
//!
//! `HansError` covers everything that can go wrong while turning declarations
//! into listening servers. `HandlerError` is what application handlers return;
//! the dispatcher maps it onto the transport (HTTP status or closed socket).

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::metadata::MetadataKey;

/// Bootstrap and declaration errors.
#[derive(Debug, Error)]
pub enum HansError {
    /// A metadata entry required at bootstrap was never written.
    #[error("missing declaration metadata {key:?} on application `{app}`")]
    MissingMetadata { app: String, key: MetadataKey },

    #[error("application `{app}` declares invalid port {port} (expected 1-65535)")]
    InvalidPort { app: String, port: u16 },

    /// Two different application types were declared under the same name.
    #[error("application name `{name}` is declared by both `{first}` and `{second}`")]
    DuplicateApplication {
        name: String,
        first: &'static str,
        second: &'static str,
    },

    /// A declaration references a handler the application never bound.
    #[error("application `{app}` has no {kind} handler named `{handler}`")]
    UnknownHandler {
        app: String,
        kind: &'static str,
        handler: String,
    },

    /// Two declared paths capture the same segments under different names.
    #[error("application `{app}` declares conflicting routes `{first}` and `{second}`")]
    ConflictingRoutes {
        app: String,
        first: String,
        second: String,
    },

    /// A declared path the router cannot register.
    #[error("application `{app}` declares invalid route `{path}`: {reason}")]
    InvalidRoute {
        app: String,
        path: String,
        reason: String,
    },

    #[error("application `{app}` declares unsupported websocket event `{event}` on `{namespace}`")]
    UnsupportedEvent {
        app: String,
        event: String,
        namespace: String,
    },

    /// Binding the listener failed (port in use, permission denied, ...).
    #[error("application `{app}` failed to listen on port {port}: {source}")]
    Transport {
        app: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl HansError {
    /// True for errors caused by the declarations themselves rather than the
    /// environment.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, HansError::Transport { .. })
    }
}

/// Error raised inside a route, socket or websocket handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request was malformed; answered with 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body is larger than the server buffers; answered with 413.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),

    /// The peer went away before the handler could write to it.
    #[error("connection closed")]
    Closed,

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }

    /// Status code reported to HTTP clients for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HandlerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_status() {
        assert_eq!(
            HandlerError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HandlerError::PayloadTooLarge(1).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            HandlerError::msg("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn transport_is_not_configuration() {
        let err = HansError::Transport {
            app: "A".into(),
            port: 3000,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("port 3000"));

        let err = HansError::InvalidPort { app: "A".into(), port: 0 };
        assert!(err.is_configuration());
    }
}
