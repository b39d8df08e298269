//! Per-application TCP listener.

use tokio::net::TcpListener;

use crate::error::HansError;

/// Bind the listener for application `app` on `host:port`.
///
/// A failure here only concerns this application; the caller decides what
/// happens to the others.
pub async fn bind(app: &str, host: &str, port: u16) -> Result<TcpListener, HansError> {
    let transport = |source| HansError::Transport {
        app: app.to_string(),
        port,
        source,
    };

    let listener = TcpListener::bind((host, port)).await.map_err(transport)?;
    let local_addr = listener.local_addr().map_err(transport)?;

    tracing::debug!(
        app = %app,
        address = %local_addr,
        "Listener bound"
    );

    Ok(listener)
}
