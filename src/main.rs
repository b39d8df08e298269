//! mocking-hans
//!
//! Runs the bundled mock applications until Ctrl+C.
//!
//! ```text
//!     declarations (MockApp::declare / options)
//!         → metadata store
//!         → Hans::bootstrap
//!             → one axum server per application
//!                 ├─ raw websocket upgrades
//!                 ├─ /socket.io pub/sub namespaces
//!                 ├─ declared routes → handler → MockResponse
//!                 └─ static files
//! ```

mod demo;

use std::path::PathBuf;

use clap::Parser;

use mocking_hans::config::load_config;
use mocking_hans::observability::init_tracing;
use mocking_hans::{Hans, HansConfig};

#[derive(Debug, Parser)]
#[command(name = "mocking-hans", version, about = "Declarative mock servers")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HansConfig::default(),
    };

    init_tracing(&config.log_filter);
    tracing::info!(
        bind_host = %config.bind_host,
        public_directory = %config.public_directory.display(),
        "Configuration loaded"
    );

    let mut hans = Hans::new(config);
    hans.register::<demo::DataCollector>();

    let report = hans.bootstrap().await;
    if report.running.is_empty() {
        return Ok(());
    }
    tracing::info!("Are you ready to ... MOCK?");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    hans.shutdown();

    for app in report.running {
        app.stopped().await;
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
