//! # SAML service provider
//!
//! Main entry point: loads configuration, metadata and the SP key, then
//! serves action messages until shut down.

#![forbid(unsafe_code)]

use sp_core::SpConfig;
use sp_server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SpConfig::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        metadata_dir = %config.metadata_dir.display(),
        issuer = %config.issuer,
        "SAML service provider starting"
    );

    // Startup load must finish before anything is accepted.
    let server = Server::new(config)?;
    server.run().await
}
