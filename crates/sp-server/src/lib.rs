//! # sp-server
//!
//! Hosts the SAML service provider core behind a small HTTP carrier.
//!
//! Action messages (`generate-authn-request`, `validate-signature`,
//! `decrypt-assertion`, `validate-signature-decrypt`,
//! `generate-slo-request`) are posted as JSON and answered with a
//! `{"status": ...}` reply.
//!
//! ## Usage
//!
//! ```ignore
//! use sp_core::SpConfig;
//! use sp_server::Server;
//!
//! let config = SpConfig::from_env()?;
//! let server = Server::new(config)?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod dispatcher;
pub mod router;
pub mod state;

pub use dispatcher::{Action, ActionOutput, ActionRequest, Dispatcher, Reply};
pub use router::create_router;
pub use state::AppState;

use std::net::SocketAddr;

use axum::Router;
use sp_core::SpConfig;
use tokio::net::TcpListener;

/// The service provider server.
#[derive(Debug)]
pub struct Server {
    config: SpConfig,
    state: AppState,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// Metadata and the private key are loaded here; any failure is fatal and
    /// no server is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if metadata or key material cannot be loaded.
    pub fn new(config: SpConfig) -> anyhow::Result<Self> {
        let dispatcher = Dispatcher::from_config(&config)?;
        Ok(Self {
            config,
            state: AppState::new(dispatcher),
        })
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and blocks until it receives a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = create_router(self.state);

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &SpConfig {
        &self.config
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        self.state.dispatcher()
    }

    /// Creates a test router without starting the server.
    pub fn test_router(&self) -> Router {
        create_router(self.state.clone())
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
