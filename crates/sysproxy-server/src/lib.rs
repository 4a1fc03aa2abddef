//! Sysproxy Server - HTTP API on a Unix domain socket.
//!
//! This crate exposes the proxy helper to unprivileged local callers.
//!
//! ## Endpoints
//!
//! - `POST /pac` - Configure every network service to use a PAC script
//! - `POST /global` - Route every service's web, secure web and SOCKS traffic through one proxy
//! - `GET /off` - Disable every proxy mode on every service
//!
//! Successful requests answer `200` with a plain-text message and an
//! `x-apply-status` header of `applied` or `partial`. Errors answer with
//! `{"error": "...", "code": "..."}`.
//!
//! ## Signals
//!
//! - `SIGUSR1` - Recreate the socket if its file was deleted
//! - `SIGTERM` / `SIGINT` - Drain requests, remove the socket and exit
//!
//! ## Example
//!
//! ```no_run
//! use sysproxy_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new(ServerConfig::default());
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod socket;
pub mod state;

use std::path::PathBuf;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use sysproxy_core::DEFAULT_NETWORKSETUP;

pub use error::{ApiError, ErrorResponse, Result};
pub use models::{ApplyResponse, APPLY_STATUS_HEADER};
pub use socket::{
    RecheckOutcome, SocketConfig, SocketEndpoint, SocketError, SocketManager, DEFAULT_SOCKET_PATH,
};
pub use state::AppState;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket path, permissions and timing.
    pub socket: SocketConfig,
    /// Path to the `networksetup` binary.
    pub networksetup: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket: SocketConfig::default(),
            networksetup: PathBuf::from(DEFAULT_NETWORKSETUP),
        }
    }
}

impl ServerConfig {
    /// Creates a config listening on a specific socket path.
    pub fn with_socket_path(path: impl Into<PathBuf>) -> Self {
        Self {
            socket: SocketConfig::with_path(path),
            ..Self::default()
        }
    }

    /// Sets the `networksetup` binary.
    pub fn with_networksetup(mut self, program: impl Into<PathBuf>) -> Self {
        self.networksetup = program.into();
        self
    }

    /// Sets the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.socket.shutdown_grace = grace;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket lifecycle error.
    #[error(transparent)]
    Socket(#[from] SocketError),

    /// Installing a signal handler failed.
    #[error("failed to install signal handler: {0}")]
    Signal(std::io::Error),
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/pac", post(handlers::set_pac))
        .route("/global", post(handlers::set_global))
        .route("/off", get(handlers::turn_off))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The helper's API server.
pub struct Server {
    config: ServerConfig,
    router: Router,
}

impl Server {
    /// Creates a server that runs the configured `networksetup` binary.
    pub fn new(config: ServerConfig) -> Self {
        let state = AppState::with_network_setup(&config.networksetup);
        Self::with_state(config, state)
    }

    /// Creates a server with custom application state.
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            router: router(state),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serves until `SIGTERM` or `SIGINT`, rebinding on `SIGUSR1`.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        // Installed before binding so a signal sent right after the socket
        // appears is not lost.
        let mut rebind = signal(SignalKind::user_defined1()).map_err(ServerError::Signal)?;
        let mut terminate = signal(SignalKind::terminate()).map_err(ServerError::Signal)?;
        let mut interrupt = signal(SignalKind::interrupt()).map_err(ServerError::Signal)?;

        let manager = SocketManager::new(self.config.socket, self.router);
        let endpoint = manager.start().await?;
        info!(path = %endpoint.path.display(), "Server listening on unix socket");

        loop {
            tokio::select! {
                _ = rebind.recv() => {
                    info!("Received SIGUSR1, checking socket file");
                    match manager.recheck().await {
                        Ok(RecheckOutcome::Present) => {}
                        Ok(RecheckOutcome::Rebound { generation }) => {
                            info!(generation, "Socket recreated");
                        }
                        Err(e) => error!(error = %e, "Failed to recreate socket"),
                    }
                }
                _ = terminate.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = interrupt.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
            }
        }

        manager.shutdown().await;
        info!("Server shutdown complete");
        Ok(())
    }
}
