//! Application state for the API server.

use std::path::Path;
use std::sync::Arc;

use sysproxy_core::{CommandExecutor, NetworkSetup, ProxyApplier, ServiceEnumerator};

/// Shared application state.
///
/// Holds no per-request data: services are enumerated fresh for every request.
#[derive(Clone)]
pub struct AppState {
    /// Lists network services.
    pub enumerator: ServiceEnumerator,
    /// Applies configuration to each service.
    pub applier: ProxyApplier,
}

impl AppState {
    /// Creates state around an arbitrary executor.
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            enumerator: ServiceEnumerator::new(executor.clone()),
            applier: ProxyApplier::new(executor),
        }
    }

    /// Creates state that runs the `networksetup` binary at `program`.
    pub fn with_network_setup(program: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(NetworkSetup::with_program(program.as_ref())))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(NetworkSetup::new()))
    }
}
