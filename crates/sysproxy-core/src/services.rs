//! Network service enumeration.

use std::sync::Arc;

use tracing::{debug, info};

use crate::command::{CommandExecutor, NetworkCommand};
use crate::error::EnumerationError;
use crate::request::NetworkService;

/// Parses `networksetup -listnetworkserviceorder` output.
///
/// ```text
/// An asterisk (*) denotes that a network service is disabled.
/// (1) Wi-Fi
/// (Hardware Port: Wi-Fi, Device: en0)
///
/// (2) *Thunderbolt Bridge
/// (Hardware Port: Thunderbolt Bridge, Device: bridge0)
/// ```
///
/// yields `["Wi-Fi", "Thunderbolt Bridge"]`. Disabled services keep their
/// place in the order with the marker stripped.
pub fn parse_service_order(output: &str) -> Vec<NetworkService> {
    output
        .lines()
        .filter(|line| line.starts_with('(') && line.contains(')'))
        .filter(|line| !line.contains("Hardware Port:"))
        .filter_map(|line| line.split_once(") "))
        .map(|(_, rest)| rest.trim())
        .map(|name| name.strip_prefix('*').unwrap_or(name).trim())
        .filter(|name| !name.is_empty())
        .map(NetworkService::new)
        .collect()
}

/// Lists the host's network services, fresh on every call.
#[derive(Clone)]
pub struct ServiceEnumerator {
    executor: Arc<dyn CommandExecutor>,
}

impl ServiceEnumerator {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Returns services in system priority order.
    ///
    /// An empty listing is an error, never "nothing to do".
    pub async fn list(&self) -> Result<Vec<NetworkService>, EnumerationError> {
        let output = self
            .executor
            .execute(&NetworkCommand::ListServiceOrder)
            .await?;

        let services = parse_service_order(&output);
        for service in &services {
            debug!(%service, "Found network service");
        }

        if services.is_empty() {
            return Err(EnumerationError::NoServices);
        }

        info!(count = services.len(), "Enumerated network services");
        Ok(services)
    }
}
