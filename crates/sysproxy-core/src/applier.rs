//! Proxy configuration across every network service.
//!
//! Each service is first reset (auto proxy, auto discovery, web, secure web
//! and SOCKS all turned off) and then driven to the requested mode. A failing
//! command stops work on that service only; the remaining services are still
//! attempted, and the per-service outcomes are folded into one [`ApplyStatus`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::command::{CommandExecutor, NetworkCommand};
use crate::error::ExecutionError;
use crate::request::{ConfigurationRequest, NetworkService, RequestKind};

/// Commands that turn every proxy mode off for `service`.
fn reset_sequence(service: &NetworkService) -> [NetworkCommand; 5] {
    let svc = || service.clone();
    [
        NetworkCommand::SetAutoProxyState {
            service: svc(),
            enabled: false,
        },
        NetworkCommand::SetProxyAutoDiscovery {
            service: svc(),
            enabled: false,
        },
        NetworkCommand::SetWebProxyState {
            service: svc(),
            enabled: false,
        },
        NetworkCommand::SetSecureWebProxyState {
            service: svc(),
            enabled: false,
        },
        NetworkCommand::SetSocksProxyState {
            service: svc(),
            enabled: false,
        },
    ]
}

/// The full command sequence for one service, in execution order.
pub fn plan(request: &ConfigurationRequest, service: &NetworkService) -> Vec<NetworkCommand> {
    let mut commands = Vec::from(reset_sequence(service));

    match request {
        ConfigurationRequest::Disable => {}
        ConfigurationRequest::PacMode(target) => {
            commands.push(NetworkCommand::SetAutoProxyUrl {
                service: service.clone(),
                url: target.url().to_string(),
            });
            commands.push(NetworkCommand::SetAutoProxyState {
                service: service.clone(),
                enabled: true,
            });
            commands.push(NetworkCommand::SetProxyAutoDiscovery {
                service: service.clone(),
                enabled: true,
            });
        }
        ConfigurationRequest::GlobalMode(proxy) => {
            let host = proxy.host().to_string();
            let port = proxy.port().to_string();
            commands.push(NetworkCommand::SetWebProxy {
                service: service.clone(),
                host: host.clone(),
                port: port.clone(),
            });
            commands.push(NetworkCommand::SetSecureWebProxy {
                service: service.clone(),
                host: host.clone(),
                port: port.clone(),
            });
            commands.push(NetworkCommand::SetSocksProxy {
                service: service.clone(),
                host,
                port,
            });
            if !proxy.bypass().is_empty() {
                commands.push(NetworkCommand::SetBypassDomains {
                    service: service.clone(),
                    domains: proxy.bypass().as_slice().to_vec(),
                });
            }
        }
    }

    commands
}

/// Result of applying a request to one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub service: NetworkService,
    pub succeeded: bool,
    /// Error text of the command that stopped this service.
    pub detail: Option<String>,
}

impl ApplyOutcome {
    fn success(service: NetworkService) -> Self {
        Self {
            service,
            succeeded: true,
            detail: None,
        }
    }

    fn failure(service: NetworkService, error: &ExecutionError) -> Self {
        Self {
            service,
            succeeded: false,
            detail: Some(error.to_string()),
        }
    }
}

/// Aggregate verdict over all services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    /// Every service succeeded.
    Applied,
    /// At least one service succeeded and at least one failed.
    PartiallyApplied,
    /// No service succeeded.
    Failed,
}

impl ApplyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplyStatus::Applied => "applied",
            ApplyStatus::PartiallyApplied => "partial",
            ApplyStatus::Failed => "failed",
        }
    }

    /// Partial application still counts as success to the caller.
    pub fn is_success(self) -> bool {
        !matches!(self, ApplyStatus::Failed)
    }
}

/// Every service's outcome for one request.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    kind: RequestKind,
    outcomes: Vec<ApplyOutcome>,
}

impl ApplyReport {
    pub fn new(kind: RequestKind, outcomes: Vec<ApplyOutcome>) -> Self {
        Self { kind, outcomes }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn outcomes(&self) -> &[ApplyOutcome] {
        &self.outcomes
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn status(&self) -> ApplyStatus {
        match self.success_count() {
            0 => ApplyStatus::Failed,
            n if n == self.total() => ApplyStatus::Applied,
            _ => ApplyStatus::PartiallyApplied,
        }
    }

    /// One line per failed service, e.g.
    /// `Failed to set PAC proxy for Wi-Fi: <error>`.
    pub fn error_details(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| {
                format!(
                    "Failed to {} for {}: {}",
                    self.kind.action(),
                    o.service,
                    o.detail.as_deref().unwrap_or("unknown error")
                )
            })
            .collect()
    }
}

/// Applies configuration requests through a [`CommandExecutor`].
#[derive(Clone)]
pub struct ProxyApplier {
    executor: Arc<dyn CommandExecutor>,
}

impl ProxyApplier {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Applies `request` to each service in turn.
    ///
    /// Always returns one outcome per service, in the same order.
    pub async fn apply(
        &self,
        request: &ConfigurationRequest,
        services: &[NetworkService],
    ) -> ApplyReport {
        let kind = request.kind();
        let mut outcomes = Vec::with_capacity(services.len());

        for service in services {
            info!(%service, %kind, "Applying proxy configuration");
            match self.apply_to_service(request, service).await {
                Ok(()) => {
                    info!(%service, %kind, "Proxy configuration applied");
                    outcomes.push(ApplyOutcome::success(service.clone()));
                }
                Err(e) => {
                    warn!(%service, %kind, error = %e, "Proxy configuration failed");
                    outcomes.push(ApplyOutcome::failure(service.clone(), &e));
                }
            }
        }

        ApplyReport::new(kind, outcomes)
    }

    async fn apply_to_service(
        &self,
        request: &ConfigurationRequest,
        service: &NetworkService,
    ) -> Result<(), ExecutionError> {
        // No rollback: a failure midway leaves earlier commands in effect.
        for command in plan(request, service) {
            self.executor.execute(&command).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingExecutor;

    fn services(names: &[&str]) -> Vec<NetworkService> {
        names.iter().copied().map(NetworkService::new).collect()
    }

    fn flags(commands: &[NetworkCommand]) -> Vec<&'static str> {
        commands.iter().map(NetworkCommand::flag).collect()
    }

    const RESET: [&str; 5] = [
        "-setautoproxystate",
        "-setproxyautodiscovery",
        "-setwebproxystate",
        "-setsecurewebproxystate",
        "-setsocksfirewallproxystate",
    ];

    #[test]
    fn disable_plan_is_the_reset_sequence() {
        let wifi = NetworkService::new("Wi-Fi");
        let commands = plan(&ConfigurationRequest::Disable, &wifi);
        assert_eq!(flags(&commands), RESET);
        assert!(commands
            .iter()
            .all(|c| c.args().last().map(String::as_str) == Some("off")));
    }

    #[test]
    fn pac_plan_sets_url_then_enables() {
        let wifi = NetworkService::new("Wi-Fi");
        let request = ConfigurationRequest::pac("http://127.0.0.1:7890/pac").unwrap();
        let commands = plan(&request, &wifi);

        assert_eq!(&flags(&commands)[..5], RESET);
        assert_eq!(commands[5].args(), ["-setautoproxyurl", "Wi-Fi", "http://127.0.0.1:7890/pac"]);
        assert_eq!(commands[6].args(), ["-setautoproxystate", "Wi-Fi", "on"]);
        assert_eq!(commands[7].args(), ["-setproxyautodiscovery", "Wi-Fi", "on"]);
        assert_eq!(commands.len(), 8);
    }

    #[test]
    fn global_plan_without_bypass_skips_bypass_command() {
        let wifi = NetworkService::new("Wi-Fi");
        let request = ConfigurationRequest::global("127.0.0.1", "7890", " , ").unwrap();
        let commands = plan(&request, &wifi);

        assert_eq!(
            &flags(&commands)[5..],
            ["-setwebproxy", "-setsecurewebproxy", "-setsocksfirewallproxy"]
        );
    }

    #[test]
    fn global_plan_with_bypass() {
        let eth = NetworkService::new("Ethernet");
        let request = ConfigurationRequest::global("10.0.0.1", "8080", "localhost,<local>").unwrap();
        let commands = plan(&request, &eth);

        assert_eq!(commands.len(), 9);
        assert_eq!(commands[5].args(), ["-setwebproxy", "Ethernet", "10.0.0.1", "8080"]);
        assert_eq!(
            commands[8].args(),
            ["-setproxybypassdomains", "Ethernet", "localhost", "<local>"]
        );
    }

    #[tokio::test]
    async fn applies_to_every_service_in_order() {
        let executor = Arc::new(RecordingExecutor::with_services(["Wi-Fi", "Ethernet"]));
        let applier = ProxyApplier::new(executor.clone());
        let request = ConfigurationRequest::global("10.0.0.1", "8080", "localhost,<local>").unwrap();

        let report = applier
            .apply(&request, &services(&["Wi-Fi", "Ethernet"]))
            .await;

        assert_eq!(report.status(), ApplyStatus::Applied);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.total(), 2);
        assert!(report.error_details().is_empty());

        let commands = executor.commands();
        assert_eq!(commands.len(), 18);
        assert!(commands[..9]
            .iter()
            .all(|c| c.service().map(NetworkService::as_str) == Some("Wi-Fi")));
        assert!(commands[9..]
            .iter()
            .all(|c| c.service().map(NetworkService::as_str) == Some("Ethernet")));
    }

    #[tokio::test]
    async fn one_failing_service_is_a_partial_success() {
        let executor = Arc::new(RecordingExecutor::with_services(["Wi-Fi", "Ethernet", "VPN"]));
        executor.fail_service("Ethernet");
        let applier = ProxyApplier::new(executor.clone());

        let report = applier
            .apply(
                &ConfigurationRequest::Disable,
                &services(&["Wi-Fi", "Ethernet", "VPN"]),
            )
            .await;

        assert_eq!(report.status(), ApplyStatus::PartiallyApplied);
        assert!(report.status().is_success());
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.total(), 3);

        let details = report.error_details();
        assert_eq!(details.len(), 1);
        assert!(details[0].starts_with("Failed to turn off proxy for Ethernet: "));
        assert!(details[0].contains("simulated failure"));

        // The failed service stopped at its first command; the next one still ran.
        assert_eq!(executor.commands_for("Ethernet").len(), 1);
        assert_eq!(executor.commands_for("VPN").len(), 5);
    }

    #[tokio::test]
    async fn reset_failure_stops_the_service_before_mode_commands() {
        let executor = Arc::new(RecordingExecutor::with_services(["Wi-Fi"]));
        executor.fail_when(|cmd| matches!(cmd, NetworkCommand::SetSecureWebProxyState { .. }));
        let applier = ProxyApplier::new(executor.clone());
        let request = ConfigurationRequest::pac("https://example.com/proxy.pac").unwrap();

        let report = applier.apply(&request, &services(&["Wi-Fi"])).await;

        assert_eq!(report.status(), ApplyStatus::Failed);
        assert_eq!(flags(&executor.commands()), &RESET[..4]);
    }

    #[tokio::test]
    async fn partial_pac_progress_is_not_rolled_back() {
        let executor = Arc::new(RecordingExecutor::with_services(["Wi-Fi"]));
        executor.fail_when(|cmd| {
            matches!(cmd, NetworkCommand::SetAutoProxyState { enabled: true, .. })
        });
        let applier = ProxyApplier::new(executor.clone());
        let request = ConfigurationRequest::pac("http://127.0.0.1/pac").unwrap();

        let report = applier.apply(&request, &services(&["Wi-Fi"])).await;

        assert_eq!(report.status(), ApplyStatus::Failed);
        let commands = executor.commands();
        assert_eq!(commands.len(), 7);
        assert_eq!(commands[5].flag(), "-setautoproxyurl");
        let detail = report.outcomes()[0].detail.as_deref().unwrap_or_default();
        assert!(detail.contains("-setautoproxystate Wi-Fi on"));
    }

    #[tokio::test]
    async fn all_services_failing_is_a_total_failure() {
        let executor = Arc::new(RecordingExecutor::with_services(["Wi-Fi", "Ethernet"]));
        executor.fail_when(|cmd| matches!(cmd, NetworkCommand::SetWebProxy { .. }));
        let applier = ProxyApplier::new(executor);
        let request = ConfigurationRequest::global("127.0.0.1", "7890", "").unwrap();

        let report = applier
            .apply(&request, &services(&["Wi-Fi", "Ethernet"]))
            .await;

        assert_eq!(report.status(), ApplyStatus::Failed);
        assert!(!report.status().is_success());
        assert_eq!(report.success_count(), 0);
        assert_eq!(report.outcomes().len(), 2);
        assert_eq!(report.error_details().len(), 2);
        assert!(report.error_details()[1].starts_with("Failed to set global proxy for Ethernet: "));
    }

    #[test]
    fn status_strings() {
        assert_eq!(ApplyStatus::Applied.as_str(), "applied");
        assert_eq!(ApplyStatus::PartiallyApplied.as_str(), "partial");
        assert_eq!(ApplyStatus::Failed.as_str(), "failed");
    }
}
