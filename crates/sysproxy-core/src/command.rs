//! External command execution.
//!
//! Every change this helper makes goes through a [`NetworkCommand`] handed to a
//! [`CommandExecutor`]. The production executor is [`NetworkSetup`], which runs
//! macOS's `networksetup`; tests substitute a recording fake.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecutionError;
use crate::request::NetworkService;

/// Default location of the `networksetup` binary.
pub const DEFAULT_NETWORKSETUP: &str = "/usr/sbin/networksetup";

/// One `networksetup` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCommand {
    /// `-listnetworkserviceorder`
    ListServiceOrder,
    /// `-setautoproxystate <service> on|off`
    SetAutoProxyState { service: NetworkService, enabled: bool },
    /// `-setproxyautodiscovery <service> on|off`
    SetProxyAutoDiscovery { service: NetworkService, enabled: bool },
    /// `-setwebproxystate <service> on|off`
    SetWebProxyState { service: NetworkService, enabled: bool },
    /// `-setsecurewebproxystate <service> on|off`
    SetSecureWebProxyState { service: NetworkService, enabled: bool },
    /// `-setsocksfirewallproxystate <service> on|off`
    SetSocksProxyState { service: NetworkService, enabled: bool },
    /// `-setautoproxyurl <service> <url>`
    SetAutoProxyUrl { service: NetworkService, url: String },
    /// `-setwebproxy <service> <host> <port>`
    SetWebProxy {
        service: NetworkService,
        host: String,
        port: String,
    },
    /// `-setsecurewebproxy <service> <host> <port>`
    SetSecureWebProxy {
        service: NetworkService,
        host: String,
        port: String,
    },
    /// `-setsocksfirewallproxy <service> <host> <port>`
    SetSocksProxy {
        service: NetworkService,
        host: String,
        port: String,
    },
    /// `-setproxybypassdomains <service> <domain>...`
    SetBypassDomains {
        service: NetworkService,
        domains: Vec<String>,
    },
}

fn on_off(enabled: bool) -> String {
    if enabled { "on" } else { "off" }.to_string()
}

impl NetworkCommand {
    /// The service this command targets, if any.
    pub fn service(&self) -> Option<&NetworkService> {
        match self {
            NetworkCommand::ListServiceOrder => None,
            NetworkCommand::SetAutoProxyState { service, .. }
            | NetworkCommand::SetProxyAutoDiscovery { service, .. }
            | NetworkCommand::SetWebProxyState { service, .. }
            | NetworkCommand::SetSecureWebProxyState { service, .. }
            | NetworkCommand::SetSocksProxyState { service, .. }
            | NetworkCommand::SetAutoProxyUrl { service, .. }
            | NetworkCommand::SetWebProxy { service, .. }
            | NetworkCommand::SetSecureWebProxy { service, .. }
            | NetworkCommand::SetSocksProxy { service, .. }
            | NetworkCommand::SetBypassDomains { service, .. } => Some(service),
        }
    }

    /// The `networksetup` flag for this command.
    pub fn flag(&self) -> &'static str {
        match self {
            NetworkCommand::ListServiceOrder => "-listnetworkserviceorder",
            NetworkCommand::SetAutoProxyState { .. } => "-setautoproxystate",
            NetworkCommand::SetProxyAutoDiscovery { .. } => "-setproxyautodiscovery",
            NetworkCommand::SetWebProxyState { .. } => "-setwebproxystate",
            NetworkCommand::SetSecureWebProxyState { .. } => "-setsecurewebproxystate",
            NetworkCommand::SetSocksProxyState { .. } => "-setsocksfirewallproxystate",
            NetworkCommand::SetAutoProxyUrl { .. } => "-setautoproxyurl",
            NetworkCommand::SetWebProxy { .. } => "-setwebproxy",
            NetworkCommand::SetSecureWebProxy { .. } => "-setsecurewebproxy",
            NetworkCommand::SetSocksProxy { .. } => "-setsocksfirewallproxy",
            NetworkCommand::SetBypassDomains { .. } => "-setproxybypassdomains",
        }
    }

    /// Full argument vector, flag first.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.flag().to_string()];
        match self {
            NetworkCommand::ListServiceOrder => {}
            NetworkCommand::SetAutoProxyState { service, enabled }
            | NetworkCommand::SetProxyAutoDiscovery { service, enabled }
            | NetworkCommand::SetWebProxyState { service, enabled }
            | NetworkCommand::SetSecureWebProxyState { service, enabled }
            | NetworkCommand::SetSocksProxyState { service, enabled } => {
                args.push(service.to_string());
                args.push(on_off(*enabled));
            }
            NetworkCommand::SetAutoProxyUrl { service, url } => {
                args.push(service.to_string());
                args.push(url.clone());
            }
            NetworkCommand::SetWebProxy {
                service,
                host,
                port,
            }
            | NetworkCommand::SetSecureWebProxy {
                service,
                host,
                port,
            }
            | NetworkCommand::SetSocksProxy {
                service,
                host,
                port,
            } => {
                args.push(service.to_string());
                args.push(host.clone());
                args.push(port.clone());
            }
            NetworkCommand::SetBypassDomains { service, domains } => {
                args.push(service.to_string());
                args.extend(domains.iter().cloned());
            }
        }
        args
    }
}

impl fmt::Display for NetworkCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "networksetup {}", self.args().join(" "))
    }
}

/// Runs external configuration commands.
///
/// Implementations block the calling task until the command finishes; there
/// is no timeout.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs `command` and returns its standard output.
    async fn execute(&self, command: &NetworkCommand) -> Result<String, ExecutionError>;
}

/// Executor backed by the `networksetup` binary.
#[derive(Debug, Clone)]
pub struct NetworkSetup {
    program: PathBuf,
}

impl NetworkSetup {
    /// Uses the binary at [`DEFAULT_NETWORKSETUP`].
    pub fn new() -> Self {
        Self::with_program(DEFAULT_NETWORKSETUP)
    }

    /// Uses a specific binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl Default for NetworkSetup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for NetworkSetup {
    async fn execute(&self, command: &NetworkCommand) -> Result<String, ExecutionError> {
        debug!(%command, "Running network command");

        // Arguments go straight to the process, never through a shell.
        let output = Command::new(&self.program)
            .args(command.args())
            .output()
            .await
            .map_err(|source| ExecutionError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExecutionError::Failed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wifi() -> NetworkService {
        NetworkService::new("Wi-Fi")
    }

    #[test]
    fn renders_state_commands() {
        let cmd = NetworkCommand::SetSocksProxyState {
            service: wifi(),
            enabled: false,
        };
        assert_eq!(cmd.args(), ["-setsocksfirewallproxystate", "Wi-Fi", "off"]);

        let cmd = NetworkCommand::SetAutoProxyState {
            service: wifi(),
            enabled: true,
        };
        assert_eq!(cmd.args(), ["-setautoproxystate", "Wi-Fi", "on"]);
    }

    #[test]
    fn renders_host_port_commands() {
        let cmd = NetworkCommand::SetSecureWebProxy {
            service: wifi(),
            host: "127.0.0.1".to_string(),
            port: "7890".to_string(),
        };
        assert_eq!(
            cmd.args(),
            ["-setsecurewebproxy", "Wi-Fi", "127.0.0.1", "7890"]
        );
    }

    #[test]
    fn renders_bypass_domains_as_separate_arguments() {
        let cmd = NetworkCommand::SetBypassDomains {
            service: wifi(),
            domains: vec!["localhost".to_string(), "<local>".to_string()],
        };
        assert_eq!(
            cmd.args(),
            ["-setproxybypassdomains", "Wi-Fi", "localhost", "<local>"]
        );
    }

    #[test]
    fn service_names_with_spaces_stay_one_argument() {
        let cmd = NetworkCommand::SetAutoProxyUrl {
            service: NetworkService::new("USB 10/100/1000 LAN"),
            url: "http://127.0.0.1/pac".to_string(),
        };
        assert_eq!(cmd.args().len(), 3);
        assert_eq!(cmd.args()[1], "USB 10/100/1000 LAN");
        assert_eq!(cmd.service().map(NetworkService::as_str), Some("USB 10/100/1000 LAN"));
    }

    #[test]
    fn display_prefixes_program_name() {
        assert_eq!(
            NetworkCommand::ListServiceOrder.to_string(),
            "networksetup -listnetworkserviceorder"
        );
        assert!(NetworkCommand::ListServiceOrder.service().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn network_setup_reports_spawn_failure() {
        let executor = NetworkSetup::with_program("/nonexistent/networksetup");
        let err = executor
            .execute(&NetworkCommand::ListServiceOrder)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn network_setup_reports_non_zero_exit() {
        // `false` ignores its arguments and exits 1.
        let executor = NetworkSetup::with_program("false");
        let err = executor
            .execute(&NetworkCommand::ListServiceOrder)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Failed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn network_setup_captures_stdout() {
        // `echo` prints its arguments back.
        let executor = NetworkSetup::with_program("echo");
        let out = executor
            .execute(&NetworkCommand::SetWebProxyState {
                service: wifi(),
                enabled: false,
            })
            .await
            .unwrap();
        assert_eq!(out.trim(), "-setwebproxystate Wi-Fi off");
    }
}
