//! Sysproxy helper - privileged system proxy configuration daemon.
//!
//! Runs as root and lets unprivileged local software switch the macOS system
//! proxy through an HTTP API on a Unix socket.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sysproxy_app::logging::{self, HomeHints};
use sysproxy_core::DEFAULT_NETWORKSETUP;
use sysproxy_server::{Server, ServerConfig, DEFAULT_SOCKET_PATH};

/// Privileged helper that applies system proxy settings on request.
#[derive(Parser, Debug)]
#[command(name = "sysproxy-helper", version, about)]
struct Args {
    /// Path of the Unix socket to serve on
    #[arg(long, default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    /// Path to the networksetup binary
    #[arg(long, default_value = DEFAULT_NETWORKSETUP)]
    networksetup: PathBuf,

    /// Seconds in-flight requests get to finish at shutdown
    #[arg(long, default_value_t = 5)]
    shutdown_grace_secs: u64,

    /// Write logs here instead of the user's Application Support directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig::with_socket_path(&self.socket)
            .with_networksetup(&self.networksetup)
            .with_shutdown_grace(Duration::from_secs(self.shutdown_grace_secs))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let location = logging::resolve_log_dir(args.log_dir.as_deref(), &HomeHints::from_env());
    // Keep the guard alive for the whole run so buffered lines reach the file.
    let _log_guard = logging::init_logging(args.log_level(), &location);

    tracing::info!("Starting sysproxy helper");
    tracing::debug!(?args, "Parsed arguments");

    Server::new(args.server_config())
        .run()
        .await
        .context("helper server failed")?;

    tracing::info!("Sysproxy helper exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["sysproxy-helper"]).unwrap();
        assert_eq!(args.socket, PathBuf::from("/tmp/sysproxy-helper.sock"));
        assert_eq!(args.networksetup, PathBuf::from("/usr/sbin/networksetup"));
        assert_eq!(args.log_level(), "info");
        assert!(args.log_dir.is_none());

        let config = args.server_config();
        assert_eq!(config.socket.shutdown_grace, Duration::from_secs(5));
    }

    #[test]
    fn overrides() {
        let args = Args::try_parse_from([
            "sysproxy-helper",
            "--socket",
            "/tmp/other.sock",
            "--shutdown-grace-secs",
            "2",
            "--log-level",
            "warn",
            "--debug",
        ])
        .unwrap();

        assert_eq!(args.log_level(), "debug");
        let config = args.server_config();
        assert_eq!(config.socket.path, PathBuf::from("/tmp/other.sock"));
        assert_eq!(config.socket.shutdown_grace, Duration::from_secs(2));
    }
}
