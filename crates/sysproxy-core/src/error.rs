//! Error types for validation, command execution and service enumeration.

use thiserror::Error;

/// A configuration payload was rejected before any command ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// PAC URL contains a shell metacharacter.
    #[error("url contains illegal characters")]
    IllegalUrlCharacters,

    /// PAC URL did not parse.
    #[error("invalid url: {0}")]
    MalformedUrl(String),

    /// PAC URL uses something other than http or https.
    #[error("url must use http or https protocol, got {0:?}")]
    UnsupportedScheme(String),

    /// Global proxy host is empty.
    #[error("host must not be empty")]
    EmptyHost,

    /// Global proxy host contains a shell metacharacter.
    #[error("host contains illegal characters")]
    IllegalHostCharacters,

    /// Port is not a non-negative integer.
    #[error("port must be numeric, got {0:?}")]
    InvalidPort(String),

    /// A bypass token contains a shell metacharacter.
    #[error("bypass domain contains illegal characters: {0:?}")]
    IllegalBypassCharacters(String),
}

/// A single external command failed.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("`{command}` exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Network services could not be listed.
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// The listing command failed.
    #[error(transparent)]
    Command(#[from] ExecutionError),

    /// The listing succeeded but contained no services.
    #[error("no network services found")]
    NoServices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_includes_stderr_when_present() {
        let err = ExecutionError::Failed {
            command: "networksetup -setwebproxystate Wi-Fi off".to_string(),
            status: "exit status: 4".to_string(),
            stderr: "** Error: unknown service".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`networksetup -setwebproxystate Wi-Fi off` exited with exit status: 4: ** Error: unknown service"
        );
    }

    #[test]
    fn failed_without_stderr() {
        let err = ExecutionError::Failed {
            command: "networksetup -listnetworkserviceorder".to_string(),
            status: "exit status: 1".to_string(),
            stderr: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "`networksetup -listnetworkserviceorder` exited with exit status: 1"
        );
    }

    #[test]
    fn enumeration_wraps_command_error_transparently() {
        let inner = ExecutionError::Failed {
            command: "networksetup -listnetworkserviceorder".to_string(),
            status: "exit status: 1".to_string(),
            stderr: String::new(),
        };
        let message = inner.to_string();
        let err = EnumerationError::from(inner);
        assert_eq!(err.to_string(), message);
    }
}
