//! Configuration requests and the values they carry.
//!
//! A [`ConfigurationRequest`] can only be built through validation, so anything
//! reaching the applier has already passed the injection checks in
//! [`crate::validation`].

use std::fmt;

use crate::error::ValidationError;
use crate::validation::{validate_global_proxy, validate_pac_url};

/// One network service as reported by `networksetup`, e.g. `Wi-Fi`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkService(String);

impl NetworkService {
    /// Wraps a service name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the service name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hosts and domains excluded from proxying.
///
/// Parsed from a comma-separated source when it contains a comma, otherwise
/// from a space-separated one. Tokens are trimmed and blanks are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BypassList(Vec<String>);

impl BypassList {
    /// Splits a raw bypass string into tokens.
    pub fn parse(source: &str) -> Self {
        let separator = if source.contains(',') { ',' } else { ' ' };
        let tokens = source
            .split(separator)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        Self(tokens)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// A validated PAC script location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacTarget {
    url: String,
}

impl PacTarget {
    pub(crate) fn new(url: String) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A validated global proxy target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalProxy {
    host: String,
    port: String,
    bypass: BypassList,
}

impl GlobalProxy {
    pub(crate) fn new(host: String, port: String, bypass: BypassList) -> Self {
        Self { host, port, bypass }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port exactly as the caller sent it.
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn bypass(&self) -> &BypassList {
        &self.bypass
    }
}

/// Which of the three operations a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Pac,
    Global,
    Off,
}

impl RequestKind {
    /// Verb phrase used in per-service error details, e.g. "set PAC proxy".
    pub fn action(self) -> &'static str {
        match self {
            RequestKind::Pac => "set PAC proxy",
            RequestKind::Global => "set global proxy",
            RequestKind::Off => "turn off proxy",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Pac => "pac",
            RequestKind::Global => "global",
            RequestKind::Off => "off",
        };
        f.write_str(name)
    }
}

/// A proxy change to apply to every network service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationRequest {
    /// Turn every proxy mode off.
    Disable,
    /// Use a proxy auto-configuration script.
    PacMode(PacTarget),
    /// Send web, secure web and SOCKS traffic through one host.
    GlobalMode(GlobalProxy),
}

impl ConfigurationRequest {
    /// Validates a PAC URL and builds a PAC request.
    pub fn pac(url: &str) -> Result<Self, ValidationError> {
        validate_pac_url(url).map(|url| ConfigurationRequest::PacMode(PacTarget::new(url)))
    }

    /// Validates global proxy parameters and builds a global request.
    pub fn global(host: &str, port: &str, bypass: &str) -> Result<Self, ValidationError> {
        validate_global_proxy(host, port, bypass).map(ConfigurationRequest::GlobalMode)
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            ConfigurationRequest::Disable => RequestKind::Off,
            ConfigurationRequest::PacMode(_) => RequestKind::Pac,
            ConfigurationRequest::GlobalMode(_) => RequestKind::Global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_splits_on_commas() {
        let list = BypassList::parse("a.com, b.com");
        assert_eq!(list.as_slice(), ["a.com", "b.com"]);
    }

    #[test]
    fn bypass_splits_on_spaces_without_commas() {
        let list = BypassList::parse("a.com b.com");
        assert_eq!(list.as_slice(), ["a.com", "b.com"]);
    }

    #[test]
    fn bypass_drops_blank_tokens() {
        let list = BypassList::parse(" ,a.com,, ,b.com,");
        assert_eq!(list.as_slice(), ["a.com", "b.com"]);

        let list = BypassList::parse("  a.com    b.com  ");
        assert_eq!(list.as_slice(), ["a.com", "b.com"]);
    }

    #[test]
    fn bypass_prefers_commas_over_spaces() {
        let list = BypassList::parse("a.com b.com,c.com");
        assert_eq!(list.as_slice(), ["a.com b.com", "c.com"]);
    }

    #[test]
    fn bypass_empty_source() {
        assert!(BypassList::parse("").is_empty());
        assert!(BypassList::parse("   ").is_empty());
        assert_eq!(BypassList::parse("<local>").len(), 1);
    }

    #[test]
    fn request_kind_actions() {
        assert_eq!(ConfigurationRequest::Disable.kind(), RequestKind::Off);
        assert_eq!(RequestKind::Pac.action(), "set PAC proxy");
        assert_eq!(RequestKind::Global.action(), "set global proxy");
        assert_eq!(RequestKind::Off.action(), "turn off proxy");
        assert_eq!(RequestKind::Global.to_string(), "global");
    }

    #[test]
    fn constructors_validate() {
        let pac = ConfigurationRequest::pac("http://127.0.0.1:7890/pac").unwrap();
        assert_eq!(pac.kind(), RequestKind::Pac);
        assert!(ConfigurationRequest::pac("file:///etc/passwd").is_err());

        let global = ConfigurationRequest::global("127.0.0.1", "7890", "localhost,<local>").unwrap();
        match global {
            ConfigurationRequest::GlobalMode(proxy) => {
                assert_eq!(proxy.host(), "127.0.0.1");
                assert_eq!(proxy.port(), "7890");
                assert_eq!(proxy.bypass().as_slice(), ["localhost", "<local>"]);
            }
            other => panic!("expected global mode, got {other:?}"),
        }
        assert!(ConfigurationRequest::global("127.0.0.1", "port", "").is_err());
    }
}
