//! Request validation.
//!
//! Every string a caller sends ends up as an argument to `networksetup`, so
//! nothing is executed until these checks pass. Validation is pure and
//! synchronous.

use url::Url;

use crate::error::ValidationError;
use crate::request::{BypassList, GlobalProxy};

/// Characters never allowed in a PAC URL.
pub const URL_FORBIDDEN: &[char] = &[
    '&', '|', ';', '`', '$', '(', ')', '{', '}', '[', ']', '<', '>', '\\',
];

/// Characters never allowed in a host or bypass token.
///
/// Angle brackets are permitted here so bypass keywords like `<local>` work.
pub const ARGUMENT_FORBIDDEN: &[char] = &[
    '&', '|', ';', '`', '$', '(', ')', '{', '}', '[', ']', '\\',
];

fn contains_any(value: &str, forbidden: &[char]) -> bool {
    value.contains(forbidden)
}

/// `<local>` style keyword tokens bypass the character check.
fn is_keyword_token(token: &str) -> bool {
    token.starts_with('<') && token.ends_with('>')
}

/// Validates a PAC URL and returns it unchanged.
pub fn validate_pac_url(url: &str) -> Result<String, ValidationError> {
    if contains_any(url, URL_FORBIDDEN) {
        return Err(ValidationError::IllegalUrlCharacters);
    }

    let parsed = Url::parse(url).map_err(|e| ValidationError::MalformedUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(ValidationError::UnsupportedScheme(other.to_string())),
    }
}

/// Decimal digits with an optional leading `+`, of any length.
fn is_non_negative_integer(text: &str) -> bool {
    let digits = text.strip_prefix('+').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Validates global proxy parameters.
///
/// The port is kept as text and forwarded verbatim once it is known to be a
/// non-negative integer.
pub fn validate_global_proxy(
    host: &str,
    port: &str,
    bypass: &str,
) -> Result<GlobalProxy, ValidationError> {
    if host.is_empty() {
        return Err(ValidationError::EmptyHost);
    }
    if contains_any(host, ARGUMENT_FORBIDDEN) {
        return Err(ValidationError::IllegalHostCharacters);
    }

    if !is_non_negative_integer(port) {
        return Err(ValidationError::InvalidPort(port.to_string()));
    }

    let bypass = BypassList::parse(bypass);
    if let Some(token) = bypass
        .iter()
        .find(|token| contains_any(token, ARGUMENT_FORBIDDEN) && !is_keyword_token(token))
    {
        return Err(ValidationError::IllegalBypassCharacters(token.to_string()));
    }

    Ok(GlobalProxy::new(host.to_string(), port.to_string(), bypass))
}
