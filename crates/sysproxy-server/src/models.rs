//! API request and response models.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use sysproxy_core::{ApplyReport, ApplyStatus, RequestKind};

use crate::error::ApiError;

/// Header telling callers whether a 200 was a full or partial application.
pub const APPLY_STATUS_HEADER: &str = "x-apply-status";

/// Request body for POST /pac.
#[derive(Debug, Deserialize)]
pub struct PacRequest {
    /// PAC script URL.
    #[serde(default)]
    pub url: String,
}

/// Request body for POST /global.
#[derive(Debug, Deserialize)]
pub struct GlobalRequest {
    /// Proxy host.
    #[serde(default)]
    pub host: String,
    /// Proxy port, as text.
    #[serde(default)]
    pub port: String,
    /// Comma- or space-separated bypass list.
    #[serde(default)]
    pub bypass: String,
}

/// Successful (full or partial) application of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResponse {
    pub status: ApplyStatus,
    pub message: String,
}

fn full_message(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Pac => "PAC proxy has been set for all services",
        RequestKind::Global => "Global proxy has been set for all services",
        RequestKind::Off => "Proxy has been turned off for all services",
    }
}

fn partial_prefix(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Pac => "PAC proxy set for",
        RequestKind::Global => "Global proxy set for",
        RequestKind::Off => "Proxy turned off for",
    }
}

impl TryFrom<ApplyReport> for ApplyResponse {
    type Error = ApiError;

    fn try_from(report: ApplyReport) -> Result<Self, Self::Error> {
        let kind = report.kind();
        let status = report.status();

        let message = match status {
            ApplyStatus::Applied => full_message(kind).to_string(),
            ApplyStatus::PartiallyApplied => format!(
                "{} {}/{} services. Some errors occurred: {}",
                partial_prefix(kind),
                report.success_count(),
                report.total(),
                report.error_details().join("; ")
            ),
            ApplyStatus::Failed => {
                return Err(ApiError::ApplyFailed {
                    kind,
                    details: report.error_details().join("; "),
                })
            }
        };

        Ok(Self { status, message })
    }
}

impl IntoResponse for ApplyResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(APPLY_STATUS_HEADER, self.status.as_str())],
            self.message,
        )
            .into_response()
    }
}
