//! API route handlers.
//!
//! Bodies are read as raw bytes and decoded here so that a missing or wrong
//! `Content-Type` does not turn into a different error than a malformed body.

use axum::body::Bytes;
use axum::extract::State;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use sysproxy_core::{ApplyStatus, ConfigurationRequest};

use crate::error::{ApiError, Result};
use crate::models::{ApplyResponse, GlobalRequest, PacRequest};
use crate::state::AppState;

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Failed to parse request body");
        ApiError::Decode(e)
    })
}

/// Enumerates services, applies `request` to each, and renders the verdict.
async fn apply(state: &AppState, request: ConfigurationRequest) -> Result<ApplyResponse> {
    let kind = request.kind();

    let services = state.enumerator.list().await.map_err(|e| {
        warn!(%kind, error = %e, "Failed to get network services");
        ApiError::from(e)
    })?;
    debug!(%kind, ?services, "Available network services");

    let report = state.applier.apply(&request, &services).await;

    match report.status() {
        ApplyStatus::Applied => info!(%kind, total = report.total(), "Applied to all services"),
        ApplyStatus::PartiallyApplied => warn!(
            %kind,
            succeeded = report.success_count(),
            total = report.total(),
            errors = ?report.error_details(),
            "Applied to some services"
        ),
        ApplyStatus::Failed => warn!(
            %kind,
            errors = ?report.error_details(),
            "Failed to apply to any service"
        ),
    }

    ApplyResponse::try_from(report)
}

/// POST /pac - Point every service at a PAC script.
pub async fn set_pac(State(state): State<AppState>, body: Bytes) -> Result<ApplyResponse> {
    let req: PacRequest = decode(&body)?;
    info!(url = %req.url, "Received PAC proxy request");

    let request = ConfigurationRequest::pac(&req.url).map_err(|e| {
        warn!(error = %e, "PAC URL validation failed");
        ApiError::from(e)
    })?;

    apply(&state, request).await
}

/// POST /global - Send every service's traffic through one proxy.
pub async fn set_global(State(state): State<AppState>, body: Bytes) -> Result<ApplyResponse> {
    let req: GlobalRequest = decode(&body)?;
    info!(
        host = %req.host,
        port = %req.port,
        bypass = %req.bypass,
        "Received global proxy request"
    );

    let request = ConfigurationRequest::global(&req.host, &req.port, &req.bypass).map_err(|e| {
        warn!(error = %e, "Global proxy validation failed");
        ApiError::from(e)
    })?;

    apply(&state, request).await
}

/// GET /off - Turn every proxy mode off on every service.
pub async fn turn_off(State(state): State<AppState>) -> Result<ApplyResponse> {
    info!("Received request to turn off proxy");
    apply(&state, ConfigurationRequest::Disable).await
}
