//! `GET /health`

use super::AppState;
use axum::{Json, extract::State};
use serde::Serialize;

/// Liveness answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `true`
    pub ok: bool,
    /// Crate version
    pub version: &'static str,
    /// Whether a ledger endpoint is configured
    pub external_configured: bool,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
        external_configured: state.ledger.is_configured(),
    })
}
