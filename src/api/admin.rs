//! Admin endpoints gated by the shared admin key: bulk deletes and the mismatch
//! report.

use super::AppState;
use crate::{
    config::Settings,
    core::{
        batch,
        input::{coerce_id, coerce_text},
        mismatch,
    },
    entities::count_mismatch,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Body of `POST /borrar-lotes`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteAllRequest {
    /// Admin key, a string or a number
    #[serde(default)]
    pub key: Value,
}

/// Body of `POST /borrar-registros`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteSelectedRequest {
    /// Admin key, a string or a number
    #[serde(default)]
    pub key: Value,
    /// Batch ids, integers or numeric strings
    #[serde(default)]
    pub ids: Value,
}

/// Success body of both delete endpoints.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Always `true`
    pub ok: bool,
    /// Confirmation for the operator
    pub message: String,
    /// Number of batches removed
    pub deleted: u64,
}

/// Query string of `GET /errores-conteo`.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Admin key
    pub key: Option<String>,
    /// Day to report, `YYYY-MM-DD`; today when absent
    pub date: Option<String>,
}

/// Mismatch report for one day, newest first.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    /// Always `true`
    pub ok: bool,
    /// Number of items
    pub total: usize,
    /// Rejected counts of the day
    pub items: Vec<count_mismatch::Model>,
}

/// Checks `key` against the configured admin key (exact match after trimming the
/// submitted value).
pub fn require_admin(settings: &Settings, key: Option<&str>) -> Result<()> {
    let Some(expected) = settings.admin_key() else {
        return Err(Error::AdminKeyNotConfigured);
    };

    match key.map(str::trim) {
        Some(key) if key == expected => Ok(()),
        _ => {
            warn!("Rejected admin request with an invalid key");
            Err(Error::Unauthorized)
        }
    }
}

fn deleted(count: u64) -> Json<DeleteResponse> {
    Json(DeleteResponse {
        ok: true,
        message: "Registros borrados.".to_string(),
        deleted: count,
    })
}

/// POST /borrar-lotes
pub async fn delete_all_handler(
    State(state): State<AppState>,
    request: Option<Json<DeleteAllRequest>>,
) -> Result<Json<DeleteResponse>> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    require_admin(&state.settings, coerce_text(&request.key).as_deref())?;
    let count = batch::delete_all_batches(&state.db).await?;
    Ok(deleted(count))
}

/// POST /borrar-registros
pub async fn delete_selected_handler(
    State(state): State<AppState>,
    request: Option<Json<DeleteSelectedRequest>>,
) -> Result<Json<DeleteResponse>> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    require_admin(&state.settings, coerce_text(&request.key).as_deref())?;

    // Entries that are not ids match no batch
    let ids: Vec<i64> = match request.ids.as_array() {
        Some(items) if !items.is_empty() => items.iter().filter_map(coerce_id).collect(),
        _ => return Err(Error::validation("Ids requeridos")),
    };
    let count = batch::delete_batches(&state.db, &ids).await?;
    Ok(deleted(count))
}

/// GET /errores-conteo
pub async fn mismatch_report_handler(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>> {
    require_admin(&state.settings, query.key.as_deref())?;

    let items = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(date) => {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| Error::validation("Fecha inválida"))?;
            mismatch::report(&state.db, date).await?
        }
        None => mismatch::report_today(&state.db).await?,
    };

    Ok(Json(ReportResponse {
        ok: true,
        total: items.len(),
        items,
    }))
}
