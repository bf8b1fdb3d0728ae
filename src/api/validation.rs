//! Count validation endpoints: `POST /validar-lote` (by batch id, full mismatch
//! report) and `POST /validar-conteo` (by batch code, recorded in the ledger).

use super::AppState;
use crate::{
    core::{
        input::{CodeCount, CountEntry, coerce_id, coerce_text, json_objects},
        reconcile,
    },
    errors::{Error, Result},
};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Body of `POST /validar-lote`.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateByIdRequest {
    /// Batch id, as an integer or a numeric string
    #[serde(rename = "loteId", default)]
    pub lote_id: Value,
    /// Array of `{codigo, cantidad}` objects
    #[serde(default)]
    pub cantidades: Value,
}

/// Body of `POST /validar-conteo`.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateByCodeRequest {
    /// Batch code
    #[serde(default)]
    pub codigo_lote: Value,
    /// Array of `{id?, codigo?, cantidad}` objects
    #[serde(default)]
    pub productos_y_cantidades: Value,
}

/// Success body shared by both validation endpoints.
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    /// Always `true`
    pub ok: bool,
    /// Confirmation for the operator
    pub message: String,
}

fn incomplete() -> Error {
    Error::validation("Datos incompletos")
}

/// Reads a non-empty count list, skipping elements that are not objects.
fn count_list<T: DeserializeOwned>(value: &Value) -> Result<Vec<T>> {
    match json_objects::<T>(value) {
        Some(items) if !items.is_empty() => Ok(items.into_iter().flatten().collect()),
        _ => Err(incomplete()),
    }
}

/// POST /validar-lote
pub async fn validate_by_id_handler(
    State(state): State<AppState>,
    request: Option<Json<ValidateByIdRequest>>,
) -> Result<Json<ValidationResponse>> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    let Some(lote_id) = coerce_id(&request.lote_id) else {
        return Err(incomplete());
    };
    let cantidades: Vec<CodeCount> = count_list(&request.cantidades)?;

    reconcile::validate_by_batch_id(&state.db, lote_id, &cantidades).await?;

    Ok(Json(ValidationResponse {
        ok: true,
        message: "Lote validado. Pendiente de registrar en Sheets.".to_string(),
    }))
}

/// POST /validar-conteo
pub async fn validate_by_code_handler(
    State(state): State<AppState>,
    request: Option<Json<ValidateByCodeRequest>>,
) -> Result<Json<ValidationResponse>> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    let Some(codigo_lote) = coerce_text(&request.codigo_lote) else {
        return Err(incomplete());
    };
    let entries: Vec<CountEntry> = count_list(&request.productos_y_cantidades)?;

    reconcile::validate_by_batch_code(
        &state.db,
        state.ledger.as_ref(),
        &codigo_lote,
        &entries,
    )
    .await?;

    Ok(Json(ValidationResponse {
        ok: true,
        message: "Lote validado y registrado en Sheets.".to_string(),
    }))
}
