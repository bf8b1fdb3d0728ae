//! Batch intake endpoints: `POST /nuevo-lote` and `GET /lotes`.

use super::AppState;
use crate::{
    core::{
        batch::{self, BatchWithLines},
        input::{LineInput, coerce_text, json_objects},
    },
    errors::{Error, Result},
};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /nuevo-lote`. Fields stay raw JSON so malformed input gets the
/// intake messages rather than a deserializer error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateBatchRequest {
    /// Product lines, expected to be an array of objects
    #[serde(default)]
    pub productos: Value,
    /// Explicit batch code; generated when absent or blank
    #[serde(default)]
    pub codigo_lote: Value,
}

/// Answer to a successful `POST /nuevo-lote`.
#[derive(Debug, Serialize)]
pub struct CreateBatchResponse {
    /// Code of the new batch
    pub codigo_lote: String,
}

/// A product line as shown to the counting UI. Expected quantities are left out
/// so the warehouse count is blind.
#[derive(Debug, Serialize)]
pub struct LineView {
    /// Line id
    pub id: i64,
    /// Product code
    pub codigo: String,
    /// Product description
    pub descripcion: Option<String>,
    /// Sub-lot label
    pub lote_producto: Option<String>,
    /// Package count from the packing step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paquetes: Option<f64>,
    /// Baskets needed for the line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cestas_calculadas: Option<i64>,
}

/// An open batch as listed by `GET /lotes`.
#[derive(Debug, Serialize)]
pub struct BatchView {
    /// Batch id
    pub id: i64,
    /// Batch code
    pub codigo_lote: String,
    /// Creation time (UTC)
    pub created_at: DateTime<Utc>,
    /// Lines in insertion order
    pub productos: Vec<LineView>,
}

impl From<BatchWithLines> for BatchView {
    fn from(value: BatchWithLines) -> Self {
        Self {
            id: value.batch.id,
            codigo_lote: value.batch.codigo_lote,
            created_at: value.batch.created_at,
            productos: value
                .lines
                .into_iter()
                .map(|line| LineView {
                    id: line.id,
                    codigo: line.codigo,
                    descripcion: line.descripcion,
                    lote_producto: line.lote_producto,
                    paquetes: line.paquetes,
                    cestas_calculadas: line.cestas_calculadas,
                })
                .collect(),
        }
    }
}

fn line_inputs(productos: &Value) -> Result<Vec<LineInput>> {
    let Some(items) = json_objects::<LineInput>(productos) else {
        return Err(Error::validation("Productos requeridos"));
    };
    items
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::validation("Producto inválido"))
}

/// POST /nuevo-lote
pub async fn create_batch_handler(
    State(state): State<AppState>,
    request: Option<Json<CreateBatchRequest>>,
) -> Result<Json<CreateBatchResponse>> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    let lines = line_inputs(&request.productos)?;
    let requested_code = coerce_text(&request.codigo_lote);
    let created = batch::create_batch(
        &state.db,
        requested_code.as_deref(),
        &lines,
        state.settings.basket_capacity,
    )
    .await?;

    Ok(Json(CreateBatchResponse {
        codigo_lote: created.codigo_lote,
    }))
}

/// GET /lotes
pub async fn list_batches_handler(State(state): State<AppState>) -> Result<Json<Vec<BatchView>>> {
    let batches = batch::list_batches(&state.db).await?;
    Ok(Json(batches.into_iter().map(BatchView::from).collect()))
}
