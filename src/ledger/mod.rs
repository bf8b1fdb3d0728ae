//! External ledger - Where validated batches are recorded once counted.
//!
//! The ledger is a spreadsheet behind an HTTP endpoint. The reconciliation engine
//! only relies on the [`Ledger`] trait: one synchronous call per product line, and
//! any failure stops the validation.

/// Spreadsheet web-app client
pub mod apps_script;

pub use apps_script::AppsScriptLedger;

use crate::{
    entities::{batch, batch_line},
    errors::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One validated product line as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    /// Sub-lot label of the line, or the batch code when the line has none
    pub numero_lote: String,
    /// Product description, or the product code when there is no description
    pub producto: String,
    /// Quantity counted in the warehouse
    pub cantidad_almacen: f64,
    /// Basket count, when one was computed at packing time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cestas_calculadas: Option<i64>,
    /// When the batch entered the warehouse (shared by all its lines)
    pub fecha_entrada: DateTime<Utc>,
}

impl LedgerEntry {
    /// Builds the entry for a counted line of `batch`.
    #[must_use]
    pub fn for_line(
        batch: &batch::Model,
        line: &batch_line::Model,
        cantidad_almacen: f64,
        fecha_entrada: DateTime<Utc>,
    ) -> Self {
        Self {
            numero_lote: line
                .lote_producto
                .clone()
                .unwrap_or_else(|| batch.codigo_lote.clone()),
            producto: line
                .descripcion
                .clone()
                .unwrap_or_else(|| line.codigo.clone()),
            cantidad_almacen,
            cestas_calculadas: line.cestas_calculadas,
            fecha_entrada,
        }
    }
}

/// Destination for validated lines.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Records one line. An `Err` means the line was not recorded.
    async fn forward(&self, entry: &LedgerEntry) -> Result<()>;

    /// Whether the ledger has somewhere to send lines to.
    fn is_configured(&self) -> bool;
}
