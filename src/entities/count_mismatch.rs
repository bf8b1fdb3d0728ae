//! Count mismatch entity - Audit trail of rejected warehouse counts.
//! Rows are append-only and only read back by the admin report.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Count mismatch database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conteo_errores")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Code of the batch whose count was rejected
    pub codigo_lote: Option<String>,
    /// When the rejected count was submitted
    pub created_at: DateTimeUtc,
}

/// `CountMismatch` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
