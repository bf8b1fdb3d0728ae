//! Batch entity - A packed lot waiting for its warehouse count.
//!
//! A batch is identified by its `codigo_lote` and owns the product lines that were
//! packed together. Open batches live here until a count validates them; a validated
//! batch is deleted rather than flagged.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Batch database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lotes")]
pub struct Model {
    /// Unique identifier for the batch
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable batch code (e.g., `"BC19102601"`)
    #[sea_orm(unique)]
    pub codigo_lote: String,
    /// When the batch was registered by the packing step
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Batch and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One batch has many product lines
    #[sea_orm(has_many = "super::batch_line::Entity")]
    Lines,
}

impl Related<super::batch_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
