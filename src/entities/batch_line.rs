//! Batch line entity - One product's expected quantity within a batch.
//!
//! Lines are written once when the batch is created and only disappear together
//! with their batch. The row id doubles as the insertion order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product line database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lote_productos")]
pub struct Model {
    /// Unique identifier, increasing in insertion order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the batch this line belongs to
    pub lote_id: i64,
    /// Product code (never empty)
    pub codigo: String,
    /// Optional product description
    pub descripcion: Option<String>,
    /// Optional sub-lot label printed on the packages
    pub lote_producto: Option<String>,
    /// Expected quantity, always greater than zero
    pub cantidad: f64,
    /// Package count reported by the packer, if any
    pub paquetes: Option<f64>,
    /// Baskets needed for `cantidad` at the configured basket capacity
    pub cestas_calculadas: Option<i64>,
}

/// Defines relationships between a line and its batch
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one batch
    #[sea_orm(
        belongs_to = "super::batch::Entity",
        from = "Column::LoteId",
        to = "super::batch::Column::Id",
        on_delete = "Cascade"
    )]
    Batch,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
