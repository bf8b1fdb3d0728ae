//! Daily sequence entity - Per-day counter behind generated batch codes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Daily sequence database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "secuencias_lote")]
pub struct Model {
    /// Date key in `ddmmyy` form
    #[sea_orm(primary_key, auto_increment = false)]
    pub fecha_clave: String,
    /// Last sequence number handed out for that day
    pub ultimo: i64,
}

/// `DailySequence` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
