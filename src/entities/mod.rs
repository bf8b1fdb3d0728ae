//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

/// Open batches (`lotes`)
pub mod batch;
/// Product lines of a batch (`lote_productos`)
pub mod batch_line;
/// Rejected by-code counts (`conteo_errores`)
pub mod count_mismatch;
/// Per-day batch code counter (`secuencias_lote`)
pub mod daily_sequence;

// Re-export specific types to avoid conflicts
pub use batch::{Column as BatchColumn, Entity as Batch, Model as BatchModel};
pub use batch_line::{Column as BatchLineColumn, Entity as BatchLine, Model as BatchLineModel};
pub use count_mismatch::{
    Column as CountMismatchColumn, Entity as CountMismatch, Model as CountMismatchModel,
};
pub use daily_sequence::{
    Column as DailySequenceColumn, Entity as DailySequence, Model as DailySequenceModel,
};
