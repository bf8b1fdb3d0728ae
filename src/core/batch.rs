//! Batch store - Creation, listing and deletion of packed batches.
//!
//! This module owns every write to the `lotes` and `lote_productos` tables. Batch
//! creation validates all lines before touching the database and inserts the batch
//! together with its lines in one transaction, so a batch is either stored whole or
//! not at all. Deletion always removes the lines first, which keeps it independent of
//! whether the backend enforces the cascading foreign key.

use crate::{
    core::{
        batch_code,
        input::{LineInput, coerce_quantity, coerce_text},
    },
    entities::{Batch, BatchLine, batch, batch_line},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{info, warn};

/// An open batch together with its product lines in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchWithLines {
    /// The batch row
    pub batch: batch::Model,
    /// Its product lines, ordered by id
    pub lines: Vec<batch_line::Model>,
}

/// A product line that passed validation and is ready to insert.
#[derive(Debug, Clone, PartialEq)]
struct NewLine {
    codigo: String,
    descripcion: Option<String>,
    lote_producto: Option<String>,
    cantidad: f64,
    paquetes: Option<f64>,
    cestas_calculadas: Option<i64>,
}

/// Number of baskets needed to hold `cantidad` units.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn basket_count(cantidad: f64, capacity: u32) -> i64 {
    (cantidad / f64::from(capacity)).ceil() as i64
}

fn prepare_lines(lines: &[LineInput], basket_capacity: Option<u32>) -> Result<Vec<NewLine>> {
    if lines.is_empty() {
        return Err(Error::validation("Productos requeridos"));
    }

    lines
        .iter()
        .map(|line| {
            let codigo = coerce_text(&line.codigo);
            let cantidad = coerce_quantity(&line.cantidad).filter(|c| *c > 0.0);
            let (Some(codigo), Some(cantidad)) = (codigo, cantidad) else {
                return Err(Error::validation("Producto inválido"));
            };

            Ok(NewLine {
                codigo,
                descripcion: coerce_text(&line.descripcion),
                lote_producto: coerce_text(&line.lote),
                cantidad,
                paquetes: coerce_quantity(&line.paquetes),
                cestas_calculadas: basket_capacity.map(|capacity| basket_count(cantidad, capacity)),
            })
        })
        .collect()
}

/// Creates a batch with its product lines and returns the stored batch.
///
/// When `requested_code` is blank a code is generated for today; otherwise the given
/// code is used as long as no open batch already has it.
///
/// # Errors
/// Returns an error if:
/// - `lines` is empty, or any line has a blank code or a quantity that is not a
///   number greater than zero (nothing is written in that case)
/// - `requested_code` is already in use
/// - Any database operation fails
pub async fn create_batch(
    db: &DatabaseConnection,
    requested_code: Option<&str>,
    lines: &[LineInput],
    basket_capacity: Option<u32>,
) -> Result<batch::Model> {
    let new_lines = prepare_lines(lines, basket_capacity)?;

    let txn = db.begin().await?;

    let codigo_lote = match requested_code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            if get_batch_by_code(&txn, code).await?.is_some() {
                txn.rollback().await?;
                warn!("Rejected batch creation: code {} already exists", code);
                return Err(Error::DuplicateBatchCode {
                    code: code.to_string(),
                });
            }
            code.to_string()
        }
        None => next_free_code(&txn).await?,
    };

    let batch = insert_batch_row(&txn, &codigo_lote).await?;

    let line_count = new_lines.len();
    for line in new_lines {
        batch_line::ActiveModel {
            lote_id: Set(batch.id),
            codigo: Set(line.codigo),
            descripcion: Set(line.descripcion),
            lote_producto: Set(line.lote_producto),
            cantidad: Set(line.cantidad),
            paquetes: Set(line.paquetes),
            cestas_calculadas: Set(line.cestas_calculadas),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(
        "Created batch {} (id {}) with {} line(s)",
        batch.codigo_lote, batch.id, line_count
    );
    Ok(batch)
}

/// Draws generated codes until one is not already used by an open batch.
///
/// Explicit codes may follow the generated `BC<ddmmyy><seq>` pattern, so the day's
/// counter can land on a code that is already taken.
async fn next_free_code<C>(conn: &C) -> Result<String>
where
    C: ConnectionTrait,
{
    loop {
        let code = batch_code::generate(conn).await?;
        if get_batch_by_code(conn, &code).await?.is_none() {
            return Ok(code);
        }
        info!("Generated code {} is already in use, drawing the next one", code);
    }
}

/// Inserts the batch row, reporting a unique-constraint violation on the code as a
/// duplicate.
async fn insert_batch_row<C>(conn: &C, codigo_lote: &str) -> Result<batch::Model>
where
    C: ConnectionTrait,
{
    batch::ActiveModel {
        codigo_lote: Set(codigo_lote.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateBatchCode {
            code: codigo_lote.to_string(),
        },
        _ => e.into(),
    })
}

/// Retrieves every open batch with its lines, newest batch first.
pub async fn list_batches(db: &DatabaseConnection) -> Result<Vec<BatchWithLines>> {
    let batches = Batch::find()
        .order_by_desc(batch::Column::CreatedAt)
        .order_by_desc(batch::Column::Id)
        .all(db)
        .await?;

    if batches.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = batches.iter().map(|b| b.id).collect();
    let mut lines_by_batch: HashMap<i64, Vec<batch_line::Model>> = HashMap::new();
    for line in BatchLine::find()
        .filter(batch_line::Column::LoteId.is_in(ids))
        .order_by_asc(batch_line::Column::Id)
        .all(db)
        .await?
    {
        lines_by_batch.entry(line.lote_id).or_default().push(line);
    }

    Ok(batches
        .into_iter()
        .map(|batch| {
            let lines = lines_by_batch.remove(&batch.id).unwrap_or_default();
            BatchWithLines { batch, lines }
        })
        .collect())
}

/// Finds an open batch by id.
pub async fn get_batch_by_id<C>(conn: &C, batch_id: i64) -> Result<Option<batch::Model>>
where
    C: ConnectionTrait,
{
    Batch::find_by_id(batch_id)
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Finds an open batch by its code.
pub async fn get_batch_by_code<C>(conn: &C, code: &str) -> Result<Option<batch::Model>>
where
    C: ConnectionTrait,
{
    Batch::find()
        .filter(batch::Column::CodigoLote.eq(code))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Retrieves the lines of a batch in insertion order; empty if the batch is absent.
pub async fn get_batch_lines<C>(conn: &C, batch_id: i64) -> Result<Vec<batch_line::Model>>
where
    C: ConnectionTrait,
{
    BatchLine::find()
        .filter(batch_line::Column::LoteId.eq(batch_id))
        .order_by_asc(batch_line::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Retrieves the lines of the batch with the given code; empty if there is none.
pub async fn get_batch_lines_by_code<C>(conn: &C, code: &str) -> Result<Vec<batch_line::Model>>
where
    C: ConnectionTrait,
{
    match get_batch_by_code(conn, code).await? {
        Some(batch) => get_batch_lines(conn, batch.id).await,
        None => Ok(Vec::new()),
    }
}

/// Deletes a batch and its lines. Deleting an absent batch is a no-op.
///
/// Returns the number of batches removed (0 or 1).
pub async fn delete_batch<C>(conn: &C, batch_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    BatchLine::delete_many()
        .filter(batch_line::Column::LoteId.eq(batch_id))
        .exec(conn)
        .await?;
    let result = Batch::delete_by_id(batch_id).exec(conn).await?;
    Ok(result.rows_affected)
}

/// Deletes every open batch. Returns the number of batches removed.
pub async fn delete_all_batches(db: &DatabaseConnection) -> Result<u64> {
    let txn = db.begin().await?;
    BatchLine::delete_many().exec(&txn).await?;
    let result = Batch::delete_many().exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted all open batches ({})", result.rows_affected);
    Ok(result.rows_affected)
}

/// Deletes the batches with the given ids. Returns the number of batches removed.
pub async fn delete_batches(db: &DatabaseConnection, ids: &[i64]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let txn = db.begin().await?;
    BatchLine::delete_many()
        .filter(batch_line::Column::LoteId.is_in(ids.iter().copied()))
        .exec(&txn)
        .await?;
    let result = Batch::delete_many()
        .filter(batch::Column::Id.is_in(ids.iter().copied()))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!("Deleted {} of {} selected batch(es)", result.rows_affected, ids.len());
    Ok(result.rows_affected)
}
