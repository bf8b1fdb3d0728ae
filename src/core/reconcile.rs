//! Reconciliation of warehouse counts against packed quantities.
//!
//! Two validations exist and are kept apart on purpose:
//!
//! - [`validate_by_batch_id`] compares every line, reports the complete list of
//!   differences and never touches the ledger. Differences are not logged.
//! - [`validate_by_batch_code`] stops at the first difference, logs the rejected
//!   count and answers with a fixed recount instruction. When everything matches it
//!   forwards each line to the ledger, in order and one at a time, before deleting
//!   the batch.
//!
//! Both run inside a single transaction and roll it back on every failure, so a
//! rejected count leaves the batch exactly as it was. Quantities are compared with
//! exact numeric equality after coercion; a missing or non-numeric count never
//! matches.

use crate::{
    core::{
        batch::{delete_batch, get_batch_by_code, get_batch_by_id, get_batch_lines},
        input::{CodeCount, CountEntry, coerce_quantity, coerce_text},
        mismatch,
    },
    entities::batch_line,
    errors::{Error, Result},
    ledger::{Ledger, LedgerEntry},
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, hash::Hash};
use tracing::{error, info, warn};

/// Message returned to the operator when a by-code count is rejected.
pub const RECOUNT_MESSAGE: &str =
    "ERROR: Las cantidades no coinciden con el registro de Empaquetado. CUENTE DE NUEVO";

/// A line whose counted quantity differs from the packed one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Product code of the line
    pub codigo: String,
    /// Quantity registered by the packing step
    pub esperado: f64,
    /// Quantity counted in the warehouse (0 when missing or not a number)
    pub recibido: f64,
}

/// Summary of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBatch {
    /// Id of the deleted batch
    pub batch_id: i64,
    /// Code of the deleted batch
    pub codigo_lote: String,
    /// Number of lines that matched
    pub lines: usize,
    /// Number of lines recorded in the ledger
    pub forwarded: usize,
}

/// Counted quantity for one key. `None` means a value was sent but is not a number.
type Counted = Option<f64>;

fn insert_count<K>(map_key: Option<K>, cantidad: Option<&Value>, counts: &mut HashMap<K, Counted>)
where
    K: Eq + Hash,
{
    // Entries without a key or without a quantity field are ignored. Later entries
    // win, and an explicit null replaces an earlier count with "not a number".
    if let (Some(key), Some(cantidad)) = (map_key, cantidad) {
        counts.insert(key, coerce_quantity(cantidad));
    }
}

#[allow(clippy::float_cmp)] // counts must match exactly
fn matches_expected(line: &batch_line::Model, counted: Counted) -> bool {
    counted.is_some_and(|received| received == line.cantidad)
}

/// Compares every line against the counts keyed by product code.
#[must_use]
pub fn find_mismatches(lines: &[batch_line::Model], counts: &[CodeCount]) -> Vec<Mismatch> {
    let mut by_code = HashMap::new();
    for count in counts {
        insert_count(coerce_text(&count.codigo), count.cantidad.as_ref(), &mut by_code);
    }

    lines
        .iter()
        .filter_map(|line| {
            let counted = by_code.get(&line.codigo).copied().flatten();
            (!matches_expected(line, counted)).then(|| Mismatch {
                codigo: line.codigo.clone(),
                esperado: line.cantidad,
                recibido: counted.unwrap_or(0.0),
            })
        })
        .collect()
}

/// Counts for the by-code validation, addressable by line id or product code.
#[derive(Debug, Default)]
struct EntryCounts {
    by_line_id: HashMap<i64, Counted>,
    by_code: HashMap<String, Counted>,
}

impl EntryCounts {
    fn from_entries(entries: &[CountEntry]) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            let cantidad = entry.cantidad.as_ref();
            insert_count(entry.line_id(), cantidad, &mut counts.by_line_id);
            insert_count(coerce_text(&entry.codigo), cantidad, &mut counts.by_code);
        }
        counts
    }

    fn lookup(&self, line: &batch_line::Model) -> Counted {
        self.by_line_id
            .get(&line.id)
            .or_else(|| self.by_code.get(&line.codigo))
            .copied()
            .flatten()
    }
}

/// Index of the first line whose count does not match, if any.
fn first_mismatch(lines: &[batch_line::Model], counts: &EntryCounts) -> Option<usize> {
    lines
        .iter()
        .position(|line| !matches_expected(line, counts.lookup(line)))
}

/// Validates a count against the batch with id `batch_id`, reporting every
/// difference. On a full match the batch is deleted.
///
/// # Errors
/// Returns an error if:
/// - The batch does not exist or has no lines (`BatchNotFound`)
/// - Any line differs (`QuantityMismatch` with all differing lines)
/// - Any database operation fails
pub async fn validate_by_batch_id(
    db: &DatabaseConnection,
    batch_id: i64,
    counts: &[CodeCount],
) -> Result<ValidatedBatch> {
    let txn = db.begin().await?;

    let batch = match get_batch_by_id(&txn, batch_id).await? {
        Some(batch) => batch,
        None => {
            txn.rollback().await?;
            return Err(Error::BatchNotFound {
                reference: batch_id.to_string(),
            });
        }
    };

    let lines = get_batch_lines(&txn, batch.id).await?;
    if lines.is_empty() {
        txn.rollback().await?;
        return Err(Error::BatchNotFound {
            reference: batch_id.to_string(),
        });
    }

    let mismatches = find_mismatches(&lines, counts);
    if !mismatches.is_empty() {
        txn.rollback().await?;
        warn!(
            "Count for batch {} differs on {} of {} line(s)",
            batch.codigo_lote,
            mismatches.len(),
            lines.len()
        );
        return Err(Error::QuantityMismatch { mismatches });
    }

    delete_batch(&txn, batch.id).await?;
    txn.commit().await?;

    info!("Batch {} validated by id ({} lines)", batch.codigo_lote, lines.len());
    Ok(ValidatedBatch {
        batch_id: batch.id,
        codigo_lote: batch.codigo_lote,
        lines: lines.len(),
        forwarded: 0,
    })
}

/// Validates a count against the batch with code `codigo_lote`, records it in the
/// ledger and deletes the batch.
///
/// The first differing line rejects the count: the attempt is logged as a mismatch
/// and `RecountRequired` is returned. A ledger failure on any line aborts the
/// validation and leaves the batch in place so the count can be submitted again.
///
/// # Errors
/// Returns an error if:
/// - The batch does not exist or has no lines (`BatchNotFound`)
/// - Any line differs (`RecountRequired`)
/// - The ledger rejects a line (`Ledger`)
/// - Any database operation fails
pub async fn validate_by_batch_code(
    db: &DatabaseConnection,
    ledger: &dyn Ledger,
    codigo_lote: &str,
    entries: &[CountEntry],
) -> Result<ValidatedBatch> {
    let codigo_lote = codigo_lote.trim();
    let txn = db.begin().await?;

    let batch = match get_batch_by_code(&txn, codigo_lote).await? {
        Some(batch) => batch,
        None => {
            txn.rollback().await?;
            return Err(Error::BatchNotFound {
                reference: codigo_lote.to_string(),
            });
        }
    };

    let lines = get_batch_lines(&txn, batch.id).await?;
    if lines.is_empty() {
        txn.rollback().await?;
        return Err(Error::BatchNotFound {
            reference: codigo_lote.to_string(),
        });
    }

    let counts = EntryCounts::from_entries(entries);
    if let Some(index) = first_mismatch(&lines, &counts) {
        // Release the transaction before writing the audit entry
        txn.rollback().await?;
        warn!(
            "Count for batch {} rejected at line {} ({})",
            codigo_lote,
            index + 1,
            lines[index].codigo
        );
        mismatch::record(db, Some(codigo_lote)).await;
        return Err(Error::RecountRequired {
            code: codigo_lote.to_string(),
        });
    }

    let fecha_entrada = Utc::now();
    let ledger_entries: Vec<LedgerEntry> = lines
        .iter()
        .map(|line| LedgerEntry::for_line(&batch, line, line.cantidad, fecha_entrada))
        .collect();

    for (index, entry) in ledger_entries.iter().enumerate() {
        if let Err(e) = ledger.forward(entry).await {
            // Keep the ledger error; a failed rollback is only logged
            if let Err(rollback_err) = txn.rollback().await {
                error!(
                    "Failed to roll back batch {} after a ledger error: {}",
                    codigo_lote, rollback_err
                );
            }
            warn!(
                "Ledger failed on line {} of {} for batch {}: {}",
                index + 1,
                ledger_entries.len(),
                codigo_lote,
                e
            );
            return Err(e);
        }
    }

    delete_batch(&txn, batch.id).await?;
    txn.commit().await?;

    info!(
        "Batch {} validated by code and recorded in the ledger ({} lines)",
        batch.codigo_lote,
        lines.len()
    );
    Ok(ValidatedBatch {
        batch_id: batch.id,
        codigo_lote: batch.codigo_lote,
        lines: lines.len(),
        forwarded: ledger_entries.len(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::batch::list_batches;
    use crate::entities::CountMismatch;
    use crate::test_utils::*;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use serde_json::json;

    fn line(id: i64, codigo: &str, cantidad: f64) -> batch_line::Model {
        batch_line::Model {
            id,
            lote_id: 1,
            codigo: codigo.to_string(),
            descripcion: None,
            lote_producto: None,
            cantidad,
            paquetes: None,
            cestas_calculadas: None,
        }
    }

    #[test]
    fn test_find_mismatches_reports_missing_and_different() {
        let lines = vec![line(1, "A", 10.0), line(2, "B", 5.0), line(3, "C", 1.0)];
        let counts = vec![
            CodeCount::new("A", 9.0),
            CodeCount::new("B", 5.0),
            CodeCount {
                codigo: json!("X"),
                cantidad: Some(json!(1)),
            },
        ];

        let mismatches = find_mismatches(&lines, &counts);
        assert_eq!(
            mismatches,
            vec![
                Mismatch {
                    codigo: "A".to_string(),
                    esperado: 10.0,
                    recibido: 9.0
                },
                Mismatch {
                    codigo: "C".to_string(),
                    esperado: 1.0,
                    recibido: 0.0
                },
            ]
        );
    }

    #[test]
    fn test_find_mismatches_coerces_and_last_count_wins() {
        let lines = vec![line(1, "A", 10.0), line(2, "B", 5.0)];
        let counts = vec![
            CodeCount::new("A", 3.0),
            CodeCount {
                codigo: json!("A"),
                cantidad: Some(json!("10")),
            },
            CodeCount {
                codigo: json!("B"),
                cantidad: Some(json!("cinco")),
            },
        ];

        let mismatches = find_mismatches(&lines, &counts);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].codigo, "B");
        assert_eq!(mismatches[0].recibido, 0.0);
    }

    #[test]
    fn test_find_mismatches_null_count_overrides_earlier_one() {
        let lines = vec![line(1, "A", 10.0), line(2, "B", 5.0)];
        let counts = vec![
            CodeCount::new("A", 10.0),
            CodeCount {
                codigo: json!("A"),
                cantidad: Some(json!(null)),
            },
            CodeCount::new("B", 5.0),
            // No quantity field at all: the earlier count for B stands
            CodeCount {
                codigo: json!("B"),
                cantidad: None,
            },
        ];

        let mismatches = find_mismatches(&lines, &counts);
        assert_eq!(
            mismatches,
            vec![Mismatch {
                codigo: "A".to_string(),
                esperado: 10.0,
                recibido: 0.0
            }]
        );
    }

    #[test]
    fn test_entry_counts_accept_string_line_ids() {
        let lines = vec![line(7, "A", 3.0)];
        let entries = vec![CountEntry {
            id: json!("7"),
            codigo: json!(null),
            cantidad: Some(json!(3)),
        }];
        let counts = EntryCounts::from_entries(&entries);
        assert_eq!(first_mismatch(&lines, &counts), None);
    }

    #[test]
    fn test_entry_counts_prefer_line_id() {
        let lines = vec![line(1, "A", 10.0), line(2, "A", 4.0)];
        let entries = vec![CountEntry::by_line_id(1, 10.0), CountEntry::by_line_id(2, 4.0)];
        let counts = EntryCounts::from_entries(&entries);
        assert_eq!(first_mismatch(&lines, &counts), None);

        // By code, duplicated codes collapse to the last count
        let entries = vec![CountEntry::by_code("A", 10.0), CountEntry::by_code("A", 4.0)];
        let counts = EntryCounts::from_entries(&entries);
        assert_eq!(first_mismatch(&lines, &counts), Some(0));
    }

    #[tokio::test]
    async fn test_validate_by_id_full_match_deletes_batch() -> Result<()> {
        let db = setup_test_db().await?;
        let batch = create_test_batch(&db, &[("A", 10.0), ("B", 5.0)]).await?;

        let result = validate_by_batch_id(
            &db,
            batch.id,
            &[CodeCount::new("A", 10.0), CodeCount::new("B", 5.0)],
        )
        .await?;

        assert_eq!(result.codigo_lote, batch.codigo_lote);
        assert_eq!(result.lines, 2);
        assert_eq!(result.forwarded, 0);
        assert!(list_batches(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_by_id_mismatch_keeps_batch() -> Result<()> {
        let db = setup_test_db().await?;
        let batch = create_test_batch(&db, &[("A", 10.0), ("B", 5.0)]).await?;

        let err = validate_by_batch_id(
            &db,
            batch.id,
            &[CodeCount::new("A", 9.0), CodeCount::new("B", 5.0)],
        )
        .await
        .unwrap_err();

        let Error::QuantityMismatch { mismatches } = err else {
            panic!("expected a quantity mismatch, got {err:?}");
        };
        assert_eq!(
            mismatches,
            vec![Mismatch {
                codigo: "A".to_string(),
                esperado: 10.0,
                recibido: 9.0
            }]
        );

        let listed = list_batches(&db).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].lines.len(), 2);
        // By-id rejections are not written to the mismatch log
        assert_eq!(CountMismatch::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_by_id_unknown_batch() -> Result<()> {
        let db = setup_test_db().await?;
        let err = validate_by_batch_id(&db, 42, &[CodeCount::new("A", 1.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BatchNotFound { reference } if reference == "42"));
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_by_code_forwards_lines_in_order() -> Result<()> {
        let db = setup_test_db().await?;
        let batch = create_test_batch(&db, &[("A", 10.0), ("B", 5.0), ("C", 2.0)]).await?;
        let ledger = RecordingLedger::default();

        let result = validate_by_batch_code(
            &db,
            &ledger,
            &format!(" {} ", batch.codigo_lote),
            &[
                CountEntry::by_code("C", 2.0),
                CountEntry::by_code("A", 10.0),
                CountEntry::by_code("B", 5.0),
            ],
        )
        .await?;

        assert_eq!(result.forwarded, 3);
        let recorded = ledger.recorded();
        let products: Vec<&str> = recorded.iter().map(|e| e.producto.as_str()).collect();
        assert_eq!(products, vec!["A", "B", "C"]);
        assert!(recorded.iter().all(|e| e.numero_lote == batch.codigo_lote));
        assert!(recorded.iter().all(|e| e.fecha_entrada == recorded[0].fecha_entrada));
        assert_eq!(recorded[0].cantidad_almacen, 10.0);

        assert!(list_batches(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_by_code_mismatch_logs_and_keeps_batch() -> Result<()> {
        let db = setup_test_db().await?;
        let batch = create_test_batch(&db, &[("A", 10.0), ("B", 5.0), ("C", 2.0)]).await?;
        let ledger = RecordingLedger::default();

        // Whichever line is wrong, the answer is the same
        let attempts = vec![
            vec![CountEntry::by_code("A", 9.0), CountEntry::by_code("B", 5.0), CountEntry::by_code("C", 2.0)],
            vec![CountEntry::by_code("A", 10.0), CountEntry::by_code("B", 5.0), CountEntry::by_code("C", 3.0)],
            vec![CountEntry::by_code("A", 10.0), CountEntry::by_code("B", 5.0)],
        ];

        for entries in &attempts {
            let err = validate_by_batch_code(&db, &ledger, &batch.codigo_lote, entries)
                .await
                .unwrap_err();
            assert!(matches!(&err, Error::RecountRequired { code } if *code == batch.codigo_lote));
        }

        assert!(ledger.recorded().is_empty());
        assert_eq!(list_batches(&db).await?.len(), 1);

        let logged = crate::core::mismatch::report_today(&db).await?;
        assert_eq!(logged.len(), attempts.len());
        assert!(logged.iter().all(|m| m.codigo_lote.as_deref() == Some(batch.codigo_lote.as_str())));
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_by_code_non_numeric_count_is_mismatch() -> Result<()> {
        let db = setup_test_db().await?;
        let batch = create_test_batch(&db, &[("A", 10.0)]).await?;
        let ledger = RecordingLedger::default();

        let entries = vec![CountEntry {
            id: json!(null),
            codigo: json!("A"),
            cantidad: Some(json!("diez")),
        }];
        let err = validate_by_batch_code(&db, &ledger, &batch.codigo_lote, &entries)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RecountRequired { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_by_code_matches_by_line_id() -> Result<()> {
        let db = setup_test_db().await?;
        let batch = create_test_batch(&db, &[("A", 10.0), ("A", 4.0)]).await?;
        let lines = crate::core::batch::get_batch_lines(&db, batch.id).await?;
        let ledger = RecordingLedger::default();

        let entries = vec![
            CountEntry::by_line_id(lines[1].id, 4.0),
            CountEntry::by_line_id(lines[0].id, 10.0),
        ];
        let result = validate_by_batch_code(&db, &ledger, &batch.codigo_lote, &entries).await?;
        assert_eq!(result.forwarded, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_failure_keeps_batch_for_retry() -> Result<()> {
        let db = setup_test_db().await?;
        let batch = create_test_batch(&db, &[("A", 10.0), ("B", 5.0), ("C", 2.0)]).await?;
        let entries = vec![
            CountEntry::by_code("A", 10.0),
            CountEntry::by_code("B", 5.0),
            CountEntry::by_code("C", 2.0),
        ];

        let failing = RecordingLedger::failing_at(1, "Hoja bloqueada");
        let err = validate_by_batch_code(&db, &failing, &batch.codigo_lote, &entries)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ledger { message } if message == "Hoja bloqueada"));

        // Forwarding stopped at the failing line and the batch is still open
        assert_eq!(failing.recorded().len(), 1);
        let listed = list_batches(&db).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].lines.len(), 3);
        // A ledger failure is not a count mismatch
        assert_eq!(CountMismatch::find().count(&db).await?, 0);

        // Retrying against a healthy ledger succeeds
        let ledger = RecordingLedger::default();
        let result = validate_by_batch_code(&db, &ledger, &batch.codigo_lote, &entries).await?;
        assert_eq!(result.forwarded, 3);
        assert!(list_batches(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_validate_by_code_unknown_batch() -> Result<()> {
        let db = setup_test_db().await?;
        let ledger = RecordingLedger::default();
        let err = validate_by_batch_code(&db, &ledger, "BC00000099", &[CountEntry::by_code("A", 1.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BatchNotFound { .. }));
        assert_eq!(CountMismatch::find().count(&db).await?, 0);
        Ok(())
    }
}
