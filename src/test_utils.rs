//! Shared test utilities.
//!
//! This module provides helpers for setting up test databases, creating batches
//! with sensible defaults, and a ledger double that records what it receives.

use crate::{
    core::{batch, input::LineInput},
    entities,
    errors::{Error, Result},
    ledger::{Ledger, LedgerEntry},
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Mutex;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

fn to_inputs(lines: &[(&str, f64)]) -> Vec<LineInput> {
    lines
        .iter()
        .map(|(codigo, cantidad)| LineInput::new(*codigo, *cantidad))
        .collect()
}

/// Creates a batch with a generated code from `(codigo, cantidad)` pairs.
pub async fn create_test_batch(
    db: &DatabaseConnection,
    lines: &[(&str, f64)],
) -> Result<entities::batch::Model> {
    batch::create_batch(db, None, &to_inputs(lines), None).await
}

/// Creates a batch with an explicit code from `(codigo, cantidad)` pairs.
pub async fn create_test_batch_with_code(
    db: &DatabaseConnection,
    code: &str,
    lines: &[(&str, f64)],
) -> Result<entities::batch::Model> {
    batch::create_batch(db, Some(code), &to_inputs(lines), None).await
}

/// Ledger double that keeps every accepted entry and can fail on a given call.
#[derive(Default)]
pub struct RecordingLedger {
    recorded: Mutex<Vec<LedgerEntry>>,
    calls: Mutex<usize>,
    fail_at: Option<(usize, String)>,
}

impl RecordingLedger {
    /// A ledger that rejects the call with index `call` (0-based) with `message`.
    pub fn failing_at(call: usize, message: &str) -> Self {
        Self {
            fail_at: Some((call, message.to_string())),
            ..Self::default()
        }
    }

    /// Entries accepted so far, in call order.
    pub fn recorded(&self) -> Vec<LedgerEntry> {
        self.recorded
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Ledger for RecordingLedger {
    async fn forward(&self, entry: &LedgerEntry) -> Result<()> {
        let call = {
            let mut calls = self.calls.lock().map_err(|e| Error::Ledger {
                message: e.to_string(),
            })?;
            *calls += 1;
            *calls - 1
        };

        if let Some((fail_call, message)) = &self.fail_at {
            if call == *fail_call {
                return Err(Error::Ledger {
                    message: message.clone(),
                });
            }
        }

        self.recorded
            .lock()
            .map_err(|e| Error::Ledger {
                message: e.to_string(),
            })?
            .push(entry.clone());
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}
