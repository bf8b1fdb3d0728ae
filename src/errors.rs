use crate::core::reconcile::Mismatch;
use sea_orm::DbErr;
use thiserror::Error;

/// Every failure the service can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings could not be loaded or are invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// Any database failure
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Filesystem or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or incomplete request input
    #[error("Validation error: {message}")]
    Validation {
        /// Message shown to the operator
        message: String,
    },

    /// No open batch has this id or code
    #[error("Batch not found: {reference}")]
    BatchNotFound {
        /// The id or code that was looked up
        reference: String,
    },

    /// An open batch already uses this code
    #[error("Batch code already exists: {code}")]
    DuplicateBatchCode {
        /// The clashing code
        code: String,
    },

    /// By-id validation: every line whose count differs from the packed quantity
    #[error("Counted quantities differ on {} line(s)", mismatches.len())]
    QuantityMismatch {
        /// Differing lines, in line order
        mismatches: Vec<Mismatch>,
    },

    /// By-code validation: the first differing line rejects the whole count
    #[error("Count rejected for batch {code}, recount required")]
    RecountRequired {
        /// Code of the rejected batch
        code: String,
    },

    /// The admin key does not match
    #[error("Invalid admin key")]
    Unauthorized,

    /// Admin endpoints were called but no admin key is set
    #[error("Admin key is not configured")]
    AdminKeyNotConfigured,

    /// The external ledger rejected or did not answer a line
    #[error("Ledger error: {message}")]
    Ledger {
        /// Message reported by the ledger
        message: String,
    },
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
