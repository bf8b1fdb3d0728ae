//! Core business logic - framework-agnostic batch intake and reconciliation.

/// Batch store: creation, listing and deletion of open batches
pub mod batch;
/// Batch code generation from the date and a per-day counter
pub mod batch_code;
/// Loosely typed request inputs and their coercion rules
pub mod input;
/// Audit log of rejected counts
pub mod mismatch;
/// Matching of warehouse counts against packed quantities
pub mod reconcile;
