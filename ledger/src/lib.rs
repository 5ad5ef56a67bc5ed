//! PoolClear Batch Ledger
//!
//! Authoritative store of batch records with a single in-flight batch
//! cursor, plus the append-only audit journal of validation outcomes.

pub mod audit;
pub mod store;

pub use audit::{AuditEvent, AuditKind, AuditLog, CheckOutcome};
pub use store::BatchLedger;
