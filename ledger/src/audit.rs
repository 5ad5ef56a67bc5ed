//! Append-only audit journal of coordinator activity.
//!
//! Validation outcomes are journaled whether or not the surrounding
//! operation succeeds, so rejected intake attempts remain observable to
//! auditors after the fact.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use poolclear_common::{now, Amount, BatchId, BatchNumber, Timestamp};

/// What a journal event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Validation of an incoming funds transfer.
    FundsCheck,
    /// Validation of an incoming registry submission.
    RegistryCheck,
    /// A completed forward to the downstream custodian.
    SettlementForwarded,
    /// A registry teardown.
    RegistryPurged,
}

/// Outcome of a journaled check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed,
    Rejected,
}

/// A single journal event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event id.
    pub id: Uuid,
    /// Batch the event concerns.
    pub batch_id: BatchId,
    /// Event kind.
    pub kind: AuditKind,
    /// Pass or reject.
    pub outcome: CheckOutcome,
    /// Upstream correlation number carried by the attempt.
    pub batch_number: BatchNumber,
    /// Amount carried by the attempt.
    pub amount: Amount,
    /// Error code for rejected attempts.
    pub detail: Option<String>,
    /// When the event was journaled.
    pub recorded_at: Timestamp,
}

impl AuditEvent {
    /// Create a passed event.
    pub fn passed(
        kind: AuditKind,
        batch_id: BatchId,
        batch_number: BatchNumber,
        amount: Amount,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            kind,
            outcome: CheckOutcome::Passed,
            batch_number,
            amount,
            detail: None,
            recorded_at: now(),
        }
    }

    /// Create a rejected event carrying the error code.
    pub fn rejected(
        kind: AuditKind,
        batch_id: BatchId,
        batch_number: BatchNumber,
        amount: Amount,
        code: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            kind,
            outcome: CheckOutcome::Rejected,
            batch_number,
            amount,
            detail: Some(code.to_string()),
            recorded_at: now(),
        }
    }
}

/// In-memory append-only journal.
pub struct AuditLog {
    events: parking_lot::RwLock<Vec<AuditEvent>>,
}

impl AuditLog {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self {
            events: parking_lot::RwLock::new(Vec::new()),
        }
    }

    /// Append an event.
    pub fn record(&self, event: AuditEvent) {
        self.events.write().push(event);
    }

    /// All events for one batch, in journal order.
    pub fn events_for(&self, batch_id: BatchId) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.batch_id == batch_id)
            .cloned()
            .collect()
    }

    /// Full journal, in order.
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    /// Number of journaled events.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
