//! Error types for the PoolClear coordinator.

use crate::{ActorId, Amount, BatchId, BatchNumber, EntryId, Role};
use thiserror::Error;

/// Main error type for PoolClear operations.
///
/// Every failure names the offending precondition; downstream auditors
/// rely on being able to tell an insufficient amount from a role denial
/// from an already-purged batch, so there is no generic catch-all.
#[derive(Error, Debug)]
pub enum PoolClearError {
    /// Net amount below the configured settlement minimum.
    #[error("amount {amount} is below the minimum settlement threshold {minimum}")]
    InsufficientAmount { amount: Amount, minimum: Amount },

    /// Registry submission does not carry exactly the expected number of entries.
    #[error("expected {expected} participants, got {actual}")]
    InvalidParticipantCount { expected: usize, actual: usize },

    /// Registry half does not line up with the funds half of the current batch.
    #[error(
        "registry half (number {submitted_number}, amount {submitted_amount}) does not match \
         funds half (number {stored_number}, amount {stored_amount})"
    )]
    BatchMismatch {
        submitted_number: BatchNumber,
        submitted_amount: Amount,
        stored_number: BatchNumber,
        stored_amount: Amount,
    },

    /// Participant position outside the registry bounds.
    #[error("index {index} is out of range for batch {batch_id} with {len} participants")]
    InvalidIndex {
        batch_id: BatchId,
        index: usize,
        len: usize,
    },

    /// Caller does not hold the required role.
    #[error("caller {actor} does not hold the {role} role")]
    RoleDenied { actor: ActorId, role: Role },

    /// No batch exists under the given id.
    #[error("no batch with id {0}")]
    BatchNotFound(BatchId),

    /// The batch's registry was already purged.
    #[error("batch {0} is already purged")]
    AlreadyPurged(BatchId),

    /// Purge requested before the batch was forwarded downstream.
    #[error("batch {0} has not been forwarded yet")]
    NotYetForwarded(BatchId),

    /// Funds were already recorded for the open batch.
    #[error("funds already recorded for batch {batch_id} under batch number {batch_number}")]
    FundsAlreadyReceived {
        batch_id: BatchId,
        batch_number: BatchNumber,
    },

    /// The batch has no live registry (never completed, or purged).
    #[error("registry for batch {0} is not complete")]
    RegistryNotComplete(BatchId),

    /// Participant is not a member of the batch's registry.
    #[error("participant {entry} is not in batch {batch_id}")]
    EntryNotFound { batch_id: BatchId, entry: EntryId },

    /// Forward triggered on a record that is not complete. The trigger path
    /// guarantees the precondition, so this is an internal invariant breach,
    /// not a normal error.
    #[error("batch {0} is not ready to forward")]
    DrawNotReady(BatchId),

    /// The value pull from the upstream intake failed.
    #[error("value transfer for batch number {batch_number} failed: {reason}")]
    TransferFailed {
        batch_number: BatchNumber,
        reason: String,
    },

    /// The downstream custodian refused the settlement notice.
    #[error("custodian rejected settlement of batch {batch_id}: {reason}")]
    CustodianRejected { batch_id: BatchId, reason: String },

    /// The upstream intake could not tear down its retained batch copy.
    #[error("intake purge for batch number {batch_number} failed: {reason}")]
    IntakePurgeFailed {
        batch_number: BatchNumber,
        reason: String,
    },
}

/// Coarse classification of an error, mirroring who has to act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller-correctable input problem; never retried by the coordinator.
    Validation,
    /// Role check failure; never retried, logged for audit.
    Access,
    /// Caller misuse of the batch lifecycle, or an internal invariant breach.
    State,
    /// A downstream/upstream collaborator failed; the whole triggering
    /// operation failed with it and local state was rolled back.
    Collaborator,
}

impl PoolClearError {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PoolClearError::InsufficientAmount { .. }
            | PoolClearError::InvalidParticipantCount { .. }
            | PoolClearError::BatchMismatch { .. }
            | PoolClearError::InvalidIndex { .. } => ErrorCategory::Validation,
            PoolClearError::RoleDenied { .. } => ErrorCategory::Access,
            PoolClearError::BatchNotFound(_)
            | PoolClearError::AlreadyPurged(_)
            | PoolClearError::NotYetForwarded(_)
            | PoolClearError::FundsAlreadyReceived { .. }
            | PoolClearError::RegistryNotComplete(_)
            | PoolClearError::EntryNotFound { .. }
            | PoolClearError::DrawNotReady(_) => ErrorCategory::State,
            PoolClearError::TransferFailed { .. }
            | PoolClearError::CustodianRejected { .. }
            | PoolClearError::IntakePurgeFailed { .. } => ErrorCategory::Collaborator,
        }
    }

    /// Whether this error indicates a broken internal invariant that should
    /// be raised to an operator rather than handled.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PoolClearError::DrawNotReady(_))
    }

    /// Get error code for audit records and protocol surfaces.
    pub fn error_code(&self) -> &'static str {
        match self {
            PoolClearError::InsufficientAmount { .. } => "INSUFFICIENT_AMOUNT",
            PoolClearError::InvalidParticipantCount { .. } => "INVALID_PARTICIPANT_COUNT",
            PoolClearError::BatchMismatch { .. } => "BATCH_MISMATCH",
            PoolClearError::InvalidIndex { .. } => "INVALID_INDEX",
            PoolClearError::RoleDenied { .. } => "ROLE_DENIED",
            PoolClearError::BatchNotFound(_) => "BATCH_NOT_FOUND",
            PoolClearError::AlreadyPurged(_) => "ALREADY_PURGED",
            PoolClearError::NotYetForwarded(_) => "NOT_YET_FORWARDED",
            PoolClearError::FundsAlreadyReceived { .. } => "FUNDS_ALREADY_RECEIVED",
            PoolClearError::RegistryNotComplete(_) => "REGISTRY_NOT_COMPLETE",
            PoolClearError::EntryNotFound { .. } => "ENTRY_NOT_FOUND",
            PoolClearError::DrawNotReady(_) => "DRAW_NOT_READY",
            PoolClearError::TransferFailed { .. } => "TRANSFER_FAILED",
            PoolClearError::CustodianRejected { .. } => "CUSTODIAN_REJECTED",
            PoolClearError::IntakePurgeFailed { .. } => "INTAKE_PURGE_FAILED",
        }
    }
}

/// Result type alias for PoolClear operations.
pub type Result<T> = std::result::Result<T, PoolClearError>;
