//! Batch records and their state transitions.
//!
//! A [`BatchRecord`] is the unit of work the coordinator tracks: one pooled
//! intake batch, carrying the upstream correlation number, the net amount
//! held in custody, and the ordered participant registry. All transition
//! logic lives here so that the ledger and the coordinator components stay
//! free of state-machine details.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PoolClearError, Result};
use crate::identifiers::{BatchId, BatchNumber, EntryId};
use crate::time::{now, Timestamp};
use crate::Amount;

/// Lifecycle phase of a batch, derived from its status flags.
///
/// The flags themselves stay independent for auditability; the phase is a
/// convenience projection for logs and status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    /// Freshly opened, no funds recorded yet.
    Open,
    /// Funds recorded, waiting for the registry half.
    FundsHeld,
    /// Both halves present, forward in flight.
    RegistryComplete,
    /// Forwarded downstream, registry retained for selection.
    Forwarded,
    /// Registry torn down after downstream confirmation.
    Purged,
}

impl std::fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchPhase::Open => "open",
            BatchPhase::FundsHeld => "funds_held",
            BatchPhase::RegistryComplete => "registry_complete",
            BatchPhase::Forwarded => "forwarded",
            BatchPhase::Purged => "purged",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of a batch for status queries.
///
/// Field order matches the coordinator's external query surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDetails {
    /// Upstream correlation number (zero until funds are recorded).
    pub batch_number: BatchNumber,
    /// Number of registry entries; survives purge for audit queries.
    pub entry_count: usize,
    /// Net amount held, then forwarded.
    pub net_amount: Amount,
    /// Funds half recorded.
    pub funds_received: bool,
    /// Net amount handed to the downstream custodian.
    pub funds_forwarded: bool,
    /// Registry half recorded.
    pub registry_complete: bool,
    /// Registry torn down.
    pub purged: bool,
}

/// One batch of pooled intake work.
///
/// Records are created by the ledger when its cursor advances and are never
/// deleted; a purge clears the participant payload but keeps the record
/// queryable by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Ledger-assigned identifier, strictly increasing, never reused.
    pub batch_id: BatchId,
    /// Caller-supplied correlation number from intake.
    pub batch_number: BatchNumber,
    /// Net pooled value (gross minus upstream fees).
    pub net_amount: Amount,
    /// Ordered participant entries, exactly as submitted.
    entries: Vec<EntryId>,
    /// Reverse lookup from entry to its position in `entries`.
    /// A duplicate entry keeps its last submitted position.
    positions: HashMap<EntryId, usize>,
    /// Entry count captured at registry completion; kept across purge.
    entry_count: usize,
    /// Funds half recorded.
    pub funds_received: bool,
    /// Registry half recorded and linked to the funds half.
    pub registry_complete: bool,
    /// Forwarded downstream; set at most once.
    pub funds_forwarded: bool,
    /// Registry payload cleared; set at most once.
    pub purged: bool,
    /// When the ledger opened this record.
    pub opened_at: Timestamp,
    /// When the funds half arrived.
    pub funds_received_at: Option<Timestamp>,
    /// When the forward completed.
    pub forwarded_at: Option<Timestamp>,
    /// When the registry was torn down.
    pub purged_at: Option<Timestamp>,
}

impl BatchRecord {
    /// Open a fresh record under the given ledger id.
    pub fn open(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            batch_number: BatchNumber::new(0),
            net_amount: Amount::ZERO,
            entries: Vec::new(),
            positions: HashMap::new(),
            entry_count: 0,
            funds_received: false,
            registry_complete: false,
            funds_forwarded: false,
            purged: false,
            opened_at: now(),
            funds_received_at: None,
            forwarded_at: None,
            purged_at: None,
        }
    }

    /// Record the funds half of the batch.
    ///
    /// Rejects a second call on the same record; the first recorded transfer
    /// stands until the record is forwarded and the cursor advances.
    pub fn record_funds(&mut self, batch_number: BatchNumber, net_amount: Amount) -> Result<()> {
        if self.funds_received {
            return Err(PoolClearError::FundsAlreadyReceived {
                batch_id: self.batch_id,
                batch_number: self.batch_number,
            });
        }

        self.batch_number = batch_number;
        self.net_amount = net_amount;
        self.funds_received = true;
        self.funds_received_at = Some(now());
        Ok(())
    }

    /// Record the registry half of the batch.
    ///
    /// The submission must carry exactly `expected_size` entries and must
    /// name the same batch number and net amount the funds half recorded.
    /// A record with no funds half cannot match any submission.
    pub fn complete_registry(
        &mut self,
        batch_number: BatchNumber,
        net_amount: Amount,
        entries: Vec<EntryId>,
        expected_size: usize,
    ) -> Result<()> {
        if entries.len() != expected_size {
            return Err(PoolClearError::InvalidParticipantCount {
                expected: expected_size,
                actual: entries.len(),
            });
        }

        if !self.funds_received
            || self.batch_number != batch_number
            || self.net_amount != net_amount
        {
            return Err(PoolClearError::BatchMismatch {
                submitted_number: batch_number,
                submitted_amount: net_amount,
                stored_number: self.batch_number,
                stored_amount: self.net_amount,
            });
        }

        // Duplicates are stored as submitted; the reverse lookup keeps the
        // last occurrence of each entry.
        let mut positions = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            positions.insert(*entry, position);
        }

        self.entry_count = entries.len();
        self.entries = entries;
        self.positions = positions;
        self.registry_complete = true;
        Ok(())
    }

    /// Whether the record is eligible for the one-time forward.
    pub fn is_ready_to_forward(&self) -> bool {
        self.funds_received && self.registry_complete && !self.funds_forwarded
    }

    /// Mark the record as forwarded downstream.
    ///
    /// The forwarding path checks readiness before touching any collaborator,
    /// so a failure here means the internal ordering broke.
    pub fn mark_forwarded(&mut self) -> Result<()> {
        if !self.is_ready_to_forward() {
            return Err(PoolClearError::DrawNotReady(self.batch_id));
        }

        self.funds_forwarded = true;
        self.forwarded_at = Some(now());
        Ok(())
    }

    /// Tear down the registry payload.
    ///
    /// Returns the entry count captured at completion so callers can audit
    /// how many entries were discarded. The count itself stays on the record.
    pub fn purge(&mut self) -> Result<usize> {
        if self.purged {
            return Err(PoolClearError::AlreadyPurged(self.batch_id));
        }
        if !self.funds_forwarded {
            return Err(PoolClearError::NotYetForwarded(self.batch_id));
        }

        let discarded = self.entry_count;
        self.entries.clear();
        self.positions.clear();
        self.purged = true;
        self.purged_at = Some(now());
        Ok(discarded)
    }

    /// The ordered registry, available only while it is complete and intact.
    pub fn entries(&self) -> Result<&[EntryId]> {
        if !self.registry_complete || self.purged {
            return Err(PoolClearError::RegistryNotComplete(self.batch_id));
        }
        Ok(&self.entries)
    }

    /// Entry at a given registry position.
    pub fn entry_at(&self, index: usize) -> Result<EntryId> {
        self.entries
            .get(index)
            .copied()
            .ok_or(PoolClearError::InvalidIndex {
                batch_id: self.batch_id,
                index,
                len: self.entries.len(),
            })
    }

    /// Position of an entry in the registry.
    ///
    /// An entry that is not a member yields an explicit error rather than a
    /// sentinel position, so position zero stays unambiguous.
    pub fn position_of(&self, entry: &EntryId) -> Result<usize> {
        self.positions
            .get(entry)
            .copied()
            .ok_or(PoolClearError::EntryNotFound {
                batch_id: self.batch_id,
                entry: *entry,
            })
    }

    /// Number of entries recorded at registry completion.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Status snapshot for external queries.
    pub fn details(&self) -> BatchDetails {
        BatchDetails {
            batch_number: self.batch_number,
            entry_count: self.entry_count,
            net_amount: self.net_amount,
            funds_received: self.funds_received,
            funds_forwarded: self.funds_forwarded,
            registry_complete: self.registry_complete,
            purged: self.purged,
        }
    }

    /// Derived lifecycle phase.
    pub fn phase(&self) -> BatchPhase {
        if self.purged {
            BatchPhase::Purged
        } else if self.funds_forwarded {
            BatchPhase::Forwarded
        } else if self.registry_complete {
            BatchPhase::RegistryComplete
        } else if self.funds_received {
            BatchPhase::FundsHeld
        } else {
            BatchPhase::Open
        }
    }
}
