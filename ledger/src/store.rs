//! Core batch ledger implementation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

use poolclear_common::{BatchId, BatchRecord, PoolClearError, Result};

/// The authoritative store of batch records.
///
/// Records live in an arena keyed by [`BatchId`] so unrelated batches stay
/// independent; each record carries its own lock, and a single cursor marks
/// the one batch currently accepting intake. Records are never removed, so
/// historical batches stay queryable after the cursor moves on.
pub struct BatchLedger {
    /// All records ever opened, keyed by id.
    records: DashMap<BatchId, Arc<RwLock<BatchRecord>>>,
    /// Id of the batch currently accepting intake.
    cursor: parking_lot::RwLock<BatchId>,
}

impl BatchLedger {
    /// Create a ledger with its first batch open.
    pub fn new() -> Self {
        let first = BatchId::FIRST;
        let records = DashMap::new();
        records.insert(first, Arc::new(RwLock::new(BatchRecord::open(first))));

        Self {
            records,
            cursor: parking_lot::RwLock::new(first),
        }
    }

    /// Id of the in-progress batch.
    pub fn current_id(&self) -> BatchId {
        *self.cursor.read()
    }

    /// Shared handle to a record's lock.
    pub fn handle(&self, batch_id: BatchId) -> Result<Arc<RwLock<BatchRecord>>> {
        self.records
            .get(&batch_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(PoolClearError::BatchNotFound(batch_id))
    }

    /// Snapshot of a historical or in-progress record.
    pub async fn get(&self, batch_id: BatchId) -> Result<BatchRecord> {
        let handle = self.handle(batch_id)?;
        let record = handle.read().await;
        Ok(record.clone())
    }

    /// Snapshot of the in-progress record.
    pub async fn current(&self) -> BatchRecord {
        loop {
            let id = self.current_id();
            match self.handle(id) {
                Ok(handle) => {
                    let record = handle.read().await;
                    if self.current_id() == id {
                        return record.clone();
                    }
                    // The cursor moved while we waited; resolve again.
                }
                Err(_) => continue,
            }
        }
    }

    /// Exclusive lock on the in-progress record.
    ///
    /// A writer that waited on the record lock across a cursor advance would
    /// otherwise mutate a closed batch, so the cursor is re-checked after the
    /// lock is acquired and the lookup repeats if it moved.
    pub async fn lock_current(&self) -> OwnedRwLockWriteGuard<BatchRecord> {
        loop {
            let id = self.current_id();
            let handle = match self.handle(id) {
                Ok(handle) => handle,
                // advance() publishes the new record before moving the
                // cursor, so a miss means the cursor moved mid-lookup.
                Err(_) => continue,
            };
            let guard = handle.write_owned().await;
            if self.current_id() == id {
                return guard;
            }
        }
    }

    /// Open the next batch and move the cursor to it.
    ///
    /// Called only by the settlement forwarder after a successful forward,
    /// while it still holds the closed record's write lock. Ids are assigned
    /// in increments of one and never reused.
    pub fn advance(&self) -> BatchId {
        let mut cursor = self.cursor.write();
        let next = cursor.next();
        self.records
            .insert(next, Arc::new(RwLock::new(BatchRecord::open(next))));
        *cursor = next;
        debug!(batch_id = %next, "opened next batch");
        next
    }

    /// Number of batches ever opened.
    pub fn batch_count(&self) -> usize {
        self.records.len()
    }
}

impl Default for BatchLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolclear_common::{Amount, BatchNumber};

    #[tokio::test]
    async fn test_new_ledger_opens_first_batch() {
        let ledger = BatchLedger::new();
        assert_eq!(ledger.current_id(), BatchId::FIRST);
        assert_eq!(ledger.batch_count(), 1);

        let record = ledger.current().await;
        assert_eq!(record.batch_id, BatchId::FIRST);
        assert!(!record.funds_received);
    }

    #[tokio::test]
    async fn test_get_unknown_batch() {
        let ledger = BatchLedger::new();
        let err = ledger.get(BatchId::new(42)).await.unwrap_err();
        assert!(matches!(err, PoolClearError::BatchNotFound(id) if id == BatchId::new(42)));
    }

    #[tokio::test]
    async fn test_advance_assigns_sequential_ids() {
        let ledger = BatchLedger::new();
        let mut ids = vec![ledger.current_id()];

        for _ in 0..10 {
            ids.push(ledger.advance());
        }

        let values: Vec<u64> = ids.iter().map(|id| id.value()).collect();
        assert_eq!(values, (1..=11).collect::<Vec<u64>>());
        assert_eq!(ledger.batch_count(), 11);
    }

    #[tokio::test]
    async fn test_lock_current_follows_cursor() {
        let ledger = BatchLedger::new();

        let mut guard = ledger.lock_current().await;
        assert_eq!(guard.batch_id, BatchId::FIRST);
        guard
            .record_funds(BatchNumber::new(1), Amount::from_units(925))
            .unwrap();

        // The forwarder advances while still holding the record lock.
        let next = ledger.advance();
        drop(guard);

        let guard = ledger.lock_current().await;
        assert_eq!(guard.batch_id, next);
        assert!(!guard.funds_received);
    }

    #[tokio::test]
    async fn test_records_survive_advance() {
        let ledger = BatchLedger::new();
        {
            let mut guard = ledger.lock_current().await;
            guard
                .record_funds(BatchNumber::new(7), Amount::from_units(1000))
                .unwrap();
        }
        ledger.advance();

        let old = ledger.get(BatchId::FIRST).await.unwrap();
        assert_eq!(old.batch_number, BatchNumber::new(7));
        assert!(old.funds_received);
    }
}
