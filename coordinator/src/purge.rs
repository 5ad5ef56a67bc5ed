//! Controlled teardown of retained registries.

use std::sync::Arc;

use tracing::{info, instrument};

use poolclear_common::{ActorId, BatchId, Result, Role};
use poolclear_ledger::{AuditEvent, AuditKind, AuditLog, BatchLedger};

use crate::metrics::SharedMetrics;
use crate::roles::RoleGate;

/// Erases the registry of a forwarded batch on downstream confirmation.
pub struct PurgeController {
    ledger: Arc<BatchLedger>,
    audit: Arc<AuditLog>,
    gate: Arc<RoleGate>,
    metrics: SharedMetrics,
}

impl PurgeController {
    /// Create a controller over the shared ledger.
    pub fn new(
        ledger: Arc<BatchLedger>,
        audit: Arc<AuditLog>,
        gate: Arc<RoleGate>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            ledger,
            audit,
            gate,
            metrics,
        }
    }

    /// Purge the registry of a historical batch.
    ///
    /// Returns the number of entries discarded. The record itself stays in
    /// the ledger with its amounts and entry count intact.
    #[instrument(skip(self), fields(actor = %actor, batch_id = %batch_id))]
    pub async fn purge(&self, actor: ActorId, batch_id: BatchId) -> Result<usize> {
        self.gate
            .require(actor, Role::PurgeAuthority)
            .map_err(|err| {
                self.metrics.role_denied();
                err
            })?;

        let handle = self.ledger.handle(batch_id)?;
        let mut record = handle.write().await;

        let discarded = record.purge().map_err(|err| {
            self.metrics.purge_rejected();
            err
        })?;

        self.audit.record(AuditEvent::passed(
            AuditKind::RegistryPurged,
            batch_id,
            record.batch_number,
            record.net_amount,
        ));
        self.metrics.purge_completed();

        info!(
            batch_id = %batch_id,
            discarded,
            "registry purged"
        );
        Ok(discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use poolclear_common::{Amount, BatchNumber, EntryId, PoolClearError};

    struct Harness {
        controller: PurgeController,
        ledger: Arc<BatchLedger>,
        audit: Arc<AuditLog>,
        authority: ActorId,
    }

    fn create_test_controller() -> Harness {
        let ledger = Arc::new(BatchLedger::new());
        let audit = Arc::new(AuditLog::new());
        let authority = ActorId::new();
        let gate = Arc::new(RoleGate::new(ActorId::new(), authority));
        let metrics = Arc::new(Metrics::new());

        let controller = PurgeController::new(ledger.clone(), audit.clone(), gate, metrics);

        Harness {
            controller,
            ledger,
            audit,
            authority,
        }
    }

    /// Drive the first batch to the forwarded state and open the next one.
    async fn forward_first_batch(ledger: &BatchLedger, count: usize) {
        let mut record = ledger.lock_current().await;
        record
            .record_funds(BatchNumber::new(1), Amount::from_units(925))
            .unwrap();
        let entries: Vec<EntryId> = (0..count).map(|_| EntryId::new()).collect();
        record
            .complete_registry(BatchNumber::new(1), Amount::from_units(925), entries, count)
            .unwrap();
        record.mark_forwarded().unwrap();
        ledger.advance();
    }

    #[tokio::test]
    async fn test_purge_forwarded_batch() {
        let h = create_test_controller();
        forward_first_batch(&h.ledger, 5).await;

        let discarded = h
            .controller
            .purge(h.authority, BatchId::FIRST)
            .await
            .unwrap();
        assert_eq!(discarded, 5);

        let record = h.ledger.get(BatchId::FIRST).await.unwrap();
        assert!(record.purged);
        assert!(record.entries().is_err());
        assert_eq!(record.entry_count(), 5);

        let events = h.audit.events_for(BatchId::FIRST);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AuditKind::RegistryPurged);
    }

    #[tokio::test]
    async fn test_outsider_denied() {
        let h = create_test_controller();
        forward_first_batch(&h.ledger, 5).await;

        let err = h
            .controller
            .purge(ActorId::new(), BatchId::FIRST)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::RoleDenied { .. }));
        assert!(!h.ledger.get(BatchId::FIRST).await.unwrap().purged);
    }

    #[tokio::test]
    async fn test_unknown_batch() {
        let h = create_test_controller();

        let err = h
            .controller
            .purge(h.authority, BatchId::new(42))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::BatchNotFound(_)));
    }

    #[tokio::test]
    async fn test_second_purge_rejected() {
        let h = create_test_controller();
        forward_first_batch(&h.ledger, 5).await;

        h.controller
            .purge(h.authority, BatchId::FIRST)
            .await
            .unwrap();
        let err = h
            .controller
            .purge(h.authority, BatchId::FIRST)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::AlreadyPurged(_)));

        // Still purged, still empty, journaled once.
        let record = h.ledger.get(BatchId::FIRST).await.unwrap();
        assert!(record.purged);
        assert!(record.entries().is_err());
        assert_eq!(h.audit.events_for(BatchId::FIRST).len(), 1);
    }

    #[tokio::test]
    async fn test_purge_before_forward_rejected() {
        let h = create_test_controller();
        {
            let mut record = h.ledger.lock_current().await;
            record
                .record_funds(BatchNumber::new(1), Amount::from_units(925))
                .unwrap();
        }

        let err = h
            .controller
            .purge(h.authority, BatchId::FIRST)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::NotYetForwarded(_)));
    }

    #[tokio::test]
    async fn test_purge_does_not_touch_open_batch() {
        let h = create_test_controller();
        forward_first_batch(&h.ledger, 3).await;

        h.controller
            .purge(h.authority, BatchId::FIRST)
            .await
            .unwrap();

        // The batch opened by the forward is untouched.
        let current = h.ledger.current().await;
        assert_eq!(current.batch_id, BatchId::new(2));
        assert!(!current.purged);
        assert!(!current.funds_received);
    }
}
