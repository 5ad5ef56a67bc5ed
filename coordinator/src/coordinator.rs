//! Core coordinator implementation.

use std::sync::Arc;

use tracing::info;

use poolclear_common::{
    ActorId, Amount, BatchDetails, BatchId, BatchNumber, BatchRecord, EntryId, Result,
};
use poolclear_ledger::{AuditLog, BatchLedger};

use crate::collaborators::{IntakeGateway, ValueCustodian};
use crate::config::CoordinatorConfig;
use crate::custody::CustodyHandler;
use crate::forwarder::SettlementForwarder;
use crate::metrics::{Metrics, SharedMetrics};
use crate::purge::PurgeController;
use crate::registry::RegistryIngestion;
use crate::roles::RoleGate;

/// The main coordinator that settles pooled batches.
///
/// Owns the ledger, the audit journal, and the operation components, and
/// exposes the intake, purge, and query surface. Collaborators are injected
/// so deployments can wire channels to real systems and tests can wire
/// fakes.
pub struct Coordinator {
    /// Configuration.
    config: CoordinatorConfig,
    /// Node ID for this coordinator instance.
    node_id: String,
    /// Authoritative batch store.
    ledger: Arc<BatchLedger>,
    /// Audit journal.
    audit: Arc<AuditLog>,
    /// Funds intake component.
    custody: CustodyHandler,
    /// Registry intake component; owns the forwarder.
    registry: RegistryIngestion,
    /// Registry teardown component.
    purge: PurgeController,
    /// Shared metrics.
    metrics: SharedMetrics,
}

impl Coordinator {
    /// Create a new coordinator instance.
    pub fn new(
        config: CoordinatorConfig,
        node_id: String,
        custodian: Arc<dyn ValueCustodian>,
        intake: Arc<dyn IntakeGateway>,
    ) -> Self {
        let ledger = Arc::new(BatchLedger::new());
        let audit = Arc::new(AuditLog::new());
        let metrics: SharedMetrics = Arc::new(Metrics::new());
        let gate = Arc::new(RoleGate::from_config(&config));

        let forwarder = SettlementForwarder::new(
            ledger.clone(),
            audit.clone(),
            custodian,
            intake.clone(),
            metrics.clone(),
        );
        let custody = CustodyHandler::new(
            config.min_net_amount,
            ledger.clone(),
            audit.clone(),
            gate.clone(),
            intake,
            metrics.clone(),
        );
        let registry = RegistryIngestion::new(
            config.expected_batch_size,
            ledger.clone(),
            audit.clone(),
            gate.clone(),
            forwarder,
            metrics.clone(),
        );
        let purge = PurgeController::new(ledger.clone(), audit.clone(), gate, metrics.clone());

        info!(node_id = %node_id, "coordinator created");

        Self {
            config,
            node_id,
            ledger,
            audit,
            custody,
            registry,
            purge,
            metrics,
        }
    }

    // --- Intake operations ---

    /// Accept the funds half of the current batch. Intake role only.
    pub async fn receive_funds(
        &self,
        actor: ActorId,
        batch_number: BatchNumber,
        net_amount: Amount,
    ) -> Result<()> {
        self.custody
            .receive_funds(actor, batch_number, net_amount)
            .await
    }

    /// Accept the registry half of the current batch and forward it.
    /// Intake role only.
    pub async fn receive_registry(
        &self,
        actor: ActorId,
        batch_number: BatchNumber,
        entries: Vec<EntryId>,
        net_amount: Amount,
    ) -> Result<()> {
        self.registry
            .receive_registry(actor, batch_number, entries, net_amount)
            .await
    }

    /// Tear down the registry of a forwarded batch. Purge-Authority role
    /// only. Returns the number of entries discarded.
    pub async fn purge(&self, actor: ActorId, batch_id: BatchId) -> Result<usize> {
        self.purge.purge(actor, batch_id).await
    }

    // --- Queries ---

    /// The ordered registry of a batch.
    pub async fn get_participants(&self, batch_id: BatchId) -> Result<Vec<EntryId>> {
        let handle = self.ledger.handle(batch_id)?;
        let record = handle.read().await;
        Ok(record.entries()?.to_vec())
    }

    /// The entry at a registry position.
    pub async fn get_participant_by_index(
        &self,
        batch_id: BatchId,
        index: usize,
    ) -> Result<EntryId> {
        let handle = self.ledger.handle(batch_id)?;
        let record = handle.read().await;
        record.entry_at(index)
    }

    /// The registry position of an entry.
    pub async fn get_participant_index(&self, batch_id: BatchId, entry: EntryId) -> Result<usize> {
        let handle = self.ledger.handle(batch_id)?;
        let record = handle.read().await;
        record.position_of(&entry)
    }

    /// Status snapshot of a batch.
    pub async fn get_batch_details(&self, batch_id: BatchId) -> Result<BatchDetails> {
        let handle = self.ledger.handle(batch_id)?;
        let record = handle.read().await;
        Ok(record.details())
    }

    /// Snapshot of the batch currently accepting intake.
    pub async fn current_batch(&self) -> BatchRecord {
        self.ledger.current().await
    }

    /// Id of the batch currently accepting intake.
    pub fn current_batch_id(&self) -> BatchId {
        self.ledger.current_id()
    }

    // --- Accessors ---

    /// The audit journal.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Shared metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The active configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// This node's id.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::testing::{RecordingCustodian, RecordingIntake};
    use poolclear_common::PoolClearError;
    use poolclear_ledger::AuditKind;
    use proptest::prelude::*;

    struct Harness {
        coordinator: Coordinator,
        custodian: Arc<RecordingCustodian>,
        intake: Arc<RecordingIntake>,
        intake_actor: ActorId,
        authority: ActorId,
    }

    fn create_test_coordinator(threshold_units: u64, batch_size: usize) -> Harness {
        let intake_actor = ActorId::new();
        let authority = ActorId::new();
        let config = CoordinatorConfig {
            expected_batch_size: batch_size,
            min_net_amount: Amount::from_units(threshold_units),
            intake_actor,
            purge_authority_actor: authority,
            ..CoordinatorConfig::default()
        };

        let custodian = Arc::new(RecordingCustodian::new());
        let intake = Arc::new(RecordingIntake::new());
        let coordinator = Coordinator::new(
            config,
            "test-node-1".to_string(),
            custodian.clone(),
            intake.clone(),
        );

        Harness {
            coordinator,
            custodian,
            intake,
            intake_actor,
            authority,
        }
    }

    fn create_test_entries(count: usize) -> Vec<EntryId> {
        (0..count).map(|_| EntryId::new()).collect()
    }

    #[tokio::test]
    async fn test_end_to_end_settlement_cycle() {
        let h = create_test_coordinator(900, 100);
        let batch_one = BatchId::FIRST;

        // Funds half.
        h.coordinator
            .receive_funds(h.intake_actor, BatchNumber::new(1), Amount::from_units(925))
            .await
            .unwrap();

        // Registry half; the forward fires before the call returns.
        h.coordinator
            .receive_registry(
                h.intake_actor,
                BatchNumber::new(1),
                create_test_entries(100),
                Amount::from_units(925),
            )
            .await
            .unwrap();

        let notices = h.custodian.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].batch_id, batch_one);
        assert_eq!(notices[0].net_amount, Amount::from_units(925));
        assert_eq!(h.coordinator.current_batch_id(), BatchId::new(2));
        assert_eq!(h.intake.purges(), vec![BatchNumber::new(1)]);

        // The registry stays readable until the downstream payout confirms.
        let participants = h.coordinator.get_participants(batch_one).await.unwrap();
        assert_eq!(participants.len(), 100);
        let first = participants[0];
        assert_eq!(
            h.coordinator
                .get_participant_by_index(batch_one, 0)
                .await
                .unwrap(),
            first
        );
        assert_eq!(
            h.coordinator
                .get_participant_index(batch_one, first)
                .await
                .unwrap(),
            0
        );

        // Teardown.
        let discarded = h.coordinator.purge(h.authority, batch_one).await.unwrap();
        assert_eq!(discarded, 100);
        let err = h
            .coordinator
            .get_participants(batch_one)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::RegistryNotComplete(_)));

        // The record survives with its amounts and count.
        let details = h.coordinator.get_batch_details(batch_one).await.unwrap();
        assert_eq!(details.batch_number, BatchNumber::new(1));
        assert_eq!(details.entry_count, 100);
        assert_eq!(details.net_amount, Amount::from_units(925));
        assert!(details.funds_received);
        assert!(details.funds_forwarded);
        assert!(details.registry_complete);
        assert!(details.purged);

        // Full journal trail for the batch.
        let kinds: Vec<AuditKind> = h
            .coordinator
            .audit()
            .events_for(batch_one)
            .iter()
            .map(|event| event.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                AuditKind::FundsCheck,
                AuditKind::RegistryCheck,
                AuditKind::SettlementForwarded,
                AuditKind::RegistryPurged,
            ]
        );

        let snapshot = h.coordinator.metrics().snapshot();
        assert_eq!(snapshot.funds_received_total, 1);
        assert_eq!(snapshot.batches_forwarded_total, 1);
        assert_eq!(snapshot.amount_forwarded_micros, 925_000_000);
        assert_eq!(snapshot.purges_total, 1);
        assert_eq!(snapshot.current_batch_id, 2);
    }

    #[tokio::test]
    async fn test_batch_ids_increase_without_gaps() {
        let h = create_test_coordinator(900, 3);

        for cycle in 1..=5u64 {
            h.coordinator
                .receive_funds(
                    h.intake_actor,
                    BatchNumber::new(cycle),
                    Amount::from_units(900 + cycle),
                )
                .await
                .unwrap();
            h.coordinator
                .receive_registry(
                    h.intake_actor,
                    BatchNumber::new(cycle),
                    create_test_entries(3),
                    Amount::from_units(900 + cycle),
                )
                .await
                .unwrap();
            assert_eq!(h.coordinator.current_batch_id(), BatchId::new(cycle + 1));
        }

        let ids: Vec<u64> = h
            .custodian
            .notices()
            .iter()
            .map(|notice| notice.batch_id.value())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        // Every closed batch is still queryable.
        for id in 1..=5u64 {
            let details = h
                .coordinator
                .get_batch_details(BatchId::new(id))
                .await
                .unwrap();
            assert!(details.funds_forwarded);
            assert_eq!(details.batch_number, BatchNumber::new(id));
        }
    }

    #[tokio::test]
    async fn test_registry_unavailable_before_completion() {
        let h = create_test_coordinator(900, 10);

        let err = h
            .coordinator
            .get_participants(BatchId::FIRST)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::RegistryNotComplete(_)));

        h.coordinator
            .receive_funds(h.intake_actor, BatchNumber::new(1), Amount::from_units(950))
            .await
            .unwrap();
        let err = h
            .coordinator
            .get_participants(BatchId::FIRST)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::RegistryNotComplete(_)));

        let details = h.coordinator.get_batch_details(BatchId::FIRST).await.unwrap();
        assert!(details.funds_received);
        assert!(!details.registry_complete);
    }

    #[tokio::test]
    async fn test_unknown_batch_queries() {
        let h = create_test_coordinator(900, 10);
        let missing = BatchId::new(42);

        assert!(matches!(
            h.coordinator.get_participants(missing).await.unwrap_err(),
            PoolClearError::BatchNotFound(_)
        ));
        assert!(matches!(
            h.coordinator.get_batch_details(missing).await.unwrap_err(),
            PoolClearError::BatchNotFound(_)
        ));
        assert!(matches!(
            h.coordinator
                .get_participant_by_index(missing, 0)
                .await
                .unwrap_err(),
            PoolClearError::BatchNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_index_out_of_range() {
        let h = create_test_coordinator(900, 3);
        h.coordinator
            .receive_funds(h.intake_actor, BatchNumber::new(1), Amount::from_units(925))
            .await
            .unwrap();
        h.coordinator
            .receive_registry(
                h.intake_actor,
                BatchNumber::new(1),
                create_test_entries(3),
                Amount::from_units(925),
            )
            .await
            .unwrap();

        let err = h
            .coordinator
            .get_participant_by_index(BatchId::FIRST, 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PoolClearError::InvalidIndex { index: 3, len: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_non_member_entry_is_not_found() {
        let h = create_test_coordinator(900, 3);
        h.coordinator
            .receive_funds(h.intake_actor, BatchNumber::new(1), Amount::from_units(925))
            .await
            .unwrap();
        h.coordinator
            .receive_registry(
                h.intake_actor,
                BatchNumber::new(1),
                create_test_entries(3),
                Amount::from_units(925),
            )
            .await
            .unwrap();

        let err = h
            .coordinator
            .get_participant_index(BatchId::FIRST, EntryId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::EntryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_roles_are_separated() {
        let h = create_test_coordinator(900, 3);

        // The purge authority cannot feed intake.
        let err = h
            .coordinator
            .receive_funds(h.authority, BatchNumber::new(1), Amount::from_units(925))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::RoleDenied { .. }));

        // The intake actor cannot purge.
        h.coordinator
            .receive_funds(h.intake_actor, BatchNumber::new(1), Amount::from_units(925))
            .await
            .unwrap();
        h.coordinator
            .receive_registry(
                h.intake_actor,
                BatchNumber::new(1),
                create_test_entries(3),
                Amount::from_units(925),
            )
            .await
            .unwrap();
        let err = h
            .coordinator
            .purge(h.intake_actor, BatchId::FIRST)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolClearError::RoleDenied { .. }));

        assert_eq!(h.coordinator.metrics().snapshot().role_denials_total, 2);
    }

    proptest! {
        // Whatever net amount clears the threshold, the custodian hears
        // exactly that amount, to the micro-unit.
        #[test]
        fn prop_forwarded_amount_is_conserved(
            micros in 900_000_000u64..=100_000_000_000_000u64,
        ) {
            tokio_test::block_on(async {
                let h = create_test_coordinator(900, 3);
                let amount = Amount::from_micros(micros);

                h.coordinator
                    .receive_funds(h.intake_actor, BatchNumber::new(1), amount)
                    .await
                    .unwrap();
                h.coordinator
                    .receive_registry(
                        h.intake_actor,
                        BatchNumber::new(1),
                        create_test_entries(3),
                        amount,
                    )
                    .await
                    .unwrap();

                let notices = h.custodian.notices();
                assert_eq!(notices.len(), 1);
                assert_eq!(notices[0].net_amount.as_micros(), micros);

                let stored = h
                    .coordinator
                    .get_batch_details(BatchId::FIRST)
                    .await
                    .unwrap();
                assert_eq!(stored.net_amount.as_micros(), micros);
            });
        }
    }
}
