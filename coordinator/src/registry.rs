//! Intake of the participant registry half of a batch.

use std::sync::Arc;

use tracing::{info, instrument};

use poolclear_common::{ActorId, Amount, BatchNumber, EntryId, Result, Role};
use poolclear_ledger::{AuditEvent, AuditKind, AuditLog, BatchLedger};

use crate::forwarder::SettlementForwarder;
use crate::metrics::SharedMetrics;
use crate::roles::RoleGate;

/// Accepts the registry half of a batch and triggers the forward.
pub struct RegistryIngestion {
    expected_batch_size: usize,
    ledger: Arc<BatchLedger>,
    audit: Arc<AuditLog>,
    gate: Arc<RoleGate>,
    forwarder: SettlementForwarder,
    metrics: SharedMetrics,
}

impl RegistryIngestion {
    /// Create an ingestion component over the shared ledger.
    pub fn new(
        expected_batch_size: usize,
        ledger: Arc<BatchLedger>,
        audit: Arc<AuditLog>,
        gate: Arc<RoleGate>,
        forwarder: SettlementForwarder,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            expected_batch_size,
            ledger,
            audit,
            gate,
            forwarder,
            metrics,
        }
    }

    /// Record a registry submission and forward the completed batch.
    ///
    /// The registry write and the forward commit or fail as one unit: a
    /// checkpoint of the record is taken before any mutation and restored
    /// if the forward fails, so callers can retry with the same arguments.
    #[instrument(
        skip(self, entries),
        fields(actor = %actor, batch_number = %batch_number, net_amount = %net_amount, entries = entries.len())
    )]
    pub async fn receive_registry(
        &self,
        actor: ActorId,
        batch_number: BatchNumber,
        entries: Vec<EntryId>,
        net_amount: Amount,
    ) -> Result<()> {
        self.gate.require(actor, Role::Intake).map_err(|err| {
            self.metrics.role_denied();
            err
        })?;

        let mut record = self.ledger.lock_current().await;
        let batch_id = record.batch_id;
        let checkpoint = record.clone();

        if let Err(err) =
            record.complete_registry(batch_number, net_amount, entries, self.expected_batch_size)
        {
            self.audit.record(AuditEvent::rejected(
                AuditKind::RegistryCheck,
                batch_id,
                batch_number,
                net_amount,
                err.error_code(),
            ));
            self.metrics.registry_rejected();
            return Err(err);
        }

        self.audit.record(AuditEvent::passed(
            AuditKind::RegistryCheck,
            batch_id,
            batch_number,
            net_amount,
        ));

        // Both halves are now present; hand the batch downstream before
        // returning to the caller.
        match self.forwarder.execute(&mut record).await {
            Ok(next) => {
                self.metrics.registry_accepted();
                info!(
                    batch_id = %batch_id,
                    batch_number = %batch_number,
                    next_batch_id = %next,
                    "registry recorded and batch forwarded"
                );
                Ok(())
            }
            Err(err) => {
                *record = checkpoint;
                Err(err)
            }
        }
    }
}
