//! Intake of pooled funds into coordinator custody.

use std::sync::Arc;

use tracing::{info, instrument};

use poolclear_common::{ActorId, Amount, BatchNumber, PoolClearError, Result, Role};
use poolclear_ledger::{AuditEvent, AuditKind, AuditLog, BatchLedger};

use crate::collaborators::IntakeGateway;
use crate::metrics::SharedMetrics;
use crate::roles::RoleGate;

/// Accepts the funds half of a batch from the upstream intake.
pub struct CustodyHandler {
    min_net_amount: Amount,
    ledger: Arc<BatchLedger>,
    audit: Arc<AuditLog>,
    gate: Arc<RoleGate>,
    intake: Arc<dyn IntakeGateway>,
    metrics: SharedMetrics,
}

impl CustodyHandler {
    /// Create a handler over the shared ledger and collaborators.
    pub fn new(
        min_net_amount: Amount,
        ledger: Arc<BatchLedger>,
        audit: Arc<AuditLog>,
        gate: Arc<RoleGate>,
        intake: Arc<dyn IntakeGateway>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            min_net_amount,
            ledger,
            audit,
            gate,
            intake,
            metrics,
        }
    }

    /// Record an incoming value transfer against the current batch.
    ///
    /// The validation outcome is journaled whether or not the transfer pull
    /// that follows it succeeds. The pull happens before any record mutation
    /// so a bounced transfer leaves the batch untouched.
    #[instrument(
        skip(self),
        fields(actor = %actor, batch_number = %batch_number, net_amount = %net_amount)
    )]
    pub async fn receive_funds(
        &self,
        actor: ActorId,
        batch_number: BatchNumber,
        net_amount: Amount,
    ) -> Result<()> {
        self.gate.require(actor, Role::Intake).map_err(|err| {
            self.metrics.role_denied();
            err
        })?;

        let mut record = self.ledger.lock_current().await;
        let batch_id = record.batch_id;

        if net_amount < self.min_net_amount {
            let err = PoolClearError::InsufficientAmount {
                amount: net_amount,
                minimum: self.min_net_amount,
            };
            self.audit.record(AuditEvent::rejected(
                AuditKind::FundsCheck,
                batch_id,
                batch_number,
                net_amount,
                err.error_code(),
            ));
            self.metrics.funds_rejected();
            return Err(err);
        }

        if record.funds_received {
            let err = PoolClearError::FundsAlreadyReceived {
                batch_id,
                batch_number: record.batch_number,
            };
            self.audit.record(AuditEvent::rejected(
                AuditKind::FundsCheck,
                batch_id,
                batch_number,
                net_amount,
                err.error_code(),
            ));
            self.metrics.funds_rejected();
            return Err(err);
        }

        self.audit.record(AuditEvent::passed(
            AuditKind::FundsCheck,
            batch_id,
            batch_number,
            net_amount,
        ));

        self.intake
            .pull_funds(batch_number, net_amount)
            .await
            .map_err(|reason| {
                self.metrics.collaborator_failure();
                PoolClearError::TransferFailed {
                    batch_number,
                    reason,
                }
            })?;

        record.record_funds(batch_number, net_amount)?;
        self.metrics.funds_accepted();

        info!(
            batch_id = %batch_id,
            batch_number = %batch_number,
            net_amount = %net_amount,
            "funds received into custody"
        );
        Ok(())
    }
}
