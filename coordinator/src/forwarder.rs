//! One-time forward of a completed batch to the downstream custodian.

use std::sync::Arc;

use tracing::{error, info, instrument};

use poolclear_common::{BatchId, BatchRecord, PoolClearError, Result};
use poolclear_ledger::{AuditEvent, AuditKind, AuditLog, BatchLedger};

use crate::collaborators::{IntakeGateway, SettlementNotice, ValueCustodian};
use crate::metrics::SharedMetrics;

/// Hands a completed batch downstream and opens the next one.
///
/// Invoked only by registry ingestion, on the record that just became
/// complete, while the record's write lock is held. The trigger owns
/// rollback: on error it restores its pre-mutation checkpoint of the
/// record, so no partial forward is ever visible.
pub struct SettlementForwarder {
    ledger: Arc<BatchLedger>,
    audit: Arc<AuditLog>,
    custodian: Arc<dyn ValueCustodian>,
    intake: Arc<dyn IntakeGateway>,
    metrics: SharedMetrics,
}

impl SettlementForwarder {
    /// Create a forwarder over the shared ledger and collaborators.
    pub fn new(
        ledger: Arc<BatchLedger>,
        audit: Arc<AuditLog>,
        custodian: Arc<dyn ValueCustodian>,
        intake: Arc<dyn IntakeGateway>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            ledger,
            audit,
            custodian,
            intake,
            metrics,
        }
    }

    /// Forward the record downstream and advance the cursor.
    ///
    /// Order matters here: the custodian hears about the batch before the
    /// record is marked, the intake teardown runs after, and the cursor
    /// moves only once everything succeeded. Returns the id of the next
    /// open batch.
    #[instrument(skip(self, record), fields(batch_id = %record.batch_id))]
    pub async fn execute(&self, record: &mut BatchRecord) -> Result<BatchId> {
        if !record.is_ready_to_forward() {
            error!(
                batch_id = %record.batch_id,
                "forward triggered on a record that is not complete"
            );
            return Err(PoolClearError::DrawNotReady(record.batch_id));
        }

        // The notice carries the stored amount, so the value handed
        // downstream cannot drift from the ledger.
        let notice = SettlementNotice {
            batch_id: record.batch_id,
            batch_number: record.batch_number,
            net_amount: record.net_amount,
        };

        self.custodian
            .notify_settlement(notice)
            .await
            .map_err(|reason| {
                self.metrics.collaborator_failure();
                PoolClearError::CustodianRejected {
                    batch_id: record.batch_id,
                    reason,
                }
            })?;

        record.mark_forwarded()?;

        self.intake
            .purge_batch(record.batch_number)
            .await
            .map_err(|reason| {
                self.metrics.collaborator_failure();
                PoolClearError::IntakePurgeFailed {
                    batch_number: record.batch_number,
                    reason,
                }
            })?;

        self.audit.record(AuditEvent::passed(
            AuditKind::SettlementForwarded,
            record.batch_id,
            record.batch_number,
            record.net_amount,
        ));
        self.metrics.batch_forwarded(record.net_amount);

        let next = self.ledger.advance();
        self.metrics.set_current_batch(next);

        info!(
            batch_id = %record.batch_id,
            batch_number = %record.batch_number,
            net_amount = %record.net_amount,
            next_batch_id = %next,
            "batch forwarded downstream"
        );
        Ok(next)
    }
}
