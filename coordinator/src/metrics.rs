//! Metrics collection for coordinator monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use poolclear_common::{Amount, BatchId};

/// Coordinator metrics.
pub struct Metrics {
    /// Funds transfers accepted into custody.
    pub funds_received_total: AtomicU64,
    /// Funds transfers rejected by validation.
    pub funds_rejected_total: AtomicU64,
    /// Registry submissions accepted.
    pub registries_received_total: AtomicU64,
    /// Registry submissions rejected by validation.
    pub registries_rejected_total: AtomicU64,
    /// Batches forwarded downstream.
    pub batches_forwarded_total: AtomicU64,
    /// Cumulative net amount forwarded, in micro-units.
    pub amount_forwarded_micros: AtomicU64,
    /// Registries purged.
    pub purges_total: AtomicU64,
    /// Purge attempts rejected.
    pub purges_rejected_total: AtomicU64,
    /// Callers denied by the role gate.
    pub role_denials_total: AtomicU64,
    /// Failed calls to external collaborators.
    pub collaborator_failures_total: AtomicU64,
    /// Id of the batch currently accepting intake.
    pub current_batch_id: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            funds_received_total: AtomicU64::new(0),
            funds_rejected_total: AtomicU64::new(0),
            registries_received_total: AtomicU64::new(0),
            registries_rejected_total: AtomicU64::new(0),
            batches_forwarded_total: AtomicU64::new(0),
            amount_forwarded_micros: AtomicU64::new(0),
            purges_total: AtomicU64::new(0),
            purges_rejected_total: AtomicU64::new(0),
            role_denials_total: AtomicU64::new(0),
            collaborator_failures_total: AtomicU64::new(0),
            current_batch_id: AtomicU64::new(BatchId::FIRST.value()),
        }
    }

    /// Record an accepted funds transfer.
    pub fn funds_accepted(&self) {
        self.funds_received_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected funds transfer.
    pub fn funds_rejected(&self) {
        self.funds_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an accepted registry submission.
    pub fn registry_accepted(&self) {
        self.registries_received_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected registry submission.
    pub fn registry_rejected(&self) {
        self.registries_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed forward and the amount it moved.
    pub fn batch_forwarded(&self, amount: Amount) {
        self.batches_forwarded_total.fetch_add(1, Ordering::Relaxed);
        self.amount_forwarded_micros
            .fetch_add(amount.as_micros(), Ordering::Relaxed);
    }

    /// Record the cursor position.
    pub fn set_current_batch(&self, batch_id: BatchId) {
        self.current_batch_id
            .store(batch_id.value(), Ordering::Relaxed);
    }

    /// Record a completed purge.
    pub fn purge_completed(&self) {
        self.purges_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected purge attempt.
    pub fn purge_rejected(&self) {
        self.purges_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a role gate denial.
    pub fn role_denied(&self) {
        self.role_denials_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed collaborator call.
    pub fn collaborator_failure(&self) {
        self.collaborator_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            funds_received_total: self.funds_received_total.load(Ordering::Relaxed),
            funds_rejected_total: self.funds_rejected_total.load(Ordering::Relaxed),
            registries_received_total: self.registries_received_total.load(Ordering::Relaxed),
            registries_rejected_total: self.registries_rejected_total.load(Ordering::Relaxed),
            batches_forwarded_total: self.batches_forwarded_total.load(Ordering::Relaxed),
            amount_forwarded_micros: self.amount_forwarded_micros.load(Ordering::Relaxed),
            purges_total: self.purges_total.load(Ordering::Relaxed),
            purges_rejected_total: self.purges_rejected_total.load(Ordering::Relaxed),
            role_denials_total: self.role_denials_total.load(Ordering::Relaxed),
            collaborator_failures_total: self.collaborator_failures_total.load(Ordering::Relaxed),
            current_batch_id: self.current_batch_id.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP poolclear_funds_received_total Funds transfers accepted into custody
# TYPE poolclear_funds_received_total counter
poolclear_funds_received_total {}

# HELP poolclear_funds_rejected_total Funds transfers rejected by validation
# TYPE poolclear_funds_rejected_total counter
poolclear_funds_rejected_total {}

# HELP poolclear_registries_received_total Registry submissions accepted
# TYPE poolclear_registries_received_total counter
poolclear_registries_received_total {}

# HELP poolclear_registries_rejected_total Registry submissions rejected by validation
# TYPE poolclear_registries_rejected_total counter
poolclear_registries_rejected_total {}

# HELP poolclear_batches_forwarded_total Batches forwarded downstream
# TYPE poolclear_batches_forwarded_total counter
poolclear_batches_forwarded_total {}

# HELP poolclear_amount_forwarded_micros Cumulative net amount forwarded in micro-units
# TYPE poolclear_amount_forwarded_micros counter
poolclear_amount_forwarded_micros {}

# HELP poolclear_purges_total Registries purged
# TYPE poolclear_purges_total counter
poolclear_purges_total {}

# HELP poolclear_purges_rejected_total Purge attempts rejected
# TYPE poolclear_purges_rejected_total counter
poolclear_purges_rejected_total {}

# HELP poolclear_role_denials_total Callers denied by the role gate
# TYPE poolclear_role_denials_total counter
poolclear_role_denials_total {}

# HELP poolclear_collaborator_failures_total Failed calls to external collaborators
# TYPE poolclear_collaborator_failures_total counter
poolclear_collaborator_failures_total {}

# HELP poolclear_current_batch_id Id of the batch currently accepting intake
# TYPE poolclear_current_batch_id gauge
poolclear_current_batch_id {}
"#,
            snapshot.funds_received_total,
            snapshot.funds_rejected_total,
            snapshot.registries_received_total,
            snapshot.registries_rejected_total,
            snapshot.batches_forwarded_total,
            snapshot.amount_forwarded_micros,
            snapshot.purges_total,
            snapshot.purges_rejected_total,
            snapshot.role_denials_total,
            snapshot.collaborator_failures_total,
            snapshot.current_batch_id,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub funds_received_total: u64,
    pub funds_rejected_total: u64,
    pub registries_received_total: u64,
    pub registries_rejected_total: u64,
    pub batches_forwarded_total: u64,
    pub amount_forwarded_micros: u64,
    pub purges_total: u64,
    pub purges_rejected_total: u64,
    pub role_denials_total: u64,
    pub collaborator_failures_total: u64,
    pub current_batch_id: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = Metrics::new();

        metrics.funds_accepted();
        metrics.funds_accepted();
        metrics.funds_rejected();
        metrics.batch_forwarded(Amount::from_units(925));
        metrics.set_current_batch(BatchId::new(2));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.funds_received_total, 2);
        assert_eq!(snapshot.funds_rejected_total, 1);
        assert_eq!(snapshot.batches_forwarded_total, 1);
        assert_eq!(snapshot.amount_forwarded_micros, 925_000_000);
        assert_eq!(snapshot.current_batch_id, 2);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.funds_accepted();

        let output = metrics.to_prometheus();
        assert!(output.contains("poolclear_funds_received_total 1"));
        assert!(output.contains("poolclear_current_batch_id 1"));
    }
}
