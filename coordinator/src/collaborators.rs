//! Interfaces to the coordinator's external collaborators.
//!
//! The coordinator calls systems it does not own: the upstream intake that
//! holds pending value and retained batch copies, and the downstream
//! custodian that takes over a forwarded batch. Each is an injected
//! capability so the core logic runs against fakes in tests and against
//! channel or logging adapters in a deployment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use poolclear_common::{Amount, BatchId, BatchNumber};

/// The settlement package handed downstream.
///
/// The custodian receives all three fields together or not at all; there is
/// no partial notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementNotice {
    /// Ledger id of the forwarded batch.
    pub batch_id: BatchId,
    /// Upstream correlation number.
    pub batch_number: BatchNumber,
    /// Net amount, bit-for-bit the amount the ledger recorded.
    pub net_amount: Amount,
}

/// Downstream custodian of forwarded value.
#[async_trait]
pub trait ValueCustodian: Send + Sync {
    /// Take over the net amount and registry reference for a forwarded
    /// batch. An error aborts the triggering forward.
    async fn notify_settlement(&self, notice: SettlementNotice) -> Result<(), String>;
}

/// Upstream intake holding pending transfers and retained batch copies.
#[async_trait]
pub trait IntakeGateway: Send + Sync {
    /// Move the pending value transfer for a batch into coordinator custody.
    async fn pull_funds(&self, batch_number: BatchNumber, net_amount: Amount)
        -> Result<(), String>;

    /// Tear down the intake's retained copy of a forwarded batch. An error
    /// aborts the triggering forward.
    async fn purge_batch(&self, batch_number: BatchNumber) -> Result<(), String>;
}

/// Request sent to a channel-backed intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeRequest {
    /// Pull a pending transfer into custody.
    PullFunds {
        batch_number: BatchNumber,
        net_amount: Amount,
    },
    /// Tear down a retained batch copy.
    PurgeBatch { batch_number: BatchNumber },
}

/// Custodian adapter that forwards notices over a channel.
pub struct ChannelCustodian {
    tx: mpsc::Sender<SettlementNotice>,
}

impl ChannelCustodian {
    /// Create an adapter over the sending half of a channel.
    pub fn new(tx: mpsc::Sender<SettlementNotice>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ValueCustodian for ChannelCustodian {
    async fn notify_settlement(&self, notice: SettlementNotice) -> Result<(), String> {
        self.tx
            .send(notice)
            .await
            .map_err(|_| "custodian channel closed".to_string())
    }
}

/// Intake adapter that forwards requests over a channel.
pub struct ChannelIntake {
    tx: mpsc::Sender<IntakeRequest>,
}

impl ChannelIntake {
    /// Create an adapter over the sending half of a channel.
    pub fn new(tx: mpsc::Sender<IntakeRequest>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl IntakeGateway for ChannelIntake {
    async fn pull_funds(
        &self,
        batch_number: BatchNumber,
        net_amount: Amount,
    ) -> Result<(), String> {
        self.tx
            .send(IntakeRequest::PullFunds {
                batch_number,
                net_amount,
            })
            .await
            .map_err(|_| "intake channel closed".to_string())
    }

    async fn purge_batch(&self, batch_number: BatchNumber) -> Result<(), String> {
        self.tx
            .send(IntakeRequest::PurgeBatch { batch_number })
            .await
            .map_err(|_| "intake channel closed".to_string())
    }
}

/// Default custodian that logs notices but does not process them.
pub struct LoggingCustodian;

#[async_trait]
impl ValueCustodian for LoggingCustodian {
    async fn notify_settlement(&self, notice: SettlementNotice) -> Result<(), String> {
        info!(
            batch_id = %notice.batch_id,
            batch_number = %notice.batch_number,
            net_amount = %notice.net_amount,
            "settlement notice received"
        );
        Ok(())
    }
}

/// Default intake that logs requests but does not process them.
pub struct LoggingIntake;

#[async_trait]
impl IntakeGateway for LoggingIntake {
    async fn pull_funds(
        &self,
        batch_number: BatchNumber,
        net_amount: Amount,
    ) -> Result<(), String> {
        info!(
            batch_number = %batch_number,
            net_amount = %net_amount,
            "funds pull requested"
        );
        Ok(())
    }

    async fn purge_batch(&self, batch_number: BatchNumber) -> Result<(), String> {
        info!(batch_number = %batch_number, "intake purge requested");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fakes with one-shot failure injection.

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;

    pub struct RecordingCustodian {
        notices: Mutex<Vec<SettlementNotice>>,
        fail_next: AtomicBool,
    }

    impl RecordingCustodian {
        pub fn new() -> Self {
            Self {
                notices: Mutex::new(Vec::new()),
                fail_next: AtomicBool::new(false),
            }
        }

        pub fn fail_next(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }

        pub fn notices(&self) -> Vec<SettlementNotice> {
            self.notices.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ValueCustodian for RecordingCustodian {
        async fn notify_settlement(&self, notice: SettlementNotice) -> Result<(), String> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err("custodian unavailable".to_string());
            }
            self.notices.lock().unwrap().push(notice);
            Ok(())
        }
    }

    pub struct RecordingIntake {
        pulls: Mutex<Vec<(BatchNumber, Amount)>>,
        purges: Mutex<Vec<BatchNumber>>,
        fail_next_pull: AtomicBool,
        fail_next_purge: AtomicBool,
    }

    impl RecordingIntake {
        pub fn new() -> Self {
            Self {
                pulls: Mutex::new(Vec::new()),
                purges: Mutex::new(Vec::new()),
                fail_next_pull: AtomicBool::new(false),
                fail_next_purge: AtomicBool::new(false),
            }
        }

        pub fn fail_next_pull(&self) {
            self.fail_next_pull.store(true, Ordering::SeqCst);
        }

        pub fn fail_next_purge(&self) {
            self.fail_next_purge.store(true, Ordering::SeqCst);
        }

        pub fn pulls(&self) -> Vec<(BatchNumber, Amount)> {
            self.pulls.lock().unwrap().clone()
        }

        pub fn purges(&self) -> Vec<BatchNumber> {
            self.purges.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IntakeGateway for RecordingIntake {
        async fn pull_funds(
            &self,
            batch_number: BatchNumber,
            net_amount: Amount,
        ) -> Result<(), String> {
            if self.fail_next_pull.swap(false, Ordering::SeqCst) {
                return Err("transfer bounced".to_string());
            }
            self.pulls.lock().unwrap().push((batch_number, net_amount));
            Ok(())
        }

        async fn purge_batch(&self, batch_number: BatchNumber) -> Result<(), String> {
            if self.fail_next_purge.swap(false, Ordering::SeqCst) {
                return Err("intake unreachable".to_string());
            }
            self.purges.lock().unwrap().push(batch_number);
            Ok(())
        }
    }
}
