//! PoolClear Coordinator
//!
//! The coordinator takes custody of pooled value and participant registries
//! from the upstream intake, validates the two halves against each other,
//! forwards completed batches downstream exactly once, and tears down
//! retained registries after downstream confirmation.

pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod custody;
pub mod forwarder;
pub mod metrics;
pub mod purge;
pub mod registry;
pub mod roles;

pub use collaborators::{
    ChannelCustodian, ChannelIntake, IntakeGateway, IntakeRequest, LoggingCustodian,
    LoggingIntake, SettlementNotice, ValueCustodian,
};
pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
pub use roles::RoleGate;
