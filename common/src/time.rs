//! Time utilities for PoolClear.

use chrono::{DateTime, Utc};

/// A timestamp with timezone (always UTC for PoolClear).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}
