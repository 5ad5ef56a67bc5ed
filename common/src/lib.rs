//! PoolClear Common Types
//!
//! This crate contains shared types used across the PoolClear coordinator,
//! including identifiers, the fixed-point amount type, batch records, and
//! error definitions.

pub mod amount;
pub mod batch;
pub mod error;
pub mod identifiers;
pub mod time;

pub use amount::*;
pub use batch::*;
pub use error::*;
pub use identifiers::*;
pub use time::*;
