//! Fixed-point monetary amounts for PoolClear.
//!
//! Every interface in the system carries value as an integer count of
//! micro-units (6 implied decimal places). Keeping the stored value an
//! integer makes the conservation invariant exact: the amount forwarded
//! downstream is bit-for-bit the amount recorded at intake. Decimal
//! conversion happens only at the edges (configuration parsing, display).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of implied decimal places.
pub const SCALE: u32 = 6;

/// Micro-units per whole unit.
pub const MICROS_PER_UNIT: u64 = 1_000_000;

/// A non-negative fixed-point amount, stored as micro-units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Create from a raw micro-unit count.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Create from a whole-unit count.
    pub const fn from_units(units: u64) -> Self {
        Self(units * MICROS_PER_UNIT)
    }

    /// Get the raw micro-unit count.
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Check if the amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Convert to a `Decimal` with the implied scale applied.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.0 as i128, SCALE)
    }

    /// Convert from a `Decimal`, rejecting values the fixed-point
    /// representation cannot hold exactly.
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }

        let scaled = value
            .checked_mul(Decimal::from(MICROS_PER_UNIT))
            .ok_or(AmountError::OutOfRange(value))?;

        if !scaled.fract().is_zero() {
            return Err(AmountError::PrecisionLoss(value));
        }

        scaled
            .trunc()
            .to_u64()
            .map(Amount)
            .ok_or(AmountError::OutOfRange(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.0 / MICROS_PER_UNIT,
            self.0 % MICROS_PER_UNIT
        )
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s.trim())?;
        Self::from_decimal(value)
    }
}

/// Errors converting external representations into an [`Amount`].
#[derive(Debug, Error)]
pub enum AmountError {
    /// Input is not a decimal number.
    #[error("not a decimal amount: {0}")]
    Unparseable(#[from] rust_decimal::Error),

    /// Amounts are non-negative by construction.
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),

    /// More fractional digits than the 6 implied decimal places.
    #[error("amount {0} does not fit 6 decimal places")]
    PrecisionLoss(Decimal),

    /// Value does not fit the micro-unit range.
    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),
}
