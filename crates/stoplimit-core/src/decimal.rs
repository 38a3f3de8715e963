//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, so quantizing a value to
//! an exchange step or tick never suffers from binary floating-point error.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Round `value` down to the largest multiple of `unit` not exceeding it.
///
/// An absent or non-positive `unit` means the exchange imposes no granularity
/// and `value` is returned unchanged. Otherwise the floored multiple is
/// truncated to the precision implied by `unit` (see [`unit_precision`]),
/// widened to the unit's own scale for steps such as 0.5 that are not a power
/// of ten. The result is never rounded up.
///
/// # Errors
/// [`CoreError::Overflow`] if the multiple cannot be represented.
pub fn quantize_down(value: Decimal, unit: Option<Decimal>) -> Result<Decimal, CoreError> {
    let unit = match unit {
        Some(u) if u > Decimal::ZERO => u,
        _ => return Ok(value),
    };
    let overflow = || CoreError::Overflow(format!("{value} at unit {unit}"));

    // Remainder is exact; a quotient would round to 28 digits before flooring.
    let remainder = value.checked_rem(unit).ok_or_else(overflow)?;
    let mut floored = value.checked_sub(remainder).ok_or_else(overflow)?;
    if floored > value {
        // Negative remainder, or the subtraction itself rounded up.
        floored = floored.checked_sub(unit).ok_or_else(overflow)?;
    }

    let dp = unit_precision(unit).max(unit.normalize().scale());
    Ok(floored
        .round_dp_with_strategy(dp, RoundingStrategy::ToZero)
        .normalize())
}

/// Number of decimal digits implied by a step or tick size.
///
/// Derived as `round(-log10(unit))`, clamped to zero:
/// - 0.01 -> 2
/// - 0.001 -> 3
/// - 1 -> 0
/// - 10 -> 0
pub fn unit_precision(unit: Decimal) -> u32 {
    let Some(unit) = unit.to_f64() else {
        return 0;
    };
    if unit <= 0.0 {
        return 0;
    }
    let digits = (-unit.log10()).round();
    if digits <= 0.0 {
        0
    } else {
        digits as u32
    }
}

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Round down to the instrument's tick size.
    #[inline]
    pub fn quantize_down(&self, tick_size: Option<Price>) -> Result<Self, CoreError> {
        quantize_down(self.0, tick_size.map(|t| t.0)).map(Self)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Size/quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Round down to the instrument's step size.
    #[inline]
    pub fn quantize_down(&self, step_size: Option<Size>) -> Result<Self, CoreError> {
        quantize_down(self.0, step_size.map(|s| s.0)).map(Self)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}
