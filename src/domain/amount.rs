//! Token amounts and conversion to/from the on-chain integer representation.
//!
//! Conversion to base units rounds half-up exactly once, at the integer
//! boundary. Scaling is done on the integer mantissa so large base-unit values
//! never pass through an intermediate decimal multiplication.

use crate::domain::decimal::MAX_SCALE;
use crate::domain::primitives::{BaseUnits, DEFAULT_PRECISION};
use crate::domain::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest precision the converter accepts.
pub const MAX_PRECISION: u32 = MAX_SCALE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("invalid precision {precision}: must be between 0 and {max}")]
    InvalidPrecision { precision: u32, max: u32 },
    #[error("amount {amount} is negative; on-chain amounts are unsigned")]
    NegativeAmount { amount: Decimal },
    #[error("amount {amount} does not fit the integer representation at precision {precision}")]
    Overflow { amount: String, precision: u32 },
}

fn check_precision(precision: u32) -> Result<(), ConversionError> {
    if precision > MAX_PRECISION {
        return Err(ConversionError::InvalidPrecision {
            precision,
            max: MAX_PRECISION,
        });
    }
    Ok(())
}

/// Values that can be expressed as on-chain base units at a given precision.
pub trait ToBaseUnits {
    fn to_base_units(&self, precision: u32) -> Result<BaseUnits, ConversionError>;
}

impl ToBaseUnits for Decimal {
    fn to_base_units(&self, precision: u32) -> Result<BaseUnits, ConversionError> {
        check_precision(precision)?;

        let rounded = self.round_half_up(precision);
        if rounded.is_negative() {
            return Err(ConversionError::NegativeAmount { amount: *self });
        }

        let overflow = || ConversionError::Overflow {
            amount: self.to_canonical_string(),
            precision,
        };

        // After rounding the scale never exceeds `precision`.
        let shift = precision - rounded.scale().min(precision);
        let factor = 10i128.checked_pow(shift).ok_or_else(overflow)?;
        let raw = rounded
            .mantissa()
            .checked_mul(factor)
            .ok_or_else(overflow)?;

        u128::try_from(raw).map(BaseUnits).map_err(|_| overflow())
    }
}

/// Already in base units: identity, as long as the precision is valid.
impl ToBaseUnits for BaseUnits {
    fn to_base_units(&self, precision: u32) -> Result<BaseUnits, ConversionError> {
        check_precision(precision)?;
        Ok(*self)
    }
}

/// Convert an amount to its integer representation (`round(amount * 10^precision)`).
pub fn to_base_units<A: ToBaseUnits + ?Sized>(
    amount: &A,
    precision: u32,
) -> Result<BaseUnits, ConversionError> {
    amount.to_base_units(precision)
}

/// Convert an integer representation back to a Decimal (`raw / 10^precision`).
pub fn from_base_units(raw: BaseUnits, precision: u32) -> Result<Decimal, ConversionError> {
    check_precision(precision)?;

    let overflow = || ConversionError::Overflow {
        amount: raw.to_string(),
        precision,
    };
    let mantissa = i128::try_from(raw.as_u128()).map_err(|_| overflow())?;
    Decimal::try_from_scaled(mantissa, precision).ok_or_else(overflow)
}

/// A Decimal amount paired with the precision of its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    pub amount: Decimal,
    pub precision: u32,
}

impl TokenAmount {
    pub fn new(amount: Decimal, precision: u32) -> Self {
        TokenAmount { amount, precision }
    }

    /// Amount with the default 18 decimal places.
    pub fn with_default_precision(amount: Decimal) -> Self {
        TokenAmount::new(amount, DEFAULT_PRECISION)
    }

    pub fn zero(precision: u32) -> Self {
        TokenAmount::new(Decimal::zero(), precision)
    }

    /// Build from an on-chain integer amount.
    pub fn from_base_units(raw: BaseUnits, precision: u32) -> Result<Self, ConversionError> {
        Ok(TokenAmount::new(from_base_units(raw, precision)?, precision))
    }

    /// Integer representation of this amount at its own precision.
    pub fn base_units(&self) -> Result<BaseUnits, ConversionError> {
        self.amount.to_base_units(self.precision)
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}dp)", self.amount, self.precision)
    }
}
