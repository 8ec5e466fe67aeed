//! Protocol and flash-loan fees as exact fractions.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error("{name} must be in [0, 1), got {value}")]
    OutOfRange { name: &'static str, value: Decimal },
}

/// Which amount a proportional fee rate refers to.
///
/// There is no default: every settlement states which side it charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeSide {
    /// The rate applies to the gross amount (received plus fee).
    Gross,
    /// The rate applies to the received amount itself.
    Net,
}

impl FeeSide {
    /// Fee owed on `received` at `rate`, or `None` if it does not fit in a Decimal.
    pub fn fee_for(&self, received: Decimal, rate: Decimal) -> Option<Decimal> {
        let fee = received.checked_mul(rate)?;
        match self {
            FeeSide::Gross => fee.checked_div(Decimal::one().checked_sub(rate)?),
            FeeSide::Net => Some(fee),
        }
    }
}

impl std::fmt::Display for FeeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeSide::Gross => write!(f, "gross"),
            FeeSide::Net => write!(f, "net"),
        }
    }
}

/// How the protocol and flash-loan fees combine when deleveraging.
///
/// Additive charges `1 + l + f` per unit of debt repaid. Compounded charges
/// `(1 + l)(1 + f) = 1 + l + f + l*f`, i.e. the protocol fee is also taken on
/// the flash-loan fee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeCompounding {
    #[default]
    Additive,
    Compounded,
}

/// Protocol fee and flash-loan fee, each a fraction in `[0, 1)`.
///
/// Deserialization runs the same range checks as [`FeeModel::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFeeModel")]
pub struct FeeModel {
    protocol_fee: Decimal,
    flash_loan_fee: Decimal,
}

#[derive(Deserialize)]
struct RawFeeModel {
    protocol_fee: Decimal,
    flash_loan_fee: Decimal,
}

impl TryFrom<RawFeeModel> for FeeModel {
    type Error = FeeError;

    fn try_from(raw: RawFeeModel) -> Result<Self, Self::Error> {
        FeeModel::new(raw.protocol_fee, raw.flash_loan_fee)
    }
}

impl FeeModel {
    pub fn new(protocol_fee: Decimal, flash_loan_fee: Decimal) -> Result<Self, FeeError> {
        if !protocol_fee.is_unit_fraction() {
            return Err(FeeError::OutOfRange {
                name: "protocol_fee",
                value: protocol_fee,
            });
        }
        if !flash_loan_fee.is_unit_fraction() {
            return Err(FeeError::OutOfRange {
                name: "flash_loan_fee",
                value: flash_loan_fee,
            });
        }
        Ok(FeeModel {
            protocol_fee,
            flash_loan_fee,
        })
    }

    /// No fees at all.
    pub fn free() -> Self {
        FeeModel {
            protocol_fee: Decimal::zero(),
            flash_loan_fee: Decimal::zero(),
        }
    }

    pub fn protocol_fee(&self) -> Decimal {
        self.protocol_fee
    }

    pub fn flash_loan_fee(&self) -> Decimal {
        self.flash_loan_fee
    }

    /// `amount * fee`.
    pub fn apply(amount: Decimal, fee: Decimal) -> Decimal {
        amount * fee
    }

    /// Protocol fee owed on `amount`.
    pub fn protocol_fee_on(&self, amount: Decimal) -> Decimal {
        Self::apply(amount, self.protocol_fee)
    }

    /// Flash-loan fee owed on `amount`.
    pub fn flash_loan_fee_on(&self, amount: Decimal) -> Decimal {
        Self::apply(amount, self.flash_loan_fee)
    }

    /// `1 - f`: share of a swap's input that survives the protocol fee.
    pub fn after_protocol_fee(&self) -> Decimal {
        Decimal::one() - self.protocol_fee
    }

    /// `1 + l`: debt owed per unit flash-borrowed.
    pub fn flash_loan_repayment(&self) -> Decimal {
        Decimal::one() + self.flash_loan_fee
    }

    /// Cost factor per unit of debt repaid when deleveraging.
    pub fn decrease_cost_factor(&self, compounding: FeeCompounding) -> Decimal {
        match compounding {
            FeeCompounding::Additive => Decimal::one() + self.flash_loan_fee + self.protocol_fee,
            FeeCompounding::Compounded => {
                (Decimal::one() + self.flash_loan_fee) * (Decimal::one() + self.protocol_fee)
            }
        }
    }
}
