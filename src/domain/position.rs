//! Vault state and price inputs.

use crate::domain::amount::{from_base_units, ConversionError};
use crate::domain::{BaseUnits, Decimal, FeeModel, LeverageDirection, LeverageResult};
use serde::{Deserialize, Serialize};

/// Collateral and debt of one vault at a point in time.
///
/// Snapshots are never mutated; applying a leverage move produces a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Collateral-token amount locked in the vault.
    pub collateral: Decimal,
    /// Debt-token amount owed by the vault.
    pub debt: Decimal,
}

impl PositionSnapshot {
    pub fn new(collateral: Decimal, debt: Decimal) -> Self {
        Self { collateral, debt }
    }

    /// An empty vault.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize a position reported in native token units.
    pub fn from_base_units(
        collateral: BaseUnits,
        collateral_precision: u32,
        debt: BaseUnits,
        debt_precision: u32,
    ) -> Result<Self, ConversionError> {
        Ok(Self {
            collateral: from_base_units(collateral, collateral_precision)?,
            debt: from_base_units(debt, debt_precision)?,
        })
    }

    pub fn has_debt(&self) -> bool {
        self.debt.is_positive()
    }

    /// Snapshot after a solved move has been executed at its worst-case price.
    pub fn apply(&self, result: &LeverageResult, fees: &FeeModel) -> PositionSnapshot {
        match result.direction {
            LeverageDirection::Increase => self.after_increase(result, fees),
            LeverageDirection::Decrease => self.after_decrease(result),
        }
    }

    /// The borrowed debt is owed together with the flash-loan fee.
    pub fn after_increase(&self, result: &LeverageResult, fees: &FeeModel) -> PositionSnapshot {
        PositionSnapshot {
            collateral: self.collateral
                + result.collateral_delta
                + result.adjustment.collateral_added(),
            debt: self.debt + result.debt_delta * fees.flash_loan_repayment(),
        }
    }

    /// Repaying more than is owed closes the debt; the excess goes back to the owner.
    pub fn after_decrease(&self, result: &LeverageResult) -> PositionSnapshot {
        let collateral =
            self.collateral - result.collateral_delta - result.adjustment.collateral_removed();
        let debt = self.debt - result.debt_delta;
        PositionSnapshot {
            collateral: if collateral.is_negative() {
                Decimal::zero()
            } else {
                collateral
            },
            debt: if debt.is_negative() {
                Decimal::zero()
            } else {
                debt
            },
        }
    }
}

/// Oracle and market price, both in debt-token per collateral-token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// The protocol's canonical risk price.
    pub oracle_price: Decimal,
    /// Price the swap is expected to execute at.
    pub market_price: Decimal,
}

impl PriceQuote {
    pub fn new(oracle_price: Decimal, market_price: Decimal) -> Self {
        Self {
            oracle_price,
            market_price,
        }
    }

    /// Oracle and market agree.
    pub fn flat(price: Decimal) -> Self {
        Self::new(price, price)
    }
}
