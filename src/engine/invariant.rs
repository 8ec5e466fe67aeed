//! Collateralization ratio and post-condition checks on position snapshots.
//!
//! Verification only; the solver never reads these.

use crate::domain::{Decimal, PositionSnapshot};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    /// The ratio is unbounded; callers treat this as fully deleveraged.
    #[error("collateralization ratio is undefined for zero debt (collateral {collateral})")]
    DivisionByZeroDebt { collateral: Decimal },
    #[error("ratio {actual} is outside {tolerance} of target {target}")]
    RatioOutOfTolerance {
        actual: Decimal,
        target: Decimal,
        tolerance: Decimal,
    },
}

/// `collateral * price / debt`.
pub fn current_ratio(position: &PositionSnapshot, price: Decimal) -> Result<Decimal, InvariantError> {
    if position.debt.is_zero() {
        return Err(InvariantError::DivisionByZeroDebt {
            collateral: position.collateral,
        });
    }
    Ok(position.collateral * price / position.debt)
}

/// Relative distance `|actual - target| / target`.
pub fn relative_deviation(actual: Decimal, target: Decimal) -> Decimal {
    if target.is_zero() {
        return actual.abs();
    }
    ((actual - target) / target).abs()
}

/// Fails unless the position's ratio is within `tolerance` (relative) of `target`.
pub fn assert_ratio_within(
    position: &PositionSnapshot,
    price: Decimal,
    target: Decimal,
    tolerance: Decimal,
) -> Result<Decimal, InvariantError> {
    let actual = current_ratio(position, price)?;
    if relative_deviation(actual, target) > tolerance {
        tracing::warn!(
            actual = %actual,
            target = %target,
            tolerance = %tolerance,
            "position ratio outside tolerance"
        );
        return Err(InvariantError::RatioOutOfTolerance {
            actual,
            target,
            tolerance,
        });
    }
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_current_ratio() {
        let position = PositionSnapshot::new(d("100"), d("100000"));
        assert_eq!(current_ratio(&position, d("2000")).unwrap(), d("2"));
    }

    #[test]
    fn test_zero_debt_is_division_by_zero() {
        let position = PositionSnapshot::new(d("5"), Decimal::zero());
        assert_eq!(
            current_ratio(&position, d("2000")),
            Err(InvariantError::DivisionByZeroDebt { collateral: d("5") })
        );
    }

    #[test]
    fn test_assert_ratio_within_tolerance() {
        let position = PositionSnapshot::new(d("100"), d("66500"));
        // 200000 / 66500 = 3.0075..., 0.25% off target 3.
        let actual = assert_ratio_within(&position, d("2000"), d("3"), d("0.005")).unwrap();
        assert!(actual > d("3"));
    }

    #[test]
    fn test_assert_ratio_outside_tolerance() {
        let position = PositionSnapshot::new(d("100"), d("60000"));
        let err = assert_ratio_within(&position, d("2000"), d("3"), d("0.005")).unwrap_err();
        assert!(matches!(err, InvariantError::RatioOutOfTolerance { .. }));
    }

    #[test]
    fn test_relative_deviation() {
        assert_eq!(relative_deviation(d("3.03"), d("3")), d("0.01"));
        assert_eq!(relative_deviation(d("2.97"), d("3")), d("0.01"));
    }
}
