//! Closed-form solvers for moving a vault to a target collateralization ratio.
//!
//! Notation: `C` collateral, `D` debt, `P_o` oracle price, `P_m` market price,
//! `f` protocol fee, `l` flash-loan fee, `s` slippage, `R` target ratio.
//!
//! Increase (borrow `Y` debt-token, swap it to `X` collateral at `P_eff = P_m(1+s)`):
//!
//! ```text
//! (C + X) * P_o = R * (D + Y(1+l)),   X = (Y + d)(1-f) / P_eff
//! Y = [P_eff(C*P_o - R*D) + P_o*d(1-f)] / [P_eff*R(1+l) - P_o(1-f)]
//! ```
//!
//! Decrease (sell `X` collateral at `P_eff = P_m(1-s)`, repay `Y` debt-token):
//!
//! ```text
//! (C - X) * P_o = R * (D - Y),   X = (Y*k + w(1+f)) / P_eff,   k = 1 + l + f
//! Y = [C*P_o*P_eff - R*D*P_eff - P_o*w(1+f)] / [P_o*k - P_eff*R]
//! ```
//!
//! `d` is an optional debt-token deposit and `w` an optional debt-token
//! withdrawal; collateral deposits/withdrawals shift `C` before solving.

use crate::domain::{
    Adjustment, Decimal, ExtraDeposit, FeeCompounding, LeverageDirection, LeverageRequest,
    LeverageResult, Withdrawal,
};
use rust_decimal_macros::dec;
use thiserror::Error;

/// Default bound on how close a solver denominator may get to zero.
pub const DEFAULT_EPSILON: Decimal = Decimal::from_inner(dec!(0.000000000001));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("invalid {field} = {value}: {reason}")]
    InvalidInput {
        field: &'static str,
        value: Decimal,
        reason: &'static str,
    },
    #[error(
        "target ratio {target_ratio} is infeasible: denominator {denominator}, breakeven ratio {breakeven_ratio}"
    )]
    InfeasibleTargetRatio {
        target_ratio: Decimal,
        denominator: Decimal,
        breakeven_ratio: Decimal,
    },
    #[error(
        "target ratio {target_ratio} does not call for a {direction}: debt delta {debt_delta}, collateral delta {collateral_delta}"
    )]
    NegativeDelta {
        direction: LeverageDirection,
        target_ratio: Decimal,
        debt_delta: Decimal,
        collateral_delta: Decimal,
    },
    #[error(
        "selling all {collateral} collateral repays {repayable} of {debt} debt, short by {shortfall}"
    )]
    InsufficientCollateralToClose {
        collateral: Decimal,
        debt: Decimal,
        repayable: Decimal,
        shortfall: Decimal,
    },
    #[error("arithmetic overflow computing {term} for a {direction}")]
    Overflow {
        direction: LeverageDirection,
        term: &'static str,
    },
}

/// Solves increase/decrease requests in one closed-form step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeverageSolver {
    epsilon: Decimal,
    compounding: FeeCompounding,
}

impl Default for LeverageSolver {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            compounding: FeeCompounding::Additive,
        }
    }
}

impl LeverageSolver {
    pub fn new(epsilon: Decimal, compounding: FeeCompounding) -> Self {
        Self {
            epsilon: epsilon.abs(),
            compounding,
        }
    }

    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    pub fn compounding(&self) -> FeeCompounding {
        self.compounding
    }

    pub fn solve(
        &self,
        request: &LeverageRequest,
        direction: LeverageDirection,
    ) -> Result<LeverageResult, SolverError> {
        match direction {
            LeverageDirection::Increase => self.increase(request),
            LeverageDirection::Decrease => self.decrease(request),
        }
    }

    /// Ratio at which the increase denominator vanishes:
    /// `P_o(1-f) / (P_eff(1+l))`. Targets at or below it cannot be reached.
    pub fn increase_breakeven_ratio(request: &LeverageRequest) -> Result<Decimal, SolverError> {
        let direction = LeverageDirection::Increase;
        let p_eff = checked(
            request
                .quote
                .market_price
                .checked_mul(Decimal::one() + request.slippage),
            direction,
            "execution_price",
        )?;
        checked(
            request
                .quote
                .oracle_price
                .checked_mul(request.fees.after_protocol_fee())
                .zip(p_eff.checked_mul(request.fees.flash_loan_repayment()))
                .and_then(|(top, bottom)| top.checked_div(bottom)),
            direction,
            "breakeven_ratio",
        )
    }

    /// Borrow debt-token and buy collateral until the vault sits at `target_ratio`.
    pub fn increase(&self, request: &LeverageRequest) -> Result<LeverageResult, SolverError> {
        validate_common(request)?;
        if !request.withdrawal.is_none() {
            return Err(SolverError::InvalidInput {
                field: "withdrawal",
                value: request.withdrawal.amount(),
                reason: "withdrawals only apply when decreasing",
            });
        }

        let direction = LeverageDirection::Increase;
        let fees = &request.fees;
        let r = request.target_ratio;
        let p_o = request.quote.oracle_price;
        let p_eff = checked(
            request
                .quote
                .market_price
                .checked_mul(Decimal::one() + request.slippage),
            direction,
            "execution_price",
        )?;
        let net = fees.after_protocol_fee();

        let (collateral, debt_deposit) = match request.extra_deposit {
            ExtraDeposit::None => (request.position.collateral, Decimal::zero()),
            ExtraDeposit::Collateral(amount) => (
                checked(
                    request.position.collateral.checked_add(amount),
                    direction,
                    "collateral",
                )?,
                Decimal::zero(),
            ),
            ExtraDeposit::Debt(amount) => (request.position.collateral, amount),
        };

        // P_eff*R(1+l) - P_o(1-f)
        let denominator = checked(
            p_eff
                .checked_mul(r)
                .and_then(|v| v.checked_mul(fees.flash_loan_repayment()))
                .zip(p_o.checked_mul(net))
                .and_then(|(a, b)| a.checked_sub(b)),
            direction,
            "denominator",
        )?;
        if denominator <= self.epsilon || r <= Decimal::one() {
            let breakeven_ratio = Self::increase_breakeven_ratio(request)?;
            tracing::warn!(
                target_ratio = %r,
                denominator = %denominator,
                breakeven_ratio = %breakeven_ratio,
                "increase target ratio is infeasible"
            );
            return Err(SolverError::InfeasibleTargetRatio {
                target_ratio: r,
                denominator,
                breakeven_ratio,
            });
        }

        // P_eff(C*P_o - R*D) + P_o*d(1-f)
        let numerator = checked(
            collateral
                .checked_mul(p_o)
                .zip(r.checked_mul(request.position.debt))
                .and_then(|(a, b)| a.checked_sub(b))
                .and_then(|v| v.checked_mul(p_eff))
                .zip(p_o.checked_mul(debt_deposit).and_then(|v| v.checked_mul(net)))
                .and_then(|(a, b)| a.checked_add(b)),
            direction,
            "numerator",
        )?;
        let debt_delta = checked(numerator.checked_div(denominator), direction, "debt_delta")?;
        let collateral_delta = checked(
            debt_delta.checked_mul(net).and_then(|v| v.checked_div(p_eff)),
            direction,
            "collateral_delta",
        )?;

        if debt_delta.is_negative() || collateral_delta.is_negative() {
            return Err(SolverError::NegativeDelta {
                direction,
                target_ratio: r,
                debt_delta,
                collateral_delta,
            });
        }

        let adjustment = match request.extra_deposit {
            ExtraDeposit::None => Adjustment::None,
            ExtraDeposit::Collateral(amount) => Adjustment::DepositCollateral { amount },
            ExtraDeposit::Debt(amount) => Adjustment::DepositDebt {
                amount,
                collateral_bought: checked(
                    amount.checked_mul(net).and_then(|v| v.checked_div(p_eff)),
                    direction,
                    "collateral_bought",
                )?,
            },
        };

        tracing::debug!(
            target_ratio = %r,
            execution_price = %p_eff,
            debt_delta = %debt_delta,
            collateral_delta = %collateral_delta,
            "increase solved"
        );

        Ok(LeverageResult {
            direction,
            debt_delta,
            collateral_delta,
            execution_price: p_eff,
            adjustment,
            closes_position: false,
        })
    }

    /// Sell collateral and repay debt until the vault sits at `target_ratio`.
    ///
    /// A target of zero closes the vault: all collateral is sold. If that
    /// cannot repay the whole debt the close fails with the shortfall.
    pub fn decrease(&self, request: &LeverageRequest) -> Result<LeverageResult, SolverError> {
        validate_common(request)?;
        if !request.extra_deposit.is_none() {
            return Err(SolverError::InvalidInput {
                field: "extra_deposit",
                value: request.extra_deposit.amount(),
                reason: "deposits only apply when increasing",
            });
        }

        let direction = LeverageDirection::Decrease;
        let fees = &request.fees;
        let r = request.target_ratio;
        let debt = request.position.debt;
        let p_o = request.quote.oracle_price;
        let p_eff = checked(
            request
                .quote
                .market_price
                .checked_mul(Decimal::one() - request.slippage),
            direction,
            "execution_price",
        )?;
        let k = fees.decrease_cost_factor(self.compounding);
        let gross_up = Decimal::one() + fees.protocol_fee();

        let (collateral, debt_withdrawal) = match request.withdrawal {
            Withdrawal::None => (request.position.collateral, Decimal::zero()),
            Withdrawal::Collateral(amount) => {
                if amount > request.position.collateral {
                    return Err(SolverError::InvalidInput {
                        field: "withdrawal",
                        value: amount,
                        reason: "exceeds the vault's collateral",
                    });
                }
                (request.position.collateral - amount, Decimal::zero())
            }
            Withdrawal::Debt(amount) => (request.position.collateral, amount),
        };

        // P_o*k - P_eff*R
        let denominator = checked(
            p_o.checked_mul(k)
                .zip(p_eff.checked_mul(r))
                .and_then(|(a, b)| a.checked_sub(b)),
            direction,
            "denominator",
        )?;
        if denominator.abs() <= self.epsilon {
            let breakeven_ratio = checked(
                p_o.checked_mul(k).and_then(|v| v.checked_div(p_eff)),
                direction,
                "breakeven_ratio",
            )?;
            tracing::warn!(
                target_ratio = %r,
                denominator = %denominator,
                breakeven_ratio = %breakeven_ratio,
                "decrease target ratio is infeasible"
            );
            return Err(SolverError::InfeasibleTargetRatio {
                target_ratio: r,
                denominator,
                breakeven_ratio,
            });
        }

        // C*P_o*P_eff - R*D*P_eff - P_o*w(1+f)
        let numerator = checked(
            collateral
                .checked_mul(p_o)
                .zip(r.checked_mul(debt))
                .and_then(|(a, b)| a.checked_sub(b))
                .and_then(|v| v.checked_mul(p_eff))
                .zip(
                    p_o.checked_mul(debt_withdrawal)
                        .and_then(|v| v.checked_mul(gross_up)),
                )
                .and_then(|(a, b)| a.checked_sub(b)),
            direction,
            "numerator",
        )?;
        let debt_delta = checked(numerator.checked_div(denominator), direction, "debt_delta")?;
        let collateral_delta = checked(
            debt_delta.checked_mul(k).and_then(|v| v.checked_div(p_eff)),
            direction,
            "collateral_delta",
        )?;

        if debt_delta.is_negative() || collateral_delta.is_negative() {
            return Err(SolverError::NegativeDelta {
                direction,
                target_ratio: r,
                debt_delta,
                collateral_delta,
            });
        }

        if r.is_zero() && debt_delta < debt {
            let shortfall = debt - debt_delta;
            tracing::warn!(
                collateral = %collateral,
                debt = %debt,
                repayable = %debt_delta,
                shortfall = %shortfall,
                "vault cannot be closed: collateral does not cover the debt"
            );
            return Err(SolverError::InsufficientCollateralToClose {
                collateral,
                debt,
                repayable: debt_delta,
                shortfall,
            });
        }

        let adjustment = match request.withdrawal {
            Withdrawal::None => Adjustment::None,
            Withdrawal::Collateral(amount) => Adjustment::WithdrawCollateral { amount },
            Withdrawal::Debt(amount) => Adjustment::WithdrawDebt {
                amount,
                collateral_sold: checked(
                    amount.checked_mul(gross_up).and_then(|v| v.checked_div(p_eff)),
                    direction,
                    "collateral_sold",
                )?,
            },
        };
        let closes_position = debt_delta >= debt;

        tracing::debug!(
            target_ratio = %r,
            execution_price = %p_eff,
            debt_delta = %debt_delta,
            collateral_delta = %collateral_delta,
            closes_position,
            "decrease solved"
        );

        Ok(LeverageResult {
            direction,
            debt_delta,
            collateral_delta,
            execution_price: p_eff,
            adjustment,
            closes_position,
        })
    }
}

fn checked(
    value: Option<Decimal>,
    direction: LeverageDirection,
    term: &'static str,
) -> Result<Decimal, SolverError> {
    value.ok_or(SolverError::Overflow { direction, term })
}

fn validate_common(request: &LeverageRequest) -> Result<(), SolverError> {
    let checks: [(&'static str, Decimal, bool, &'static str); 6] = [
        (
            "oracle_price",
            request.quote.oracle_price,
            request.quote.oracle_price.is_positive(),
            "must be positive",
        ),
        (
            "market_price",
            request.quote.market_price,
            request.quote.market_price.is_positive(),
            "must be positive",
        ),
        (
            "collateral",
            request.position.collateral,
            !request.position.collateral.is_negative(),
            "must not be negative",
        ),
        (
            "debt",
            request.position.debt,
            !request.position.debt.is_negative(),
            "must not be negative",
        ),
        (
            "target_ratio",
            request.target_ratio,
            !request.target_ratio.is_negative(),
            "must not be negative",
        ),
        (
            "slippage",
            request.slippage,
            request.slippage.is_unit_fraction(),
            "must be in [0, 1)",
        ),
    ];

    for (field, value, ok, reason) in checks {
        if !ok {
            return Err(SolverError::InvalidInput {
                field,
                value,
                reason,
            });
        }
    }

    if request.extra_deposit.amount().is_negative() {
        return Err(SolverError::InvalidInput {
            field: "extra_deposit",
            value: request.extra_deposit.amount(),
            reason: "must not be negative",
        });
    }
    if request.withdrawal.amount().is_negative() {
        return Err(SolverError::InvalidInput {
            field: "withdrawal",
            value: request.withdrawal.amount(),
            reason: "must not be negative",
        });
    }

    Ok(())
}

/// Solve an increase with the default solver.
pub fn solve_increase(request: &LeverageRequest) -> Result<LeverageResult, SolverError> {
    LeverageSolver::default().increase(request)
}

/// Solve a decrease with the default solver.
pub fn solve_decrease(request: &LeverageRequest) -> Result<LeverageResult, SolverError> {
    LeverageSolver::default().decrease(request)
}
