//! Leverage requests and solved results.

use crate::domain::{Decimal, FeeModel, PositionSnapshot, PriceQuote};
use serde::{Deserialize, Serialize};

/// Which way the position moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeverageDirection {
    /// Borrow debt-token and buy collateral.
    Increase,
    /// Sell collateral and repay debt.
    Decrease,
}

impl std::fmt::Display for LeverageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeverageDirection::Increase => write!(f, "increase"),
            LeverageDirection::Decrease => write!(f, "decrease"),
        }
    }
}

/// Funds the owner adds alongside an increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "lowercase")]
pub enum ExtraDeposit {
    #[default]
    None,
    /// Collateral-token added straight to the vault.
    Collateral(Decimal),
    /// Debt-token swapped to collateral together with the borrowed amount.
    Debt(Decimal),
}

impl ExtraDeposit {
    pub fn amount(&self) -> Decimal {
        match self {
            ExtraDeposit::None => Decimal::zero(),
            ExtraDeposit::Collateral(amount) | ExtraDeposit::Debt(amount) => *amount,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ExtraDeposit::None)
    }
}

/// Funds the owner takes out alongside a decrease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "lowercase")]
pub enum Withdrawal {
    #[default]
    None,
    /// Collateral-token taken straight out of the vault.
    Collateral(Decimal),
    /// Debt-token raised by selling extra collateral.
    Debt(Decimal),
}

impl Withdrawal {
    pub fn amount(&self) -> Decimal {
        match self {
            Withdrawal::None => Decimal::zero(),
            Withdrawal::Collateral(amount) | Withdrawal::Debt(amount) => *amount,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Withdrawal::None)
    }
}

/// Everything the solver needs to move one vault to a target ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeverageRequest {
    pub position: PositionSnapshot,
    pub quote: PriceQuote,
    pub fees: FeeModel,
    /// Desired collateralization ratio after the move (e.g. 3 for 300%).
    pub target_ratio: Decimal,
    /// Tolerated adverse price move, a fraction in `[0, 1)`.
    pub slippage: Decimal,
    pub extra_deposit: ExtraDeposit,
    pub withdrawal: Withdrawal,
}

impl LeverageRequest {
    pub fn new(
        position: PositionSnapshot,
        quote: PriceQuote,
        fees: FeeModel,
        target_ratio: Decimal,
        slippage: Decimal,
    ) -> Self {
        Self {
            position,
            quote,
            fees,
            target_ratio,
            slippage,
            extra_deposit: ExtraDeposit::None,
            withdrawal: Withdrawal::None,
        }
    }

    pub fn with_deposit(mut self, deposit: ExtraDeposit) -> Self {
        self.extra_deposit = deposit;
        self
    }

    pub fn with_withdrawal(mut self, withdrawal: Withdrawal) -> Self {
        self.withdrawal = withdrawal;
        self
    }
}

/// Collateral moved by a deposit or withdrawal, next to the leveraged swap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Adjustment {
    #[default]
    None,
    DepositCollateral {
        amount: Decimal,
    },
    /// `collateral_bought = amount * (1 - f) / P_eff`.
    DepositDebt {
        amount: Decimal,
        collateral_bought: Decimal,
    },
    WithdrawCollateral {
        amount: Decimal,
    },
    /// `collateral_sold = amount * (1 + f) / P_eff`.
    WithdrawDebt {
        amount: Decimal,
        collateral_sold: Decimal,
    },
}

impl Adjustment {
    /// Collateral entering the vault besides `collateral_delta`.
    pub fn collateral_added(&self) -> Decimal {
        match self {
            Adjustment::DepositCollateral { amount } => *amount,
            Adjustment::DepositDebt {
                collateral_bought, ..
            } => *collateral_bought,
            _ => Decimal::zero(),
        }
    }

    /// Collateral leaving the vault besides `collateral_delta`.
    pub fn collateral_removed(&self) -> Decimal {
        match self {
            Adjustment::WithdrawCollateral { amount } => *amount,
            Adjustment::WithdrawDebt {
                collateral_sold, ..
            } => *collateral_sold,
            _ => Decimal::zero(),
        }
    }

    /// Token amount fed into the swap besides the leveraged amount.
    pub fn swap_input(&self) -> Decimal {
        match self {
            Adjustment::DepositDebt { amount, .. } => *amount,
            Adjustment::WithdrawDebt {
                collateral_sold, ..
            } => *collateral_sold,
            _ => Decimal::zero(),
        }
    }
}

/// Solved debt and collateral movement for one leverage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageResult {
    pub direction: LeverageDirection,
    /// Debt-token to borrow (increase) or repay (decrease).
    pub debt_delta: Decimal,
    /// Collateral-token bought (increase) or sold (decrease) for `debt_delta`.
    pub collateral_delta: Decimal,
    /// Worst-case execution price the deltas were solved at.
    pub execution_price: Decimal,
    pub adjustment: Adjustment,
    /// The decrease repays the whole debt.
    pub closes_position: bool,
}

impl LeverageResult {
    /// Total amount handed to the swap: debt-token when increasing, collateral when decreasing.
    pub fn swap_amount_in(&self) -> Decimal {
        match self.direction {
            LeverageDirection::Increase => self.debt_delta + self.adjustment.swap_input(),
            LeverageDirection::Decrease => self.collateral_delta + self.adjustment.swap_input(),
        }
    }

    /// Swap output before fees if execution lands exactly on `execution_price`.
    pub fn worst_case_amount_out(&self) -> Decimal {
        match self.direction {
            LeverageDirection::Increase => self.swap_amount_in() / self.execution_price,
            LeverageDirection::Decrease => self.swap_amount_in() * self.execution_price,
        }
    }
}
