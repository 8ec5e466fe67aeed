//! Turns a solved leverage move into the swap instruction that realizes it.

use super::solver::{LeverageSolver, SolverError};
use crate::domain::{
    Address, LeverageDirection, LeverageRequest, LeverageResult, Payload, SwapInstruction, Token,
};
use thiserror::Error;

/// Where the market quote provider says the swap should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRoute {
    pub target: Address,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("the solved {0} moves no funds")]
    NothingToSwap(LeverageDirection),
}

/// Builds swap instructions for one collateral/debt token pair.
#[derive(Debug, Clone)]
pub struct SwapPlanner {
    collateral: Token,
    debt: Token,
    solver: LeverageSolver,
}

impl SwapPlanner {
    pub fn new(collateral: Token, debt: Token, solver: LeverageSolver) -> Self {
        Self {
            collateral,
            debt,
            solver,
        }
    }

    pub fn collateral(&self) -> &Token {
        &self.collateral
    }

    pub fn debt(&self) -> &Token {
        &self.debt
    }

    /// Instruction for an already solved move.
    ///
    /// `min_amount_out` is the output at the worst-case execution price, cut
    /// down to the output token's precision.
    pub fn plan(
        &self,
        result: &LeverageResult,
        route: SwapRoute,
    ) -> Result<SwapInstruction, PlanError> {
        let (from, to) = match result.direction {
            LeverageDirection::Increase => (&self.debt, &self.collateral),
            LeverageDirection::Decrease => (&self.collateral, &self.debt),
        };

        let amount_in = result.swap_amount_in();
        if !amount_in.is_positive() {
            return Err(PlanError::NothingToSwap(result.direction));
        }
        let min_amount_out = result.worst_case_amount_out().round_down(to.precision);

        tracing::debug!(
            direction = %result.direction,
            from = %from.id,
            to = %to.id,
            amount_in = %amount_in,
            min_amount_out = %min_amount_out,
            "swap planned"
        );

        Ok(SwapInstruction::new(
            from,
            to,
            amount_in,
            min_amount_out,
            route.target,
            route.payload,
        ))
    }

    /// Solve `request` in `direction` and plan its swap.
    pub fn solve_and_plan(
        &self,
        request: &LeverageRequest,
        direction: LeverageDirection,
        route: SwapRoute,
    ) -> Result<(LeverageResult, SwapInstruction), PlanError> {
        let result = self.solver.solve(request, direction)?;
        let instruction = self.plan(&result, route)?;
        Ok((result, instruction))
    }
}
