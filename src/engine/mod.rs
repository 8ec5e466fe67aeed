//! Pure computation engine: solving, planning, settling and checking positions.

pub mod invariant;
pub mod ledger;
pub mod planner;
pub mod settlement;
pub mod solver;

pub use invariant::{assert_ratio_within, current_ratio, relative_deviation, InvariantError};
pub use ledger::{LedgerError, TokenLedger};
pub use planner::{PlanError, SwapPlanner, SwapRoute};
pub use settlement::{
    Settlement, SettlementAgent, SettlementError, SettlementRecord, SettlementState,
};
pub use solver::{solve_decrease, solve_increase, LeverageSolver, SolverError, DEFAULT_EPSILON};
