//! Boundary to the external liquidity source that actually performs a swap.

use crate::domain::{BaseUnits, SwapInstruction};
use std::fmt;
use thiserror::Error;

pub mod mock;

pub use mock::MockExecutionSink;

/// What the liquidity source reports after executing a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionReport {
    /// `from_token` actually pulled from the settlement agent (at most `amount_in`).
    pub amount_spent: BaseUnits,
    /// `to_token` delivered to the settlement agent.
    pub amount_received: BaseUnits,
}

/// Executes swap instructions against an external liquidity source.
///
/// Implementations are synchronous: a call either completes or fails, with no
/// partial effects the settlement agent has to undo.
pub trait ExecutionSink: Send + Sync + fmt::Debug {
    /// Execute `instruction` with `amount_in` (base units of `from_token`) available.
    fn execute(
        &self,
        instruction: &SwapInstruction,
        amount_in: BaseUnits,
    ) -> Result<ExecutionReport, ExecutionError>;
}

/// Error type for execution sink failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The liquidity source rejected or reverted the call.
    #[error("swap reverted: {0}")]
    Reverted(String),
    /// The payload could not be decoded for the given target.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// The report is inconsistent with the instruction.
    #[error("inconsistent execution report: {0}")]
    InconsistentReport(String),
    #[error("execution error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_display() {
        let err = ExecutionError::Reverted("STF".to_string());
        assert_eq!(err.to_string(), "swap reverted: STF");

        let err = ExecutionError::InvalidPayload("empty calldata".to_string());
        assert_eq!(err.to_string(), "invalid payload: empty calldata");

        let err = ExecutionError::InconsistentReport("spent more than provided".to_string());
        assert_eq!(
            err.to_string(),
            "inconsistent execution report: spent more than provided"
        );
    }
}
