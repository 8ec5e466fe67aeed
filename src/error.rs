use crate::config::ConfigError;
use crate::domain::{AddressParseError, ConversionError, FeeError};
use crate::engine::{InvariantError, LedgerError, PlanError, SettlementError, SolverError};
use crate::execution::ExecutionError;
use thiserror::Error;

/// Any error the crate can return, for callers that drive several stages.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid address: {0}")]
    Address(#[from] AddressParseError),
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),
    #[error("Fee error: {0}")]
    Fee(#[from] FeeError),
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),
    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantError),
}
