pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod execution;
pub mod logging;

pub use config::{Config, ConfigError};
pub use domain::{
    from_base_units, to_base_units, Address, BaseUnits, Decimal, FeeModel, FeeSide,
    LeverageDirection, LeverageRequest, LeverageResult, PositionSnapshot, PriceQuote,
    SwapInstruction, Token, TokenAmount,
};
pub use engine::{
    assert_ratio_within, LeverageSolver, SettlementAgent, SettlementState, SwapPlanner,
    TokenLedger,
};
pub use error::CoreError;
pub use execution::{ExecutionSink, MockExecutionSink};
pub use logging::init_tracing;
