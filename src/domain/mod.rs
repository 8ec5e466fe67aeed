//! Value types for vault leverage math and swap settlement.
//!
//! This module provides:
//! - Exact numeric handling via the Decimal wrapper
//! - Conversion between Decimal amounts and on-chain base units
//! - Fee model, position snapshot and price quote inputs
//! - Leverage requests/results and swap instructions/outcomes

pub mod amount;
pub mod decimal;
pub mod fees;
pub mod leverage;
pub mod position;
pub mod primitives;
pub mod swap;

pub use amount::{from_base_units, to_base_units, ConversionError, ToBaseUnits, TokenAmount};
pub use decimal::Decimal;
pub use fees::{FeeCompounding, FeeError, FeeModel, FeeSide};
pub use leverage::{
    Adjustment, ExtraDeposit, LeverageDirection, LeverageRequest, LeverageResult, Withdrawal,
};
pub use position::{PositionSnapshot, PriceQuote};
pub use primitives::{
    Address, AddressParseError, BaseUnits, Payload, Token, TokenId, DEFAULT_PRECISION,
};
pub use swap::{SettlementOutcome, SwapInstruction};
