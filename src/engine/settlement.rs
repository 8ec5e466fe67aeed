//! Swap settlement: authorization, funding, execution, slippage guard, fee
//! extraction and surplus return as one atomic transition.
//!
//! Every step runs against a staged copy of the ledger. The copy replaces the
//! live ledger only when all steps succeed, so a rejected settlement leaves
//! balances and allowances exactly as they were.

use super::ledger::{LedgerError, TokenLedger};
use crate::domain::{
    to_base_units, Address, BaseUnits, ConversionError, Decimal, FeeModel,
    FeeSide, SettlementOutcome, SwapInstruction, TokenAmount, TokenId,
};
use crate::execution::{ExecutionError, ExecutionSink};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("caller {caller} is not authorized")]
    UnauthorizedCaller { caller: Address },
    #[error("allowance {allowance} of {token} is below amount in {amount_in}")]
    InsufficientAllowance {
        token: TokenId,
        allowance: BaseUnits,
        amount_in: BaseUnits,
    },
    #[error("balance {balance} of {token} is below amount in {amount_in}")]
    InsufficientBalance {
        token: TokenId,
        balance: BaseUnits,
        amount_in: BaseUnits,
    },
    #[error("swap execution failed: {0}")]
    SwapExecution(#[from] ExecutionError),
    #[error("received {received} is less than minimum {minimum}")]
    ReceivedLessThanMinimum {
        received: TokenAmount,
        minimum: TokenAmount,
    },
    #[error("fee {fee} exceeds received amount {received}")]
    FeeExceedsReceived { fee: BaseUnits, received: BaseUnits },
    #[error("{side} fee on received amount {received} overflows")]
    FeeOverflow { side: FeeSide, received: TokenAmount },
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),
    #[error("settlement {key} is already {state}")]
    AlreadyFinalized { key: String, state: &'static str },
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Lifecycle of one settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementState {
    Pending,
    Settled(SettlementOutcome),
    Rejected(SettlementError),
}

impl SettlementState {
    pub fn name(&self) -> &'static str {
        match self {
            SettlementState::Pending => "pending",
            SettlementState::Settled(_) => "settled",
            SettlementState::Rejected(_) => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SettlementState::Pending)
    }
}

/// A swap instruction submitted by a caller, with its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    key: String,
    caller: Address,
    instruction: SwapInstruction,
    fee_side: FeeSide,
    state: SettlementState,
}

impl Settlement {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn caller(&self) -> &Address {
        &self.caller
    }

    pub fn instruction(&self) -> &SwapInstruction {
        &self.instruction
    }

    pub fn fee_side(&self) -> FeeSide {
        self.fee_side
    }

    pub fn state(&self) -> &SettlementState {
        &self.state
    }
}

/// Record of a finished settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRecord {
    pub key: String,
    pub caller: Address,
    pub state: SettlementState,
}

/// The exchange adapter: pulls the caller's input, runs the swap through an
/// [`ExecutionSink`], takes the protocol fee and hands everything else back.
#[derive(Debug, Clone)]
pub struct SettlementAgent {
    address: Address,
    fee_beneficiary: Address,
    protocol_fee: Decimal,
    authorized: BTreeSet<Address>,
    ledger: TokenLedger,
    nonce: u64,
    history: Vec<SettlementRecord>,
}

impl SettlementAgent {
    pub fn new(address: Address, fee_beneficiary: Address, fees: &FeeModel) -> Self {
        Self {
            address,
            fee_beneficiary,
            protocol_fee: fees.protocol_fee(),
            authorized: BTreeSet::new(),
            ledger: TokenLedger::new(),
            nonce: 0,
            history: Vec::new(),
        }
    }

    pub fn with_authorized<I: IntoIterator<Item = Address>>(mut self, callers: I) -> Self {
        self.authorized.extend(callers);
        self
    }

    pub fn with_ledger(mut self, ledger: TokenLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn fee_beneficiary(&self) -> &Address {
        &self.fee_beneficiary
    }

    pub fn authorize(&mut self, caller: Address) {
        self.authorized.insert(caller);
    }

    pub fn revoke(&mut self, caller: &Address) {
        self.authorized.remove(caller);
    }

    pub fn is_authorized(&self, caller: &Address) -> bool {
        self.authorized.contains(caller)
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut TokenLedger {
        &mut self.ledger
    }

    pub fn history(&self) -> &[SettlementRecord] {
        &self.history
    }

    /// Register a swap for settlement. The fee side is chosen by the calling operation.
    pub fn submit(
        &mut self,
        caller: Address,
        instruction: SwapInstruction,
        fee_side: FeeSide,
    ) -> Settlement {
        let key = instruction.instruction_key(&caller, self.nonce);
        self.nonce += 1;
        Settlement {
            key,
            caller,
            instruction,
            fee_side,
            state: SettlementState::Pending,
        }
    }

    /// Submit and settle in one call.
    pub fn execute(
        &mut self,
        caller: Address,
        instruction: SwapInstruction,
        fee_side: FeeSide,
        sink: &dyn ExecutionSink,
    ) -> Result<SettlementOutcome, SettlementError> {
        let mut settlement = self.submit(caller, instruction, fee_side);
        self.settle(&mut settlement, sink)
    }

    /// Drive a pending settlement to `Settled` or `Rejected`.
    pub fn settle(
        &mut self,
        settlement: &mut Settlement,
        sink: &dyn ExecutionSink,
    ) -> Result<SettlementOutcome, SettlementError> {
        if settlement.state.is_terminal() {
            return Err(SettlementError::AlreadyFinalized {
                key: settlement.key.clone(),
                state: settlement.state.name(),
            });
        }

        let mut staged = self.ledger.clone();
        let result = self.run(&mut staged, settlement, sink);

        settlement.state = match &result {
            Ok(outcome) => {
                self.ledger = staged;
                tracing::info!(
                    key = %settlement.key,
                    caller = %settlement.caller,
                    received = %outcome.amount_received.amount,
                    fee = %outcome.fee_collected.amount,
                    surplus = %outcome.surplus_returned.amount,
                    dust = %outcome.dust_returned.amount,
                    "settlement settled"
                );
                SettlementState::Settled(*outcome)
            }
            Err(err) => {
                tracing::warn!(
                    key = %settlement.key,
                    caller = %settlement.caller,
                    error = %err,
                    "settlement rejected"
                );
                SettlementState::Rejected(err.clone())
            }
        };

        self.history.push(SettlementRecord {
            key: settlement.key.clone(),
            caller: settlement.caller.clone(),
            state: settlement.state.clone(),
        });

        result
    }

    fn run(
        &self,
        ledger: &mut TokenLedger,
        settlement: &Settlement,
        sink: &dyn ExecutionSink,
    ) -> Result<SettlementOutcome, SettlementError> {
        let caller = &settlement.caller;
        let ix = &settlement.instruction;
        let agent = &self.address;
        let out_precision = ix.min_amount_out.precision;
        let in_precision = ix.amount_in.precision;

        // 1. authorization
        if !self.is_authorized(caller) {
            return Err(SettlementError::UnauthorizedCaller {
                caller: caller.clone(),
            });
        }

        if ix.from_token == ix.to_token {
            return Err(SettlementError::InvalidInstruction(format!(
                "from and to token are both {}",
                ix.from_token
            )));
        }
        let amount_in = ix.amount_in.base_units()?;
        if amount_in.is_zero() {
            return Err(SettlementError::InvalidInstruction(
                "amount in is zero".to_string(),
            ));
        }

        // 2. funding
        let allowance = ledger.allowance(caller, agent, &ix.from_token);
        if amount_in > allowance {
            return Err(SettlementError::InsufficientAllowance {
                token: ix.from_token.clone(),
                allowance,
                amount_in,
            });
        }
        let balance = ledger.balance_of(caller, &ix.from_token);
        if amount_in > balance {
            return Err(SettlementError::InsufficientBalance {
                token: ix.from_token.clone(),
                balance,
                amount_in,
            });
        }
        ledger.transfer_from(agent, caller, agent, &ix.from_token, amount_in)?;

        // 3. execution
        let report = sink.execute(ix, amount_in)?;
        if report.amount_spent > amount_in {
            return Err(ExecutionError::InconsistentReport(format!(
                "spent {} of {} but only {} was provided",
                report.amount_spent, ix.from_token, amount_in
            ))
            .into());
        }
        ledger.debit(agent, &ix.from_token, report.amount_spent)?;
        ledger.credit(agent, &ix.to_token, report.amount_received)?;

        // 4. slippage guard
        let received = TokenAmount::from_base_units(report.amount_received, out_precision)?;
        if received.amount < ix.min_amount_out.amount {
            return Err(SettlementError::ReceivedLessThanMinimum {
                received,
                minimum: ix.min_amount_out,
            });
        }

        // 5. fee
        let fee_amount = settlement
            .fee_side
            .fee_for(received.amount, self.protocol_fee)
            .ok_or(SettlementError::FeeOverflow {
                side: settlement.fee_side,
                received,
            })?;
        let fee = to_base_units(&fee_amount, out_precision)?;
        if fee > report.amount_received {
            return Err(SettlementError::FeeExceedsReceived {
                fee,
                received: report.amount_received,
            });
        }
        let net = report.amount_received.saturating_sub(fee);
        ledger.transfer(agent, &self.fee_beneficiary, &ix.to_token, fee)?;
        ledger.transfer(agent, caller, &ix.to_token, net)?;

        // 6. surplus and dust
        let surplus = ledger.balance_of(agent, &ix.to_token);
        ledger.transfer(agent, caller, &ix.to_token, surplus)?;
        let dust = ledger.balance_of(agent, &ix.from_token);
        ledger.transfer(agent, caller, &ix.from_token, dust)?;

        debug_assert!(ledger.balance_of(agent, &ix.to_token).is_zero());
        debug_assert!(ledger.balance_of(agent, &ix.from_token).is_zero());

        Ok(SettlementOutcome {
            amount_received: received,
            fee_collected: TokenAmount::from_base_units(fee, out_precision)?,
            surplus_returned: TokenAmount::from_base_units(surplus, out_precision)?,
            dust_returned: TokenAmount::from_base_units(dust, in_precision)?,
            net_to_caller: TokenAmount::from_base_units(net, out_precision)?,
        })
    }
}
