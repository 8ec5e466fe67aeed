//! Mock execution sink for testing without a liquidity source.

use super::{ExecutionError, ExecutionReport, ExecutionSink};
use crate::domain::{from_base_units, to_base_units, BaseUnits, Decimal, SwapInstruction};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Fill {
    /// Deliver a fixed amount of `to_token`.
    Fixed(BaseUnits),
    /// Deliver `amount_in * rate` in `to_token` units.
    Rate(Decimal),
    Fail(ExecutionError),
}

/// Mock sink that fills swaps from predefined data and counts its calls.
#[derive(Debug)]
pub struct MockExecutionSink {
    fill: Fill,
    unspent: BaseUnits,
    calls: AtomicUsize,
}

impl MockExecutionSink {
    /// Always deliver `amount_received` of `to_token`.
    pub fn fixed(amount_received: BaseUnits) -> Self {
        Self {
            fill: Fill::Fixed(amount_received),
            unspent: BaseUnits::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Deliver `rate` `to_token` per `from_token`, rounded at `to_token` precision.
    pub fn at_rate(rate: Decimal) -> Self {
        Self {
            fill: Fill::Rate(rate),
            unspent: BaseUnits::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every execution with `error`.
    pub fn failing(error: ExecutionError) -> Self {
        Self {
            fill: Fill::Fail(error),
            unspent: BaseUnits::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Leave `unspent` base units of `from_token` with the agent.
    pub fn with_unspent(mut self, unspent: BaseUnits) -> Self {
        self.unspent = unspent;
        self
    }

    /// Number of times `execute` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExecutionSink for MockExecutionSink {
    fn execute(
        &self,
        instruction: &SwapInstruction,
        amount_in: BaseUnits,
    ) -> Result<ExecutionReport, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let amount_spent = amount_in.checked_sub(self.unspent).ok_or_else(|| {
            ExecutionError::InconsistentReport(format!(
                "unspent {} exceeds amount in {}",
                self.unspent, amount_in
            ))
        })?;

        let amount_received = match &self.fill {
            Fill::Fixed(amount) => *amount,
            Fill::Rate(rate) => {
                let spent = from_base_units(amount_spent, instruction.amount_in.precision)
                    .map_err(|e| ExecutionError::Other(e.to_string()))?;
                to_base_units(&(spent * *rate), instruction.min_amount_out.precision)
                    .map_err(|e| ExecutionError::Other(e.to_string()))?
            }
            Fill::Fail(err) => return Err(err.clone()),
        };

        Ok(ExecutionReport {
            amount_spent,
            amount_received,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, Payload, Token};
    use std::str::FromStr;

    fn instruction() -> SwapInstruction {
        SwapInstruction::new(
            &Token::new("USDC", 6),
            &Token::new("WETH", 18),
            Decimal::from_str("2000").unwrap(),
            Decimal::from_str("0.99").unwrap(),
            Address::from_str("0x9999999999999999999999999999999999999999").unwrap(),
            Payload::default(),
        )
    }

    #[test]
    fn test_fixed_fill() {
        let sink = MockExecutionSink::fixed(BaseUnits::new(42));
        let report = sink.execute(&instruction(), BaseUnits::new(2_000_000_000)).unwrap();
        assert_eq!(report.amount_received, BaseUnits::new(42));
        assert_eq!(report.amount_spent, BaseUnits::new(2_000_000_000));
        assert_eq!(sink.calls(), 1);
    }

    #[test]
    fn test_rate_fill_uses_token_precisions() {
        let sink = MockExecutionSink::at_rate(Decimal::from_str("0.0005").unwrap());
        let report = sink.execute(&instruction(), BaseUnits::new(2_000_000_000)).unwrap();
        assert_eq!(report.amount_received, BaseUnits::new(1_000_000_000_000_000_000));
    }

    #[test]
    fn test_unspent_input() {
        let sink = MockExecutionSink::fixed(BaseUnits::new(1)).with_unspent(BaseUnits::new(7));
        let report = sink.execute(&instruction(), BaseUnits::new(10)).unwrap();
        assert_eq!(report.amount_spent, BaseUnits::new(3));
    }

    #[test]
    fn test_failing_sink() {
        let sink = MockExecutionSink::failing(ExecutionError::Reverted("boom".to_string()));
        let err = sink.execute(&instruction(), BaseUnits::new(10)).unwrap_err();
        assert_eq!(err, ExecutionError::Reverted("boom".to_string()));
        assert_eq!(sink.calls(), 1);
    }
}
