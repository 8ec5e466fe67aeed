//! In-memory token balances and allowances, in base units.
//!
//! The settlement agent stages every settlement on a copy of the ledger and
//! swaps it in only when the whole settlement succeeded.

use crate::domain::{Address, BaseUnits, TokenId};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{holder} holds {available} of {token}, needs {required}")]
    InsufficientBalance {
        holder: Address,
        token: TokenId,
        available: BaseUnits,
        required: BaseUnits,
    },
    #[error("{owner} allows {spender} {available} of {token}, needs {required}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        token: TokenId,
        available: BaseUnits,
        required: BaseUnits,
    },
    #[error("balance of {holder} in {token} would overflow")]
    Overflow { holder: Address, token: TokenId },
}

/// Balances keyed by (holder, token); allowances by (owner, spender, token).
///
/// BTreeMaps keep iteration deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: BTreeMap<(Address, TokenId), BaseUnits>,
    allowances: BTreeMap<(Address, Address, TokenId), BaseUnits>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, holder: &Address, token: &TokenId) -> BaseUnits {
        self.balances
            .get(&(holder.clone(), token.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address, token: &TokenId) -> BaseUnits {
        self.allowances
            .get(&(owner.clone(), spender.clone(), token.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// Set (not add to) the amount `spender` may pull from `owner`.
    pub fn approve(&mut self, owner: &Address, spender: &Address, token: &TokenId, amount: BaseUnits) {
        let key = (owner.clone(), spender.clone(), token.clone());
        if amount.is_zero() {
            self.allowances.remove(&key);
        } else {
            self.allowances.insert(key, amount);
        }
    }

    /// Tokens entering the ledger from outside (e.g. a liquidity source).
    pub fn credit(
        &mut self,
        holder: &Address,
        token: &TokenId,
        amount: BaseUnits,
    ) -> Result<(), LedgerError> {
        let updated = self
            .balance_of(holder, token)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                holder: holder.clone(),
                token: token.clone(),
            })?;
        self.set_balance(holder, token, updated);
        Ok(())
    }

    /// Tokens leaving the ledger.
    pub fn debit(
        &mut self,
        holder: &Address,
        token: &TokenId,
        amount: BaseUnits,
    ) -> Result<(), LedgerError> {
        let available = self.balance_of(holder, token);
        let updated = available
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                holder: holder.clone(),
                token: token.clone(),
                available,
                required: amount,
            })?;
        self.set_balance(holder, token, updated);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        token: &TokenId,
        amount: BaseUnits,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.debit(from, token, amount)?;
        self.credit(to, token, amount)
    }

    /// Move `amount` from `owner` to `to`, consuming `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        token: &TokenId,
        amount: BaseUnits,
    ) -> Result<(), LedgerError> {
        let available = self.allowance(owner, spender, token);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::InsufficientAllowance {
                    owner: owner.clone(),
                    spender: spender.clone(),
                    token: token.clone(),
                    available,
                    required: amount,
                })?;
        self.transfer(owner, to, token, amount)?;
        self.approve(owner, spender, token, remaining);
        Ok(())
    }

    /// Every non-zero balance of `holder`.
    pub fn holdings(&self, holder: &Address) -> Vec<(TokenId, BaseUnits)> {
        self.balances
            .iter()
            .filter(|((h, _), _)| h == holder)
            .map(|((_, token), amount)| (token.clone(), *amount))
            .collect()
    }

    fn set_balance(&mut self, holder: &Address, token: &TokenId, amount: BaseUnits) {
        let key = (holder.clone(), token.clone());
        if amount.is_zero() {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, amount);
        }
    }
}
