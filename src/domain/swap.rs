//! Swap instructions handed to the settlement agent and their outcomes.

use crate::domain::{Address, Decimal, Payload, Token, TokenAmount, TokenId};
use serde::{Deserialize, Serialize};

/// One swap to be executed against an external liquidity source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapInstruction {
    pub from_token: TokenId,
    pub to_token: TokenId,
    pub amount_in: TokenAmount,
    /// Smallest acceptable output; anything strictly below it is rejected.
    pub min_amount_out: TokenAmount,
    /// Liquidity source the payload is addressed to.
    pub target: Address,
    pub payload: Payload,
}

impl SwapInstruction {
    /// Build an instruction whose amounts carry each token's precision.
    pub fn new(
        from_token: &Token,
        to_token: &Token,
        amount_in: Decimal,
        min_amount_out: Decimal,
        target: Address,
        payload: Payload,
    ) -> Self {
        SwapInstruction {
            from_token: from_token.id.clone(),
            to_token: to_token.id.clone(),
            amount_in: TokenAmount::new(amount_in, from_token.precision),
            min_amount_out: TokenAmount::new(min_amount_out, to_token.precision),
            target,
            payload,
        }
    }

    /// Stable key identifying this instruction for a given caller and nonce.
    pub fn instruction_key(&self, caller: &Address, nonce: u64) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &[u8]) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data);
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, caller.as_str().as_bytes());
        hasher.update(nonce.to_le_bytes());
        hash_var(&mut hasher, self.from_token.as_str().as_bytes());
        hash_var(&mut hasher, self.to_token.as_str().as_bytes());
        hash_var(&mut hasher, self.amount_in.amount.to_canonical_string().as_bytes());
        hasher.update(self.amount_in.precision.to_le_bytes());
        hash_var(
            &mut hasher,
            self.min_amount_out.amount.to_canonical_string().as_bytes(),
        );
        hasher.update(self.min_amount_out.precision.to_le_bytes());
        hash_var(&mut hasher, self.target.as_str().as_bytes());
        hash_var(&mut hasher, self.payload.as_bytes());

        let hash = hasher.finalize();
        format!("swap:{}", hex::encode(&hash[..16]))
    }
}

/// Result of a settled swap, all amounts as booked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// `to_token` delivered by the liquidity source.
    pub amount_received: TokenAmount,
    /// `to_token` sent to the fee beneficiary.
    pub fee_collected: TokenAmount,
    /// `to_token` returned to the caller beyond this swap's proceeds.
    pub surplus_returned: TokenAmount,
    /// `from_token` returned to the caller (unspent input plus leftovers).
    pub dust_returned: TokenAmount,
    /// `to_token` proceeds passed to the caller (`amount_received - fee_collected`).
    pub net_to_caller: TokenAmount,
}
