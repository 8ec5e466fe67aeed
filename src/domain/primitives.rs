//! Domain primitives: Address, TokenId, Token, Payload, BaseUnits.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Number of bytes in an account address.
pub const ADDRESS_BYTES: usize = 20;

/// Default number of decimal places for a token amount.
pub const DEFAULT_PRECISION: u32 = 18;

/// Account address (lowercase `0x`-prefixed hex).
///
/// Deserializes through [`Address::parse`], so a decoded address is always normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Address(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must be {expected} bytes, got {actual}: {input}")]
    WrongLength {
        input: String,
        expected: usize,
        actual: usize,
    },
    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
}

impl Address {
    /// Parse and normalize an address.
    pub fn parse(input: &str) -> Result<Self, AddressParseError> {
        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError::MissingPrefix(trimmed.to_string()))?;

        let bytes =
            hex::decode(body).map_err(|_| AddressParseError::InvalidHex(trimmed.to_string()))?;
        if bytes.len() != ADDRESS_BYTES {
            return Err(AddressParseError::WrongLength {
                input: trimmed.to_string(),
                expected: ADDRESS_BYTES,
                actual: bytes.len(),
            });
        }

        Ok(Address(format!("0x{}", hex::encode(bytes))))
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token identifier (symbol or contract address).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        TokenId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A token together with the number of decimal places of its integer representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub precision: u32,
}

impl Token {
    pub fn new(id: impl Into<String>, precision: u32) -> Self {
        Token {
            id: TokenId::new(id),
            precision,
        }
    }

    /// Token with the default 18 decimal places.
    pub fn with_default_precision(id: impl Into<String>) -> Self {
        Token::new(id, DEFAULT_PRECISION)
    }
}

/// Opaque calldata handed to the liquidity source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payload(pub Vec<u8>);

impl Payload {
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let body = s.trim().trim_start_matches("0x");
        hex::decode(body).map(Payload)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

/// Unsigned on-chain integer amount (token amount times `10^precision`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BaseUnits(pub u128);

impl BaseUnits {
    pub const ZERO: BaseUnits = BaseUnits(0);

    pub fn new(raw: u128) -> Self {
        BaseUnits(raw)
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: BaseUnits) -> Option<BaseUnits> {
        self.0.checked_add(rhs.0).map(BaseUnits)
    }

    pub fn checked_sub(self, rhs: BaseUnits) -> Option<BaseUnits> {
        self.0.checked_sub(rhs.0).map(BaseUnits)
    }

    pub fn saturating_sub(self, rhs: BaseUnits) -> BaseUnits {
        BaseUnits(self.0.saturating_sub(rhs.0))
    }
}

impl std::fmt::Display for BaseUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
