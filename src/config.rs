use crate::domain::amount::MAX_PRECISION;
use crate::domain::{
    Address, Decimal, FeeCompounding, FeeError, FeeModel, LeverageRequest, PositionSnapshot,
    PriceQuote, Token,
};
use crate::engine::{
    assert_ratio_within, InvariantError, LeverageSolver, SettlementAgent, DEFAULT_EPSILON,
};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub fees: FeeModel,
    pub slippage: Decimal,
    pub default_precision: u32,
    pub solver_epsilon: Decimal,
    pub ratio_tolerance: Decimal,
    pub fee_compounding: FeeCompounding,
    pub settlement_agent: Address,
    pub fee_beneficiary: Address,
    pub authorized_callers: Vec<Address>,
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let protocol_fee = parse_decimal(&env_map, "PROTOCOL_FEE", "0.0002")?;
        let flash_loan_fee = parse_decimal(&env_map, "FLASH_LOAN_FEE", "0")?;
        let fees = FeeModel::new(protocol_fee, flash_loan_fee).map_err(|e| {
            let key = match &e {
                FeeError::OutOfRange {
                    name: "protocol_fee",
                    ..
                } => "PROTOCOL_FEE",
                FeeError::OutOfRange { .. } => "FLASH_LOAN_FEE",
            };
            ConfigError::InvalidValue(key.to_string(), e.to_string())
        })?;

        let slippage = parse_decimal(&env_map, "SLIPPAGE", "0.01")?;
        if !slippage.is_unit_fraction() {
            return Err(ConfigError::InvalidValue(
                "SLIPPAGE".to_string(),
                format!("must be in [0, 1), got {}", slippage),
            ));
        }

        let default_precision = env_map
            .get("DEFAULT_PRECISION")
            .map(|s| s.as_str())
            .unwrap_or("18")
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|p| *p <= MAX_PRECISION)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DEFAULT_PRECISION".to_string(),
                    format!("must be an integer in 0..={}", MAX_PRECISION),
                )
            })?;

        let solver_epsilon = match env_map.get("SOLVER_EPSILON") {
            Some(_) => parse_decimal(&env_map, "SOLVER_EPSILON", "0")?,
            None => DEFAULT_EPSILON,
        };
        if !solver_epsilon.is_positive() {
            return Err(ConfigError::InvalidValue(
                "SOLVER_EPSILON".to_string(),
                "must be positive".to_string(),
            ));
        }

        let ratio_tolerance = parse_decimal(&env_map, "RATIO_TOLERANCE", "0.005")?;
        if ratio_tolerance.is_negative() {
            return Err(ConfigError::InvalidValue(
                "RATIO_TOLERANCE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let fee_compounding = match env_map
            .get("FEE_COMPOUNDING")
            .map(|s| s.as_str())
            .unwrap_or("additive")
        {
            "additive" => FeeCompounding::Additive,
            "compounded" => FeeCompounding::Compounded,
            other => {
                return Err(ConfigError::InvalidValue(
                    "FEE_COMPOUNDING".to_string(),
                    format!("must be additive or compounded, got {}", other),
                ))
            }
        };

        let settlement_agent = parse_required_address(&env_map, "SETTLEMENT_AGENT")?;
        let fee_beneficiary = parse_required_address(&env_map, "FEE_BENEFICIARY")?;
        let authorized_callers = parse_authorized_callers_from_map(&env_map)?;

        let log_filter = env_map
            .get("LOG_FILTER")
            .cloned()
            .unwrap_or_else(|| "info".to_string());

        Ok(Config {
            fees,
            slippage,
            default_precision,
            solver_epsilon,
            ratio_tolerance,
            fee_compounding,
            settlement_agent,
            fee_beneficiary,
            authorized_callers,
            log_filter,
        })
    }

    pub fn fee_model(&self) -> FeeModel {
        self.fees
    }

    pub fn solver(&self) -> LeverageSolver {
        LeverageSolver::new(self.solver_epsilon, self.fee_compounding)
    }

    /// A token whose precision was not given explicitly.
    pub fn token(&self, id: impl Into<String>) -> Token {
        Token::new(id, self.default_precision)
    }

    /// Request carrying the configured fees and slippage.
    pub fn leverage_request(
        &self,
        position: PositionSnapshot,
        quote: PriceQuote,
        target_ratio: Decimal,
    ) -> LeverageRequest {
        LeverageRequest::new(position, quote, self.fees, target_ratio, self.slippage)
    }

    /// [`assert_ratio_within`] at the configured tolerance.
    pub fn check_ratio(
        &self,
        position: &PositionSnapshot,
        price: Decimal,
        target_ratio: Decimal,
    ) -> Result<Decimal, InvariantError> {
        assert_ratio_within(position, price, target_ratio, self.ratio_tolerance)
    }

    /// A settlement agent with an empty ledger and the configured allow-list.
    pub fn settlement_agent(&self) -> SettlementAgent {
        SettlementAgent::new(
            self.settlement_agent.clone(),
            self.fee_beneficiary.clone(),
            &self.fees,
        )
        .with_authorized(self.authorized_callers.iter().cloned())
    }
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    Decimal::from_str_canonical(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("must be a decimal, got {}", raw))
    })
}

fn parse_required_address(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Address, ConfigError> {
    let raw = env_map
        .get(key)
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))?;
    Address::parse(raw).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_authorized_callers_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Vec<Address>, ConfigError> {
    let (key, entries): (&str, Vec<String>) =
        if let Some(callers_str) = env_map.get("AUTHORIZED_CALLERS") {
            (
                "AUTHORIZED_CALLERS",
                callers_str
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            )
        } else if let Some(file_path) = env_map.get("AUTHORIZED_CALLERS_FILE") {
            let content = std::fs::read_to_string(file_path).map_err(|_| {
                ConfigError::InvalidValue(
                    "AUTHORIZED_CALLERS_FILE".to_string(),
                    "file not found or unreadable".to_string(),
                )
            })?;
            (
                "AUTHORIZED_CALLERS_FILE",
                content
                    .lines()
                    .map(|line| line.trim().to_string())
                    .filter(|s| !s.is_empty() && !s.starts_with('#'))
                    .collect(),
            )
        } else {
            return Ok(Vec::new());
        };

    entries
        .iter()
        .map(|s| {
            Address::parse(s).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
        })
        .collect()
}
