//! Configuration management
//!
//! Settings come from environment variables (optionally via a `.env` file).
//! The reserve-account map is the one piece the engines cannot run without.

use crate::domain::money::Currency;
use crate::error::{Entity, LedgerError};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

const DEV_QR_SECRET: &str = "development-qr-secret";
const DEFAULT_BATCH_SIZE: usize = 500;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidValue {
                name: "LEDGER_ENV".to_string(),
                reason: format!("'{other}', expected dev, staging or prod"),
            }),
        }
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Currency → reserve account id. One reserve account per currency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReserveAccounts(HashMap<Currency, Uuid>);

impl ReserveAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, currency: Currency, account_id: Uuid) -> Self {
        self.insert(currency, account_id);
        self
    }

    pub fn insert(&mut self, currency: Currency, account_id: Uuid) {
        self.0.insert(currency, account_id);
    }

    pub fn get(&self, currency: Currency) -> Result<Uuid, LedgerError> {
        self.0
            .get(&currency)
            .copied()
            .ok_or_else(|| LedgerError::not_found(Entity::Account, format!("reserve for {currency}")))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries of `other` replace ours for the same currency.
    pub fn extend(&mut self, other: ReserveAccounts) {
        self.0.extend(other.0);
    }
}

/// Parses `AMD=<uuid>,USD=<uuid>`.
impl FromStr for ReserveAccounts {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            name: "LEDGER_RESERVE_ACCOUNTS".to_string(),
            reason,
        };
        let mut reserves = ReserveAccounts::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (currency, id) = pair
                .split_once('=')
                .ok_or_else(|| invalid(format!("'{pair}' is not CURRENCY=id")))?;
            let currency = Currency::from_str(currency.trim())
                .map_err(|_| invalid(format!("unknown currency '{currency}'")))?;
            let id = Uuid::parse_str(id.trim()).map_err(|e| invalid(e.to_string()))?;
            reserves.insert(currency, id);
        }
        Ok(reserves)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub reserve_accounts: ReserveAccounts,
    /// HMAC secret QR capability tokens are signed with.
    pub qr_secret: String,
    /// Number of loans/deposits the daily sweep locks, reads and commits at once.
    pub accrual_batch_size: usize,
    /// UTC hour at which the background driver runs the daily pass.
    pub accrual_hour_utc: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            reserve_accounts: ReserveAccounts::new(),
            qr_secret: DEV_QR_SECRET.to_string(),
            accrual_batch_size: DEFAULT_BATCH_SIZE,
            accrual_hour_utc: 0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = match env::var("LEDGER_ENV") {
            Ok(v) => v.parse()?,
            Err(_) => Environment::default(),
        };

        let reserve_accounts = match env::var("LEDGER_RESERVE_ACCOUNTS") {
            Ok(v) => v.parse()?,
            Err(_) => ReserveAccounts::new(),
        };

        let qr_secret = match env::var("LEDGER_QR_SECRET") {
            Ok(v) if !v.is_empty() => v,
            _ if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("LEDGER_QR_SECRET".to_string()));
            }
            _ => DEV_QR_SECRET.to_string(),
        };

        let accrual_batch_size = parse_or("LEDGER_ACCRUAL_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if accrual_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "LEDGER_ACCRUAL_BATCH_SIZE".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let accrual_hour_utc = parse_or("LEDGER_ACCRUAL_HOUR_UTC", 0u32)?;
        if accrual_hour_utc > 23 {
            return Err(ConfigError::InvalidValue {
                name: "LEDGER_ACCRUAL_HOUR_UTC".to_string(),
                reason: format!("{accrual_hour_utc} is not an hour of the day"),
            });
        }

        let log_level = env::var("LEDGER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            reserve_accounts,
            qr_secret,
            accrual_batch_size,
            accrual_hour_utc,
            log_level,
        })
    }
}

fn parse_or<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
