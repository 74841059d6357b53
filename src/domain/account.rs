use crate::domain::money::{Amount, Currency};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Length of every account number issued by the bank.
pub const ACCOUNT_NUMBER_LEN: usize = 16;

/// Owner id used for the per-currency reserve accounts.
pub const SYSTEM_OWNER: Uuid = Uuid::nil();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AccountType {
    Current,
    Savings,
    Reserve,
}

/// A ledger account.
///
/// The balance never goes negative: `debit` refuses to overdraw, and every
/// mutation of a stored account happens under that account's lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// 16-digit account number, unique across the bank.
    pub number: String,
    pub owner_id: Uuid,
    pub currency: Currency,
    pub balance: Decimal,
    pub account_type: AccountType,
    /// Exactly one live account per owner carries this flag.
    pub is_default: bool,
    pub deleted: bool,
}

impl Account {
    pub fn new(
        owner_id: Uuid,
        number: impl Into<String>,
        currency: Currency,
        account_type: AccountType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            owner_id,
            currency,
            balance: Decimal::ZERO,
            account_type,
            is_default: false,
            deleted: false,
        }
    }

    /// A bank-owned reserve account for `currency`.
    pub fn reserve(number: impl Into<String>, currency: Currency, balance: Decimal) -> Self {
        let mut account = Self::new(SYSTEM_OWNER, number, currency, AccountType::Reserve);
        account.balance = balance;
        account
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    /// Deposits funds. Fails without touching the balance if it would
    /// overflow.
    pub fn credit(&mut self, amount: Amount) -> Result<()> {
        self.balance = self.balance.checked_add(amount.value()).ok_or_else(|| {
            LedgerError::Overflow(format!("balance of account {} is too large", self.number))
        })?;
        Ok(())
    }

    /// Withdraws funds if the balance covers them.
    pub fn debit(&mut self, amount: Amount) -> Result<()> {
        if self.balance >= amount.value() {
            self.balance -= amount.value();
            Ok(())
        } else {
            Err(LedgerError::insufficient_funds(
                &self.number,
                self.balance,
                amount.value(),
            ))
        }
    }

    pub fn ensure_currency(&self, expected: Currency) -> Result<()> {
        if self.currency == expected {
            Ok(())
        } else {
            Err(LedgerError::CurrencyMismatch {
                expected,
                actual: self.currency,
            })
        }
    }
}

/// True for a string of exactly sixteen ASCII digits.
pub fn is_valid_account_number(number: &str) -> bool {
    number.len() == ACCOUNT_NUMBER_LEN && number.bytes().all(|b| b.is_ascii_digit())
}
