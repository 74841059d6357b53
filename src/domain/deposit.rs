use crate::domain::loan::term_end;
use crate::domain::money::{Amount, Currency};
use crate::domain::product::TermOption;
use crate::error::{LedgerError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    InProgress,
    Closed,
}

/// A term deposit. Interest accrues directly onto `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub deposit_type: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub percent: Decimal,
    /// Term in months.
    pub duration: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub status: DepositStatus,
    /// Account number the principal came from and the payout returns to.
    pub source_account: String,
    pub transaction_ids: Vec<Uuid>,
    pub last_accrued_on: Option<NaiveDate>,
}

impl Deposit {
    pub fn open(
        user_id: Uuid,
        deposit_type: impl Into<String>,
        amount: Amount,
        currency: Currency,
        option: TermOption,
        source_account: impl Into<String>,
        start: NaiveDate,
    ) -> Result<Self> {
        if option.duration == 0 {
            return Err(LedgerError::ValidationError(
                "Deposit duration must be at least one month".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            deposit_type: deposit_type.into(),
            amount: amount.value(),
            currency,
            percent: option.percent,
            duration: option.duration,
            start,
            end: term_end(start, option.duration)?,
            status: DepositStatus::InProgress,
            source_account: source_account.into(),
            transaction_ids: Vec::new(),
            last_accrued_on: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == DepositStatus::InProgress
    }

    pub fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(LedgerError::DepositClosed(self.id))
        }
    }

    pub fn covers(&self, as_of: NaiveDate) -> bool {
        self.start < as_of && as_of <= self.end
    }

    pub fn has_ended(&self, as_of: NaiveDate) -> bool {
        self.end <= as_of
    }

    /// The amount after adding `amount`, or `Overflow`.
    pub fn topped_up(&self, amount: Amount) -> Result<Decimal> {
        self.amount
            .checked_add(amount.value())
            .ok_or_else(|| self.overflow())
    }

    pub fn top_up(&mut self, amount: Amount, transaction_id: Uuid) -> Result<()> {
        self.amount = self.topped_up(amount)?;
        self.transaction_ids.push(transaction_id);
        Ok(())
    }

    /// Adds `amount * percent / 100` in place. Returns the interest, or `None`
    /// when the deposit is closed, outside its window, or already accrued for
    /// the date. On overflow the deposit is left untouched.
    pub fn accrue(&mut self, as_of: NaiveDate) -> Result<Option<Decimal>> {
        if !self.is_open()
            || !self.covers(as_of)
            || self.last_accrued_on.is_some_and(|last| last >= as_of)
        {
            return Ok(None);
        }
        let (interest, amount) = self
            .amount
            .checked_mul(self.percent)
            .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
            .and_then(|interest| Some((interest, self.amount.checked_add(interest)?)))
            .ok_or_else(|| self.overflow())?;
        self.amount = amount;
        self.last_accrued_on = Some(as_of);
        Ok(Some(interest))
    }

    fn overflow(&self) -> LedgerError {
        LedgerError::Overflow(format!("deposit {} amount is too large", self.id))
    }

    pub fn close(&mut self, transaction_id: Uuid) {
        self.status = DepositStatus::Closed;
        self.transaction_ids.push(transaction_id);
    }
}
