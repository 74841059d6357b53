//! Loans and the arithmetic around them.
//!
//! The installment is flat: it is fixed at origination from the original
//! principal and the daily rate, and daily interest is likewise charged on the
//! original principal rather than on the declining outstanding balance.

use crate::domain::money::{Amount, Currency};
use crate::domain::product::TermOption;
use crate::error::{LedgerError, Result};
use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Days per month used by the rate and installment formulas.
pub const DAYS_PER_MONTH: u32 = 30;

/// A payoff this many days or more after the end date counts as settled
/// rather than late.
pub const LATE_PAYOFF_GRACE_DAYS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    InProgress,
    Payed,
    NotPayed,
}

/// What a single day of accrual did to a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accrual {
    /// Interest was added to the outstanding balance.
    Accrued(Decimal),
    /// Nothing was outstanding, so the loan was settled instead.
    Settled,
    /// Outside the active window, terminal, or already accrued for the date.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub loan_type: String,
    pub principal: Decimal,
    /// Never negative; zero only together with `Payed`.
    pub outstanding: Decimal,
    pub currency: Currency,
    pub percent: Decimal,
    pub daily_interest_rate: Decimal,
    /// Term in months.
    pub duration: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub status: LoanStatus,
    /// Minimal installment, fixed at origination.
    pub payment: Decimal,
    pub payment_dates: Vec<NaiveDate>,
    pub transaction_ids: Vec<Uuid>,
    pub last_accrued_on: Option<NaiveDate>,
}

/// `percent / 100 / 30`.
pub fn daily_interest_rate(percent: Decimal) -> Decimal {
    percent / Decimal::ONE_HUNDRED / Decimal::from(DAYS_PER_MONTH)
}

/// `amount / (duration * 30) + amount * daily_rate`.
pub fn flat_payment(amount: Decimal, duration: u32, daily_rate: Decimal) -> Result<Decimal> {
    let days = Decimal::from(duration) * Decimal::from(DAYS_PER_MONTH);
    amount
        .checked_div(days)
        .zip(amount.checked_mul(daily_rate))
        .and_then(|(principal_part, interest_part)| principal_part.checked_add(interest_part))
        .ok_or_else(|| {
            LedgerError::Overflow(format!("installment for {amount} over {duration} months"))
        })
}

/// `start` plus `months` calendar months.
pub fn term_end(start: NaiveDate, months: u32) -> Result<NaiveDate> {
    start.checked_add_months(Months::new(months)).ok_or_else(|| {
        LedgerError::ValidationError(format!("{months} months from {start} is out of range"))
    })
}

impl Loan {
    pub fn originate(
        user_id: Uuid,
        loan_type: impl Into<String>,
        amount: Amount,
        currency: Currency,
        option: TermOption,
        start: NaiveDate,
    ) -> Result<Self> {
        if option.duration == 0 {
            return Err(LedgerError::ValidationError(
                "Loan duration must be at least one month".to_string(),
            ));
        }
        let principal = amount.value();
        let rate = daily_interest_rate(option.percent);
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            loan_type: loan_type.into(),
            principal,
            outstanding: principal,
            currency,
            percent: option.percent,
            daily_interest_rate: rate,
            duration: option.duration,
            start,
            end: term_end(start, option.duration)?,
            status: LoanStatus::InProgress,
            payment: flat_payment(principal, option.duration, rate)?,
            payment_dates: Vec::new(),
            transaction_ids: Vec::new(),
            last_accrued_on: None,
        })
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == LoanStatus::InProgress
    }

    /// Accrual applies strictly after the start and up to the end date.
    pub fn covers(&self, as_of: NaiveDate) -> bool {
        self.start < as_of && as_of <= self.end
    }

    pub fn has_ended(&self, as_of: NaiveDate) -> bool {
        self.end <= as_of
    }

    /// Validates an offered payment and returns the part of it that will be
    /// applied, clamped to what is outstanding.
    pub fn applicable_payment(&self, offered: Amount) -> Result<Amount> {
        if self.outstanding <= Decimal::ZERO || !self.is_in_progress() {
            return Err(LedgerError::AlreadyPaid(self.id));
        }
        if offered.value() < self.payment {
            return Err(LedgerError::MinimalPaymentTooLow {
                offered: offered.value(),
                minimal: self.payment,
            });
        }
        Amount::new(offered.value().min(self.outstanding))
    }

    /// Books a payment that has already been moved on the ledger.
    pub fn record_payment(&mut self, applied: Amount, on: NaiveDate, transaction_id: Uuid) {
        self.outstanding = (self.outstanding - applied.value()).max(Decimal::ZERO);
        self.payment_dates.push(on);
        self.transaction_ids.push(transaction_id);
        if self.outstanding.is_zero() {
            self.status = LoanStatus::Payed;
        }
    }

    /// One day of interest. Idempotent per date. On overflow the loan is
    /// left untouched.
    pub fn accrue(&mut self, as_of: NaiveDate) -> Result<Accrual> {
        if !self.is_in_progress()
            || !self.covers(as_of)
            || self.last_accrued_on.is_some_and(|last| last >= as_of)
        {
            return Ok(Accrual::Skipped);
        }
        if self.outstanding.is_zero() {
            self.last_accrued_on = Some(as_of);
            self.status = LoanStatus::Payed;
            return Ok(Accrual::Settled);
        }
        let (interest, outstanding) = self
            .principal
            .checked_mul(self.daily_interest_rate)
            .and_then(|interest| Some((interest, self.outstanding.checked_add(interest)?)))
            .ok_or_else(|| {
                LedgerError::Overflow(format!("loan {} outstanding is too large", self.id))
            })?;
        self.outstanding = outstanding;
        self.last_accrued_on = Some(as_of);
        Ok(Accrual::Accrued(interest))
    }

    /// Moves an ended loan to its terminal state. Terminal loans are left alone.
    pub fn finalize(&mut self) -> LoanStatus {
        if self.is_in_progress() {
            self.status = if self.outstanding.is_zero() {
                LoanStatus::Payed
            } else {
                LoanStatus::NotPayed
            };
        }
        self.status
    }

    /// Paid off on time, or at least `LATE_PAYOFF_GRACE_DAYS` after the end.
    /// A payoff one to nine days late counts as a failure.
    fn settled_successfully(&self) -> bool {
        let Some(last) = self.payment_dates.iter().max() else {
            return true;
        };
        if *last <= self.end {
            return true;
        }
        self.end
            .checked_add_days(Days::new(LATE_PAYOFF_GRACE_DAYS))
            .is_some_and(|threshold| *last >= threshold)
    }
}

/// Payment-history part of loan eligibility, for a borrower with no
/// defaulted loans.
///
/// Sums, over loans in progress, how far the number of recorded payments is
/// from the number of days elapsed, and requires every paid loan to have been
/// settled successfully.
pub fn payment_history_is_clean(loans: &[Loan], today: NaiveDate) -> bool {
    let in_progress: Vec<&Loan> = loans.iter().filter(|l| l.is_in_progress()).collect();
    let payed: Vec<&Loan> = loans
        .iter()
        .filter(|l| l.status == LoanStatus::Payed)
        .collect();

    let missed_days: i64 = in_progress
        .iter()
        .map(|l| ((today - l.start).num_days() - l.payment_dates.len() as i64).abs())
        .sum();
    let successful = payed.iter().filter(|l| l.settled_successfully()).count();

    successful == payed.len() && missed_days <= in_progress.len() as i64
}
