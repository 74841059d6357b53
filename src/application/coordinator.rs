//! Daily accrual driver.
//!
//! [`ScheduledAccrualCoordinator::run_for`] is a plain function of a date; the
//! background task spawned by [`spawn_daily_driver`] only decides when to call
//! it.

use crate::application::BatchSummary;
use crate::application::deposit::DepositEngine;
use crate::application::loan::LoanEngine;
use crate::domain::ports::SharedClock;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use strum::Display;
use tokio::task::JoinHandle;

/// The four passes of a daily run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AccrualStage {
    LoanSweep,
    DepositSweep,
    LoanAccrual,
    DepositAccrual,
}

/// A pass that stopped with an error. The other passes still ran.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: AccrualStage,
    pub error: LedgerError,
}

/// Outcome of one daily pass. A failed stage contributes an empty summary
/// and an entry in `failures`.
#[derive(Debug)]
pub struct AccrualReport {
    pub as_of: NaiveDate,
    pub loans_swept: BatchSummary,
    pub deposits_swept: BatchSummary,
    pub loans_accrued: BatchSummary,
    pub deposits_accrued: BatchSummary,
    pub failures: Vec<StageFailure>,
}

impl AccrualReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, stage: AccrualStage, outcome: Result<BatchSummary>) {
        match outcome {
            Ok(summary) => match stage {
                AccrualStage::LoanSweep => self.loans_swept = summary,
                AccrualStage::DepositSweep => self.deposits_swept = summary,
                AccrualStage::LoanAccrual => self.loans_accrued = summary,
                AccrualStage::DepositAccrual => self.deposits_accrued = summary,
            },
            Err(error) => {
                tracing::error!(as_of = %self.as_of, %stage, %error, "Accrual stage failed");
                self.failures.push(StageFailure { stage, error });
            }
        }
    }

    pub fn total(&self) -> BatchSummary {
        let mut total = BatchSummary::default();
        for part in [
            self.loans_swept,
            self.deposits_swept,
            self.loans_accrued,
            self.deposits_accrued,
        ] {
            total.absorb(part);
        }
        total
    }
}

pub struct ScheduledAccrualCoordinator {
    loans: Arc<LoanEngine>,
    deposits: Arc<DepositEngine>,
}

impl ScheduledAccrualCoordinator {
    pub fn new(loans: Arc<LoanEngine>, deposits: Arc<DepositEngine>) -> Self {
        Self { loans, deposits }
    }

    /// Sweeps ended loans and deposits, then accrues the rest. Safe to run
    /// more than once for the same date.
    ///
    /// Every stage runs even if an earlier one fails; failures are collected
    /// in the report rather than short-circuiting the day.
    pub async fn run_for(&self, as_of: NaiveDate) -> AccrualReport {
        let mut report = AccrualReport {
            as_of,
            loans_swept: BatchSummary::default(),
            deposits_swept: BatchSummary::default(),
            loans_accrued: BatchSummary::default(),
            deposits_accrued: BatchSummary::default(),
            failures: Vec::new(),
        };

        report.record(AccrualStage::LoanSweep, self.loans.sweep_ended(as_of).await);
        report.record(AccrualStage::DepositSweep, self.deposits.sweep_ended(as_of).await);
        report.record(AccrualStage::LoanAccrual, self.loans.accrue_daily(as_of).await);
        report.record(AccrualStage::DepositAccrual, self.deposits.accrue_daily(as_of).await);
        report
    }
}

/// The first instant at `hour`:00 UTC strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let Some(today_at) = now.date_naive().and_hms_opt(hour.min(23), 0, 0) else {
        return now + Duration::days(1);
    };
    let today_at = today_at.and_utc();
    if today_at > now {
        today_at
    } else {
        today_at + Duration::days(1)
    }
}

/// Runs the coordinator once a day at `hour` UTC until the task is aborted.
/// Failed stages are logged and the driver waits for the next day.
pub fn spawn_daily_driver(
    coordinator: Arc<ScheduledAccrualCoordinator>,
    clock: SharedClock,
    hour: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(hour, "Daily accrual driver started");
        loop {
            let now = clock.now();
            let next = next_run_after(now, hour);
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let as_of = clock.today();
            let report = coordinator.run_for(as_of).await;
            tracing::info!(
                %as_of,
                loans_swept = %report.loans_swept,
                deposits_swept = %report.deposits_swept,
                loans_accrued = %report.loans_accrued,
                deposits_accrued = %report.deposits_accrued,
                failed_stages = report.failures.len(),
                "Daily accrual completed"
            );
        }
    })
}
