use crate::application::BatchSummary;
use crate::application::catalogue::Catalogue;
use crate::application::creditworthiness::CreditworthinessOrderRegistry;
use crate::application::locks::LockRegistry;
use crate::application::notifier::Notifier;
use crate::application::transfer::LedgerTransferEngine;
use crate::domain::loan::{Accrual, Loan, LoanStatus, payment_history_is_clean};
use crate::domain::money::{Amount, Currency};
use crate::domain::ports::{Ports, SharedClock, SharedLoanStore};
use crate::domain::product::LoanType;
use crate::domain::transaction::TransferRequest;
use crate::domain::user::NotificationKind;
use crate::error::{Entity, LedgerError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// A request to take out a loan.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanApplication {
    pub user_id: Uuid,
    /// Account the principal is paid into.
    pub to_account: String,
    pub loan_type: String,
    pub amount: Amount,
    pub currency: Currency,
    pub percent: Decimal,
    /// Months.
    pub duration: u32,
}

/// Originates loans, takes payments, accrues interest and finalizes ended
/// loans. All fund movement goes through the transfer engine; the reserve
/// account for the loan's currency is the counterparty.
pub struct LoanEngine {
    transfers: Arc<LedgerTransferEngine>,
    tiers: Arc<CreditworthinessOrderRegistry>,
    loans: SharedLoanStore,
    catalogue: Catalogue,
    notifier: Notifier,
    clock: SharedClock,
    locks: LockRegistry<Uuid>,
    batch_size: usize,
}

impl LoanEngine {
    /// Creates a new `LoanEngine`.
    ///
    /// # Arguments
    ///
    /// * `ports` - Stores, clock and notification sink.
    /// * `transfers` - Moves disbursements and payments on the ledger.
    /// * `tiers` - Consulted for borrowers with a defaulted loan.
    /// * `batch_size` - Loans locked and committed together by the daily passes.
    pub fn new(
        ports: &Ports,
        transfers: Arc<LedgerTransferEngine>,
        tiers: Arc<CreditworthinessOrderRegistry>,
        batch_size: usize,
    ) -> Self {
        Self {
            transfers,
            tiers,
            loans: ports.loans.clone(),
            catalogue: Catalogue::new(ports.loan_types.clone(), Entity::LoanType),
            notifier: Notifier::new(ports),
            clock: ports.clock.clone(),
            locks: LockRegistry::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub async fn register_loan_type(&self, loan_type: LoanType) -> Result<LoanType> {
        self.catalogue.register(loan_type).await
    }

    pub async fn loan_types(&self) -> Result<Vec<LoanType>> {
        self.catalogue.all().await
    }

    /// Originates a loan and disburses it from the reserve.
    ///
    /// The destination account must hold the loan currency and the loan type
    /// must offer the exact `(duration, percent)` pair. The installment is
    /// fixed here and never recomputed.
    ///
    /// # Arguments
    ///
    /// * `application` - Borrower, destination account, loan type and terms.
    pub async fn create_loan(&self, application: LoanApplication) -> Result<Loan> {
        let destination = self
            .transfers
            .resolver()
            .live_account_by_number(&application.to_account)
            .await?;
        destination.ensure_currency(application.currency)?;

        let option = self
            .catalogue
            .option(&application.loan_type, application.duration, application.percent)
            .await?;
        let reserve = self.transfers.reserve_number(application.currency).await?;

        let mut loan = Loan::originate(
            application.user_id,
            &application.loan_type,
            application.amount,
            application.currency,
            option,
            self.clock.today(),
        )?;

        let tx = self
            .transfers
            .transfer(TransferRequest::between_accounts(
                reserve,
                &destination.number,
                application.amount,
                application.currency,
                format!("Loan {} disbursement", loan.id),
            ))
            .await?;
        loan.transaction_ids.push(tx.id);
        self.loans.store(loan.clone()).await?;

        tracing::info!(
            loan_id = %loan.id,
            user_id = %loan.user_id,
            principal = %loan.principal,
            currency = %loan.currency,
            payment = %loan.payment.round_dp(2),
            end = %loan.end,
            "Loan originated"
        );
        Ok(loan)
    }

    /// Applies a payment from `from_account` to the reserve.
    ///
    /// The amount must cover the minimal installment; anything above the
    /// outstanding balance is not charged. A denied transfer leaves the loan
    /// unchanged.
    ///
    /// # Arguments
    ///
    /// * `loan_id` - The loan being repaid.
    /// * `amount` - The offered payment.
    /// * `from_account` - Number of the paying account.
    pub async fn pay_loan(&self, loan_id: Uuid, amount: Amount, from_account: &str) -> Result<Loan> {
        let _guard = self.locks.lock(&loan_id).await;
        let mut loan = self.load(loan_id).await?;

        if loan.outstanding <= Decimal::ZERO || !loan.is_in_progress() {
            return Err(LedgerError::AlreadyPaid(loan.id));
        }
        let payer = self
            .transfers
            .resolver()
            .live_account_by_number(from_account)
            .await?;
        payer.ensure_currency(loan.currency)?;
        let applied = loan.applicable_payment(amount)?;

        let reserve = self.transfers.reserve_number(loan.currency).await?;
        let tx = self
            .transfers
            .transfer(TransferRequest::between_accounts(
                &payer.number,
                reserve,
                applied,
                loan.currency,
                format!("Loan {} payment", loan.id),
            ))
            .await?;

        loan.record_payment(applied, self.clock.today(), tx.id);
        self.loans.store(loan.clone()).await?;

        tracing::info!(
            loan_id = %loan.id,
            applied = %applied,
            outstanding = %loan.outstanding,
            "Loan payment applied"
        );
        if loan.status == LoanStatus::Payed {
            self.announce(&loan).await?;
        }
        Ok(loan)
    }

    /// Adds one day of interest to every loan in progress whose window covers
    /// `as_of`. Loans already accrued for `as_of` are skipped.
    pub async fn accrue_daily(&self, as_of: NaiveDate) -> Result<BatchSummary> {
        let ids = self.in_progress_ids().await?;
        let mut summary = BatchSummary::default();

        for chunk in ids.chunks(self.batch_size) {
            let _guards = self.locks.lock_many(chunk).await;
            let mut changed = Vec::new();
            let mut settled = Vec::new();

            for mut loan in self.loans.get_many(chunk).await? {
                summary.examined += 1;
                match loan.accrue(as_of) {
                    Ok(Accrual::Accrued(_)) => changed.push(loan),
                    Ok(Accrual::Settled) => {
                        settled.push(loan.clone());
                        changed.push(loan);
                    }
                    Ok(Accrual::Skipped) => {
                        tracing::debug!(loan_id = %loan.id, %as_of, "Accrual skipped");
                        summary.skipped += 1;
                    }
                    Err(e) => {
                        tracing::warn!(loan_id = %loan.id, %as_of, error = %e, "Accrual failed");
                        summary.failed += 1;
                    }
                }
            }

            summary.updated += changed.len();
            self.loans.store_all(changed).await?;
            for loan in &settled {
                self.announce(loan).await?;
            }
        }

        tracing::info!(%as_of, %summary, "Loan accrual finished");
        Ok(summary)
    }

    /// Moves every loan in progress whose end date has passed to its terminal
    /// status.
    pub async fn sweep_ended(&self, as_of: NaiveDate) -> Result<BatchSummary> {
        let ids = self.in_progress_ids().await?;
        let mut summary = BatchSummary::default();

        for chunk in ids.chunks(self.batch_size) {
            let _guards = self.locks.lock_many(chunk).await;
            let mut finalized = Vec::new();

            for mut loan in self.loans.get_many(chunk).await? {
                summary.examined += 1;
                if loan.is_in_progress() && loan.has_ended(as_of) {
                    loan.finalize();
                    finalized.push(loan);
                } else {
                    summary.skipped += 1;
                }
            }

            summary.updated += finalized.len();
            self.loans.store_all(finalized.clone()).await?;
            for loan in &finalized {
                self.announce(loan).await?;
            }
        }

        tracing::info!(%as_of, %summary, "Loan sweep finished");
        Ok(summary)
    }

    /// Whether `user_id` may take out another loan, judged from the history of
    /// their existing loans.
    pub async fn is_eligible(&self, user_id: Uuid) -> Result<bool> {
        let loans = self.loans.find_by_user(user_id).await?;
        if loans.is_empty() {
            return Ok(true);
        }
        if loans.iter().any(|l| l.status == LoanStatus::NotPayed) {
            let last = self.tiers.last_tier().await?;
            return Ok(last.is_some_and(|tier| tier.can_get_loan));
        }
        Ok(payment_history_is_clean(&loans, self.clock.today()))
    }

    pub async fn loans_of(&self, user_id: Uuid) -> Result<Vec<Loan>> {
        self.loans.find_by_user(user_id).await
    }

    pub async fn get(&self, loan_id: Uuid) -> Result<Loan> {
        self.load(loan_id).await
    }

    async fn load(&self, loan_id: Uuid) -> Result<Loan> {
        self.loans
            .get(loan_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(Entity::Loan, loan_id))
    }

    async fn in_progress_ids(&self) -> Result<Vec<Uuid>> {
        Ok(self
            .loans
            .find_in_progress()
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect())
    }

    async fn announce(&self, loan: &Loan) -> Result<()> {
        let now = self.clock.now();
        match loan.status {
            LoanStatus::Payed => {
                self.notifier
                    .notify(
                        loan.user_id,
                        NotificationKind::LoanPaid,
                        format!("Loan {} is fully paid", loan.id),
                        now,
                    )
                    .await
            }
            LoanStatus::NotPayed => {
                tracing::warn!(
                    loan_id = %loan.id,
                    user_id = %loan.user_id,
                    outstanding = %loan.outstanding,
                    "Loan ended unpaid"
                );
                self.notifier
                    .notify(
                        loan.user_id,
                        NotificationKind::LoanDefaulted,
                        format!(
                            "Loan {} ended with {} {} outstanding",
                            loan.id, loan.outstanding, loan.currency
                        ),
                        now,
                    )
                    .await
            }
            LoanStatus::InProgress => Ok(()),
        }
    }
}
