use crate::application::BatchSummary;
use crate::application::catalogue::Catalogue;
use crate::application::locks::LockRegistry;
use crate::application::notifier::Notifier;
use crate::application::transfer::LedgerTransferEngine;
use crate::domain::deposit::Deposit;
use crate::domain::money::{Amount, Currency};
use crate::domain::ports::{Ports, SharedClock, SharedDepositStore};
use crate::domain::product::DepositType;
use crate::domain::transaction::TransferRequest;
use crate::domain::user::NotificationKind;
use crate::error::{Entity, LedgerError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct DepositApplication {
    pub user_id: Uuid,
    /// Account the principal is drawn from; the payout returns here.
    pub from_account: String,
    pub deposit_type: String,
    pub amount: Amount,
    pub currency: Currency,
    pub percent: Decimal,
    pub duration: u32,
}

/// Term deposits: funds move into the reserve on opening and top-up, and
/// back out, with interest, on closing.
pub struct DepositEngine {
    transfers: Arc<LedgerTransferEngine>,
    deposits: SharedDepositStore,
    catalogue: Catalogue,
    notifier: Notifier,
    clock: SharedClock,
    locks: LockRegistry<Uuid>,
    batch_size: usize,
}

impl DepositEngine {
    pub fn new(ports: &Ports, transfers: Arc<LedgerTransferEngine>, batch_size: usize) -> Self {
        Self {
            transfers,
            deposits: ports.deposits.clone(),
            catalogue: Catalogue::new(ports.deposit_types.clone(), Entity::DepositType),
            notifier: Notifier::new(ports),
            clock: ports.clock.clone(),
            locks: LockRegistry::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub async fn register_deposit_type(&self, deposit_type: DepositType) -> Result<DepositType> {
        self.catalogue.register(deposit_type).await
    }

    pub async fn deposit_types(&self) -> Result<Vec<DepositType>> {
        self.catalogue.all().await
    }

    /// Opens a deposit, moving its principal from the source account into the
    /// reserve.
    ///
    /// # Arguments
    ///
    /// * `application` - Owner, source account, deposit type and terms.
    pub async fn create_deposit(&self, application: DepositApplication) -> Result<Deposit> {
        let source = self
            .transfers
            .resolver()
            .live_account_by_number(&application.from_account)
            .await?;
        source.ensure_currency(application.currency)?;

        let option = self
            .catalogue
            .option(&application.deposit_type, application.duration, application.percent)
            .await?;
        let reserve = self.transfers.reserve_number(application.currency).await?;

        let mut deposit = Deposit::open(
            application.user_id,
            &application.deposit_type,
            application.amount,
            application.currency,
            option,
            &source.number,
            self.clock.today(),
        )?;

        let tx = self
            .transfers
            .transfer(TransferRequest::between_accounts(
                &source.number,
                reserve,
                application.amount,
                application.currency,
                format!("Deposit {} opening", deposit.id),
            ))
            .await?;
        deposit.transaction_ids.push(tx.id);
        self.deposits.store(deposit.clone()).await?;

        tracing::info!(
            deposit_id = %deposit.id,
            user_id = %deposit.user_id,
            amount = %deposit.amount,
            currency = %deposit.currency,
            end = %deposit.end,
            "Deposit opened"
        );
        Ok(deposit)
    }

    /// Adds `amount` from `from_account` to an open deposit.
    pub async fn top_up_deposit(
        &self,
        deposit_id: Uuid,
        amount: Amount,
        from_account: &str,
    ) -> Result<Deposit> {
        let _guard = self.locks.lock(&deposit_id).await;
        let mut deposit = self.load(deposit_id).await?;
        deposit.ensure_open()?;

        let payer = self
            .transfers
            .resolver()
            .live_account_by_number(from_account)
            .await?;
        payer.ensure_currency(deposit.currency)?;
        deposit.topped_up(amount)?;

        let reserve = self.transfers.reserve_number(deposit.currency).await?;
        let tx = self
            .transfers
            .transfer(TransferRequest::between_accounts(
                &payer.number,
                reserve,
                amount,
                deposit.currency,
                format!("Deposit {} top-up", deposit.id),
            ))
            .await?;

        deposit.top_up(amount, tx.id)?;
        self.deposits.store(deposit.clone()).await?;

        tracing::info!(deposit_id = %deposit.id, added = %amount, amount = %deposit.amount, "Deposit topped up");
        Ok(deposit)
    }

    /// Pays the accrued amount back to the source account and closes the
    /// deposit. If the payout is denied the deposit stays open.
    pub async fn close_deposit(&self, deposit_id: Uuid) -> Result<Deposit> {
        let _guard = self.locks.lock(&deposit_id).await;
        let mut deposit = self.load(deposit_id).await?;
        deposit.ensure_open()?;
        self.pay_out(&mut deposit).await?;
        Ok(deposit)
    }

    /// Adds one day of interest to every open deposit whose window covers
    /// `as_of`.
    pub async fn accrue_daily(&self, as_of: NaiveDate) -> Result<BatchSummary> {
        let ids = self.in_progress_ids().await?;
        let mut summary = BatchSummary::default();

        for chunk in ids.chunks(self.batch_size) {
            let _guards = self.locks.lock_many(chunk).await;
            let mut changed = Vec::new();

            for mut deposit in self.deposits.get_many(chunk).await? {
                summary.examined += 1;
                match deposit.accrue(as_of) {
                    Ok(Some(_)) => changed.push(deposit),
                    Ok(None) => {
                        tracing::debug!(deposit_id = %deposit.id, %as_of, "Accrual skipped");
                        summary.skipped += 1;
                    }
                    Err(e) => {
                        tracing::warn!(deposit_id = %deposit.id, %as_of, error = %e, "Accrual failed");
                        summary.failed += 1;
                    }
                }
            }

            summary.updated += changed.len();
            self.deposits.store_all(changed).await?;
        }

        tracing::info!(%as_of, %summary, "Deposit accrual finished");
        Ok(summary)
    }

    /// Closes every open deposit whose end date has passed, paying it out.
    /// A denied payout is counted and retried on the next run.
    pub async fn sweep_ended(&self, as_of: NaiveDate) -> Result<BatchSummary> {
        let ids = self.in_progress_ids().await?;
        let mut summary = BatchSummary::default();

        for chunk in ids.chunks(self.batch_size) {
            let _guards = self.locks.lock_many(chunk).await;

            for mut deposit in self.deposits.get_many(chunk).await? {
                summary.examined += 1;
                if !deposit.is_open() || !deposit.has_ended(as_of) {
                    summary.skipped += 1;
                    continue;
                }
                // Each payout commits its own closure.
                match self.pay_out(&mut deposit).await {
                    Ok(()) => summary.updated += 1,
                    Err(e) if e.denied_transaction().is_some() => {
                        tracing::warn!(deposit_id = %deposit.id, error = %e, "Deposit payout denied, left open");
                        summary.failed += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::info!(%as_of, %summary, "Deposit sweep finished");
        Ok(summary)
    }

    pub async fn deposits_of(&self, user_id: Uuid) -> Result<Vec<Deposit>> {
        self.deposits.find_by_user(user_id).await
    }

    pub async fn get(&self, deposit_id: Uuid) -> Result<Deposit> {
        self.load(deposit_id).await
    }

    /// Caller holds the deposit lock.
    async fn pay_out(&self, deposit: &mut Deposit) -> Result<()> {
        let reserve = self.transfers.reserve_number(deposit.currency).await?;
        let tx = self
            .transfers
            .transfer(TransferRequest::between_accounts(
                reserve,
                &deposit.source_account,
                Amount::new(deposit.amount)?,
                deposit.currency,
                format!("Deposit {} payout", deposit.id),
            ))
            .await?;

        deposit.close(tx.id);
        self.deposits.store(deposit.clone()).await?;

        tracing::info!(deposit_id = %deposit.id, paid = %deposit.amount, "Deposit closed");
        self.notifier
            .notify(
                deposit.user_id,
                NotificationKind::DepositClosed,
                format!(
                    "Deposit {} closed, {} {} paid to {}",
                    deposit.id, deposit.amount, deposit.currency, deposit.source_account
                ),
                self.clock.now(),
            )
            .await
    }

    async fn load(&self, deposit_id: Uuid) -> Result<Deposit> {
        self.deposits
            .get(deposit_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(Entity::Deposit, deposit_id))
    }

    async fn in_progress_ids(&self) -> Result<Vec<Uuid>> {
        Ok(self
            .deposits
            .find_in_progress()
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect())
    }
}
