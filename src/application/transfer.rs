use crate::application::locks::LockRegistry;
use crate::application::notifier::Notifier;
use crate::application::resolver::{ResolvedEndpoint, TransactionEntityResolver};
use crate::config::ReserveAccounts;
use crate::domain::account::Account;
use crate::domain::endpoint::{EndpointDescriptor, EndpointRecord};
use crate::domain::money::Currency;
use crate::domain::ports::{
    Ports, SharedAccountStore, SharedClock, SharedLedgerStore, SharedTransactionStore,
};
use crate::domain::transaction::{Transaction, TransferRequest};
use crate::domain::user::NotificationKind;
use crate::error::{Entity, LedgerError, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Moves money between two endpoints.
///
/// A transfer either completes, changing both balances and storing a
/// `done=true` transaction, or is denied: a `done=false` transaction and a
/// notification for the sender are stored and `LedgerError::TransferDenied`
/// is returned. Storage failures are the exception and propagate unchanged.
pub struct LedgerTransferEngine {
    resolver: TransactionEntityResolver,
    accounts: SharedAccountStore,
    transactions: SharedTransactionStore,
    ledger: SharedLedgerStore,
    notifier: Notifier,
    clock: SharedClock,
    reserves: ReserveAccounts,
    locks: Arc<LockRegistry<String>>,
}

impl LedgerTransferEngine {
    pub fn new(ports: &Ports, reserves: ReserveAccounts) -> Self {
        Self {
            resolver: TransactionEntityResolver::new(ports),
            accounts: ports.accounts.clone(),
            transactions: ports.transactions.clone(),
            ledger: ports.ledger.clone(),
            notifier: Notifier::new(ports),
            clock: ports.clock.clone(),
            reserves,
            locks: Arc::new(LockRegistry::new()),
        }
    }

    /// Account locks, keyed by account number. Anything else that rewrites a
    /// stored account must hold the same lock.
    pub fn account_locks(&self) -> Arc<LockRegistry<String>> {
        self.locks.clone()
    }

    pub fn resolver(&self) -> &TransactionEntityResolver {
        &self.resolver
    }

    /// Executes a single transfer.
    ///
    /// Both endpoints are resolved, the two accounts locked and re-read, and
    /// the balances and `done=true` record committed in one write. Returns
    /// `TransferDenied` carrying the persisted `done=false` record when the
    /// request is rejected.
    ///
    /// # Arguments
    ///
    /// * `request` - Endpoints, amount, currency and description as submitted.
    pub async fn transfer(&self, request: TransferRequest) -> Result<Transaction> {
        match self.execute(&request).await {
            Ok(tx) => Ok(tx),
            Err(e) if e.is_storage_failure() => Err(e),
            Err(e) => Err(self.deny(&request, e).await?),
        }
    }

    async fn execute(&self, request: &TransferRequest) -> Result<Transaction> {
        let from = self.resolver.resolve(&request.from).await?;
        let to = self.resolver.resolve(&request.to).await?;

        let _guards = self
            .locks
            .lock_many([&from.account.number, &to.account.number])
            .await;

        // Balances may have moved since resolution.
        let mut source = self.reload(&from.account).await?;
        let mut target = self.reload(&to.account).await?;

        target.ensure_currency(source.currency)?;
        source.ensure_currency(request.currency)?;

        let changed = if source.id == target.id {
            if source.balance < request.amount.value() {
                return Err(LedgerError::insufficient_funds(
                    &source.number,
                    source.balance,
                    request.amount.value(),
                ));
            }
            Vec::new()
        } else {
            source.debit(request.amount)?;
            target.credit(request.amount)?;
            vec![source, target]
        };

        let tx = Transaction::completed(
            from.canonical,
            to.canonical,
            request.amount,
            request.currency,
            request.description.clone(),
            self.clock.now(),
        );
        self.ledger.commit_transfer(changed, tx.clone()).await?;

        tracing::info!(
            transaction_id = %tx.id,
            from = %tx.from.value,
            to = %tx.to.value,
            amount = %tx.amount,
            currency = %tx.currency,
            "Transfer completed"
        );
        Ok(tx)
    }

    async fn reload(&self, account: &Account) -> Result<Account> {
        self.accounts
            .get(account.id)
            .await?
            .filter(|a| !a.deleted)
            .ok_or_else(|| LedgerError::not_found(Entity::Account, &account.number))
    }

    /// Persists the denied attempt and notifies the sender. Returns the error
    /// to hand back to the caller.
    async fn deny(&self, request: &TransferRequest, reason: LedgerError) -> Result<LedgerError> {
        let now = self.clock.now();
        let from = self.describe(&request.from).await;
        let to = self.describe(&request.to).await;

        let tx = Transaction::denied(
            from,
            to,
            request.amount,
            request.currency,
            &request.description,
            &reason.to_string(),
            now,
        );
        self.transactions.store(tx.clone()).await?;

        if let Some(owner) = tx.from.owner_id {
            self.notifier
                .notify(
                    owner,
                    NotificationKind::TransferDenied,
                    format!(
                        "Transfer of {} {} to {} was denied: {reason}",
                        tx.amount, tx.currency, tx.to.value
                    ),
                    now,
                )
                .await?;
        }

        tracing::warn!(
            transaction_id = %tx.id,
            from = %tx.from.value,
            to = %tx.to.value,
            amount = %tx.amount,
            reason = %reason,
            "Transfer denied"
        );

        Ok(LedgerError::TransferDenied {
            transaction: Box::new(tx),
            reason: Box::new(reason),
        })
    }

    /// Best-effort canonical form of one side of a denied transfer.
    async fn describe(&self, descriptor: &EndpointDescriptor) -> EndpointRecord {
        match self.resolver.resolve(descriptor).await {
            Ok(ResolvedEndpoint { canonical, .. }) => canonical.into(),
            Err(_) => EndpointRecord::unresolved(descriptor),
        }
    }

    /// The bank's reserve account for `currency`.
    pub async fn reserve_account(&self, currency: Currency) -> Result<Account> {
        let id = self.reserves.get(currency)?;
        self.accounts
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(Entity::Account, id))
    }

    /// Number of the bank reserve for `currency`.
    pub async fn reserve_number(&self, currency: Currency) -> Result<String> {
        Ok(self.reserve_account(currency).await?.number)
    }

    /// Completed and denied transactions in which `user_id` owns either side,
    /// oldest first.
    pub async fn history_of(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        let mut history = self.transactions.find_by_user(user_id).await?;
        history.sort_by_key(|tx| tx.timestamp);
        Ok(history)
    }
}
