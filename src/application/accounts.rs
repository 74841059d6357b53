use crate::application::locks::LockRegistry;
use crate::domain::account::{Account, AccountType, is_valid_account_number};
use crate::domain::money::Currency;
use crate::domain::ports::{Ports, SharedAccountNumberGenerator, SharedAccountStore, SharedUserStore};
use crate::error::{Entity, LedgerError, Result};
use std::sync::Arc;
use uuid::Uuid;

const MAX_NUMBER_DRAWS: usize = 32;

/// Opens accounts and maintains the one-default-per-owner rule.
pub struct AccountService {
    accounts: SharedAccountStore,
    users: SharedUserStore,
    numbers: SharedAccountNumberGenerator,
    locks: Arc<LockRegistry<String>>,
}

impl AccountService {
    /// `locks` must be the transfer engine's account locks.
    pub fn new(ports: &Ports, locks: Arc<LockRegistry<String>>) -> Self {
        Self {
            accounts: ports.accounts.clone(),
            users: ports.users.clone(),
            numbers: ports.numbers.clone(),
            locks,
        }
    }

    /// Opens an account with a fresh 16-digit number. An owner's first live
    /// account becomes their default.
    pub async fn open_account(
        &self,
        owner_id: Uuid,
        currency: Currency,
        account_type: AccountType,
    ) -> Result<Account> {
        self.users
            .get(owner_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(Entity::User, owner_id))?;

        let number = self.allocate_number().await?;
        let _guard = self.locks.lock(&number).await;

        let has_live = self
            .accounts
            .find_by_owner(owner_id)
            .await?
            .iter()
            .any(|a| !a.deleted);
        let mut account = Account::new(owner_id, number, currency, account_type);
        account.is_default = !has_live;
        self.accounts.store(account.clone()).await?;

        tracing::info!(
            account = %account.number,
            owner = %owner_id,
            currency = %currency,
            default = account.is_default,
            "Account opened"
        );
        Ok(account)
    }

    async fn allocate_number(&self) -> Result<String> {
        for _ in 0..MAX_NUMBER_DRAWS {
            let candidate = self.numbers.generate();
            if !is_valid_account_number(&candidate) {
                continue;
            }
            if self.accounts.find_by_number(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            tracing::debug!(number = %candidate, "Account number collision, drawing again");
        }
        Err(LedgerError::InternalError(
            format!("no free account number after {MAX_NUMBER_DRAWS} draws").into(),
        ))
    }

    /// Makes `number` the owner's only default account.
    pub async fn set_default_account(&self, owner_id: Uuid, number: &str) -> Result<Account> {
        let owned = self.accounts.find_by_owner(owner_id).await?;
        if !owned.iter().any(|a| a.number == number && !a.deleted) {
            return Err(LedgerError::not_found(Entity::Account, number));
        }

        let _guards = self.locks.lock_many(owned.iter().map(|a| &a.number)).await;

        // Re-read under the locks so concurrent balance changes survive.
        let mut updated = Vec::with_capacity(owned.len());
        let mut chosen = None;
        for account in &owned {
            let Some(mut current) = self.accounts.get(account.id).await? else {
                continue;
            };
            current.is_default = current.number == number && !current.deleted;
            if current.is_default {
                chosen = Some(current.clone());
            }
            updated.push(current);
        }
        let chosen = chosen.ok_or_else(|| LedgerError::not_found(Entity::Account, number))?;
        self.accounts.store_all(updated).await?;

        tracing::info!(account = %number, owner = %owner_id, "Default account changed");
        Ok(chosen)
    }

    pub async fn accounts_of(&self, owner_id: Uuid) -> Result<Vec<Account>> {
        Ok(self
            .accounts
            .find_by_owner(owner_id)
            .await?
            .into_iter()
            .filter(|a| !a.deleted)
            .collect())
    }
}
