use crate::domain::account::Account;
use crate::domain::ports::{AccountStore, LedgerStore, TransactionStore};
use crate::domain::transaction::Transaction;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for account states, keyed by account id.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family mapping account numbers to account ids.
pub const CF_ACCOUNT_NUMBERS: &str = "account_numbers";
/// Column Family for the transaction log, keyed by transaction id.
pub const CF_TRANSACTIONS: &str = "transactions";

/// A persistent store for accounts and the transaction log using RocksDB.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

fn internal(message: String) -> LedgerError {
    LedgerError::InternalError(Box::new(std::io::Error::other(message)))
}

fn already_recorded(id: Uuid) -> LedgerError {
    LedgerError::ValidationError(format!("Transaction {id} is already recorded"))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| internal(format!("Serialization error: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| internal(format!("Deserialization error: {e}")))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating the
    /// column families if they are missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_ACCOUNTS, CF_ACCOUNT_NUMBERS, CF_TRANSACTIONS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, families)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("Column family '{name}' not found")))
    }

    fn get_value<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(decode(&value)?);
        }
        Ok(values)
    }

    fn put_account(&self, batch: &mut WriteBatch, account: &Account) -> Result<()> {
        batch.put_cf(self.cf(CF_ACCOUNTS)?, account.id.as_bytes(), encode(account)?);
        batch.put_cf(
            self.cf(CF_ACCOUNT_NUMBERS)?,
            account.number.as_bytes(),
            account.id.as_bytes(),
        );
        Ok(())
    }
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn store(&self, account: Account) -> Result<()> {
        self.store_all(vec![account]).await
    }

    async fn store_all(&self, accounts: Vec<Account>) -> Result<()> {
        let mut batch = WriteBatch::default();
        for account in &accounts {
            self.put_account(&mut batch, account)?;
        }
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Account>> {
        self.get_value(CF_ACCOUNTS, id.as_bytes())
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<Account>> {
        let Some(id) = self.db.get_cf(self.cf(CF_ACCOUNT_NUMBERS)?, number.as_bytes())? else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&id).map_err(|e| internal(format!("Corrupt account index: {e}")))?;
        self.get_value(CF_ACCOUNTS, id.as_bytes())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Account>> {
        let mut owned: Vec<Account> = self
            .scan::<Account>(CF_ACCOUNTS)?
            .into_iter()
            .filter(|a| a.owner_id == owner_id)
            .collect();
        owned.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(owned)
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        let mut all = self.scan::<Account>(CF_ACCOUNTS)?;
        all.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(all)
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        if self.db.get_pinned_cf(cf, tx.id.as_bytes())?.is_some() {
            return Err(already_recorded(tx.id));
        }
        self.db.put_cf(cf, tx.id.as_bytes(), encode(&tx)?)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>> {
        self.get_value(CF_TRANSACTIONS, id.as_bytes())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self
            .scan::<Transaction>(CF_TRANSACTIONS)?
            .into_iter()
            .filter(|tx| tx.involves(user_id))
            .collect())
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    /// One `WriteBatch` across the account, account-number and transaction
    /// column families.
    async fn commit_transfer(&self, accounts: Vec<Account>, tx: Transaction) -> Result<()> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        if self.db.get_pinned_cf(cf, tx.id.as_bytes())?.is_some() {
            return Err(already_recorded(tx.id));
        }
        let mut batch = WriteBatch::default();
        for account in &accounts {
            self.put_account(&mut batch, account)?;
        }
        batch.put_cf(cf, tx.id.as_bytes(), encode(&tx)?);
        self.db.write(batch)?;
        Ok(())
    }
}
