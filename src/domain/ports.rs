//! Boundaries the engines consume. Storage, delivery, token checking, time and
//! number allocation all live behind these traits.

use super::account::Account;
use super::creditworthiness::CreditworthinessTier;
use super::deposit::Deposit;
use super::endpoint::InstrumentKind;
use super::loan::Loan;
use super::product::ProductType;
use super::transaction::Transaction;
use super::user::{Card, Notification, User};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn store(&self, account: Account) -> Result<()>;
    /// Persists all accounts as one unit: either every one is written or none is.
    async fn store_all(&self, accounts: Vec<Account>) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Account>>;
    async fn find_by_number(&self, number: &str) -> Result<Option<Account>>;
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Account>>;
    async fn get_all(&self) -> Result<Vec<Account>>;
}

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn store(&self, card: Card) -> Result<()>;
    async fn find_by_number(&self, number: &str) -> Result<Option<Card>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn store(&self, user: User) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>>;
    /// Appends to the user's notification list. Fails with `NotFound` for
    /// unknown users.
    async fn push_notification(&self, notification: Notification) -> Result<()>;
    async fn references_tier(&self, tier_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn store(&self, tx: Transaction) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Transaction>>;
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Transaction>>;
}

/// Commits a completed transfer: the changed accounts and the ledger entry
/// are written together or not at all.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn commit_transfer(&self, accounts: Vec<Account>, tx: Transaction) -> Result<()>;
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn store(&self, loan: Loan) -> Result<()>;
    async fn store_all(&self, loans: Vec<Loan>) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Loan>>;
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Loan>>;
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Loan>>;
    async fn find_in_progress(&self) -> Result<Vec<Loan>>;
}

#[async_trait]
pub trait DepositStore: Send + Sync {
    async fn store(&self, deposit: Deposit) -> Result<()>;
    async fn store_all(&self, deposits: Vec<Deposit>) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Deposit>>;
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Deposit>>;
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Deposit>>;
    async fn find_in_progress(&self) -> Result<Vec<Deposit>>;
}

/// Loan-type and deposit-type catalogues share this shape.
#[async_trait]
pub trait ProductTypeStore: Send + Sync {
    async fn store(&self, product: ProductType) -> Result<()>;
    async fn find_by_name(&self, name: &str) -> Result<Option<ProductType>>;
    async fn get_all(&self) -> Result<Vec<ProductType>>;
}

#[async_trait]
pub trait CreditworthinessStore: Send + Sync {
    /// All tiers sorted by `order`.
    async fn list_ordered(&self) -> Result<Vec<CreditworthinessTier>>;
    async fn get(&self, id: Uuid) -> Result<Option<CreditworthinessTier>>;
    async fn store(&self, tier: CreditworthinessTier) -> Result<()>;
    async fn store_all(&self, tiers: Vec<CreditworthinessTier>) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Accepts a notification for delivery and returns immediately.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: Notification);
}

/// Decoded contents of a QR capability token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload {
    pub number: String,
    pub kind: InstrumentKind,
}

/// Verifies signature and expiry of a QR token. Fails with `TokenExpired` or
/// `TokenInvalid`.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<QrPayload>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Produces candidate 16-digit account numbers. Callers check for collisions.
pub trait AccountNumberGenerator: Send + Sync {
    fn generate(&self) -> String;
}

pub type SharedAccountStore = Arc<dyn AccountStore>;
pub type SharedCardStore = Arc<dyn CardStore>;
pub type SharedUserStore = Arc<dyn UserStore>;
pub type SharedTransactionStore = Arc<dyn TransactionStore>;
pub type SharedLedgerStore = Arc<dyn LedgerStore>;
pub type SharedLoanStore = Arc<dyn LoanStore>;
pub type SharedDepositStore = Arc<dyn DepositStore>;
pub type SharedProductTypeStore = Arc<dyn ProductTypeStore>;
pub type SharedCreditworthinessStore = Arc<dyn CreditworthinessStore>;
pub type SharedNotificationSink = Arc<dyn NotificationSink>;
pub type SharedTokenVerifier = Arc<dyn TokenVerifier>;
pub type SharedClock = Arc<dyn Clock>;
pub type SharedAccountNumberGenerator = Arc<dyn AccountNumberGenerator>;

/// Every collaborator the engines need, wired once at start-up.
#[derive(Clone)]
pub struct Ports {
    pub accounts: SharedAccountStore,
    pub cards: SharedCardStore,
    pub users: SharedUserStore,
    pub transactions: SharedTransactionStore,
    /// Must write to the same storage as `accounts` and `transactions`.
    pub ledger: SharedLedgerStore,
    pub loans: SharedLoanStore,
    pub loan_types: SharedProductTypeStore,
    pub deposits: SharedDepositStore,
    pub deposit_types: SharedProductTypeStore,
    pub tiers: SharedCreditworthinessStore,
    pub notifications: SharedNotificationSink,
    pub tokens: SharedTokenVerifier,
    pub clock: SharedClock,
    pub numbers: SharedAccountNumberGenerator,
}
