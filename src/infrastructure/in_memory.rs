use crate::domain::account::Account;
use crate::domain::creditworthiness::CreditworthinessTier;
use crate::domain::deposit::{Deposit, DepositStatus};
use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::ports::{
    AccountStore, CardStore, CreditworthinessStore, DepositStore, LedgerStore, LoanStore, Ports,
    ProductTypeStore, SharedAccountNumberGenerator, SharedClock, SharedNotificationSink,
    SharedTokenVerifier, TransactionStore, UserStore,
};
use crate::domain::product::ProductType;
use crate::domain::transaction::Transaction;
use crate::domain::user::{Card, Notification, User};
use crate::error::{Entity, LedgerError, Result};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::notifications::ChannelNotificationSink;
use crate::infrastructure::number_generator::RandomAccountNumberGenerator;
use crate::infrastructure::token::JwtTokenVerifier;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory store for accounts, indexed by id and number.
///
/// Both indexes sit behind one lock, so `store_all` is atomic.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    inner: Arc<RwLock<AccountTable>>,
}

#[derive(Default)]
struct AccountTable {
    by_id: HashMap<Uuid, Account>,
    by_number: HashMap<String, Uuid>,
}

impl AccountTable {
    fn insert(&mut self, account: Account) {
        self.by_number.insert(account.number.clone(), account.id);
        self.by_id.insert(account.id, account);
    }
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn store(&self, account: Account) -> Result<()> {
        self.inner.write().await.insert(account);
        Ok(())
    }

    async fn store_all(&self, accounts: Vec<Account>) -> Result<()> {
        let mut table = self.inner.write().await;
        for account in accounts {
            table.insert(account);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<Account>> {
        let table = self.inner.read().await;
        Ok(table
            .by_number
            .get(number)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Account>> {
        let table = self.inner.read().await;
        let mut owned: Vec<Account> = table
            .by_id
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(owned)
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        let mut all: Vec<Account> = self.inner.read().await.by_id.values().cloned().collect();
        all.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(all)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCardStore {
    cards: Arc<RwLock<HashMap<String, Card>>>,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn store(&self, card: Card) -> Result<()> {
        self.cards.write().await.insert(card.number.clone(), card);
        Ok(())
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<Card>> {
        Ok(self.cards.read().await.get(number).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn store(&self, user: User) -> Result<()> {
        self.users.write().await.insert(user.id, user);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.phone == phone)
            .cloned())
    }

    async fn push_notification(&self, notification: Notification) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&notification.user_id)
            .ok_or_else(|| LedgerError::not_found(Entity::User, notification.user_id))?;
        user.notifications.push(notification);
        Ok(())
    }

    async fn references_tier(&self, tier_id: Uuid) -> Result<bool> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|u| u.tier_id == Some(tier_id)))
    }
}

/// Append-only transaction log.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn already_recorded(id: Uuid) -> LedgerError {
    LedgerError::ValidationError(format!("Transaction {id} is already recorded"))
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn store(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&tx.id) {
            return Err(already_recorded(tx.id));
        }
        transactions.insert(tx.id, tx);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>> {
        Ok(self.transactions.read().await.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .filter(|tx| tx.involves(user_id))
            .cloned()
            .collect())
    }
}

/// Writes transfers across the account and transaction tables, holding both
/// write locks for the whole commit. Locks are taken accounts first.
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    accounts: InMemoryAccountStore,
    transactions: InMemoryTransactionStore,
}

impl InMemoryLedgerStore {
    pub fn new(accounts: InMemoryAccountStore, transactions: InMemoryTransactionStore) -> Self {
        Self {
            accounts,
            transactions,
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn commit_transfer(&self, accounts: Vec<Account>, tx: Transaction) -> Result<()> {
        let mut table = self.accounts.inner.write().await;
        let mut transactions = self.transactions.transactions.write().await;
        if transactions.contains_key(&tx.id) {
            return Err(already_recorded(tx.id));
        }
        for account in accounts {
            table.insert(account);
        }
        transactions.insert(tx.id, tx);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryLoanStore {
    loans: Arc<RwLock<HashMap<Uuid, Loan>>>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanStore for InMemoryLoanStore {
    async fn store(&self, loan: Loan) -> Result<()> {
        self.loans.write().await.insert(loan.id, loan);
        Ok(())
    }

    async fn store_all(&self, loans: Vec<Loan>) -> Result<()> {
        let mut table = self.loans.write().await;
        for loan in loans {
            table.insert(loan.id, loan);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Loan>> {
        Ok(self.loans.read().await.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Loan>> {
        let table = self.loans.read().await;
        Ok(ids.iter().filter_map(|id| table.get(id).cloned()).collect())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.start);
        Ok(loans)
    }

    async fn find_in_progress(&self) -> Result<Vec<Loan>> {
        Ok(self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.status == LoanStatus::InProgress)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDepositStore {
    deposits: Arc<RwLock<HashMap<Uuid, Deposit>>>,
}

impl InMemoryDepositStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DepositStore for InMemoryDepositStore {
    async fn store(&self, deposit: Deposit) -> Result<()> {
        self.deposits.write().await.insert(deposit.id, deposit);
        Ok(())
    }

    async fn store_all(&self, deposits: Vec<Deposit>) -> Result<()> {
        let mut table = self.deposits.write().await;
        for deposit in deposits {
            table.insert(deposit.id, deposit);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Deposit>> {
        Ok(self.deposits.read().await.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Deposit>> {
        let table = self.deposits.read().await;
        Ok(ids.iter().filter_map(|id| table.get(id).cloned()).collect())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Deposit>> {
        let mut deposits: Vec<Deposit> = self
            .deposits
            .read()
            .await
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        deposits.sort_by_key(|d| d.start);
        Ok(deposits)
    }

    async fn find_in_progress(&self) -> Result<Vec<Deposit>> {
        Ok(self
            .deposits
            .read()
            .await
            .values()
            .filter(|d| d.status == DepositStatus::InProgress)
            .cloned()
            .collect())
    }
}

/// Loan-type or deposit-type catalogue keyed by name.
#[derive(Default, Clone)]
pub struct InMemoryProductTypeStore {
    products: Arc<RwLock<HashMap<String, ProductType>>>,
}

impl InMemoryProductTypeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductTypeStore for InMemoryProductTypeStore {
    async fn store(&self, product: ProductType) -> Result<()> {
        self.products
            .write()
            .await
            .insert(product.name.clone(), product);
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ProductType>> {
        Ok(self.products.read().await.get(name).cloned())
    }

    async fn get_all(&self) -> Result<Vec<ProductType>> {
        let mut all: Vec<ProductType> = self.products.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCreditworthinessStore {
    tiers: Arc<RwLock<HashMap<Uuid, CreditworthinessTier>>>,
}

impl InMemoryCreditworthinessStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CreditworthinessStore for InMemoryCreditworthinessStore {
    async fn list_ordered(&self) -> Result<Vec<CreditworthinessTier>> {
        let mut tiers: Vec<CreditworthinessTier> =
            self.tiers.read().await.values().cloned().collect();
        tiers.sort_by_key(|t| t.order);
        Ok(tiers)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CreditworthinessTier>> {
        Ok(self.tiers.read().await.get(&id).cloned())
    }

    async fn store(&self, tier: CreditworthinessTier) -> Result<()> {
        self.tiers.write().await.insert(tier.id, tier);
        Ok(())
    }

    async fn store_all(&self, tiers: Vec<CreditworthinessTier>) -> Result<()> {
        let mut table = self.tiers.write().await;
        for tier in tiers {
            table.insert(tier.id, tier);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.tiers.write().await.remove(&id);
        Ok(())
    }
}

/// Wires every port to an in-memory or local adapter.
///
/// The stores are kept as concrete handles so tests can seed and inspect them
/// after the engines have been built.
#[derive(Clone)]
pub struct InMemoryPorts {
    pub accounts: InMemoryAccountStore,
    pub cards: InMemoryCardStore,
    pub users: InMemoryUserStore,
    pub transactions: InMemoryTransactionStore,
    pub loans: InMemoryLoanStore,
    pub loan_types: InMemoryProductTypeStore,
    pub deposits: InMemoryDepositStore,
    pub deposit_types: InMemoryProductTypeStore,
    pub tiers: InMemoryCreditworthinessStore,
    notifications: SharedNotificationSink,
    tokens: SharedTokenVerifier,
    clock: SharedClock,
    numbers: SharedAccountNumberGenerator,
}

impl Default for InMemoryPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPorts {
    pub fn new() -> Self {
        Self {
            accounts: InMemoryAccountStore::new(),
            cards: InMemoryCardStore::new(),
            users: InMemoryUserStore::new(),
            transactions: InMemoryTransactionStore::new(),
            loans: InMemoryLoanStore::new(),
            loan_types: InMemoryProductTypeStore::new(),
            deposits: InMemoryDepositStore::new(),
            deposit_types: InMemoryProductTypeStore::new(),
            tiers: InMemoryCreditworthinessStore::new(),
            notifications: Arc::new(ChannelNotificationSink::default()),
            tokens: Arc::new(JwtTokenVerifier::new(crate::config::Config::default().qr_secret)),
            clock: Arc::new(SystemClock),
            numbers: Arc::new(RandomAccountNumberGenerator),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_qr_secret(mut self, secret: impl Into<String>) -> Self {
        self.tokens = Arc::new(JwtTokenVerifier::new(secret));
        self
    }

    pub fn with_notifications(mut self, sink: SharedNotificationSink) -> Self {
        self.notifications = sink;
        self
    }

    pub fn with_number_generator(mut self, numbers: SharedAccountNumberGenerator) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn into_ports(self) -> Ports {
        let ledger = InMemoryLedgerStore::new(self.accounts.clone(), self.transactions.clone());
        Ports {
            accounts: Arc::new(self.accounts),
            cards: Arc::new(self.cards),
            users: Arc::new(self.users),
            transactions: Arc::new(self.transactions),
            ledger: Arc::new(ledger),
            loans: Arc::new(self.loans),
            loan_types: Arc::new(self.loan_types),
            deposits: Arc::new(self.deposits),
            deposit_types: Arc::new(self.deposit_types),
            tiers: Arc::new(self.tiers),
            notifications: self.notifications,
            tokens: self.tokens,
            clock: self.clock,
            numbers: self.numbers,
        }
    }
}
