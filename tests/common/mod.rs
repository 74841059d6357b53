#![allow(dead_code)]

use chrono::NaiveDate;
use ledger_lending::application::coordinator::ScheduledAccrualCoordinator;
use ledger_lending::application::creditworthiness::CreditworthinessOrderRegistry;
use ledger_lending::application::deposit::DepositEngine;
use ledger_lending::application::loan::LoanEngine;
use ledger_lending::application::transfer::LedgerTransferEngine;
use ledger_lending::config::ReserveAccounts;
use ledger_lending::domain::account::{Account, AccountType};
use ledger_lending::domain::money::{Amount, Currency};
use ledger_lending::domain::ports::Ports;
use ledger_lending::domain::product::{ProductType, TermOption};
use ledger_lending::domain::user::User;
use ledger_lending::infrastructure::clock::FixedClock;
use ledger_lending::infrastructure::in_memory::InMemoryPorts;
use ledger_lending::infrastructure::notifications::ChannelNotificationSink;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const QR_SECRET: &str = "integration-test-secret";
pub const AMD_RESERVE: &str = "9000000000000001";
pub const USD_RESERVE: &str = "9000000000000002";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

/// Every engine wired over in-memory stores, a controllable clock and funded
/// AMD and USD reserves.
pub struct Bank {
    pub ports: Ports,
    pub clock: Arc<FixedClock>,
    pub sink: ChannelNotificationSink,
    pub transfers: Arc<LedgerTransferEngine>,
    pub tiers: Arc<CreditworthinessOrderRegistry>,
    pub loans: Arc<LoanEngine>,
    pub deposits: Arc<DepositEngine>,
    pub coordinator: ScheduledAccrualCoordinator,
}

impl Bank {
    pub async fn open(today: NaiveDate, reserve_balance: Decimal) -> Self {
        Self::with_batch_size(today, reserve_balance, 2).await
    }

    pub async fn with_batch_size(today: NaiveDate, reserve_balance: Decimal, batch: usize) -> Self {
        Self::with_ports(today, reserve_balance, batch, |_| {}).await
    }

    /// Lets a test swap individual ports, e.g. for a failing store, before
    /// the engines are wired.
    pub async fn with_ports(
        today: NaiveDate,
        reserve_balance: Decimal,
        batch: usize,
        customize: impl FnOnce(&mut Ports),
    ) -> Self {
        let clock = Arc::new(FixedClock::at_date(today));
        let sink = ChannelNotificationSink::default();
        let mut ports = InMemoryPorts::new()
            .with_clock(clock.clone())
            .with_qr_secret(QR_SECRET)
            .with_notifications(Arc::new(sink.clone()))
            .into_ports();
        customize(&mut ports);

        let amd = Account::reserve(AMD_RESERVE, Currency::Amd, reserve_balance);
        let usd = Account::reserve(USD_RESERVE, Currency::Usd, reserve_balance);
        let reserves = ReserveAccounts::new()
            .with(Currency::Amd, amd.id)
            .with(Currency::Usd, usd.id);
        ports.accounts.store_all(vec![amd, usd]).await.unwrap();

        let transfers = Arc::new(LedgerTransferEngine::new(&ports, reserves));
        let tiers = Arc::new(CreditworthinessOrderRegistry::new(&ports));
        let loans = Arc::new(LoanEngine::new(&ports, transfers.clone(), tiers.clone(), batch));
        let deposits = Arc::new(DepositEngine::new(&ports, transfers.clone(), batch));
        let coordinator = ScheduledAccrualCoordinator::new(loans.clone(), deposits.clone());

        loans
            .register_loan_type(ProductType::new(
                "Consumer",
                vec![TermOption::new(12, dec!(12)), TermOption::new(1, dec!(30))],
            ))
            .await
            .unwrap();
        deposits
            .register_deposit_type(ProductType::new(
                "Savings",
                vec![TermOption::new(3, dec!(1)), TermOption::new(1, dec!(0.5))],
            ))
            .await
            .unwrap();

        Self {
            ports,
            clock,
            sink,
            transfers,
            tiers,
            loans,
            deposits,
            coordinator,
        }
    }

    /// A user with one default current account.
    pub async fn customer(
        &self,
        phone: &str,
        number: &str,
        currency: Currency,
        balance: Decimal,
    ) -> (User, Account) {
        let user = User::new(phone);
        self.ports.users.store(user.clone()).await.unwrap();
        let mut account =
            Account::new(user.id, number, currency, AccountType::Current).with_balance(balance);
        account.is_default = true;
        self.ports.accounts.store(account.clone()).await.unwrap();
        (user, account)
    }

    pub async fn balance(&self, number: &str) -> Decimal {
        self.ports
            .accounts
            .find_by_number(number)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    pub async fn user(&self, user: &User) -> User {
        self.ports.users.get(user.id).await.unwrap().unwrap()
    }

    pub async fn total_balance(&self) -> Decimal {
        self.ports
            .accounts
            .get_all()
            .await
            .unwrap()
            .iter()
            .map(|a| a.balance)
            .sum()
    }
}
