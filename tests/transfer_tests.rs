mod common;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{AMD_RESERVE, Bank, QR_SECRET, amount, date};
use ledger_lending::domain::account::Account;
use ledger_lending::domain::endpoint::{EndpointDescriptor, EndpointKind, InstrumentKind};
use ledger_lending::domain::money::Currency;
use ledger_lending::domain::ports::LedgerStore;
use ledger_lending::domain::transaction::{Transaction, TransferRequest};
use ledger_lending::domain::user::{Card, NotificationKind};
use ledger_lending::error::LedgerError;
use ledger_lending::infrastructure::token::issue_qr_token;
use rust_decimal_macros::dec;
use std::sync::Arc;

const ALICE: &str = "1000000000000001";
const BOB: &str = "1000000000000002";

fn request(from: EndpointDescriptor, to: EndpointDescriptor, value: rust_decimal::Decimal) -> TransferRequest {
    TransferRequest {
        from,
        to,
        amount: amount(value),
        currency: Currency::Amd,
        description: "test".to_string(),
    }
}

#[tokio::test]
async fn test_account_to_account_transfer() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    let (alice, _) = bank.customer("+37491000001", ALICE, Currency::Amd, dec!(500)).await;
    let (bob, _) = bank.customer("+37491000002", BOB, Currency::Amd, dec!(200)).await;

    let tx = bank
        .transfers
        .transfer(TransferRequest::between_accounts(ALICE, BOB, amount(dec!(100)), Currency::Amd, "rent"))
        .await
        .unwrap();

    assert!(tx.done);
    assert_eq!(tx.from.value, ALICE);
    assert_eq!(tx.from.owner_id, Some(alice.id));
    assert_eq!(tx.to.owner_id, Some(bob.id));
    assert_eq!(bank.balance(ALICE).await, dec!(400));
    assert_eq!(bank.balance(BOB).await, dec!(300));

    let stored = bank.ports.transactions.get(tx.id).await.unwrap().unwrap();
    assert_eq!(stored, tx);
}

#[tokio::test]
async fn test_insufficient_funds_is_recorded_and_notified() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    let mut rx = bank.sink.subscribe();
    let (alice, _) = bank.customer("+37491000001", ALICE, Currency::Amd, dec!(50)).await;
    bank.customer("+37491000002", BOB, Currency::Amd, dec!(0)).await;

    let err = bank
        .transfers
        .transfer(TransferRequest::between_accounts(ALICE, BOB, amount(dec!(100)), Currency::Amd, "rent"))
        .await
        .unwrap_err();

    assert!(err.is_insufficient_funds());
    let denied = err.denied_transaction().unwrap();
    assert!(!denied.done);
    assert!(denied.failure_reason().unwrap().contains("Insufficient funds"));
    assert_eq!(bank.balance(ALICE).await, dec!(50));
    assert_eq!(bank.balance(BOB).await, dec!(0));

    // Denied attempts are part of the sender's history.
    let history = bank.transfers.history_of(alice.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].done);

    let stored = bank.user(&alice).await;
    assert_eq!(stored.notifications.len(), 1);
    assert_eq!(stored.notifications[0].kind, NotificationKind::TransferDenied);
    let delivered = rx.try_recv().unwrap();
    assert_eq!(delivered.user_id, alice.id);
}

#[tokio::test]
async fn test_currency_mismatch_is_denied() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    bank.customer("+37491000001", ALICE, Currency::Amd, dec!(500)).await;
    bank.customer("+37491000002", BOB, Currency::Usd, dec!(10)).await;

    let err = bank
        .transfers
        .transfer(TransferRequest::between_accounts(ALICE, BOB, amount(dec!(10)), Currency::Amd, "fx"))
        .await
        .unwrap_err();

    assert!(matches!(
        err.root_cause(),
        LedgerError::CurrencyMismatch { expected: Currency::Amd, actual: Currency::Usd }
    ));
    assert_eq!(bank.balance(ALICE).await, dec!(500));
    assert_eq!(bank.balance(BOB).await, dec!(10));
}

#[tokio::test]
async fn test_request_currency_must_match_source() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    bank.customer("+37491000001", ALICE, Currency::Amd, dec!(500)).await;
    bank.customer("+37491000002", BOB, Currency::Amd, dec!(10)).await;

    let err = bank
        .transfers
        .transfer(TransferRequest::between_accounts(ALICE, BOB, amount(dec!(10)), Currency::Usd, "fx"))
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), LedgerError::CurrencyMismatch { .. }));
    assert_eq!(bank.balance(ALICE).await, dec!(500));
}

#[tokio::test]
async fn test_unknown_receiver_keeps_raw_descriptor() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    let (alice, _) = bank.customer("+37491000001", ALICE, Currency::Amd, dec!(500)).await;

    let err = bank
        .transfers
        .transfer(request(
            EndpointDescriptor::Account(ALICE.into()),
            EndpointDescriptor::Phone("+37499999999".into()),
            dec!(10),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), LedgerError::NotFound { .. }));
    let denied = err.denied_transaction().unwrap();
    assert_eq!(denied.from.owner_id, Some(alice.id));
    assert_eq!(denied.to.kind, EndpointKind::Phone);
    assert_eq!(denied.to.value, "+37499999999");
    assert_eq!(denied.to.owner_id, None);
    assert_eq!(bank.balance(ALICE).await, dec!(500));
}

#[tokio::test]
async fn test_phone_and_card_endpoints() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    let (alice, alice_account) = bank.customer("+37491000001", ALICE, Currency::Amd, dec!(500)).await;
    let (bob, _) = bank.customer("+37491000002", BOB, Currency::Amd, dec!(0)).await;
    bank.ports
        .cards
        .store(Card {
            number: "4000000000000001".into(),
            account_id: alice_account.id,
            owner_id: alice.id,
        })
        .await
        .unwrap();

    let tx = bank
        .transfers
        .transfer(request(
            EndpointDescriptor::Card("4000000000000001".into()),
            EndpointDescriptor::Phone("+37491000002".into()),
            dec!(120),
        ))
        .await
        .unwrap();

    assert_eq!(tx.from.kind, EndpointKind::Card);
    assert_eq!(tx.from.value, "4000000000000001");
    assert_eq!(tx.to.kind, EndpointKind::Account);
    assert_eq!(tx.to.value, BOB);
    assert_eq!(tx.to.owner_id, Some(bob.id));
    assert_eq!(bank.balance(ALICE).await, dec!(380));
    assert_eq!(bank.balance(BOB).await, dec!(120));
}

#[tokio::test]
async fn test_qr_endpoints() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    bank.customer("+37491000001", ALICE, Currency::Amd, dec!(500)).await;
    bank.customer("+37491000002", BOB, Currency::Amd, dec!(0)).await;
    // Token expiry is checked against wall-clock time.
    let now = Utc::now();

    let valid = issue_qr_token(QR_SECRET, BOB, InstrumentKind::Account, now + Duration::hours(1)).unwrap();
    let tx = bank
        .transfers
        .transfer(request(
            EndpointDescriptor::Account(ALICE.into()),
            EndpointDescriptor::QrAccount(valid),
            dec!(25),
        ))
        .await
        .unwrap();
    assert_eq!(tx.to.value, BOB);
    assert_eq!(bank.balance(BOB).await, dec!(25));

    let expired = issue_qr_token(
        QR_SECRET,
        BOB,
        InstrumentKind::Account,
        now - Duration::hours(1),
    )
    .unwrap();
    let err = bank
        .transfers
        .transfer(request(
            EndpointDescriptor::Account(ALICE.into()),
            EndpointDescriptor::QrAccount(expired),
            dec!(25),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), LedgerError::TokenExpired));

    let forged = issue_qr_token("someone-else", BOB, InstrumentKind::Account, now + Duration::hours(1)).unwrap();
    let err = bank
        .transfers
        .transfer(request(
            EndpointDescriptor::Account(ALICE.into()),
            EndpointDescriptor::QrAccount(forged),
            dec!(25),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err.root_cause(), LedgerError::TokenInvalid(_)));
    assert_eq!(bank.balance(ALICE).await, dec!(475));
}

#[tokio::test]
async fn test_soft_deleted_account_cannot_receive() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    bank.customer("+37491000001", ALICE, Currency::Amd, dec!(500)).await;
    let (_, mut closed) = bank.customer("+37491000002", BOB, Currency::Amd, dec!(0)).await;
    closed.deleted = true;
    bank.ports.accounts.store(closed).await.unwrap();

    let err = bank
        .transfers
        .transfer(TransferRequest::between_accounts(ALICE, BOB, amount(dec!(10)), Currency::Amd, "x"))
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), LedgerError::NotFound { .. }));
    assert_eq!(bank.balance(ALICE).await, dec!(500));
}

#[tokio::test]
async fn test_reserve_lookup() {
    let bank = Bank::open(date(2024, 3, 1), dec!(1000)).await;
    assert_eq!(bank.transfers.reserve_number(Currency::Amd).await.unwrap(), AMD_RESERVE);
    assert!(matches!(
        bank.transfers.reserve_number(Currency::Eur).await,
        Err(LedgerError::NotFound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_conserve_money() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    let numbers: Vec<String> = (1..=4).map(|i| format!("10000000000000{i:02}")).collect();
    for (i, number) in numbers.iter().enumerate() {
        bank.customer(&format!("+3749100000{i}"), number, Currency::Amd, dec!(1000))
            .await;
    }
    let before = bank.total_balance().await;

    let engine = bank.transfers.clone();
    let mut handles = Vec::new();
    for i in 0..200 {
        let engine = Arc::clone(&engine);
        let from = numbers[i % 4].clone();
        let to = numbers[(i + 1) % 4].clone();
        handles.push(tokio::spawn(async move {
            engine
                .transfer(TransferRequest::between_accounts(from, to, amount(dec!(7)), Currency::Amd, "load"))
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().done);
    }

    assert_eq!(bank.total_balance().await, before);
    // Every account sent and received the same number of transfers.
    for number in &numbers {
        assert_eq!(bank.balance(number).await, dec!(1000));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overdraw_never_goes_negative() {
    let bank = Bank::open(date(2024, 3, 1), dec!(0)).await;
    bank.customer("+37491000001", ALICE, Currency::Amd, dec!(100)).await;
    bank.customer("+37491000002", BOB, Currency::Amd, dec!(0)).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine = bank.transfers.clone();
        handles.push(tokio::spawn(async move {
            engine
                .transfer(TransferRequest::between_accounts(ALICE, BOB, amount(dec!(30)), Currency::Amd, "race"))
                .await
        }));
    }
    let mut completed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => completed += 1,
            Err(e) => assert!(e.is_insufficient_funds()),
        }
    }

    assert_eq!(completed, 3);
    assert_eq!(bank.balance(ALICE).await, dec!(10));
    assert_eq!(bank.balance(BOB).await, dec!(90));
}

/// Rejects every commit as if the disk had gone away.
struct BrokenLedger;

#[async_trait]
impl LedgerStore for BrokenLedger {
    async fn commit_transfer(
        &self,
        _accounts: Vec<Account>,
        _tx: Transaction,
    ) -> ledger_lending::error::Result<()> {
        Err(LedgerError::Io(std::io::Error::other("disk full")))
    }
}

#[tokio::test]
async fn test_failed_commit_moves_no_money() {
    let bank = Bank::with_ports(date(2024, 3, 1), dec!(0), 2, |ports| {
        ports.ledger = Arc::new(BrokenLedger);
    })
    .await;
    let (alice, _) = bank.customer("+37491000001", ALICE, Currency::Amd, dec!(500)).await;
    bank.customer("+37491000002", BOB, Currency::Amd, dec!(200)).await;

    let err = bank
        .transfers
        .transfer(TransferRequest::between_accounts(ALICE, BOB, amount(dec!(100)), Currency::Amd, "rent"))
        .await
        .unwrap_err();

    // Storage failures are not turned into denials.
    assert!(matches!(err, LedgerError::Io(_)));
    assert_eq!(bank.balance(ALICE).await, dec!(500));
    assert_eq!(bank.balance(BOB).await, dec!(200));
    assert!(bank.transfers.history_of(alice.id).await.unwrap().is_empty());
    assert!(bank.user(&alice).await.notifications.is_empty());
}
