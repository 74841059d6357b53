use crate::domain::money::Currency;
use crate::domain::transaction::Transaction;
use miette::Diagnostic;
use rust_decimal::Decimal;
use strum::Display;
use thiserror::Error;
use uuid::Uuid;

/// Entities that can be looked up and reported as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Entity {
    Account,
    Card,
    User,
    Loan,
    Deposit,
    #[strum(serialize = "Loan type")]
    LoanType,
    #[strum(serialize = "Deposit type")]
    DepositType,
    #[strum(serialize = "Creditworthiness tier")]
    Tier,
}

#[derive(Error, Diagnostic, Debug)]
pub enum LedgerError {
    #[error("{entity} not found: {key}")]
    #[diagnostic(code(ledger::not_found))]
    NotFound { entity: Entity, key: String },

    #[error("Currency mismatch: expected {expected}, got {actual}")]
    #[diagnostic(code(ledger::currency_mismatch))]
    CurrencyMismatch { expected: Currency, actual: Currency },

    #[error("Insufficient funds on account {account}: available {available}, requested {requested}")]
    #[diagnostic(code(ledger::insufficient_funds))]
    InsufficientFunds {
        account: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("{product} has no option for {duration} months at {percent}%")]
    #[diagnostic(code(ledger::option_not_found))]
    OptionNotFound {
        product: String,
        duration: u32,
        percent: Decimal,
    },

    #[error("Payment {offered} is below the minimal installment {minimal}")]
    #[diagnostic(code(ledger::minimal_payment))]
    MinimalPaymentTooLow { offered: Decimal, minimal: Decimal },

    #[error("Loan {0} is already paid")]
    #[diagnostic(code(ledger::already_paid))]
    AlreadyPaid(Uuid),

    #[error("Deposit {0} is already closed")]
    #[diagnostic(code(ledger::deposit_closed))]
    DepositClosed(Uuid),

    #[error("Creditworthiness tier {0} is still assigned to users")]
    #[diagnostic(code(ledger::in_use))]
    InUse(Uuid),

    #[error("{entity} named '{name}' already exists")]
    #[diagnostic(code(ledger::already_exists))]
    AlreadyExists { entity: Entity, name: String },

    #[error("QR token is invalid: {0}")]
    #[diagnostic(code(ledger::token_invalid))]
    TokenInvalid(String),

    #[error("QR token has expired")]
    #[diagnostic(code(ledger::token_expired))]
    TokenExpired,

    #[error("Validation error: {0}")]
    #[diagnostic(code(ledger::validation))]
    ValidationError(String),

    #[error("Arithmetic overflow: {0}")]
    #[diagnostic(code(ledger::overflow))]
    Overflow(String),

    /// Returned after the denied transaction and the sender notification
    /// have been persisted.
    #[error("Transfer denied: {reason}")]
    #[diagnostic(code(ledger::transfer_denied))]
    TransferDenied {
        transaction: Box<Transaction>,
        #[source]
        reason: Box<LedgerError>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

impl LedgerError {
    pub fn not_found(entity: Entity, key: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn already_exists(entity: Entity, name: impl Into<String>) -> Self {
        LedgerError::AlreadyExists {
            entity,
            name: name.into(),
        }
    }

    pub fn insufficient_funds(account: &str, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account: account.to_string(),
            available,
            requested,
        }
    }

    /// The underlying cause, looking through a denied transfer.
    pub fn root_cause(&self) -> &LedgerError {
        match self {
            LedgerError::TransferDenied { reason, .. } => reason.root_cause(),
            other => other,
        }
    }

    /// The persisted `done=false` record, if this error came out of the
    /// compensation path.
    pub fn denied_transaction(&self) -> Option<&Transaction> {
        match self {
            LedgerError::TransferDenied { transaction, .. } => Some(transaction),
            _ => None,
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self.root_cause(), LedgerError::InsufficientFunds { .. })
    }

    /// Failures of the backing stores rather than of the request itself.
    /// These are never turned into denied transactions.
    pub fn is_storage_failure(&self) -> bool {
        match self {
            LedgerError::Csv(_) | LedgerError::Io(_) | LedgerError::InternalError(_) => true,
            #[cfg(feature = "storage-rocksdb")]
            LedgerError::Storage(_) => true,
            _ => false,
        }
    }
}
