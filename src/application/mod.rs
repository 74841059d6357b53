//! Application layer: the engines that enforce the ledger and lending rules.
//!
//! Every engine is built from a [`Ports`](crate::domain::ports::Ports) bundle
//! and never touches storage directly. Money only ever moves through
//! [`LedgerTransferEngine`](transfer::LedgerTransferEngine), so loan and
//! deposit flows inherit its locking and its denied-transaction handling.

pub mod accounts;
pub mod catalogue;
pub mod coordinator;
pub mod creditworthiness;
pub mod deposit;
pub mod loan;
pub mod locks;
pub mod notifier;
pub mod resolver;
pub mod transfer;

use std::fmt;

/// What one bulk pass over loans or deposits did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Entities read in the pass.
    pub examined: usize,
    /// Entities changed and committed.
    pub updated: usize,
    /// Entities left as they were (outside their window, or already done for the date).
    pub skipped: usize,
    /// Entities whose ledger movement was denied, or whose arithmetic
    /// overflowed.
    pub failed: usize,
}

impl BatchSummary {
    pub(crate) fn absorb(&mut self, other: BatchSummary) {
        self.examined += other.examined;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "examined={} updated={} skipped={} failed={}",
            self.examined, self.updated, self.skipped, self.failed
        )
    }
}
