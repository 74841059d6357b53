//! Ledger and lending engine for a digital bank.
//!
//! Fund transfers between accounts, loan and deposit lifecycles, daily
//! interest accrual and creditworthiness-based loan eligibility. Storage,
//! notification delivery, QR token checking and time are reached through the
//! ports in [`domain::ports`]; [`infrastructure`] provides in-memory and
//! RocksDB adapters for them.
//!
//! A typical wiring:
//!
//! ```no_run
//! use ledger_lending::application::transfer::LedgerTransferEngine;
//! use ledger_lending::config::ReserveAccounts;
//! use ledger_lending::infrastructure::in_memory::InMemoryPorts;
//!
//! let ports = InMemoryPorts::new().into_ports();
//! let transfers = LedgerTransferEngine::new(&ports, ReserveAccounts::new());
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
