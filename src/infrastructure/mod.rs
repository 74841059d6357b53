//! Adapters behind the domain ports.

pub mod clock;
pub mod in_memory;
pub mod notifications;
pub mod number_generator;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod token;
