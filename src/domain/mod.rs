//! Entities, value objects and the ports through which the engines reach the
//! outside world.

pub mod account;
pub mod creditworthiness;
pub mod deposit;
pub mod endpoint;
pub mod loan;
pub mod money;
pub mod ports;
pub mod product;
pub mod transaction;
pub mod user;
