//! Ledger-style money-movement engine: balances, transactions and an
//! asynchronous worker pool that applies balance mutations under
//! transactional guarantees.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
