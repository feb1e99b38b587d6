use crate::domain::transaction::{TransactionId, TransactionStatus, UserId};
use thiserror::Error;

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Errors surfaced to callers of the intake service and the demo binary.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("insufficient funds for user {0}")]
    InsufficientFunds(UserId),
    #[error("job queue is closed")]
    QueueClosed,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by the storage collaborators.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no balance record for user {0}")]
    BalanceNotFound(UserId),
    #[error("balance record for user {0} already exists")]
    BalanceExists(UserId),
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),
    #[error("delta would overdraw the balance of user {0}")]
    Overdraft(UserId),
    #[error("transaction {id} is already {current}, refusing transition to {requested}")]
    StatusFinal {
        id: TransactionId,
        current: TransactionStatus,
        requested: TransactionStatus,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
