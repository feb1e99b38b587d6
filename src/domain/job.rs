use super::balance::Amount;
use super::transaction::{Transaction, TransactionId, TransactionKind, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Transient unit of work handed to the processor.
///
/// A job is never persisted; its durable counterpart is the `Pending`
/// transaction record created at intake before the job is queued.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub source: Option<UserId>,
    pub destination: Option<UserId>,
    pub amount: Amount,
}

/// A job whose parties do not match its kind. This is a data error, not a
/// business outcome; the processor marks the transaction failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedJob {
    #[error("job has no source user for its kind")]
    MissingSource,
    #[error("job has no destination user for its kind")]
    MissingDestination,
}

impl Job {
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id.clone(),
            kind: tx.kind,
            source: tx.source.clone(),
            destination: tx.destination.clone(),
            amount: tx.amount,
        }
    }

    /// The account whose sufficiency the worker re-checks before applying
    /// deltas. Transfers always re-check; credits only when they name a
    /// funding source. Debits rely on the conditional delta alone.
    pub fn recheck_source(&self) -> Option<&UserId> {
        match self.kind {
            TransactionKind::Credit | TransactionKind::Transfer => self.source.as_ref(),
            TransactionKind::Debit => None,
        }
    }

    /// The signed balance legs this job applies, in application order
    /// (source decrement before destination increment for transfers).
    pub fn deltas(&self) -> Result<Vec<(UserId, Decimal)>, MalformedJob> {
        let amount = self.amount.value();
        match self.kind {
            TransactionKind::Credit => {
                let destination = self
                    .destination
                    .clone()
                    .ok_or(MalformedJob::MissingDestination)?;
                Ok(vec![(destination, amount)])
            }
            TransactionKind::Debit => {
                let source = self.source.clone().ok_or(MalformedJob::MissingSource)?;
                Ok(vec![(source, -amount)])
            }
            TransactionKind::Transfer => {
                let source = self.source.clone().ok_or(MalformedJob::MissingSource)?;
                let destination = self
                    .destination
                    .clone()
                    .ok_or(MalformedJob::MissingDestination)?;
                Ok(vec![(source, -amount), (destination, amount)])
            }
        }
    }
}
