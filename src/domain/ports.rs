use super::balance::Balance;
use super::transaction::{NewTransaction, Transaction, TransactionId, TransactionStatus, UserId};
use crate::error::StoreError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// A transactional scope provided by the storage backend.
///
/// All writes made through the scope become visible together on `commit`;
/// dropping the scope without committing rolls every write back.
#[async_trait]
pub trait StorageTx: Send {
    async fn commit(self) -> Result<(), StoreError>;
    async fn rollback(self) -> Result<(), StoreError>;
}

/// Handle to the storage backend, used by the processor to open one
/// transactional scope per job. Never batched across jobs.
#[async_trait]
pub trait Database: Send + Sync {
    type Tx: StorageTx + Send;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

#[async_trait]
pub trait BalanceStore: Send + Sync {
    type Tx: Send;

    /// Creates the zero balance for a newly registered user.
    async fn create(&self, user_id: &UserId) -> Result<Balance, StoreError>;

    /// Current balance outside any transactional scope. Used by intake
    /// pre-checks; not linearized with concurrent workers.
    async fn get(&self, user_id: &UserId) -> Result<Balance, StoreError>;

    /// Current balance as seen inside the given scope.
    async fn get_for_update(
        &self,
        tx: &mut Self::Tx,
        user_id: &UserId,
    ) -> Result<Balance, StoreError>;

    /// Conditional atomic delta: adjusts the stored amount by `delta` as
    /// one indivisible step and fails with [`StoreError::Overdraft`]
    /// instead of driving the balance negative. The caller must not apply
    /// the same leg of the same job twice.
    async fn apply_delta(
        &self,
        tx: &mut Self::Tx,
        user_id: &UserId,
        delta: Decimal,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    type Tx: Send;

    /// Persists a new transaction in `Pending` status and assigns its id.
    async fn create(&self, new_tx: NewTransaction) -> Result<Transaction, StoreError>;

    async fn get(&self, id: &TransactionId) -> Result<Transaction, StoreError>;

    /// Updates a transaction's status, either inside a scope (`Some`) or as
    /// a standalone write (`None`) for the failure path that runs after a
    /// scope has died. Transitions out of a terminal status are rejected.
    async fn update_status(
        &self,
        tx: Option<&mut Self::Tx>,
        id: &TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError>;

    async fn find_by_status(
        &self,
        status: TransactionStatus,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, StoreError>;
}

/// Append-only audit trail. Best effort: callers log failures and move on.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(
        &self,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        details: &str,
    ) -> Result<(), StoreError>;
}

pub type BalanceStoreRef<Tx> = Arc<dyn BalanceStore<Tx = Tx>>;
pub type TransactionStoreRef<Tx> = Arc<dyn TransactionStore<Tx = Tx>>;
pub type AuditLogRef = Arc<dyn AuditLog>;
