use crate::domain::audit::AuditLogEntry;
use crate::domain::balance::Balance;
use crate::domain::ports::{AuditLog, BalanceStore, Database, StorageTx, TransactionStore};
use crate::domain::transaction::{
    NewTransaction, Transaction, TransactionId, TransactionStatus, UserId,
};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default, Clone)]
struct State {
    balances: HashMap<UserId, Balance>,
    transactions: HashMap<TransactionId, Transaction>,
}

/// In-memory storage backend implementing all three store ports.
///
/// A single `tokio` mutex is the isolation mechanism: `begin` holds the
/// lock for the lifetime of the scope, so concurrent workers serialize at
/// the storage layer the same way contended rows do in a relational store.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Storage scope over [`MemoryStore`].
///
/// Holds the state lock and a snapshot taken at `begin`; dropping the
/// scope without committing restores the snapshot, so every write made
/// through it is applied or rolled back as a unit.
pub struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    snapshot: State,
    committed: bool,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.committed {
            *self.guard = std::mem::take(&mut self.snapshot);
        }
    }
}

#[async_trait]
impl StorageTx for MemoryTx {
    async fn commit(mut self) -> Result<(), StoreError> {
        self.committed = true;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        // Drop restores the snapshot.
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(MemoryTx {
            guard,
            snapshot,
            committed: false,
        })
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    type Tx = MemoryTx;

    async fn create(&self, user_id: &UserId) -> Result<Balance, StoreError> {
        let mut state = self.state.lock().await;
        if state.balances.contains_key(user_id) {
            return Err(StoreError::BalanceExists(user_id.clone()));
        }
        let balance = Balance::zero(user_id.clone());
        state.balances.insert(user_id.clone(), balance.clone());
        Ok(balance)
    }

    async fn get(&self, user_id: &UserId) -> Result<Balance, StoreError> {
        let state = self.state.lock().await;
        state
            .balances
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::BalanceNotFound(user_id.clone()))
    }

    async fn get_for_update(
        &self,
        tx: &mut MemoryTx,
        user_id: &UserId,
    ) -> Result<Balance, StoreError> {
        tx.guard
            .balances
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::BalanceNotFound(user_id.clone()))
    }

    async fn apply_delta(
        &self,
        tx: &mut MemoryTx,
        user_id: &UserId,
        delta: Decimal,
    ) -> Result<(), StoreError> {
        let record = tx
            .guard
            .balances
            .get_mut(user_id)
            .ok_or_else(|| StoreError::BalanceNotFound(user_id.clone()))?;
        let updated = record.amount + delta;
        if updated < Decimal::ZERO {
            return Err(StoreError::Overdraft(user_id.clone()));
        }
        record.amount = updated;
        record.last_updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    type Tx = MemoryTx;

    async fn create(&self, new_tx: NewTransaction) -> Result<Transaction, StoreError> {
        let record = Transaction {
            id: TransactionId::new(Uuid::new_v4().to_string()),
            kind: new_tx.kind,
            status: TransactionStatus::Pending,
            source: new_tx.source,
            destination: new_tx.destination,
            amount: new_tx.amount,
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().await;
        state.transactions.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &TransactionId) -> Result<Transaction, StoreError> {
        let state = self.state.lock().await;
        state
            .transactions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::TransactionNotFound(id.clone()))
    }

    async fn update_status(
        &self,
        tx: Option<&mut MemoryTx>,
        id: &TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError> {
        match tx {
            Some(tx) => set_status(&mut tx.guard, id, status),
            // Standalone writes wait for any open scope to release the lock.
            None => set_status(&mut *self.state.lock().await, id, status),
        }
    }

    async fn find_by_status(
        &self,
        status: TransactionStatus,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.lock().await;
        let mut found: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|tx| tx.status == status)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.lock().await;
        let mut found: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|tx| {
                tx.source.as_ref() == Some(user_id) || tx.destination.as_ref() == Some(user_id)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }
}

fn set_status(
    state: &mut State,
    id: &TransactionId,
    status: TransactionStatus,
) -> Result<(), StoreError> {
    let record = state
        .transactions
        .get_mut(id)
        .ok_or_else(|| StoreError::TransactionNotFound(id.clone()))?;
    if record.status.is_terminal() {
        return Err(StoreError::StatusFinal {
            id: id.clone(),
            current: record.status,
            requested: status,
        });
    }
    record.status = status;
    Ok(())
}

/// Audit sink backed by a shared Vec, with read access for assertions.
#[derive(Default, Clone)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditLogEntry>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(
        &self,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        details: &str,
    ) -> Result<(), StoreError> {
        let entry = AuditLogEntry {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            details: details.to_string(),
            created_at: Utc::now(),
        };
        self.entries.lock().await.push(entry);
        Ok(())
    }
}
