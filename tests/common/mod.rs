#![allow(dead_code)]

use ledger_engine::application::processor::TransactionProcessor;
use ledger_engine::application::service::TransactionService;
use ledger_engine::domain::balance::Amount;
use ledger_engine::domain::ports::{
    BalanceStoreRef, Database, StorageTx, TransactionStoreRef,
};
use ledger_engine::domain::transaction::{TransactionId, TransactionStatus, UserId};
use ledger_engine::infrastructure::in_memory::{MemoryAuditLog, MemoryStore, MemoryTx};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// A fully wired engine over the in-memory backend.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub balances: BalanceStoreRef<MemoryTx>,
    pub transactions: TransactionStoreRef<MemoryTx>,
    pub audit: Arc<MemoryAuditLog>,
    pub processor: TransactionProcessor<MemoryStore>,
    pub service: TransactionService<MemoryTx>,
}

pub fn harness(queue_capacity: usize) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let balances: BalanceStoreRef<MemoryTx> = store.clone();
    let transactions: TransactionStoreRef<MemoryTx> = store.clone();
    let audit = Arc::new(MemoryAuditLog::new());

    let processor = TransactionProcessor::new(
        queue_capacity,
        store.clone(),
        balances.clone(),
        transactions.clone(),
        audit.clone(),
    );
    let service = TransactionService::new(
        balances.clone(),
        transactions.clone(),
        audit.clone(),
        processor.handle(),
    );

    Harness {
        store,
        balances,
        transactions,
        audit,
        processor,
        service,
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

/// Registers a user and seeds their balance through a committed scope.
pub async fn fund(h: &Harness, user: &UserId, initial: Decimal) {
    h.balances.create(user).await.unwrap();
    if initial > Decimal::ZERO {
        let mut tx = h.store.begin().await.unwrap();
        h.balances.apply_delta(&mut tx, user, initial).await.unwrap();
        tx.commit().await.unwrap();
    }
}

/// Polls until the transaction leaves `Pending`, with a hard deadline.
pub async fn wait_terminal(h: &Harness, id: &TransactionId) -> TransactionStatus {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = h.transactions.get(id).await.unwrap().status;
        if status.is_terminal() {
            return status;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "transaction {id} never reached a terminal status"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
