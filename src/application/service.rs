use super::processor::JobSender;
use crate::domain::balance::Amount;
use crate::domain::job::Job;
use crate::domain::ports::{AuditLogRef, BalanceStoreRef, TransactionStoreRef};
use crate::domain::transaction::{
    NewTransaction, Transaction, TransactionId, TransactionKind, UserId,
};
use crate::error::{LedgerError, Result};
use tracing::{info, warn};

/// Synchronous intake for money movements.
///
/// Validates a request, persists the transaction in `Pending` status and
/// hands a [`Job`] to the processor. Returns to the caller before any
/// balance moves; the caller polls the transaction status to learn the
/// outcome.
pub struct TransactionService<Tx: Send> {
    balances: BalanceStoreRef<Tx>,
    transactions: TransactionStoreRef<Tx>,
    audit: AuditLogRef,
    jobs: JobSender,
}

/// Intake result: the pending transaction and an acceptance notice telling
/// the caller that processing is asynchronous.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub transaction: Transaction,
    pub message: &'static str,
}

impl<Tx: Send + 'static> TransactionService<Tx> {
    pub fn new(
        balances: BalanceStoreRef<Tx>,
        transactions: TransactionStoreRef<Tx>,
        audit: AuditLogRef,
        jobs: JobSender,
    ) -> Self {
        Self {
            balances,
            transactions,
            audit,
            jobs,
        }
    }

    /// Credit: money enters the system, so no pre-flight check is made.
    pub async fn credit(
        &self,
        source: Option<UserId>,
        destination: UserId,
        amount: Amount,
    ) -> Result<Accepted> {
        self.accept(
            NewTransaction {
                kind: TransactionKind::Credit,
                source,
                destination: Some(destination),
                amount,
            },
            "Credit transaction has been accepted for processing.",
        )
        .await
    }

    /// Debit: rejected synchronously when the source balance is already
    /// short; otherwise persisted and queued.
    pub async fn debit(&self, source: UserId, amount: Amount) -> Result<Accepted> {
        self.check_funds(&source, amount).await?;
        self.accept(
            NewTransaction {
                kind: TransactionKind::Debit,
                source: Some(source),
                destination: None,
                amount,
            },
            "Debit transaction has been accepted for processing.",
        )
        .await
    }

    /// Transfer: one job carries both legs; the same pre-flight check as
    /// debit runs against the source balance.
    pub async fn transfer(
        &self,
        source: UserId,
        destination: UserId,
        amount: Amount,
    ) -> Result<Accepted> {
        if source == destination {
            return Err(LedgerError::Validation(
                "transfer source and destination must differ".to_string(),
            ));
        }
        self.check_funds(&source, amount).await?;
        self.accept(
            NewTransaction {
                kind: TransactionKind::Transfer,
                source: Some(source),
                destination: Some(destination),
                amount,
            },
            "Transfer has been accepted for processing.",
        )
        .await
    }

    pub async fn get_transaction(&self, id: &TransactionId) -> Result<Transaction> {
        Ok(self.transactions.get(id).await?)
    }

    /// All transactions a user participates in, oldest first.
    pub async fn history(&self, user_id: &UserId) -> Result<Vec<Transaction>> {
        Ok(self.transactions.find_by_user(user_id).await?)
    }

    /// Pre-flight sufficiency check. Not linearized with the workers'
    /// atomic application; the conditional delta remains the source of
    /// truth at processing time.
    async fn check_funds(&self, source: &UserId, amount: Amount) -> Result<()> {
        let balance = self.balances.get(source).await?;
        if balance.amount < amount.value() {
            warn!(user_id = %source, "insufficient funds on intake pre-check");
            return Err(LedgerError::InsufficientFunds(source.clone()));
        }
        Ok(())
    }

    async fn accept(&self, new_tx: NewTransaction, message: &'static str) -> Result<Accepted> {
        let kind = new_tx.kind;
        let transaction = self.transactions.create(new_tx).await?;

        // A failed submission leaves the record pending; the queue is the
        // only path to a terminal status.
        self.jobs.submit(Job::from_transaction(&transaction)).await?;

        if let Err(e) = self
            .audit
            .record(
                "transaction",
                transaction.id.as_str(),
                &format!("{kind}_queued"),
                &format!("{kind} transaction queued, amount: {}", transaction.amount),
            )
            .await
        {
            warn!(transaction_id = %transaction.id, error = %e, "audit write failed");
        }
        info!(
            transaction_id = %transaction.id,
            kind = %kind,
            "transaction queued for processing"
        );

        Ok(Accepted {
            transaction,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::processor::TransactionProcessor;
    use crate::domain::transaction::TransactionStatus;
    use crate::infrastructure::in_memory::{MemoryAuditLog, MemoryStore, MemoryTx};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn service() -> (
        TransactionService<MemoryTx>,
        BalanceStoreRef<MemoryTx>,
        TransactionStoreRef<MemoryTx>,
        TransactionProcessor<MemoryStore>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let balances: BalanceStoreRef<MemoryTx> = store.clone();
        let transactions: TransactionStoreRef<MemoryTx> = store.clone();
        // Never started: jobs accumulate in the queue.
        let processor = TransactionProcessor::new(
            64,
            store,
            balances.clone(),
            transactions.clone(),
            Arc::new(MemoryAuditLog::new()),
        );
        let service = TransactionService::new(
            balances.clone(),
            transactions.clone(),
            Arc::new(MemoryAuditLog::new()),
            processor.handle(),
        );
        (service, balances, transactions, processor)
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_credit_accepted_as_pending() {
        let (service, balances, transactions, _processor) = service();
        balances.create(&user("alice")).await.unwrap();

        let accepted = service
            .credit(None, user("alice"), amount(dec!(10.0)))
            .await
            .unwrap();
        assert_eq!(accepted.transaction.status, TransactionStatus::Pending);
        assert!(accepted.message.contains("accepted"));

        let pending = transactions
            .find_by_status(TransactionStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        // Intake never touches the balance itself.
        let balance = balances.get(&user("alice")).await.unwrap();
        assert_eq!(balance.amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_debit_insufficient_funds_fails_fast() {
        let (service, balances, transactions, _processor) = service();
        balances.create(&user("alice")).await.unwrap();

        let refused = service.debit(user("alice"), amount(dec!(5.0))).await;
        assert!(matches!(refused, Err(LedgerError::InsufficientFunds(_))));

        // No record, no job.
        let pending = transactions
            .find_by_status(TransactionStatus::Pending)
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_debit_unknown_user_is_a_store_error() {
        let (service, _, _, _processor) = service();
        let refused = service.debit(user("ghost"), amount(dec!(5.0))).await;
        assert!(matches!(refused, Err(LedgerError::Store(_))));
    }

    #[tokio::test]
    async fn test_transfer_to_self_rejected() {
        let (service, balances, _, _processor) = service();
        balances.create(&user("alice")).await.unwrap();

        let refused = service
            .transfer(user("alice"), user("alice"), amount(dec!(1.0)))
            .await;
        assert!(matches!(refused, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_history_and_lookup() {
        let (service, balances, _, _processor) = service();
        balances.create(&user("alice")).await.unwrap();

        let accepted = service
            .credit(None, user("alice"), amount(dec!(10.0)))
            .await
            .unwrap();

        let history = service.history(&user("alice")).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TransactionKind::Credit);

        let fetched = service
            .get_transaction(&accepted.transaction.id)
            .await
            .unwrap();
        assert_eq!(fetched.id, accepted.transaction.id);

        let none = service.history(&user("carol")).await.unwrap();
        assert!(none.is_empty());
    }
}
