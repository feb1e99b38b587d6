use crate::domain::job::{Job, MalformedJob};
use crate::domain::ports::{
    AuditLogRef, BalanceStoreRef, Database, StorageTx, TransactionStoreRef,
};
use crate::domain::transaction::{TransactionId, TransactionStatus};
use crate::error::{LedgerError, Result, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Cloneable submission handle to the processor's bounded job queue.
#[derive(Clone)]
pub struct JobSender {
    jobs: mpsc::Sender<Job>,
}

impl JobSender {
    /// Enqueues a job for asynchronous processing.
    ///
    /// This is the backpressure point: once the queue is at capacity the
    /// call blocks until a worker makes room. It fails only when the
    /// processor has been stopped.
    pub async fn submit(&self, job: Job) -> Result<()> {
        self.jobs.send(job).await.map_err(|_| LedgerError::QueueClosed)
    }
}

/// The asynchronous transaction-processing engine.
///
/// Owns the bounded job queue and a fixed-size pool of worker tasks. Each
/// worker dequeues jobs and applies them against the balance and
/// transaction stores, one storage transaction per job, advancing the
/// transaction to `Completed` or `Failed`. Workers share no state beyond
/// the queue and the stores; storage isolation is the only mutual
/// exclusion.
pub struct TransactionProcessor<D: Database> {
    inner: Arc<Inner<D>>,
    jobs: mpsc::Sender<Job>,
    queue: Arc<Mutex<mpsc::Receiver<Job>>>,
    quit: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

struct Inner<D: Database> {
    db: Arc<D>,
    balances: BalanceStoreRef<D::Tx>,
    transactions: TransactionStoreRef<D::Tx>,
    audit: AuditLogRef,
}

/// Why a job did not complete. The variant message becomes the audit
/// detail for the `transaction_failed` entry.
#[derive(Debug, Error)]
enum JobFailure {
    #[error("failed to begin storage transaction: {0}")]
    Begin(StoreError),
    #[error("failed to read source balance: {0}")]
    ReadBalance(StoreError),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("failed to apply balance delta: {0}")]
    ApplyDelta(StoreError),
    #[error("failed to finalize transaction status: {0}")]
    Finalize(StoreError),
    #[error("failed to commit storage transaction: {0}")]
    Commit(StoreError),
    #[error("malformed job: {0}")]
    Malformed(MalformedJob),
}

impl<D> TransactionProcessor<D>
where
    D: Database + 'static,
    D::Tx: 'static,
{
    pub fn new(
        queue_capacity: usize,
        db: Arc<D>,
        balances: BalanceStoreRef<D::Tx>,
        transactions: TransactionStoreRef<D::Tx>,
        audit: AuditLogRef,
    ) -> Self {
        let (jobs, queue) = mpsc::channel(queue_capacity);
        let (quit, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                db,
                balances,
                transactions,
                audit,
            }),
            jobs,
            queue: Arc::new(Mutex::new(queue)),
            quit,
            workers: Vec::new(),
        }
    }

    /// Submission handle for producers (the intake service).
    pub fn handle(&self) -> JobSender {
        JobSender {
            jobs: self.jobs.clone(),
        }
    }

    /// Number of live worker tasks.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Spawns the worker pool. A pool that is already running or has been
    /// stopped stays as it is.
    pub fn start(&mut self, workers: usize) {
        if !self.workers.is_empty() || *self.quit.borrow() {
            warn!("ignoring start: transaction processor already started or stopped");
            return;
        }
        info!(num_workers = workers, "starting transaction processor");
        for id in 1..=workers {
            let inner = Arc::clone(&self.inner);
            let queue = Arc::clone(&self.queue);
            let mut quit = self.quit.subscribe();
            self.workers.push(tokio::spawn(async move {
                info!(worker_id = id, "worker started");
                loop {
                    let job = tokio::select! {
                        biased;
                        _ = quit.changed() => break,
                        job = dequeue(&queue) => match job {
                            Some(job) => job,
                            None => break,
                        },
                    };
                    info!(
                        worker_id = id,
                        transaction_id = %job.transaction_id,
                        kind = %job.kind,
                        "worker picked up job"
                    );
                    inner.process_job(job).await;
                }
                info!(worker_id = id, "worker shutting down");
            }));
        }
    }

    /// Signals all workers to stop after their current job and waits for
    /// them to drain, then closes the queue. Jobs still sitting unconsumed
    /// in the queue are abandoned; their transactions stay `Pending`.
    pub async fn stop(&mut self) {
        info!("stopping transaction processor");
        let _ = self.quit.send(true);
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task panicked during shutdown");
            }
        }
        self.queue.lock().await.close();
        info!("transaction processor stopped");
    }
}

async fn dequeue(queue: &Mutex<mpsc::Receiver<Job>>) -> Option<Job> {
    queue.lock().await.recv().await
}

impl<D: Database> Inner<D> {
    async fn process_job(&self, job: Job) {
        match self.apply(&job).await {
            Ok(()) => {
                info!(transaction_id = %job.transaction_id, "worker completed job");
                self.record_audit(
                    &job.transaction_id,
                    &format!("{}_success", job.kind),
                    &format!("{} transaction completed successfully", job.kind),
                )
                .await;
            }
            Err(failure) => {
                warn!(
                    transaction_id = %job.transaction_id,
                    reason = %failure,
                    "job failed"
                );
                self.mark_failed(&job.transaction_id, &failure.to_string()).await;
            }
        }
    }

    /// The happy path, all inside one storage transaction. Any early
    /// return drops the scope, which rolls back every write as a unit.
    async fn apply(&self, job: &Job) -> std::result::Result<(), JobFailure> {
        let legs = job.deltas().map_err(JobFailure::Malformed)?;

        let mut tx = self.db.begin().await.map_err(JobFailure::Begin)?;

        // Second sufficiency check, independent of the intake pre-check and
        // read inside the storage scope this time.
        if let Some(source) = job.recheck_source() {
            let balance = self
                .balances
                .get_for_update(&mut tx, source)
                .await
                .map_err(JobFailure::ReadBalance)?;
            if balance.amount < job.amount.value() {
                return Err(JobFailure::InsufficientFunds);
            }
        }

        for (user, delta) in legs {
            self.balances
                .apply_delta(&mut tx, &user, delta)
                .await
                .map_err(|e| match e {
                    StoreError::Overdraft(_) => JobFailure::InsufficientFunds,
                    other => JobFailure::ApplyDelta(other),
                })?;
        }

        self.transactions
            .update_status(Some(&mut tx), &job.transaction_id, TransactionStatus::Completed)
            .await
            .map_err(JobFailure::Finalize)?;

        tx.commit().await.map_err(JobFailure::Commit)
    }

    /// Terminal failure path. Runs as a standalone status write because
    /// the storage scope that failed is no longer usable. Not retried: the
    /// job may have been partially contested, so the only safe follow-up
    /// is to record the failure and leave reconciliation to an operator.
    async fn mark_failed(&self, id: &TransactionId, reason: &str) {
        if let Err(e) = self
            .transactions
            .update_status(None, id, TransactionStatus::Failed)
            .await
        {
            error!(
                transaction_id = %id,
                error = %e,
                "CRITICAL: failed to mark transaction as failed; manual reconciliation required"
            );
        }
        self.record_audit(id, "transaction_failed", reason).await;
    }

    async fn record_audit(&self, id: &TransactionId, action: &str, details: &str) {
        if let Err(e) = self
            .audit
            .record("transaction", id.as_str(), action, details)
            .await
        {
            warn!(transaction_id = %id, error = %e, "audit write failed");
        }
    }
}
