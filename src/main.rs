use clap::Parser;
use ledger_engine::application::processor::TransactionProcessor;
use ledger_engine::application::service::TransactionService;
use ledger_engine::config::EngineConfig;
use ledger_engine::domain::balance::Amount;
use ledger_engine::domain::ports::{AuditLogRef, BalanceStoreRef, TransactionStoreRef};
use ledger_engine::domain::transaction::{TransactionKind, TransactionStatus, UserId};
use ledger_engine::error::LedgerError;
use ledger_engine::infrastructure::in_memory::{MemoryAuditLog, MemoryStore, MemoryTx};
use ledger_engine::interfaces::csv::balance_writer::BalanceWriter;
use ledger_engine::interfaces::csv::operation_reader::{OperationReader, OperationRecord};
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file (kind,source,destination,amount)
    input: PathBuf,

    /// Number of worker tasks (defaults to NUM_WORKERS or 5)
    #[arg(long)]
    workers: Option<usize>,

    /// Job queue capacity (defaults to JOB_QUEUE_SIZE or 100)
    #[arg(long)]
    queue_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = EngineConfig::from_env();
    if let Some(workers) = cli.workers {
        config.workers = workers.max(1);
    }
    if let Some(capacity) = cli.queue_capacity {
        config.queue_capacity = capacity.max(1);
    }

    let store = Arc::new(MemoryStore::new());
    let balances: BalanceStoreRef<MemoryTx> = store.clone();
    let transactions: TransactionStoreRef<MemoryTx> = store.clone();
    let audit: AuditLogRef = Arc::new(MemoryAuditLog::new());

    let mut processor = TransactionProcessor::new(
        config.queue_capacity,
        store,
        balances.clone(),
        transactions.clone(),
        Arc::clone(&audit),
    );
    processor.start(config.workers);

    let service = TransactionService::new(
        balances.clone(),
        transactions.clone(),
        audit,
        processor.handle(),
    );

    // Submit every operation, registering users on first sight.
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    let mut users = BTreeSet::new();
    for op_result in reader.operations() {
        match op_result {
            Ok(op) => {
                if let Err(e) = submit(&service, &balances, &mut users, op).await {
                    eprintln!("Error submitting operation: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {e}");
            }
        }
    }

    // Wait for queued work to finish before stopping the pool.
    loop {
        let pending = transactions
            .find_by_status(TransactionStatus::Pending)
            .await
            .into_diagnostic()?;
        if pending.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    processor.stop().await;

    let mut final_balances = Vec::with_capacity(users.len());
    for user in &users {
        final_balances.push(balances.get(user).await.into_diagnostic()?);
    }
    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(final_balances).into_diagnostic()?;

    Ok(())
}

async fn submit(
    service: &TransactionService<MemoryTx>,
    balances: &BalanceStoreRef<MemoryTx>,
    users: &mut BTreeSet<UserId>,
    op: OperationRecord,
) -> Result<(), LedgerError> {
    let amount = Amount::new(op.amount)?;
    let source = op.source.map(UserId::new).transpose()?;
    let destination = op.destination.map(UserId::new).transpose()?;

    for user in source.iter().chain(destination.iter()) {
        if users.insert(user.clone()) {
            balances.create(user).await?;
        }
    }

    match op.kind {
        TransactionKind::Credit => {
            let destination = destination.ok_or_else(|| {
                LedgerError::Validation("credit requires a destination user".to_string())
            })?;
            service.credit(source, destination, amount).await?;
        }
        TransactionKind::Debit => {
            let source = source.ok_or_else(|| {
                LedgerError::Validation("debit requires a source user".to_string())
            })?;
            service.debit(source, amount).await?;
        }
        TransactionKind::Transfer => {
            let (source, destination) = source.zip(destination).ok_or_else(|| {
                LedgerError::Validation("transfer requires source and destination users".to_string())
            })?;
            service.transfer(source, destination, amount).await?;
        }
    }
    Ok(())
}
