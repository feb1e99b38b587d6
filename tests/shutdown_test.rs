mod common;

use common::{amount, fund, harness, user, wait_terminal};
use ledger_engine::domain::transaction::TransactionStatus;
use ledger_engine::error::LedgerError;
use rust_decimal_macros::dec;

/// Stopping the pool abandons queued jobs: their transactions stay
/// `Pending` and the queue refuses further submissions.
#[tokio::test]
async fn test_stop_abandons_queued_jobs() {
    let mut h = harness(8);
    fund(&h, &user("alice"), dec!(100.00)).await;

    for _ in 0..3 {
        h.service
            .credit(None, user("alice"), amount(dec!(1.00)))
            .await
            .unwrap();
    }
    h.processor.stop().await;

    let pending = h
        .transactions
        .find_by_status(TransactionStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending.len(), 3);
    assert_eq!(
        h.balances.get(&user("alice")).await.unwrap().amount,
        dec!(100.00)
    );

    let refused = h
        .service
        .credit(None, user("alice"), amount(dec!(1.00)))
        .await;
    assert!(matches!(refused, Err(LedgerError::QueueClosed)));
}

/// Workers finish their in-flight jobs before stopping; the store ends
/// consistent with the set of completed transactions.
#[tokio::test]
async fn test_stop_after_draining_is_consistent() {
    let mut h = harness(16);
    fund(&h, &user("alice"), dec!(10.00)).await;
    h.processor.start(2);

    let mut accepted = Vec::new();
    for _ in 0..5 {
        accepted.push(
            h.service
                .credit(None, user("alice"), amount(dec!(2.00)))
                .await
                .unwrap(),
        );
    }
    for a in &accepted {
        assert_eq!(
            wait_terminal(&h, &a.transaction.id).await,
            TransactionStatus::Completed
        );
    }
    h.processor.stop().await;

    assert_eq!(
        h.balances.get(&user("alice")).await.unwrap().amount,
        dec!(20.00)
    );
    let pending = h
        .transactions
        .find_by_status(TransactionStatus::Pending)
        .await
        .unwrap();
    assert!(pending.is_empty());
}
