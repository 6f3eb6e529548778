//! Pool bounds and transactional execution

mod common;

use std::time::Duration;

use common::{account, Account, TestDb};
use webapp_orm::{Model, OrmError, Value};

async fn count(db: &TestDb) -> Value {
    Account::find_number(&db.pool, "count(`id`)", None, &[])
        .await
        .unwrap()
        .unwrap()
}

// `or fail` keeps rows written before the conflicting one, so only the
// explicit rollback can undo them.
const PARTIAL_INSERT: &str = "insert or fail into `accounts` (`name`, `balance`, `id`) \
                              values (?, ?, ?), (?, ?, ?)";

fn partial_insert_args() -> Vec<Value> {
    vec![
        "b".into(),
        Value::Float(0.0),
        Value::Int(2),
        "dup".into(),
        Value::Float(0.0),
        Value::Int(1),
    ]
}

#[tokio::test]
async fn test_failed_statement_without_transaction_keeps_partial_rows() {
    let db = TestDb::new(2).await;
    account(1, "a", 0.0).save(&db.pool).await.unwrap();

    let result = db.pool.execute(PARTIAL_INSERT, &partial_insert_args(), true).await;

    assert!(matches!(result, Err(OrmError::Database { .. })));
    assert_eq!(count(&db).await, Value::Int(2));
}

#[tokio::test]
async fn test_failed_transaction_rolls_back_partial_rows() {
    let db = TestDb::new(2).await;
    account(1, "a", 0.0).save(&db.pool).await.unwrap();

    let result = db.pool.execute(PARTIAL_INSERT, &partial_insert_args(), false).await;

    assert!(matches!(result, Err(OrmError::Database { .. })));
    assert_eq!(count(&db).await, Value::Int(1));
    assert!(Account::find(&db.pool, 2i64).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancelled_transaction_is_rolled_back() {
    let db = TestDb::new(1).await;
    let bulk = "with recursive seq(n) as \
                (select 1 union all select n + 1 from seq where n < 3000000) \
                insert into `accounts` (`name`, `balance`, `id`) select 'x', 0.0, n from seq";

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        db.pool.execute(bulk, &[], false),
    )
    .await;

    assert!(result.is_err(), "bulk insert finished before the timeout");
    assert_eq!(count(&db).await, Value::Int(0));
}

#[tokio::test]
async fn test_committed_transaction_is_visible() {
    let db = TestDb::new(2).await;

    let affected = db
        .pool
        .execute(
            "insert into `accounts` (`name`, `balance`, `id`) values (?, ?, ?)",
            &["a".into(), Value::Float(1.0), Value::Int(1)],
            false,
        )
        .await
        .unwrap();

    assert_eq!(affected, 1);
    assert_eq!(count(&db).await, Value::Int(1));
}

#[tokio::test]
async fn test_concurrent_reads_respect_maxsize() {
    let db = TestDb::new(2).await;
    for id in 1..=4 {
        account(id, "x", 0.0).save(&db.pool).await.unwrap();
    }

    let tasks: Vec<_> = (1..=16)
        .map(|i| {
            let pool = db.pool.clone();
            tokio::spawn(async move { Account::find(&pool, (i % 4 + 1) as i64).await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_some());
    }
    assert!(db.pool.size() <= 2);
}

#[tokio::test]
async fn test_connections_return_after_errors() {
    let db = TestDb::new(1).await;

    for _ in 0..3 {
        let err = db.pool.select("select * from `missing`", &[], None).await;
        assert!(err.is_err());
    }

    // a leaked connection would block here until the acquire timeout
    assert_eq!(count(&db).await, Value::Int(0));
}

#[tokio::test]
async fn test_shutdown_rejects_new_work() {
    let db = TestDb::new(2).await;
    db.pool.shutdown().await;

    let err = Account::find(&db.pool, 1i64).await.unwrap_err();
    assert!(matches!(err, OrmError::PoolClosed));
}
