mod common;

use common::{Call, RecordingDriver};
use pgfluent::{
    Op, OrmError, OrmResult, QueryBuilder, QueryContext, QueryType, Record, StatementState, Value,
};
use std::sync::{Arc, Mutex};

fn users(driver: &RecordingDriver) -> QueryBuilder<&RecordingDriver> {
    QueryBuilder::with_table(driver, "users")
}

#[tokio::test]
async fn fetch_all_returns_rows_and_keeps_state() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_rows(vec![
        Record::new().with("id", 1i64).with("name", "alice"),
        Record::new().with("id", 2i64).with("name", "bob"),
    ]);
    let mut qb = users(&driver);
    qb.select("id, name").and_where("status", "active").limit(2);

    let rows = qb.fetch_all().await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get("name"), Some(&Value::from("bob")));

    assert_eq!(
        driver.last_executed(),
        Some((
            "SELECT id, name FROM users WHERE  status = ? LIMIT 2".to_string(),
            vec![Value::from("active")]
        ))
    );

    // A second fetch sees the same statement.
    qb.fetch_all().await?;
    let executed = driver.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[0], executed[1]);
    assert_eq!(qb.parameters(), &[Value::from("active")]);
    Ok(())
}

#[tokio::test]
async fn execute_and_reset_clears_state() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_rows(vec![Record::new().with("id", 7i64)]);
    let mut qb = users(&driver);
    qb.and_where("id", 7).order_by_asc("id");

    let execution = qb.execute_and_reset().await?;
    assert_eq!(execution.rows_affected, 1);
    assert_eq!(execution.rows[0].get("id"), Some(&Value::Int(7)));

    assert_eq!(qb.state(), &StatementState::default());
    assert_eq!(qb.to_sql()?, "SELECT * FROM users");
    Ok(())
}

#[tokio::test]
async fn insert_binds_values_and_resets() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_rows_affected(1);
    let mut qb = users(&driver);
    qb.and_where("ignored", 1);

    let affected = qb
        .insert([("username", "alice"), ("email", "alice@example.com")])
        .await?;
    assert_eq!(affected, 1);
    assert_eq!(
        driver.last_executed(),
        Some((
            "INSERT INTO users (username, email) VALUES (?, ?)".to_string(),
            vec![Value::from("alice"), Value::from("alice@example.com")]
        ))
    );
    assert_eq!(qb.state(), &StatementState::default());
    Ok(())
}

#[tokio::test]
async fn update_where_binds_set_then_where() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_rows_affected(3);
    let mut qb = users(&driver);
    qb.and_where_op("age", Op::Lt, 18);

    let affected = qb
        .update_where([("status", "minor")], [("country", "NZ")])
        .await?;
    assert_eq!(affected, 3);
    assert_eq!(
        driver.last_executed(),
        Some((
            "UPDATE users SET status = ? WHERE  age < ? AND country = ?".to_string(),
            vec![Value::from("minor"), Value::Int(18), Value::from("NZ")]
        ))
    );
    assert!(qb.fragments().is_empty());
    Ok(())
}

#[tokio::test]
async fn update_uses_accumulated_where() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_rows_affected(1);
    let mut qb = users(&driver);
    qb.and_where("id", 9);

    qb.update([("name", Value::from("x")), ("active", Value::Bool(false))])
        .await?;
    assert_eq!(
        driver.last_executed(),
        Some((
            "UPDATE users SET name = ?, active = ? WHERE  id = ?".to_string(),
            vec![Value::from("x"), Value::Bool(false), Value::Int(9)]
        ))
    );
    Ok(())
}

#[tokio::test]
async fn delete_resets_after_success() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_rows_affected(2);
    let mut qb = users(&driver);
    qb.or_group()
        .and_where_in("id", [1, 2])
        .end_group();

    assert_eq!(qb.delete().await?, 2);
    assert_eq!(
        driver.last_executed(),
        Some((
            "DELETE FROM users WHERE  (id IN (?, ?))".to_string(),
            vec![Value::Int(1), Value::Int(2)]
        ))
    );
    assert_eq!(qb.state(), &StatementState::default());
    Ok(())
}

#[tokio::test]
async fn failed_execute_keeps_state() {
    let driver = RecordingDriver::new();
    driver.fail_execute(true);
    let mut qb = users(&driver);
    qb.and_where("id", 1);

    let err = qb.delete().await.unwrap_err();
    assert!(matches!(err, OrmError::Other(_)));
    assert_eq!(qb.parameters(), &[Value::Int(1)]);
    assert_eq!(qb.fragments().len(), 1);

    // Retry once the driver recovers.
    driver.fail_execute(false);
    qb.delete().await.unwrap();
    assert!(qb.fragments().is_empty());
}

#[tokio::test]
async fn failed_update_where_retries_cleanly() {
    let driver = RecordingDriver::new().with_rows_affected(1);
    driver.fail_execute(true);
    let mut qb = users(&driver);
    qb.and_where("tenant", 7);
    let before = qb.state().clone();

    assert!(qb.update_where([("name", "x")], [("id", 5)]).await.is_err());
    assert_eq!(qb.state(), &before);

    driver.fail_execute(false);
    qb.update_where([("name", "x")], [("id", 5)]).await.unwrap();
    let executed = driver.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[0], executed[1]);
    assert_eq!(
        executed[1],
        (
            "UPDATE users SET name = ? WHERE  tenant = ? AND id = ?".to_string(),
            vec![Value::from("x"), Value::Int(7), Value::Int(5)]
        )
    );
}

#[tokio::test]
async fn failed_insert_restores_parameters() {
    let driver = RecordingDriver::new();
    driver.fail_execute(true);
    let mut qb = users(&driver);
    qb.and_where("id", 1);

    assert!(qb.insert([("name", "x")]).await.is_err());
    assert_eq!(qb.parameters(), &[Value::Int(1)]);
}

#[tokio::test]
async fn failed_prepare_keeps_state() {
    let driver = RecordingDriver::new();
    driver.fail_prepare(true);
    let mut qb = users(&driver);
    qb.and_where("id", 1);

    let err = qb.execute_and_reset().await.unwrap_err();
    assert!(matches!(err, OrmError::Connection(_)));
    assert_eq!(qb.fragments().len(), 1);
    assert!(driver.executed().is_empty());
}

#[tokio::test]
async fn misuse_never_reaches_driver() {
    let driver = RecordingDriver::new();
    let mut qb = users(&driver);
    qb.and_group().and_where("a", 1);

    assert!(qb.fetch_all().await.unwrap_err().is_builder_misuse());
    assert!(qb.delete().await.unwrap_err().is_builder_misuse());
    assert!(driver.calls().is_empty());
    // State is left for inspection.
    assert_eq!(qb.fragments().len(), 2);
}

#[tokio::test]
async fn count_reads_scalar_without_reset() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_rows(vec![Record::new().with("count", 42i64)]);
    let mut qb = users(&driver);
    qb.and_where("active", true).limit(5);

    assert_eq!(qb.count().await?, 42);
    assert_eq!(
        driver.last_executed(),
        Some((
            "SELECT COUNT(*) FROM users WHERE  active = ?".to_string(),
            vec![Value::Bool(true)]
        ))
    );
    assert_eq!(qb.state().limit(), Some(5));
    Ok(())
}

#[tokio::test]
async fn count_rejects_non_integer() {
    let driver = RecordingDriver::new().with_rows(vec![Record::new().with("count", "many")]);
    let qb = users(&driver);
    let err = qb.count().await.unwrap_err();
    assert!(matches!(err, OrmError::Decode { .. }));

    let empty = RecordingDriver::new();
    let err = users(&empty).count().await.unwrap_err();
    assert!(matches!(err, OrmError::Decode { .. }));
}

#[tokio::test]
async fn columns_introspects_target_table() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_columns(&["id", "username", "email"]);
    let qb = users(&driver);

    assert_eq!(qb.columns().await?, vec!["id", "username", "email"]);
    assert_eq!(driver.calls(), vec![Call::Columns("users".to_string())]);

    let no_table = QueryBuilder::new(&driver);
    assert!(no_table.columns().await.unwrap_err().is_builder_misuse());
    Ok(())
}

#[tokio::test]
async fn transaction_calls_pass_through() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_rows_affected(1);
    let mut qb = users(&driver);

    qb.begin_transaction().await?;
    qb.insert([("username", "carol")]).await?;
    qb.commit().await?;
    qb.begin_transaction().await?;
    qb.and_where("username", "carol").delete().await?;
    qb.rollback().await?;

    let calls = driver.calls();
    assert_eq!(calls.first(), Some(&Call::Begin));
    assert_eq!(calls[3], Call::Commit);
    assert_eq!(calls[4], Call::Begin);
    assert_eq!(calls.last(), Some(&Call::Rollback));
    Ok(())
}

#[tokio::test]
async fn hooks_see_rendered_sql() -> OrmResult<()> {
    let seen: Arc<Mutex<Vec<(QueryType, String, usize)>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let driver = RecordingDriver::new().with_rows_affected(1);
    let mut qb = users(&driver).with_hook(move |ctx: &QueryContext| {
        sink.lock()
            .unwrap()
            .push((ctx.query_type, ctx.sql.clone(), ctx.param_count));
    });

    qb.and_where("id", 1).fetch_all().await?;
    qb.reset();
    qb.insert([("name", "x"), ("age", "3")]).await?;

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen.as_slice(),
        &[
            (
                QueryType::Select,
                "SELECT * FROM users WHERE  id = ?".to_string(),
                1
            ),
            (
                QueryType::Insert,
                "INSERT INTO users (name, age) VALUES (?, ?)".to_string(),
                2
            ),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn owned_driver_works_too() -> OrmResult<()> {
    let driver = RecordingDriver::new().with_rows_affected(1);
    let probe = driver.clone();
    let mut qb = QueryBuilder::with_table(driver, "logs");

    qb.and_where_op("level", Op::Ne, "debug").delete().await?;
    assert_eq!(
        probe.last_executed().map(|(sql, _)| sql),
        Some("DELETE FROM logs WHERE  level != ?".to_string())
    );
    Ok(())
}
