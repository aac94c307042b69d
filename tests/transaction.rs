use sqlite3_access::{Connection, ResultValue, SqliteError, Transaction};

fn count_rows(connection: &Connection) -> i64 {
    let mut stmt = connection
        .prepare("SELECT count(*) FROM valid")
        .expect("must prepare");
    stmt.execute().expect("must execute");
    stmt.fetch_column(0)
        .expect("must fetch")
        .and_then(|value| value.get_integer().ok())
        .expect("count must be an integer")
}

fn setup() -> Connection {
    let connection = Connection::new().expect("must open");
    connection
        .execute("CREATE TABLE valid (a, b);")
        .expect("must create");
    connection
}

#[test]
fn drop_without_commit_rolls_back() {
    let connection = setup();
    {
        let _transaction = connection.begin_transaction().expect("must begin");
        assert!(!connection.is_autocommit());
        connection
            .execute("INSERT INTO valid VALUES (1, 2);")
            .expect("must insert");
        assert_eq!(count_rows(&connection), 1);
    }
    assert!(connection.is_autocommit());
    assert_eq!(count_rows(&connection), 0);
}

#[test]
fn commit_makes_changes_visible() {
    let connection = setup();
    {
        let mut transaction = Transaction::new(connection.clone()).expect("must begin");
        connection
            .execute("INSERT INTO valid VALUES (1, 2);")
            .expect("must insert");
        transaction.commit().expect("must commit");
    }
    assert_eq!(count_rows(&connection), 1);

    let mut stmt = connection.prepare("SELECT b FROM valid").expect("must prepare");
    stmt.execute().expect("must execute");
    assert_eq!(
        stmt.fetch_column(0).expect("must fetch"),
        Some(ResultValue::Integer(2))
    );
}

#[test]
fn explicit_roll_back_discards_changes() {
    let connection = setup();
    let mut transaction = connection.begin_transaction().expect("must begin");
    connection
        .execute("INSERT INTO valid VALUES (1, 2), (3, 4);")
        .expect("must insert");
    transaction.roll_back().expect("must roll back");
    assert!(transaction.is_finished());
    assert!(connection.is_autocommit());
    assert_eq!(count_rows(&connection), 0);

    transaction.commit().expect("commit after roll back is a no-op");
    drop(transaction);
    assert_eq!(count_rows(&connection), 0);
}

#[test]
fn nested_begin_fails() {
    let connection = setup();
    let _outer = connection.begin_transaction().expect("must begin");
    let err = connection
        .begin_transaction()
        .expect_err("nested begin must fail");
    match err {
        SqliteError::Execution { message, .. } => {
            assert!(message.contains("within a transaction"), "{message}");
        }
        other => panic!("expected execution error, got {other:?}"),
    }
    assert!(!connection.is_autocommit());
}

#[test]
fn statements_inside_transaction() {
    let connection = setup();
    let mut transaction = connection.begin_transaction().expect("must begin");
    let mut insert = transaction
        .connection()
        .prepare("INSERT INTO valid VALUES (?, ?)")
        .expect("must prepare");
    for n in 0..10_i64 {
        insert
            .bind_vector([n, n * n])
            .expect("must bind")
            .execute()
            .expect("must insert");
    }
    transaction.commit().expect("must commit");
    assert_eq!(count_rows(&connection), 10);

    let mut sum = connection
        .prepare("SELECT sum(b) FROM valid")
        .expect("must prepare");
    sum.execute().expect("must execute");
    assert_eq!(
        sum.fetch_column(0).expect("must fetch"),
        Some(ResultValue::Integer(285))
    );
}
