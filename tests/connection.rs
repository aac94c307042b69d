use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use sqlite3_access::{Connection, ConnectionOptions, OpenFlags, ResultValue, SqliteError};

fn unique_db_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be after epoch")
        .as_nanos();
    let pid = std::process::id();
    std::env::temp_dir().join(format!("sqlite3_access_{tag}_{pid}_{nanos}.sqlite3"))
}

#[test]
fn opens_in_memory() {
    let connection = Connection::new().expect("must open");
    assert_eq!(connection.path(), ":memory:");
    assert!(connection.is_autocommit());
}

#[test]
fn invalid_path_is_open_error() {
    let err = Connection::open("/nonexistent-dir/notauser/test.sqlite3").expect_err("must fail");
    match err {
        SqliteError::Open { path, message, .. } => {
            assert!(path.contains("notauser"));
            assert!(!message.is_empty());
        }
        other => panic!("expected open error, got {other:?}"),
    }
}

#[test]
fn creates_file_and_reopens_read_only() {
    let path = unique_db_path("file");
    assert!(!path.exists());
    {
        let connection = Connection::open(&path).expect("must create");
        connection
            .execute("CREATE TABLE t (a); INSERT INTO t VALUES (42);")
            .expect("must execute");
    }
    assert!(path.exists());

    {
        let connection =
            Connection::open_with_flags(&path, OpenFlags::READ_ONLY).expect("must reopen");
        let mut stmt = connection.prepare("SELECT a FROM t").expect("must prepare");
        stmt.execute().expect("must execute");
        assert_eq!(
            stmt.fetch_column(0).expect("must fetch"),
            Some(ResultValue::Integer(42))
        );
        let err = connection
            .execute("INSERT INTO t VALUES (1);")
            .expect_err("read-only must reject writes");
        assert!(matches!(err, SqliteError::Execution { .. }));
    }

    fs::remove_file(&path).expect("must remove temp db");
}

#[test]
fn missing_file_without_create_fails() {
    let path = unique_db_path("missing");
    let err = Connection::open_with_flags(&path, OpenFlags::READ_WRITE).expect_err("must fail");
    assert!(matches!(err, SqliteError::Open { .. }));
    assert!(!path.exists());
}

#[test]
fn options_apply_busy_timeout() {
    let options = ConnectionOptions::default().with_busy_timeout_ms(100);
    let connection =
        Connection::open_with_options(":memory:", options).expect("must open with options");
    connection.execute("SELECT 1;").expect("must execute");
}

#[test]
fn execute_reports_statement_and_diagnostic() {
    let connection = Connection::new().expect("must open");
    let err = connection
        .execute("CRATE YAVLE invalid (a, b);")
        .expect_err("must fail");
    match err {
        SqliteError::Execution { sql, message, .. } => {
            assert_eq!(sql, "CRATE YAVLE invalid (a, b);");
            assert!(message.contains("syntax error"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
    assert!(matches!(
        connection.execute("DROP TABLE invalid;"),
        Err(SqliteError::Execution { .. })
    ));
}

#[test]
fn row_count_and_last_insert_rowid() {
    let connection = Connection::new().expect("must open");
    connection
        .execute(
            "CREATE TABLE valid (a, b);\
             INSERT INTO valid VALUES (1,2), (2,3), (3,4);",
        )
        .expect("must execute");
    assert_eq!(connection.row_count(), 3);
    assert_eq!(connection.last_insert_rowid(), 3);

    connection
        .execute("INSERT INTO valid VALUES (5,6);")
        .expect("must insert");
    assert_eq!(connection.row_count(), 1);
    assert_eq!(connection.last_insert_rowid(), 4);

    connection
        .execute("DELETE FROM valid; DROP TABLE valid;")
        .expect("must execute");
    assert_eq!(connection.row_count(), 4);
}

#[test]
fn prepare_validates_text() {
    let connection = Connection::new().expect("must open");
    connection.execute("CREATE TABLE valid (a, b);").expect("must create");

    let err = connection
        .prepare("INSRT TO valid VALUES (?,?);")
        .expect_err("must fail");
    match err {
        SqliteError::Prepare { sql, message, .. } => {
            assert_eq!(sql, "INSRT TO valid VALUES (?,?);");
            assert!(!message.is_empty());
        }
        other => panic!("expected prepare error, got {other:?}"),
    }

    let stmt = connection
        .prepare("INSERT INTO valid VALUES (?,?);")
        .expect("must prepare");
    assert_eq!(stmt.parameter_count(), 2);
}

#[test]
fn end_to_end_insert_and_read_back() -> anyhow::Result<()> {
    let connection = Connection::new()?;
    connection.execute("CREATE TABLE t (a, b);")?;
    connection.execute("INSERT INTO t VALUES (1, 'one'), (2.5, x'0102'), (NULL, 3);")?;
    assert_eq!(connection.row_count(), 3);
    assert_eq!(connection.last_insert_rowid(), 3);

    let mut stmt = connection.prepare("SELECT * FROM t")?;
    stmt.execute()?;
    let rows = stmt.fetch_all_map()?;
    assert_eq!(rows.len(), 3);
    for row in &rows {
        let mut keys: Vec<_> = row.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["a", "b"]);
    }

    assert_eq!(rows[0]["a"], ResultValue::Integer(1));
    assert_eq!(rows[0]["b"], ResultValue::Text("one".to_owned()));
    assert_eq!(rows[1]["a"], ResultValue::Real(2.5));
    assert_eq!(rows[1]["b"], ResultValue::Blob(vec![1, 2]));
    assert_eq!(rows[2]["a"], ResultValue::Null);
    assert_eq!(rows[2]["b"], ResultValue::Integer(3));
    Ok(())
}

#[test]
fn statements_keep_connection_alive() {
    let stmt = {
        let connection = Connection::new().expect("must open");
        connection
            .execute("CREATE TABLE t (a); INSERT INTO t VALUES (7);")
            .expect("must execute");
        connection.prepare("SELECT a FROM t").expect("must prepare")
    };
    let mut stmt = stmt;
    stmt.execute().expect("must execute");
    assert_eq!(
        stmt.fetch_all_vector().expect("must fetch"),
        vec![vec![ResultValue::Integer(7)]]
    );
    assert_eq!(stmt.connection().path(), ":memory:");
}
