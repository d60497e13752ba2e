//! Connection lifecycle, statement tracking, pragmas, and transactions.

mod common;

use litebind::{
    Connection, ConnectionError, LitebindError, Params, Row, StatementOptions, Value,
};

fn count_where(db: &Connection, predicate: &str) -> i64 {
    let stmt = db
        .prepare_with(
            &format!("SELECT COUNT(*) FROM t WHERE {predicate}"),
            StatementOptions::new().pluck(true).bigint(true),
        )
        .unwrap();
    match stmt.get(&Params::Empty).unwrap() {
        Some(Row::Value(Value::BigInt(n))) => n as i64,
        other => panic!("unexpected count row: {other:?}"),
    }
}

#[test]
fn test_exec_runs_multiple_statements() {
    let db = Connection::open_in_memory().unwrap();
    db.exec("CREATE TABLE a (x); CREATE TABLE b (y); INSERT INTO a VALUES (1)")
        .unwrap();
    let stmt = db
        .prepare_with("SELECT x FROM a", StatementOptions::new().pluck(true))
        .unwrap();
    assert_eq!(
        stmt.get(&Params::Empty).unwrap(),
        Some(Row::Value(Value::Integer(1)))
    );
}

#[test]
fn test_exec_reports_engine_error() {
    let db = Connection::open_in_memory().unwrap();
    let err = db.exec("NOT SQL").unwrap_err();
    match err {
        ConnectionError::Engine(e) => {
            assert!(e.message.contains("syntax error"), "message: {}", e.message);
            assert!(e.to_string().starts_with("sqlite error("));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_prepare_syntax_error_carries_offset() {
    let db = common::seeded_connection();
    let err = db.prepare("SELECT a FROM t WHERE !!").unwrap_err();
    match err {
        ConnectionError::Engine(e) => {
            assert!(e.offset.is_some());
            assert!(e.to_string().contains("offset: "));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_prepare_rejects_multiple_statements() {
    let db = common::seeded_connection();
    assert!(matches!(
        db.prepare("SELECT 1; SELECT 2").unwrap_err(),
        ConnectionError::MultiStatement
    ));
    assert!(matches!(
        db.prepare("SELECT 1; bogus").unwrap_err(),
        ConnectionError::MultiStatement
    ));
}

#[test]
fn test_prepare_allows_trailing_trivia() {
    let db = common::seeded_connection();
    for sql in [
        "SELECT 1",
        "SELECT 1;",
        "SELECT 1 ; \t\n",
        "SELECT 1; -- trailing comment",
        "SELECT 1; /* block */ ;; -- done",
    ] {
        let stmt = db.prepare(sql).unwrap();
        assert!(!stmt.is_closed(), "sql: {sql:?}");
    }
}

#[test]
fn test_close_rejects_reuse() {
    let db = common::seeded_connection();
    db.close().unwrap();
    assert!(db.is_closed());
    assert!(matches!(
        db.exec("SELECT 1").unwrap_err(),
        ConnectionError::Closed
    ));
    assert!(matches!(
        db.prepare("SELECT 1").unwrap_err(),
        ConnectionError::Closed
    ));
    assert!(matches!(db.close().unwrap_err(), ConnectionError::Closed));
}

#[test]
fn test_close_finalizes_statements() {
    let db = common::seeded_connection();
    let stmt = db.prepare("SELECT a FROM t").unwrap();
    assert!(!stmt.is_closed());
    db.close().unwrap();
    assert!(stmt.is_closed());
}

#[test]
fn test_drop_with_live_statements_defers_close() {
    let db = common::seeded_connection();
    let stmt = db.prepare("SELECT b FROM t ORDER BY a").unwrap();
    drop(db);
    // The statement keeps the connection alive until it goes away.
    assert_eq!(
        stmt.get(&Params::Empty).unwrap(),
        Some(Row::Record(vec![(
            "b".to_string(),
            Value::Text("123".to_string())
        )]))
    );
}

#[test]
fn test_pragma_returns_rows() {
    let db = common::seeded_connection();
    let rows = db.pragma("table_info(t)").unwrap();
    assert_eq!(rows.len(), 3);
    let names: Vec<&(String, Value)> = rows[0]
        .iter()
        .filter(|(name, _)| name == "name")
        .collect();
    assert_eq!(names[0].1, Value::Text("a".to_string()));
}

#[test]
fn test_pragma_simple_returns_first_value() {
    let db = common::seeded_connection();
    assert_eq!(
        db.pragma_simple("user_version").unwrap(),
        Some(Value::Integer(0))
    );
    assert_eq!(
        db.pragma_simple("journal_mode").unwrap(),
        Some(Value::Text("memory".to_string()))
    );
}

#[test]
fn test_transaction_commits() {
    let db = common::seeded_connection();
    let inserted = db
        .transaction(|| {
            db.exec("INSERT INTO t (a) VALUES (100)")?;
            db.exec("INSERT INTO t (a) VALUES (101)")?;
            Ok(2)
        })
        .unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(count_where(&db, "a >= 100"), 2);
}

#[test]
fn test_transaction_rolls_back_on_error() {
    let db = common::seeded_connection();
    let result: Result<(), LitebindError> = db.transaction(|| {
        db.exec("INSERT INTO t (a) VALUES (100)")?;
        db.exec("INSERT INTO no_such_table (a) VALUES (1)")?;
        Ok(())
    });
    assert!(result.is_err());
    assert_eq!(count_where(&db, "a = 100"), 0);
}

#[test]
fn test_nested_transaction_uses_savepoints() {
    let db = common::seeded_connection();
    db.transaction(|| {
        db.exec("INSERT INTO t (a) VALUES (100)")?;
        let inner: Result<(), LitebindError> = db.transaction(|| {
            db.exec("INSERT INTO t (a) VALUES (101)")?;
            db.exec("INSERT INTO no_such_table (a) VALUES (1)")?;
            Ok(())
        });
        assert!(inner.is_err());
        Ok(())
    })
    .unwrap();
    // The inner rollback unwound only its savepoint.
    assert_eq!(count_where(&db, "a = 100"), 1);
    assert_eq!(count_where(&db, "a = 101"), 0);
}

#[test]
fn test_statement_cache_reuses_statements() {
    let db = common::seeded_cached_connection();
    let first = db.prepare("SELECT a FROM t").unwrap();
    let second = db.prepare("SELECT a FROM t").unwrap();
    assert_eq!(first, second);
    assert!(first.is_persistent());
}

#[test]
fn test_statement_cache_keys_on_decode_flags() {
    let db = common::seeded_cached_connection();
    let plain = db.prepare("SELECT a FROM t").unwrap();
    let plucked = db
        .prepare_with("SELECT a FROM t", StatementOptions::new().pluck(true))
        .unwrap();
    let big = db
        .prepare_with("SELECT a FROM t", StatementOptions::new().bigint(true))
        .unwrap();
    assert_ne!(plain, plucked);
    assert_ne!(plain, big);
    assert_ne!(plucked, big);
}

#[test]
fn test_statement_cache_bypassed_when_not_persistent() {
    let db = common::seeded_cached_connection();
    let cached = db.prepare("SELECT a FROM t").unwrap();
    let direct = db
        .prepare_with("SELECT a FROM t", StatementOptions::new().persistent(false))
        .unwrap();
    assert_ne!(cached, direct);
    assert!(!direct.is_persistent());
}

#[test]
fn test_statement_cache_evicts_closed_entries() {
    let db = common::seeded_cached_connection();
    let first = db.prepare("SELECT a FROM t").unwrap();
    first.close().unwrap();
    let second = db.prepare("SELECT a FROM t").unwrap();
    assert_ne!(first, second);
    assert!(!second.is_closed());
    assert!(second.get(&Params::Empty).unwrap().is_some());
}

#[test]
fn test_uncached_prepare_compiles_fresh_statements() {
    let db = common::seeded_connection();
    let first = db.prepare("SELECT a FROM t").unwrap();
    let second = db.prepare("SELECT a FROM t").unwrap();
    assert_ne!(first, second);
    assert!(!first.is_persistent());
}
