//! Full-text search through the registered tokenizer.

use litebind::{tokenize, Connection, ConnectionError, Params, Row, StatementOptions, Value};

fn fts_connection() -> Connection {
    let db = Connection::open_in_memory().unwrap();
    db.install_tokenizer().unwrap();
    db.exec("CREATE VIRTUAL TABLE messages USING fts5(content, tokenize='unicode_words')")
        .unwrap();
    db.exec(
        "INSERT INTO messages (content) VALUES \
         ('pain au chocolat'), ('pain quotidien'), ('nothing to see')",
    )
    .unwrap();
    db
}

#[test]
fn test_match_single_token() {
    let db = fts_connection();
    let stmt = db
        .prepare_with(
            "SELECT content FROM messages WHERE messages MATCH ?1",
            StatementOptions::new().pluck(true),
        )
        .unwrap();
    let rows = stmt.all(&Params::positional(["chocolat"])).unwrap();
    assert_eq!(
        rows,
        vec![Row::Value(Value::Text("pain au chocolat".to_string()))]
    );
}

#[test]
fn test_match_shared_token_hits_multiple_rows() {
    let db = fts_connection();
    let stmt = db
        .prepare_with(
            "SELECT content FROM messages WHERE messages MATCH ?1 ORDER BY rowid",
            StatementOptions::new().pluck(true),
        )
        .unwrap();
    let rows = stmt.all(&Params::positional(["pain"])).unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_match_reports_correct_offsets() {
    let db = fts_connection();
    // highlight() depends on the byte offsets the tokenizer reports.
    let stmt = db
        .prepare_with(
            "SELECT highlight(messages, 0, '[', ']') FROM messages \
             WHERE messages MATCH ?1",
            StatementOptions::new().pluck(true),
        )
        .unwrap();
    let rows = stmt.all(&Params::positional(["chocolat"])).unwrap();
    assert_eq!(
        rows,
        vec![Row::Value(Value::Text("pain au [chocolat]".to_string()))]
    );
}

#[test]
fn test_install_on_closed_connection() {
    let db = Connection::open_in_memory().unwrap();
    db.close().unwrap();
    assert!(matches!(
        db.install_tokenizer().unwrap_err(),
        ConnectionError::Closed
    ));
}

#[test]
fn test_standalone_tokenize_matches_plugin_segmentation() {
    assert_eq!(tokenize("pain au chocolat"), vec!["pain", "au", "chocolat"]);
    assert_eq!(tokenize("hello world"), vec!["hello", "world"]);
    assert!(tokenize("").is_empty());
}
