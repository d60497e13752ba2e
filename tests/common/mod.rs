//! Shared fixtures for integration tests.

use litebind::{Connection, ConnectionOptions};

/// Open an in-memory database seeded with a small mixed-type table.
pub fn seeded_connection() -> Connection {
    let db = Connection::open_in_memory().expect("open in-memory database");
    seed(&db);
    db
}

/// Same fixture with the connection-level statement cache enabled.
pub fn seeded_cached_connection() -> Connection {
    let db = Connection::open_with_options(
        ":memory:",
        ConnectionOptions::new().cache_statements(true),
    )
    .expect("open in-memory database");
    seed(&db);
    db
}

pub fn seed(db: &Connection) {
    db.exec("CREATE TABLE t (a INTEGER, b TEXT, c BLOB)")
        .expect("create table");
    db.exec(
        "INSERT INTO t (a, b, c) VALUES \
         (1, '123', x'abba'), (2, '456', x'dada'), (3, '789', NULL)",
    )
    .expect("seed rows");
}
