//! litebind: a small binding layer over the embedded SQLite engine.
//!
//! The crate owns connection and statement lifecycles, typed parameter
//! binding and row decoding, and an optional FTS5 tokenizer built on
//! Unicode word segmentation. SQL semantics belong to the engine; this
//! layer enforces the marshalling invariants around it.
//!
//! Connections and statements are reference-counted, single-threaded
//! handles (`!Send`); open one connection per thread.
//!
//! ```no_run
//! use litebind::{Connection, Params};
//!
//! fn main() -> Result<(), litebind::LitebindError> {
//!     let db = Connection::open_in_memory()?;
//!     db.exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//!     let insert = db.prepare("INSERT INTO users (name) VALUES (?1)")?;
//!     let result = insert.run(&Params::positional(["alice"]))?;
//!     assert_eq!(result.changes, 1);
//!
//!     let select = db.prepare("SELECT name FROM users WHERE id = $id")?;
//!     let row = select.get(&Params::named([("id", result.last_insert_rowid)]))?;
//!     println!("{row:?}");
//!
//!     db.close()?;
//!     Ok(())
//! }
//! ```

pub mod connection;
mod engine;
pub mod error;
pub mod query;
pub mod tokenizer;
pub mod types;

pub use connection::{Connection, ConnectionOptions};
pub use error::{ConnectionError, EngineError, LitebindError, StatementError, ValueError};
pub use query::{Params, Record, Row, RowBuffer, RunResult, Statement, StatementOptions, Step};
pub use tokenizer::{tokenize, TOKENIZER_NAME};
pub use types::Value;
