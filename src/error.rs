//! Error types for litebind.
//!
//! This module defines domain-specific error types organized by functional
//! area, plus the shared [`EngineError`] carrying the engine's extended
//! status and (when available) the byte offset of the error in the SQL text.

use std::fmt;
use thiserror::Error;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum LitebindError {
    /// Connection-related errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Statement execution errors
    #[error(transparent)]
    Statement(#[from] StatementError),

    /// Value conversion errors
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// A non-success status reported by the engine.
///
/// `code` is the extended result code; `offset` is the byte offset of the
/// error within the source SQL when the engine can locate it (compile
/// errors), `None` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub message: String,
    pub code: i32,
    pub offset: Option<usize>,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(
                f,
                "sqlite error({}): {}, offset: {}",
                self.code, self.message, offset
            ),
            None => write!(f, "sqlite error({}): {}", self.code, self.message),
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors related to database connections.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to open the database file
    #[error("sqlite open error: {0}")]
    OpenFailed(String),

    /// The database path could not be passed to the engine
    #[error("Invalid database path: {0}")]
    InvalidPath(String),

    /// Any non-success engine status
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Operation on an already-closed connection
    #[error("Database closed")]
    Closed,

    /// `prepare` was given more than one statement
    #[error("Can't prepare more than one statement")]
    MultiStatement,

    /// The FTS5 extension API could not be obtained from the engine
    #[error("FTS5 extension API is unavailable")]
    Fts5Unavailable,
}

/// Errors related to statement execution and parameter binding.
#[derive(Error, Debug)]
pub enum StatementError {
    /// Any non-success engine status
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Operation on an already-closed statement
    #[error("Statement closed")]
    Closed,

    /// Positional/absent parameters did not match the declared count
    #[error("Expected {expected} parameters, got {got}")]
    ParamCount { expected: usize, got: usize },

    /// A positional sequence was bound against a named parameter
    #[error("Unexpected named param {name} at {index}")]
    NamedParam { name: String, index: usize },

    /// A named mapping was bound against an anonymous parameter
    #[error("Unexpected anonymous param at {index}")]
    AnonymousParam { index: usize },

    /// A single parameter failed to bind
    #[error("Failed to bind param {param}, error {message}")]
    Bind { param: String, message: String },

    /// Pluck mode requires exactly one output column
    #[error("Invalid column count for pluck")]
    PluckColumnCount,

    /// Value conversion failed while decoding a column
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Errors related to value conversion between the host and the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A big integer does not fit the engine's signed 64-bit integer
    #[error("bigint value is out of the signed 64-bit range")]
    LossyInteger,

    /// A host value of an unbindable kind (including an absent named
    /// parameter)
    #[error("unexpected type `{0}`")]
    UnsupportedType(&'static str),

    /// The engine rejected the bind; carries the engine's message
    #[error("{0}")]
    Rejected(String),

    /// The engine reported a column type this codec does not know
    #[error("unknown column type {0}")]
    UnknownColumnType(i32),
}
