//! Row shapes produced by statement execution.

use crate::types::Value;

/// A decoded row in record shape: column name paired with its value, in
/// result order. Duplicate column names are kept as-is.
pub type Record = Vec<(String, Value)>;

/// One decoded row, shaped by the statement's pluck mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Pluck mode: the single column's value.
    Value(Value),
    /// Record mode: every column, named.
    Record(Record),
}

/// Outcome of a single step of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The statement ran to completion and was reset.
    Done,
    /// A decoded row, for plucked or non-persistent statements.
    Row(Row),
    /// Persistent mode: the row was written into the caller's buffer.
    /// `reshaped` is true when the column names were rebuilt, which happens
    /// on the first row and whenever the engine recompiled the statement
    /// behind a schema change.
    Buffered { reshaped: bool },
}

/// Reusable row storage for persistent statements. Column names survive
/// across steps so repeated rows only rewrite values.
#[derive(Debug, Clone, Default)]
pub struct RowBuffer {
    pub(crate) names: Vec<String>,
    pub(crate) values: Vec<Value>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column names of the buffered row.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values of the buffered row, in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Copy the buffered row into record shape.
    pub fn to_record(&self) -> Record {
        self.names
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

/// Summary of a completed write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// Rows changed by this statement, zero when the statement could not
    /// have changed any (e.g. a SELECT).
    pub changes: i64,
    /// Rowid of the most recent successful insert on the connection.
    pub last_insert_rowid: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_buffer_to_record() {
        let buffer = RowBuffer {
            names: vec!["a".to_string(), "b".to_string()],
            values: vec![Value::Integer(1), Value::Text("x".to_string())],
        };
        assert_eq!(
            buffer.to_record(),
            vec![
                ("a".to_string(), Value::Integer(1)),
                ("b".to_string(), Value::Text("x".to_string())),
            ]
        );
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = RowBuffer::new();
        assert!(buffer.names().is_empty());
        assert!(buffer.to_record().is_empty());
    }
}
