//! Statement preparation, parameter binding, and row decoding.

pub mod params;
pub mod results;
pub mod statement;
pub mod tail;

pub use params::Params;
pub use results::{Record, Row, RowBuffer, RunResult, Step};
pub use statement::{Statement, StatementOptions};
