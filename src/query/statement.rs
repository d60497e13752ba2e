//! Prepared statements: execution, row stepping, and lifecycle.
//!
//! A [`Statement`] is a handle to one compiled statement owned by a
//! [`Connection`](crate::connection::Connection). Handles are cheap to
//! clone; clones share the underlying compiled statement, which is how the
//! connection-level statement cache hands the same statement back. The
//! statement keeps its connection alive: the engine handle is not released
//! until every statement has been closed or dropped.

use std::cell::RefCell;
use std::os::raw::c_int;
use std::rc::Rc;

use libsqlite3_sys as ffi;

use crate::connection::ConnectionInner;
use crate::engine;
use crate::error::StatementError;
use crate::query::params::{self, Params};
use crate::query::results::{Record, Row, RowBuffer, RunResult, Step};
use crate::types::mapping;

/// Compilation and decoding options for [`Connection::prepare_with`].
///
/// [`Connection::prepare_with`]: crate::connection::Connection::prepare_with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementOptions {
    /// Compile for long-lived reuse and buffered row decoding. Unset means
    /// the connection's statement-cache setting decides.
    pub persistent: Option<bool>,
    /// Return the single column's value instead of a named record. Stepping
    /// a statement with more or fewer than one result column fails.
    pub pluck: bool,
    /// Decode INTEGER columns as [`Value::BigInt`](crate::Value::BigInt)
    /// without loss instead of the lossy number mode.
    pub bigint: bool,
}

impl StatementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = Some(persistent);
        self
    }

    pub fn pluck(mut self, pluck: bool) -> Self {
        self.pluck = pluck;
        self
    }

    pub fn bigint(mut self, bigint: bool) -> Self {
        self.bigint = bigint;
        self
    }
}

/// A compiled statement bound to its connection.
#[derive(Debug, Clone)]
pub struct Statement {
    inner: Rc<RefCell<StatementInner>>,
}

impl PartialEq for Statement {
    /// Identity comparison: two handles are equal when they share the same
    /// compiled statement.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Statement {
    pub(crate) fn new(
        handle: *mut ffi::sqlite3_stmt,
        db: Rc<RefCell<ConnectionInner>>,
        persistent: bool,
        pluck: bool,
        bigint: bool,
    ) -> Self {
        Statement {
            inner: Rc::new(RefCell::new(StatementInner {
                handle,
                db,
                persistent,
                pluck,
                bigint,
                buffer: RowBuffer::new(),
            })),
        }
    }

    pub(crate) fn downgrade(&self) -> std::rc::Weak<RefCell<StatementInner>> {
        Rc::downgrade(&self.inner)
    }

    /// Execute to completion and report the write summary.
    ///
    /// The statement is reset afterwards whether it produced rows or not,
    /// so a `run` on a SELECT simply discards the first row.
    pub fn run(&self, params: &Params) -> Result<RunResult, StatementError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_open()?;
        unsafe { inner.run(params) }
    }

    /// Fetch the first row, or `None` when the statement produces none.
    ///
    /// The statement is reset before returning, including on decode errors,
    /// so the handle is immediately reusable.
    pub fn get(&self, params: &Params) -> Result<Option<Row>, StatementError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_open()?;
        let mut buffer = std::mem::take(&mut inner.buffer);
        let result = unsafe { inner.step_with(params, &mut buffer, true) };
        let step = match result {
            Ok(step) => step,
            Err(e) => {
                inner.buffer = buffer;
                return Err(e);
            }
        };
        let row = match step {
            Step::Done => None,
            Step::Row(row) => Some(row),
            Step::Buffered { .. } => Some(Row::Record(buffer.to_record())),
        };
        inner.buffer = buffer;
        Ok(row)
    }

    /// Fetch every row the statement produces.
    pub fn all(&self, params: &Params) -> Result<Vec<Row>, StatementError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_open()?;
        let mut buffer = std::mem::take(&mut inner.buffer);
        let mut rows = Vec::new();
        // After the first step the parameters stay bound; later steps must
        // not rebind or the engine reports the statement as busy.
        let keep = Params::Keep;
        let mut current = params;
        let result = loop {
            match unsafe { inner.step_with(current, &mut buffer, false) } {
                Ok(Step::Done) => break Ok(rows),
                Ok(Step::Row(row)) => rows.push(row),
                Ok(Step::Buffered { .. }) => rows.push(Row::Record(buffer.to_record())),
                Err(e) => break Err(e),
            }
            current = &keep;
        };
        inner.buffer = buffer;
        result
    }

    /// Advance the statement one row.
    ///
    /// Persistent statements decode into `buffer` and report whether its
    /// column names were rebuilt; others return the row directly. The
    /// statement resets itself only when it runs to [`Step::Done`]; abandon
    /// an iteration early by calling [`Statement::close`] or re-running.
    pub fn step(&self, params: &Params, buffer: &mut RowBuffer) -> Result<Step, StatementError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_open()?;
        unsafe { inner.step_with(params, buffer, false) }
    }

    /// Release the compiled statement. Errors if already closed.
    pub fn close(&self) -> Result<(), StatementError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_open()?;
        inner.finalize().map_err(StatementError::from)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.borrow().handle.is_null()
    }

    /// Whether rows decode in buffered persistent mode.
    pub fn is_persistent(&self) -> bool {
        self.inner.borrow().persistent
    }

    pub fn is_pluck(&self) -> bool {
        self.inner.borrow().pluck
    }

    pub fn is_bigint(&self) -> bool {
        self.inner.borrow().bigint
    }
}

#[derive(Debug)]
pub(crate) struct StatementInner {
    /// Null once the statement has been finalized.
    pub(crate) handle: *mut ffi::sqlite3_stmt,
    db: Rc<RefCell<ConnectionInner>>,
    persistent: bool,
    pluck: bool,
    bigint: bool,
    /// Row storage reused across `get`/`all` calls in persistent mode.
    buffer: RowBuffer,
}

impl StatementInner {
    fn check_open(&self) -> Result<(), StatementError> {
        if self.handle.is_null() {
            Err(StatementError::Closed)
        } else {
            Ok(())
        }
    }

    fn db_handle(&self) -> *mut ffi::sqlite3 {
        self.db.borrow().handle
    }

    unsafe fn run(&mut self, params: &Params) -> Result<RunResult, StatementError> {
        let db = self.db_handle();
        params::bind_params(self.handle, db, params)?;

        // `sqlite3_changes()` reports the last statement that changed rows,
        // not this one. Watching the connection-wide counter tells the two
        // apart.
        let before = ffi::sqlite3_total_changes64(db);
        let rc = ffi::sqlite3_step(self.handle);
        self.reset();
        if rc != ffi::SQLITE_DONE && rc != ffi::SQLITE_ROW {
            return Err(engine::engine_error(db).into());
        }

        let changes = if ffi::sqlite3_total_changes64(db) == before {
            0
        } else {
            ffi::sqlite3_changes64(db)
        };
        Ok(RunResult {
            changes,
            last_insert_rowid: ffi::sqlite3_last_insert_rowid(db),
        })
    }

    unsafe fn step_with(
        &mut self,
        params: &Params,
        out: &mut RowBuffer,
        auto_reset: bool,
    ) -> Result<Step, StatementError> {
        let db = self.db_handle();
        params::bind_params(self.handle, db, params)?;

        let rc = ffi::sqlite3_step(self.handle);
        if rc == ffi::SQLITE_DONE {
            self.reset();
            return Ok(Step::Done);
        }
        if rc != ffi::SQLITE_ROW {
            let err = engine::engine_error(db);
            if auto_reset {
                self.reset();
            }
            return Err(err.into());
        }

        let count = ffi::sqlite3_column_count(self.handle) as usize;
        let result = self.decode_row(count, out);
        if auto_reset {
            self.reset();
        }
        result
    }

    unsafe fn decode_row(
        &mut self,
        count: usize,
        out: &mut RowBuffer,
    ) -> Result<Step, StatementError> {
        if self.pluck {
            if count != 1 {
                return Err(StatementError::PluckColumnCount);
            }
            let value = mapping::read_column(self.handle, 0, self.bigint)?;
            return Ok(Step::Row(Row::Value(value)));
        }

        if self.persistent {
            // A schema change makes the engine recompile behind our back,
            // which can change the result shape. The status counter is read
            // with reset so each step observes only its own recompilations.
            let recompiled = ffi::sqlite3_stmt_status(
                self.handle,
                ffi::SQLITE_STMTSTATUS_REPREPARE as c_int,
                1,
            ) != 0;
            let reshaped = recompiled || out.names.len() != count;
            if reshaped {
                out.names.clear();
                for i in 0..count {
                    out.names.push(mapping::column_name(self.handle, i as c_int));
                }
            }
            out.values.clear();
            for i in 0..count {
                out.values
                    .push(mapping::read_column(self.handle, i as c_int, self.bigint)?);
            }
            return Ok(Step::Buffered { reshaped });
        }

        let mut record = Record::with_capacity(count);
        for i in 0..count {
            record.push((
                mapping::column_name(self.handle, i as c_int),
                mapping::read_column(self.handle, i as c_int, self.bigint)?,
            ));
        }
        Ok(Step::Row(Row::Record(record)))
    }

    /// Rewind the statement and clear its bindings so the handle can be
    /// re-executed from scratch.
    unsafe fn reset(&mut self) {
        ffi::sqlite3_reset(self.handle);
        ffi::sqlite3_clear_bindings(self.handle);
    }

    pub(crate) fn finalize(&mut self) -> Result<(), crate::error::EngineError> {
        if self.handle.is_null() {
            return Ok(());
        }
        let db = self.db_handle();
        let rc = unsafe { ffi::sqlite3_finalize(self.handle) };
        self.handle = std::ptr::null_mut();
        if rc != ffi::SQLITE_OK {
            return Err(unsafe { engine::engine_error(db) });
        }
        Ok(())
    }
}

impl Drop for StatementInner {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            let rc = unsafe { ffi::sqlite3_finalize(self.handle) };
            self.handle = std::ptr::null_mut();
            if rc != ffi::SQLITE_OK {
                tracing::error!(code = rc, "cleanup: statement finalize failure");
                std::process::abort();
            }
        }
        // Prune this statement from the connection's tracked set. Skipped
        // when the connection is mid-teardown and holds the borrow; it
        // prunes dead entries itself.
        if let Ok(mut db) = self.db.try_borrow_mut() {
            db.statements.retain(|weak| weak.strong_count() > 0);
        }
    }
}
