//! Connection lifecycle and the statement registry.
//!
//! A [`Connection`] owns one engine database handle. Statements prepared on
//! it are tracked so [`Connection::close`] can finalize them first; the
//! engine refuses to close a database with live statements otherwise.
//! Statements in turn keep the connection's inner state alive, so dropping
//! a [`Connection`] with outstanding statements defers the actual close
//! until the last of them goes away.
//!
//! Handles are reference-counted and not `Send`; a connection and all of
//! its statements belong to the thread that opened it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_uint};
use std::path::Path;
use std::rc::{Rc, Weak};

use libsqlite3_sys as ffi;

use crate::engine;
use crate::error::{ConnectionError, LitebindError};
use crate::query::statement::StatementInner;
use crate::query::tail;
use crate::query::{Params, Record, Row, Statement, StatementOptions};
use crate::tokenizer;
use crate::types::Value;

/// Name used for nested-transaction savepoints.
const SAVEPOINT_NAME: &str = "litebind";

/// Options for [`Connection::open_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionOptions {
    /// Make statements persistent by default and cache them by source text,
    /// handing the same compiled statement back on repeated `prepare` calls
    /// until it is closed. Statements prepared with `persistent` explicitly
    /// disabled bypass the cache.
    pub cache_statements: bool,
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_statements(mut self, cache_statements: bool) -> Self {
        self.cache_statements = cache_statements;
        self
    }
}

/// Cached transaction-control statements, prepared on first use.
#[derive(Clone)]
struct TransactionStmts {
    begin: Statement,
    commit: Statement,
    rollback: Statement,
    savepoint: Statement,
    release: Statement,
    rollback_to: Statement,
}

/// An open database.
pub struct Connection {
    inner: Rc<RefCell<ConnectionInner>>,
    cache_enabled: bool,
    statement_cache: RefCell<HashMap<(bool, bool, String), Statement>>,
    transaction_depth: Cell<usize>,
    transaction_stmts: RefCell<Option<TransactionStmts>>,
}

impl Connection {
    /// Open (creating if missing) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ConnectionError> {
        Self::open_with_options(path, ConnectionOptions::default())
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, ConnectionError> {
        Self::open(":memory:")
    }

    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        options: ConnectionOptions,
    ) -> Result<Self, ConnectionError> {
        engine::ensure_initialized();

        let path = path.as_ref();
        let c_path = path
            .to_str()
            .ok_or_else(|| ConnectionError::InvalidPath(path.display().to_string()))
            .and_then(|s| {
                CString::new(s).map_err(|_| ConnectionError::InvalidPath(s.to_string()))
            })?;

        let mut handle: *mut ffi::sqlite3 = std::ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_open_v2(
                c_path.as_ptr(),
                &mut handle,
                ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE,
                std::ptr::null(),
            )
        };
        if rc != ffi::SQLITE_OK {
            // On failure a handle may still have been allocated; release it
            // before reporting.
            if !handle.is_null() {
                unsafe { ffi::sqlite3_close(handle) };
            }
            return Err(ConnectionError::OpenFailed(engine::status_string(rc)));
        }
        unsafe { ffi::sqlite3_extended_result_codes(handle, 1) };

        tracing::debug!(path = %path.display(), "opened database");
        Ok(Connection {
            inner: Rc::new(RefCell::new(ConnectionInner {
                handle,
                statements: Vec::new(),
            })),
            cache_enabled: options.cache_statements,
            statement_cache: RefCell::new(HashMap::new()),
            transaction_depth: Cell::new(0),
            transaction_stmts: RefCell::new(None),
        })
    }

    fn handle(&self) -> Result<*mut ffi::sqlite3, ConnectionError> {
        let handle = self.inner.borrow().handle;
        if handle.is_null() {
            Err(ConnectionError::Closed)
        } else {
            Ok(handle)
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.borrow().handle.is_null()
    }

    /// Execute one or more statements, discarding any rows they produce.
    pub fn exec(&self, sql: &str) -> Result<(), ConnectionError> {
        let handle = self.handle()?;
        let c_sql = CString::new(sql).map_err(|_| {
            ConnectionError::Engine(crate::error::EngineError {
                message: "SQL contains an embedded nul byte".to_string(),
                code: ffi::SQLITE_MISUSE,
                offset: None,
            })
        })?;
        let rc = unsafe {
            ffi::sqlite3_exec(
                handle,
                c_sql.as_ptr(),
                None,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if rc != ffi::SQLITE_OK {
            return Err(unsafe { engine::engine_error(handle) }.into());
        }
        Ok(())
    }

    /// Compile a single SQL statement with default options.
    pub fn prepare(&self, sql: &str) -> Result<Statement, ConnectionError> {
        self.prepare_with(sql, StatementOptions::default())
    }

    /// Compile a single SQL statement.
    ///
    /// With statement caching enabled on the connection, statements are
    /// compiled persistent and reused by source text unless `persistent` is
    /// explicitly disabled; a later `prepare_with` of the same text (and the
    /// same `pluck`/`bigint` flags) returns the same [`Statement`].
    pub fn prepare_with(
        &self,
        sql: &str,
        options: StatementOptions,
    ) -> Result<Statement, ConnectionError> {
        let handle = self.handle()?;

        if !self.cache_enabled || options.persistent == Some(false) {
            let persistent = options.persistent.unwrap_or(false);
            return self.prepare_raw(handle, sql, persistent, options.pluck, options.bigint);
        }

        let key = (options.pluck, options.bigint, sql.to_string());
        let mut cache = self.statement_cache.borrow_mut();
        if let Some(cached) = cache.get(&key) {
            if !cached.is_closed() {
                return Ok(cached.clone());
            }
            cache.remove(&key);
        }
        let stmt = self.prepare_raw(handle, sql, true, options.pluck, options.bigint)?;
        cache.insert(key, stmt.clone());
        Ok(stmt)
    }

    fn prepare_raw(
        &self,
        handle: *mut ffi::sqlite3,
        sql: &str,
        persistent: bool,
        pluck: bool,
        bigint: bool,
    ) -> Result<Statement, ConnectionError> {
        let flags = if persistent {
            ffi::SQLITE_PREPARE_PERSISTENT as c_uint
        } else {
            0
        };

        let mut stmt: *mut ffi::sqlite3_stmt = std::ptr::null_mut();
        let mut tail_ptr: *const c_char = std::ptr::null();
        let rc = unsafe {
            ffi::sqlite3_prepare_v3(
                handle,
                sql.as_ptr() as *const c_char,
                sql.len() as c_int,
                flags,
                &mut stmt,
                &mut tail_ptr,
            )
        };
        if rc != ffi::SQLITE_OK {
            return Err(unsafe { engine::engine_error(handle) }.into());
        }

        // Reject sources holding more than one statement; trailing
        // whitespace and comments are fine.
        let consumed = tail_ptr as usize - sql.as_ptr() as usize;
        if tail::has_tail(&sql[consumed..]) {
            let rc = unsafe { ffi::sqlite3_finalize(stmt) };
            if rc != ffi::SQLITE_OK {
                return Err(unsafe { engine::engine_error(handle) }.into());
            }
            return Err(ConnectionError::MultiStatement);
        }

        // An empty or comment-only source compiles to no statement at all;
        // the resulting handle behaves as closed.
        let stmt = Statement::new(stmt, Rc::clone(&self.inner), persistent, pluck, bigint);
        let mut inner = self.inner.borrow_mut();
        inner.statements.retain(|weak| weak.strong_count() > 0);
        inner.statements.push(stmt.downgrade());
        Ok(stmt)
    }

    /// Register the word-segmenting FTS5 tokenizer on this connection.
    ///
    /// Virtual tables may then be created with
    /// `tokenize = 'unicode_words'`.
    pub fn install_tokenizer(&self) -> Result<(), ConnectionError> {
        let handle = self.handle()?;
        unsafe { tokenizer::register(handle) }
    }

    /// Run `PRAGMA <source>` and return the resulting rows.
    pub fn pragma(&self, source: &str) -> Result<Vec<Record>, LitebindError> {
        let stmt = self.prepare_with(&format!("PRAGMA {source}"), StatementOptions::default())?;
        let mut records = Vec::new();
        for row in stmt.all(&Params::Empty)? {
            if let Row::Record(record) = row {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Run `PRAGMA <source>` and return the first column of the first row.
    pub fn pragma_simple(&self, source: &str) -> Result<Option<Value>, LitebindError> {
        let options = StatementOptions::new().pluck(true);
        let stmt = self.prepare_with(&format!("PRAGMA {source}"), options)?;
        match stmt.get(&Params::Empty)? {
            Some(Row::Value(value)) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// Run `f` inside a transaction, committing on `Ok` and rolling back on
    /// `Err`. Nested calls run inside savepoints, so an inner rollback
    /// unwinds only the inner scope.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce() -> Result<T, LitebindError>,
    ) -> Result<T, LitebindError> {
        let stmts = self.transaction_stmts()?;

        self.transaction_depth.set(self.transaction_depth.get() + 1);
        let guard = DepthGuard(&self.transaction_depth);
        let outer = self.transaction_depth.get() == 1;

        let (begin, commit, rollback) = if outer {
            (&stmts.begin, &stmts.commit, &stmts.rollback)
        } else {
            (&stmts.savepoint, &stmts.release, &stmts.rollback_to)
        };

        begin.run(&Params::Empty)?;
        match f() {
            Ok(value) => {
                commit.run(&Params::Empty)?;
                drop(guard);
                Ok(value)
            }
            Err(err) => {
                rollback.run(&Params::Empty)?;
                drop(guard);
                Err(err)
            }
        }
    }

    fn transaction_stmts(&self) -> Result<TransactionStmts, LitebindError> {
        let mut slot = self.transaction_stmts.borrow_mut();
        if let Some(stmts) = slot.as_ref() {
            return Ok(stmts.clone());
        }
        let options = StatementOptions::new().persistent(true).pluck(true);
        let stmts = TransactionStmts {
            begin: self.prepare_with("BEGIN", options)?,
            commit: self.prepare_with("COMMIT", options)?,
            rollback: self.prepare_with("ROLLBACK", options)?,
            savepoint: self.prepare_with(&format!("SAVEPOINT {SAVEPOINT_NAME}"), options)?,
            release: self.prepare_with(&format!("RELEASE {SAVEPOINT_NAME}"), options)?,
            rollback_to: self
                .prepare_with(&format!("ROLLBACK TO {SAVEPOINT_NAME}"), options)?,
        };
        *slot = Some(stmts.clone());
        Ok(stmts)
    }

    /// Close the database, finalizing every tracked statement first.
    /// Errors if already closed.
    pub fn close(&self) -> Result<(), ConnectionError> {
        // Upgrade first so finalizing cannot race statement drops against
        // the borrow below.
        let live: Vec<Rc<RefCell<StatementInner>>> = {
            let inner = self.inner.borrow();
            if inner.handle.is_null() {
                return Err(ConnectionError::Closed);
            }
            inner.statements.iter().filter_map(Weak::upgrade).collect()
        };

        for stmt in &live {
            stmt.borrow_mut().finalize()?;
        }

        {
            let mut inner = self.inner.borrow_mut();
            inner.statements.clear();
            let rc = unsafe { ffi::sqlite3_close(inner.handle) };
            if rc != ffi::SQLITE_OK {
                let err = unsafe { engine::engine_error(inner.handle) };
                return Err(err.into());
            }
            inner.handle = std::ptr::null_mut();
        }

        drop(live);
        self.statement_cache.borrow_mut().clear();
        *self.transaction_stmts.borrow_mut() = None;
        tracing::debug!("closed database");
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.is_closed())
            .field("cache_enabled", &self.cache_enabled)
            .finish()
    }
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// Shared connection state: the raw handle plus the set of statements
/// compiled against it.
#[derive(Debug)]
pub(crate) struct ConnectionInner {
    /// Null once the database has been closed.
    pub(crate) handle: *mut ffi::sqlite3,
    pub(crate) statements: Vec<Weak<RefCell<StatementInner>>>,
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        // Statements hold a strong reference to this state, so they have
        // all been finalized by the time this runs and the close cannot
        // report outstanding statements.
        let rc = unsafe { ffi::sqlite3_close(self.handle) };
        self.handle = std::ptr::null_mut();
        if rc != ffi::SQLITE_OK {
            tracing::error!(code = rc, "cleanup: database close failure");
            std::process::abort();
        }
    }
}
