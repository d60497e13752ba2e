//! Boundary with the embedded SQLite engine.
//!
//! Everything that talks to the engine above the level of a single statement
//! lives here: the process-wide one-shot initialization and error
//! introspection (`errmsg`/`extended_errcode`/`error_offset`).

use std::ffi::CStr;
use std::sync::Once;

use libsqlite3_sys as ffi;

use crate::error::EngineError;

static ENGINE_INIT: Once = Once::new();

/// Initialize the engine exactly once per process.
///
/// The engine is never explicitly torn down; this matches the embedded-engine
/// lifecycle where `sqlite3_shutdown` is left to process exit.
pub(crate) fn ensure_initialized() {
    ENGINE_INIT.call_once(|| {
        // SAFETY: sqlite3_initialize is safe to call from any thread once.
        let rc = unsafe { ffi::sqlite3_initialize() };
        if rc != ffi::SQLITE_OK {
            tracing::warn!(code = rc, "sqlite3_initialize reported non-OK status");
        }
    });
}

/// Describe a bare result code without a database handle.
pub(crate) fn status_string(code: i32) -> String {
    // SAFETY: sqlite3_errstr always returns a valid static string.
    unsafe {
        CStr::from_ptr(ffi::sqlite3_errstr(code))
            .to_string_lossy()
            .into_owned()
    }
}

/// Read the engine's current error message for `db`.
///
/// # Safety
/// `db` must be a valid, open database handle.
pub(crate) unsafe fn error_message(db: *mut ffi::sqlite3) -> String {
    CStr::from_ptr(ffi::sqlite3_errmsg(db))
        .to_string_lossy()
        .into_owned()
}

/// Build an [`EngineError`] from the engine's error state for `db`.
///
/// # Safety
/// `db` must be a valid, open database handle.
pub(crate) unsafe fn engine_error(db: *mut ffi::sqlite3) -> EngineError {
    let message = error_message(db);
    let code = ffi::sqlite3_extended_errcode(db);
    let offset = ffi::sqlite3_error_offset(db);
    EngineError {
        message,
        code,
        offset: usize::try_from(offset).ok(),
    }
}
