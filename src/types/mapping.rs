//! Value mapping between the host representation and the engine.
//!
//! Encoding binds a [`Value`] to a statement parameter; decoding reads one
//! result column into an owned [`Value`]. Both directions are exhaustive
//! matches over the closed set of value kinds. Text and blob binds hand the
//! engine a transient copy; text and blob reads copy out of the engine's
//! buffer, which is only valid until the next step.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};

use libsqlite3_sys as ffi;

use crate::engine;
use crate::error::ValueError;
use crate::types::Value;

/// Bind `value` at the 1-based parameter `index`.
///
/// # Safety
/// `stmt` must be a valid statement handle owned by the open database `db`.
pub(crate) unsafe fn bind_value(
    stmt: *mut ffi::sqlite3_stmt,
    db: *mut ffi::sqlite3,
    index: c_int,
    value: &Value,
) -> Result<(), ValueError> {
    let rc = match value {
        Value::Null => ffi::sqlite3_bind_null(stmt, index),
        Value::Integer(v) => ffi::sqlite3_bind_double(stmt, index, f64::from(*v)),
        Value::Float(v) => ffi::sqlite3_bind_double(stmt, index, *v),
        Value::Text(s) => ffi::sqlite3_bind_text(
            stmt,
            index,
            s.as_ptr() as *const c_char,
            s.len() as c_int,
            ffi::SQLITE_TRANSIENT(),
        ),
        Value::Blob(b) => ffi::sqlite3_bind_blob(
            stmt,
            index,
            b.as_ptr() as *const c_void,
            b.len() as c_int,
            ffi::SQLITE_TRANSIENT(),
        ),
        Value::BigInt(v) => {
            let v = i64::try_from(*v).map_err(|_| ValueError::LossyInteger)?;
            ffi::sqlite3_bind_int64(stmt, index, v)
        }
    };
    if rc != ffi::SQLITE_OK {
        return Err(ValueError::Rejected(engine::error_message(db)));
    }
    Ok(())
}

/// Decode the 0-based result column `index` of the current row.
///
/// # Safety
/// `stmt` must be a valid statement handle positioned on a row.
pub(crate) unsafe fn read_column(
    stmt: *mut ffi::sqlite3_stmt,
    index: c_int,
    bigint: bool,
) -> Result<Value, ValueError> {
    match ffi::sqlite3_column_type(stmt, index) {
        ffi::SQLITE_INTEGER => {
            let v = ffi::sqlite3_column_int64(stmt, index);
            if bigint {
                Ok(Value::BigInt(i128::from(v)))
            } else if v >= i64::from(i32::MIN) && v <= i64::from(i32::MAX) {
                Ok(Value::Integer(v as i32))
            } else {
                Ok(Value::Float(v as f64))
            }
        }
        ffi::SQLITE_FLOAT => Ok(Value::Float(ffi::sqlite3_column_double(stmt, index))),
        ffi::SQLITE_TEXT => {
            let ptr = ffi::sqlite3_column_text(stmt, index);
            let len = ffi::sqlite3_column_bytes(stmt, index) as usize;
            if ptr.is_null() || len == 0 {
                return Ok(Value::Text(String::new()));
            }
            let bytes = std::slice::from_raw_parts(ptr, len);
            Ok(Value::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
        ffi::SQLITE_BLOB => {
            let ptr = ffi::sqlite3_column_blob(stmt, index);
            let len = ffi::sqlite3_column_bytes(stmt, index) as usize;
            if ptr.is_null() || len == 0 {
                return Ok(Value::Blob(Vec::new()));
            }
            let bytes = std::slice::from_raw_parts(ptr as *const u8, len);
            Ok(Value::Blob(bytes.to_vec()))
        }
        ffi::SQLITE_NULL => Ok(Value::Null),
        other => Err(ValueError::UnknownColumnType(other)),
    }
}

/// Read the name of the 0-based result column `index`.
///
/// # Safety
/// `stmt` must be a valid statement handle.
pub(crate) unsafe fn column_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> String {
    let ptr = ffi::sqlite3_column_name(stmt, index);
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}
