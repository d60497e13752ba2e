//! FTS5 tokenizer plug-in backed by Unicode word segmentation.
//!
//! The tokenizer is registered per connection under the name
//! `unicode_words` and splits text on UAX #29 word boundaries, so full-text
//! indexes behave sensibly for scripts without space-separated words. It is
//! stateless: the registration record is the only resource, and the engine
//! tears it down when the connection closes.

use std::os::raw::{c_char, c_int, c_void};

use libsqlite3_sys as ffi;
use unicode_segmentation::UnicodeSegmentation;

use crate::engine;
use crate::error::{ConnectionError, EngineError};

/// Name the tokenizer is registered under; use it in the `tokenize=`
/// argument of `CREATE VIRTUAL TABLE ... USING fts5(...)`.
pub const TOKENIZER_NAME: &str = "unicode_words";

const TOKENIZER_NAME_C: &[u8] = b"unicode_words\0";

/// Split `text` into word tokens, in order.
///
/// This is the same segmentation the registered tokenizer applies, usable
/// without a connection.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_owned).collect()
}

// The FTS5 extension structs are not part of the core C API and are
// declared here for the handful of fields the registration path touches.
// Layout of fts5_api version 2.

#[repr(C)]
struct Fts5Api {
    version: c_int,
    create_tokenizer: Option<
        unsafe extern "C" fn(
            api: *mut Fts5Api,
            name: *const c_char,
            context: *mut c_void,
            tokenizer: *mut Fts5TokenizerVtab,
            destroy: Option<unsafe extern "C" fn(*mut c_void)>,
        ) -> c_int,
    >,
    _find_tokenizer: *mut c_void,
    _create_function: *mut c_void,
}

#[repr(C)]
struct Fts5TokenizerVtab {
    x_create: Option<
        unsafe extern "C" fn(
            context: *mut c_void,
            args: *mut *const c_char,
            n_args: c_int,
            out: *mut *mut Fts5Tokenizer,
        ) -> c_int,
    >,
    x_delete: Option<unsafe extern "C" fn(tokenizer: *mut Fts5Tokenizer)>,
    x_tokenize: Option<
        unsafe extern "C" fn(
            tokenizer: *mut Fts5Tokenizer,
            context: *mut c_void,
            flags: c_int,
            text: *const c_char,
            text_len: c_int,
            push_token: Option<
                unsafe extern "C" fn(
                    context: *mut c_void,
                    flags: c_int,
                    token: *const c_char,
                    token_len: c_int,
                    start: c_int,
                    end: c_int,
                ) -> c_int,
            >,
        ) -> c_int,
    >,
}

#[repr(C)]
struct Fts5Tokenizer {
    _private: [u8; 0],
}

static TOKENIZER_VTAB: Fts5TokenizerVtab = Fts5TokenizerVtab {
    x_create: Some(x_create),
    x_delete: Some(x_delete),
    x_tokenize: Some(x_tokenize),
};

unsafe extern "C" fn x_create(
    context: *mut c_void,
    _args: *mut *const c_char,
    _n_args: c_int,
    out: *mut *mut Fts5Tokenizer,
) -> c_int {
    // No per-tokenizer state; hand back the registration context so the
    // engine has a non-owning placeholder to thread through.
    *out = context.cast();
    ffi::SQLITE_OK
}

unsafe extern "C" fn x_delete(_tokenizer: *mut Fts5Tokenizer) {}

unsafe extern "C" fn x_tokenize(
    _tokenizer: *mut Fts5Tokenizer,
    context: *mut c_void,
    _flags: c_int,
    text: *const c_char,
    text_len: c_int,
    push_token: Option<
        unsafe extern "C" fn(*mut c_void, c_int, *const c_char, c_int, c_int, c_int) -> c_int,
    >,
) -> c_int {
    let Some(push_token) = push_token else {
        return ffi::SQLITE_MISUSE;
    };
    if text.is_null() || text_len <= 0 {
        return ffi::SQLITE_OK;
    }
    let bytes = std::slice::from_raw_parts(text as *const u8, text_len as usize);
    // Token offsets must index the engine's buffer, so only valid UTF-8 can
    // be segmented; anything else simply produces no tokens.
    let Ok(text) = std::str::from_utf8(bytes) else {
        return ffi::SQLITE_OK;
    };

    for (start, word) in text.unicode_word_indices() {
        let rc = push_token(
            context,
            0,
            word.as_ptr() as *const c_char,
            word.len() as c_int,
            start as c_int,
            (start + word.len()) as c_int,
        );
        if rc != ffi::SQLITE_OK {
            return rc;
        }
    }
    ffi::SQLITE_OK
}

/// Fetch the FTS5 extension API from the connection and register the
/// tokenizer on it.
///
/// # Safety
/// `db` must be a valid open database handle.
pub(crate) unsafe fn register(db: *mut ffi::sqlite3) -> Result<(), ConnectionError> {
    let mut api: *mut Fts5Api = std::ptr::null_mut();

    // The capability probe: `fts5(?1)` writes the extension API pointer
    // through a pointer-typed parameter.
    let probe = b"SELECT fts5(?1)\0";
    let mut stmt: *mut ffi::sqlite3_stmt = std::ptr::null_mut();
    let rc = ffi::sqlite3_prepare_v2(
        db,
        probe.as_ptr() as *const c_char,
        probe.len() as c_int,
        &mut stmt,
        std::ptr::null_mut(),
    );
    if rc != ffi::SQLITE_OK {
        return Err(engine::engine_error(db).into());
    }
    ffi::sqlite3_bind_pointer(
        stmt,
        1,
        (&mut api as *mut *mut Fts5Api).cast(),
        b"fts5_api_ptr\0".as_ptr() as *const c_char,
        None,
    );
    ffi::sqlite3_step(stmt);
    let rc = ffi::sqlite3_finalize(stmt);
    if rc != ffi::SQLITE_OK {
        return Err(engine::engine_error(db).into());
    }

    if api.is_null() || (*api).version < 2 {
        return Err(ConnectionError::Fts5Unavailable);
    }
    let Some(create_tokenizer) = (*api).create_tokenizer else {
        return Err(ConnectionError::Fts5Unavailable);
    };

    let vtab = &TOKENIZER_VTAB as *const Fts5TokenizerVtab as *mut Fts5TokenizerVtab;
    let rc = create_tokenizer(
        api,
        TOKENIZER_NAME_C.as_ptr() as *const c_char,
        std::ptr::null_mut(),
        vtab,
        None,
    );
    if rc != ffi::SQLITE_OK {
        return Err(EngineError {
            message: engine::status_string(rc),
            code: rc,
            offset: None,
        }
        .into());
    }
    tracing::debug!(name = TOKENIZER_NAME, "registered tokenizer");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("hello world"), vec!["hello", "world"]);
    }

    #[test]
    fn test_tokenize_preserves_order() {
        assert_eq!(
            tokenize("one, two; three"),
            vec!["one", "two", "three"]
        );
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \t\n").is_empty());
    }

    #[test]
    fn test_tokenize_punctuation_only() {
        assert!(tokenize("...!?").is_empty());
    }

    #[test]
    fn test_tokenize_keeps_contractions() {
        assert_eq!(tokenize("don't stop"), vec!["don't", "stop"]);
    }
}
