//! Statement parameters and the binding rules.
//!
//! [`Params`] is the closed set of parameter shapes a caller can hand to
//! `run`/`step`/`get`/`all`. Binding validates the shape against the
//! compiled statement's declared parameters before any value is encoded:
//! positional sequences must match the declared count exactly and must not
//! meet named parameters; named mappings must not meet anonymous parameters.

use std::collections::HashMap;
use std::ffi::CStr;
use std::os::raw::c_int;

use libsqlite3_sys as ffi;

use crate::error::{StatementError, ValueError};
use crate::types::mapping;
use crate::types::Value;

/// Parameters for a single execution of a statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    /// No parameters; legal only when the statement declares none.
    #[default]
    Empty,
    /// Skip binding entirely, keeping whatever was bound before. Used to
    /// re-step a statement without rebinding; the engine keeps prior
    /// bindings until the next reset.
    Keep,
    /// Positional values; the length must equal the declared count.
    Positional(Vec<Value>),
    /// Named values, keyed without the marker prefix (`$name` binds `name`).
    Named(HashMap<String, Value>),
}

impl Params {
    /// Build positional parameters from anything convertible to [`Value`].
    pub fn positional<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Build named parameters from key/value pairs.
    pub fn named<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Value>,
    {
        Params::Named(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl From<HashMap<String, Value>> for Params {
    fn from(values: HashMap<String, Value>) -> Self {
        Params::Named(values)
    }
}

/// Bind `params` against the compiled statement.
///
/// # Safety
/// `stmt` must be a valid statement handle owned by the open database `db`.
pub(crate) unsafe fn bind_params(
    stmt: *mut ffi::sqlite3_stmt,
    db: *mut ffi::sqlite3,
    params: &Params,
) -> Result<(), StatementError> {
    let declared = ffi::sqlite3_bind_parameter_count(stmt) as usize;

    match params {
        Params::Keep => Ok(()),
        Params::Empty => {
            if declared == 0 {
                Ok(())
            } else {
                Err(StatementError::ParamCount {
                    expected: declared,
                    got: 0,
                })
            }
        }
        Params::Positional(values) => {
            if values.len() != declared {
                return Err(StatementError::ParamCount {
                    expected: declared,
                    got: values.len(),
                });
            }
            for (i, value) in values.iter().enumerate() {
                let index = i as c_int + 1;
                if let Some(name) = parameter_name(stmt, index) {
                    return Err(StatementError::NamedParam {
                        name,
                        index: index as usize,
                    });
                }
                mapping::bind_value(stmt, db, index, value).map_err(|e| {
                    StatementError::Bind {
                        param: index.to_string(),
                        message: e.to_string(),
                    }
                })?;
            }
            Ok(())
        }
        Params::Named(values) => {
            for index in 1..=declared as c_int {
                let Some(name) = parameter_name(stmt, index) else {
                    return Err(StatementError::AnonymousParam {
                        index: index as usize,
                    });
                };
                // Strip the marker prefix ("$", ":", "@") for lookup.
                let key = &name[1..];
                let result = match values.get(key) {
                    Some(value) => mapping::bind_value(stmt, db, index, value),
                    None => Err(ValueError::UnsupportedType("absent")),
                };
                result.map_err(|e| StatementError::Bind {
                    param: key.to_string(),
                    message: e.to_string(),
                })?;
            }
            Ok(())
        }
    }
}

/// Declared name of the 1-based parameter `index`, `None` when anonymous.
unsafe fn parameter_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    let ptr = ffi::sqlite3_bind_parameter_name(stmt, index);
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_default_is_empty() {
        assert_eq!(Params::default(), Params::Empty);
    }

    #[test]
    fn test_positional_builder() {
        let params = Params::positional([1i32, 2, 3]);
        assert_eq!(
            params,
            Params::Positional(vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3)
            ])
        );
    }

    #[test]
    fn test_named_builder() {
        let params = Params::named([("a", 2i32)]);
        let Params::Named(map) = params else {
            panic!("expected named params");
        };
        assert_eq!(map.get("a"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_from_vec() {
        let params: Params = vec![Value::Null].into();
        assert_eq!(params, Params::Positional(vec![Value::Null]));
    }
}
