//! SQLite value types and their conversions to and from `serde_json` values.

use std::borrow::Cow;

use serde_json::{Number, Value};
use tessel_core::{Result, TesselError};

/// One SQLite storage-class value.
///
/// Borrowed text and blobs avoid copies when binding parameters or reading rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SQLiteValue<'a> {
    /// Integer value (i64)
    Integer(i64),
    /// Real value (f64)
    Real(f64),
    /// Text value (string)
    Text(Cow<'a, str>),
    /// Blob value (binary data)
    Blob(Cow<'a, [u8]>),
    /// NULL value
    #[default]
    Null,
}

/// Binds a statement parameter.
///
/// Booleans bind as `0`/`1` and arrays of bytes as blobs; objects and other
/// arrays are not parameters.
impl<'a> TryFrom<&'a Value> for SQLiteValue<'a> {
    type Error = TesselError;

    fn try_from(value: &'a Value) -> Result<Self> {
        match value {
            Value::Null => Ok(SQLiteValue::Null),
            Value::Bool(b) => Ok(SQLiteValue::Integer(i64::from(*b))),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(SQLiteValue::Integer(i))
                } else if n.is_u64() {
                    Err(TesselError::ParameterError(format!(
                        "{} does not fit in a SQLite integer",
                        n
                    )))
                } else {
                    n.as_f64().map(SQLiteValue::Real).ok_or_else(|| {
                        TesselError::ParameterError(format!("{} is not a SQLite number", n))
                    })
                }
            }
            Value::String(s) => Ok(SQLiteValue::Text(Cow::Borrowed(s.as_str()))),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| {
                            TesselError::ParameterError(format!(
                                "array parameters must hold bytes, got {}",
                                item
                            ))
                        })
                })
                .collect::<Result<Vec<u8>>>()
                .map(|bytes| SQLiteValue::Blob(Cow::Owned(bytes))),
            Value::Object(_) => Err(TesselError::ParameterError(format!(
                "objects cannot be bound as parameters: {}",
                value
            ))),
        }
    }
}

impl<'a> From<SQLiteValue<'a>> for Value {
    fn from(value: SQLiteValue<'a>) -> Self {
        match value {
            SQLiteValue::Integer(i) => Value::from(i),
            SQLiteValue::Real(r) => Number::from_f64(r).map_or(Value::Null, Value::Number),
            SQLiteValue::Text(text) => Value::String(text.into_owned()),
            SQLiteValue::Blob(bytes) => bytes.iter().map(|b| Value::from(*b)).collect(),
            SQLiteValue::Null => Value::Null,
        }
    }
}

//------------------------------------------------------------------------------
// rusqlite implementations
//------------------------------------------------------------------------------

#[cfg(feature = "rusqlite")]
impl<'a> rusqlite::ToSql for SQLiteValue<'a> {
    fn to_sql(&self) -> ::rusqlite::Result<::rusqlite::types::ToSqlOutput<'_>> {
        match self {
            SQLiteValue::Null => Ok(rusqlite::types::ToSqlOutput::Owned(
                rusqlite::types::Value::Null,
            )),
            SQLiteValue::Integer(i) => Ok(rusqlite::types::ToSqlOutput::Owned(
                rusqlite::types::Value::Integer(*i),
            )),
            SQLiteValue::Real(f) => Ok(rusqlite::types::ToSqlOutput::Owned(
                rusqlite::types::Value::Real(*f),
            )),
            SQLiteValue::Text(s) => Ok(rusqlite::types::ToSqlOutput::Borrowed(
                rusqlite::types::ValueRef::Text(s.as_bytes()),
            )),
            SQLiteValue::Blob(b) => Ok(rusqlite::types::ToSqlOutput::Borrowed(
                rusqlite::types::ValueRef::Blob(b.as_ref()),
            )),
        }
    }
}

#[cfg(feature = "rusqlite")]
impl<'a> From<rusqlite::types::ValueRef<'a>> for SQLiteValue<'a> {
    fn from(value: rusqlite::types::ValueRef<'a>) -> Self {
        match value {
            rusqlite::types::ValueRef::Null => SQLiteValue::Null,
            rusqlite::types::ValueRef::Integer(i) => SQLiteValue::Integer(i),
            rusqlite::types::ValueRef::Real(r) => SQLiteValue::Real(r),
            // Zero-copy: borrow if valid UTF-8, otherwise allocate for lossy conversion
            rusqlite::types::ValueRef::Text(items) => match std::str::from_utf8(items) {
                Ok(s) => SQLiteValue::Text(Cow::Borrowed(s)),
                Err(_) => SQLiteValue::Text(String::from_utf8_lossy(items).into_owned().into()),
            },
            rusqlite::types::ValueRef::Blob(items) => SQLiteValue::Blob(Cow::Borrowed(items)),
        }
    }
}
