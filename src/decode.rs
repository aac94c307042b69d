use std::ffi::c_int;

use libsqlite3_sys as ffi;

use crate::{raw::RawStatement, ParamValue, Result, ResultValue, SqliteError};

/// Forwards `value` to the engine bind call matching its width and kind.
pub(crate) fn bind_value(
    raw: &RawStatement,
    index: c_int,
    value: &ParamValue,
    sql: &str,
) -> Result<()> {
    let bound = match value {
        ParamValue::Null => raw.bind_null(index),
        ParamValue::I8(value) => raw.bind_int(index, (*value).into()),
        ParamValue::U8(value) => raw.bind_int(index, (*value).into()),
        ParamValue::I16(value) => raw.bind_int(index, (*value).into()),
        ParamValue::U16(value) => raw.bind_int(index, (*value).into()),
        ParamValue::I32(value) => raw.bind_int(index, *value),
        ParamValue::U32(value) => raw.bind_int64(index, (*value).into()),
        ParamValue::I64(value) => raw.bind_int64(index, *value),
        ParamValue::U64(value) => {
            let value = i64::try_from(*value).map_err(|_| {
                SqliteError::Range(format!(
                    "{value} does not fit in a 64-bit signed parameter"
                ))
            })?;
            raw.bind_int64(index, value)
        }
        ParamValue::F32(value) => raw.bind_double(index, (*value).into()),
        ParamValue::F64(value) => raw.bind_double(index, *value),
        ParamValue::Text(value) => raw.bind_text(index, value),
        ParamValue::Blob(value) => raw.bind_blob(index, value),
    };
    bound.map_err(|err| err.into_execution(sql))
}

/// Reads one cell of the current row.
///
/// # Panics
///
/// If the engine reports a storage class outside the five it defines.
pub(crate) fn decode_column(raw: &RawStatement, col: c_int) -> ResultValue {
    match raw.column_type(col) {
        ffi::SQLITE_NULL => ResultValue::Null,
        ffi::SQLITE_INTEGER => ResultValue::Integer(raw.column_int64(col)),
        ffi::SQLITE_FLOAT => ResultValue::Real(raw.column_double(col)),
        ffi::SQLITE_TEXT => ResultValue::Text(raw.column_text(col)),
        ffi::SQLITE_BLOB => ResultValue::Blob(raw.column_blob(col)),
        other => unreachable!("engine reported unknown column type {other}"),
    }
}

/// Converts a 1-based parameter or 0-based column position to the engine's index type.
pub(crate) fn to_c_index(index: usize) -> Result<c_int> {
    c_int::try_from(index)
        .map_err(|_| SqliteError::IndexOutOfRange(format!("the index '{index}' is too large")))
}
