use crate::error_message_from_ptr;
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_char, c_int, c_void},
};
use tabula_core::{Value, truncate_long};

/// Bind `value` to the 1-based parameter `index` of `statement`.
pub(crate) fn bind_index(
    statement: *mut sqlite3_stmt,
    index: c_int,
    value: &Value,
) -> anyhow::Result<()> {
    unsafe {
        let rc = match value {
            Value::Null => sqlite3_bind_null(statement, index),
            Value::Boolean(v) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Integer(v) => sqlite3_bind_int64(statement, index, *v),
            Value::Real(v) => sqlite3_bind_double(statement, index, *v),
            Value::Text(v) => sqlite3_bind_text(
                statement,
                index,
                v.as_ptr() as *const c_char,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
            Value::Binary(v) => sqlite3_bind_blob(
                statement,
                index,
                v.as_ptr() as *const c_void,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
            Value::Json(v) => {
                let v = v.to_string();
                sqlite3_bind_text(
                    statement,
                    index,
                    v.as_ptr() as *const c_char,
                    v.len() as c_int,
                    SQLITE_TRANSIENT(),
                )
            }
        };
        if rc != SQLITE_OK {
            let db = sqlite3_db_handle(statement);
            let query = sqlite3_sql(statement);
            let error = anyhow::anyhow!(error_message_from_ptr(&sqlite3_errmsg(db)).to_string())
                .context(format!(
                    "Cannot bind parameter {} to query:\n{}",
                    index,
                    truncate_long!(CStr::from_ptr(query).to_string_lossy())
                ));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(())
    }
}
