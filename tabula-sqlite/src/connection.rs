use crate::{
    CBox, SqliteDriver, SqliteSqlWriter,
    bind::bind_index,
    error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use anyhow::Context;
use async_stream::try_stream;
use libsqlite3_sys::{
    SQLITE_BUSY, SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_bind_parameter_count, sqlite3_busy_timeout,
    sqlite3_close, sqlite3_column_count, sqlite3_db_handle, sqlite3_errmsg, sqlite3_finalize,
    sqlite3_last_insert_rowid, sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt,
    sqlite3_total_changes64,
};
use std::{
    borrow::Cow,
    ffi::{CString, c_int},
    ptr,
    sync::Arc,
};
use tabula_core::{
    Connection, Driver, Query, QueryResult, RowLabeled, RowsAffected, stream::Stream,
};
use tokio::task::spawn_blocking;

/// Milliseconds a statement waits on a locked database before failing.
const BUSY_TIMEOUT: c_int = 5000;

pub struct SqliteConnection {
    pub(crate) connection: CBox<*mut sqlite3>,
}

impl SqliteConnection {
    /// Open `sqlite://<path>[?<uri parameters>]`, the path is created when missing unless the
    /// parameters say otherwise (`mode=ro`).
    pub async fn connect(url: Cow<'static, str>) -> anyhow::Result<SqliteConnection> {
        let prefix = format!("{}://", SqliteDriver::NAME);
        if !url.starts_with(&prefix) {
            let error = anyhow::anyhow!(
                "Expected sqlite connection url to start with `{}`, found `{}`",
                &prefix,
                url
            );
            log::error!("{:#}", error);
            return Err(error);
        }
        let context = || format!("Error while decoding connection URL: `{}`", url);
        let path = url.trim_start_matches(&prefix);
        let (location, parameters) = path.split_once('?').unwrap_or((path, ""));
        let location = urlencoding::decode(location).with_context(context)?;
        let mut uri = format!("file:{}", location);
        if !parameters.is_empty() {
            uri.push('?');
            uri.push_str(parameters);
        }
        let uri = CString::new(uri).with_context(context)?;
        let connection = spawn_blocking(move || unsafe {
            let mut connection = CBox::new(ptr::null_mut(), |p| {
                sqlite3_close(p);
            });
            let rc = sqlite3_open_v2(
                uri.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_URI | SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
                ptr::null(),
            );
            if rc != SQLITE_OK {
                return Err(anyhow::anyhow!(
                    error_message_from_ptr(&sqlite3_errmsg(*connection)).to_string()
                ));
            }
            sqlite3_busy_timeout(*connection, BUSY_TIMEOUT);
            Ok(connection)
        })
        .await?
        .with_context(|| format!("Could not open the sqlite database `{}`", url));
        match connection {
            Ok(connection) => Ok(Self { connection }),
            Err(error) => {
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    /// Prepare the first statement of `sql[offset..]`, returns it (null when only whitespace or
    /// comments remain) along with the offset of the rest.
    async fn prepare(
        &self,
        sql: Arc<CString>,
        offset: usize,
    ) -> anyhow::Result<(CBox<*mut sqlite3_stmt>, usize)> {
        let connection = self.connection.borrowed();
        spawn_blocking(move || unsafe {
            let mut statement = CBox::new(ptr::null_mut(), |p| {
                sqlite3_finalize(p);
            });
            let base = sql.as_ptr();
            let mut tail = ptr::null();
            let rc = sqlite3_prepare_v2(
                *connection,
                base.add(offset),
                (sql.as_bytes().len() - offset) as c_int,
                &mut *statement,
                &mut tail,
            );
            if rc != SQLITE_OK {
                return Err(anyhow::anyhow!(
                    error_message_from_ptr(&sqlite3_errmsg(*connection)).to_string()
                ));
            }
            let next = if tail.is_null() {
                sql.as_bytes().len()
            } else {
                tail.offset_from(base) as usize
            };
            Ok((statement, next))
        })
        .await?
    }
}

impl Connection for SqliteConnection {
    type SqlWriter = SqliteSqlWriter;

    fn sql_writer(&self) -> SqliteSqlWriter {
        SqliteSqlWriter {}
    }

    fn run(&mut self, query: Query) -> impl Stream<Item = anyhow::Result<QueryResult>> + Send {
        let printable = query.to_string();
        let context = format!("While executing the query:\n{}", printable);
        try_stream! {
            let sql = Arc::new(CString::new(query.sql).with_context(|| context.clone())?);
            let mut params = query.params.into_iter();
            let mut offset = 0;
            while offset < sql.as_bytes().len() {
                let (statement, next) = self
                    .prepare(sql.clone(), offset)
                    .await
                    .with_context(|| context.clone())?;
                if statement.is_null() {
                    if next <= offset {
                        break;
                    }
                    offset = next;
                    continue;
                }
                offset = next;
                let expected = unsafe { sqlite3_bind_parameter_count(*statement) };
                for index in 1..=expected {
                    let value = params.next().ok_or_else(|| {
                        anyhow::anyhow!("Missing the value of parameter {}", index)
                            .context(context.clone())
                    })?;
                    bind_index(*statement, index, &value)?;
                }
                let (changes, last_rowid) = unsafe {
                    let db = sqlite3_db_handle(*statement);
                    (sqlite3_total_changes64(db), sqlite3_last_insert_rowid(db))
                };
                let count = unsafe { sqlite3_column_count(*statement) };
                let labels = (0..count)
                    .map(|i| extract_name(*statement, i))
                    .collect::<anyhow::Result<Arc<[_]>>>()?;
                loop {
                    match unsafe { sqlite3_step(*statement) } {
                        SQLITE_DONE => {
                            break;
                        }
                        SQLITE_ROW => {
                            let values = (0..count)
                                .map(|i| extract_value(*statement, i))
                                .collect::<anyhow::Result<Box<[_]>>>()?;
                            yield QueryResult::Row(RowLabeled::new(labels.clone(), values));
                        }
                        rc => {
                            let message = unsafe {
                                error_message_from_ptr(&sqlite3_errmsg(sqlite3_db_handle(*statement)))
                                    .to_string()
                            };
                            let error = if rc == SQLITE_BUSY {
                                anyhow::anyhow!("Database is locked: {}", message)
                            } else {
                                anyhow::anyhow!(message)
                            };
                            Err::<(), _>(error.context(context.clone()))?;
                        }
                    }
                }
                if count == 0 {
                    let (total, rowid) = unsafe {
                        let db = sqlite3_db_handle(*statement);
                        (sqlite3_total_changes64(db), sqlite3_last_insert_rowid(db))
                    };
                    yield QueryResult::Affected(RowsAffected {
                        rows_affected: (total - changes).max(0) as u64,
                        last_affected_id: (rowid != last_rowid).then_some(rowid),
                    });
                }
            }
            if params.next().is_some() {
                log::warn!("More parameters than placeholders in the query:\n{}", printable);
            }
        }
    }
}
