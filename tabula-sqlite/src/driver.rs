use crate::{SqliteConnection, SqliteSqlWriter};
use std::borrow::Cow;
use tabula_core::Driver;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver {}

impl SqliteDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;
    type SqlWriter = SqliteSqlWriter;

    const NAME: &'static str = "sqlite";

    fn sql_writer(&self) -> SqliteSqlWriter {
        SqliteSqlWriter {}
    }

    async fn connect(&self, url: Cow<'static, str>) -> anyhow::Result<SqliteConnection> {
        SqliteConnection::connect(url).await
    }
}
