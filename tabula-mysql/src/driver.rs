use crate::{MySqlConnection, MySqlSqlWriter};
use std::borrow::Cow;
use tabula_core::Driver;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for MySqlDriver {
    type Connection = MySqlConnection;
    type SqlWriter = MySqlSqlWriter;

    const NAME: &'static str = "mysql";

    fn sql_writer(&self) -> Self::SqlWriter {
        MySqlSqlWriter::default()
    }

    async fn connect(&self, url: Cow<'static, str>) -> anyhow::Result<MySqlConnection> {
        MySqlConnection::connect(url).await
    }
}
