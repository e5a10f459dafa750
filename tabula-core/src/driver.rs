use crate::{Connection, SqlWriter};
use std::{borrow::Cow, future::Future};

/// Entry point of a database backend.
pub trait Driver: Send + Sync {
    type Connection: Connection<SqlWriter = Self::SqlWriter>;
    type SqlWriter: SqlWriter + Send + Sync;

    /// Lowercase engine name, also the url scheme.
    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;

    /// Open a new session to the given url.
    fn connect(
        &self,
        url: Cow<'static, str>,
    ) -> impl Future<Output = anyhow::Result<Self::Connection>> + Send;
}
