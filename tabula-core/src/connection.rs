use crate::{
    Query, QueryResult, RowLabeled, RowsAffected, SqlWriter,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::future::Future;

/// One open session with the engine.
pub trait Connection: Send {
    type SqlWriter: SqlWriter + Send + Sync;

    fn sql_writer(&self) -> Self::SqlWriter;

    /// General method to send any query and return any result type (either row or count).
    fn run(&mut self, query: Query) -> impl Stream<Item = anyhow::Result<QueryResult>> + Send;

    /// Execute the query and return the rows.
    fn fetch(&mut self, query: Query) -> impl Stream<Item = anyhow::Result<RowLabeled>> + Send {
        self.run(query).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the query and return the total number of rows affected.
    fn execute(&mut self, query: Query) -> impl Future<Output = anyhow::Result<RowsAffected>> + Send {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }

    fn begin(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send {
        let mut sql = String::new();
        self.sql_writer().write_transaction_begin(&mut sql);
        let result = self.execute(sql.into());
        async move { result.await.map(|_| ()) }
    }

    fn commit(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send {
        let mut sql = String::new();
        self.sql_writer().write_transaction_commit(&mut sql);
        let result = self.execute(sql.into());
        async move { result.await.map(|_| ()) }
    }

    fn rollback(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send {
        let mut sql = String::new();
        self.sql_writer().write_transaction_rollback(&mut sql);
        let result = self.execute(sql.into());
        async move { result.await.map(|_| ()) }
    }

    /// Release the session.
    fn close(self) -> impl Future<Output = anyhow::Result<()>> + Send
    where
        Self: Sized,
    {
        async move {
            drop(self);
            Ok(())
        }
    }
}
