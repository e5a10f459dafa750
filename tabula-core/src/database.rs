use crate::{
    ConditionCompiler, Config, Connection, Driver, Entry, Error, Query, QueryResult, Record,
    Result, RowLabeled, RowsAffected, SchemaParser, Select, SqlWriter, Table, Value, Where,
    stream::{Stream, TryStreamExt},
};
use anyhow::Context;
use async_stream::try_stream;
use std::{collections::BTreeMap, ops::Deref, sync::Arc};

/// The tables of one schema and the driver used to reach them.
///
/// Every storage operation opens its own connection, runs the pre-exec statements, then the
/// statement inside a transaction that commits on success and rolls back on failure.
pub struct Database<D: Driver> {
    driver: D,
    config: Config,
    writer: D::SqlWriter,
    tables: BTreeMap<String, Table>,
    pre_exec_statements: Vec<String>,
}

impl<D: Driver> Database<D> {
    /// Connect and load the existing tables.
    pub async fn open(driver: D, config: Config) -> Result<Self> {
        let writer = driver.sql_writer();
        let mut database = Self {
            driver,
            config,
            writer,
            tables: BTreeMap::new(),
            pre_exec_statements: Vec::new(),
        };
        database.load_tables().await?;
        Ok(database)
    }

    pub fn name(&self) -> &str {
        self.config.database_name()
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn driver(&self) -> &D {
        &self.driver
    }
    pub fn sql_writer(&self) -> &D::SqlWriter {
        &self.writer
    }
    /// Statements run on every connection before its transaction begins.
    pub fn pre_exec_statements(&self) -> &[String] {
        &self.pre_exec_statements
    }
    fn log_target(&self) -> &str {
        self.config.log_target.as_str()
    }

    /// Replace the in memory tables with the ones found in the engine.
    pub async fn load_tables(&mut self) -> Result<()> {
        let mut sql = String::new();
        self.writer.write_list_tables(&mut sql);
        let rows = self.fetch(sql.into()).await?;
        let parser =
            SchemaParser::new(self.writer.translator()).with_log_target(self.log_target());
        let mut tables = BTreeMap::new();
        for row in rows {
            let Some(name) = row.values.first().and_then(Value::as_str) else {
                log::warn!(target: self.log_target(), "Skipping a table listing row without a name: {:?}", row.values);
                continue;
            };
            if self.writer.is_system_table(name) {
                continue;
            }
            let mut sql = String::new();
            let ddl = if self.writer.write_show_create_table(&mut sql, name) {
                self.fetch(sql.into())
                    .await?
                    .into_iter()
                    .next()
                    .and_then(|v| v.values.get(1).and_then(Value::as_str).map(str::to_string))
            } else {
                row.values.get(1).and_then(Value::as_str).map(str::to_string)
            };
            let Some(ddl) = ddl else {
                log::debug!(target: self.log_target(), "Table `{}` has no definition, skipping it", name);
                continue;
            };
            if let Some(table) = parser.parse(name, &ddl)? {
                log::debug!(
                    target: self.log_target(),
                    "Loaded table `{}` with columns {:?}",
                    name,
                    table.columns().iter().map(|v| &v.name).collect::<Vec<_>>()
                );
                tables.insert(name.to_string(), table);
            }
        }
        self.tables = tables;
        self.update_pre_exec_statements();
        Ok(())
    }

    fn update_pre_exec_statements(&mut self) {
        let Some(pragma) = self.writer.foreign_keys_pragma() else {
            return;
        };
        let needed = self.tables.values().any(|v| !v.foreign_keys().is_empty());
        if needed && !self.pre_exec_statements.iter().any(|v| v == pragma) {
            self.pre_exec_statements.push(pragma.to_string());
        }
    }

    /// Emit the DDL unless the engine already has the table, then register the model.
    pub async fn create_table(&mut self, table: Table) -> Result<()> {
        if self.contains_table(table.name()).await? {
            log::debug!(
                target: self.log_target(),
                "Table `{}` already exists, registering the model only",
                table.name()
            );
        } else {
            let mut sql = String::new();
            self.writer.write_create_table(&mut sql, &table, true);
            self.execute(sql.into()).await?;
        }
        self.tables.insert(table.name().to_string(), table);
        self.update_pre_exec_statements();
        Ok(())
    }

    pub async fn drop_table(&mut self, name: &str, if_exists: bool) -> Result<()> {
        let mut sql = String::new();
        self.writer.write_drop_table(&mut sql, name, if_exists);
        self.execute(sql.into()).await?;
        self.tables.remove(name);
        Ok(())
    }

    /// Ask the engine whether the table exists.
    pub async fn contains_table(&self, name: &str) -> Result<bool> {
        let mut query = Query::default();
        self.writer
            .write_table_exists(&mut query.sql, &mut query.params, name);
        Ok(!self.fetch(query).await?.is_empty())
    }

    /// Whether the table is known in memory.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table(&self, name: &str) -> Result<TableHandle<'_, D>> {
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
        Ok(TableHandle {
            database: self,
            table,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Run a statement and return its rows.
    pub async fn fetch(&self, query: Query) -> Result<Vec<RowLabeled>> {
        Ok(self
            .run(query)
            .await?
            .into_iter()
            .filter_map(|v| match v {
                QueryResult::Row(v) => Some(v),
                QueryResult::Affected(..) => None,
            })
            .collect())
    }

    /// Run a statement and return the rows it changed.
    pub async fn execute(&self, query: Query) -> Result<RowsAffected> {
        let mut result = RowsAffected::default();
        result.extend(self.run(query).await?.into_iter().filter_map(|v| match v {
            QueryResult::Affected(v) => Some(v),
            QueryResult::Row(..) => None,
        }));
        Ok(result)
    }

    /// Run any statement inside its own connection and transaction.
    pub async fn run(&self, query: impl Into<Query>) -> Result<Vec<QueryResult>> {
        let query = query.into();
        log::debug!(target: self.log_target(), "{}", query);
        match self.transaction(query).await {
            Ok(v) => Ok(v),
            Err(e) => {
                log::error!(target: self.log_target(), "{:#}", e);
                Err(Error::Execution(e))
            }
        }
    }

    async fn transaction(&self, query: Query) -> anyhow::Result<Vec<QueryResult>> {
        let mut connection = self
            .driver
            .connect(self.config.url.clone())
            .await
            .with_context(|| format!("While connecting to {} using {}", self.name(), D::NAME))?;
        for statement in &self.pre_exec_statements {
            connection
                .execute(statement.as_str().into())
                .await
                .with_context(|| format!("While running the pre-exec statement `{statement}`"))?;
        }
        connection.begin().await.context("While beginning the transaction")?;
        let context = format!("While executing the query:\n{}", query);
        let result: anyhow::Result<Vec<QueryResult>> =
            connection.run(query).try_collect().await;
        match result {
            Ok(result) => {
                connection
                    .commit()
                    .await
                    .context("While committing the transaction")?;
                connection.close().await?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = connection.rollback().await {
                    log::error!(target: self.log_target(), "Rollback failed: {:#}", rollback);
                }
                if let Err(close) = connection.close().await {
                    log::error!(target: self.log_target(), "Closing the connection failed: {:#}", close);
                }
                Err(e.context(context))
            }
        }
    }
}

/// A table of a [`Database`], exposing the row operations.
pub struct TableHandle<'db, D: Driver> {
    database: &'db Database<D>,
    table: &'db Table,
}

impl<D: Driver> Clone for TableHandle<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Driver> Copy for TableHandle<'_, D> {}

impl<D: Driver> Deref for TableHandle<'_, D> {
    type Target = Table;
    fn deref(&self) -> &Self::Target {
        self.table
    }
}

impl<'db, D: Driver> TableHandle<'db, D> {
    pub fn database(&self) -> &'db Database<D> {
        self.database
    }

    fn compiler(&self) -> ConditionCompiler<'db> {
        ConditionCompiler::new(
            &self.database.tables,
            self.table,
            self.database.writer.translator(),
            self.database.config.coercion,
        )
        .with_log_target(self.database.log_target())
    }

    pub async fn select(&self, select: &Select) -> Result<Vec<Record>> {
        let compiler = self.compiler();
        let join = match &select.join {
            Some(join) => compiler.resolve_join(join)?,
            None => Default::default(),
        };
        let compiler = compiler.with_join(&join);
        let projection = compiler.resolve_projection(&select.columns, &join)?;
        let filter = compiler.compile_where(&select.filter)?;
        let order_by = match &select.order_by {
            Some((column, order)) => Some((compiler.resolve_column(column)?.0, *order)),
            None => None,
        };
        let mut query = Query::default();
        self.database.writer.write_select(
            &mut query.sql,
            &mut query.params,
            self.table.name(),
            &projection,
            &join,
            &filter,
            order_by.as_ref().map(|(c, o)| (c, *o)),
            select.limit,
        );
        let labels: Arc<[String]> = projection.iter().map(|v| v.label.clone()).collect();
        let translator = self.database.writer.translator();
        self.database
            .fetch(query)
            .await?
            .into_iter()
            .map(|row| {
                if row.values.len() != projection.len() {
                    return Err(Error::Execution(anyhow::anyhow!(
                        "Expected {} values per row from table `{}`, got {}",
                        projection.len(),
                        self.table.name(),
                        row.values.len()
                    )));
                }
                let values = row
                    .values
                    .into_vec()
                    .into_iter()
                    .zip(&projection)
                    .map(|(v, p)| translator.decode(p.column_type, v))
                    .collect();
                Record::new(labels.clone(), values)
            })
            .collect()
    }

    pub async fn insert<K, V>(&self, values: impl IntoIterator<Item = (K, V)>) -> Result<RowsAffected>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let values = self
            .compiler()
            .compile_assignments(collect_pairs(values))?;
        if let Some(column) = self
            .table
            .columns()
            .iter()
            .find(|c| c.is_required() && !values.iter().any(|(k, _)| *k == c.name))
        {
            return Err(Error::MissingRequiredColumn {
                table: self.table.name().to_string(),
                column: column.name.clone(),
            });
        }
        let mut query = Query::default();
        self.database.writer.write_insert(
            &mut query.sql,
            &mut query.params,
            self.table.name(),
            &values,
        );
        self.database.execute(query).await
    }

    /// Update the matching rows. An empty filter requires `all_rows`.
    pub async fn update<K, V>(
        &self,
        values: impl IntoIterator<Item = (K, V)>,
        filter: &Where,
        all_rows: bool,
    ) -> Result<RowsAffected>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let compiler = self.compiler();
        let values = compiler.compile_assignments(collect_pairs(values))?;
        if values.is_empty() {
            return Err(Error::invalid_input(
                "no values",
                format!("at least one column of `{}` to update", self.table.name()),
            ));
        }
        let filter = compiler.compile_where(filter)?;
        if filter.is_empty() && !all_rows {
            return Err(Error::MissingWhereClause {
                table: self.table.name().to_string(),
                operation: "UPDATE",
            });
        }
        let mut query = Query::default();
        self.database.writer.write_update(
            &mut query.sql,
            &mut query.params,
            self.table.name(),
            &values,
            &filter,
        );
        self.database.execute(query).await
    }

    /// Delete the matching rows. An empty filter requires `all_rows`.
    pub async fn delete(&self, filter: &Where, all_rows: bool) -> Result<RowsAffected> {
        let filter = self.compiler().compile_where(filter)?;
        if filter.is_empty() && !all_rows {
            return Err(Error::MissingWhereClause {
                table: self.table.name().to_string(),
                operation: "DELETE",
            });
        }
        let mut query = Query::default();
        self.database.writer.write_delete(
            &mut query.sql,
            &mut query.params,
            self.table.name(),
            &filter,
        );
        self.database.execute(query).await
    }

    fn primary_key_name(&self) -> Result<&'db str> {
        self.table
            .primary_key()
            .map(|v| v.name.as_str())
            .ok_or_else(|| {
                Error::invalid_input(
                    self.table.name(),
                    "a table with a primary key for key based access",
                )
            })
    }

    /// Row with the given primary key. Tables made of the key and one other column yield the bare value.
    pub async fn get(&self, key: impl Into<Value>) -> Result<Option<Entry>> {
        let pk = self.primary_key_name()?;
        let Some(record) = self
            .select(&Select::all().filter(Where::eq(pk, key)))
            .await?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        Ok(Some(match self.table.value_column() {
            Some(column) => Entry::Value(record.get(&column.name).cloned().unwrap_or_default()),
            None => Entry::Record(record),
        }))
    }

    /// Update the row with the given key when present, insert it otherwise.
    pub async fn set(&self, key: impl Into<Value>, entry: impl Into<Entry>) -> Result<RowsAffected> {
        let pk = self.primary_key_name()?;
        let key = key.into();
        let value_column = self.table.value_column().map(|v| v.name.as_str());
        let mut values = match (entry.into(), value_column) {
            (Entry::Value(v), Some(column)) => vec![(column.to_string(), v)],
            (Entry::Record(r), Some(column)) if !r.contains(pk) && !r.contains(column) => {
                vec![(column.to_string(), Value::Json(r.to_json()))]
            }
            (Entry::Record(r), _) => r.into_pairs(),
            (Entry::Value(v), None) => {
                return Err(Error::invalid_input(
                    v.to_string(),
                    format!(
                        "a record for table `{}`, bare values fit only a key and value table",
                        self.table.name()
                    ),
                ));
            }
        };
        if self.contains(key.clone()).await? {
            values.retain(|(k, _)| k != pk);
            if values.is_empty() {
                return Ok(RowsAffected::default());
            }
            self.update(values, &Where::eq(pk, key), false).await
        } else {
            if !values.iter().any(|(k, _)| k == pk) {
                values.push((pk.to_string(), key));
            }
            self.insert(values).await
        }
    }

    pub async fn contains(&self, key: impl Into<Value>) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Every row of the table. The select is issued when the stream is first polled, each call
    /// issues a new one.
    pub fn rows(&self) -> impl Stream<Item = Result<Record>> {
        let handle = *self;
        try_stream! {
            for record in handle.select(&Select::all()).await? {
                yield record;
            }
        }
    }
}

fn collect_pairs<K: Into<String>, V: Into<Value>>(
    values: impl IntoIterator<Item = (K, V)>,
) -> Vec<(String, Value)> {
    values
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
