use tabula::{AbstractType, Database, Driver, Engine, Entry, SqlWriter, Table, Value};

pub async fn schema_reload<D: Driver>(database: &mut Database<D>) {
    let created = database.tables().cloned().collect::<Vec<_>>();
    assert!(created.len() >= 5, "Expected the tables of the previous scenarios");
    database
        .load_tables()
        .await
        .expect("Failed to reload the tables");
    for table in &created {
        let loaded = database
            .table(table.name())
            .unwrap_or_else(|e| panic!("Table {} was not reloaded: {e:#}", table.name()));
        assert_eq!(shape(table), shape(&loaded), "Table {}", table.name());
        if database.sql_writer().engine() == Engine::Sqlite {
            assert_eq!(table, &*loaded);
        }
    }
    assert!(
        database
            .pre_exec_statements()
            .iter()
            .all(|v| Some(v.as_str()) == database.sql_writer().foreign_keys_pragma())
    );

    // Creating an existing table only registers the model
    let stocks = Table::clone(&database.table("stocks").expect("Unknown stocks"));
    database
        .create_table(stocks)
        .await
        .expect("Failed to create an existing table");
    assert_eq!(
        database
            .table("stocks")
            .expect("Unknown stocks")
            .select(&Default::default())
            .await
            .expect("Failed to select the stocks")
            .len(),
        2
    );

    // Drop
    database
        .create_table(
            Table::builder("scratch")
                .column("id", AbstractType::Integer, "PRIMARY KEY")
                .column("payload", AbstractType::Binary, "")
                .build()
                .expect("Failed to declare the scratch table"),
        )
        .await
        .expect("Failed to create the scratch table");
    let scratch = database.table("scratch").expect("Unknown scratch");
    scratch
        .insert([("id", 1.into()), ("payload", Value::from(vec![0u8, 159, 146, 150]))])
        .await
        .expect("Failed to insert binary");
    assert_eq!(
        scratch.get(1).await.expect("Failed to read binary"),
        Some(Entry::Value(Value::Binary([0, 159, 146, 150].into())))
    );
    database
        .drop_table("scratch", false)
        .await
        .expect("Failed to drop the scratch table");
    assert!(!database.has_table("scratch"));
    assert!(
        !database
            .contains_table("scratch")
            .await
            .expect("Failed to look up the scratch table")
    );
}

/// What survives any engine's rewrite of the DDL.
fn shape(table: &Table) -> (Vec<(String, AbstractType)>, Option<String>, Vec<[String; 3]>) {
    (
        table
            .columns()
            .iter()
            .map(|v| (v.name.clone(), v.column_type))
            .collect(),
        table.primary_key().map(|v| v.name.clone()),
        table
            .foreign_keys()
            .values()
            .map(|v| {
                [
                    v.local_column.clone(),
                    v.referenced_table.clone(),
                    v.referenced_column.clone(),
                ]
            })
            .collect(),
    )
}
