use std::{collections::BTreeSet, pin::pin};
use tabula::{
    AbstractType, Database, Driver, Select, Table, Value, Where,
    serde_json::json,
    stream::{StreamExt, TryStreamExt},
    values,
};

pub async fn stocks<D: Driver>(database: &mut Database<D>) {
    // Setup
    database
        .drop_table("stocks", true)
        .await
        .expect("Failed to drop the stocks table");
    database
        .create_table(
            Table::builder("stocks")
                .column("symbol", AbstractType::Text, "PRIMARY KEY")
                .column("date", AbstractType::Text, "NOT NULL")
                .column("qty", AbstractType::Integer, "NOT NULL")
                .column("price", AbstractType::Real, "")
                .column("meta", AbstractType::Text, "")
                .build()
                .expect("Failed to declare the stocks table"),
        )
        .await
        .expect("Failed to create the stocks table");
    assert!(
        database
            .contains_table("stocks")
            .await
            .expect("Failed to look up the stocks table")
    );
    let stocks = database.table("stocks").expect("Unknown table stocks");

    // Insert then select by key
    let meta = json!({"exchange": "NYSE", "tags": ["linux", "enterprise"]});
    let result = stocks
        .insert(values! {
            "symbol" => "RHAT",
            "date" => "2006-01-05",
            "qty" => 100,
            "price" => 35.14,
            "meta" => meta.clone(),
        })
        .await
        .expect("Failed to insert RHAT");
    assert_eq!(result.rows_affected, 1);
    let records = stocks
        .select(&Select::all().filter(Where::eq("symbol", "RHAT")))
        .await
        .expect("Failed to select RHAT");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.labels(), ["symbol", "date", "qty", "price", "meta"]);
    assert_eq!(record["symbol"], Value::Text("RHAT".into()));
    assert_eq!(record["date"], Value::Text("2006-01-05".into()));
    assert_eq!(record["qty"], Value::Integer(100));
    assert_eq!(record["price"], Value::Real(35.14));
    assert_eq!(record["meta"], Value::Json(meta));

    // Values are coerced to the column types
    stocks
        .insert(values! {
            "symbol" => "IBM",
            "date" => "2006-03-28",
            "qty" => "1000",
            "price" => 45,
        })
        .await
        .expect("Failed to insert IBM");
    stocks
        .insert(values! {
            "symbol" => "MSFT",
            "date" => "2006-04-05",
            "qty" => 1000.0,
            "price" => 72.0,
        })
        .await
        .expect("Failed to insert MSFT");
    let ibm = stocks
        .select(&Select::columns(["qty", "price", "meta"]).filter(Where::eq("symbol", "IBM")))
        .await
        .expect("Failed to select IBM");
    assert_eq!(ibm.len(), 1);
    assert_eq!(ibm[0].labels(), ["qty", "price", "meta"]);
    assert_eq!(ibm[0]["qty"], Value::Integer(1000));
    assert_eq!(ibm[0]["price"], Value::Real(45.0));
    assert_eq!(ibm[0]["meta"], Value::Null);

    // Ordering and limit
    let cheapest = stocks
        .select(&Select::columns(["symbol"]).order_by("price").limit(2))
        .await
        .expect("Failed to select the cheapest stocks");
    assert_eq!(
        cheapest
            .iter()
            .map(|v| v["symbol"].clone())
            .collect::<Vec<_>>(),
        [Value::from("RHAT"), Value::from("IBM")]
    );
    let expensive = stocks
        .select(&Select::columns(["symbol"]).order_by_desc("price").limit(1))
        .await
        .expect("Failed to select the most expensive stock");
    assert_eq!(expensive[0]["symbol"], Value::from("MSFT"));
    let large = stocks
        .select(&Select::all().filter(Where::new().and("qty", ">=", 1000)))
        .await
        .expect("Failed to select the large positions");
    assert_eq!(large.len(), 2);

    // Update is idempotent
    let filter = Where::eq("symbol", "RHAT");
    stocks
        .update(values! {"price" => 40.5, "qty" => 120}, &filter, false)
        .await
        .expect("Failed to update RHAT");
    let once = stocks
        .select(&Select::all().filter(filter.clone()))
        .await
        .expect("Failed to select RHAT after the first update");
    stocks
        .update(values! {"price" => 40.5, "qty" => 120}, &filter, false)
        .await
        .expect("Failed to update RHAT again");
    let twice = stocks
        .select(&Select::all().filter(filter.clone()))
        .await
        .expect("Failed to select RHAT after the second update");
    assert_eq!(once, twice);
    assert_eq!(twice[0]["price"], Value::Real(40.5));
    assert_eq!(twice[0]["qty"], Value::Integer(120));

    // Lazy rows
    let mut rows = pin!(stocks.rows());
    let first = rows
        .next()
        .await
        .expect("The stocks table should not be empty")
        .expect("Failed to read the first stock");
    assert!(first.contains("symbol"));
    let symbols = stocks
        .rows()
        .map_ok(|v| v["symbol"].as_str().unwrap_or_default().to_string())
        .try_collect::<BTreeSet<_>>()
        .await
        .expect("Failed to read the stocks");
    assert_eq!(symbols, BTreeSet::from(["IBM".into(), "MSFT".into(), "RHAT".into()]));

    // Delete removes exactly the matching rows
    let result = stocks
        .delete(&Where::eq("symbol", "IBM"), false)
        .await
        .expect("Failed to delete IBM");
    assert_eq!(result.rows_affected, 1);
    let remaining = stocks
        .select(&Select::columns(["symbol"]).order_by("symbol"))
        .await
        .expect("Failed to select the remaining stocks");
    assert_eq!(
        remaining
            .iter()
            .map(|v| v["symbol"].clone())
            .collect::<Vec<_>>(),
        [Value::from("MSFT"), Value::from("RHAT")]
    );
    let result = stocks
        .delete(&Where::eq("symbol", "IBM"), false)
        .await
        .expect("Failed to delete IBM again");
    assert_eq!(result.rows_affected, 0);
}
