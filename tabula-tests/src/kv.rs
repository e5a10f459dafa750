use tabula::{
    AbstractType, Database, Driver, Entry, Error, Record, Table, Value, serde_json::json,
};

pub async fn kv<D: Driver>(database: &mut Database<D>) {
    // Setup
    database
        .drop_table("kv", true)
        .await
        .expect("Failed to drop the kv table");
    database
        .create_table(
            Table::builder("kv")
                .column("key", AbstractType::Text, "PRIMARY KEY")
                .column("val", AbstractType::Text, "")
                .build()
                .expect("Failed to declare the kv table"),
        )
        .await
        .expect("Failed to create the kv table");
    let kv = database.table("kv").expect("Unknown table kv");

    // Two column shorthand
    assert_eq!(kv.get("k1").await.expect("Failed to get k1"), None);
    assert!(!kv.contains("k1").await.expect("Failed to look up k1"));
    kv.set("k1", "v1").await.expect("Failed to set k1");
    assert_eq!(
        kv.get("k1").await.expect("Failed to get k1"),
        Some(Entry::Value(Value::from("v1")))
    );
    kv.set("k1", "v2").await.expect("Failed to overwrite k1");
    assert_eq!(
        kv.get("k1").await.expect("Failed to get k1"),
        Some(Entry::Value(Value::from("v2")))
    );
    assert!(kv.contains("k1").await.expect("Failed to look up k1"));

    // Structured values are stored as json text
    let settings: Record = [("theme", Value::from("dark")), ("size", 12.into())]
        .into_iter()
        .collect();
    kv.set("settings", settings).await.expect("Failed to set settings");
    assert_eq!(
        kv.get("settings").await.expect("Failed to get settings"),
        Some(Entry::Value(Value::Json(json!({"theme": "dark", "size": 12}))))
    );
    kv.set("list", json!([1, 2, 3]))
        .await
        .expect("Failed to set list");
    assert_eq!(
        kv.get("list")
            .await
            .expect("Failed to get list")
            .and_then(|v| v.as_value().cloned()),
        Some(Value::Json(json!([1, 2, 3])))
    );

    // Wider tables hand back whole records
    let employees = database.table("employees").expect("Unknown employees");
    let Some(Entry::Record(alice)) = employees.get(1).await.expect("Failed to get employee 1")
    else {
        panic!("Employee 1 should be a record");
    };
    assert_eq!(alice["name"], Value::from("Alice"));
    let frank: Record = [("name", Value::from("Frank")), ("active", false.into())]
        .into_iter()
        .collect();
    employees
        .set(100, frank)
        .await
        .expect("Failed to set employee 100");
    let Some(Entry::Record(frank)) = employees.get(100).await.expect("Failed to get employee 100")
    else {
        panic!("Employee 100 should be a record");
    };
    assert_eq!(frank["id"], Value::Integer(100));
    assert_eq!(frank["active"], Value::Boolean(false));
    let error = employees
        .set(100, "Frank")
        .await
        .expect_err("Bare values fit only key and value tables");
    assert!(matches!(error, Error::InvalidInput { .. }), "{error:?}");
    let departments = database.table("departments").expect("Unknown departments");
    assert_eq!(
        departments.get(2).await.expect("Failed to get department 2"),
        Some(Entry::Value(Value::from("IT")))
    );
}
