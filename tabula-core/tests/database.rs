use indoc::indoc;
use std::{
    borrow::Cow,
    future::Future,
    sync::{Arc, Mutex},
};
use tabula_core::{
    AbstractType, Config, Connection, Database, Driver, Engine, Entry, Error, Join, Query,
    QueryResult, RowLabeled, RowsAffected, Select, SqlWriter, Table, Value, Where, stream, values,
};

type Responder = dyn Fn(&Query) -> anyhow::Result<Vec<QueryResult>> + Send + Sync;

#[derive(Clone)]
struct RecordingDriver {
    log: Arc<Mutex<Vec<String>>>,
    responder: Arc<Responder>,
}

impl RecordingDriver {
    fn new(
        responder: impl Fn(&Query) -> anyhow::Result<Vec<QueryResult>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            log: Default::default(),
            responder: Arc::new(responder),
        }
    }
    fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

struct RecordingWriter;

impl SqlWriter for RecordingWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
    fn engine(&self) -> Engine {
        Engine::Sqlite
    }
    fn write_list_tables(&self, out: &mut String) {
        out.push_str("LIST TABLES;");
    }
    fn write_table_exists(&self, out: &mut String, params: &mut Vec<Value>, table: &str) {
        out.push_str("TABLE EXISTS ");
        self.write_placeholder(out, params, table.into());
        out.push(';');
    }
    fn is_system_table(&self, name: &str) -> bool {
        name.starts_with("sqlite_")
    }
    fn foreign_keys_pragma(&self) -> Option<&'static str> {
        Some("PRAGMA foreign_keys = ON;")
    }
}

struct RecordingConnection {
    log: Arc<Mutex<Vec<String>>>,
    responder: Arc<Responder>,
}

impl Connection for RecordingConnection {
    type SqlWriter = RecordingWriter;

    fn sql_writer(&self) -> Self::SqlWriter {
        RecordingWriter
    }

    fn run(
        &mut self,
        query: Query,
    ) -> impl stream::Stream<Item = anyhow::Result<QueryResult>> + Send {
        self.log.lock().unwrap().push(query.to_string());
        let items: Vec<anyhow::Result<QueryResult>> = match (self.responder)(&query) {
            Ok(v) => v.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(items)
    }
}

impl Driver for RecordingDriver {
    type Connection = RecordingConnection;
    type SqlWriter = RecordingWriter;

    const NAME: &'static str = "recording";

    fn sql_writer(&self) -> Self::SqlWriter {
        RecordingWriter
    }

    fn connect(
        &self,
        _url: Cow<'static, str>,
    ) -> impl Future<Output = anyhow::Result<Self::Connection>> + Send {
        let connection = RecordingConnection {
            log: self.log.clone(),
            responder: self.responder.clone(),
        };
        async move { Ok(connection) }
    }
}

fn row(labels: &[&str], values: Vec<Value>) -> QueryResult {
    QueryResult::Row(RowLabeled::new(
        labels.iter().map(|v| v.to_string()).collect(),
        values.into_boxed_slice(),
    ))
}

fn affected(rows_affected: u64) -> QueryResult {
    QueryResult::Affected(RowsAffected {
        rows_affected,
        last_affected_id: None,
    })
}

const POSITIONS: &str = indoc! {r#"
    CREATE TABLE "positions" (
    "id" INTEGER PRIMARY KEY,
    "name" TEXT NOT NULL
    )
"#};

const EMPLOYEES: &str = indoc! {r#"
    CREATE TABLE "employees" (
    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
    "name" TEXT NOT NULL,
    "active" BOOLEAN,
    "position_id" INTEGER,
    FOREIGN KEY ("position_id") REFERENCES "positions"("id")
    )
"#};

const KV: &str = r#"CREATE TABLE "kv" ("key" VARCHAR(36) PRIMARY KEY, "val" TEXT)"#;

fn company_driver() -> RecordingDriver {
    RecordingDriver::new(|query| {
        let sql = query.sql.as_str();
        Ok(if sql.starts_with("LIST TABLES") {
            [
                ("sqlite_sequence", "CREATE TABLE sqlite_sequence(name,seq)"),
                ("positions", POSITIONS),
                ("employees", EMPLOYEES),
                ("kv", KV),
            ]
            .into_iter()
            .map(|(name, ddl)| row(&["name", "sql"], vec![name.into(), ddl.into()]))
            .collect()
        } else if sql.starts_with("SELECT") && sql.contains("\"kv\"") {
            match query.params.first() {
                Some(Value::Text(key)) if key == "k1" => {
                    vec![row(&["key", "val"], vec!["k1".into(), "v1".into()])]
                }
                _ => vec![],
            }
        } else if sql.starts_with("SELECT") && sql.contains("\nJOIN ") {
            vec![]
        } else if sql.starts_with("SELECT") && sql.contains("\"employees\"") {
            vec![row(
                &["id", "name", "active", "position_id"],
                vec![1.into(), "Ann".into(), 1.into(), Value::Null],
            )]
        } else if sql.starts_with("INSERT") || sql.starts_with("UPDATE") || sql.starts_with("DELETE")
        {
            vec![affected(1)]
        } else if sql.starts_with("TABLE EXISTS") {
            match query.params.first() {
                Some(Value::Text(name)) if name == "positions" => {
                    vec![row(&["name"], vec!["positions".into()])]
                }
                _ => vec![],
            }
        } else {
            vec![]
        })
    })
}

async fn open(driver: &RecordingDriver) -> Database<RecordingDriver> {
    Database::open(driver.clone(), Config::new("sqlite://company.sqlite"))
        .await
        .expect("Could not open the database")
}

#[tokio::test]
async fn load_tables() {
    let driver = company_driver();
    let db = open(&driver).await;
    assert_eq!(db.name(), "company.sqlite");
    assert_eq!(
        db.tables().map(Table::name).collect::<Vec<_>>(),
        ["employees", "kv", "positions"]
    );
    assert!(!db.has_table("sqlite_sequence"));
    assert_eq!(db.pre_exec_statements(), ["PRAGMA foreign_keys = ON;"]);
    let employees = db.table("employees").unwrap();
    assert_eq!(employees.primary_key().unwrap().name, "id");
    assert_eq!(
        employees.foreign_keys()["position_id"].referenced_table,
        "positions"
    );
    assert_eq!(
        employees.column("active").unwrap().column_type,
        AbstractType::Boolean
    );
    assert_eq!(driver.take_log(), ["BEGIN;", "LIST TABLES;", "COMMIT;"]);
    assert!(matches!(db.table("missing"), Err(Error::UnknownTable(..))));
}

#[tokio::test]
async fn transaction_boundaries() {
    let driver = company_driver();
    let db = open(&driver).await;
    driver.take_log();
    let employees = db.table("employees").unwrap();
    let result = employees
        .insert(values! { "name" => "Bob", "active" => "true", "position_id" => 2 })
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);
    assert_eq!(
        driver.take_log(),
        [
            "PRAGMA foreign_keys = ON;",
            "BEGIN;",
            r#"INSERT INTO "employees" ("name", "active", "position_id") VALUES (?, ?, ?); ["Bob", true, 2]"#,
            "COMMIT;",
        ]
    );
}

#[tokio::test]
async fn failures_roll_back() {
    let driver = RecordingDriver::new(|query| {
        if query.sql.starts_with("LIST TABLES") {
            Ok(vec![row(&["name", "sql"], vec!["kv".into(), KV.into()])])
        } else if query.sql.starts_with("INSERT") {
            Err(anyhow::anyhow!("UNIQUE constraint failed: kv.key"))
        } else {
            Ok(vec![])
        }
    });
    let db = open(&driver).await;
    assert!(db.pre_exec_statements().is_empty());
    driver.take_log();
    let result = db
        .table("kv")
        .unwrap()
        .insert(values! { "key" => "k1", "val" => "v1" })
        .await;
    let error = match result {
        Err(Error::Execution(error)) => error,
        other => panic!("Expected an execution error, got {other:?}"),
    };
    assert!(format!("{error:#}").contains("UNIQUE constraint failed"));
    let log = driver.take_log();
    assert_eq!(log.first().map(String::as_str), Some("BEGIN;"));
    assert_eq!(log.last().map(String::as_str), Some("ROLLBACK;"));
    assert!(!log.iter().any(|v| v == "COMMIT;"));
}

#[tokio::test]
async fn validation_happens_before_execution() {
    let driver = company_driver();
    let db = open(&driver).await;
    driver.take_log();
    let employees = db.table("employees").unwrap();
    assert!(matches!(
        employees.delete(&Where::new(), false).await,
        Err(Error::MissingWhereClause {
            operation: "DELETE",
            ..
        })
    ));
    assert!(matches!(
        employees
            .update(values! { "name" => "Zed" }, &Where::new(), false)
            .await,
        Err(Error::MissingWhereClause {
            operation: "UPDATE",
            ..
        })
    ));
    assert!(matches!(
        employees
            .update(Vec::<(String, Value)>::new(), &Where::eq("id", 1), false)
            .await,
        Err(Error::InvalidInput { .. })
    ));
    assert!(matches!(
        employees.insert(values! { "active" => true }).await,
        Err(Error::MissingRequiredColumn { .. })
    ));
    assert!(matches!(
        employees.insert(values! { "name" => "A", "salary" => 3 }).await,
        Err(Error::UnknownColumn { .. })
    ));
    assert!(matches!(
        employees
            .insert(values! { "name" => "A", "active" => "maybe" })
            .await,
        Err(Error::TypeCoercion { .. })
    ));
    assert!(driver.take_log().is_empty());
    employees.delete(&Where::new(), true).await.unwrap();
    employees
        .update(values! { "active" => false }, &Where::new(), true)
        .await
        .unwrap();
    let log = driver.take_log();
    assert!(log.iter().any(|v| v == r#"DELETE FROM "employees";"#));
    assert!(
        log.iter()
            .any(|v| v == r#"UPDATE "employees" SET "active" = ?; [false]"#)
    );
}

#[tokio::test]
async fn lenient_policy() {
    let driver = company_driver();
    let db = Database::open(
        driver.clone(),
        Config::new("sqlite://company.sqlite").lenient(),
    )
    .await
    .unwrap();
    driver.take_log();
    db.table("employees")
        .unwrap()
        .insert(values! { "name" => "A", "active" => "maybe" })
        .await
        .unwrap();
    assert!(driver.take_log().iter().any(
        |v| v == r#"INSERT INTO "employees" ("name") VALUES (?); ["A"]"#
    ));
}

#[tokio::test]
async fn select_decodes_rows() {
    let driver = company_driver();
    let db = open(&driver).await;
    let records = db
        .table("employees")
        .unwrap()
        .select(&Select::all().filter(Where::eq("name", "Ann")))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["active"], Value::Boolean(true));
    assert_eq!(records[0]["position_id"], Value::Null);
    assert_eq!(records[0].labels(), ["id", "name", "active", "position_id"]);
}

#[tokio::test]
async fn key_value_access() {
    let driver = company_driver();
    let db = open(&driver).await;
    let kv = db.table("kv").unwrap();
    assert_eq!(kv.get("k1").await.unwrap(), Some(Entry::Value("v1".into())));
    assert_eq!(kv.get("k2").await.unwrap(), None);
    assert!(kv.contains("k1").await.unwrap());
    driver.take_log();
    kv.set("k1", "v2").await.unwrap();
    kv.set("k2", "v3").await.unwrap();
    let log = driver.take_log();
    assert!(log.contains(&r#"UPDATE "kv" SET "val" = ? WHERE "key" = ?; ["v2", "k1"]"#.replace(" WHERE", "\nWHERE")));
    assert!(log.contains(&r#"INSERT INTO "kv" ("val", "key") VALUES (?, ?); ["v3", "k2"]"#.to_string()));
    let employees = db.table("employees").unwrap();
    assert!(matches!(
        employees.set(1, "Manager").await,
        Err(Error::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn create_existing_table() {
    let driver = company_driver();
    let mut db = open(&driver).await;
    driver.take_log();
    let positions = Table::builder("positions")
        .column("id", AbstractType::Integer, "PRIMARY KEY")
        .column("name", AbstractType::Text, "NOT NULL")
        .build()
        .unwrap();
    db.create_table(positions).await.unwrap();
    assert!(
        !driver
            .take_log()
            .iter()
            .any(|v| v.starts_with("CREATE TABLE"))
    );
    let departments = Table::builder("departments")
        .column("id", AbstractType::Integer, "PRIMARY KEY")
        .build()
        .unwrap();
    db.create_table(departments).await.unwrap();
    assert!(db.has_table("departments"));
    assert!(
        driver
            .take_log()
            .iter()
            .any(|v| v.starts_with(r#"CREATE TABLE IF NOT EXISTS "departments""#))
    );
    db.drop_table("departments", true).await.unwrap();
    assert!(!db.has_table("departments"));
}

#[tokio::test]
async fn qualified_columns_need_their_table_joined() {
    let driver = company_driver();
    let db = open(&driver).await;
    driver.take_log();
    let employees = db.table("employees").unwrap();
    let filter = Where::eq("positions.name", "Manager");
    assert!(matches!(
        employees.select(&Select::all().filter(filter.clone())).await,
        Err(Error::InvalidInput { .. })
    ));
    assert!(matches!(
        employees.delete(&filter, false).await,
        Err(Error::InvalidInput { .. })
    ));
    assert!(matches!(
        employees
            .update(values! { "active" => false }, &filter, false)
            .await,
        Err(Error::InvalidInput { .. })
    ));
    assert!(matches!(
        employees
            .select(&Select::all().order_by("positions.name"))
            .await,
        Err(Error::InvalidInput { .. })
    ));
    assert!(driver.take_log().is_empty());

    employees
        .select(&Select::all().order_by("employees.name"))
        .await
        .unwrap();
    employees
        .select(
            &Select::columns(["employees.name", "positions.name"])
                .join(Join::foreign_key("positions"))
                .filter(filter)
                .order_by_desc("positions.name"),
        )
        .await
        .unwrap();
    let log = driver.take_log();
    assert!(log.contains(&indoc! {r#"
        SELECT "id", "name", "active", "position_id"
        FROM "employees"
        ORDER BY "name" ASC;"#}
    .to_string()));
    assert!(log.contains(&indoc! {r#"
        SELECT "employees"."name", "positions"."name"
        FROM "employees"
        JOIN "positions" ON "employees"."position_id" = "positions"."id"
        WHERE "positions"."name" = ?
        ORDER BY "positions"."name" DESC; ["Manager"]"#}
    .to_string()));
}
