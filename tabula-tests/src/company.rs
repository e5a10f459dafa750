use crate::auto_increment_key;
use tabula::{
    AbstractType, Database, Driver, Error, Join, Select, SqlWriter, Table, Value, Where, values,
};

async fn setup<D: Driver>(database: &mut Database<D>) {
    for table in ["employees", "positions", "departments"] {
        database
            .drop_table(table, true)
            .await
            .unwrap_or_else(|e| panic!("Failed to drop the {table} table: {e:#}"));
    }
    let auto_increment = auto_increment_key(database);
    let tables = [
        Table::builder("departments")
            .column("id", AbstractType::Integer, "PRIMARY KEY")
            .column("name", AbstractType::Text, "NOT NULL")
            .build(),
        Table::builder("positions")
            .column("id", AbstractType::Integer, "PRIMARY KEY")
            .column("name", AbstractType::Text, "NOT NULL")
            .column("department_id", AbstractType::Integer, "NOT NULL")
            .foreign_key("department_id", "departments", "id", "ON DELETE CASCADE")
            .build(),
        Table::builder("employees")
            .column("id", AbstractType::Integer, auto_increment)
            .column("name", AbstractType::Text, "NOT NULL")
            .column("active", AbstractType::Boolean, "")
            .column("position_id", AbstractType::Integer, "")
            .foreign_key("position_id", "positions", "id", "")
            .build(),
    ];
    for table in tables {
        database
            .create_table(table.expect("Failed to declare the company tables"))
            .await
            .expect("Failed to create the company tables");
    }
    assert_eq!(
        database.pre_exec_statements(),
        database
            .sql_writer()
            .foreign_keys_pragma()
            .map(str::to_string)
            .as_slice()
    );

    let departments = database.table("departments").expect("Unknown departments");
    for (id, name) in [(1, "HR"), (2, "IT")] {
        departments
            .insert(values! {"id" => id, "name" => name})
            .await
            .expect("Failed to insert a department");
    }
    let positions = database.table("positions").expect("Unknown positions");
    for (id, name, department) in [
        (1, "Manager", 1),
        (2, "Manager", 2),
        (3, "Director", 1),
        (4, "Assistant Director", 2),
    ] {
        positions
            .insert(values! {"id" => id, "name" => name, "department_id" => department})
            .await
            .expect("Failed to insert a position");
    }
    let employees = database.table("employees").expect("Unknown employees");
    for (name, active, position) in [
        ("Alice", true, 1),
        ("Bob", false, 1),
        ("Carol", true, 2),
        ("Dave", true, 3),
    ] {
        let result = employees
            .insert(values! {"name" => name, "active" => active, "position_id" => position})
            .await
            .expect("Failed to insert an employee");
        assert_eq!(result.rows_affected, 1);
        assert!(result.last_affected_id.is_some());
    }
}

pub async fn company<D: Driver>(database: &mut Database<D>) {
    setup(database).await;
    let employees = database.table("employees").expect("Unknown employees");

    // Three way join
    let join = Join::on("positions", "employees.position_id", "positions.id").join(
        "departments",
        "positions.department_id",
        "departments.id",
    );
    let managers = employees
        .select(
            &Select::all()
                .join(join.clone())
                .filter(
                    Where::eq("departments.name", "HR").and_eq("positions.name", "Manager"),
                )
                .order_by("employees.name"),
        )
        .await
        .expect("Failed to select the HR managers");
    assert_eq!(managers.len(), 2);
    assert_eq!(
        managers[0].labels(),
        [
            "employees.id",
            "employees.name",
            "employees.active",
            "employees.position_id",
            "positions.name",
            "positions.department_id",
            "departments.name",
        ]
    );
    assert_eq!(managers[0]["employees.name"], Value::from("Alice"));
    assert_eq!(managers[0]["employees.active"], Value::Boolean(true));
    assert_eq!(managers[1]["employees.name"], Value::from("Bob"));
    assert_eq!(managers[1]["employees.active"], Value::Boolean(false));
    assert_eq!(managers[1]["departments.name"], Value::from("HR"));

    // Selected columns keep the labels they were asked with
    let names = employees
        .select(
            &Select::columns(["employees.name", "departments.name"])
                .join(join)
                .filter(Where::eq("departments.name", "IT")),
        )
        .await
        .expect("Failed to select the IT employees");
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].labels(), ["employees.name", "departments.name"]);
    assert_eq!(names[0]["employees.name"], Value::from("Carol"));

    // Foreign key join
    let directors = employees
        .select(
            &Select::columns(["employees.name"])
                .join(Join::foreign_key("positions"))
                .filter(Where::eq("positions.name", "Director")),
        )
        .await
        .expect("Failed to select the directors");
    assert_eq!(directors.len(), 1);
    assert_eq!(directors[0]["employees.name"], Value::from("Dave"));

    // Foreign key join followed by an explicit one, ordered on a joined column
    let staff = employees
        .select(
            &Select::columns(["employees.name", "positions.name"])
                .join(Join::foreign_key("positions").join(
                    "departments",
                    "positions.department_id",
                    "departments.id",
                ))
                .filter(Where::eq("departments.name", "HR"))
                .order_by_desc("positions.name"),
        )
        .await
        .expect("Failed to select the HR staff");
    assert_eq!(staff.len(), 3);
    assert_eq!(staff[0]["positions.name"], Value::from("Manager"));
    assert_eq!(staff[2]["positions.name"], Value::from("Director"));
    assert_eq!(staff[2]["employees.name"], Value::from("Dave"));

    // Join errors
    let error = employees
        .select(&Select::all().join(Join::foreign_key("departments")))
        .await
        .expect_err("Employees have no foreign key to departments");
    assert!(matches!(error, Error::JoinResolution { .. }), "{error:?}");
    let error = employees
        .select(&Select::all().join(Join::on("projects", "employees.id", "projects.id")))
        .await
        .expect_err("Projects do not exist");
    assert!(matches!(error, Error::UnknownTable(..)), "{error:?}");
}

pub async fn operators<D: Driver>(database: &mut Database<D>) {
    let positions = database.table("positions").expect("Unknown positions");
    let employees = database.table("employees").expect("Unknown employees");

    // Like
    let prefixed = positions
        .select(&Select::columns(["name"]).filter(Where::new().and("name", "like", "Dir*")))
        .await
        .expect("Failed to select with like");
    assert_eq!(prefixed.len(), 1);
    assert_eq!(prefixed[0]["name"], Value::from("Director"));
    let containing = positions
        .select(&Select::columns(["name"]).filter(Where::new().and("name", "LIKE", "Director")))
        .await
        .expect("Failed to select with like");
    assert_eq!(containing.len(), 2);
    let others = positions
        .select(&Select::columns(["name"]).filter(Where::new().and("name", "not like", "*Manager")))
        .await
        .expect("Failed to select with not like");
    assert_eq!(others.len(), 2);

    // In and not in
    let names = |records: Vec<tabula::Record>| {
        records
            .into_iter()
            .map(|v| v["name"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>()
    };
    let selected = employees
        .select(
            &Select::columns(["name"])
                .filter(Where::new().and("name", "not in", ["Alice", "Bob"]))
                .order_by("name"),
        )
        .await
        .expect("Failed to select with not in");
    assert_eq!(names(selected), ["Carol", "Dave"]);
    let selected = employees
        .select(
            &Select::columns(["name"])
                .filter(Where::new().and("position_id", "in", [1, 3]))
                .order_by_desc("name"),
        )
        .await
        .expect("Failed to select with in");
    assert_eq!(names(selected), ["Dave", "Bob", "Alice"]);
    let selected = employees
        .select(&Select::all().filter(Where::new().and("name", "in", Vec::<Value>::new())))
        .await
        .expect("Failed to select with an empty in");
    assert!(selected.is_empty());
    let selected = employees
        .select(&Select::all().filter(Where::new().and("name", "not in", Vec::<Value>::new())))
        .await
        .expect("Failed to select with an empty not in");
    assert_eq!(selected.len(), 4);

    // Comparisons, null checks and column operands
    let selected = employees
        .select(
            &Select::columns(["name"])
                .filter(Where::new().and("position_id", ">", 1).and("active", "==", true))
                .order_by("name"),
        )
        .await
        .expect("Failed to select with comparisons");
    assert_eq!(names(selected), ["Carol", "Dave"]);
    employees
        .insert(values! {"name" => "Eve"})
        .await
        .expect("Failed to insert an employee without position");
    let selected = employees
        .select(&Select::columns(["name"]).filter(Where::eq("position_id", Value::Null)))
        .await
        .expect("Failed to select with is null");
    assert_eq!(names(selected), ["Eve"]);
    let selected = employees
        .select(&Select::columns(["name"]).filter(Where::new().and("position_id", "!=", Value::Null)))
        .await
        .expect("Failed to select with is not null");
    assert_eq!(selected.len(), 4);
    let selected = employees
        .select(
            &Select::columns(["name"])
                .filter(Where::new().and_column("id", ">", "position_id"))
                .order_by("name"),
        )
        .await
        .expect("Failed to select comparing two columns");
    assert_eq!(names(selected), ["Bob", "Carol", "Dave"]);

    // Validation errors
    let error = employees
        .select(&Select::all().filter(Where::new().and("name", "~", "A")))
        .await
        .expect_err("The operator is not supported");
    assert!(matches!(error, Error::InvalidInput { .. }), "{error:?}");
    let error = employees
        .select(&Select::all().filter(Where::eq("salary", 10)))
        .await
        .expect_err("Employees have no salary");
    assert!(matches!(error, Error::UnknownColumn { .. }), "{error:?}");
    let error = employees
        .select(&Select::all().filter(Where::new().and("name", "in", "Alice")))
        .await
        .expect_err("In requires a list");
    assert!(matches!(error, Error::InvalidInput { .. }), "{error:?}");
    let error = employees
        .select(&Select::all().filter(Where::eq("position_id", "manager")))
        .await
        .expect_err("Text is not an integer");
    assert!(matches!(error, Error::TypeCoercion { .. }), "{error:?}");
}
