use crate::silent_logs;
use tabula::{Database, Driver, Error, QueryResult, Select, Value, Where, values};

pub async fn failures<D: Driver>(database: &mut Database<D>) {
    let stocks = database.table("stocks").expect("Unknown stocks");
    let count = async || {
        stocks
            .select(&Select::all())
            .await
            .expect("Failed to count the stocks")
            .len()
    };
    let before = count().await;
    assert_eq!(before, 2);

    // Validation happens before anything runs
    let error = stocks
        .delete(&Where::new(), false)
        .await
        .expect_err("Delete without a filter must be refused");
    assert!(
        matches!(error, Error::MissingWhereClause { operation: "DELETE", .. }),
        "{error:?}"
    );
    let error = stocks
        .update(values! {"qty" => 1}, &Where::new(), false)
        .await
        .expect_err("Update without a filter must be refused");
    assert!(
        matches!(error, Error::MissingWhereClause { operation: "UPDATE", .. }),
        "{error:?}"
    );
    let error = stocks
        .update(Vec::<(String, Value)>::new(), &Where::eq("symbol", "RHAT"), false)
        .await
        .expect_err("Update without values must be refused");
    assert!(matches!(error, Error::InvalidInput { .. }), "{error:?}");
    let error = stocks
        .insert(values! {"symbol" => "ORCL", "date" => "2006-05-01"})
        .await
        .expect_err("Quantity is required");
    assert!(
        matches!(&error, Error::MissingRequiredColumn { column, .. } if column == "qty"),
        "{error:?}"
    );
    let error = stocks
        .insert(values! {"symbol" => "ORCL", "date" => "2006-05-01", "qty" => 1, "owner" => "me"})
        .await
        .expect_err("Owner is not a column");
    assert!(matches!(error, Error::UnknownColumn { .. }), "{error:?}");
    let error = stocks
        .insert(values! {"symbol" => "ORCL", "date" => "2006-05-01", "qty" => "many"})
        .await
        .expect_err("Quantity must be an integer");
    assert!(matches!(error, Error::TypeCoercion { .. }), "{error:?}");
    assert_eq!(count().await, before);

    // Columns of other tables are refused unless joined
    let employees = database.table("employees").expect("Unknown employees");
    let staff = async || {
        employees
            .select(&Select::columns(["name"]).order_by("name"))
            .await
            .expect("Failed to select the employees")
    };
    let staff_before = staff().await;
    let by_position = Where::eq("positions.name", "Manager");
    let error = employees
        .select(&Select::all().filter(by_position.clone()))
        .await
        .expect_err("Positions are not joined");
    assert!(matches!(error, Error::InvalidInput { .. }), "{error:?}");
    let error = employees
        .update(values! {"active" => false}, &by_position, false)
        .await
        .expect_err("Positions are not joined");
    assert!(matches!(error, Error::InvalidInput { .. }), "{error:?}");
    let error = employees
        .delete(&by_position, false)
        .await
        .expect_err("Positions are not joined");
    assert!(matches!(error, Error::InvalidInput { .. }), "{error:?}");
    let error = employees
        .select(&Select::all().order_by("positions.name"))
        .await
        .expect_err("Positions are not joined");
    assert!(matches!(error, Error::InvalidInput { .. }), "{error:?}");
    assert_eq!(staff().await, staff_before);

    // Engine failures are reported and rolled back
    silent_logs! {
        let error = stocks
            .insert(values! {"symbol" => "RHAT", "date" => "2006-01-05", "qty" => 1})
            .await
            .expect_err("Duplicate primary key");
        assert!(matches!(error, Error::Execution(..)), "{error:?}");
        let error = database
            .table("employees")
            .expect("Unknown employees")
            .insert(values! {"name" => "Mallory", "position_id" => 99})
            .await
            .expect_err("Unknown position");
        assert!(matches!(error, Error::Execution(..)), "{error:?}");
        let error = database
            .run("SELECT * FROM missing_table")
            .await
            .expect_err("The table does not exist");
        assert!(matches!(error, Error::Execution(..)), "{error:?}");
    }
    assert_eq!(count().await, before);

    // Raw statements
    let results = database
        .run("SELECT 1 AS one")
        .await
        .expect("Failed to run a raw statement");
    let Some(QueryResult::Row(row)) = results.into_iter().next() else {
        panic!("Expected one row");
    };
    let one = row.get_column("one").expect("Missing column one");
    assert!(
        *one == Value::Integer(1) || one.as_str() == Some("1"),
        "{one:?}"
    );

    // Explicit full table operations
    let result = stocks
        .update(values! {"date" => "2007-01-01"}, &Where::new(), true)
        .await
        .expect("Failed to update every stock");
    assert_eq!(result.rows_affected, 2);
    let result = stocks
        .delete(&Where::new(), true)
        .await
        .expect("Failed to delete every stock");
    assert_eq!(result.rows_affected, 2);
    assert_eq!(count().await, 0);
}
