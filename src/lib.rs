//! Schema-aware table layer.
//!
//! Declare tables with [`Table::builder`] or load the ones the engine already has, then select,
//! insert, update and delete rows through [`Database::table`] without writing sql. Drivers live
//! in their own crates (`tabula-sqlite`, `tabula-mysql`).
//!
//! ```no_run
//! use tabula::{AbstractType, Config, Database, Driver, Result, Select, Table, Where, values};
//!
//! async fn example<D: Driver>(driver: D) -> Result<()> {
//!     let mut database = Database::open(driver, Config::from_env()?).await?;
//!     database
//!         .create_table(
//!             Table::builder("stocks")
//!                 .column("symbol", AbstractType::Text, "PRIMARY KEY")
//!                 .column("qty", AbstractType::Integer, "NOT NULL")
//!                 .build()?,
//!         )
//!         .await?;
//!     let stocks = database.table("stocks")?;
//!     stocks.insert(values! {"symbol" => "RHAT", "qty" => 100}).await?;
//!     let rows = stocks
//!         .select(&Select::all().filter(Where::eq("symbol", "RHAT")))
//!         .await?;
//!     assert_eq!(rows[0]["qty"].as_i64(), Some(100));
//!     Ok(())
//! }
//! ```

pub use tabula_core::*;
