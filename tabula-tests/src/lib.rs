mod company;
mod failures;
mod kv;
mod schema;
mod stocks;

use crate::{
    company::{company, operators},
    failures::failures,
    kv::kv,
    schema::schema_reload,
    stocks::stocks,
};
use log::LevelFilter;
use std::{borrow::Cow, env};
use tabula::{Config, Database, Driver, Engine, SqlWriter};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Open the database at `url` and run every scenario against it.
pub async fn execute_tests<D: Driver>(driver: D, url: impl Into<Cow<'static, str>>) {
    let mut database = Database::open(driver, Config::new(url))
        .await
        .expect("Could not open the database");
    stocks(&mut database).await;
    company(&mut database).await;
    operators(&mut database).await;
    kv(&mut database).await;
    schema_reload(&mut database).await;
    failures(&mut database).await;
}

/// Modifiers of an integer primary key assigned by the engine.
pub(crate) fn auto_increment_key<D: Driver>(database: &Database<D>) -> &'static str {
    match database.sql_writer().engine() {
        Engine::Sqlite => "PRIMARY KEY AUTOINCREMENT",
        Engine::MySql => "PRIMARY KEY AUTO_INCREMENT",
    }
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
