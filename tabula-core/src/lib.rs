mod column;
mod compiler;
mod condition;
mod config;
mod connection;
mod database;
mod driver;
mod error;
mod join;
mod query;
mod record;
mod schema_parser;
mod select;
mod sql_writer;
mod table;
mod type_translator;
mod util;
mod value;

pub use ::anyhow::Context;
pub use column::*;
pub use compiler::*;
pub use condition::*;
pub use config::*;
pub use connection::*;
pub use database::*;
pub use driver::*;
pub use error::*;
pub use join::*;
pub use query::*;
pub use record::*;
pub use schema_parser::*;
pub use select::*;
pub use sql_writer::*;
pub use table::*;
pub use type_translator::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;
pub use ::indoc;
pub use ::serde_json;
