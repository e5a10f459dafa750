use tabula_core::{Engine, SqlWriter, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlSqlWriter {}

impl SqlWriter for MySqlSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn engine(&self) -> Engine {
        Engine::MySql
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(out, value, '`', "``");
        out.push('`');
    }

    fn write_insert_default_values(&self, out: &mut String, table: &str) {
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, table);
        out.push_str(" () VALUES ();");
    }

    fn write_list_tables(&self, out: &mut String) {
        out.push_str("SHOW TABLES;");
    }

    fn write_show_create_table(&self, out: &mut String, table: &str) -> bool {
        out.push_str("SHOW CREATE TABLE ");
        self.write_identifier_quoted(out, table);
        out.push(';');
        true
    }

    fn write_table_exists(&self, out: &mut String, params: &mut Vec<Value>, table: &str) {
        out.push_str(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ",
        );
        self.write_placeholder(out, params, table.into());
        out.push(';');
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("START TRANSACTION;");
    }
}
