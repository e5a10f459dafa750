use tabula_core::{Engine, SqlWriter, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    fn write_list_tables(&self, out: &mut String) {
        out.push_str("SELECT name, sql FROM sqlite_master WHERE type = 'table';");
    }

    fn write_table_exists(&self, out: &mut String, params: &mut Vec<Value>, table: &str) {
        out.push_str("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ");
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

#[cfg(test)]
mod tests {
    use super::SqliteSqlWriter;
    use tabula_core::{AbstractType, SqlWriter, Table, Value};

    #[test]
    fn introspection() {
        let writer = SqliteSqlWriter {};
        let mut out = String::new();
        let mut params = Vec::new();
        writer.write_table_exists(&mut out, &mut params, "stocks");
        assert_eq!(
            out,
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?;"
        );
        assert_eq!(params, [Value::Text("stocks".into())]);
        assert!(writer.is_system_table("sqlite_sequence"));
        assert!(!writer.is_system_table("stocks"));
    }

    #[test]
    fn create_table() {
        let writer = SqliteSqlWriter {};
        let table = Table::builder("kv")
            .column("key", AbstractType::Text, "PRIMARY KEY")
            .column("val", AbstractType::Boolean, "")
            .build()
            .unwrap();
        let mut out = String::new();
        writer.write_create_table(&mut out, &table, true);
        assert_eq!(
            out,
            "CREATE TABLE IF NOT EXISTS \"kv\" (\n\"key\" VARCHAR(36) PRIMARY KEY,\n\"val\" BOOLEAN\n);"
        );
    }
}
