use crate::{
    ColumnModel, ColumnRef, Engine, Filter, Order, Predicate, Projected, ResolvedJoin, Rhs, Table,
    TypeTranslator, Value, separated_by,
};
use std::fmt::Write;

/// Dialect printer. Values never end up in the sql text, they are pushed to `params` and
/// replaced by a placeholder.
pub trait SqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter;

    fn engine(&self) -> Engine;

    fn translator(&self) -> TypeTranslator {
        TypeTranslator::new(self.engine())
    }

    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    fn write_column_ref(&self, out: &mut String, value: &ColumnRef, qualify: bool) {
        if qualify && !value.table.is_empty() {
            self.write_identifier_quoted(out, &value.table);
            out.push('.');
        }
        self.write_identifier_quoted(out, &value.name);
    }

    fn write_placeholder(&self, out: &mut String, params: &mut Vec<Value>, value: Value) {
        out.push('?');
        params.push(value);
    }

    fn write_create_table(&self, out: &mut String, table: &Table, if_not_exists: bool) {
        out.push_str("CREATE TABLE ");
        if if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        self.write_identifier_quoted(out, table.name());
        out.push_str(" (\n");
        separated_by(
            out,
            table.columns(),
            |out, v| self.write_create_table_column_fragment(out, table, v),
            ",\n",
        );
        if let Some(pk) = table.primary_key().filter(|_| !table.primary_key_inline()) {
            out.push_str(",\nPRIMARY KEY (");
            self.write_identifier_quoted(out, &pk.name);
            out.push(')');
        }
        for fk in table.foreign_keys().values() {
            out.push_str(",\nFOREIGN KEY (");
            self.write_identifier_quoted(out, &fk.local_column);
            out.push_str(") REFERENCES ");
            self.write_identifier_quoted(out, &fk.referenced_table);
            out.push('(');
            self.write_identifier_quoted(out, &fk.referenced_column);
            out.push(')');
            if !fk.modifiers.is_empty() {
                out.push(' ');
                out.push_str(&fk.modifiers);
            }
        }
        out.push_str("\n);");
    }

    fn write_create_table_column_fragment(&self, out: &mut String, table: &Table, column: &ColumnModel) {
        self.write_identifier_quoted(out, &column.name);
        out.push(' ');
        out.push_str(
            self.translator()
                .to_engine_keyword(column.column_type, table.is_primary_key(&column.name)),
        );
        if !column.modifiers.is_empty() {
            out.push(' ');
            out.push_str(&column.modifiers);
        }
    }

    fn write_drop_table(&self, out: &mut String, name: &str, if_exists: bool) {
        out.push_str("DROP TABLE ");
        if if_exists {
            out.push_str("IF EXISTS ");
        }
        self.write_identifier_quoted(out, name);
        out.push(';');
    }

    fn write_join(&self, out: &mut String, join: &ResolvedJoin) {
        for clause in &join.clauses {
            out.push_str("\nJOIN ");
            self.write_identifier_quoted(out, &clause.table);
            out.push_str(" ON ");
            separated_by(
                out,
                &clause.on,
                |out, (left, right)| {
                    self.write_column_ref(out, left, true);
                    out.push_str(" = ");
                    self.write_column_ref(out, right, true);
                },
                " AND ",
            );
        }
    }

    fn write_predicate(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        predicate: &Predicate,
        qualify: bool,
    ) {
        match predicate {
            Predicate::IsNull { column, negated } => {
                self.write_column_ref(out, column, qualify);
                out.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Predicate::Compare {
                column,
                operator,
                rhs,
            } => {
                self.write_column_ref(out, column, qualify);
                let _ = write!(out, " {} ", operator.sql());
                match rhs {
                    Rhs::Param(value) => self.write_placeholder(out, params, value.clone()),
                    Rhs::Column(column) => self.write_column_ref(out, column, qualify),
                    Rhs::RawColumn(name) => self.write_identifier_quoted(out, name),
                    Rhs::List(values) => {
                        out.push('(');
                        separated_by(
                            out,
                            values,
                            |out, v| self.write_placeholder(out, params, v.clone()),
                            ", ",
                        );
                        out.push(')');
                    }
                }
            }
            Predicate::Constant(value) => {
                out.push_str(if *value { "1 = 1" } else { "1 = 0" });
            }
        }
    }

    fn write_filter(&self, out: &mut String, params: &mut Vec<Value>, filter: &Filter, qualify: bool) {
        if filter.is_empty() {
            return;
        }
        out.push_str("\nWHERE ");
        separated_by(
            out,
            &filter.predicates,
            |out, v| self.write_predicate(out, params, v, qualify),
            " AND ",
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn write_select(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        table: &str,
        projection: &[Projected],
        join: &ResolvedJoin,
        filter: &Filter,
        order_by: Option<(&ColumnRef, Order)>,
        limit: Option<u32>,
    ) {
        let qualify = !join.is_empty();
        out.push_str("SELECT ");
        separated_by(
            out,
            projection,
            |out, v| self.write_column_ref(out, &v.column, qualify),
            ", ",
        );
        out.push_str("\nFROM ");
        self.write_identifier_quoted(out, table);
        self.write_join(out, join);
        self.write_filter(out, params, filter, qualify);
        if let Some((column, order)) = order_by {
            out.push_str("\nORDER BY ");
            self.write_column_ref(out, column, qualify);
            out.push_str(match order {
                Order::Asc => " ASC",
                Order::Desc => " DESC",
            });
        }
        if let Some(limit) = limit {
            let _ = write!(out, "\nLIMIT {}", limit);
        }
        out.push(';');
    }

    fn write_insert(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        table: &str,
        values: &[(String, Value)],
    ) {
        if values.is_empty() {
            self.write_insert_default_values(out, table);
            return;
        }
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, table);
        out.push_str(" (");
        separated_by(
            out,
            values,
            |out, (k, _)| self.write_identifier_quoted(out, k),
            ", ",
        );
        out.push_str(") VALUES (");
        separated_by(
            out,
            values,
            |out, (_, v)| self.write_placeholder(out, params, v.clone()),
            ", ",
        );
        out.push_str(");");
    }

    fn write_insert_default_values(&self, out: &mut String, table: &str) {
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, table);
        out.push_str(" DEFAULT VALUES;");
    }

    fn write_update(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        table: &str,
        values: &[(String, Value)],
        filter: &Filter,
    ) {
        out.push_str("UPDATE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" SET ");
        separated_by(
            out,
            values,
            |out, (k, v)| {
                self.write_identifier_quoted(out, k);
                out.push_str(" = ");
                self.write_placeholder(out, params, v.clone());
            },
            ", ",
        );
        self.write_filter(out, params, filter, false);
        out.push(';');
    }

    fn write_delete(&self, out: &mut String, params: &mut Vec<Value>, table: &str, filter: &Filter) {
        out.push_str("DELETE FROM ");
        self.write_identifier_quoted(out, table);
        self.write_filter(out, params, filter, false);
        out.push(';');
    }

    /// Query listing the user tables, one row per table with the name first.
    fn write_list_tables(&self, out: &mut String) {
        out.push_str("SELECT table_name FROM information_schema.tables;");
    }

    /// Query returning the definition of one table as the second column. Returns `false`
    /// when the rows of `write_list_tables` already carry the definition.
    fn write_show_create_table(&self, _out: &mut String, _table: &str) -> bool {
        false
    }

    /// Query returning one row when the table exists.
    fn write_table_exists(&self, out: &mut String, params: &mut Vec<Value>, table: &str) {
        out.push_str("SELECT table_name FROM information_schema.tables WHERE table_name = ");
        self.write_placeholder(out, params, table.into());
        out.push(';');
    }

    fn is_system_table(&self, _name: &str) -> bool {
        false
    }

    /// Statement enabling foreign key enforcement for the session, when the engine needs one.
    fn foreign_keys_pragma(&self) -> Option<&'static str> {
        None
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN;");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }
}

/// Writer with the default (ANSI) behavior for the given engine's column types.
pub struct GenericSqlWriter {
    engine: Engine,
}

impl GenericSqlWriter {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
    fn engine(&self) -> Engine {
        self.engine
    }
}
