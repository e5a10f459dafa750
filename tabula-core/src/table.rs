use crate::{AbstractType, ColumnModel, Error, ForeignKey, Result};
use std::collections::BTreeMap;

/// Schema of one table: ordered columns, primary key and outgoing foreign keys.
///
/// A table is immutable once built, the column set is fixed for its whole life.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<ColumnModel>,
    primary_key: Option<String>,
    foreign_keys: BTreeMap<String, ForeignKey>,
}

impl Table {
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnModel] {
        &self.columns
    }
    pub fn column(&self, name: &str) -> Option<&ColumnModel> {
        self.columns.iter().find(|v| v.name == name)
    }
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
    /// The primary key column. A declared key naming a missing column counts as no key.
    pub fn primary_key(&self) -> Option<&ColumnModel> {
        self.primary_key.as_deref().and_then(|v| self.column(v))
    }
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key().is_some_and(|v| v.name == column)
    }
    /// Foreign keys indexed by local column name.
    pub fn foreign_keys(&self) -> &BTreeMap<String, ForeignKey> {
        &self.foreign_keys
    }
    /// The non key column of a table made of a primary key and exactly one other column.
    pub fn value_column(&self) -> Option<&ColumnModel> {
        let pk = self.primary_key()?;
        if self.columns.len() != 2 {
            return None;
        }
        self.columns.iter().find(|v| v.name != pk.name)
    }
    /// Whether the primary key is declared through a column modifier rather than a table constraint.
    pub fn primary_key_inline(&self) -> bool {
        self.primary_key()
            .is_some_and(ColumnModel::is_primary_key_modifier)
    }
}

pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnModel>,
    primary_key: Option<String>,
    foreign_keys: Vec<ForeignKey>,
}

impl TableBuilder {
    pub fn column(
        mut self,
        name: impl Into<String>,
        column_type: AbstractType,
        modifiers: impl Into<String>,
    ) -> Self {
        self.columns
            .push(ColumnModel::new(name, column_type, modifiers));
        self
    }
    /// Declare the primary key as a table level constraint.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }
    pub fn foreign_key(
        mut self,
        local_column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
        modifiers: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            local_column: local_column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            modifiers: modifiers.into().trim().to_string(),
        });
        self
    }
    pub fn build(self) -> Result<Table> {
        for (i, column) in self.columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(Error::invalid_input(
                    "",
                    format!("a column name in table `{}`", self.name),
                ));
            }
            if self.columns[..i].iter().any(|v| v.name == column.name) {
                return Err(Error::invalid_input(
                    &column.name,
                    format!("unique column names in table `{}`", self.name),
                ));
            }
        }
        let mut keys = self
            .columns
            .iter()
            .filter(|v| v.is_primary_key_modifier())
            .map(|v| v.name.clone())
            .collect::<Vec<_>>();
        if let Some(pk) = self.primary_key {
            if !keys.contains(&pk) {
                keys.push(pk);
            }
        }
        if keys.len() > 1 {
            return Err(Error::AmbiguousPrimaryKey {
                table: self.name,
                columns: keys,
            });
        }
        let mut foreign_keys = BTreeMap::new();
        for fk in self.foreign_keys {
            if !self.columns.iter().any(|v| v.name == fk.local_column) {
                return Err(Error::unknown_column(self.name, fk.local_column));
            }
            foreign_keys.insert(fk.local_column.clone(), fk);
        }
        Ok(Table {
            name: self.name,
            columns: self.columns,
            primary_key: keys.pop(),
            foreign_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_table() {
        let table = Table::builder("stocks")
            .column("id", AbstractType::Integer, "PRIMARY KEY AUTOINCREMENT")
            .column("symbol", AbstractType::Text, "NOT NULL")
            .column("qty", AbstractType::Real, "")
            .build()
            .unwrap();
        assert_eq!(table.name(), "stocks");
        assert_eq!(
            table.columns().iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
            ["id", "symbol", "qty"]
        );
        assert_eq!(table.primary_key().unwrap().name, "id");
        assert!(table.primary_key_inline());
        assert!(table.value_column().is_none());
    }

    #[test]
    fn two_columns() {
        let table = Table::builder("kv")
            .column("key", AbstractType::Text, "NOT NULL")
            .column("val", AbstractType::Text, "")
            .primary_key("key")
            .build()
            .unwrap();
        assert!(!table.primary_key_inline());
        assert_eq!(table.value_column().unwrap().name, "val");
    }

    #[test]
    fn missing_primary_key_is_unset() {
        let table = Table::builder("t")
            .column("a", AbstractType::Integer, "")
            .primary_key("b")
            .build()
            .unwrap();
        assert!(table.primary_key().is_none());
    }

    #[test]
    fn rejected() {
        assert!(matches!(
            Table::builder("t")
                .column("a", AbstractType::Integer, "")
                .column("a", AbstractType::Text, "")
                .build(),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            Table::builder("t")
                .column("a", AbstractType::Integer, "PRIMARY KEY")
                .column("b", AbstractType::Integer, "primary key")
                .build(),
            Err(Error::AmbiguousPrimaryKey { .. })
        ));
        assert!(matches!(
            Table::builder("t")
                .column("a", AbstractType::Integer, "")
                .foreign_key("b", "other", "id", "")
                .build(),
            Err(Error::UnknownColumn { .. })
        ));
    }
}
