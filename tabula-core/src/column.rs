use crate::AbstractType;
use std::fmt::{self, Display};

/// A column as known to the table catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModel {
    pub name: String,
    pub column_type: AbstractType,
    /// Trailing DDL text after the type, for example `NOT NULL PRIMARY KEY`.
    pub modifiers: String,
}

impl ColumnModel {
    pub fn new(
        name: impl Into<String>,
        column_type: AbstractType,
        modifiers: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            modifiers: modifiers.into().trim().to_string(),
        }
    }
    fn has_modifier(&self, words: &[&str]) -> bool {
        let upper = self.modifiers.to_ascii_uppercase();
        let tokens: Vec<_> = upper.split_whitespace().collect();
        tokens.windows(words.len()).any(|w| w == words)
    }
    pub fn is_not_null(&self) -> bool {
        self.has_modifier(&["NOT", "NULL"])
    }
    pub fn is_auto_increment(&self) -> bool {
        let upper = self.modifiers.to_ascii_uppercase();
        upper.contains("INCREMENT")
    }
    /// Value must be provided on insert.
    pub fn is_required(&self) -> bool {
        self.is_not_null() && !self.is_auto_increment()
    }
    pub fn is_primary_key_modifier(&self) -> bool {
        self.has_modifier(&["PRIMARY", "KEY"])
    }
}

/// Relationship between a local column and a column of another table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub local_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// Referential actions, for example `ON DELETE CASCADE`.
    pub modifiers: String,
}

/// Column name, optionally qualified with its table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    pub table: String,
    pub name: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
        }
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}
