use crate::ColumnRef;

/// One joined table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub table: String,
    /// Start from the foreign key toward `table` declared by a table already in the query.
    pub foreign_key: bool,
    /// `(left, right)` pairs, every column `table.column`, ANDed after the foreign key pair.
    pub on: Vec<(String, String)>,
}

/// How a select reaches other tables, joined in order.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub steps: Vec<JoinStep>,
}

impl Join {
    /// Follow the foreign key the selected table declares toward `table`.
    pub fn foreign_key(table: impl Into<String>) -> Self {
        Self::default().join_foreign_key(table)
    }
    /// Start an explicit join with `table ON left = right`.
    pub fn on(table: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::default().join(table, left, right)
    }
    /// Join one more table on a column pair.
    pub fn join(
        mut self,
        table: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.steps.push(JoinStep {
            table: table.into(),
            foreign_key: false,
            on: vec![(left.into(), right.into())],
        });
        self
    }
    /// Join one more table through the single foreign key toward it declared by the selected
    /// table or one joined before.
    pub fn join_foreign_key(mut self, table: impl Into<String>) -> Self {
        self.steps.push(JoinStep {
            table: table.into(),
            foreign_key: true,
            on: Vec::new(),
        });
        self
    }
    /// Extra `AND left = right` on the last joined table.
    pub fn and_on(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.on.push((left.into(), right.into()));
        }
        self
    }
}

/// One `JOIN table ON ...` clause with resolved column pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub table: String,
    pub on: Vec<(ColumnRef, ColumnRef)>,
}

/// Join after validation against the catalog.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedJoin {
    pub clauses: Vec<JoinClause>,
}

impl ResolvedJoin {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
    /// Names of the joined tables, in join order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(|v| v.table.as_str())
    }
    pub fn contains_table(&self, table: &str) -> bool {
        self.tables().any(|v| v == table)
    }
    /// Whether the column belongs to a joined table and is the right hand side of one of its pairs.
    pub fn is_right_side(&self, column: &ColumnRef) -> bool {
        self.clauses
            .iter()
            .filter(|v| v.table == column.table)
            .flat_map(|v| v.on.iter())
            .any(|(_, right)| right == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let join = Join::on("positions", "employees.position_id", "positions.id")
            .join("departments", "positions.department_id", "departments.id")
            .and_on("departments.active", "positions.active");
        assert_eq!(join.steps.len(), 2);
        assert_eq!(join.steps[0].table, "positions");
        assert!(!join.steps[0].foreign_key);
        assert_eq!(join.steps[1].on.len(), 2);
    }

    #[test]
    fn chained_after_foreign_key() {
        let join = Join::foreign_key("positions").join(
            "departments",
            "positions.department_id",
            "departments.id",
        );
        assert_eq!(
            join.steps,
            [
                JoinStep {
                    table: "positions".into(),
                    foreign_key: true,
                    on: vec![],
                },
                JoinStep {
                    table: "departments".into(),
                    foreign_key: false,
                    on: vec![("positions.department_id".into(), "departments.id".into())],
                },
            ]
        );
        let join = Join::on("positions", "employees.position_id", "positions.id")
            .join_foreign_key("departments");
        assert!(join.steps[1].foreign_key);
    }
}
