use crate::{Join, Where};

/// Columns requested by a select.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// `*`, expanded to every participating column.
    #[default]
    All,
    /// Bare or `table.column` names.
    Columns(Vec<String>),
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Everything a select needs besides the table it runs on.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Select {
    pub columns: Selection,
    pub filter: Where,
    pub join: Option<Join>,
    pub order_by: Option<(String, Order)>,
    pub limit: Option<u32>,
}

impl Select {
    /// `SELECT *`.
    pub fn all() -> Self {
        Self::default()
    }
    /// Select the named columns, a `"*"` among them selects everything.
    pub fn columns<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let columns = if columns.is_empty() || columns.iter().any(|v| v == "*") {
            Selection::All
        } else {
            Selection::Columns(columns)
        };
        Self {
            columns,
            ..Default::default()
        }
    }
    pub fn filter(mut self, filter: impl Into<Where>) -> Self {
        self.filter = filter.into();
        self
    }
    pub fn join(mut self, join: Join) -> Self {
        self.join = Some(join);
        self
    }
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some((column.into(), Order::Asc));
        self
    }
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some((column.into(), Order::Desc));
        self
    }
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        assert_eq!(Select::columns(["*", "a"]).columns, Selection::All);
        assert_eq!(Select::columns(Vec::<String>::new()).columns, Selection::All);
        let select = Select::columns(["symbol", "stocks.qty"])
            .filter(Where::eq("trans", "BUY"))
            .order_by_desc("qty")
            .limit(3);
        assert_eq!(
            select.columns,
            Selection::Columns(vec!["symbol".into(), "stocks.qty".into()])
        );
        assert_eq!(select.order_by, Some(("qty".into(), Order::Desc)));
        assert_eq!(select.limit, Some(3));
        assert!(!select.filter.is_empty());
    }
}
