use crate::{Error, Result, Value};
use std::{
    fmt::{self, Display},
    str::FromStr,
};

/// Comparison operators accepted in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Like,
    NotLike,
    In,
    NotIn,
}

impl Operator {
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }
    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
    pub fn is_like(&self) -> bool {
        matches!(self, Operator::Like | Operator::NotLike)
    }
}

impl FromStr for Operator {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(match normalized.to_ascii_lowercase().as_str() {
            "=" | "==" => Operator::Equal,
            "<>" | "!=" => Operator::NotEqual,
            ">" => Operator::Greater,
            ">=" => Operator::GreaterEqual,
            "<" => Operator::Less,
            "<=" => Operator::LessEqual,
            "like" => Operator::Like,
            "not like" => Operator::NotLike,
            "in" => Operator::In,
            "not in" => Operator::NotIn,
            _ => {
                return Err(Error::invalid_input(
                    s,
                    "one of =, ==, <>, !=, >, >=, <, <=, like, not like, in, not in",
                ));
            }
        })
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// Right hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    /// Reference to a column, bare or `table.column`.
    Column(String),
    List(Vec<Value>),
}

impl Operand {
    pub fn column(name: impl Into<String>) -> Self {
        Operand::Column(name.into())
    }
}

macro_rules! impl_operand_value {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for Operand {
                fn from(value: $source) -> Self {
                    Operand::Value(value.into())
                }
            }
        )+
    };
}

impl_operand_value!(
    Value,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    String,
    &str,
    serde_json::Value,
);

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(value: Vec<T>) -> Self {
        Operand::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Operand {
    fn from(value: [T; N]) -> Self {
        Operand::List(value.into_iter().map(Into::into).collect())
    }
}

/// A `left operator right` predicate. The operator is kept as written and validated when compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: String,
    pub operator: String,
    pub right: Operand,
}

/// One element of a where specification.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Column equals value for every pair, ANDed.
    Equals(Vec<(String, Value)>),
    Condition(Condition),
}

/// Ordered list of clauses, all ANDed together.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Where {
    pub clauses: Vec<Clause>,
}

impl Where {
    pub fn new() -> Self {
        Self::default()
    }
    /// Shorthand for `Where::new().and_eq(column, value)`.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and_eq(column, value)
    }
    /// Add an equality, merged into the trailing equality group when there is one.
    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let pair = (column.into(), value.into());
        match self.clauses.last_mut() {
            Some(Clause::Equals(pairs)) => pairs.push(pair),
            _ => self.clauses.push(Clause::Equals(vec![pair])),
        }
        self
    }
    pub fn and(
        mut self,
        left: impl Into<String>,
        operator: impl Into<String>,
        right: impl Into<Operand>,
    ) -> Self {
        self.clauses.push(Clause::Condition(Condition {
            left: left.into(),
            operator: operator.into(),
            right: right.into(),
        }));
        self
    }
    /// Compare two columns.
    pub fn and_column(
        self,
        left: impl Into<String>,
        operator: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.and(left, operator, Operand::Column(right.into()))
    }
    pub fn is_empty(&self) -> bool {
        self.clauses.iter().all(|v| match v {
            Clause::Equals(pairs) => pairs.is_empty(),
            Clause::Condition(..) => false,
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Where {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let pairs: Vec<_> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            clauses: vec![Clause::Equals(pairs)],
        }
    }
}

impl From<Vec<(String, Value)>> for Where {
    fn from(value: Vec<(String, Value)>) -> Self {
        Self {
            clauses: vec![Clause::Equals(value)],
        }
    }
}

impl From<Condition> for Where {
    fn from(value: Condition) -> Self {
        Self {
            clauses: vec![Clause::Condition(value)],
        }
    }
}
