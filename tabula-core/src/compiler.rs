use crate::{
    AbstractType, Clause, CoercionPolicy, ColumnModel, ColumnRef, Condition, Error, Join,
    JoinClause, Operand, Operator, ResolvedJoin, Result, Selection, Table, TypeTranslator, Value,
};
use std::collections::BTreeMap;

/// Right hand side of a compiled comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    /// Bound as a parameter.
    Param(Value),
    Column(ColumnRef),
    /// Bare name that is not a column of the invoking table, rendered as written.
    RawColumn(String),
    /// Bound as one parameter per element.
    List(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    IsNull {
        column: ColumnRef,
        negated: bool,
    },
    Compare {
        column: ColumnRef,
        operator: Operator,
        rhs: Rhs,
    },
    /// Always true or always false, produced by an empty `in` list.
    Constant(bool),
}

/// Validated predicates, ANDed together.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// A projected column with the label it gets in the resulting record.
#[derive(Debug, Clone, PartialEq)]
pub struct Projected {
    pub label: String,
    pub column: ColumnRef,
    pub column_type: AbstractType,
}

/// Validates where, join and projection specifications against the table catalog.
///
/// Qualified `table.column` names must belong to the invoking table or to one of the tables
/// joined through [`ConditionCompiler::with_join`].
pub struct ConditionCompiler<'a> {
    pub catalog: &'a BTreeMap<String, Table>,
    pub table: &'a Table,
    pub translator: TypeTranslator,
    pub policy: CoercionPolicy,
    /// Tables joined to the invoking one.
    pub joined: Vec<String>,
    pub log_target: &'a str,
}

impl<'a> ConditionCompiler<'a> {
    pub fn new(
        catalog: &'a BTreeMap<String, Table>,
        table: &'a Table,
        translator: TypeTranslator,
        policy: CoercionPolicy,
    ) -> Self {
        Self {
            catalog,
            table,
            translator,
            policy,
            joined: Vec::new(),
            log_target: "tabula",
        }
    }

    pub fn with_log_target(mut self, log_target: &'a str) -> Self {
        self.log_target = log_target;
        self
    }

    /// Bring the tables of `join` in scope.
    pub fn with_join(mut self, join: &ResolvedJoin) -> Self {
        self.joined = join.tables().map(str::to_string).collect();
        self
    }

    fn lookup_table(&self, name: &str) -> Result<&'a Table> {
        if name == self.table.name() {
            return Ok(self.table);
        }
        self.catalog
            .get(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Resolve `column` or `table.column` against the catalog, whatever the scope.
    fn resolve_catalog_column(&self, name: &str) -> Result<(ColumnRef, &'a ColumnModel)> {
        let (table, column) = match name.split_once('.') {
            Some((table, column)) => (self.lookup_table(table)?, column),
            None => (self.table, name),
        };
        let model = table
            .column(column)
            .ok_or_else(|| Error::unknown_column(table.name(), column))?;
        Ok((ColumnRef::new(table.name(), column), model))
    }

    /// Resolve `column` or `table.column`, the table must be in scope.
    pub fn resolve_column(&self, name: &str) -> Result<(ColumnRef, &'a ColumnModel)> {
        let resolved = self.resolve_catalog_column(name)?;
        let table = resolved.0.table.as_str();
        if table != self.table.name() && !self.joined.iter().any(|v| v == table) {
            return Err(Error::invalid_input(
                name,
                format!(
                    "a column of `{}` or of a joined table, join `{}` first",
                    self.table.name(),
                    table
                ),
            ));
        }
        Ok(resolved)
    }

    pub fn resolve_join(&self, join: &Join) -> Result<ResolvedJoin> {
        let mut clauses: Vec<JoinClause> = Vec::with_capacity(join.steps.len());
        for step in &join.steps {
            let target = self.lookup_table(&step.table)?;
            let join_error = |reason: String| Error::JoinResolution {
                table: self.table.name().to_string(),
                target: step.table.clone(),
                reason,
            };
            let mut on = Vec::with_capacity(step.on.len() + 1);
            if step.foreign_key {
                let sources = std::iter::once(self.table.name())
                    .chain(clauses.iter().map(|v| v.table.as_str()))
                    .map(|v| self.lookup_table(v))
                    .collect::<Result<Vec<_>>>()?;
                let mut candidates = sources.iter().flat_map(|source| {
                    let name = source.name();
                    source
                        .foreign_keys()
                        .values()
                        .filter(move |v| v.referenced_table == step.table)
                        .map(move |v| (name, v))
                });
                let Some((source, fk)) = candidates.next() else {
                    return Err(join_error(format!(
                        "no foreign key references it from {:?}",
                        sources.iter().map(|v| v.name()).collect::<Vec<_>>()
                    )));
                };
                if let Some((other_source, other)) = candidates.next() {
                    return Err(join_error(format!(
                        "both `{}.{}` and `{}.{}` reference it, use an explicit join",
                        source, fk.local_column, other_source, other.local_column
                    )));
                }
                if !target.has_column(&fk.referenced_column) {
                    return Err(Error::unknown_column(target.name(), &fk.referenced_column));
                }
                on.push((
                    ColumnRef::new(source, &fk.local_column),
                    ColumnRef::new(target.name(), &fk.referenced_column),
                ));
            }
            for (left, right) in &step.on {
                on.push((
                    self.resolve_join_column(left, &clauses, target)?,
                    self.resolve_join_column(right, &clauses, target)?,
                ));
            }
            if on.is_empty() {
                return Err(Error::invalid_input(
                    &step.table,
                    "at least one `table.column` pair to join on",
                ));
            }
            clauses.push(JoinClause {
                table: step.table.clone(),
                on,
            });
        }
        Ok(ResolvedJoin { clauses })
    }

    /// Join columns are qualified and belong to the invoking table, a table joined before or
    /// the one being joined.
    fn resolve_join_column(
        &self,
        name: &str,
        previous: &[JoinClause],
        target: &Table,
    ) -> Result<ColumnRef> {
        if !name.contains('.') {
            return Err(Error::invalid_input(
                name,
                "a qualified `table.column` name in join",
            ));
        }
        let column = self.resolve_catalog_column(name)?.0;
        let table = column.table.as_str();
        if table != self.table.name()
            && table != target.name()
            && !previous.iter().any(|v| v.table == table)
        {
            return Err(Error::invalid_input(
                name,
                format!(
                    "a column of `{}`, `{}` or a table joined before it",
                    self.table.name(),
                    target.name()
                ),
            ));
        }
        Ok(column)
    }

    pub fn compile_where(&self, filter: &crate::Where) -> Result<Filter> {
        let mut predicates = Vec::new();
        for clause in &filter.clauses {
            match clause {
                Clause::Equals(pairs) => {
                    for (column, value) in pairs {
                        predicates.extend(self.compile_condition(
                            column,
                            Operator::Equal,
                            &Operand::Value(value.clone()),
                        )?);
                    }
                }
                Clause::Condition(Condition {
                    left,
                    operator,
                    right,
                }) => {
                    let operator = operator.parse::<Operator>()?;
                    predicates.extend(self.compile_condition(left, operator, right)?);
                }
            }
        }
        Ok(Filter { predicates })
    }

    /// Returns `None` when the lenient policy discarded the value.
    fn compile_condition(
        &self,
        left: &str,
        operator: Operator,
        right: &Operand,
    ) -> Result<Option<Predicate>> {
        let (column, model) = self.resolve_column(left)?;
        let rhs = match right {
            Operand::Column(name) => {
                if operator.is_list() {
                    return Err(list_expected(operator, name));
                }
                if name.contains('.') {
                    Rhs::Column(self.resolve_column(name)?.0)
                } else if self.table.has_column(name) {
                    Rhs::Column(ColumnRef::new(self.table.name(), name.as_str()))
                } else {
                    Rhs::RawColumn(name.clone())
                }
            }
            Operand::List(values) => {
                if !operator.is_list() {
                    return Err(Error::invalid_input(
                        format!("{values:?}"),
                        format!("a single value for operator {operator}"),
                    ));
                }
                if values.is_empty() {
                    return Ok(Some(Predicate::Constant(operator == Operator::NotIn)));
                }
                let mut coerced = Vec::with_capacity(values.len());
                for value in values {
                    if let Some(v) = self.coerce(model, value.clone())? {
                        coerced.push(v);
                    }
                }
                if coerced.is_empty() {
                    return Ok(None);
                }
                Rhs::List(coerced)
            }
            Operand::Value(value) => {
                if operator.is_list() {
                    return Err(list_expected(operator, &value.to_string()));
                }
                if operator.is_like() {
                    Rhs::Param(Value::Text(like_pattern(value)?))
                } else if value.is_null() {
                    return match operator {
                        Operator::Equal | Operator::NotEqual => Ok(Some(Predicate::IsNull {
                            column,
                            negated: operator == Operator::NotEqual,
                        })),
                        _ => Err(Error::invalid_input(
                            format!("NULL with operator {operator}"),
                            "NULL compared only through =, ==, != or <>",
                        )),
                    };
                } else {
                    match self.coerce(model, value.clone())? {
                        Some(v) => Rhs::Param(v),
                        None => return Ok(None),
                    }
                }
            }
        };
        Ok(Some(Predicate::Compare {
            column,
            operator,
            rhs,
        }))
    }

    fn coerce(&self, model: &ColumnModel, value: Value) -> Result<Option<Value>> {
        let result = self.translator.coerce(
            &model.name,
            model.column_type,
            value.clone(),
            self.policy,
        )?;
        if result.is_none() {
            log::warn!(
                target: self.log_target,
                "Unsupported value {} provided for boolean column `{}`, it will be ignored",
                value,
                model.name
            );
        }
        Ok(result)
    }

    /// Validate and coerce the column values of an insert or update.
    pub fn compile_assignments(&self, values: Vec<(String, Value)>) -> Result<Vec<(String, Value)>> {
        let mut result: Vec<(String, Value)> = Vec::with_capacity(values.len());
        for (name, value) in values {
            let (column, model) = self.resolve_column(&name)?;
            if column.table != self.table.name() {
                return Err(Error::invalid_input(
                    name,
                    format!("a column of table `{}`", self.table.name()),
                ));
            }
            if result.iter().any(|(v, _)| *v == column.name) {
                return Err(Error::invalid_input(
                    name,
                    "every column assigned at most once",
                ));
            }
            if let Some(value) = self.coerce(model, value)? {
                result.push((column.name, value));
            }
        }
        Ok(result)
    }

    /// Labels and types of the selected columns.
    pub fn resolve_projection(
        &self,
        selection: &Selection,
        join: &ResolvedJoin,
    ) -> Result<Vec<Projected>> {
        match selection {
            Selection::All if join.is_empty() => Ok(self
                .table
                .columns()
                .iter()
                .map(|v| Projected {
                    label: v.name.clone(),
                    column: ColumnRef::new(self.table.name(), v.name.as_str()),
                    column_type: v.column_type,
                })
                .collect()),
            Selection::All => {
                let mut result = Vec::new();
                let mut seen = Vec::new();
                for name in std::iter::once(self.table.name()).chain(join.tables()) {
                    if seen.contains(&name) {
                        continue;
                    }
                    seen.push(name);
                    let table = self.lookup_table(name)?;
                    for column in table.columns() {
                        let column_ref = ColumnRef::new(table.name(), column.name.as_str());
                        if join.is_right_side(&column_ref) {
                            continue;
                        }
                        result.push(Projected {
                            label: column_ref.to_string(),
                            column: column_ref,
                            column_type: column.column_type,
                        });
                    }
                }
                Ok(result)
            }
            Selection::Columns(columns) => columns
                .iter()
                .map(|name| {
                    let (column, model) = self.resolve_column(name)?;
                    Ok(Projected {
                        label: name.clone(),
                        column,
                        column_type: model.column_type,
                    })
                })
                .collect(),
        }
    }
}

fn list_expected(operator: Operator, found: &str) -> Error {
    Error::invalid_input(
        found,
        format!("a list of values for operator {operator}"),
    )
}

fn like_pattern(value: &Value) -> Result<String> {
    let text = match value {
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
        Value::Boolean(v) => v.to_string(),
        v => v
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_input(v.to_string(), "a text pattern for like"))?,
    };
    Ok(if text.contains('*') {
        text.replace('*', "%")
    } else {
        format!("%{text}%")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, Where};

    fn catalog() -> BTreeMap<String, Table> {
        let tables = [
            Table::builder("departments")
                .column("id", AbstractType::Integer, "PRIMARY KEY")
                .column("name", AbstractType::Text, "")
                .build(),
            Table::builder("positions")
                .column("id", AbstractType::Integer, "PRIMARY KEY")
                .column("name", AbstractType::Text, "")
                .column("department_id", AbstractType::Integer, "")
                .foreign_key("department_id", "departments", "id", "")
                .build(),
            Table::builder("employees")
                .column("id", AbstractType::Integer, "PRIMARY KEY")
                .column("name", AbstractType::Text, "NOT NULL")
                .column("active", AbstractType::Boolean, "")
                .column("position_id", AbstractType::Integer, "")
                .column("mentor_id", AbstractType::Integer, "")
                .foreign_key("position_id", "positions", "id", "")
                .foreign_key("mentor_id", "positions", "id", "")
                .build(),
        ];
        tables
            .into_iter()
            .map(|v| {
                let v = v.unwrap();
                (v.name().to_string(), v)
            })
            .collect()
    }

    fn compiler<'a>(catalog: &'a BTreeMap<String, Table>, table: &str) -> ConditionCompiler<'a> {
        ConditionCompiler::new(
            catalog,
            &catalog[table],
            TypeTranslator::new(Engine::Sqlite),
            CoercionPolicy::Strict,
        )
    }

    #[test]
    fn resolve_columns() {
        let catalog = catalog();
        let compiler = compiler(&catalog, "positions");
        assert_eq!(
            compiler.resolve_column("name").unwrap().0,
            ColumnRef::new("positions", "name")
        );
        assert_eq!(
            compiler.resolve_column("positions.name").unwrap().0,
            ColumnRef::new("positions", "name")
        );
        assert!(matches!(
            compiler.resolve_column("nope"),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            compiler.resolve_column("nope.name"),
            Err(Error::UnknownTable(..))
        ));
    }

    #[test]
    fn other_tables_need_a_join() {
        let catalog = catalog();
        let compiler = compiler(&catalog, "positions");
        assert!(matches!(
            compiler.resolve_column("departments.name"),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            compiler.compile_where(&Where::eq("departments.name", "HR")),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            compiler.compile_where(&Where::new().and_column("id", "=", "departments.id")),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            compiler.resolve_projection(
                &Selection::Columns(vec!["departments.name".into()]),
                &ResolvedJoin::default()
            ),
            Err(Error::InvalidInput { .. })
        ));
        let join = compiler
            .resolve_join(&Join::foreign_key("departments"))
            .unwrap();
        let compiler = compiler.with_join(&join);
        assert_eq!(
            compiler.resolve_column("departments.name").unwrap().0,
            ColumnRef::new("departments", "name")
        );
        let filter = compiler
            .compile_where(&Where::eq("departments.name", "HR"))
            .unwrap();
        assert_eq!(
            filter.predicates,
            [Predicate::Compare {
                column: ColumnRef::new("departments", "name"),
                operator: Operator::Equal,
                rhs: Rhs::Param("HR".into()),
            }]
        );
    }

    #[test]
    fn compile_conditions() {
        let catalog = catalog();
        let compiler = compiler(&catalog, "employees");
        let filter = compiler
            .compile_where(
                &Where::eq("name", "Ann")
                    .and_eq("position_id", "3")
                    .and("active", "==", Value::Null)
                    .and("mentor_id", "!=", Value::Null)
                    .and("name", "LIKE", "Dir*")
                    .and("name", "not like", "x")
                    .and("id", "not in", [1, 2])
                    .and("id", "in", Vec::<i64>::new())
                    .and_column("id", ">", "other_id"),
            )
            .unwrap();
        let employees = |name: &str| ColumnRef::new("employees", name);
        assert_eq!(
            filter.predicates,
            [
                Predicate::Compare {
                    column: employees("name"),
                    operator: Operator::Equal,
                    rhs: Rhs::Param("Ann".into()),
                },
                Predicate::Compare {
                    column: employees("position_id"),
                    operator: Operator::Equal,
                    rhs: Rhs::Param(3.into()),
                },
                Predicate::IsNull {
                    column: employees("active"),
                    negated: false,
                },
                Predicate::IsNull {
                    column: employees("mentor_id"),
                    negated: true,
                },
                Predicate::Compare {
                    column: employees("name"),
                    operator: Operator::Like,
                    rhs: Rhs::Param("Dir%".into()),
                },
                Predicate::Compare {
                    column: employees("name"),
                    operator: Operator::NotLike,
                    rhs: Rhs::Param("%x%".into()),
                },
                Predicate::Compare {
                    column: employees("id"),
                    operator: Operator::NotIn,
                    rhs: Rhs::List(vec![1.into(), 2.into()]),
                },
                Predicate::Constant(false),
                Predicate::Compare {
                    column: employees("id"),
                    operator: Operator::Greater,
                    rhs: Rhs::RawColumn("other_id".into()),
                },
            ]
        );
    }

    #[test]
    fn rejected_conditions() {
        let catalog = catalog();
        let compiler = compiler(&catalog, "employees");
        let compile = |filter: Where| compiler.compile_where(&filter);
        assert!(matches!(
            compile(Where::new().and("id", "in", 1)),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            compile(Where::new().and("id", "=", [1, 2])),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            compile(Where::new().and("id", "~=", 1)),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            compile(Where::eq("missing", 1)),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            compile(Where::eq("id", "abc")),
            Err(Error::TypeCoercion { .. })
        ));
        assert!(matches!(
            compile(Where::new().and_column("id", "=", "positions.missing")),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            compile(Where::eq("active", "maybe")),
            Err(Error::TypeCoercion { .. })
        ));
    }

    #[test]
    fn lenient_drops_condition() {
        let catalog = catalog();
        let compiler = ConditionCompiler {
            policy: CoercionPolicy::Lenient,
            ..compiler(&catalog, "employees")
        };
        let filter = compiler
            .compile_where(&Where::eq("active", "maybe").and_eq("id", 1))
            .unwrap();
        assert_eq!(filter.predicates.len(), 1);
    }

    #[test]
    fn foreign_key_join() {
        let catalog = catalog();
        let join = compiler(&catalog, "positions")
            .resolve_join(&Join::foreign_key("departments"))
            .unwrap();
        assert_eq!(
            join.clauses,
            [JoinClause {
                table: "departments".into(),
                on: vec![(
                    ColumnRef::new("positions", "department_id"),
                    ColumnRef::new("departments", "id")
                )],
            }]
        );
        let compiler = compiler(&catalog, "employees");
        assert!(matches!(
            compiler.resolve_join(&Join::foreign_key("positions")),
            Err(Error::JoinResolution { .. })
        ));
        assert!(matches!(
            compiler.resolve_join(&Join::foreign_key("departments")),
            Err(Error::JoinResolution { .. })
        ));
    }

    #[test]
    fn chained_foreign_key_join() {
        let catalog = catalog();
        let employees = compiler(&catalog, "employees");
        let join = employees
            .resolve_join(
                &Join::on("positions", "employees.position_id", "positions.id")
                    .join_foreign_key("departments"),
            )
            .unwrap();
        assert_eq!(
            join.clauses[1],
            JoinClause {
                table: "departments".into(),
                on: vec![(
                    ColumnRef::new("positions", "department_id"),
                    ColumnRef::new("departments", "id")
                )],
            }
        );
        let join = compiler(&catalog, "positions")
            .resolve_join(
                &Join::foreign_key("departments").and_on("positions.name", "departments.name"),
            )
            .unwrap();
        assert_eq!(join.clauses[0].on.len(), 2);
        assert!(matches!(
            employees.resolve_join(&Join::on(
                "positions",
                "departments.id",
                "positions.department_id"
            )),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn explicit_join_and_projection() {
        let catalog = catalog();
        let compiler = compiler(&catalog, "employees");
        let join = compiler
            .resolve_join(
                &Join::on("positions", "employees.position_id", "positions.id").join(
                    "departments",
                    "positions.department_id",
                    "departments.id",
                ),
            )
            .unwrap();
        assert_eq!(join.clauses.len(), 2);
        let labels = compiler
            .resolve_projection(&Selection::All, &join)
            .unwrap()
            .into_iter()
            .map(|v| v.label)
            .collect::<Vec<_>>();
        assert_eq!(
            labels,
            [
                "employees.id",
                "employees.name",
                "employees.active",
                "employees.position_id",
                "employees.mentor_id",
                "positions.name",
                "positions.department_id",
                "departments.name",
            ]
        );
        assert!(matches!(
            compiler.resolve_join(&Join::on("positions", "position_id", "positions.id")),
            Err(Error::InvalidInput { .. })
        ));
        assert!(matches!(
            compiler.resolve_join(&Join::on("nope", "employees.id", "nope.id")),
            Err(Error::UnknownTable(..))
        ));
        assert!(matches!(
            compiler.resolve_join(&Join::on("positions", "employees.id", "positions.nope")),
            Err(Error::UnknownColumn { .. })
        ));
    }

    #[test]
    fn assignments() {
        let catalog = catalog();
        let compiler = compiler(&catalog, "employees");
        assert_eq!(
            compiler
                .compile_assignments(vec![
                    ("name".into(), "Ann".into()),
                    ("active".into(), 1.into())
                ])
                .unwrap(),
            [
                ("name".to_string(), Value::from("Ann")),
                ("active".to_string(), Value::Boolean(true))
            ]
        );
        assert!(matches!(
            compiler.compile_assignments(vec![("salary".into(), 1.into())]),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            compiler.compile_assignments(vec![("positions.name".into(), 1.into())]),
            Err(Error::InvalidInput { .. })
        ));
    }
}
