use crate::{Error, Result, Table, TableBuilder, TypeTranslator, consume_while, unquote_identifier};

/// Reads the `CREATE TABLE` text stored by the engine back into a [`Table`].
///
/// Works on the layout both engines emit (`sqlite_master.sql` and `SHOW CREATE TABLE`), it is
/// not a general sql parser.
pub struct SchemaParser<'a> {
    translator: TypeTranslator,
    log_target: &'a str,
}

impl<'a> SchemaParser<'a> {
    pub fn new(translator: TypeTranslator) -> Self {
        Self {
            translator,
            log_target: "tabula",
        }
    }

    pub fn with_log_target(mut self, log_target: &'a str) -> Self {
        self.log_target = log_target;
        self
    }

    /// Returns `Ok(None)` when the definition has no column block.
    pub fn parse(&self, name: &str, ddl: &str) -> Result<Option<Table>> {
        let error = |message: String| Error::SchemaParse {
            table: name.to_string(),
            message,
        };
        let Some(block) = column_block(ddl).map_err(error)? else {
            return Ok(None);
        };
        let mut builder = Table::builder(name);
        for fragment in split_top_level(block) {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                continue;
            }
            let upper = fragment.to_ascii_uppercase();
            if upper.contains("FOREIGN KEY") {
                builder = parse_foreign_key(builder, fragment, &upper).map_err(error)?;
                continue;
            }
            if let Some(rest) = upper.strip_prefix("PRIMARY KEY") {
                let columns = parenthesized(&fragment[fragment.len() - rest.len()..])
                    .ok_or_else(|| error(format!("Missing the columns in `{fragment}`")))?;
                let columns = columns
                    .split(',')
                    .map(unquote_identifier)
                    .collect::<Vec<_>>();
                if let [column] = columns.as_slice() {
                    builder = builder.primary_key(*column);
                } else {
                    log::warn!(
                        target: self.log_target,
                        "Table `{}` has a composite primary key {:?}, key based access will be unavailable",
                        name,
                        columns,
                    );
                }
                continue;
            }
            let first_word = upper.split_whitespace().next().unwrap_or_default();
            if matches!(
                first_word,
                "KEY" | "UNIQUE" | "INDEX" | "CONSTRAINT" | "CHECK" | "FULLTEXT" | "SPATIAL"
            ) {
                continue;
            }
            let (column, rest) = split_identifier(fragment);
            let mut rest = rest.trim_start();
            let base = consume_while(&mut rest, |c| c.is_ascii_alphanumeric() || *c == '_');
            if base.is_empty() {
                return Err(error(format!("Missing the type of column `{column}`")));
            }
            let mut keyword = base.to_string();
            if rest.trim_start().starts_with('(') {
                let args = parenthesized(rest)
                    .ok_or_else(|| error(format!("Unbalanced type arguments for `{column}`")))?;
                keyword = format!("{base}({args})");
                let close = rest.find(')').unwrap_or(rest.len().saturating_sub(1));
                rest = &rest[close + 1..];
            }
            let column_type = self
                .translator
                .from_engine_keyword(&keyword)
                .map_err(|e| error(format!("{e}")))?;
            builder = builder.column(column, column_type, rest.trim());
        }
        builder.build().map(Some)
    }
}

/// Text between the first `(` and its matching `)`, outside of quoted identifiers.
fn column_block(ddl: &str) -> std::result::Result<Option<&str>, String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut quote = None;
    for (i, c) in ddl.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '`' | '\'' => quote = Some(c),
            '[' if start.is_none() => quote = Some(']'),
            '(' => {
                if start.is_none() {
                    start = Some(i + 1);
                }
                depth += 1;
            }
            ')' if start.is_some() => {
                depth -= 1;
                if depth == 0 {
                    return Ok(start.map(|s| &ddl[s..i]));
                }
            }
            _ => {}
        }
    }
    match start {
        Some(..) => Err("Unbalanced parentheses in the column block".into()),
        None => Ok(None),
    }
}

/// Split on the commas that are not nested in parentheses or quotes.
fn split_top_level(block: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut position = 0;
    for (i, c) in block.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '`' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                result.push(&block[position..i]);
                position = i + 1;
            }
            _ => {}
        }
    }
    result.push(&block[position..]);
    result
}

/// Content of the first `( ... )` group in `value`.
fn parenthesized(value: &str) -> Option<&str> {
    let start = value.find('(')?;
    let end = start + value[start..].find(')')?;
    Some(value[start + 1..end].trim())
}

/// Leading identifier, possibly quoted, and the rest of the fragment.
fn split_identifier(fragment: &str) -> (&str, &str) {
    let close = match fragment.chars().next() {
        Some('"') => Some('"'),
        Some('`') => Some('`'),
        Some('[') => Some(']'),
        _ => None,
    };
    if let Some(close) = close {
        if let Some(end) = fragment[1..].find(close) {
            return (&fragment[1..end + 1], &fragment[end + 2..]);
        }
    }
    match fragment.find(char::is_whitespace) {
        Some(i) => (&fragment[..i], &fragment[i..]),
        None => (fragment, ""),
    }
}

fn parse_foreign_key(
    builder: TableBuilder,
    fragment: &str,
    upper: &str,
) -> std::result::Result<TableBuilder, String> {
    let missing = |what: &str| format!("Missing {what} in `{fragment}`");
    let after_key = upper.find("FOREIGN KEY").unwrap_or_default() + "FOREIGN KEY".len();
    let local = parenthesized(&fragment[after_key..]).ok_or_else(|| missing("the local column"))?;
    let references = upper
        .find("REFERENCES")
        .ok_or_else(|| missing("REFERENCES"))?
        + "REFERENCES".len();
    let target = &fragment[references..];
    let open = target.find('(').ok_or_else(|| missing("the referenced column"))?;
    let close = target.find(')').ok_or_else(|| missing("the referenced column"))?;
    if close < open {
        return Err(missing("the referenced column"));
    }
    let table = unquote_identifier(&target[..open]);
    if table.is_empty() {
        return Err(missing("the referenced table"));
    }
    Ok(builder.foreign_key(
        unquote_identifier(local),
        table,
        unquote_identifier(&target[open + 1..close]),
        target[close + 1..].trim(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AbstractType, Engine};
    use indoc::indoc;

    #[test]
    fn split_fragments() {
        assert_eq!(
            split_top_level("a DECIMAL(10,2), b TEXT DEFAULT 'x,y', c INT"),
            ["a DECIMAL(10,2)", " b TEXT DEFAULT 'x,y'", " c INT"]
        );
    }

    #[test]
    fn no_column_block() {
        let parser = SchemaParser::new(TypeTranslator::new(Engine::Sqlite));
        assert_eq!(parser.parse("t", "CREATE VIRTUAL TABLE t USING x").unwrap(), None);
        assert!(matches!(
            parser.parse("t", "CREATE TABLE t (a INTEGER"),
            Err(Error::SchemaParse { .. })
        ));
    }

    #[test]
    fn sqlite_quoted() {
        let parser = SchemaParser::new(TypeTranslator::new(Engine::Sqlite));
        let table = parser
            .parse(
                "my (table)",
                indoc! {r#"
                    CREATE TABLE IF NOT EXISTS "my (table)" (
                    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
                    "first name" TEXT NOT NULL,
                    "other" INTEGER,
                    FOREIGN KEY ("other") REFERENCES "others"("id") ON DELETE CASCADE
                    )
                "#},
            )
            .unwrap()
            .unwrap();
        assert_eq!(table.columns()[1].name, "first name");
        assert_eq!(table.columns()[1].modifiers, "NOT NULL");
        assert_eq!(table.primary_key().unwrap().name, "id");
        let fk = &table.foreign_keys()["other"];
        assert_eq!(fk.referenced_table, "others");
        assert_eq!(fk.referenced_column, "id");
        assert_eq!(fk.modifiers, "ON DELETE CASCADE");
    }

    #[test]
    fn mysql_show_create() {
        let parser = SchemaParser::new(TypeTranslator::new(Engine::MySql));
        let table = parser
            .parse(
                "employees",
                indoc! {"
                    CREATE TABLE `employees` (
                      `id` int NOT NULL AUTO_INCREMENT,
                      `name` varchar(36) NOT NULL,
                      `salary` decimal(10,2) DEFAULT NULL,
                      `active` tinyint(1) DEFAULT '1',
                      `position_id` int unsigned DEFAULT NULL,
                      PRIMARY KEY (`id`),
                      UNIQUE KEY `name` (`name`),
                      KEY `position_id` (`position_id`),
                      CONSTRAINT `employees_ibfk_1` FOREIGN KEY (`position_id`) REFERENCES `positions` (`id`) ON DELETE CASCADE
                    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci
                "},
            )
            .unwrap()
            .unwrap();
        assert_eq!(
            table
                .columns()
                .iter()
                .map(|v| (v.name.as_str(), v.column_type))
                .collect::<Vec<_>>(),
            [
                ("id", AbstractType::Integer),
                ("name", AbstractType::Text),
                ("salary", AbstractType::Real),
                ("active", AbstractType::Boolean),
                ("position_id", AbstractType::Integer),
            ]
        );
        assert_eq!(table.columns()[0].modifiers, "NOT NULL AUTO_INCREMENT");
        assert_eq!(table.columns()[4].modifiers, "unsigned DEFAULT NULL");
        assert_eq!(table.primary_key().unwrap().name, "id");
        assert_eq!(table.foreign_keys()["position_id"].referenced_table, "positions");
    }

    #[test]
    fn failures() {
        let parser = SchemaParser::new(TypeTranslator::new(Engine::Sqlite));
        assert!(matches!(
            parser.parse("t", "CREATE TABLE t (a DATETIME)"),
            Err(Error::SchemaParse { .. })
        ));
        assert!(matches!(
            parser.parse("t", "CREATE TABLE t (a)"),
            Err(Error::SchemaParse { .. })
        ));
        assert!(matches!(
            parser.parse(
                "t",
                "CREATE TABLE t (a INTEGER PRIMARY KEY, b TEXT PRIMARY KEY)"
            ),
            Err(Error::AmbiguousPrimaryKey { .. })
        ));
        let composite = parser
            .parse("t", "CREATE TABLE t (a INTEGER, b TEXT, PRIMARY KEY (a, b))")
            .unwrap()
            .unwrap();
        assert!(composite.primary_key().is_none());
    }
}
