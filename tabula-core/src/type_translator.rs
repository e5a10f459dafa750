use crate::{Error, Result, Value, consume_while};
use std::fmt::{self, Display};

/// Engine independent kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractType {
    Integer,
    Text,
    Real,
    Boolean,
    Binary,
}

impl AbstractType {
    pub const ALL: [AbstractType; 5] = [
        AbstractType::Integer,
        AbstractType::Text,
        AbstractType::Real,
        AbstractType::Boolean,
        AbstractType::Binary,
    ];
}

impl Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbstractType::Integer => "integer",
            AbstractType::Text => "text",
            AbstractType::Real => "real",
            AbstractType::Boolean => "boolean",
            AbstractType::Binary => "binary",
        })
    }
}

/// The database engines a driver can speak for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Sqlite,
    MySql,
}

/// What to do with a value that cannot be read as a boolean.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionPolicy {
    /// Fail the operation with `Error::TypeCoercion`.
    #[default]
    Strict,
    /// Drop the value and log a warning.
    Lenient,
}

/// Bounded type used for text and binary primary keys.
const BOUNDED_KEY: &str = "VARCHAR(36)";

/// Bidirectional mapping between `AbstractType` and the column keywords of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTranslator {
    pub engine: Engine,
}

impl TypeTranslator {
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }

    fn keywords(&self) -> &'static [(&'static str, AbstractType)] {
        match self.engine {
            Engine::Sqlite => &[
                ("INTEGER", AbstractType::Integer),
                ("TEXT", AbstractType::Text),
                ("REAL", AbstractType::Real),
                ("BOOLEAN", AbstractType::Boolean),
                ("BLOB", AbstractType::Binary),
            ],
            // The first entry of each type is the one emitted in DDL
            Engine::MySql => &[
                ("INT", AbstractType::Integer),
                ("TEXT", AbstractType::Text),
                ("DOUBLE", AbstractType::Real),
                ("TINYINT(1)", AbstractType::Boolean),
                ("BLOB", AbstractType::Binary),
                ("TINYINT", AbstractType::Boolean),
                ("BOOLEAN", AbstractType::Boolean),
                ("BOOL", AbstractType::Boolean),
                ("INTEGER", AbstractType::Integer),
                ("SMALLINT", AbstractType::Integer),
                ("MEDIUMINT", AbstractType::Integer),
                ("BIGINT", AbstractType::Integer),
                ("TINYTEXT", AbstractType::Text),
                ("MEDIUMTEXT", AbstractType::Text),
                ("LONGTEXT", AbstractType::Text),
                ("FLOAT", AbstractType::Real),
                ("REAL", AbstractType::Real),
                ("DECIMAL", AbstractType::Real),
                ("TINYBLOB", AbstractType::Binary),
                ("MEDIUMBLOB", AbstractType::Binary),
                ("LONGBLOB", AbstractType::Binary),
                ("VARBINARY", AbstractType::Binary),
                ("BINARY", AbstractType::Binary),
            ],
        }
    }

    /// DDL keyword for the type. Text and binary primary keys get a bounded string type
    /// because MySQL cannot index unbounded ones.
    pub fn to_engine_keyword(&self, value: AbstractType, primary_key: bool) -> &'static str {
        if primary_key && matches!(value, AbstractType::Text | AbstractType::Binary) {
            return BOUNDED_KEY;
        }
        self.keywords()
            .iter()
            .find_map(|(k, v)| (*v == value).then_some(*k))
            .unwrap_or_else(|| unreachable!("Every AbstractType has a keyword"))
    }

    /// Type of a column keyword as found in schema text (case insensitive).
    pub fn from_engine_keyword(&self, keyword: &str) -> Result<AbstractType> {
        let upper = keyword.trim().to_ascii_uppercase();
        if is_bounded_string(&upper) {
            return Ok(AbstractType::Text);
        }
        if let Some((_, t)) = self.keywords().iter().find(|(k, _)| *k == upper) {
            return Ok(*t);
        }
        let mut input = upper.as_str();
        let base = consume_while(&mut input, |c| c.is_ascii_alphanumeric() || *c == '_');
        let rest = input
            .trim_start()
            .strip_prefix('(')
            .and_then(|v| v.split_once(')'))
            .map(|(_, rest)| rest)
            .unwrap_or(input);
        let qualifiers_only = rest
            .split_whitespace()
            .all(|v| matches!(v, "UNSIGNED" | "SIGNED" | "ZEROFILL"));
        if !base.is_empty() && qualifiers_only {
            if let Some((_, t)) = self.keywords().iter().find(|(k, _)| *k == base) {
                return Ok(*t);
            }
        }
        Err(Error::UnsupportedType(keyword.trim().to_string()))
    }

    /// Convert a caller supplied value into the canonical value for a column type.
    ///
    /// Returns `Ok(None)` when the lenient policy discards an unrecognized boolean, reporting the
    /// drop is up to the caller.
    pub fn coerce(
        &self,
        column: &str,
        column_type: AbstractType,
        value: Value,
        policy: CoercionPolicy,
    ) -> Result<Option<Value>> {
        let value = match value {
            Value::Json(json) => match json {
                serde_json::Value::Null => Value::Null,
                serde_json::Value::Bool(v) => Value::Boolean(v),
                serde_json::Value::Number(v) => match v.as_i64() {
                    Some(v) => Value::Integer(v),
                    None => Value::Real(v.as_f64().unwrap_or(f64::NAN)),
                },
                serde_json::Value::String(v) => Value::Text(v),
                json => Value::Json(json),
            },
            v => v,
        };
        let error = |value: &Value| Error::TypeCoercion {
            column: column.to_string(),
            value: value.to_string(),
            expected: column_type,
        };
        if value.is_null() {
            return Ok(Some(Value::Null));
        }
        let result = match (column_type, value) {
            (AbstractType::Integer, Value::Integer(v)) => Value::Integer(v),
            (AbstractType::Integer, Value::Boolean(v)) => Value::Integer(v as i64),
            (AbstractType::Integer, Value::Real(v))
                if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 =>
            {
                Value::Integer(v as i64)
            }
            (AbstractType::Integer, Value::Text(v)) => match v.trim().parse::<i64>() {
                Ok(v) => Value::Integer(v),
                Err(..) => return Err(error(&Value::Text(v))),
            },
            (AbstractType::Real, Value::Real(v)) => Value::Real(v),
            (AbstractType::Real, Value::Integer(v)) => Value::Real(v as f64),
            (AbstractType::Real, Value::Boolean(v)) => Value::Real(v as i64 as f64),
            (AbstractType::Real, Value::Text(v)) => match v.trim().parse::<f64>() {
                Ok(v) => Value::Real(v),
                Err(..) => return Err(error(&Value::Text(v))),
            },
            (AbstractType::Text, Value::Text(v)) => Value::Text(v),
            (AbstractType::Text, Value::Integer(v)) => Value::Text(v.to_string()),
            (AbstractType::Text, Value::Real(v)) => Value::Text(v.to_string()),
            (AbstractType::Text, Value::Boolean(v)) => Value::Text(v.to_string()),
            (AbstractType::Text, Value::Json(v)) => Value::Text(serde_json::to_string(&v)?),
            (AbstractType::Text, Value::Binary(v)) => match String::from_utf8(v.into_vec()) {
                Ok(v) => Value::Text(v),
                Err(e) => return Err(error(&Value::Binary(e.into_bytes().into()))),
            },
            (AbstractType::Binary, Value::Binary(v)) => Value::Binary(v),
            (AbstractType::Binary, Value::Text(v)) => Value::Binary(v.into_bytes().into()),
            (AbstractType::Boolean, value) => match parse_boolean(&value) {
                Some(v) => Value::Boolean(v),
                None => match policy {
                    CoercionPolicy::Strict => return Err(error(&value)),
                    CoercionPolicy::Lenient => return Ok(None),
                },
            },
            (_, value) => return Err(error(&value)),
        };
        Ok(Some(result))
    }

    /// Reverse of `coerce` for values read back from a row. Values that do not fit the
    /// column type are returned unchanged.
    pub fn decode(&self, column_type: AbstractType, value: Value) -> Value {
        match (column_type, value) {
            (_, Value::Null) => Value::Null,
            (AbstractType::Boolean, value) => match parse_boolean(&value) {
                Some(v) => Value::Boolean(v),
                None => value,
            },
            (AbstractType::Text, Value::Binary(v)) => match String::from_utf8(v.into_vec()) {
                Ok(v) => decode_json(v),
                Err(e) => Value::Binary(e.into_bytes().into()),
            },
            (AbstractType::Text, Value::Text(v)) => decode_json(v),
            (AbstractType::Integer, value @ (Value::Text(..) | Value::Binary(..))) => value
                .as_str()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .map(Value::Integer)
                .unwrap_or(value),
            (AbstractType::Real, Value::Integer(v)) => Value::Real(v as f64),
            (AbstractType::Real, value @ (Value::Text(..) | Value::Binary(..))) => value
                .as_str()
                .and_then(|v| v.trim().parse::<f64>().ok())
                .map(Value::Real)
                .unwrap_or(value),
            (AbstractType::Binary, Value::Text(v)) => Value::Binary(v.into_bytes().into()),
            (_, value) => value,
        }
    }
}

fn is_bounded_string(keyword: &str) -> bool {
    let Some(args) = keyword
        .strip_prefix("VARCHAR")
        .or_else(|| keyword.strip_prefix("CHAR"))
    else {
        return false;
    };
    args.trim_start()
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .is_some_and(|v| !v.trim().is_empty() && v.trim().chars().all(|c| c.is_ascii_digit()))
}

fn parse_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(v) => Some(*v),
        Value::Integer(0) => Some(false),
        Value::Integer(1) => Some(true),
        Value::Text(..) | Value::Binary(..) => {
            let v = value.as_str()?.trim();
            if v.eq_ignore_ascii_case("true") || v == "1" {
                Some(true)
            } else if v.eq_ignore_ascii_case("false") || v == "0" {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn decode_json(value: String) -> Value {
    let trimmed = value.trim();
    let looks_like_json = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if looks_like_json {
        if let Ok(json) = serde_json::from_str(trimmed) {
            return Value::Json(json);
        }
    }
    Value::Text(value)
}
