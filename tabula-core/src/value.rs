use std::fmt::{self, Display};

/// A single cell: either a value bound to a query or one read back from a row.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Text(String),
    Real(f64),
    Boolean(bool),
    Binary(Box<[u8]>),
    /// Structured value, stored as JSON text in text columns.
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Json(serde_json::Value::Null))
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Json(v) => v.as_i64(),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            Value::Json(v) => v.as_f64(),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            Value::Json(v) => v.as_bool(),
            _ => None,
        }
    }
    /// Textual content, also for binary values holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            Value::Binary(v) => std::str::from_utf8(v).ok(),
            Value::Json(v) => v.as_str(),
            _ => None,
        }
    }
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }
    /// JSON representation, binary values become arrays of bytes.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(v) => (*v).into(),
            Value::Text(v) => v.as_str().into(),
            Value::Real(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or_default(),
            Value::Boolean(v) => (*v).into(),
            Value::Binary(v) => v.to_vec().into(),
            Value::Json(v) => v.clone(),
        }
    }
    /// Short variant name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(..) => "integer",
            Value::Text(..) => "text",
            Value::Real(..) => "real",
            Value::Boolean(..) => "boolean",
            Value::Binary(..) => "binary",
            Value::Json(..) => "json",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Binary(v) => write!(f, "<{} bytes>", v.len()),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from_value {
    ($source:ty, $into:path $(, $conv:expr)? $(,)?) => {
        impl From<$source> for Value {
            fn from(value: $source) -> Self {
                $into($($conv)?(value))
            }
        }
    };
}

impl_from_value!(bool, Value::Boolean);
impl_from_value!(i8, Value::Integer, i64::from);
impl_from_value!(i16, Value::Integer, i64::from);
impl_from_value!(i32, Value::Integer, i64::from);
impl_from_value!(i64, Value::Integer);
impl_from_value!(u8, Value::Integer, i64::from);
impl_from_value!(u16, Value::Integer, i64::from);
impl_from_value!(u32, Value::Integer, i64::from);
impl_from_value!(f32, Value::Real, f64::from);
impl_from_value!(f64, Value::Real);
impl_from_value!(String, Value::Text);
impl_from_value!(&str, Value::Text, str::to_owned);
impl_from_value!(Box<[u8]>, Value::Binary);
impl_from_value!(Vec<u8>, Value::Binary, Vec::into_boxed_slice);
impl_from_value!(&[u8], Value::Binary, Box::<[u8]>::from);
impl_from_value!(serde_json::Value, Value::Json);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use serde_json::json;

    #[test]
    fn conversions() {
        assert_eq!(Value::from(7u8), Value::Integer(7));
        assert_eq!(Value::from(-3i32), Value::Integer(-3));
        assert_eq!(Value::from(1.5f32), Value::Real(1.5));
        assert_eq!(Value::from("abc"), Value::Text("abc".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(vec![1u8, 2]), Value::Binary([1, 2].into()));
        assert_eq!(Value::from(json!({"a": 1})).as_json(), Some(&json!({"a": 1})));
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::Integer(4).as_f64(), Some(4.0));
        assert_eq!(Value::Binary(b"hi".as_slice().into()).as_str(), Some("hi"));
        assert!(Value::Json(serde_json::Value::Null).is_null());
        assert_eq!(Value::Text("x".into()).as_i64(), None);
        assert_eq!(Value::Text("x".into()).to_string(), "\"x\"");
    }
}
