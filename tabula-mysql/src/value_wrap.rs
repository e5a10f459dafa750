use tabula_core::Value;

pub(crate) struct ValueWrap(pub(crate) Value);

impl From<Value> for ValueWrap {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<ValueWrap> for Value {
    fn from(value: ValueWrap) -> Self {
        value.0
    }
}

impl mysql_async::prelude::FromValue for ValueWrap {
    type Intermediate = ValueWrap;
}

impl TryFrom<mysql_async::Value> for ValueWrap {
    type Error = mysql_async::FromValueError;

    fn try_from(value: mysql_async::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            mysql_async::Value::NULL => Value::Null,
            mysql_async::Value::Bytes(v) => match String::from_utf8(v) {
                Ok(v) => Value::Text(v),
                Err(e) => Value::Binary(e.into_bytes().into()),
            },
            mysql_async::Value::Int(v) => Value::Integer(v),
            mysql_async::Value::UInt(v) => match i64::try_from(v) {
                Ok(v) => Value::Integer(v),
                Err(..) => Value::Real(v as f64),
            },
            mysql_async::Value::Float(v) => Value::Real(v.into()),
            mysql_async::Value::Double(v) => Value::Real(v),
            mysql_async::Value::Date(year, month, day, hour, minute, second, micro) => {
                let mut v = format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                );
                if micro != 0 {
                    v.push_str(&format!(".{micro:06}"));
                }
                Value::Text(v)
            }
            mysql_async::Value::Time(negative, days, hours, minutes, seconds, micro) => {
                let hours = days * 24 + u32::from(hours);
                let mut v = format!(
                    "{}{hours:02}:{minutes:02}:{seconds:02}",
                    if negative { "-" } else { "" }
                );
                if micro != 0 {
                    v.push_str(&format!(".{micro:06}"));
                }
                Value::Text(v)
            }
        }
        .into())
    }
}

impl From<ValueWrap> for mysql_async::Value {
    fn from(value: ValueWrap) -> Self {
        type MySqlValue = mysql_async::Value;
        match value.0 {
            Value::Null => MySqlValue::NULL,
            Value::Integer(v) => MySqlValue::from(v),
            Value::Text(v) => MySqlValue::from(v),
            Value::Real(v) => MySqlValue::from(v),
            Value::Boolean(v) => MySqlValue::from(v),
            Value::Binary(v) => MySqlValue::Bytes(v.into_vec()),
            Value::Json(v) => MySqlValue::from(v.to_string()),
        }
    }
}
