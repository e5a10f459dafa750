/// Calls `f` for every value, writing `separator` between the values that produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Splits off the longest prefix of `input` whose chars satisfy `predicate`.
pub fn consume_while<'s>(input: &mut &'s str, mut predicate: impl FnMut(&char) -> bool) -> &'s str {
    let len = input
        .char_indices()
        .find(|(_, c)| !predicate(c))
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    let result = &input[..len];
    *input = &input[len..];
    result
}

/// Removes one layer of identifier quoting: `"name"`, `` `name` `` or `[name]`.
pub fn unquote_identifier(value: &str) -> &str {
    let value = value.trim();
    for (open, close) in [('"', '"'), ('`', '`'), ('[', ']'), ('\'', '\'')] {
        if value.len() >= 2 && value.starts_with(open) && value.ends_with(close) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Longest prefix of `value` not exceeding `max` bytes that ends on a char boundary, and
/// whether something was cut.
pub fn truncate_str(value: &str, max: usize) -> (&str, bool) {
    if value.len() <= max {
        return (value, false);
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    (&value[..end], true)
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {{
        let value: &str = &$query;
        let (head, truncated) = $crate::truncate_str(value, 497);
        format!("{}{}", head.trim_end(), if truncated { "..." } else { "" })
    }};
}

/// Builds a `Vec<(String, Value)>` out of `key => value` pairs.
///
/// ```
/// use tabula_core::{Value, values};
/// let row = values! { "symbol" => "RHAT", "qty" => 100 };
/// assert_eq!(row[1], ("qty".to_string(), Value::Integer(100)));
/// ```
#[macro_export]
macro_rules! values {
    ($($key:expr => $value:expr),* $(,)?) => {
        ::std::vec![$((::std::string::String::from($key), $crate::Value::from($value))),*]
    };
}
