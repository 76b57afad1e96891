use std::fmt::Display;

/// A run-time value. The language has exactly three kinds: booleans,
/// non-negative decimal integers, and text. There are no floats, lists, or
/// nulls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Text(String),
}

impl Value {
    /// Literal typing for bare (unquoted) token text: `true`/`false` become
    /// booleans, a run of decimal digits becomes an integer, anything else is
    /// text. Quoted strings never pass through here; they are always text.
    pub fn from_bare_token(raw: &str) -> Value {
        match raw {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => match raw.parse::<i64>() {
                Ok(n) if raw.chars().all(|ch| ch.is_ascii_digit()) => Value::Integer(n),
                _ => Value::Text(raw.to_string()),
            },
        }
    }
    /// `IF` truthiness: nothing but an exact boolean `true` counts.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(true) => f.write_str("true"),
            Value::Boolean(false) => f.write_str("false"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Text(text) => f.write_str(text),
        }
    }
}
