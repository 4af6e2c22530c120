use std::fmt;

/// A single column value, as read from a row or passed as a bound parameter.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Null value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed 64-bit integer
    Int(i64),

    /// Double precision float
    Float(f64),

    /// String value
    String(String),

    /// A list of values, only valid as a filter argument
    List(Vec<Value>),
}

impl Value {
    pub const fn null() -> Value {
        Value::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Returns `true` for the empty string.
    pub fn is_empty_string(&self) -> bool {
        matches!(self, Value::String(s) if s.is_empty())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Interprets the value as a number, parsing numeric-looking strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::String(v) => v.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Interprets the value as a record identifier.
    ///
    /// Integers are accepted as-is; strings must parse as a positive-or-zero
    /// integer. Null, empty strings and lists are never identifiers.
    pub fn to_id(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::String(v) if !v.is_empty() => v.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Renders the value as text, the way a text-affinity column stores it.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::List(_) => None,
            Value::Bool(v) => Some(if *v { "1" } else { "0" }.to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::String(v) => Some(v.clone()),
        }
    }

    pub fn take(&mut self) -> Value {
        std::mem::take(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "'{v}'"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Value {
        Value::Bool(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Value {
        Value::Int(src as i64)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Value {
        Value::Int(src)
    }
}

impl From<u32> for Value {
    fn from(src: u32) -> Value {
        Value::Int(src as i64)
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Value {
        Value::Float(src)
    }
}

impl From<String> for Value {
    fn from(src: String) -> Value {
        Value::String(src)
    }
}

impl From<&String> for Value {
    fn from(src: &String) -> Value {
        Value::String(src.clone())
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Value {
        Value::String(src.to_string())
    }
}

impl From<&Value> for Value {
    fn from(src: &Value) -> Value {
        src.clone()
    }
}

impl<T> From<Vec<T>> for Value
where
    Value: From<T>,
{
    fn from(src: Vec<T>) -> Value {
        Value::List(src.into_iter().map(Value::from).collect())
    }
}

impl<T, const N: usize> From<[T; N]> for Value
where
    Value: From<T>,
{
    fn from(src: [T; N]) -> Value {
        Value::List(src.into_iter().map(Value::from).collect())
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(value: Option<T>) -> Value {
        match value {
            Some(value) => Value::from(value),
            None => Value::Null,
        }
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Value::String(val) if val == other)
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        matches!(self, Value::String(val) if val == other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Value::Int(val) if val == other)
    }
}

impl PartialEq<Value> for &str {
    fn eq(&self, other: &Value) -> bool {
        other.eq(self)
    }
}

impl PartialEq<Value> for i64 {
    fn eq(&self, other: &Value) -> bool {
        other.eq(self)
    }
}
