use crate::common::document::Document;
use std::fmt::{Debug, Display, Formatter};

/// Compare two doubles for equality with NaN treated as equal to itself.
#[inline]
fn num_eq(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        true
    } else {
        a == b
    }
}

/// Represents a [Document] field value.
///
/// # Purpose
/// Unified representation of every value type the document model supports:
/// null, booleans, integers and doubles, strings, dates, arrays, and nested
/// documents.
///
/// # Characteristics
/// - **Numeric equality is cross-type**: `Value::Int(1) == Value::Double(1.0)`.
///   The wire protocol has a single "number" type; the integer/double split
///   only preserves precision on round-trips.
/// - **Dates** carry signed milliseconds since the unix epoch.
/// - **Serializable** with serde; documents are persisted as JSON rows.
///
/// # Usage
/// Create values using the `From` trait or the `val!` macro:
/// ```text
/// let v1: Value = 42i64.into();
/// let v2 = Value::from("hello");
/// let v3 = val!(true);
/// ```
#[derive(Clone, Default, serde::Deserialize, serde::Serialize)]
pub enum Value {
    /// Represents a null value.
    #[default]
    Null,
    /// Represents a boolean value.
    Bool(bool),
    /// Represents a 64-bit integer value.
    Int(i64),
    /// Represents a 64-bit floating point value.
    Double(f64),
    /// Represents a string value.
    String(String),
    /// Represents a date as milliseconds since the unix epoch.
    Date(i64),
    /// Represents an array value.
    Array(Vec<Value>),
    /// Represents a nested document.
    Document(Document),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            if self.is_number() && other.is_number() {
                return num_eq(a, b);
            }
        }

        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Returns the boolean value if the [Value] is [Value::Bool].
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer value if the [Value] is [Value::Int].
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the double value if the [Value] is [Value::Double].
    #[inline]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value if the [Value] is [Value::String].
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns epoch milliseconds if the [Value] is [Value::Date].
    #[inline]
    pub fn as_date(&self) -> Option<i64> {
        match self {
            Value::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the array value if the [Value] is [Value::Array].
    #[inline]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the nested document if the [Value] is [Value::Document].
    #[inline]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    /// Coerces the value to a double for numeric comparison.
    ///
    /// Integers and doubles convert directly; dates compare by their epoch
    /// milliseconds; strings parse if they spell a finite number. All other
    /// types do not coerce.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Date(v) => Some(*v as f64),
            Value::String(v) => match v.parse::<f64>() {
                Ok(n) if n.is_finite() => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    /// Checks if the [Value] is [Value::Null].
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Checks if the [Value] is an integer or double.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_))
    }

    /// Checks if the [Value] is [Value::String].
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Checks if the [Value] is [Value::Array].
    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Checks if the [Value] is [Value::Document].
    #[inline]
    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    /// Checks whether the value is falsy in the `$exists` sense: null, false,
    /// numeric zero, or the empty string.
    #[inline]
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(v) => !v,
            Value::Int(v) => *v == 0,
            Value::Double(v) => *v == 0.0,
            Value::String(v) => v.is_empty(),
            _ => false,
        }
    }

    /// Returns a short name for the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Document(_) => "object",
        }
    }

    /// Takes the value, replacing it with [Value::Null].
    pub fn take(&mut self) -> Value {
        std::mem::replace(self, Value::Null)
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "bool({})", v),
            Value::Int(v) => write!(f, "int({})", v),
            Value::Double(v) => write!(f, "double({})", v),
            Value::String(v) => write!(f, "string({:?})", v),
            Value::Date(v) => write!(f, "date({})", v),
            Value::Array(v) => {
                write!(f, "array(")?;
                f.debug_list().entries(v.iter()).finish()?;
                write!(f, ")")
            }
            Value::Document(v) => write!(f, "object({:?})", v),
        }
    }
}

impl Display for Value {
    /// Renders the value as compact JSON-like text.
    ///
    /// This rendering is also the fallback stringification used when sorting
    /// or range-comparing values of mismatched types, so it must stay
    /// deterministic.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Array(v) => {
                write!(f, "[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Document(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    #[inline]
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<f32> for Value {
    #[inline]
    fn from(value: f32) -> Self {
        Value::Double(value as f64)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(|v| v.into()).collect())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A macro to create a `Value` from a given expression.
///
/// # Examples
///
/// ```rust
/// use plugport::common::Value;
/// use plugport::val;
///
/// let int_value = val!(42i64);
/// assert_eq!(int_value, Value::Int(42));
///
/// let string_value = val!("hello");
/// assert_eq!(string_value, Value::String("hello".to_string()));
/// ```
#[macro_export]
macro_rules! val {
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
