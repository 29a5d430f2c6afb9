//! Core value model and rule type tags
//!
//! This module defines the runtime values that rules are checked against and
//! the closed set of rule types the engine dispatches on.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Value Enum - Runtime values to be validated
// ============================================================================

/// Runtime value that can be validated
///
/// A field that is missing from its parent object is not represented by a
/// variant; the engine passes `Option<&Value>` and uses `None` for absence.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (i64)
    Int(i64),
    /// Float value (f64)
    Float(f64),
    /// String value
    String(String),
    /// List/Array of values
    List(Vec<Value>),
    /// Object/Dictionary (key-value pairs, insertion ordered)
    Object(Vec<(String, Value)>),
    /// Point in time
    Date(DateTime<Utc>),
    /// Compiled regular expression
    Regex(RegexValue),
    /// Callable value
    Method(MethodRef),
}

impl Value {
    /// Get human-readable type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "array",
            Self::Object(_) => "object",
            Self::Date(_) => "date",
            Self::Regex(_) => "regexp",
            Self::Method(_) => "method",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Loose truthiness: null, false, zero, NaN and the empty string are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Numeric view of `Int` and `Float` values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String view of `String` values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a direct child: an object key or an array index.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Self::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Object keys, or array indices rendered as strings. Scalars have no keys.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Self::Object(pairs) => pairs.iter().map(|(k, _)| k.clone()).collect(),
            Self::List(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Replace (or append) an object entry, or replace an existing array
    /// element. Other values are left untouched.
    pub fn set(&mut self, key: &str, value: Value) {
        match self {
            Self::Object(pairs) => match pairs.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value,
                None => pairs.push((key.to_string(), value)),
            },
            Self::List(items) => {
                if let Some(slot) = key.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    *slot = value;
                }
            }
            _ => {}
        }
    }

    /// Build an object from key-value pairs
    pub fn object<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(n) => write!(f, "{}", format_number(*n)),
            Self::String(s) => write!(f, "{}", s),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
            Self::Object(_) => write!(f, "[object Object]"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
            Self::Method(m) => write!(f, "function {}", m.name()),
        }
    }
}

/// Render a number without a trailing `.0` when it is whole
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Regex and callable wrappers
// ============================================================================

/// A regular expression held as data. Equality compares source text.
#[derive(Debug, Clone)]
pub struct RegexValue(pub Regex);

impl RegexValue {
    /// Source text of the expression
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for RegexValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

type MethodFn = dyn Fn(&[Value]) -> Value + Send + Sync;

/// A named callable. Equality is identity of the underlying closure.
#[derive(Clone)]
pub struct MethodRef {
    name: String,
    func: Arc<MethodFn>,
}

impl MethodRef {
    /// Wrap a closure as a callable value
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Name given at construction
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the callable
    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRef").field("name", &self.name).finish()
    }
}

// ============================================================================
// RuleType - dispatch tag for type checkers
// ============================================================================

/// Rule type tag used to select a type checker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleType {
    String,
    Number,
    Boolean,
    /// Callable value
    Method,
    Regexp,
    Integer,
    Float,
    Array,
    Object,
    Enum,
    Date,
    Url,
    Hex,
    Email,
    Pattern,
    Any,
    /// Caller-registered type; only valid once a checker is registered for it
    Custom(String),
}

impl RuleType {
    /// All built-in tags, in declaration order
    pub const BUILTIN: [RuleType; 16] = [
        RuleType::String,
        RuleType::Number,
        RuleType::Boolean,
        RuleType::Method,
        RuleType::Regexp,
        RuleType::Integer,
        RuleType::Float,
        RuleType::Array,
        RuleType::Object,
        RuleType::Enum,
        RuleType::Date,
        RuleType::Url,
        RuleType::Hex,
        RuleType::Email,
        RuleType::Pattern,
        RuleType::Any,
    ];

    /// Tag string, as used in message paths (`types.<name>`)
    pub fn name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Method => "method",
            Self::Regexp => "regexp",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Array => "array",
            Self::Object => "object",
            Self::Enum => "enum",
            Self::Date => "date",
            Self::Url => "url",
            Self::Hex => "hex",
            Self::Email => "email",
            Self::Pattern => "pattern",
            Self::Any => "any",
            Self::Custom(name) => name,
        }
    }

    /// Types whose empty string counts as an empty value
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Url | Self::Hex | Self::Email | Self::Date | Self::Pattern
        )
    }

    /// Types that may carry nested `fields` / `default_field` rules
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }
}

impl FromStr for RuleType {
    type Err = std::convert::Infallible;

    /// Unknown names map to [`RuleType::Custom`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::BUILTIN
            .iter()
            .find(|t| t.name() == s)
            .cloned()
            .unwrap_or_else(|| Self::Custom(s.to_string())))
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Conversions
// ============================================================================

#[cfg(feature = "serde")]
impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            Value::Regex(re) => serde_json::Value::String(re.as_str().to_string()),
            Value::Method(_) => serde_json::Value::Null,
        }
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
