//! Parameter values, declared parameter types and wire-name conversion

use serde_json::Value;
use std::fmt;

use crate::error::{ApiError, Result};
use crate::types::{PublishStep, SigningOptions};

/// Type a descriptor declares for one of its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    List,
    Signing,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::List => "list",
            ParamType::Signing => "signing options",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file attached to an upload call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl FilePayload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// A caller-supplied argument
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Absent; dropped from the request
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Signing(SigningOptions),
    File(FilePayload),
}

impl ParamValue {
    /// Name of the runtime type, used in validation errors
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Str(_) => "string",
            ParamValue::List(_) => "list",
            ParamValue::Signing(_) => "signing options",
            ParamValue::File(_) => "file",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    fn matches(&self, declared: ParamType) -> bool {
        matches!(
            (self, declared),
            (ParamValue::Str(_), ParamType::String)
                | (ParamValue::Int(_), ParamType::Integer)
                | (ParamValue::Bool(_), ParamType::Boolean)
                | (ParamValue::List(_), ParamType::List)
                | (ParamValue::Signing(_), ParamType::Signing)
        )
    }

    /// JSON form used in request bodies
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Null | ParamValue::File(_) => Value::Null,
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::from(*i),
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::List(items) => Value::Array(items.clone()),
            ParamValue::Signing(options) => options.to_json(),
        }
    }

    /// Scalar form used in query strings.
    ///
    /// aptly reads boolean flags as `1`, so booleans are sent as digits.
    pub fn to_query(&self) -> String {
        match self {
            ParamValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Str(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<&String> for ParamValue {
    fn from(v: &String) -> Self {
        ParamValue::Str(v.clone())
    }
}

impl From<Vec<Value>> for ParamValue {
    fn from(v: Vec<Value>) -> Self {
        ParamValue::List(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::List(v.into_iter().map(Value::String).collect())
    }
}

impl From<&[String]> for ParamValue {
    fn from(v: &[String]) -> Self {
        ParamValue::List(v.iter().cloned().map(Value::String).collect())
    }
}

impl From<&[PublishStep]> for ParamValue {
    fn from(v: &[PublishStep]) -> Self {
        ParamValue::List(v.iter().map(PublishStep::to_json).collect())
    }
}

impl From<SigningOptions> for ParamValue {
    fn from(v: SigningOptions) -> Self {
        ParamValue::Signing(v)
    }
}

impl From<FilePayload> for ParamValue {
    fn from(v: FilePayload) -> Self {
        ParamValue::File(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

/// Convert a `lower_snake_case` keyword to the wire convention
/// (`default_component` -> `DefaultComponent`).
///
/// Only the first letter of each word is touched, so feeding an already
/// converted name back in returns it unchanged.
pub fn snake_to_camel(name: &str) -> String {
    name.split('_').map(capitalize).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Check `value` against the declared type of parameter `name`.
///
/// Booleans are accepted (as 0/1) where an integer is declared; every other
/// mismatch is rejected.
pub fn coerce(name: &str, value: ParamValue, declared: ParamType) -> Result<ParamValue> {
    match (declared, value) {
        (ParamType::Integer, ParamValue::Bool(b)) => Ok(ParamValue::Int(i64::from(b))),
        (declared, value) if value.matches(declared) => Ok(value),
        (declared, value) => Err(ApiError::TypeMismatch {
            param: name.to_string(),
            expected: declared.as_str(),
            actual: value.type_name(),
        }),
    }
}
