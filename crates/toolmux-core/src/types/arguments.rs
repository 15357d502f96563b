//! Validated tool-call arguments

use serde_json::{Map, Value};
use thiserror::Error;

/// Why a set of arguments was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("arguments are not valid JSON: {0}")]
    Malformed(String),

    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required argument '{0}'")]
    MissingRequired(String),

    #[error("argument '{name}' should be {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: &'static str,
    },

    #[error("unexpected argument '{0}'")]
    Unexpected(String),
}

/// Keyword arguments of a tool call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse arguments as emitted by a model: a JSON-encoded object string
    /// or an already-decoded object. Blank strings mean "no arguments".
    pub fn parse(raw: &Value) -> Result<Self, ArgumentError> {
        match raw {
            Value::Object(map) => Ok(Self(map.clone())),
            Value::Null => Ok(Self::new()),
            Value::String(text) if text.trim().is_empty() => Ok(Self::new()),
            Value::String(text) => {
                let decoded: Value = serde_json::from_str(text)
                    .map_err(|e| ArgumentError::Malformed(e.to_string()))?;
                match decoded {
                    Value::Object(map) => Ok(Self(map)),
                    other => Err(ArgumentError::NotAnObject(json_type(&other))),
                }
            }
            other => Err(ArgumentError::NotAnObject(json_type(other))),
        }
    }

    /// Check these arguments against a declared parameter schema.
    ///
    /// Only object schemas are checked: required keys, primitive property
    /// types, and unknown keys when `additionalProperties` is `false`.
    pub fn validate(&self, schema: &Value) -> Result<(), ArgumentError> {
        if schema.get("type").and_then(Value::as_str) != Some("object") {
            return Ok(());
        }

        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                if !self.0.contains_key(key) {
                    return Err(ArgumentError::MissingRequired(key.to_string()));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

        for (name, value) in &self.0 {
            let declared = properties.and_then(|p| p.get(name));
            match declared {
                Some(property) => check_type(name, property, value)?,
                None if closed => return Err(ArgumentError::Unexpected(name.clone())),
                None => {}
            }
        }

        Ok(())
    }

    /// Get an argument by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get an argument as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Get an argument as an i64
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_i64())
    }

    /// Get an argument as an f64
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(|v| v.as_f64())
    }

    /// Get an argument as a bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(|v| v.as_bool())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Arguments as a JSON object value
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for ToolArguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn check_type(name: &str, property: &Value, value: &Value) -> Result<(), ArgumentError> {
    let expected: Vec<&str> = match property.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
        _ => return Ok(()),
    };

    if expected.iter().any(|t| matches_type(t, value)) {
        Ok(())
    } else {
        Err(ArgumentError::TypeMismatch {
            name: name.to_string(),
            expected: expected.join(" | "),
            actual: json_type(value),
        })
    }
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        // Unknown type keywords are not ours to enforce
        _ => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
