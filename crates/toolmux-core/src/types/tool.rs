//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::arguments::ToolArguments;

/// Keys a declaration may use for its parameter schema, in lookup order
const PARAMETER_KEYS: [&str; 4] = ["parameters", "params_json_schema", "input_schema", "inputSchema"];

/// Wire shape a completion style expects tool declarations in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStyle {
    /// `{"type": "function", "function": {name, description, parameters}}`
    Chat,
    /// `{"type": "function", name, description, parameters}`
    Response,
}

/// Tool declaration in the flat shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the input parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolSchema {
    /// Create a new tool declaration
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters: None,
        }
    }

    /// Set the parameter schema
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Normalize a declaration in either the flat or the nested shape.
    ///
    /// Returns `None` when the declaration has no usable name.
    pub fn normalize(declaration: &Value) -> Option<Self> {
        let body = declaration.get("function").unwrap_or(declaration);
        let name = body.get("name")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }

        let description = body
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let parameters = PARAMETER_KEYS
            .iter()
            .filter_map(|key| body.get(*key))
            .find(|v| !v.is_null())
            .cloned();

        Some(Self {
            name: name.to_string(),
            description,
            parameters,
        })
    }

    /// Render the declaration in the shape `style` expects
    pub fn to_wire(&self, style: ToolStyle) -> Value {
        let mut flat = Map::new();
        flat.insert("name".into(), Value::String(self.name.clone()));
        if let Some(ref description) = self.description {
            flat.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(ref parameters) = self.parameters {
            flat.insert("parameters".into(), parameters.clone());
        }

        match style {
            ToolStyle::Chat => json!({ "type": "function", "function": Value::Object(flat) }),
            ToolStyle::Response => {
                let mut wire = Map::new();
                wire.insert("type".into(), Value::String("function".into()));
                wire.extend(flat);
                Value::Object(wire)
            }
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    /// Identifier the result must reference
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Parsed arguments
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Output of a tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
}

impl ToolOutput {
    /// String form injected into the conversation: strings verbatim,
    /// anything else JSON-encoded.
    pub fn to_wire_string(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Json(Value::String(text)) => text.clone(),
            ToolOutput::Json(value) => value.to_string(),
        }
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ToolOutput::Text(text),
            other => ToolOutput::Json(other),
        }
    }
}

/// Result of one dispatched tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    /// ID of the tool call this is responding to
    pub request_id: String,
    /// Name of the tool that produced it
    pub name: String,
    pub output: ToolOutput,
    /// Whether this result represents a contained failure
    pub is_error: bool,
}

impl ToolCallResult {
    /// Create a successful tool result
    pub fn success(request: &ToolCallRequest, output: impl Into<ToolOutput>) -> Self {
        Self {
            request_id: request.id.clone(),
            name: request.name.clone(),
            output: output.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(request: &ToolCallRequest, message: impl Into<String>) -> Self {
        Self {
            request_id: request.id.clone(),
            name: request.name.clone(),
            output: ToolOutput::Text(message.into()),
            is_error: true,
        }
    }
}
