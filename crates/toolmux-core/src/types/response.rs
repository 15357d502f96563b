//! Response-style wire types
//!
//! Items are modelled loosely: the ones the orchestrator reads or writes are
//! typed, everything else is carried as raw JSON so that a history survives
//! a round trip through this crate untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::MessageRole;

/// An input or output item of a response-style exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseItem {
    /// Item with a `type` tag this crate understands
    Typed(TypedItem),
    /// Untagged `{role, content}` shorthand accepted as input
    Message(InputMessage),
    /// Anything else (reasoning items, built-in tool calls, ...)
    Raw(Value),
}

impl ResponseItem {
    /// A `{role: "user", content: text}` input message
    pub fn user(text: impl Into<String>) -> Self {
        Self::message(MessageRole::User, text)
    }

    /// A `{role, content}` input message
    pub fn message(role: MessageRole, text: impl Into<String>) -> Self {
        ResponseItem::Message(InputMessage {
            role,
            content: ResponseContent::Text(text.into()),
            extra: Map::new(),
        })
    }

    /// A `function_call_output` item answering `call_id`
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        ResponseItem::Typed(TypedItem::FunctionCallOutput(FunctionCallOutputItem {
            id: None,
            call_id: call_id.into(),
            output: output.into(),
            extra: Map::new(),
        }))
    }

    /// The function call carried by this item, if it is one
    pub fn as_function_call(&self) -> Option<&FunctionCallItem> {
        match self {
            ResponseItem::Typed(TypedItem::FunctionCall(call)) => Some(call),
            _ => None,
        }
    }
}

/// Items distinguished by their `type` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedItem {
    Message(MessageItem),
    FunctionCall(FunctionCallItem),
    FunctionCallOutput(FunctionCallOutputItem),
}

/// `{role, content}` message without a `type` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMessage {
    pub role: MessageRole,
    pub content: ResponseContent,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `type: "message"` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: MessageRole,
    pub content: ResponseContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `type: "function_call"` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub name: String,
    /// JSON-encoded string, or an object from some routing layers
    #[serde(default)]
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `type: "function_call_output"` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallOutputItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub output: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message content: plain text or a list of typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseContent {
    Text(String),
    Parts(Vec<Value>),
}

impl ResponseContent {
    /// Text of the content, joining `input_text`/`output_text`/`text` parts
    pub fn text(&self) -> String {
        match self {
            ResponseContent::Text(text) => text.clone(),
            ResponseContent::Parts(parts) => parts
                .iter()
                .filter(|p| {
                    matches!(
                        p.get("type").and_then(Value::as_str),
                        Some("input_text" | "output_text" | "text")
                    )
                })
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// `input` of a response-style call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseInput {
    Text(String),
    Items(Vec<ResponseItem>),
}

impl ResponseInput {
    /// Item list form; plain text becomes a single user message
    pub fn into_items(self) -> Vec<ResponseItem> {
        match self {
            ResponseInput::Text(text) => vec![ResponseItem::user(text)],
            ResponseInput::Items(items) => items,
        }
    }
}

impl From<&str> for ResponseInput {
    fn from(text: &str) -> Self {
        ResponseInput::Text(text.to_string())
    }
}

impl From<String> for ResponseInput {
    fn from(text: String) -> Self {
        ResponseInput::Text(text)
    }
}

impl From<Vec<ResponseItem>> for ResponseInput {
    fn from(items: Vec<ResponseItem>) -> Self {
        ResponseInput::Items(items)
    }
}

/// Response object returned by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Vec<ResponseItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    pub fn new(id: impl Into<String>, model: impl Into<String>, output: Vec<ResponseItem>) -> Self {
        Self {
            id: id.into(),
            object: Some("response".to_string()),
            model: model.into(),
            status: Some("completed".to_string()),
            output,
            previous_response_id: None,
            extra: Map::new(),
        }
    }

    /// Function-call items, in output order
    pub fn function_calls(&self) -> Vec<&FunctionCallItem> {
        self.output
            .iter()
            .filter_map(ResponseItem::as_function_call)
            .collect()
    }

    /// Concatenated text of all assistant message items
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                ResponseItem::Typed(TypedItem::Message(m)) => Some(m.content.text()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}
