//! Inbound call shapes
//!
//! A call is the model id, the conversation payload, the tool servers and
//! caller tool declarations to use, a strictness flag, and whatever other
//! options the caller passed. The options go to the backend unchanged apart
//! from the reserved keys below.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::Logger;
use crate::mcp::ToolServer;
use crate::types::{ChatMessage, ResponseInput};

/// Keys the orchestrator owns; they are never passed through as options
pub const RESERVED_KEYS: [&str; 7] = [
    "model",
    "messages",
    "input",
    "tools",
    "mcp_servers",
    "mcp_strict",
    "stream",
];

/// Remove reserved keys from pass-through options
pub fn clean_options(mut options: Map<String, Value>, logger: &Arc<dyn Logger>) -> Map<String, Value> {
    if let Some(stream) = options.remove("stream") {
        if stream != Value::Bool(false) {
            logger.warn("[ToolClient] Streaming is not supported with tool orchestration, ignoring 'stream'");
        }
    }
    for key in RESERVED_KEYS {
        options.remove(key);
    }
    options
}

fn take_required<T: DeserializeOwned>(kwargs: &mut Map<String, Value>, key: &str) -> OrchestratorResult<T> {
    let value = kwargs
        .remove(key)
        .ok_or_else(|| OrchestratorError::InvalidRequest(format!("missing '{}'", key)))?;
    serde_json::from_value(value)
        .map_err(|e| OrchestratorError::InvalidRequest(format!("invalid '{}': {}", key, e)))
}

fn take_tools(kwargs: &mut Map<String, Value>) -> OrchestratorResult<Vec<Value>> {
    match kwargs.remove("tools") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(tools)) => Ok(tools),
        Some(_) => Err(OrchestratorError::InvalidRequest("'tools' must be an array".into())),
    }
}

fn take_strict(kwargs: &mut Map<String, Value>) -> bool {
    kwargs
        .remove("mcp_strict")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// A chat-style call
#[derive(Debug, Clone, Default)]
pub struct ChatCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Caller tool declarations, in either shape
    pub tools: Vec<Value>,
    pub tool_servers: Vec<Arc<dyn ToolServer>>,
    /// Rewrite server tool schemas into strict form
    pub strict: bool,
    pub options: Map<String, Value>,
}

impl ChatCall {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Read a call from keyword arguments (`model`, `messages`, `tools`,
    /// `mcp_strict`, and options)
    pub fn from_kwargs(mut kwargs: Map<String, Value>) -> OrchestratorResult<Self> {
        Ok(Self {
            model: take_required(&mut kwargs, "model")?,
            messages: take_required(&mut kwargs, "messages")?,
            tools: take_tools(&mut kwargs)?,
            tool_servers: Vec::new(),
            strict: take_strict(&mut kwargs),
            options: kwargs,
        })
    }

    pub fn tool(mut self, declaration: Value) -> Self {
        self.tools.push(declaration);
        self
    }

    pub fn server(mut self, server: Arc<dyn ToolServer>) -> Self {
        self.tool_servers.push(server);
        self
    }

    pub fn servers(mut self, servers: impl IntoIterator<Item = Arc<dyn ToolServer>>) -> Self {
        self.tool_servers.extend(servers);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// A response-style call
#[derive(Debug, Clone)]
pub struct ResponseCall {
    pub model: String,
    pub input: ResponseInput,
    pub tools: Vec<Value>,
    pub tool_servers: Vec<Arc<dyn ToolServer>>,
    pub strict: bool,
    pub options: Map<String, Value>,
}

impl ResponseCall {
    pub fn new(model: impl Into<String>, input: impl Into<ResponseInput>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            tools: Vec::new(),
            tool_servers: Vec::new(),
            strict: false,
            options: Map::new(),
        }
    }

    /// Read a call from keyword arguments (`model`, `input`, `tools`,
    /// `mcp_strict`, and options such as `previous_response_id`)
    pub fn from_kwargs(mut kwargs: Map<String, Value>) -> OrchestratorResult<Self> {
        Ok(Self {
            model: take_required(&mut kwargs, "model")?,
            input: take_required(&mut kwargs, "input")?,
            tools: take_tools(&mut kwargs)?,
            tool_servers: Vec::new(),
            strict: take_strict(&mut kwargs),
            options: kwargs,
        })
    }

    pub fn tool(mut self, declaration: Value) -> Self {
        self.tools.push(declaration);
        self
    }

    pub fn server(mut self, server: Arc<dyn ToolServer>) -> Self {
        self.tool_servers.push(server);
        self
    }

    pub fn servers(mut self, servers: impl IntoIterator<Item = Arc<dyn ToolServer>>) -> Self {
        self.tool_servers.extend(servers);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// An embedding call; routed by provider only
#[derive(Debug, Clone)]
pub struct EmbeddingCall {
    pub model: String,
    pub input: Value,
    pub options: Map<String, Value>,
}

impl EmbeddingCall {
    pub fn new(model: impl Into<String>, input: Value) -> Self {
        Self {
            model: model.into(),
            input,
            options: Map::new(),
        }
    }

    pub fn from_kwargs(mut kwargs: Map<String, Value>) -> OrchestratorResult<Self> {
        Ok(Self {
            model: take_required(&mut kwargs, "model")?,
            input: take_required(&mut kwargs, "input")?,
            options: kwargs,
        })
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger};
    use serde_json::json;

    fn kwargs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_chat_call_from_kwargs() {
        let call = ChatCall::from_kwargs(kwargs(json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}],
            "tools": [{"name": "f"}],
            "mcp_strict": true,
            "temperature": 0.1
        })))
        .unwrap();

        assert_eq!(call.model, "gpt-4o");
        assert_eq!(call.messages.len(), 1);
        assert_eq!(call.tools.len(), 1);
        assert!(call.strict);
        assert_eq!(call.options.len(), 1);
        assert_eq!(call.options["temperature"], 0.1);
    }

    #[test]
    fn test_missing_or_bad_fields() {
        assert!(matches!(
            ChatCall::from_kwargs(kwargs(json!({"messages": []}))),
            Err(OrchestratorError::InvalidRequest(ref m)) if m == "missing 'model'"
        ));
        assert!(matches!(
            ResponseCall::from_kwargs(kwargs(json!({"model": "gpt-4o", "input": "x", "tools": {}}))),
            Err(OrchestratorError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_response_call_text_input() {
        let call = ResponseCall::from_kwargs(kwargs(json!({
            "model": "gpt-4o",
            "input": "hello",
            "previous_response_id": "resp_1"
        })))
        .unwrap();
        assert_eq!(call.input, ResponseInput::Text("hello".into()));
        assert_eq!(call.options["previous_response_id"], "resp_1");
    }

    #[test]
    fn test_clean_options_strips_reserved_keys() {
        let memory = Arc::new(MemoryLogger::new());
        let logger: Arc<dyn Logger> = memory.clone();
        let cleaned = clean_options(
            kwargs(json!({
                "model": "x",
                "mcp_servers": [],
                "mcp_strict": false,
                "stream": true,
                "tool_choice": "required",
                "user": "u-1"
            })),
            &logger,
        );

        let keys: Vec<_> = cleaned.keys().map(String::as_str).collect();
        assert_eq!(cleaned.len(), 2);
        assert!(keys.contains(&"tool_choice"));
        assert!(keys.contains(&"user"));
        assert!(memory.contains(LogLevel::Warn, "stream"));
    }
}
