//! Completion backend trait and request shapes
//!
//! A request carries the semantic parameters every backend understands
//! plus the caller's remaining options, passed through untouched. The
//! credential is only filled in for routed calls and is never serialized.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::ProviderResult;
use crate::types::{ChatCompletion, ChatMessage, EmbeddingResponse, Response, ResponseItem};

/// Chat-style request: `{model, messages, tools?, ...options}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Pass-through options (`tool_choice`, `temperature`, ...)
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            api_key: None,
            options: Map::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Option value by key
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}

/// Response-style request: `{model, input, tools?, previous_response_id?, ...options}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRequest {
    pub model: String,
    pub input: Vec<ResponseItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ResponseRequest {
    pub fn new(model: impl Into<String>, input: Vec<ResponseItem>) -> Self {
        Self {
            model: model.into(),
            input,
            tools: None,
            previous_response_id: None,
            api_key: None,
            options: Map::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_previous_response_id(mut self, id: impl Into<String>) -> Self {
        self.previous_response_id = Some(id.into());
        self
    }

    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}

/// Embedding request: `{model, input, ...options}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    /// A string or an array of strings / token arrays
    pub input: Value,
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl EmbeddingRequest {
    pub fn new(model: impl Into<String>, input: Value) -> Self {
        Self {
            model: model.into(),
            input,
            api_key: None,
            options: Map::new(),
        }
    }

    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// A backend able to serve the three completion flavors
///
/// Implemented by the native OpenAI-compatible client, the multi-provider
/// routing layer and the scripted mock used in tests.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    async fn chat_completion(&self, request: ChatRequest) -> ProviderResult<ChatCompletion>;

    async fn create_response(&self, request: ResponseRequest) -> ProviderResult<Response>;

    async fn create_embedding(&self, request: EmbeddingRequest)
        -> ProviderResult<EmbeddingResponse>;
}
