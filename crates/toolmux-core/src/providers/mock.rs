//! Mock backend for testing
//!
//! Serves scripted replies in order without network dependencies, then
//! falls back to a configurable mode once the script runs out. Every request
//! is recorded so tests can inspect exactly what was sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatRequest, CompletionBackend, EmbeddingRequest, ResponseRequest};
use crate::logging::Logger;
use crate::types::{
    ChatCompletion, ChatMessage, ChatToolCall, Embedding, EmbeddingResponse, FunctionCallItem,
    MessageItem, MessageRole, Response, ResponseContent, ResponseItem, TypedItem,
};

/// What to answer once the script is exhausted
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Return a fixed text
    Fixed(String),
    /// Repeat the last scripted reply forever
    RepeatLast,
    /// Fail every call
    Error(String),
}

/// Scripted completion backend
pub struct MockBackend {
    mode: MockMode,
    chat_script: Mutex<VecDeque<ChatCompletion>>,
    response_script: Mutex<VecDeque<Response>>,
    last_chat: Mutex<Option<ChatCompletion>>,
    last_response: Mutex<Option<Response>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    response_requests: Mutex<Vec<ResponseRequest>>,
    embedding_requests: Mutex<Vec<EmbeddingRequest>>,
    counter: AtomicUsize,
    logger: Arc<dyn Logger>,
}

impl MockBackend {
    /// Create an echo backend with an empty script
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            mode: MockMode::Echo,
            chat_script: Mutex::new(VecDeque::new()),
            response_script: Mutex::new(VecDeque::new()),
            last_chat: Mutex::new(None),
            last_response: Mutex::new(None),
            chat_requests: Mutex::new(Vec::new()),
            response_requests: Mutex::new(Vec::new()),
            embedding_requests: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            logger,
        }
    }

    pub fn with_mode(mut self, mode: MockMode) -> Self {
        self.mode = mode;
        self
    }

    /// Queue chat replies, served in order
    pub fn with_chat_replies(self, replies: impl IntoIterator<Item = ChatCompletion>) -> Self {
        self.chat_script.lock().extend(replies);
        self
    }

    /// Queue response replies, served in order
    pub fn with_response_replies(self, replies: impl IntoIterator<Item = Response>) -> Self {
        self.response_script.lock().extend(replies);
        self
    }

    /// Chat requests received so far
    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().clone()
    }

    /// Response requests received so far
    pub fn response_requests(&self) -> Vec<ResponseRequest> {
        self.response_requests.lock().clone()
    }

    /// Embedding requests received so far
    pub fn embedding_requests(&self) -> Vec<EmbeddingRequest> {
        self.embedding_requests.lock().clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-mock-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn fallback_text(&self, last_user: Option<String>) -> ProviderResult<String> {
        match &self.mode {
            MockMode::Echo => Ok(last_user.unwrap_or_else(|| "Hello from MockBackend!".to_string())),
            MockMode::Fixed(text) => Ok(text.clone()),
            MockMode::Error(message) => Err(ProviderError::Other(message.clone())),
            MockMode::RepeatLast => Err(ProviderError::Other(
                "mock script is empty and nothing to repeat".to_string(),
            )),
        }
    }
}

fn last_user_text(messages: &[ChatMessage]) -> Option<String> {
    messages
        .iter()
        .rev()
        .filter(|m| m.role == MessageRole::User)
        .map(ChatMessage::joined_text)
        .find(|t| !t.is_empty())
}

fn last_user_input(items: &[ResponseItem]) -> Option<String> {
    items.iter().rev().find_map(|item| match item {
        ResponseItem::Message(m) if m.role == MessageRole::User => Some(m.content.text()),
        ResponseItem::Typed(TypedItem::Message(m)) if m.role == MessageRole::User => {
            Some(m.content.text())
        }
        _ => None,
    })
}

/// A completion whose message requests `calls` (`(id, name, arguments)`)
pub fn chat_tool_calls(id: &str, calls: &[(&str, &str, Value)]) -> ChatCompletion {
    let tool_calls = calls
        .iter()
        .map(|(call_id, name, args)| ChatToolCall::function(*call_id, *name, args))
        .collect();
    ChatCompletion::from_message(id, "mock", ChatMessage::assistant_tool_calls(tool_calls))
}

/// A plain text completion
pub fn chat_text(id: &str, text: &str) -> ChatCompletion {
    ChatCompletion::from_message(id, "mock", ChatMessage::assistant(text))
}

/// A response whose output requests `calls` (`(call_id, name, arguments)`)
pub fn response_function_calls(id: &str, calls: &[(&str, &str, Value)]) -> Response {
    let output = calls
        .iter()
        .map(|(call_id, name, args)| {
            ResponseItem::Typed(TypedItem::FunctionCall(FunctionCallItem {
                id: Some(format!("fc_{}", call_id)),
                call_id: call_id.to_string(),
                name: name.to_string(),
                arguments: Value::String(args.to_string()),
                status: Some("completed".to_string()),
                extra: Map::new(),
            }))
        })
        .collect();
    Response::new(id, "mock", output)
}

/// A response with one assistant text message
pub fn response_text(id: &str, text: &str) -> Response {
    let item = ResponseItem::Typed(TypedItem::Message(MessageItem {
        id: Some(format!("msg_{}", id)),
        role: MessageRole::Assistant,
        content: ResponseContent::Parts(vec![json!({"type": "output_text", "text": text})]),
        status: Some("completed".to_string()),
        extra: Map::new(),
    }));
    Response::new(id, "mock", vec![item])
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat_completion(&self, request: ChatRequest) -> ProviderResult<ChatCompletion> {
        self.logger.debug(&format!(
            "[MockBackend] chat_completion with {} messages",
            request.messages.len()
        ));
        let last_user = last_user_text(&request.messages);
        self.chat_requests.lock().push(request);

        if let Some(reply) = self.chat_script.lock().pop_front() {
            *self.last_chat.lock() = Some(reply.clone());
            return Ok(reply);
        }
        if let MockMode::RepeatLast = self.mode {
            if let Some(ref reply) = *self.last_chat.lock() {
                return Ok(reply.clone());
            }
        }
        let text = self.fallback_text(last_user)?;
        Ok(chat_text(&self.next_id("chatcmpl"), &text))
    }

    async fn create_response(&self, request: ResponseRequest) -> ProviderResult<Response> {
        self.logger.debug(&format!(
            "[MockBackend] create_response with {} input items",
            request.input.len()
        ));
        let last_user = last_user_input(&request.input);
        let previous = request.previous_response_id.clone();
        self.response_requests.lock().push(request);

        let mut reply = match self.response_script.lock().pop_front() {
            Some(reply) => {
                *self.last_response.lock() = Some(reply.clone());
                reply
            }
            None => match (&self.mode, self.last_response.lock().clone()) {
                (MockMode::RepeatLast, Some(reply)) => reply,
                _ => response_text(&self.next_id("resp"), &self.fallback_text(last_user)?),
            },
        };
        reply.previous_response_id = previous;
        Ok(reply)
    }

    async fn create_embedding(
        &self,
        request: EmbeddingRequest,
    ) -> ProviderResult<EmbeddingResponse> {
        if let MockMode::Error(ref message) = self.mode {
            return Err(ProviderError::Other(message.clone()));
        }
        let count = match &request.input {
            Value::Array(items) => items.len(),
            _ => 1,
        };
        let model = request.model.clone();
        self.embedding_requests.lock().push(request);

        Ok(EmbeddingResponse {
            object: Some("list".to_string()),
            data: (0..count)
                .map(|i| Embedding {
                    index: i as u32,
                    embedding: json!([0.0, 0.5, 1.0]),
                    extra: Map::new(),
                })
                .collect(),
            model,
            usage: None,
            extra: Map::new(),
        })
    }
}
