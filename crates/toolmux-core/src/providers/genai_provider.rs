//! RoutedBackend - multi-provider backend on top of the genai crate
//!
//! Models arrive qualified as `provider/model`. Chat turns go through genai;
//! the response style is served over chat with an in-memory response chain
//! so `previous_response_id` resolves to the predecessor's context.
//! Embeddings go to the provider's OpenAI-compatible endpoint.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{ChatRequest as GenaiChatRequest, ChatStreamEvent};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, embeddings_api_base, from_genai_tool_call, to_genai_messages,
    to_genai_options, to_genai_tools, unmapped_options, ProviderConfig,
};
use super::native::NativeBackend;
use super::traits::{ChatRequest, CompletionBackend, EmbeddingRequest, ResponseRequest};
use crate::logging::Logger;
use crate::types::{
    ChatCompletion, ChatMessage, ChatToolCall, EmbeddingResponse, FunctionCallItem, MessageContent,
    MessageItem, MessageRole, Response, ResponseContent, ResponseItem, TypedItem,
};

/// Responses kept for chaining before the oldest is evicted
const MAX_STORED_RESPONSES: usize = 1024;

/// What a later call needs to continue from a response
#[derive(Debug, Clone)]
struct StoredResponse {
    /// Input exactly as the caller sent it
    input: Vec<ResponseItem>,
    /// Input with the predecessor chain resolved
    history: Vec<ResponseItem>,
    output: Vec<ResponseItem>,
}

#[derive(Default)]
struct ResponseChain {
    responses: HashMap<String, StoredResponse>,
    order: VecDeque<String>,
}

impl ResponseChain {
    fn insert(&mut self, id: String, stored: StoredResponse) {
        if self.order.len() >= MAX_STORED_RESPONSES {
            if let Some(oldest) = self.order.pop_front() {
                self.responses.remove(&oldest);
            }
        }
        self.order.push_back(id.clone());
        self.responses.insert(id, stored);
    }
}

/// Backend serving every provider reachable through genai
pub struct RoutedBackend {
    /// Provider id -> endpoint override
    endpoints: HashMap<String, String>,
    chain: Mutex<ResponseChain>,
    logger: Arc<dyn Logger>,
}

impl RoutedBackend {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            endpoints: HashMap::new(),
            chain: Mutex::new(ResponseChain::default()),
            logger,
        }
    }

    /// Send `provider`'s calls to `api_base` instead of its default endpoint
    pub fn with_endpoint(mut self, provider: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.endpoints.insert(provider.into(), api_base.into());
        self
    }

    /// Extract provider ID from a qualified model (e.g., "openai/gpt-4" -> "openai")
    pub fn extract_provider(model: &str) -> Option<&str> {
        model.split_once('/').map(|(provider, _)| provider)
    }

    /// Extract model name from a qualified model (e.g., "openai/gpt-4" -> "gpt-4")
    pub fn extract_model_name(model: &str) -> &str {
        model.split_once('/').map(|(_, name)| name).unwrap_or(model)
    }

    fn split_model<'m>(&self, model: &'m str) -> ProviderResult<(&'m str, &'m str)> {
        match Self::extract_provider(model) {
            Some(provider) => Ok((provider, Self::extract_model_name(model))),
            None => Err(ProviderError::Other(format!(
                "routed model '{}' has no provider prefix",
                model
            ))),
        }
    }

    fn provider_config(&self, provider: &str, api_key: Option<String>) -> ProviderConfig {
        ProviderConfig {
            provider: provider.to_string(),
            api_key,
            api_base: self.endpoints.get(provider).cloned(),
        }
    }

    /// Resolve the chat history a response request stands for
    fn resolve_history(&self, request: &ResponseRequest) -> ProviderResult<Vec<ResponseItem>> {
        let Some(ref previous_id) = request.previous_response_id else {
            return Ok(request.input.clone());
        };
        let chain = self.chain.lock();
        let previous = chain
            .responses
            .get(previous_id)
            .ok_or_else(|| ProviderError::UnknownResponse(previous_id.clone()))?;

        let mut history = previous.history.clone();
        history.extend(previous.output.iter().cloned());
        let rest = if request.input.starts_with(&previous.input) {
            &request.input[previous.input.len()..]
        } else {
            &request.input[..]
        };
        history.extend(rest.iter().cloned());
        Ok(history)
    }
}

/// Translate response items into a chat history
fn items_to_messages(items: &[ResponseItem], instructions: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    let mut call_names: HashMap<&str, &str> = HashMap::new();

    if let Some(instructions) = instructions {
        messages.push(ChatMessage::system(instructions));
    }

    for item in items {
        match item {
            ResponseItem::Message(m) => {
                messages.push(text_message(m.role, m.content.text()));
            }
            ResponseItem::Typed(TypedItem::Message(m)) => {
                messages.push(text_message(m.role, m.content.text()));
            }
            ResponseItem::Typed(TypedItem::FunctionCall(call)) => {
                call_names.insert(&call.call_id, &call.name);
                let tool_call = ChatToolCall {
                    id: call.call_id.clone(),
                    kind: "function".to_string(),
                    function: crate::types::FunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                };
                // Consecutive calls belong to one assistant turn
                match messages.last_mut() {
                    Some(last) if last.role == MessageRole::Assistant && last.tool_calls.is_some() => {
                        last.tool_calls.get_or_insert_with(Vec::new).push(tool_call);
                    }
                    _ => messages.push(ChatMessage::assistant_tool_calls(vec![tool_call])),
                }
            }
            ResponseItem::Typed(TypedItem::FunctionCallOutput(output)) => {
                let name = call_names.get(output.call_id.as_str()).copied().unwrap_or_default();
                messages.push(ChatMessage::tool(&output.call_id, name, &output.output));
            }
            ResponseItem::Raw(_) => {}
        }
    }
    messages
}

fn text_message(role: MessageRole, text: String) -> ChatMessage {
    ChatMessage {
        role,
        content: Some(MessageContent::Text(text)),
        name: None,
        tool_calls: None,
        tool_call_id: None,
        extra: Map::new(),
    }
}

/// Output items for an assistant chat message
fn message_to_items(message: &ChatMessage) -> Vec<ResponseItem> {
    let mut output = Vec::new();
    let text = message.joined_text();
    if !text.is_empty() {
        output.push(ResponseItem::Typed(TypedItem::Message(MessageItem {
            id: Some(format!("msg_{}", Uuid::new_v4().simple())),
            role: MessageRole::Assistant,
            content: ResponseContent::Parts(vec![json!({
                "type": "output_text",
                "text": text,
                "annotations": []
            })]),
            status: Some("completed".to_string()),
            extra: Map::new(),
        })));
    }
    for call in message.requested_tool_calls() {
        output.push(ResponseItem::Typed(TypedItem::FunctionCall(FunctionCallItem {
            id: Some(format!("fc_{}", Uuid::new_v4().simple())),
            call_id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
            status: Some("completed".to_string()),
            extra: Map::new(),
        })));
    }
    output
}

#[async_trait]
impl CompletionBackend for RoutedBackend {
    fn name(&self) -> &str {
        "routed"
    }

    async fn chat_completion(&self, request: ChatRequest) -> ProviderResult<ChatCompletion> {
        let (provider, model_name) = self.split_model(&request.model)?;
        self.logger.info(&format!(
            "[RoutedBackend] chat_completion: provider={}, model={}",
            provider, model_name
        ));

        let client = create_client(&self.provider_config(provider, request.api_key.clone()));

        let mut chat_req = GenaiChatRequest::new(to_genai_messages(&request.messages)?);
        if let Some(ref tools) = request.tools {
            chat_req = chat_req.with_tools(to_genai_tools(tools));
        }
        let dropped = unmapped_options(&request.options);
        if !dropped.is_empty() {
            self.logger.debug(&format!(
                "[RoutedBackend] Options not carried to {}: {}",
                model_name,
                dropped.join(", ")
            ));
        }
        let genai_options = to_genai_options(&request.options);

        let chat_stream = client
            .exec_chat_stream(model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| ProviderError::api_error(provider, 500, e.to_string()))?;

        let mut stream = Box::pin(chat_stream.stream);
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => text.push_str(&chunk.content),
                Ok(ChatStreamEvent::End(end)) => {
                    if let Some(captured) = end.captured_tool_calls() {
                        tool_calls.extend(captured.iter().map(|tc| from_genai_tool_call(tc)));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    self.logger
                        .error(&format!("[RoutedBackend] Stream error: {}", e));
                    return Err(ProviderError::api_error(provider, 500, e.to_string()));
                }
            }
        }

        let mut message = if text.is_empty() {
            ChatMessage::assistant_tool_calls(Vec::new())
        } else {
            ChatMessage::assistant(text)
        };
        message.tool_calls = (!tool_calls.is_empty()).then_some(tool_calls);

        self.logger.debug(&format!(
            "[RoutedBackend] Completed with {} tool calls",
            message.requested_tool_calls().len()
        ));
        Ok(ChatCompletion::from_message(
            format!("chatcmpl-{}", Uuid::new_v4().simple()),
            request.model.clone(),
            message,
        ))
    }

    async fn create_response(&self, request: ResponseRequest) -> ProviderResult<Response> {
        let history = self.resolve_history(&request)?;
        let instructions = request.option("instructions").and_then(Value::as_str);
        let messages = items_to_messages(&history, instructions);

        let mut options = request.options.clone();
        options.remove("instructions");
        let chat = ChatRequest {
            model: request.model.clone(),
            messages,
            tools: request.tools.clone(),
            api_key: request.api_key.clone(),
            options,
        };
        let completion = self.chat_completion(chat).await?;
        let message = completion.message().ok_or_else(|| {
            ProviderError::invalid_response("routed", "completion without choices")
        })?;

        let mut response = Response::new(
            format!("resp_{}", Uuid::new_v4().simple()),
            request.model.clone(),
            message_to_items(message),
        );
        response.previous_response_id = request.previous_response_id.clone();

        self.chain.lock().insert(
            response.id.clone(),
            StoredResponse {
                input: request.input,
                history,
                output: response.output.clone(),
            },
        );
        Ok(response)
    }

    async fn create_embedding(
        &self,
        request: EmbeddingRequest,
    ) -> ProviderResult<EmbeddingResponse> {
        let (provider, model_name) = self.split_model(&request.model)?;
        let api_base = match self.endpoints.get(provider) {
            Some(base) => base.clone(),
            None => embeddings_api_base(provider)
                .ok_or_else(|| ProviderError::unsupported(provider, "embeddings"))?
                .to_string(),
        };
        self.logger.info(&format!(
            "[RoutedBackend] create_embedding: provider={}, model={}",
            provider, model_name
        ));

        let backend = NativeBackend::new(provider, api_base, None, Arc::clone(&self.logger));
        let forwarded = EmbeddingRequest {
            model: model_name.to_string(),
            input: request.input.clone(),
            api_key: request.api_key.clone(),
            options: request.options.clone(),
        };
        backend.create_embedding(forwarded).await
    }
}
