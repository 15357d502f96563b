//! Adapter between toolmux wire types and genai types
//!
//! Auth never falls back to genai's own environment lookup: the key the
//! router resolved is the only credential a routed call uses.

use std::future::Future;
use std::pin::Pin;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, MessageContent as GenaiContent,
    Tool as GenaiTool, ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};
use serde_json::{json, Map, Value};

use super::error::{ProviderError, ProviderResult};
use crate::types::{ChatMessage, ChatToolCall, MessageRole, ToolSchema};

// ============================================================================
// Message Conversion: toolmux -> genai
// ============================================================================

/// Convert one chat message; an assistant turn with text and tool calls
/// becomes two genai messages.
pub fn to_genai_message(msg: &ChatMessage) -> ProviderResult<Vec<GenaiMessage>> {
    let text = msg.joined_text();
    let converted = match msg.role {
        MessageRole::System | MessageRole::Developer => {
            vec![GenaiMessage::system(GenaiContent::from(text))]
        }
        MessageRole::User => vec![GenaiMessage::user(GenaiContent::from(text))],
        MessageRole::Assistant => {
            let mut out = Vec::new();
            if !text.is_empty() {
                out.push(GenaiMessage::assistant(GenaiContent::from(text)));
            }
            let calls = msg
                .requested_tool_calls()
                .iter()
                .map(to_genai_tool_call)
                .collect::<ProviderResult<Vec<_>>>()?;
            if !calls.is_empty() {
                out.push(GenaiMessage::from(calls));
            }
            out
        }
        MessageRole::Tool => {
            let call_id = msg.tool_call_id.clone().ok_or_else(|| {
                ProviderError::Other("tool message without tool_call_id".to_string())
            })?;
            vec![GenaiMessage::from(GenaiToolResponse::new(call_id, text))]
        }
    };
    Ok(converted)
}

/// Convert a message history
pub fn to_genai_messages(messages: &[ChatMessage]) -> ProviderResult<Vec<GenaiMessage>> {
    let mut out = Vec::with_capacity(messages.len());
    for msg in messages {
        out.extend(to_genai_message(msg)?);
    }
    Ok(out)
}

/// Convert a tool call carried in an assistant message
pub fn to_genai_tool_call(call: &ChatToolCall) -> ProviderResult<GenaiToolCall> {
    let arguments = match &call.function.arguments {
        Value::String(raw) if raw.trim().is_empty() => json!({}),
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())),
        other => other.clone(),
    };
    let tool_call = serde_json::from_value(json!({
        "call_id": call.id,
        "fn_name": call.function.name,
        "fn_arguments": arguments,
    }))?;
    Ok(tool_call)
}

// ============================================================================
// Tool Conversion: toolmux -> genai
// ============================================================================

/// Convert a wire tool declaration (either shape) to a genai tool
pub fn to_genai_tool(declaration: &Value) -> Option<GenaiTool> {
    let schema = ToolSchema::normalize(declaration)?;
    let mut tool = GenaiTool::new(&schema.name);
    if let Some(ref description) = schema.description {
        tool = tool.with_description(description);
    }
    if let Some(parameters) = schema.parameters {
        tool = tool.with_schema(parameters);
    }
    Some(tool)
}

pub fn to_genai_tools(declarations: &[Value]) -> Vec<GenaiTool> {
    declarations.iter().filter_map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion: toolmux -> genai
// ============================================================================

/// Options `to_genai_options` carries over to genai
const MAPPED_OPTIONS: &[&str] = &[
    "temperature",
    "max_tokens",
    "max_completion_tokens",
    "max_output_tokens",
];

/// Pass-through option keys a routed call cannot carry (`tool_choice`, ...)
pub fn unmapped_options(options: &Map<String, Value>) -> Vec<&str> {
    options
        .keys()
        .map(String::as_str)
        .filter(|key| !MAPPED_OPTIONS.contains(key))
        .collect()
}

/// Map pass-through options genai understands; see `unmapped_options`
pub fn to_genai_options(options: &Map<String, Value>) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.get("temperature").and_then(Value::as_f64) {
        genai_opts = genai_opts.with_temperature(temp);
    }

    let max_tokens = ["max_tokens", "max_completion_tokens", "max_output_tokens"]
        .iter()
        .find_map(|key| options.get(*key).and_then(Value::as_u64));
    if let Some(max_tokens) = max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens.min(u32::MAX as u64) as u32);
    }

    // Tool calls are read off the end-of-stream event
    genai_opts.with_capture_tool_calls(true)
}

// ============================================================================
// Response Conversion: genai -> toolmux
// ============================================================================

/// Convert a genai tool call to a chat tool call with JSON-encoded arguments
pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ChatToolCall {
    ChatToolCall::function(tc.call_id.clone(), tc.fn_name.clone(), &tc.fn_arguments)
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// Where and how a routed call is sent
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Provider identifier (e.g., "openai", "mistral", "openrouter")
    pub provider: String,
    /// API key resolved for the provider
    pub api_key: Option<String>,
    /// Endpoint override
    pub api_base: Option<String>,
}

/// genai adapter serving a provider natively
pub fn adapter_kind_for(provider: &str) -> Option<AdapterKind> {
    let kind = match provider.to_lowercase().as_str() {
        "openai" => AdapterKind::OpenAI,
        "anthropic" => AdapterKind::Anthropic,
        "gemini" | "google" => AdapterKind::Gemini,
        "ollama" => AdapterKind::Ollama,
        "groq" => AdapterKind::Groq,
        "xai" => AdapterKind::Xai,
        "deepseek" => AdapterKind::DeepSeek,
        "cohere" => AdapterKind::Cohere,
        "fireworks" => AdapterKind::Fireworks,
        "together" => AdapterKind::Together,
        _ => return None,
    };
    Some(kind)
}

/// OpenAI-compatible endpoints for providers genai has no adapter for
pub fn openai_compatible_base(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "mistral" => Some("https://api.mistral.ai/v1/"),
        "openrouter" => Some("https://openrouter.ai/api/v1/"),
        _ => None,
    }
}

/// OpenAI-compatible `/embeddings` base URL of a provider
pub fn embeddings_api_base(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "openai" => Some("https://api.openai.com/v1/"),
        "gemini" | "google" => Some("https://generativelanguage.googleapis.com/v1beta/openai/"),
        "ollama" => Some("http://localhost:11434/v1/"),
        "mistral" => Some("https://api.mistral.ai/v1/"),
        "together" => Some("https://api.together.xyz/v1/"),
        "fireworks" => Some("https://api.fireworks.ai/inference/v1/"),
        "openrouter" => Some("https://openrouter.ai/api/v1/"),
        "cohere" => Some("https://api.cohere.ai/compatibility/v1/"),
        _ => None,
    }
}

/// Check if a provider can be served by genai (native or OpenAI-compatible)
pub fn is_genai_supported(provider: &str) -> bool {
    adapter_kind_for(provider).is_some() || openai_compatible_base(provider).is_some()
}

// ============================================================================
// Client Creation with Custom Auth
// ============================================================================

/// Create a genai client pinned to one provider
///
/// The service target resolver forces the provider's adapter so that the
/// model name never decides the provider, and applies endpoint overrides.
/// Providers without a genai adapter are spoken to over the OpenAI protocol.
pub fn create_client(config: &ProviderConfig) -> Client {
    let auth_key = config.api_key.clone();

    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let key = auth_key.clone();
            Box::pin(async move { Ok(key.map(AuthData::from_single)) })
        },
    );

    let adapter_kind = adapter_kind_for(&config.provider).unwrap_or(AdapterKind::OpenAI);
    let api_base = config
        .api_base
        .clone()
        .or_else(|| openai_compatible_base(&config.provider).map(str::to_string));

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let ServiceTarget { endpoint, auth, model } = target;
            let endpoint = match api_base {
                Some(ref base) => Endpoint::from_owned(base.clone()),
                None => endpoint,
            };
            Ok(ServiceTarget {
                endpoint,
                auth,
                model: ModelIden::new(adapter_kind, model.model_name),
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}
