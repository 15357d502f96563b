//! Model -> backend routing
//!
//! A model id selects one of two backends: the native API, called with the
//! bare model name and its own credential, or the multi-provider routing
//! layer, called with a `provider/model` id and a key looked up per call.

use std::collections::HashSet;
use std::sync::Arc;

use super::genai_adapter::is_genai_supported;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::secrets::SecretStore;

/// Which backend serves a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Native,
    Routed,
}

/// Resolved target of one call
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub kind: BackendKind,
    /// Provider id (`openai`, `anthropic`, ...)
    pub provider: String,
    /// Model id as the selected backend expects it
    pub model: String,
    /// Credential for routed calls; native calls carry none
    pub api_key: Option<String>,
}

/// Resolves model ids to routes
pub struct ProviderRouter {
    native_provider: String,
    extra_providers: HashSet<String>,
    secrets: Arc<dyn SecretStore>,
}

/// Provider implied by a bare model name
pub fn infer_provider(model: &str) -> Option<&'static str> {
    fn starts(model: &str, prefixes: &[&str]) -> bool {
        prefixes.iter().any(|p| model.starts_with(*p))
    }
    let m = model.to_lowercase();

    if starts(&m, &[
        "gpt-", "o1", "o3", "o4", "chatgpt-", "text-embedding-", "dall-e", "whisper", "tts-",
        "omni-",
    ]) {
        Some("openai")
    } else if starts(&m, &["claude"]) {
        Some("anthropic")
    } else if starts(&m, &["gemini"]) {
        Some("gemini")
    } else if starts(&m, &["command"]) {
        Some("cohere")
    } else if starts(&m, &["grok"]) {
        Some("xai")
    } else if starts(&m, &["deepseek"]) {
        Some("deepseek")
    } else if starts(&m, &["mistral", "codestral", "ministral"]) {
        Some("mistral")
    } else if starts(&m, &["llama", "qwen", "phi"]) {
        Some("ollama")
    } else {
        None
    }
}

impl ProviderRouter {
    /// Route `native_provider` to the native backend, everything else through
    /// the routing layer with keys from `secrets`
    pub fn new(native_provider: impl Into<String>, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            native_provider: native_provider.into().to_lowercase(),
            extra_providers: HashSet::new(),
            secrets,
        }
    }

    /// Accept `provider/` prefixes for a provider outside the built-in set
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.extra_providers.insert(provider.into().to_lowercase());
        self
    }

    pub fn native_provider(&self) -> &str {
        &self.native_provider
    }

    fn is_known(&self, provider: &str) -> bool {
        provider == self.native_provider
            || is_genai_supported(provider)
            || self.extra_providers.contains(provider)
    }

    /// Resolve `model` to a backend, provider and credential
    pub fn resolve(&self, model: &str) -> OrchestratorResult<Route> {
        let (provider, name) = match model.split_once('/') {
            Some((prefix, rest)) if self.is_known(&prefix.to_lowercase()) => {
                (prefix.to_lowercase(), rest)
            }
            _ => match infer_provider(model) {
                Some(provider) => (provider.to_string(), model),
                None => return Err(OrchestratorError::Routing(model.to_string())),
            },
        };

        if provider == self.native_provider {
            return Ok(Route {
                kind: BackendKind::Native,
                provider,
                model: name.to_string(),
                api_key: None,
            });
        }

        let api_key = self.secrets.get(&provider);
        Ok(Route {
            kind: BackendKind::Routed,
            model: format!("{}/{}", provider, name),
            provider,
            api_key,
        })
    }
}
