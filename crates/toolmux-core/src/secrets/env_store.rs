//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::SecretStore;

/// Provider id -> environment variables, tried in order
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m.insert("anthropic", vec!["ANTHROPIC_API_KEY"]);
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("groq", vec!["GROQ_API_KEY"]);
    m.insert("xai", vec!["XAI_API_KEY"]);
    m.insert("deepseek", vec!["DEEPSEEK_API_KEY"]);
    m.insert("cohere", vec!["COHERE_API_KEY", "CO_API_KEY"]);
    m.insert("fireworks", vec!["FIREWORKS_API_KEY", "FIREWORKS_AI_API_KEY"]);
    m.insert("together", vec!["TOGETHER_API_KEY", "TOGETHERAI_API_KEY"]);
    m.insert("mistral", vec!["MISTRAL_API_KEY"]);
    m.insert("openrouter", vec!["OPENROUTER_API_KEY"]);
    m.insert("azure", vec!["AZURE_API_KEY", "AZURE_OPENAI_API_KEY"]);
    m.insert("ollama", vec![]); // local, no key
    m
});

/// Read-only store over the process environment
///
/// `get("anthropic")` looks at `ANTHROPIC_API_KEY`; unknown providers fall
/// back to `<PROVIDER>_API_KEY`, and a key that is already an environment
/// variable name is read directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Environment variables consulted for a provider
    pub fn env_vars_for(provider: &str) -> Vec<String> {
        match ENV_VAR_MAP.get(provider.to_lowercase().as_str()) {
            Some(vars) => vars.iter().map(|v| v.to_string()).collect(),
            None => vec![format!("{}_API_KEY", provider.to_uppercase())],
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        non_empty_var(key).or_else(|| {
            Self::env_vars_for(key)
                .iter()
                .find_map(|var| non_empty_var(var))
        })
    }
}
