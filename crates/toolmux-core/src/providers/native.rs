//! Native backend: OpenAI-compatible HTTP API over reqwest

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatRequest, CompletionBackend, EmbeddingRequest, ResponseRequest};
use crate::logging::Logger;
use crate::types::{ChatCompletion, EmbeddingResponse, Response};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Direct client for the native completion API
pub struct NativeBackend {
    provider: String,
    api_base: String,
    api_key: Option<String>,
    client: reqwest::Client,
    logger: Arc<dyn Logger>,
}

impl NativeBackend {
    pub fn new(
        provider: impl Into<String>,
        api_base: impl Into<String>,
        api_key: Option<String>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            provider: provider.into(),
            api_base: api_base.into(),
            api_key,
            client: reqwest::Client::new(),
            logger,
        }
    }

    /// Backend for api.openai.com
    pub fn openai(api_key: Option<String>, logger: Arc<dyn Logger>) -> Self {
        Self::new("openai", OPENAI_API_BASE, api_key, logger)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    async fn post<B, T>(&self, path: &str, body: &B, api_key: Option<&str>) -> ProviderResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        self.logger
            .debug(&format!("[NativeBackend] POST {} ({})", url, self.provider));

        let mut request = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(body);
        if let Some(key) = api_key.or(self.api_key.as_deref()) {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            self.logger.error(&format!(
                "[NativeBackend] {} returned {}: {}",
                url, status, message
            ));
            if status.as_u16() == 429 {
                return Err(ProviderError::rate_limited(&self.provider, message));
            }
            return Err(ProviderError::api_error(&self.provider, status.as_u16(), message));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::invalid_response(&self.provider, e.to_string()))
    }
}

/// `error.message` of an error body, or the body itself
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl CompletionBackend for NativeBackend {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn chat_completion(&self, request: ChatRequest) -> ProviderResult<ChatCompletion> {
        self.post("chat/completions", &request, request.api_key.as_deref())
            .await
    }

    async fn create_response(&self, request: ResponseRequest) -> ProviderResult<Response> {
        self.post("responses", &request, request.api_key.as_deref())
            .await
    }

    async fn create_embedding(
        &self,
        request: EmbeddingRequest,
    ) -> ProviderResult<EmbeddingResponse> {
        self.post("embeddings", &request, request.api_key.as_deref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_url_joining() {
        let backend = NativeBackend::new(
            "openai",
            "http://localhost:8080/v1/",
            None,
            Arc::new(NoOpLogger),
        );
        assert_eq!(backend.url("chat/completions"), "http://localhost:8080/v1/chat/completions");
        assert_eq!(
            NativeBackend::openai(None, Arc::new(NoOpLogger)).url("responses"),
            "https://api.openai.com/v1/responses"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Incorrect API key provided");
        assert_eq!(error_message(r#"{"error": "overloaded"}"#), "overloaded");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
