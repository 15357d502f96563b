//! Client session and entry points

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::call::{clean_options, ChatCall, EmbeddingCall, ResponseCall};
use super::chat_loop::ChatLoop;
use super::follow_up::FollowUp;
use crate::config::{ConfigFile, LoopSettings};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::{Logger, NoOpLogger};
use crate::mcp::ToolServer;
use crate::providers::{
    BackendKind, CompletionBackend, EmbeddingRequest, NativeBackend, ProviderRouter, Route,
    RoutedBackend,
};
use crate::secrets::{EnvSecretStore, SecretStore};
use crate::tools::{ConnectionCache, FunctionRegistry, MergedTools, SchemaMerger};
use crate::types::{ChatCompletion, EmbeddingResponse, Response};

/// One client session
///
/// Tool servers connect at most once per session, keyed by name, and stay
/// connected; closing them is left to whoever created the handles.
pub struct ToolClient {
    router: ProviderRouter,
    native: Arc<dyn CompletionBackend>,
    routed: Arc<dyn CompletionBackend>,
    registry: Arc<FunctionRegistry>,
    cache: ConnectionCache,
    tool_servers: Vec<Arc<dyn ToolServer>>,
    settings: LoopSettings,
    logger: Arc<dyn Logger>,
}

/// Builder for [`ToolClient`]
#[derive(Default)]
pub struct ToolClientBuilder {
    config: Option<ConfigFile>,
    secrets: Option<Arc<dyn SecretStore>>,
    registry: Option<Arc<FunctionRegistry>>,
    native: Option<Arc<dyn CompletionBackend>>,
    routed: Option<Arc<dyn CompletionBackend>>,
    logger: Option<Arc<dyn Logger>>,
}

impl ToolClientBuilder {
    pub fn config(mut self, config: ConfigFile) -> Self {
        self.config = Some(config);
        self
    }

    pub fn secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the native backend
    pub fn native_backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.native = Some(backend);
        self
    }

    /// Replace the routing-layer backend
    pub fn routed_backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.routed = Some(backend);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> ToolClient {
        let logger = self.logger.unwrap_or_else(|| Arc::new(NoOpLogger));
        let config = self.config.unwrap_or_default();
        let secrets = self
            .secrets
            .unwrap_or_else(|| Arc::new(EnvSecretStore::new()));

        let mut router = ProviderRouter::new(config.native.provider.clone(), Arc::clone(&secrets));
        for provider in &config.providers {
            router = router.with_provider(provider.name.clone());
        }

        let native = self.native.unwrap_or_else(|| {
            Arc::new(NativeBackend::new(
                config.native.provider.clone(),
                config.native.api_base_or_default(),
                secrets.get(&config.native.provider),
                Arc::clone(&logger),
            ))
        });
        let routed = self.routed.unwrap_or_else(|| {
            let backend = config
                .providers
                .iter()
                .filter_map(|p| p.api_base.as_ref().map(|base| (p.name.clone(), base.clone())))
                .fold(RoutedBackend::new(Arc::clone(&logger)), |backend, (name, base)| {
                    backend.with_endpoint(name, base)
                });
            Arc::new(backend)
        });

        ToolClient {
            router,
            native,
            routed,
            registry: self.registry.unwrap_or_default(),
            cache: ConnectionCache::new(Arc::clone(&logger)),
            tool_servers: config.tool_servers(&logger),
            settings: config.tool_loop,
            logger,
        }
    }
}

impl ToolClient {
    pub fn builder() -> ToolClientBuilder {
        ToolClientBuilder::default()
    }

    /// Client with default configuration, environment credentials and no logging
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn connection_cache(&self) -> &ConnectionCache {
        &self.cache
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    fn backend(&self, route: &Route) -> &dyn CompletionBackend {
        match route.kind {
            BackendKind::Native => self.native.as_ref(),
            BackendKind::Routed => self.routed.as_ref(),
        }
    }

    /// Connect the call's servers and the configured ones, then merge tools
    async fn prepare_tools(
        &self,
        caller_tools: &[Value],
        call_servers: &[Arc<dyn ToolServer>],
        strict: bool,
    ) -> OrchestratorResult<MergedTools> {
        let mut seen = HashSet::new();
        let servers: Vec<Arc<dyn ToolServer>> = call_servers
            .iter()
            .chain(self.tool_servers.iter())
            .filter(|s| seen.insert(s.name().to_string()))
            .cloned()
            .collect();

        let connected = self.cache.ensure_all(&servers).await?;
        SchemaMerger::new(&self.registry, &self.logger)
            .strict(strict)
            .merge(caller_tools, &connected)
            .await
    }

    fn prepare_options(&self, options: Map<String, Value>, tools: &MergedTools) -> Map<String, Value> {
        let mut options = clean_options(options, &self.logger);
        if !tools.is_empty() && !options.contains_key("tool_choice") {
            options.insert(
                "tool_choice".into(),
                Value::String(self.settings.tool_choice.clone()),
            );
        }
        options
    }

    /// Chat completion with tools served until the model stops asking
    pub async fn chat_completion(&self, call: ChatCall) -> OrchestratorResult<ChatCompletion> {
        let tools = self
            .prepare_tools(&call.tools, &call.tool_servers, call.strict)
            .await?;
        let route = self.router.resolve(&call.model)?;
        self.logger.info(&format!(
            "[ToolClient] chat_completion: model={}, backend={:?}, tools={}",
            route.model,
            route.kind,
            tools.len()
        ));
        let options = self.prepare_options(call.options, &tools);

        ChatLoop {
            backend: self.backend(&route),
            route: &route,
            tools: &tools,
            registry: &self.registry,
            logger: &self.logger,
            max_tool_loops: self.settings.max_tool_loops,
        }
        .run(call.messages, options)
        .await
    }

    /// Response with at most one follow-up serving its function calls
    pub async fn create_response(&self, call: ResponseCall) -> OrchestratorResult<Response> {
        let tools = self
            .prepare_tools(&call.tools, &call.tool_servers, call.strict)
            .await?;
        let route = self.router.resolve(&call.model)?;
        self.logger.info(&format!(
            "[ToolClient] create_response: model={}, backend={:?}, tools={}",
            route.model,
            route.kind,
            tools.len()
        ));
        let options = self.prepare_options(call.options, &tools);

        FollowUp {
            backend: self.backend(&route),
            route: &route,
            tools: &tools,
            registry: &self.registry,
            logger: &self.logger,
        }
        .run(call.input.into_items(), options)
        .await
    }

    /// Embeddings, routed by provider and otherwise passed through
    pub async fn create_embedding(&self, call: EmbeddingCall) -> OrchestratorResult<EmbeddingResponse> {
        let route = self.router.resolve(&call.model)?;
        let request = EmbeddingRequest {
            model: route.model.clone(),
            input: call.input,
            api_key: route.api_key.clone(),
            options: clean_options(call.options, &self.logger),
        };
        Ok(self.backend(&route).create_embedding(request).await?)
    }

    pub fn chat_completion_blocking(&self, call: ChatCall) -> OrchestratorResult<ChatCompletion> {
        block_on(self.chat_completion(call))
    }

    pub fn create_response_blocking(&self, call: ResponseCall) -> OrchestratorResult<Response> {
        block_on(self.create_response(call))
    }

    pub fn create_embedding_blocking(&self, call: EmbeddingCall) -> OrchestratorResult<EmbeddingResponse> {
        block_on(self.create_embedding(call))
    }
}

impl Default for ToolClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `future` to completion on a fresh runtime
fn block_on<T>(future: impl Future<Output = OrchestratorResult<T>>) -> OrchestratorResult<T> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(OrchestratorError::Runtime(
            "blocking entry point called from inside an async runtime; use the async method".into(),
        ));
    }
    let runtime =
        tokio::runtime::Runtime::new().map_err(|e| OrchestratorError::Runtime(e.to_string()))?;
    runtime.block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger};
    use crate::mcp::MemoryToolServer;
    use crate::providers::mock::{chat_text, chat_tool_calls, response_function_calls, response_text};
    use crate::providers::{MockBackend, MockMode, ProviderError};
    use crate::secrets::MemorySecretStore;
    use crate::types::{ChatMessage, MessageRole, ResponseItem, ToolSchema, TypedItem};
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        client: ToolClient,
        native: Arc<MockBackend>,
        routed: Arc<MockBackend>,
        log: Arc<MemoryLogger>,
    }

    fn harness(native: MockBackend, registry: FunctionRegistry) -> Harness {
        harness_with(native, MockBackend::new(Arc::new(NoOpLogger)), registry, ConfigFile::default())
    }

    fn harness_with(
        native: MockBackend,
        routed: MockBackend,
        registry: FunctionRegistry,
        config: ConfigFile,
    ) -> Harness {
        let native = Arc::new(native);
        let routed = Arc::new(routed);
        let log = Arc::new(MemoryLogger::new());
        let client = ToolClient::builder()
            .config(config)
            .secrets(Arc::new(MemorySecretStore::with_secrets([("anthropic", "sk-ant-test")])))
            .registry(Arc::new(registry))
            .native_backend(native.clone())
            .routed_backend(routed.clone())
            .logger(log.clone())
            .build();
        Harness {
            client,
            native,
            routed,
            log,
        }
    }

    fn mock() -> MockBackend {
        MockBackend::new(Arc::new(NoOpLogger))
    }

    fn echo_registry() -> FunctionRegistry {
        let registry = FunctionRegistry::new();
        registry.register(ToolSchema::new("echo", "Echo text"), |args| {
            Ok(json!(args.get_str("text").unwrap_or_default()))
        });
        registry
    }

    fn user(text: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(text)]
    }

    #[tokio::test]
    async fn test_plain_chat_passes_through() {
        let h = harness(mock(), FunctionRegistry::new());
        let reply = h
            .client
            .chat_completion(ChatCall::new("gpt-4o", user("hello")).option("temperature", json!(0.3)))
            .await
            .unwrap();

        assert_eq!(reply.message().unwrap().text(), Some("hello"));
        let requests = h.native.chat_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_none());
        assert!(requests[0].option("tool_choice").is_none());
        assert_eq!(requests[0].option("temperature"), Some(&json!(0.3)));
    }

    #[tokio::test]
    async fn test_chat_loop_runs_tools_then_drops_them() {
        let native = mock().with_chat_replies([
            chat_tool_calls("r1", &[("call_1", "echo", json!({"text": "ping"}))]),
            chat_text("r2", "pong"),
        ]);
        let h = harness(native, echo_registry());

        let reply = h
            .client
            .chat_completion(ChatCall::new("gpt-4o", user("say ping")))
            .await
            .unwrap();
        assert_eq!(reply.id, "r2");

        let requests = h.native.chat_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.as_ref().unwrap()[0]["function"]["name"], "echo");
        assert_eq!(requests[0].option("tool_choice"), Some(&json!("auto")));
        assert!(requests[1].tools.is_none());
        assert!(requests[1].option("tool_choice").is_none());

        let history = &requests[1].messages;
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].requested_tool_calls()[0].id, "call_1");
        assert_eq!(history[2].role, MessageRole::Tool);
        assert_eq!(history[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(history[2].name.as_deref(), Some("echo"));
        assert_eq!(history[2].text(), Some("ping"));
    }

    #[tokio::test]
    async fn test_caller_tool_choice_is_kept_on_first_call() {
        let h = harness(mock(), echo_registry());
        h.client
            .chat_completion(ChatCall::new("gpt-4o", user("x")).option("tool_choice", json!("required")))
            .await
            .unwrap();
        assert_eq!(
            h.native.chat_requests()[0].option("tool_choice"),
            Some(&json!("required"))
        );
    }

    #[tokio::test]
    async fn test_loop_stops_at_twenty_rounds_with_warning() {
        let native = mock()
            .with_mode(MockMode::RepeatLast)
            .with_chat_replies([chat_tool_calls("again", &[("call_x", "echo", json!({"text": "x"}))])]);
        let h = harness(native, echo_registry());

        let reply = h
            .client
            .chat_completion(ChatCall::new("gpt-4o", user("loop forever")))
            .await
            .unwrap();

        assert_eq!(h.native.chat_requests().len(), 20);
        assert_eq!(reply.tool_calls().len(), 1);
        assert!(h.log.contains(LogLevel::Warn, "Reached max tool loops (20)"));
        // 19 dispatched rounds, each adding an assistant and a tool entry
        assert_eq!(h.native.chat_requests()[19].messages.len(), 1 + 19 * 2);
    }

    #[tokio::test]
    async fn test_configured_loop_cap() {
        let native = mock()
            .with_mode(MockMode::RepeatLast)
            .with_chat_replies([chat_tool_calls("again", &[("c", "echo", json!({}))])]);
        let mut config = ConfigFile::default();
        config.tool_loop.max_tool_loops = 3;
        let h = harness_with(native, mock(), echo_registry(), config);

        h.client
            .chat_completion(ChatCall::new("gpt-4o", user("x")))
            .await
            .unwrap();
        assert_eq!(h.native.chat_requests().len(), 3);
        assert!(h.log.contains(LogLevel::Warn, "Reached max tool loops (3)"));
    }

    #[tokio::test]
    async fn test_results_appended_in_request_order() {
        let server = Arc::new(
            MemoryToolServer::new("timing")
                .with_tool(ToolSchema::new("slow", "s"), |_| Ok(json!("slow")))
                .with_tool(ToolSchema::new("medium", "m"), |_| Ok(json!("medium")))
                .with_tool(ToolSchema::new("fast", "f"), |_| Ok(json!("fast")))
                .with_delay("slow", Duration::from_millis(80))
                .with_delay("medium", Duration::from_millis(40)),
        );
        let native = mock().with_chat_replies([
            chat_tool_calls(
                "r1",
                &[
                    ("c1", "slow", json!({})),
                    ("c2", "medium", json!({})),
                    ("c3", "fast", json!({})),
                ],
            ),
            chat_text("r2", "done"),
        ]);
        let h = harness(native, FunctionRegistry::new());

        h.client
            .chat_completion(ChatCall::new("gpt-4o", user("go")).server(server))
            .await
            .unwrap();

        let history = &h.native.chat_requests()[1].messages;
        let ids: Vec<_> = history[2..]
            .iter()
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(history[1].requested_tool_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_server_failure_is_injected_and_loop_continues() {
        let server = Arc::new(
            MemoryToolServer::new("flaky")
                .with_tool(ToolSchema::new("explode", "boom"), |_| Err("kaboom".to_string())),
        );
        let native = mock().with_chat_replies([
            chat_tool_calls("r1", &[("c1", "explode", json!({}))]),
            chat_text("r2", "I saw the error"),
        ]);
        let h = harness(native, FunctionRegistry::new());

        let reply = h
            .client
            .chat_completion(ChatCall::new("gpt-4o", user("go")).server(server))
            .await
            .unwrap();

        assert_eq!(reply.id, "r2");
        let tool_entry = &h.native.chat_requests()[1].messages[2];
        let text = tool_entry.text().unwrap();
        assert!(text.starts_with("Error calling MCP tool explode"));
        assert!(text.contains("kaboom"));
    }

    #[tokio::test]
    async fn test_unregistered_tool_aborts() {
        let native = mock().with_chat_replies([chat_tool_calls("r1", &[("c1", "ghost", json!({}))])]);
        let h = harness(native, echo_registry());

        let err = h
            .client
            .chat_completion(ChatCall::new("gpt-4o", user("go")))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ToolNotRegistered(ref n) if n == "ghost"));
    }

    #[tokio::test]
    async fn test_caller_only_tool_returns_raw_response() {
        let native = mock().with_chat_replies([chat_tool_calls(
            "r1",
            &[("c1", "open_browser", json!({"url": "https://example.com"}))],
        )]);
        let h = harness(native, FunctionRegistry::new());

        let reply = h
            .client
            .chat_completion(ChatCall::new("gpt-4o", user("go")).tool(json!({
                "type": "function",
                "function": {"name": "open_browser", "description": "Client side"}
            })))
            .await
            .unwrap();

        assert_eq!(reply.id, "r1");
        assert_eq!(reply.tool_calls()[0].function.name, "open_browser");
        assert_eq!(h.native.chat_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_caller_declaration_overrides_registry() {
        let h = harness(mock(), echo_registry());
        h.client
            .chat_completion(ChatCall::new("gpt-4o", user("x")).tool(json!({
                "name": "echo",
                "description": "Caller's echo"
            })))
            .await
            .unwrap();

        let tools = h.native.chat_requests()[0].tools.clone().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["function"]["description"], "Caller's echo");
    }

    #[tokio::test]
    async fn test_servers_connect_once_per_client() {
        let server = Arc::new(
            MemoryToolServer::new("fs").with_tool(ToolSchema::new("ls", "List"), |_| Ok(json!([]))),
        );
        let same_name = Arc::new(MemoryToolServer::new("fs"));
        let h = harness(mock(), FunctionRegistry::new());

        for _ in 0..3 {
            h.client
                .chat_completion(ChatCall::new("gpt-4o", user("x")).server(server.clone()))
                .await
                .unwrap();
        }
        h.client
            .chat_completion(ChatCall::new("gpt-4o", user("x")).server(same_name.clone()))
            .await
            .unwrap();

        assert_eq!(server.connect_count(), 1);
        assert_eq!(same_name.connect_count(), 0);
        assert_eq!(h.client.connection_cache().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_aborts_before_model_call() {
        let broken = Arc::new(MemoryToolServer::new("broken").failing_connect("refused"));
        let h = harness(mock(), FunctionRegistry::new());

        let err = h
            .client
            .chat_completion(ChatCall::new("gpt-4o", user("x")).server(broken))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Connection { ref server, .. } if server == "broken"));
        assert!(h.native.chat_requests().is_empty());
    }

    #[tokio::test]
    async fn test_routed_calls_carry_qualified_model_and_key() {
        let h = harness(mock(), FunctionRegistry::new());
        h.client
            .chat_completion(ChatCall::new("claude-3-5-haiku-latest", user("hi")))
            .await
            .unwrap();

        assert!(h.native.chat_requests().is_empty());
        let request = &h.routed.chat_requests()[0];
        assert_eq!(request.model, "anthropic/claude-3-5-haiku-latest");
        assert_eq!(request.api_key.as_deref(), Some("sk-ant-test"));
    }

    #[tokio::test]
    async fn test_unroutable_model() {
        let h = harness(mock(), FunctionRegistry::new());
        let err = h
            .client
            .chat_completion(ChatCall::new("mystery-model", user("hi")))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Routing(_)));
    }

    #[tokio::test]
    async fn test_response_single_follow_up() {
        let native = mock().with_response_replies([
            response_function_calls(
                "resp_1",
                &[("call_a", "echo", json!({"text": "a"})), ("call_b", "echo", json!({"text": "b"}))],
            ),
            response_function_calls("resp_2", &[("call_c", "echo", json!({"text": "c"}))]),
            response_text("resp_3", "never reached"),
        ]);
        let h = harness(native, echo_registry());

        let reply = h
            .client
            .create_response(
                ResponseCall::new("gpt-4o", "echo a and b")
                    .option("previous_response_id", json!("resp_0")),
            )
            .await
            .unwrap();

        assert_eq!(reply.id, "resp_2");
        assert_eq!(reply.function_calls().len(), 1);

        let requests = h.native.response_requests();
        assert_eq!(requests.len(), 2);

        let initial = &requests[0];
        assert_eq!(initial.previous_response_id.as_deref(), Some("resp_0"));
        assert_eq!(initial.tools.as_ref().unwrap()[0]["name"], "echo");
        assert_eq!(initial.option("tool_choice"), Some(&json!("auto")));

        let follow = &requests[1];
        assert_eq!(follow.previous_response_id.as_deref(), Some("resp_1"));
        assert!(follow.tools.is_none());
        assert!(follow.option("tool_choice").is_none());
        assert!(follow.option("previous_response_id").is_none());
        assert_eq!(follow.input.len(), 3);
        assert_eq!(follow.input[0], ResponseItem::user("echo a and b"));
        let outputs: Vec<_> = follow.input[1..]
            .iter()
            .map(|item| match item {
                ResponseItem::Typed(TypedItem::FunctionCallOutput(o)) => (o.call_id.as_str(), o.output.as_str()),
                other => panic!("unexpected item {:?}", other),
            })
            .collect();
        assert_eq!(outputs, vec![("call_a", "a"), ("call_b", "b")]);
    }

    #[tokio::test]
    async fn test_response_without_calls_is_returned_unchanged() {
        let native = mock().with_response_replies([response_text("resp_1", "hi there")]);
        let h = harness(native, echo_registry());

        let reply = h
            .client
            .create_response(ResponseCall::new("gpt-4o", "hi"))
            .await
            .unwrap();
        assert_eq!(reply.output_text(), "hi there");
        assert_eq!(h.native.response_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_response_json_output_is_encoded() {
        let registry = FunctionRegistry::new();
        registry.register(ToolSchema::new("stats", "Stats"), |_| Ok(json!({"count": 2})));
        let native = mock().with_response_replies([
            response_function_calls("resp_1", &[("call_1", "stats", json!({}))]),
            response_text("resp_2", "two"),
        ]);
        let h = harness(native, registry);

        h.client
            .create_response(ResponseCall::new("gpt-4o", "count"))
            .await
            .unwrap();

        let follow = &h.native.response_requests()[1];
        match &follow.input[1] {
            ResponseItem::Typed(TypedItem::FunctionCallOutput(o)) => {
                let decoded: Value = serde_json::from_str(&o.output).unwrap();
                assert_eq!(decoded, json!({"count": 2}));
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_embeddings_are_routed_only() {
        let h = harness(mock(), echo_registry());
        let reply = h
            .client
            .create_embedding(
                EmbeddingCall::new("text-embedding-3-small", json!(["a", "b", "c"]))
                    .option("dimensions", json!(3)),
            )
            .await
            .unwrap();

        assert_eq!(reply.vectors().len(), 3);
        let request = &h.native.embedding_requests()[0];
        assert_eq!(request.model, "text-embedding-3-small");
        assert_eq!(request.options["dimensions"], 3);
        assert!(h.native.chat_requests().is_empty());
    }

    #[tokio::test]
    async fn test_provider_errors_propagate() {
        let h = harness(mock().with_mode(MockMode::Error("overloaded".into())), FunctionRegistry::new());
        let err = h
            .client
            .chat_completion(ChatCall::new("gpt-4o", user("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Provider(ProviderError::Other(_))));
    }

    #[tokio::test]
    async fn test_follow_up_failure_surfaces_as_provider_error() {
        let native = mock()
            .with_mode(MockMode::Error("follow-up rejected".into()))
            .with_response_replies([response_function_calls(
                "resp_1",
                &[("call_1", "echo", json!({"text": "a"}))],
            )]);
        let h = harness(native, echo_registry());

        let err = h
            .client
            .create_response(ResponseCall::new("gpt-4o", "echo a"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Provider(ProviderError::Other(ref m)) if m == "follow-up rejected"));
        assert_eq!(h.native.response_requests().len(), 2);
    }

    #[test]
    fn test_blocking_entry_point() {
        let native = mock().with_chat_replies([
            chat_tool_calls("r1", &[("c1", "echo", json!({"text": "sync"}))]),
            chat_text("r2", "done"),
        ]);
        let h = harness(native, echo_registry());

        let reply = h
            .client
            .chat_completion_blocking(ChatCall::new("gpt-4o", user("x")))
            .unwrap();
        assert_eq!(reply.id, "r2");
    }

    #[tokio::test]
    async fn test_blocking_inside_runtime_is_an_error() {
        let h = harness(mock(), FunctionRegistry::new());
        let err = h
            .client
            .create_response_blocking(ResponseCall::new("gpt-4o", "x"))
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Runtime(_)));
    }
}
