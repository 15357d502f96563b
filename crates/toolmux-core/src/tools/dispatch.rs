//! Tool call dispatch
//!
//! A round of tool calls is planned first: every call's arguments are
//! parsed, its target resolved and its arguments checked against the
//! merged declaration. Only a fully planned round is executed, with all
//! calls running concurrently and results kept in request order.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use super::merge::MergedTools;
use super::registry::{FunctionRegistry, LocalFunction};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::Logger;
use crate::mcp::ToolServer;
use crate::types::{
    ChatToolCall, FunctionCallItem, ToolArguments, ToolCallRequest, ToolCallResult, ToolOutput,
};

/// A tool call as it appears in a model reply, arguments still raw
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl From<&ChatToolCall> for RequestedCall {
    fn from(call: &ChatToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
        }
    }
}

impl From<&FunctionCallItem> for RequestedCall {
    fn from(item: &FunctionCallItem) -> Self {
        Self {
            id: item.call_id.clone(),
            name: item.name.clone(),
            arguments: item.arguments.clone(),
        }
    }
}

/// Where a planned call will run
enum Target {
    Server(Arc<dyn ToolServer>),
    Local(LocalFunction),
}

struct PlannedCall {
    request: ToolCallRequest,
    target: Target,
}

/// Outcome of dispatching one round
#[derive(Debug)]
pub enum Dispatch {
    /// One result per requested call, in request order
    Completed(Vec<ToolCallResult>),
    /// A requested tool is only known from the caller's declarations;
    /// nothing was executed
    Delegated(String),
}

/// Runs tool calls against servers and local functions
pub struct ToolDispatcher<'a> {
    registry: &'a FunctionRegistry,
    tools: &'a MergedTools,
    logger: &'a Arc<dyn Logger>,
    delegate_caller_tools: bool,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(
        registry: &'a FunctionRegistry,
        tools: &'a MergedTools,
        logger: &'a Arc<dyn Logger>,
    ) -> Self {
        Self {
            registry,
            tools,
            logger,
            delegate_caller_tools: false,
        }
    }

    /// Hand rounds that request caller-only tools back instead of failing
    pub fn delegate_caller_tools(mut self, delegate: bool) -> Self {
        self.delegate_caller_tools = delegate;
        self
    }

    /// Plan and run one round of calls
    pub async fn dispatch(&self, calls: &[RequestedCall]) -> OrchestratorResult<Dispatch> {
        let mut parsed = Vec::with_capacity(calls.len());
        for call in calls {
            let arguments = ToolArguments::parse(&call.arguments).map_err(|source| {
                OrchestratorError::InvalidArguments {
                    tool: call.name.clone(),
                    source,
                }
            })?;
            parsed.push(ToolCallRequest::new(call.id.clone(), call.name.clone(), arguments));
        }

        // Any caller-only tool hands the whole round back, whatever else it names
        if self.delegate_caller_tools {
            if let Some(request) = parsed.iter().find(|r| self.is_caller_only(&r.name)) {
                self.logger.info(&format!(
                    "[ToolDispatcher] Tool '{}' is declared by the caller only, returning control",
                    request.name
                ));
                return Ok(Dispatch::Delegated(request.name.clone()));
            }
        }

        let planned = parsed
            .into_iter()
            .map(|request| self.plan(request))
            .collect::<OrchestratorResult<Vec<_>>>()?;

        let results = join_all(planned.into_iter().map(|call| self.run(call))).await;
        Ok(Dispatch::Completed(results))
    }

    /// Resolve and run a single call
    pub async fn execute(&self, request: ToolCallRequest) -> OrchestratorResult<ToolCallResult> {
        let planned = self.plan(request)?;
        Ok(self.run(planned).await)
    }

    fn is_caller_only(&self, name: &str) -> bool {
        self.tools.declared_by_caller(name)
            && self.tools.server_for(name).is_none()
            && !self.registry.contains(name)
    }

    fn plan(&self, request: ToolCallRequest) -> OrchestratorResult<PlannedCall> {
        let target = match self.tools.server_for(&request.name) {
            Some(server) => Target::Server(Arc::clone(server)),
            None => match self.registry.get(&request.name) {
                Some(function) => Target::Local(function),
                None => return Err(OrchestratorError::ToolNotRegistered(request.name)),
            },
        };

        let parameters = self
            .tools
            .schema(&request.name)
            .and_then(|s| s.parameters.as_ref());
        if let Some(parameters) = parameters {
            request
                .arguments
                .validate(parameters)
                .map_err(|source| OrchestratorError::InvalidArguments {
                    tool: request.name.clone(),
                    source,
                })?;
        }

        Ok(PlannedCall { request, target })
    }

    async fn run(&self, call: PlannedCall) -> ToolCallResult {
        let PlannedCall { request, target } = call;
        match target {
            Target::Server(server) => {
                self.logger.info(&format!(
                    "[ToolDispatcher] Invoking MCP tool '{}' on '{}' with args {}",
                    request.name,
                    server.name(),
                    request.arguments.to_value()
                ));
                match server.call_tool(&request.name, &request.arguments).await {
                    Ok(reply) => ToolCallResult::success(&request, reply_content(reply)),
                    Err(e) => {
                        self.logger
                            .error(&format!("[ToolDispatcher] MCP tool call failed: {}", e));
                        ToolCallResult::error(
                            &request,
                            format!("Error calling MCP tool {}: {}", request.name, e),
                        )
                    }
                }
            }
            Target::Local(function) => {
                self.logger.info(&format!(
                    "[ToolDispatcher] Invoking local tool '{}' with args {}",
                    request.name,
                    request.arguments.to_value()
                ));
                match function.invoke(request.arguments.clone()).await {
                    Ok(value) => ToolCallResult::success(&request, value),
                    Err(e) => {
                        self.logger
                            .error(&format!("[ToolDispatcher] Local tool call failed: {}", e));
                        ToolCallResult::error(
                            &request,
                            format!("Error calling tool {}: {}", request.name, e),
                        )
                    }
                }
            }
        }
    }
}

/// The `content` field of a server reply, or the whole reply without one
fn reply_content(reply: Value) -> ToolOutput {
    match reply {
        Value::Object(mut map) => match map.remove("content") {
            Some(content) => ToolOutput::from(content),
            None => ToolOutput::Json(Value::Object(map)),
        },
        other => ToolOutput::from(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::MemoryToolServer;
    use crate::tools::merge::SchemaMerger;
    use crate::types::ToolSchema;
    use serde_json::json;
    use std::time::Duration;

    fn logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger)
    }

    fn call(id: &str, name: &str, arguments: Value) -> RequestedCall {
        RequestedCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    async fn merged(
        registry: &FunctionRegistry,
        logger: &Arc<dyn Logger>,
        caller: &[Value],
        servers: Vec<MemoryToolServer>,
    ) -> MergedTools {
        let mut connected: Vec<Arc<dyn ToolServer>> = Vec::new();
        for server in servers {
            server.connect().await.unwrap();
            connected.push(Arc::new(server));
        }
        SchemaMerger::new(registry, logger)
            .merge(caller, &connected)
            .await
            .unwrap()
    }

    fn completed(dispatch: Dispatch) -> Vec<ToolCallResult> {
        match dispatch {
            Dispatch::Completed(results) => results,
            Dispatch::Delegated(name) => panic!("unexpected delegation of {}", name),
        }
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let registry = FunctionRegistry::new();
        let logger = logger();
        let server = ["slow", "medium", "fast"]
            .iter()
            .zip([60u64, 30, 0])
            .fold(MemoryToolServer::new("timing"), |server, (name, ms)| {
                let label = name.to_string();
                server
                    .with_tool(ToolSchema::new(*name, "timed"), move |_| Ok(json!(label.clone())))
                    .with_delay(name, Duration::from_millis(ms))
            });
        let tools = merged(&registry, &logger, &[], vec![server]).await;

        let calls = vec![
            call("1", "slow", json!("{}")),
            call("2", "medium", json!("{}")),
            call("3", "fast", json!("{}")),
        ];
        let results = completed(
            ToolDispatcher::new(&registry, &tools, &logger)
                .dispatch(&calls)
                .await
                .unwrap(),
        );

        let ids: Vec<_> = results.iter().map(|r| r.request_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(
            results[0].output,
            ToolOutput::Json(json!([{"type": "text", "text": "slow"}]))
        );
    }

    #[tokio::test]
    async fn test_server_failure_is_contained() {
        let registry = FunctionRegistry::new();
        let logger = logger();
        let server = MemoryToolServer::new("flaky")
            .with_tool(ToolSchema::new("explode", "Always fails"), |_| {
                Err("disk on fire".to_string())
            });
        let tools = merged(&registry, &logger, &[], vec![server]).await;

        let results = completed(
            ToolDispatcher::new(&registry, &tools, &logger)
                .dispatch(&[call("c1", "explode", json!({}))])
                .await
                .unwrap(),
        );
        assert!(results[0].is_error);
        let text = results[0].output.to_wire_string();
        assert!(text.starts_with("Error calling MCP tool explode:"));
        assert!(text.contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_local_sync_async_and_failure() {
        let registry = FunctionRegistry::new();
        registry.register(ToolSchema::new("double", "Double"), |args| {
            Ok(json!(args.get_i64("n").unwrap_or(0) * 2))
        });
        registry.register_async(ToolSchema::new("greet", "Greet"), |args: ToolArguments| async move {
            Ok(json!(format!("hello {}", args.get_str("who").unwrap_or("you"))))
        });
        registry.register(ToolSchema::new("fail", "Fail"), |_| Err("nope".into()));
        let logger = logger();
        let tools = merged(&registry, &logger, &[], vec![]).await;

        let results = completed(
            ToolDispatcher::new(&registry, &tools, &logger)
                .dispatch(&[
                    call("a", "double", json!("{\"n\": 21}")),
                    call("b", "greet", json!({"who": "ada"})),
                    call("c", "fail", json!("")),
                ])
                .await
                .unwrap(),
        );

        assert_eq!(results[0].output.to_wire_string(), "42");
        assert_eq!(results[1].output.to_wire_string(), "hello ada");
        assert!(results[2].is_error);
        assert_eq!(results[2].output.to_wire_string(), "Error calling tool fail: nope");
    }

    #[tokio::test]
    async fn test_unregistered_tool_aborts_before_running_anything() {
        let registry = FunctionRegistry::new();
        let logger = logger();
        let server = Arc::new(
            MemoryToolServer::new("s").with_tool(ToolSchema::new("known", "k"), |_| Ok(json!(1))),
        );
        server.connect().await.unwrap();
        let servers: Vec<Arc<dyn ToolServer>> = vec![server.clone()];
        let tools = SchemaMerger::new(&registry, &logger)
            .merge(&[], &servers)
            .await
            .unwrap();

        let err = ToolDispatcher::new(&registry, &tools, &logger)
            .dispatch(&[call("1", "known", json!({})), call("2", "ghost", json!({}))])
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::ToolNotRegistered(ref n) if n == "ghost"));
        assert_eq!(err.to_string(), "Tool 'ghost' not registered");
        assert_eq!(server.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_and_invalid_arguments_are_fatal() {
        let registry = FunctionRegistry::new();
        registry.register(
            ToolSchema::new("weather", "Weather").with_parameters(json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            })),
            |_| Ok(json!("sunny")),
        );
        let logger = logger();
        let tools = merged(&registry, &logger, &[], vec![]).await;
        let dispatcher = ToolDispatcher::new(&registry, &tools, &logger);

        let malformed = dispatcher
            .dispatch(&[call("1", "weather", json!("{city:"))])
            .await
            .unwrap_err();
        assert!(matches!(malformed, OrchestratorError::InvalidArguments { .. }));

        let missing = dispatcher
            .dispatch(&[call("1", "weather", json!({}))])
            .await
            .unwrap_err();
        assert!(matches!(missing, OrchestratorError::InvalidArguments { ref tool, .. } if tool == "weather"));
    }

    #[tokio::test]
    async fn test_caller_only_tool_delegation() {
        let registry = FunctionRegistry::new();
        registry.register(ToolSchema::new("local", "Local"), |_| Ok(json!("ran")));
        let logger = logger();
        let caller = vec![json!({"name": "client_side", "description": "Handled by the caller"})];
        let tools = merged(&registry, &logger, &caller, vec![]).await;
        let calls = [call("1", "local", json!({})), call("2", "client_side", json!({}))];

        let delegated = ToolDispatcher::new(&registry, &tools, &logger)
            .delegate_caller_tools(true)
            .dispatch(&calls)
            .await
            .unwrap();
        assert!(matches!(delegated, Dispatch::Delegated(ref n) if n == "client_side"));

        let err = ToolDispatcher::new(&registry, &tools, &logger)
            .dispatch(&calls)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ToolNotRegistered(_)));
    }

    #[tokio::test]
    async fn test_caller_only_tool_wins_over_earlier_unregistered_call() {
        let registry = FunctionRegistry::new();
        let logger = logger();
        let caller = vec![json!({"name": "client_side", "description": "Handled by the caller"})];
        let tools = merged(&registry, &logger, &caller, vec![]).await;
        let calls = [call("1", "ghost", json!({})), call("2", "client_side", json!({}))];

        let delegated = ToolDispatcher::new(&registry, &tools, &logger)
            .delegate_caller_tools(true)
            .dispatch(&calls)
            .await
            .unwrap();
        assert!(matches!(delegated, Dispatch::Delegated(ref n) if n == "client_side"));
    }

    #[tokio::test]
    async fn test_reply_without_content_is_kept_whole() {
        let registry = FunctionRegistry::new();
        let logger = logger();
        let server = MemoryToolServer::new("raw")
            .with_raw_tool(ToolSchema::new("stats", "Stats"), |_| Ok(json!({"count": 3})));
        let tools = merged(&registry, &logger, &[], vec![server]).await;

        let result = ToolDispatcher::new(&registry, &tools, &logger)
            .execute(ToolCallRequest::new("x", "stats", ToolArguments::new()))
            .await
            .unwrap();
        assert_eq!(result.output, ToolOutput::Json(json!({"count": 3})));
    }
}
