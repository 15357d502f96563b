//! Chat-style driver
//!
//! Calls the model, runs the tools it asks for, appends the exchange to the
//! history and calls again, until the model stops asking or the loop cap is
//! reached. Tools are only offered on the first call.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::OrchestratorResult;
use crate::logging::Logger;
use crate::providers::{ChatRequest, CompletionBackend, Route};
use crate::tools::{Dispatch, FunctionRegistry, MergedTools, RequestedCall, ToolDispatcher};
use crate::types::{ChatCompletion, ChatMessage, ToolStyle};

pub(crate) struct ChatLoop<'a> {
    pub backend: &'a dyn CompletionBackend,
    pub route: &'a Route,
    pub tools: &'a MergedTools,
    pub registry: &'a FunctionRegistry,
    pub logger: &'a Arc<dyn Logger>,
    pub max_tool_loops: usize,
}

impl ChatLoop<'_> {
    pub async fn run(
        &self,
        mut messages: Vec<ChatMessage>,
        mut options: Map<String, Value>,
    ) -> OrchestratorResult<ChatCompletion> {
        let dispatcher = ToolDispatcher::new(self.registry, self.tools, self.logger)
            .delegate_caller_tools(true);
        let max_loops = self.max_tool_loops.max(1);
        let mut tools = (!self.tools.is_empty()).then(|| self.tools.to_wire(ToolStyle::Chat));
        let mut loop_count = 0;

        loop {
            loop_count += 1;
            let request = ChatRequest {
                model: self.route.model.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
                api_key: self.route.api_key.clone(),
                options: options.clone(),
            };
            let response = self.backend.chat_completion(request).await?;

            let calls: Vec<RequestedCall> =
                response.tool_calls().iter().map(RequestedCall::from).collect();
            if calls.is_empty() || loop_count >= max_loops {
                if loop_count >= max_loops {
                    self.logger
                        .warn(&format!("[ChatLoop] Reached max tool loops ({})", max_loops));
                }
                return Ok(response);
            }

            self.logger.info(&format!(
                "[ChatLoop] Round {}: model requested {} tool calls",
                loop_count,
                calls.len()
            ));
            let results = match dispatcher.dispatch(&calls).await? {
                Dispatch::Completed(results) => results,
                Dispatch::Delegated(_) => return Ok(response),
            };

            let assistant = response
                .message()
                .cloned()
                .unwrap_or_else(|| ChatMessage::assistant_tool_calls(response.tool_calls().to_vec()));
            messages.push(assistant);
            messages.extend(results.into_iter().map(|result| {
                ChatMessage::tool(result.request_id, result.name, result.output.to_wire_string())
            }));

            tools = None;
            options.remove("tool_choice");
        }
    }
}
