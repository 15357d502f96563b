//! Response-style driver
//!
//! One initial call, one concurrent round of the function calls it asks
//! for, and exactly one follow-up call chained to the initial response.
//! Function calls in the follow-up response are returned to the caller
//! unserved.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::OrchestratorResult;
use crate::logging::Logger;
use crate::providers::{CompletionBackend, ResponseRequest, Route};
use crate::tools::{Dispatch, FunctionRegistry, MergedTools, RequestedCall, ToolDispatcher};
use crate::types::{Response, ResponseItem, ToolStyle};

pub(crate) struct FollowUp<'a> {
    pub backend: &'a dyn CompletionBackend,
    pub route: &'a Route,
    pub tools: &'a MergedTools,
    pub registry: &'a FunctionRegistry,
    pub logger: &'a Arc<dyn Logger>,
}

impl FollowUp<'_> {
    pub async fn run(
        &self,
        input: Vec<ResponseItem>,
        mut options: Map<String, Value>,
    ) -> OrchestratorResult<Response> {
        let previous_response_id = options
            .remove("previous_response_id")
            .and_then(|v| v.as_str().map(str::to_string));

        let initial = ResponseRequest {
            model: self.route.model.clone(),
            input: input.clone(),
            tools: (!self.tools.is_empty()).then(|| self.tools.to_wire(ToolStyle::Response)),
            previous_response_id,
            api_key: self.route.api_key.clone(),
            options: options.clone(),
        };
        let response = self.backend.create_response(initial).await?;

        let calls: Vec<RequestedCall> = response
            .function_calls()
            .into_iter()
            .map(RequestedCall::from)
            .collect();
        if calls.is_empty() {
            return Ok(response);
        }

        self.logger.info(&format!(
            "[FollowUp] Response {} requested {} function calls",
            response.id,
            calls.len()
        ));
        let results = match ToolDispatcher::new(self.registry, self.tools, self.logger)
            .dispatch(&calls)
            .await?
        {
            Dispatch::Completed(results) => results,
            Dispatch::Delegated(_) => return Ok(response),
        };

        let mut follow_input = input;
        follow_input.extend(results.into_iter().map(|result| {
            ResponseItem::function_call_output(result.request_id, result.output.to_wire_string())
        }));

        options.remove("tool_choice");
        let follow = ResponseRequest {
            model: self.route.model.clone(),
            input: follow_input,
            tools: None,
            previous_response_id: Some(response.id.clone()),
            api_key: self.route.api_key.clone(),
            options,
        };
        Ok(self.backend.create_response(follow).await?)
    }
}
