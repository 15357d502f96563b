//! In-process tool server
//!
//! Serves closure-backed tools without any transport. Hosts use it to expose
//! in-process functionality under a server name; tests use its connect
//! counter, failure injection and per-tool latency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::{McpError, McpResult};
use super::server::ToolServer;
use crate::types::{ToolArguments, ToolSchema};

type Handler = Arc<dyn Fn(&ToolArguments) -> Result<Value, String> + Send + Sync>;

struct MemoryTool {
    schema: ToolSchema,
    handler: Handler,
    /// Return the handler's value as the whole reply instead of wrapping it
    raw: bool,
    delay: Option<Duration>,
}

/// Tool server living in the current process
pub struct MemoryToolServer {
    name: String,
    tools: Vec<MemoryTool>,
    index: HashMap<String, usize>,
    connect_error: Option<String>,
    connected: AtomicBool,
    connects: AtomicUsize,
    calls: AtomicUsize,
}

impl MemoryToolServer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
            index: HashMap::new(),
            connect_error: None,
            connected: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn push(mut self, schema: ToolSchema, handler: Handler, raw: bool) -> Self {
        let position = self.tools.len();
        self.index.insert(schema.name.clone(), position);
        self.tools.push(MemoryTool {
            schema,
            handler,
            raw,
            delay: None,
        });
        self
    }

    /// Add a tool whose value is returned as MCP text content
    pub fn with_tool<F>(self, schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(&ToolArguments) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.push(schema, Arc::new(handler), false)
    }

    /// Add a tool whose value is the complete reply (no `content` wrapping)
    pub fn with_raw_tool<F>(self, schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(&ToolArguments) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.push(schema, Arc::new(handler), true)
    }

    /// Delay every call of `tool` by `delay`
    pub fn with_delay(mut self, tool: &str, delay: Duration) -> Self {
        if let Some(&i) = self.index.get(tool) {
            self.tools[i].delay = Some(delay);
        }
        self
    }

    /// Make every `connect` fail with `message`
    pub fn failing_connect(mut self, message: impl Into<String>) -> Self {
        self.connect_error = Some(message.into());
        self
    }

    /// How many times the connect operation actually ran
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// How many tool calls were served
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolServer for MemoryToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> McpResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.connect_error {
            return Err(McpError::ConnectionFailed(message.clone()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn list_tools(&self) -> McpResult<Vec<ToolSchema>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::NotConnected(self.name.clone()));
        }
        Ok(self.tools.iter().map(|t| t.schema.clone()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: &ToolArguments) -> McpResult<Value> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::NotConnected(self.name.clone()));
        }
        let tool = self
            .index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| McpError::ToolCallFailed(format!("unknown tool '{}'", name)))?;

        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = tool.delay {
            tokio::time::sleep(delay).await;
        }

        let value = (tool.handler)(arguments).map_err(McpError::ToolCallFailed)?;
        if tool.raw {
            return Ok(value);
        }
        let text = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "isError": false
        }))
    }
}
