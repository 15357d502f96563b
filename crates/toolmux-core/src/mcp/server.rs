//! Tool server handles
//!
//! A `ToolServer` is identified by a stable name and owns a lazily
//! established connection. The orchestrator connects it through the
//! per-client connection cache and never closes it; that is left to the
//! owner of the handle.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use super::client::{McpClient, McpError, McpResult};
use super::transport::McpTransport;
use crate::logging::Logger;
use crate::types::{ToolArguments, ToolSchema};

/// A remote tool provider
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Stable identity used as the connection cache key
    fn name(&self) -> &str;

    /// Establish the connection; calling it again is a no-op
    async fn connect(&self) -> McpResult<()>;

    /// Tools the server advertises, in flat schema shape
    async fn list_tools(&self) -> McpResult<Vec<ToolSchema>>;

    /// Invoke a tool; the reply is the structured result with a `content` field
    async fn call_tool(&self, name: &str, arguments: &ToolArguments) -> McpResult<Value>;
}

impl std::fmt::Debug for dyn ToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServer").field("name", &self.name()).finish()
    }
}

/// Map an rmcp tool into the flat schema shape
pub fn schema_from_mcp_tool(tool: rmcp::model::Tool) -> ToolSchema {
    ToolSchema {
        name: tool.name.to_string(),
        description: tool.description.map(|s| s.to_string()),
        parameters: serde_json::to_value(tool.input_schema.as_ref()).ok(),
    }
}

/// MCP tool server reached over an rmcp transport
pub struct McpServer {
    name: String,
    transport: McpTransport,
    client: OnceCell<McpClient>,
    logger: Arc<dyn Logger>,
}

impl McpServer {
    /// Create a handle; nothing is spawned or dialed until `connect`
    pub fn new(name: impl Into<String>, transport: McpTransport, logger: Arc<dyn Logger>) -> Self {
        Self {
            name: name.into(),
            transport,
            client: OnceCell::new(),
            logger,
        }
    }

    pub fn transport(&self) -> &McpTransport {
        &self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    fn connected(&self) -> McpResult<&McpClient> {
        self.client
            .get()
            .ok_or_else(|| McpError::NotConnected(self.name.clone()))
    }

    /// Shut the connection down (the child process exits with it)
    pub async fn close(self) -> McpResult<()> {
        match self.client.into_inner() {
            Some(client) => client.close().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ToolServer for McpServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> McpResult<()> {
        let logger = Arc::clone(&self.logger);
        self.client
            .get_or_try_init(|| McpClient::connect(&self.transport, logger))
            .await?;
        Ok(())
    }

    async fn list_tools(&self) -> McpResult<Vec<ToolSchema>> {
        let tools = self.connected()?.list_tools().await?;
        Ok(tools.into_iter().map(schema_from_mcp_tool).collect())
    }

    async fn call_tool(&self, name: &str, arguments: &ToolArguments) -> McpResult<Value> {
        let result = self
            .connected()?
            .call_tool(name, arguments.as_map().clone())
            .await?;
        serde_json::to_value(&result).map_err(|e| McpError::Protocol(e.to_string()))
    }
}
