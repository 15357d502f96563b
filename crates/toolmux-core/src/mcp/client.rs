//! MCP client using the official rmcp SDK
//!
//! Connects to tool servers over a child process, HTTP, or a Unix socket.

use std::sync::Arc;

use rmcp::{
    model::{CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation, Tool},
    service::RunningService,
    transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess},
    RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::process::Command;

#[cfg(unix)]
use tokio::net::UnixStream;

use super::transport::McpTransport;
use crate::logging::Logger;

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Server '{0}' is not connected")]
    NotConnected(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type McpResult<T> = Result<T, McpError>;

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolmux-core".to_string(),
            title: Some("Toolmux Core".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// A live rmcp session with one tool server
pub struct McpClient {
    client: RunningService<RoleClient, ClientInfo>,
    logger: Arc<dyn Logger>,
}

impl McpClient {
    /// Connect and run the MCP initialization handshake
    pub async fn connect(transport: &McpTransport, logger: Arc<dyn Logger>) -> McpResult<Self> {
        logger.info(&format!("[McpClient] Connecting via {}", transport));

        let client = match transport {
            McpTransport::Stdio { command, args, env } => {
                let child = TokioChildProcess::new(Command::new(command).configure(|cmd| {
                    cmd.args(args);
                    cmd.envs(env);
                }))
                .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;
                client_info()
                    .serve(child)
                    .await
                    .map_err(|e| McpError::InitializationFailed(e.to_string()))?
            }
            McpTransport::Http { url } => {
                let http = StreamableHttpClientTransport::from_uri(url.as_str());
                client_info()
                    .serve(http)
                    .await
                    .map_err(|e| McpError::InitializationFailed(e.to_string()))?
            }
            #[cfg(unix)]
            McpTransport::Unix { path } => {
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;
                client_info()
                    .serve(stream)
                    .await
                    .map_err(|e| McpError::InitializationFailed(e.to_string()))?
            }
            #[cfg(not(unix))]
            McpTransport::Unix { .. } => {
                return Err(McpError::ConnectionFailed(
                    "Unix sockets are not supported on this platform".to_string(),
                ))
            }
        };

        logger.info("[McpClient] Connected and initialized successfully");

        Ok(Self { client, logger })
    }

    /// List all available tools
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let result = self
            .client
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger
            .debug(&format!("[McpClient] Listed {} tools", result.tools.len()));

        Ok(result.tools)
    }

    /// Call a tool by name
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> McpResult<CallToolResult> {
        self.logger.debug(&format!("[McpClient] Calling tool: {}", name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: Some(arguments),
            task: None,
        };

        self.client
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))
    }

    /// Get server info
    pub fn server_info(&self) -> Option<&Implementation> {
        self.client.peer_info().map(|info| &info.server_info)
    }

    /// Close the connection
    pub async fn close(self) -> McpResult<()> {
        self.logger.info("[McpClient] Closing connection");
        self.client
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }
}
