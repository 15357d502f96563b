//! MCP (Model Context Protocol) tool servers
//!
//! Uses the official rmcp SDK for remote servers and offers an in-process
//! server for local tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolmux_core::mcp::{McpServer, McpTransport, ToolServer};
//! use std::sync::Arc;
//!
//! let server = McpServer::new(
//!     "fs",
//!     McpTransport::stdio("npx", ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]),
//!     logger,
//! );
//! server.connect().await?;
//! let tools = server.list_tools().await?;
//! ```

mod client;
mod memory;
mod server;
mod transport;

pub use client::{McpClient, McpError, McpResult};
pub use memory::MemoryToolServer;
pub use server::{schema_from_mcp_tool, McpServer, ToolServer};
pub use transport::McpTransport;

// Re-export rmcp types that consumers might need
pub use rmcp::model::{CallToolResult as McpToolResult, Tool as McpTool};
