//! Toolmux Core
//!
//! Tool-augmented completions: callers send a chat or response-style call
//! with tools declared inline, MCP tool servers attached, or local functions
//! registered, and the client serves every tool the model asks for before
//! handing back the final result.
//!
//! ```rust,ignore
//! use toolmux_core::{ChatCall, ToolClient, ChatMessage, ToolSchema};
//!
//! let client = ToolClient::new();
//! client.registry().register(ToolSchema::new("now", "Current time"), |_| {
//!     Ok(serde_json::json!("12:00"))
//! });
//!
//! let reply = client
//!     .chat_completion(ChatCall::new("gpt-4o", vec![ChatMessage::user("What time is it?")]))
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod orchestrator;
pub mod providers;
pub mod secrets;
pub mod tools;
pub mod types;

pub use error::{OrchestratorError, OrchestratorResult};

pub use types::{
    ChatCompletion, ChatMessage, ChatToolCall, EmbeddingResponse, MessageRole, Response,
    ResponseInput, ResponseItem, ToolArguments, ToolSchema,
};

pub use orchestrator::{ChatCall, EmbeddingCall, ResponseCall, ToolClient, ToolClientBuilder};

pub use tools::{FunctionRegistry, ToolFnError, ToolFnResult};

pub use mcp::{McpClient, McpError, McpResult, McpServer, McpTransport, MemoryToolServer, ToolServer};

pub use providers::{CompletionBackend, ProviderError, ProviderResult};

pub use config::{ConfigFile, FileConfigProvider};

pub use secrets::{ChainSecretStore, EnvSecretStore, MemorySecretStore, SecretStore};

pub use logging::{ConsoleLogger, Logger, MemoryLogger, NoOpLogger};
