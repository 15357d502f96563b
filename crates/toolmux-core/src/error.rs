//! Top-level error type for orchestration calls
//!
//! Only setup failures surface here. Failures inside a single tool's
//! execution are contained in that tool's result and never reach the caller
//! as an error.

use thiserror::Error;

use crate::config::ConfigError;
use crate::mcp::McpError;
use crate::providers::ProviderError;
use crate::types::ArgumentError;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// A tool server could not connect; the call is aborted
    #[error("tool server '{server}' failed to connect: {source}")]
    Connection {
        server: String,
        #[source]
        source: McpError,
    },

    /// A tool server connected but could not list its tools
    #[error("tool server '{server}' failed to list tools: {source}")]
    Listing {
        server: String,
        #[source]
        source: McpError,
    },

    /// The model asked for a tool nobody can execute
    #[error("Tool '{0}' not registered")]
    ToolNotRegistered(String),

    /// Tool arguments failed to parse or did not match the declared schema
    #[error("invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: ArgumentError,
    },

    /// The inbound call could not be read
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No backend could be resolved for the model identifier
    #[error("cannot route model '{0}'")]
    Routing(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The blocking entry points could not run the async implementation
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
