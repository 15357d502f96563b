//! Tool server transport declarations

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How to reach a tool server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpTransport {
    /// Spawn a child process and speak MCP over its stdio
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// Streamable HTTP endpoint
    Http { url: String },
    /// Unix domain socket
    Unix { path: PathBuf },
}

impl McpTransport {
    pub fn stdio(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        McpTransport::Stdio {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        McpTransport::Http { url: url.into() }
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        McpTransport::Unix { path: path.into() }
    }
}

impl fmt::Display for McpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McpTransport::Stdio { command, args, .. } if args.is_empty() => {
                write!(f, "stdio:{}", command)
            }
            McpTransport::Stdio { command, args, .. } => {
                write!(f, "stdio:{} {}", command, args.join(" "))
            }
            McpTransport::Http { url } => write!(f, "http:{}", url),
            McpTransport::Unix { path } => write!(f, "unix:{}", path.display()),
        }
    }
}
