//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/toolmux/config.yaml), workspace-level
//! (.config/toolmux/config.yaml) and explicitly located config files.
//!
//! ```yaml
//! native:
//!   provider: openai
//!   api_base: https://api.openai.com/v1
//! loop:
//!   max_tool_loops: 20
//!   tool_choice: auto
//! providers:
//!   - name: mistral
//!     api_base: https://api.mistral.ai/v1/
//! tool_servers:
//!   - name: fs
//!     transport:
//!       type: stdio
//!       command: npx
//!       args: ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::logging::Logger;
use crate::mcp::{McpServer, McpTransport, ToolServer};
use crate::providers::OPENAI_API_BASE;

pub const DEFAULT_MAX_TOOL_LOOPS: usize = 20;

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Tool server not found: {0}")]
    ToolServerNotFound(String),

    #[error("Tool server already exists: {0}")]
    ToolServerExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Native backend
    #[serde(default)]
    pub native: NativeSettings,

    /// Tool loop behavior
    #[serde(default, rename = "loop")]
    pub tool_loop: LoopSettings,

    /// Endpoint overrides for routed providers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderEndpoint>,

    /// Tool servers available to every call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_servers: Vec<ToolServerConfig>,
}

/// Which provider is served natively, and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeSettings {
    #[serde(default = "default_native_provider")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

fn default_native_provider() -> String {
    "openai".to_string()
}

impl Default for NativeSettings {
    fn default() -> Self {
        Self {
            provider: default_native_provider(),
            api_base: None,
        }
    }
}

impl NativeSettings {
    pub fn api_base_or_default(&self) -> &str {
        self.api_base.as_deref().unwrap_or(OPENAI_API_BASE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Model calls per chat completion before giving up on tools
    #[serde(default = "default_max_tool_loops")]
    pub max_tool_loops: usize,
    /// `tool_choice` sent with tools when the caller sets none
    #[serde(default = "default_tool_choice")]
    pub tool_choice: String,
}

fn default_max_tool_loops() -> usize {
    DEFAULT_MAX_TOOL_LOOPS
}

fn default_tool_choice() -> String {
    "auto".to_string()
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_tool_loops: default_max_tool_loops(),
            tool_choice: default_tool_choice(),
        }
    }
}

/// Endpoint override for one routed provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// A declared tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolServerConfig {
    pub name: String,
    pub transport: McpTransport,
}

impl ToolServerConfig {
    /// Unconnected handle for this server
    pub fn to_server(&self, logger: Arc<dyn Logger>) -> Arc<dyn ToolServer> {
        Arc::new(McpServer::new(self.name.clone(), self.transport.clone(), logger))
    }
}

impl ConfigFile {
    /// Unconnected handles for every declared tool server
    pub fn tool_servers(&self, logger: &Arc<dyn Logger>) -> Vec<Arc<dyn ToolServer>> {
        self.tool_servers
            .iter()
            .map(|s| s.to_server(Arc::clone(logger)))
            .collect()
    }
}

/// Config level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/toolmux/config.yaml)
    User,
    /// Workspace-level config (.config/toolmux/config.yaml in workspace root)
    Workspace,
    /// A file named by the caller
    Explicit,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
            ConfigLevel::Explicit => "explicit",
        }
    }
}

/// File-based configuration provider
///
/// Reads and writes configuration from YAML files.
///
/// # Example
///
/// ```no_run
/// use toolmux_core::config::FileConfigProvider;
///
/// // User-level config
/// let user_config = FileConfigProvider::user();
///
/// // Workspace-level config
/// let workspace_config = FileConfigProvider::workspace("/path/to/workspace");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    /// Create a new file config provider for a specific path
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// Create a user-level config provider (~/.config/toolmux/config.yaml)
    pub fn user() -> Self {
        // XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("toolmux").join("config.yaml"), ConfigLevel::User)
    }

    /// Create a workspace-level config provider (.config/toolmux/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root
            .as_ref()
            .join(".config")
            .join("toolmux")
            .join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    /// Create a provider for an explicit file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ConfigLevel::Explicit)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the config level
    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    /// Check if the config file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Write `config` to disk and cache it
    pub fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml::to_string(config)?)?;
        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    /// Cached config, loading it on first use
    pub fn config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Declare a new tool server
    pub fn add_tool_server(&self, server: ToolServerConfig) -> ConfigResult<()> {
        let mut config = self.config()?;
        if config.tool_servers.iter().any(|s| s.name == server.name) {
            return Err(ConfigError::ToolServerExists(server.name));
        }
        config.tool_servers.push(server);
        self.save(&config)
    }

    /// Remove a declared tool server
    pub fn remove_tool_server(&self, name: &str) -> ConfigResult<()> {
        let mut config = self.config()?;
        let original_len = config.tool_servers.len();
        config.tool_servers.retain(|s| s.name != name);
        if config.tool_servers.len() == original_len {
            return Err(ConfigError::ToolServerNotFound(name.to_string()));
        }
        self.save(&config)
    }

    /// Create a backup of the current config file
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}
