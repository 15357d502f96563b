//! Configuration
//!
//! `FileConfigProvider` reads YAML from a user-level, workspace-level or
//! explicit path. A missing file means defaults.

mod file;

pub use file::{
    ConfigError, ConfigFile, ConfigLevel, ConfigResult, FileConfigProvider, LoopSettings,
    NativeSettings, ProviderEndpoint, ToolServerConfig, DEFAULT_MAX_TOOL_LOOPS,
};
