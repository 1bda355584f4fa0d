use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{DotbridgeError, Result};
use crate::path::PathStyle;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TOOLCHAIN: &str = "dotnet";

/// Server configuration, read from a TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub server: ListenerConfig,
    pub toolchain: ToolchainConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    pub bind: SocketAddr,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Executable looked up on the search path
    pub program: String,
    pub path_style: PathStyle,
    /// Upper bound for every toolchain invocation; none when unset
    pub timeout_secs: Option<u64>,
    /// Upper bound for `run_project`; falls back to `timeout_secs`
    pub run_timeout_secs: Option<u64>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_TOOLCHAIN.to_string(),
            path_style: PathStyle::Auto,
            timeout_secs: None,
            run_timeout_secs: None,
        }
    }
}

impl ToolchainConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs
            .or(self.timeout_secs)
            .map(Duration::from_secs)
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(content)
            .map_err(|e| DotbridgeError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.toolchain.program.trim().is_empty() {
            return Err(DotbridgeError::InvalidConfiguration(
                "toolchain.program must not be empty".to_string(),
            ));
        }
        for (name, value) in [
            ("timeout_secs", self.toolchain.timeout_secs),
            ("run_timeout_secs", self.toolchain.run_timeout_secs),
        ] {
            if value == Some(0) {
                return Err(DotbridgeError::InvalidConfiguration(format!(
                    "toolchain.{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}
