use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DotbridgeError {
    #[error("Toolchain executable '{program}' not found: {reason}")]
    ToolchainNotFound { program: String, reason: String },

    #[error("Failed to start '{program}': {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {timeout:?} and was terminated")]
    TimedOut {
        program: String,
        timeout: Duration,
        stdout: String,
        stderr: String,
    },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DotbridgeError>;
