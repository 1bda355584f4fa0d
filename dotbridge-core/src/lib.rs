pub mod config;
pub mod error;
pub mod models;
pub mod path;
pub mod tools;

pub use config::{ListenerConfig, ServerConfig, ToolchainConfig};
pub use error::{DotbridgeError, Result};
pub use models::{CommandArg, CommandSpec, ExecutionResult, ProjectInfo};
pub use path::{project_dir, HostConvention, PathStyle, PathTranslator};
pub use tools::{find_tool, ToolCall, ToolDef, TOOLS};
