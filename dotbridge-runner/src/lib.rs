pub mod builder;
pub mod executor;
pub mod process;
pub mod project;
pub mod report;

pub use builder::CommandBuilder;
pub use executor::ToolExecutor;
pub use process::{CommandRunner, ProcessRunner};
