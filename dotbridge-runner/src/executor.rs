use dotbridge_core::tools::ProjectParams;
use dotbridge_core::{CommandSpec, PathTranslator, ToolCall, ToolchainConfig};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::builder::CommandBuilder;
use crate::process::{CommandRunner, ProcessRunner};
use crate::project::project_info_report;
use crate::report::{format_error, format_report};

/// Turns a [`ToolCall`] into a toolchain invocation and a text report
#[derive(Clone)]
pub struct ToolExecutor {
    builder: CommandBuilder,
    runner: Arc<dyn CommandRunner>,
    run_runner: Arc<dyn CommandRunner>,
}

impl ToolExecutor {
    pub fn new(builder: CommandBuilder, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            builder,
            run_runner: runner.clone(),
            runner,
        }
    }

    /// Use a separate runner for `run_project`, which may need its own timeout
    pub fn with_run_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.run_runner = runner;
        self
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        let builder = CommandBuilder::new(
            config.program.clone(),
            PathTranslator::from_style(config.path_style),
        );

        Self::new(
            builder,
            Arc::new(ProcessRunner::new().with_timeout(config.timeout())),
        )
        .with_run_runner(Arc::new(
            ProcessRunner::new().with_timeout(config.run_timeout()),
        ))
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    /// Execute one tool call. Never fails: every problem, including a panic
    /// inside the invocation, comes back as an `Error <action>: ...` text.
    pub async fn execute(&self, call: ToolCall) -> String {
        let action = call.action();
        let span = info_span!(
            "tool",
            invocation_id = %Uuid::new_v4(),
            tool = call.name()
        );

        let executor = self.clone();
        let task = tokio::spawn(async move { executor.dispatch(call).await }.instrument(span));

        match task.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, action, "Tool invocation aborted");
                format!("Error {}: {}", action, e)
            }
        }
    }

    async fn dispatch(&self, call: ToolCall) -> String {
        info!("Executing tool");

        match &call {
            ToolCall::GetProjectInfo(params) => self.project_info(&call, params).await,
            _ => match self.builder.for_call(&call) {
                Some(spec) => self.run_command(&call, &spec).await,
                None => format!("Error {}: tool does not invoke the toolchain", call.action()),
            },
        }
    }

    async fn project_info(&self, call: &ToolCall, params: &ProjectParams) -> String {
        match project_info_report(self.builder.translator(), &params.project_path).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Failed to read project file");
                format_error(call.action(), None, &e)
            }
        }
    }

    async fn run_command(&self, call: &ToolCall, spec: &CommandSpec) -> String {
        let runner = match call {
            ToolCall::RunProject(_) => &self.run_runner,
            _ => &self.runner,
        };

        match runner.run(spec).await {
            Ok(result) => {
                info!(
                    exit_code = result.exit_code,
                    duration_ms = result.duration_ms,
                    "Tool completed"
                );
                format_report(spec, &result)
            }
            Err(e) => {
                error!(error = %e, command = %spec, "Tool invocation failed");
                format_error(call.action(), Some(spec), &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use dotbridge_core::tools::{BuildParams, CleanParams, RunParams};
    use dotbridge_core::{DotbridgeError, ExecutionResult, HostConvention, Result};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every spec and answers with a canned outcome
    struct RecordingRunner {
        calls: Mutex<Vec<CommandSpec>>,
        outcome: fn(&CommandSpec) -> Result<ExecutionResult>,
    }

    impl RecordingRunner {
        fn new(outcome: fn(&CommandSpec) -> Result<ExecutionResult>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                outcome,
            })
        }

        fn recorded(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
            self.calls.lock().unwrap().push(spec.clone());
            (self.outcome)(spec)
        }
    }

    fn exited(exit_code: i32, stdout: &str, stderr: &str) -> Result<ExecutionResult> {
        let now = Utc::now();
        Ok(ExecutionResult {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            started_at: now,
            completed_at: now,
            duration_ms: 5,
        })
    }

    fn executor(runner: Arc<RecordingRunner>) -> ToolExecutor {
        ToolExecutor::new(
            CommandBuilder::new("dotnet", PathTranslator::new(HostConvention::Windows)),
            runner,
        )
    }

    #[tokio::test]
    async fn test_clean_report() {
        let runner = RecordingRunner::new(|_| exited(0, "Cleaning...\nDone.", ""));
        let report = executor(runner.clone())
            .execute(ToolCall::CleanProject(CleanParams {
                project_path: "/mnt/e/src/App/App.csproj".to_string(),
                configuration: None,
            }))
            .await;

        assert!(report.starts_with(
            "Command: dotnet clean \"E:\\src\\App\\App.csproj\" --configuration Release\n"
        ));
        assert!(report.contains("Exit Code: 0"));
        assert!(report.contains("--- Output ---\nCleaning...\nDone."));
        assert!(!report.contains("--- Errors ---"));

        let recorded = runner.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(
            recorded[0].argv(),
            vec!["clean", r"E:\src\App\App.csproj", "--configuration", "Release"]
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_a_normal_report() {
        let runner = RecordingRunner::new(|_| exited(1, "Build FAILED.", "error CS0103"));
        let report = executor(runner)
            .execute(ToolCall::BuildProject(BuildParams {
                project_path: "/mnt/e/src/App/App.csproj".to_string(),
                configuration: None,
                additional_args: None,
                suppress_warnings: false,
            }))
            .await;

        assert!(report.contains("Exit Code: 1"));
        assert!(report.contains("--- Errors ---\nerror CS0103"));
        assert!(!report.starts_with("Error"));
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported_with_operation() {
        let runner = RecordingRunner::new(|spec| {
            Err(DotbridgeError::ToolchainNotFound {
                program: spec.program().to_string(),
                reason: "cannot find binary path".to_string(),
            })
        });
        let report = executor(runner)
            .execute(ToolCall::RebuildProject(BuildParams {
                project_path: "/mnt/e/src/App/App.csproj".to_string(),
                configuration: None,
                additional_args: None,
                suppress_warnings: true,
            }))
            .await;

        assert!(report.starts_with("Error rebuilding project: Toolchain executable 'dotnet' not found"));
        assert!(!report.contains("Exit Code"));
    }

    #[tokio::test]
    async fn test_run_project_uses_run_runner() {
        let general = RecordingRunner::new(|_| exited(0, "", ""));
        let run = RecordingRunner::new(|_| {
            Err(DotbridgeError::TimedOut {
                program: "dotnet".to_string(),
                timeout: Duration::from_secs(5),
                stdout: "Now listening".to_string(),
                stderr: String::new(),
            })
        });
        let executor = executor(general.clone()).with_run_runner(run.clone());

        let report = executor
            .execute(ToolCall::RunProject(RunParams {
                project_path: "/mnt/e/src/App/App.csproj".to_string(),
                arguments: None,
                configuration: None,
            }))
            .await;

        assert!(general.recorded().is_empty());
        assert_eq!(run.recorded().len(), 1);
        assert!(report.starts_with("Error running project: 'dotnet' timed out after 5s"));
        assert!(report.contains("--- Output ---\nNow listening"));
    }

    #[tokio::test]
    async fn test_project_info_does_not_invoke_toolchain() {
        let runner = RecordingRunner::new(|_| exited(0, "", ""));
        let report = executor(runner.clone())
            .execute(ToolCall::GetProjectInfo(ProjectParams {
                project_path: "/mnt/q/nowhere/App.csproj".to_string(),
            }))
            .await;

        assert!(runner.recorded().is_empty());
        assert!(report.contains("not found"));
        assert!(report.contains("/mnt/q/nowhere/App.csproj"));
        assert!(report.contains(r"Q:\nowhere\App.csproj"));
    }

    #[tokio::test]
    async fn test_panicking_runner_is_contained() {
        let runner = RecordingRunner::new(|_| panic!("runner exploded"));
        let report = executor(runner)
            .execute(ToolCall::RestorePackages(ProjectParams {
                project_path: "/mnt/c/App/App.csproj".to_string(),
            }))
            .await;

        assert!(report.starts_with("Error restoring packages: "));
    }

    #[tokio::test]
    async fn test_identical_calls_produce_identical_commands() {
        let runner = RecordingRunner::new(|_| exited(0, "", ""));
        let executor = executor(runner.clone());
        let call = ToolCall::RebuildProject(BuildParams {
            project_path: "/mnt/e/src/App/App.csproj".to_string(),
            configuration: None,
            additional_args: Some("-p:Platform=x64".to_string()),
            suppress_warnings: true,
        });

        let first = executor.execute(call.clone()).await;
        let second = executor.execute(call).await;

        assert_eq!(first, second);
        let recorded = runner.recorded();
        assert_eq!(recorded[0], recorded[1]);
        assert_eq!(recorded[0].arguments().matches("--nologo").count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_project_dir_reaches_toolchain() {
        let executor = ToolExecutor::new(
            CommandBuilder::new("sh", PathTranslator::new(HostConvention::Posix)),
            Arc::new(ProcessRunner::new()),
        );

        let report = executor
            .execute(ToolCall::BuildProject(BuildParams {
                project_path: "/nonexistent/App/App.csproj".to_string(),
                configuration: None,
                additional_args: None,
                suppress_warnings: false,
            }))
            .await;

        assert!(report.starts_with("Command: sh build \"/nonexistent/App/App.csproj\""));
        assert!(report.contains("Exit Code: "));
        assert!(!report.contains("Failed to start"));
    }

    #[tokio::test]
    async fn test_from_config_uses_configured_program() {
        let config = ToolchainConfig {
            program: "dotnet-custom".to_string(),
            path_style: dotbridge_core::PathStyle::Windows,
            timeout_secs: Some(600),
            run_timeout_secs: Some(60),
        };
        let executor = ToolExecutor::from_config(&config);

        let spec = executor
            .builder()
            .restore(&ProjectParams {
                project_path: "/mnt/c/App/App.csproj".to_string(),
            });
        assert_eq!(spec.program(), "dotnet-custom");
        assert_eq!(spec.arguments(), r#"restore "C:\App\App.csproj""#);
    }
}
