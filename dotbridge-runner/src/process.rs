use async_trait::async_trait;
use chrono::Utc;
use dotbridge_core::{CommandSpec, DotbridgeError, ExecutionResult, Result};
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// How long a killed child's pipes may take to close before draining is abandoned
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Executes a [`CommandSpec`] and captures its output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// A child that starts and exits, whatever its exit code, is `Ok`.
    /// Only a failed launch or an expired timeout is an error.
    async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult>;
}

/// Runs external processes with both output streams drained concurrently
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self { timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        let program = resolve_program(spec.program())?;

        let mut command = Command::new(&program);
        command
            .args(spec.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = spec.working_dir() {
            command.current_dir(dir);
        }
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        info!(
            program = %program.display(),
            cwd = ?spec.working_dir(),
            command = %spec,
            "Starting process"
        );

        let started_at = Utc::now();
        let start_instant = Instant::now();

        let mut child = command
            .spawn()
            .map_err(|source| DotbridgeError::LaunchFailed {
                program: spec.program().to_string(),
                source,
            })?;

        // Both readers start before the wait so neither pipe can fill up and stall the child
        let mut stdout = Drain::spawn(child.stdout.take(), "stdout");
        let mut stderr = Drain::spawn(child.stderr.take(), "stderr");

        // One deadline bounds the wait and the drain together: a grandchild
        // that inherited the pipes can keep them open after the child exits
        let deadline = self.timeout.map(|limit| tokio::time::Instant::now() + limit);

        let status = match within(deadline, child.wait()).await {
            Some(status) => status?,
            None => {
                warn!(command = %spec, timeout = ?self.timeout, "Process timed out, terminating");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out process");
                }
                return Err(self.timed_out(spec, stdout, stderr).await);
            }
        };

        let drained = within(deadline, async {
            tokio::join!(stdout.finish(), stderr.finish());
        })
        .await;
        if drained.is_none() {
            warn!(
                command = %spec,
                timeout = ?self.timeout,
                "Process exited but its output pipes are still open"
            );
            return Err(self.timed_out(spec, stdout, stderr).await);
        }

        let exit_code = status.code().unwrap_or_else(|| {
            warn!(command = %spec, status = %status, "Process terminated without an exit code");
            -1
        });
        let duration_ms = start_instant.elapsed().as_millis() as u64;

        info!(
            command = %spec,
            exit_code,
            duration_ms,
            "Process exited"
        );

        Ok(ExecutionResult {
            exit_code,
            stdout: stdout.captured(),
            stderr: stderr.captured(),
            started_at,
            completed_at: Utc::now(),
            duration_ms,
        })
    }
}

impl ProcessRunner {
    /// Give the readers a short grace period to pick up what is left, then
    /// stop them and report whatever was captured.
    async fn timed_out(&self, spec: &CommandSpec, mut stdout: Drain, mut stderr: Drain) -> DotbridgeError {
        let grace = tokio::time::timeout(DRAIN_GRACE, async {
            tokio::join!(stdout.finish(), stderr.finish());
        })
        .await;
        if grace.is_err() {
            debug!("Output readers still blocked after grace period");
        }

        DotbridgeError::TimedOut {
            program: spec.program().to_string(),
            timeout: self.timeout.unwrap_or_default(),
            stdout: stdout.abort(),
            stderr: stderr.abort(),
        }
    }
}

/// Run `future` to completion, or until `deadline` when one is set
async fn within<F: Future>(deadline: Option<tokio::time::Instant>, future: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future).await.ok(),
        None => Some(future.await),
    }
}

fn resolve_program(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|e| DotbridgeError::ToolchainNotFound {
        program: program.to_string(),
        reason: e.to_string(),
    })
}

/// Background reader for one output stream. Lines land in a shared buffer
/// so output read before an abort is kept.
struct Drain {
    task: JoinHandle<()>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Drain {
    fn spawn<R>(pipe: Option<R>, stream: &'static str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = buffer.clone();

        let task = tokio::spawn(async move {
            let Some(pipe) = pipe else {
                return;
            };

            let mut reader = BufReader::new(pipe);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        trace!(stream, line = %String::from_utf8_lossy(&line).trim_end(), "Child output");
                        lock(&sink).extend_from_slice(&line);
                    }
                    Err(e) => {
                        warn!(stream, error = %e, "Failed to read child output");
                        break;
                    }
                }
            }
        });

        Self { task, buffer }
    }

    /// Wait for EOF on the stream
    async fn finish(&mut self) {
        if self.task.is_finished() {
            return;
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Output reader task failed");
        }
    }

    fn abort(self) -> String {
        self.task.abort();
        self.captured()
    }

    fn captured(&self) -> String {
        decode(&lock(&self.buffer))
    }
}

fn lock(buffer: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_captures_exit_code() {
        let result = ProcessRunner::new().run(&sh("exit 3")).await.unwrap();
        assert_eq!(result.exit_code, 3);
        assert!(!result.success());
    }

    #[tokio::test]
    async fn test_captures_streams_separately() {
        let result = ProcessRunner::new()
            .run(&sh("echo out; echo err >&2"))
            .await
            .unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "out");
        assert_eq!(result.stderr, "err");
    }

    #[tokio::test]
    async fn test_output_is_trimmed() {
        let result = ProcessRunner::new()
            .run(&sh("printf '\\n  hello  \\n\\n'"))
            .await
            .unwrap();
        assert_eq!(result.stdout, "hello");
        assert_eq!(result.stderr, "");
    }

    #[tokio::test]
    async fn test_preserves_line_order_within_stream() {
        let result = ProcessRunner::new()
            .run(&sh("for i in 1 2 3 4 5; do echo line$i; echo err$i >&2; done"))
            .await
            .unwrap();

        assert_eq!(result.stdout, "line1\nline2\nline3\nline4\nline5");
        assert_eq!(result.stderr, "err1\nerr2\nerr3\nerr4\nerr5");
    }

    #[tokio::test]
    async fn test_large_stderr_before_stdout_does_not_deadlock() {
        let script = "head -c 200000 /dev/zero | tr '\\0' 'e' >&2; echo done";
        let result = tokio::time::timeout(
            Duration::from_secs(30),
            ProcessRunner::new().run(&sh(script)),
        )
        .await
        .expect("runner deadlocked")
        .unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "done");
        assert_eq!(result.stderr.len(), 200_000);
        assert!(result.stderr.bytes().all(|b| b == b'e'));
    }

    #[tokio::test]
    async fn test_large_output_on_both_streams() {
        let script = "i=0; while [ $i -lt 5000 ]; do echo \"stdout line $i\"; echo \"stderr line $i\" >&2; i=$((i+1)); done";
        let result = ProcessRunner::new().run(&sh(script)).await.unwrap();

        let out: Vec<_> = result.stdout.lines().collect();
        let err: Vec<_> = result.stderr.lines().collect();
        assert_eq!(out.len(), 5000);
        assert_eq!(err.len(), 5000);
        assert_eq!(out[0], "stdout line 0");
        assert_eq!(out[4999], "stdout line 4999");
        assert_eq!(err[4999], "stderr line 4999");
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let spec = sh("pwd -P").cwd(Some(dir.path().to_path_buf()));

        let result = ProcessRunner::new().run(&spec).await.unwrap();
        let expected = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(result.stdout, expected.to_string_lossy());
    }

    #[tokio::test]
    async fn test_missing_executable_is_an_error() {
        let spec = CommandSpec::new("dotbridge-definitely-not-installed").arg("build");
        let err = ProcessRunner::new().run(&spec).await.unwrap_err();
        assert!(matches!(err, DotbridgeError::ToolchainNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_working_directory_is_launch_failure() {
        let spec = sh("true").cwd(Some(PathBuf::from("/nonexistent/dotbridge/dir")));
        let err = ProcessRunner::new().run(&spec).await.unwrap_err();
        assert!(matches!(err, DotbridgeError::LaunchFailed { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = ProcessRunner::new().with_timeout(Some(Duration::from_millis(200)));
        let started = Instant::now();

        let err = runner
            .run(&sh("echo started; exec sleep 5"))
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(4));
        match err {
            DotbridgeError::TimedOut {
                program,
                timeout,
                stdout,
                ..
            } => {
                assert_eq!(program, "sh");
                assert_eq!(timeout, Duration::from_millis(200));
                assert_eq!(stdout, "started");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_bounds_pipes_held_by_grandchild() {
        let runner = ProcessRunner::new().with_timeout(Some(Duration::from_secs(1)));
        let started = Instant::now();

        let err = runner.run(&sh("sleep 6 & echo hi")).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(4));
        match err {
            DotbridgeError::TimedOut { timeout, stdout, .. } => {
                assert_eq!(timeout, Duration::from_secs(1));
                assert_eq!(stdout, "hi");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_not_hit_by_fast_process() {
        let runner = ProcessRunner::new().with_timeout(Some(Duration::from_secs(10)));
        let result = runner.run(&sh("echo quick")).await.unwrap();
        assert_eq!(result.stdout, "quick");
    }

    #[tokio::test]
    async fn test_concurrent_invocations_are_independent() {
        let runner = ProcessRunner::new();
        let first = sh("echo first; exit 1");
        let second = sh("echo second");

        let (a, b) = tokio::join!(runner.run(&first), runner.run(&second));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!((a.exit_code, a.stdout.as_str()), (1, "first"));
        assert_eq!((b.exit_code, b.stdout.as_str()), (0, "second"));
    }
}
