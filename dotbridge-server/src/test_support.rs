use async_trait::async_trait;
use axum::{body::Body, http::Request, http::StatusCode, Router};
use chrono::Utc;
use dotbridge_core::{CommandSpec, ExecutionResult, HostConvention, PathTranslator, Result};
use dotbridge_runner::{CommandBuilder, CommandRunner, ToolExecutor};
use std::sync::Arc;
use tower::ServiceExt;

use crate::api::AppState;

/// Succeeds immediately and echoes the command line on stdout
struct EchoRunner;

#[async_trait]
impl CommandRunner for EchoRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        let now = Utc::now();
        Ok(ExecutionResult {
            exit_code: 0,
            stdout: spec.command_line(),
            stderr: String::new(),
            started_at: now,
            completed_at: now,
            duration_ms: 1,
        })
    }
}

pub fn echo_state() -> AppState {
    let builder = CommandBuilder::new("dotnet", PathTranslator::new(HostConvention::Windows));
    AppState {
        executor: ToolExecutor::new(builder, Arc::new(EchoRunner)),
    }
}

pub async fn send(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
