use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dotbridge_core::{DotbridgeError, ToolCall, ToolDef, TOOLS};
use dotbridge_runner::ToolExecutor;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::mcp;

#[derive(Clone)]
pub struct AppState {
    pub executor: ToolExecutor,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/tools", get(list_tools))
        .route("/api/v1/tools/:name", post(call_tool))
        .route("/mcp", post(mcp::handle_mcp))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn list_tools() -> Json<Value> {
    Json(json!({
        "tools": TOOLS.iter().map(ToolDef::to_json).collect::<Vec<_>>()
    }))
}

/// Runs one tool. The body is the JSON arguments object; an empty body
/// means no arguments. Any toolchain outcome is a `200` text report.
async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<String, (StatusCode, String)> {
    let arguments = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)))?
    };

    let call = ToolCall::from_name(&name, arguments).map_err(|e| {
        info!(tool = %name, error = %e, "Rejected tool call");
        let status = match e {
            DotbridgeError::UnknownTool(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, e.to_string())
    })?;

    Ok(state.executor.execute(call).await)
}
