//! Model Context Protocol endpoint: JSON-RPC 2.0 over `POST /mcp`.
//!
//! Protocol flow:
//!   1. Client sends `initialize` and receives capabilities
//!   2. Client sends `notifications/initialized` (answered with 202, no body)
//!   3. Client sends `tools/list` to discover the toolchain operations
//!   4. Client sends `tools/call`; the text report comes back as content

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use dotbridge_core::{ToolCall, ToolDef, TOOLS};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::AppState;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "dotbridge";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

type RpcError = (i64, String);

pub async fn handle_mcp(State(state): State<AppState>, body: String) -> Response {
    let request: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Malformed JSON-RPC request");
            return Json(error_response(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)))
                .into_response();
        }
    };

    if !request.is_object() {
        return Json(error_response(
            Value::Null,
            INVALID_REQUEST,
            "Request must be a JSON object".to_string(),
        ))
        .into_response();
    }

    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

    // Notifications carry no id and get no JSON-RPC answer
    let Some(id) = request.get("id").cloned() else {
        debug!(method, "Notification received");
        return StatusCode::ACCEPTED.into_response();
    };

    let response = match dispatch(&state, method, params).await {
        Ok(result) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result
        }),
        Err((code, message)) => error_response(id, code, message),
    };
    Json(response).into_response()
}

async fn dispatch(state: &AppState, method: &str, params: Value) -> Result<Value, RpcError> {
    match method {
        "initialize" => Ok(initialize_result()),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({
            "tools": TOOLS.iter().map(ToolDef::to_json).collect::<Vec<_>>()
        })),
        "tools/call" => call_tool(state, params).await,
        "resources/list" => Ok(json!({ "resources": [] })),
        "prompts/list" => Ok(json!({ "prompts": [] })),
        _ => Err((METHOD_NOT_FOUND, format!("Method not found: {}", method))),
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "resources": {},
            "prompts": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

async fn call_tool(state: &AppState, params: Value) -> Result<Value, RpcError> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| (INVALID_PARAMS, "tools/call requires a tool name".to_string()))?;
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    let call = match ToolCall::from_name(name, arguments) {
        Ok(call) => call,
        Err(e) => {
            info!(tool = name, error = %e, "Rejected tool call");
            return Ok(tool_result(format!("Error: {}", e), true));
        }
    };

    let report = state.executor.execute(call).await;
    Ok(tool_result(report, false))
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}

fn error_response(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::test_support::{echo_state, send};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    async fn rpc(body: &str) -> (StatusCode, String) {
        send(router(echo_state()), "POST", "/mcp", body).await
    }

    async fn rpc_json(request: Value) -> Value {
        let (status, body) = rpc(&request.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_str(&body).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = rpc_json(json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": { "protocolVersion": "2024-11-05", "capabilities": {} }
        }))
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "dotbridge");
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list_contains_catalogue() {
        let response = rpc_json(json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/list" })).await;

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 19);
        let build = tools.iter().find(|t| t["name"] == "build_project").unwrap();
        assert_eq!(build["inputSchema"]["required"], json!(["projectPath"]));
    }

    #[tokio::test]
    async fn test_tools_call_returns_report() {
        let response = rpc_json(json!({
            "jsonrpc": "2.0", "id": 7, "method": "tools/call",
            "params": {
                "name": "list_packages",
                "arguments": { "projectPath": "/mnt/c/App/App.csproj" }
            }
        }))
        .await;

        let result = &response["result"];
        assert_eq!(result["isError"], false);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Command: dotnet list \"C:\\App\\App.csproj\" package"));
        assert!(text.contains("Exit Code: 0"));
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_error_result() {
        let response = rpc_json(json!({
            "jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": { "name": "format_disk", "arguments": {} }
        }))
        .await;

        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Unknown tool: format_disk"));
    }

    #[tokio::test]
    async fn test_tools_call_without_name_is_invalid_params() {
        let response = rpc_json(json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {}
        }))
        .await;

        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let (status, body) = rpc(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = rpc_json(json!({ "jsonrpc": "2.0", "id": 4, "method": "sampling/createMessage" })).await;

        assert_eq!(response["id"], 4);
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let (status, body) = rpc("{not json").await;
        assert_eq!(status, StatusCode::OK);

        let response: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_empty_resource_and_prompt_lists() {
        let resources = rpc_json(json!({ "jsonrpc": "2.0", "id": 5, "method": "resources/list" })).await;
        let prompts = rpc_json(json!({ "jsonrpc": "2.0", "id": 6, "method": "prompts/list" })).await;

        assert_eq!(resources["result"]["resources"], json!([]));
        assert_eq!(prompts["result"]["prompts"], json!([]));
    }
}
