//! MCP JSON-RPC endpoint
//!
//! Stateless: every POST carries one JSON-RPC message and gets one JSON
//! reply. Notifications are acknowledged with 202 and no body. Tool
//! failures are reported inside a successful `tools/call` result with
//! `isError` set; protocol failures use JSON-RPC error objects.

use anyhow::Result;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use icloud_caldav_core::mcp::{
    INVALID_PARAMS, INVALID_REQUEST, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR, ServerCapabilities,
    ServerInfo, ToolsCallParams, ToolsCapability, ToolsListResult, negotiate_version,
};
use serde_json::{Value, json};
use tracing::debug;

use crate::routes::AppError;
use crate::state::AppState;

pub const SERVER_NAME: &str = "icloud-caldav";

pub fn router() -> Router<AppState> {
    Router::new().route("/mcp", post(handle_message))
}

/// POST /mcp - One JSON-RPC message in, one out
async fn handle_message(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return Ok(reply(JsonRpcResponse::failure(
                Value::Null,
                PARSE_ERROR,
                format!("Parse error: {}", e),
            )));
        }
    };

    let request: JsonRpcRequest = match serde_json::from_value(value.clone()) {
        Ok(request) => request,
        Err(e) => {
            let id = value.get("id").cloned().unwrap_or(Value::Null);
            return Ok(reply(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            )));
        }
    };

    if request.is_notification() {
        debug!(method = %request.method, "notification");
        return Ok(StatusCode::ACCEPTED.into_response());
    }
    let id = request.id.clone().unwrap_or_default();

    let response = match handle_method(&state, &request.method, request.params).await? {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error.code, error.message),
    };
    Ok(reply(response))
}

fn reply(response: JsonRpcResponse) -> Response {
    (StatusCode::OK, Json(response)).into_response()
}

fn rpc_error(code: i64, message: impl Into<String>) -> JsonRpcError {
    JsonRpcError {
        code,
        message: message.into(),
        data: None,
    }
}

async fn handle_method(
    state: &AppState,
    method: &str,
    params: Option<Value>,
) -> Result<Result<Value, JsonRpcError>> {
    debug!(%method, "rpc");

    match method {
        "initialize" => {
            let params: InitializeParams = params
                .and_then(|p| serde_json::from_value(p).ok())
                .unwrap_or_default();
            let result = InitializeResult {
                protocol_version: negotiate_version(params.protocol_version.as_deref()).to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability {
                        list_changed: false,
                    }),
                },
                server_info: ServerInfo {
                    name: SERVER_NAME.to_string(),
                    version: Some(env!("CARGO_PKG_VERSION").to_string()),
                },
            };
            Ok(Ok(serde_json::to_value(result)?))
        }
        "ping" => Ok(Ok(json!({}))),
        "tools/list" => {
            let result = ToolsListResult {
                tools: state.tools.definitions(),
            };
            Ok(Ok(serde_json::to_value(result)?))
        }
        "tools/call" => {
            let params: ToolsCallParams =
                match serde_json::from_value(params.unwrap_or(Value::Null)) {
                    Ok(params) => params,
                    Err(e) => {
                        return Ok(Err(rpc_error(
                            INVALID_PARAMS,
                            format!("Invalid params for tools/call: {}", e),
                        )));
                    }
                };
            let Some(command) = state.tools.lookup(&params.name) else {
                return Ok(Err(rpc_error(
                    INVALID_PARAMS,
                    format!("Unknown tool: {}", params.name),
                )));
            };

            let result = state
                .tools
                .call(
                    &state.config,
                    state.connector.as_ref(),
                    command,
                    params.arguments.unwrap_or(Value::Null),
                )
                .await;
            Ok(Ok(serde_json::to_value(result)?))
        }
        other => Ok(Err(rpc_error(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        ))),
    }
}
