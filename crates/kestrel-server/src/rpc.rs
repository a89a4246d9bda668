//! JSON-RPC method routing.

use async_trait::async_trait;
use kestrel_mcp::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, McpError, RequestId, ToolInfo,
};
use kestrel_tools::{Dispatcher, ToolContext};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::session::MessageHandler;

/// Routes MCP methods to the tool dispatcher.
#[derive(Debug, Clone)]
pub struct RpcRouter {
    dispatcher: Dispatcher,
    instructions: Option<String>,
}

impl RpcRouter {
    /// Create a router over `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            instructions: None,
        }
    }

    /// Set the instructions returned from `initialize`.
    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    /// The dispatcher behind `tools/*`.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn respond(&self, raw: &str, ctx: &ToolContext) -> Option<JsonRpcResponse> {
        let request = match JsonRpcRequest::parse(raw) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Rejected malformed message");
                return Some(JsonRpcResponse::failure(request_id(raw), e.to_rpc_error()));
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }

        let id = request.id.clone();
        let response = match self.call(&request, ctx).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                debug!(method = %request.method, error = %e, "Request failed");
                JsonRpcResponse::failure(id, e.to_rpc_error())
            }
        };
        Some(response)
    }

    async fn call(&self, request: &JsonRpcRequest, ctx: &ToolContext) -> Result<Value, McpError> {
        match request.method.as_str() {
            "initialize" => {
                let params: InitializeParams = request.parse_params()?;
                if let Some(client) = &params.client_info {
                    debug!(client = %client.name, version = %client.version, "Client initializing");
                }
                to_result(InitializeResult::tools_server(self.instructions.clone()))
            }
            "ping" => Ok(json!({})),
            "tools/list" => {
                let tools: Vec<ToolInfo> = self
                    .dispatcher
                    .list()
                    .into_iter()
                    .map(ToolInfo::from)
                    .collect();
                to_result(ListToolsResult { tools })
            }
            "tools/call" => {
                let params: CallToolParams = request.parse_params()?;
                let envelope = self
                    .dispatcher
                    .invoke(&params.name, params.arguments, ctx)
                    .await;
                to_result(envelope.into_call_result())
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }
}

#[async_trait]
impl MessageHandler for RpcRouter {
    async fn handle(&self, raw: String, ctx: ToolContext) -> Option<String> {
        let response = self.respond(&raw, &ctx).await?;
        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                error!(error = %e, "Failed to serialize response");
                None
            }
        }
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::Internal(e.to_string()))
}

/// Best-effort id recovery from a message that failed validation.
fn request_id(raw: &str) -> Option<RequestId> {
    let value: Value = serde_json::from_str(raw).ok()?;
    serde_json::from_value(value.get("id")?.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use kestrel_mcp::{CallToolResult, JsonRpcError};
    use kestrel_tools::ToolRegistry;
    use kestrel_tools::testing::EchoTool;

    fn router() -> RpcRouter {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::new()).unwrap();
        RpcRouter::new(Dispatcher::new(Arc::new(registry)))
    }

    async fn send(router: &RpcRouter, raw: &str) -> Option<JsonRpcResponse> {
        router.respond(raw, &ToolContext::default()).await
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = send(
            &router(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1.0"}}}"#,
        )
        .await
        .unwrap();

        let result = response.into_result().unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "kestrel");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_ping() {
        let response = send(&router(), r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, Some(RequestId::String("p".into())));
        assert_eq!(response.into_result().unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let response = send(
            &router(),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = send(&router(), r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let result = response.into_result().unwrap();
        assert_eq!(result["tools"][0]["name"], "echo");
        assert!(result["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call() {
        let response = send(
            &router(),
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo","arguments":{"message":"hi"}}}"#,
        )
        .await
        .unwrap();

        let result: CallToolResult =
            serde_json::from_value(response.into_result().unwrap()).unwrap();
        assert!(!result.is_error());
        let payload: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(payload["echo"]["message"], "hi");
    }

    #[tokio::test]
    async fn test_tool_failure_is_result_not_rpc_error() {
        let response = send(
            &router(),
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .await
        .unwrap();

        assert!(!response.is_error());
        let result: CallToolResult =
            serde_json::from_value(response.into_result().unwrap()).unwrap();
        assert!(result.is_error());
        let body: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = send(
            &router(),
            r#"{"jsonrpc":"2.0","id":5,"method":"resources/list"}"#,
        )
        .await
        .unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_call_params() {
        let response = send(
            &router(),
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"arguments":{}}}"#,
        )
        .await
        .unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let response = send(&router(), "{not json").await.unwrap();
        assert!(response.id.is_none());
        assert_eq!(
            response.into_result().unwrap_err().code,
            JsonRpcError::PARSE_ERROR
        );
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_id() {
        let response = send(&router(), r#"{"jsonrpc":"1.0","id":7,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, Some(RequestId::Number(7)));
        assert_eq!(
            response.into_result().unwrap_err().code,
            JsonRpcError::INVALID_REQUEST
        );
    }

    #[tokio::test]
    async fn test_handle_serializes() {
        let text = router()
            .handle(
                r#"{"jsonrpc":"2.0","id":8,"method":"ping"}"#.to_string(),
                ToolContext::default(),
            )
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["id"], 8);
        assert_eq!(value["jsonrpc"], "2.0");
    }
}
