// ABOUTME: MCP server core routing JSON-RPC requests to protocol handlers and the lamp dispatcher
// ABOUTME: Implements initialize, tools/list, tools/call, and ping MCP methods
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use lampctl::ToolDispatcher;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    RpcErrorCode, ToolsListResult,
};
use crate::tools;

/// MCP server that dispatches JSON-RPC requests to the appropriate handler
///
/// Transport layers feed parsed requests into `handle_request` and send the
/// returned responses. Tool calls go to the lamp [`ToolDispatcher`], which
/// owns the single lamp session.
pub struct McpServer {
    dispatcher: Arc<ToolDispatcher>,
}

impl McpServer {
    /// Create a server backed by the given dispatcher
    pub const fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Dispatcher handling `tools/call`
    pub const fn dispatcher(&self) -> &Arc<ToolDispatcher> {
        &self.dispatcher
    }

    /// Route a JSON-RPC request to the appropriate MCP handler
    ///
    /// Returns `None` for notifications (requests without an id).
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                RpcErrorCode::InvalidRequest,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            ));
        }

        // Notifications have no id and expect no response
        if request.id.is_none() {
            debug!(method = %request.method, "Received notification, no response");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(request.id, request.params.as_ref()),
            "tools/list" => Self::handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            "ping" => JsonRpcResponse::result(request.id, &json!({})),
            method => {
                debug!(method, "Unknown MCP method");
                JsonRpcResponse::error(
                    request.id,
                    RpcErrorCode::MethodNotFound,
                    format!("Method not found: {method}"),
                )
            }
        };

        Some(response)
    }

    /// Handle `initialize`: note which agent host connected, then advertise the tools
    fn handle_initialize(id: Option<Value>, params: Option<&Value>) -> JsonRpcResponse {
        let client = params
            .and_then(|p| p.pointer("/clientInfo/name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client, "MCP client connected");

        JsonRpcResponse::result(id, &InitializeResult::default())
    }

    /// Handle `tools/list`: return the four lamp tool definitions
    fn handle_tools_list(id: Option<Value>) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: tools::list_definitions(),
        };
        JsonRpcResponse::result(id, &result)
    }

    /// Handle `tools/call`: run the named lamp tool
    ///
    /// Malformed params are a JSON-RPC error; everything the dispatcher
    /// reports, including unknown tools, comes back as text content.
    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(
                id,
                RpcErrorCode::InvalidParams,
                "Missing params for tools/call",
            );
        };

        let call_params: CallToolParams = match serde_json::from_value(params) {
            Ok(cp) => cp,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    RpcErrorCode::InvalidParams,
                    format!("Invalid params: {e}"),
                );
            }
        };

        let response = self
            .dispatcher
            .dispatch(&call_params.name, &call_params.arguments)
            .await;
        JsonRpcResponse::result(id, &CallToolResult::from(response))
    }
}
