// ABOUTME: JSON-RPC and MCP wire types used by the lamp server
// ABOUTME: Tool results always carry exactly one text part built from a lamp ToolResponse
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use lampctl::ToolResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// MCP protocol version supported by this server
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported during MCP handshake
pub const SERVER_NAME: &str = "kasa-lamp-controller";

/// Server version reported during MCP handshake
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// JSON-RPC
// ============================================================================

/// JSON-RPC error codes the lamp server answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    /// A stdin line was not valid JSON-RPC
    ParseError,
    /// Wrong `jsonrpc` version marker
    InvalidRequest,
    /// Method other than initialize, tools/list, tools/call, ping
    MethodNotFound,
    /// `tools/call` without a usable tool name
    InvalidParams,
    /// A result could not be serialized
    InternalError,
}

impl RpcErrorCode {
    /// Numeric code sent on the wire
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32_700,
            Self::InvalidRequest => -32_600,
            Self::MethodNotFound => -32_601,
            Self::InvalidParams => -32_602,
            Self::InternalError => -32_603,
        }
    }
}

/// Incoming JSON-RPC request or notification
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version marker (always "2.0")
    pub jsonrpc: String,
    /// Request identifier (None for notifications)
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Option<Value>,
}

/// Outgoing JSON-RPC response, carrying either a result or an error
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Result(Value),
    Error { code: i32, message: String },
}

impl JsonRpcResponse {
    /// Answer `id` with a serialized payload
    ///
    /// A payload that fails to serialize becomes an internal error response.
    pub fn result<T: Serialize>(id: Option<Value>, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => Self {
                jsonrpc: "2.0",
                id,
                outcome: Outcome::Result(value),
            },
            Err(e) => Self::error(
                id,
                RpcErrorCode::InternalError,
                format!("Serialization error: {e}"),
            ),
        }
    }

    /// Answer `id` with an error
    pub fn error(id: Option<Value>, code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Error {
                code: code.code(),
                message: message.into(),
            },
        }
    }
}

// ============================================================================
// MCP Initialize
// ============================================================================

/// Handshake reply: protocol version, a fixed tool list, server identity
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    protocol_version: &'static str,
    capabilities: ServerCapabilities,
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolsCapability {
    list_changed: bool,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            // The four lamp tools never change at runtime
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME,
                version: SERVER_VERSION,
            },
        }
    }
}

// ============================================================================
// MCP Tools
// ============================================================================

/// Tool definition exposed via `tools/list`
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Wire name, one of the `LampTool` names
    pub name: &'static str,
    /// Human-readable tool description
    pub description: &'static str,
    /// JSON Schema describing the tool's input
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of a `tools/list` call
#[derive(Debug, Serialize)]
pub struct ToolsListResult {
    /// Available tool definitions
    pub tools: Vec<ToolDefinition>,
}

/// Parameters for a `tools/call` request
#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    /// Name of the lamp tool to invoke
    pub name: String,
    /// Tool arguments, `{}` when the client sends none
    #[serde(default = "no_arguments")]
    pub arguments: Value,
}

fn no_arguments() -> Value {
    Value::Object(Map::new())
}

/// Result of a `tools/call` invocation
///
/// Lamp failures are not flagged structurally; their text starts with `Error:`.
#[derive(Debug, Serialize)]
pub struct CallToolResult {
    content: [TextContent; 1],
}

#[derive(Debug, Serialize)]
struct TextContent {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl From<ToolResponse> for CallToolResult {
    fn from(response: ToolResponse) -> Self {
        Self {
            content: [TextContent {
                kind: "text",
                text: response.text,
            }],
        }
    }
}
