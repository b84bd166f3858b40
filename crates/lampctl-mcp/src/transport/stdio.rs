// ABOUTME: Stdio transport reading newline-delimited JSON-RPC from stdin and writing to stdout
// ABOUTME: Runs until stdin closes or the process is interrupted; tool failures never stop it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use async_trait::async_trait;
use lampctl::LampError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, RpcErrorCode};
use crate::server::McpServer;
use crate::transport::McpTransport;

/// MCP transport over stdin/stdout using newline-delimited JSON-RPC
///
/// Each line on stdin is expected to be a complete JSON-RPC message.
/// Responses are written as single lines to stdout. Logs go to stderr
/// to avoid polluting the protocol channel.
pub struct StdioTransport;

#[async_trait]
impl McpTransport for StdioTransport {
    async fn serve(self, server: Arc<McpServer>) -> Result<(), LampError> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();

        tokio::select! {
            result = serve_lines(stdin, stdout, &server) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down stdio transport");
                Ok(())
            }
        }
    }
}

/// Serve JSON-RPC lines from `reader`, writing responses to `writer`, until EOF
pub async fn serve_lines<R, W>(
    reader: R,
    mut writer: W,
    server: &McpServer,
) -> Result<(), LampError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    debug!("Stdio transport ready, waiting for JSON-RPC messages");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return Err(LampError::internal(format!("stdin read failed: {e}"))),
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                error!(error = %e, "Failed to parse JSON-RPC request");
                let resp = JsonRpcResponse::error(
                    None,
                    RpcErrorCode::ParseError,
                    format!("Parse error: {e}"),
                );
                write_response(&mut writer, &resp).await?;
                continue;
            }
        };

        debug!(method = %request.method, "Handling MCP request");

        if let Some(response) = server.handle_request(request).await {
            write_response(&mut writer, &response).await?;
        }
    }

    debug!("Input closed, shutting down stdio transport");
    Ok(())
}

/// Serialize and write a JSON-RPC response as a single line
async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<(), LampError>
where
    W: AsyncWrite + Unpin,
{
    let mut json = serde_json::to_vec(response)
        .map_err(|e| LampError::internal(format!("JSON serialization failed: {e}")))?;
    json.push(b'\n');

    writer
        .write_all(&json)
        .await
        .map_err(|e| LampError::internal(format!("stdout write failed: {e}")))?;

    writer
        .flush()
        .await
        .map_err(|e| LampError::internal(format!("stdout flush failed: {e}")))
}
