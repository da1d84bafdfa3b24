//! Newline-delimited JSON-RPC request loop over stdio.
//!
//! One request per line in, one response per line out. Responses are
//! serialized without interior newlines so the framing survives any
//! transport that relays lines verbatim.

use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::bootstrap::AppContext;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
use crate::tools;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "graphiti-memory";

pub struct McpServer {
    ctx: Arc<AppContext>,
}

impl McpServer {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Serve requests until the reader reaches EOF.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            let n = reader
                .read_line(&mut line)
                .await
                .context("reading request line")?;
            if n == 0 {
                info!("stdin closed, stopping request loop");
                return Ok(());
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(trimmed).await {
                let mut out = serde_json::to_vec(&response).context("serializing response")?;
                out.push(b'\n');
                writer.write_all(&out).await.context("writing response")?;
                writer.flush().await.context("flushing response")?;
            }
        }
    }

    /// Process one request line. `None` means nothing is written back,
    /// which is the case for notifications only; malformed input still
    /// gets an error response so clients are never left waiting.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "discarding unparseable request line");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ));
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "ignoring notification");
            return None;
        }

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => {
                info!("handling initialize");
                JsonRpcResponse::result(request.id, self.initialize_result())
            }
            "tools/list" => {
                info!("handling tools/list");
                JsonRpcResponse::result(request.id, self.tools_list_result())
            }
            "tools/call" => {
                let name = request
                    .params
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));

                info!(tool = %name, "handling tool call");
                let result = tools::dispatch(&self.ctx, &name, arguments).await;
                JsonRpcResponse::result(request.id, wrap_tool_result(&result))
            }
            other => {
                warn!(method = %other, "unknown method");
                JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {other}"),
                )
            }
        };

        Some(response)
    }

    fn initialize_result(&self) -> Value {
        let status = self.ctx.status();
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "graphiti_status": status.as_str(),
                "initialization_error": status.error(),
            },
        })
    }

    fn tools_list_result(&self) -> Value {
        json!({
            "tools": tools::tool_definitions(),
            "graphiti_status": self.ctx.status().as_str(),
        })
    }
}

/// Tool results travel as a JSON string inside a text content block.
fn wrap_tool_result(result: &Value) -> Value {
    json!({
        "content": [{ "type": "text", "text": result.to_string() }],
    })
}
