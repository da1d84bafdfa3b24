use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

use graphiti_mcp_server::bootstrap::AppContext;
use graphiti_mcp_server::server::McpServer;
use graphiti_memory::GraphitiConfig;

/// An `McpServer` running against in-memory pipes, with helpers for
/// line-oriented request/response exchanges.
pub struct TestServer {
    to_server: WriteHalf<DuplexStream>,
    from_server: BufReader<ReadHalf<DuplexStream>>,
    pub handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub fn spawn(ctx: AppContext) -> Self {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let (server_rx, server_tx) = tokio::io::split(server_end);
        let (client_rx, client_tx) = tokio::io::split(client_end);

        let server = McpServer::new(Arc::new(ctx));
        let handle = tokio::spawn(async move { server.run(server_rx, server_tx).await });

        Self {
            to_server: client_tx,
            from_server: BufReader::new(client_rx),
            handle,
        }
    }

    /// Send one raw line to the server.
    pub async fn send_line(&mut self, line: &str) {
        self.to_server
            .write_all(line.as_bytes())
            .await
            .expect("write request");
        self.to_server.write_all(b"\n").await.expect("write newline");
        self.to_server.flush().await.expect("flush request");
    }

    /// Read one response line and parse it as JSON.
    pub async fn recv_json(&mut self) -> Value {
        let mut line = String::new();
        let n = self
            .from_server
            .read_line(&mut line)
            .await
            .expect("read response");
        assert!(n > 0, "server closed the stream before responding");
        serde_json::from_str(line.trim()).expect("response is valid JSON")
    }

    /// Send a request object and read back its response.
    pub async fn round_trip(&mut self, request: &Value) -> Value {
        self.send_line(&request.to_string()).await;
        self.recv_json().await
    }

    /// Close the client side of the pipe and wait for the loop to exit.
    pub async fn close(self) -> anyhow::Result<()> {
        // Both split halves must drop before the underlying duplex stream
        // closes and the server's reader sees EOF.
        drop(self.to_server);
        drop(self.from_server);
        self.handle.await.expect("server task panicked")
    }
}

/// Context for a server whose graph backend never came up. `error` of
/// `None` models the pre-initialization state.
pub fn disconnected_ctx(error: Option<&str>) -> AppContext {
    AppContext::disconnected(GraphitiConfig::default(), error.map(String::from))
}

/// Unwrap the text-content envelope around a tool result.
pub fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("tool result carries a text content block");
    serde_json::from_str(text).expect("tool payload is valid JSON")
}
