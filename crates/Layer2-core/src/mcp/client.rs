//! MCP Client - MCP 서버 클라이언트
//!
//! 하나의 MCP 서버와의 세션: initialize 핸드셰이크, 도구 목록 조회, 도구 호출.
//! Connection loss is reported, never repaired; the bridge decides what a
//! failed server means.

use super::provider::ToolProvider;
use super::transport::McpTransport;
use super::types::{McpTool, McpToolResult, ToolsListResult, MCP_PROTOCOL_VERSION};
use async_trait::async_trait;
use forge_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on `tools/list` pages followed for one server
const MAX_LIST_PAGES: usize = 64;

/// MCP 클라이언트 정보
#[derive(Debug, Clone, Serialize)]
struct ClientInfo {
    name: String,
    version: String,
}

/// MCP 서버 정보
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Initialize 응답
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: String,
    #[serde(default)]
    server_info: ServerInfo,
}

/// MCP 클라이언트
pub struct McpClient {
    /// 서버 이름
    server: String,

    /// 전송 계층
    transport: Arc<dyn McpTransport>,

    server_info: ServerInfo,
}

impl McpClient {
    /// Run the `initialize` handshake over `transport` within `timeout`
    pub async fn connect(
        server: impl Into<String>,
        transport: Arc<dyn McpTransport>,
        timeout: Duration,
    ) -> Result<Self> {
        let server = server.into();
        let server_info = match tokio::time::timeout(timeout, handshake(transport.as_ref())).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                let _ = transport.close().await;
                return Err(Error::connection(&server, format!("initialize failed: {}", e)));
            }
            Err(_) => {
                let _ = transport.close().await;
                return Err(Error::connection(
                    &server,
                    format!("initialize timed out after {}ms", timeout.as_millis()),
                ));
            }
        };

        info!(
            "Connected to MCP server '{}' ({} v{})",
            server, server_info.name, server_info.version
        );

        Ok(Self {
            server,
            transport,
            server_info,
        })
    }

    /// 서버 정보 (initialize 응답)
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// 연결 상태
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }
}

/// MCP initialize 핸드셰이크
async fn handshake(transport: &dyn McpTransport) -> Result<ServerInfo> {
    let params = json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "clientInfo": ClientInfo {
            name: "forge-sandbox".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        "capabilities": {}
    });

    let never = CancellationToken::new();
    let result = transport.request("initialize", Some(params), &never).await?;

    let init: InitializeResult = serde_json::from_value(result)
        .map_err(|e| Error::Protocol(format!("Invalid initialize response: {}", e)))?;

    if init.protocol_version != MCP_PROTOCOL_VERSION {
        warn!(
            "MCP server '{}' negotiated protocol {} (requested {})",
            init.server_info.name, init.protocol_version, MCP_PROTOCOL_VERSION
        );
    }

    // initialized 알림 전송
    transport.notify("notifications/initialized", None).await?;

    Ok(init.server_info)
}

#[async_trait]
impl ToolProvider for McpClient {
    fn server(&self) -> &str {
        &self.server
    }

    /// 도구 목록 (`nextCursor` 페이지 순회)
    async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let never = CancellationToken::new();
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self.transport.request("tools/list", params, &never).await?;
            let page: ToolsListResult = serde_json::from_value(result)
                .map_err(|e| Error::Protocol(format!("Invalid tools/list response: {}", e)))?;

            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => {
                    debug!("Listed {} tools from MCP server '{}'", tools.len(), self.server);
                    return Ok(tools);
                }
            }
        }

        Err(Error::Protocol(format!(
            "tools/list from '{}' exceeded {} pages",
            self.server, MAX_LIST_PAGES
        )))
    }

    /// 도구 호출
    async fn call_tool(&self, name: &str, args: Value, cancel: CancellationToken) -> Result<Value> {
        debug!("Calling MCP tool: {}/{}", self.server, name);

        let params = json!({
            "name": name,
            "arguments": args
        });
        let result = self
            .transport
            .request("tools/call", Some(params), &cancel)
            .await?;

        // 결과 파싱
        let tool_result: McpToolResult = serde_json::from_value(result)
            .map_err(|e| Error::Protocol(format!("Invalid tools/call response: {}", e)))?;

        if tool_result.is_error {
            let message = tool_result.text().unwrap_or("MCP tool error").to_string();
            warn!("MCP tool '{}/{}' returned error: {}", self.server, name, message);
            return Err(Error::tool_execution(name, message));
        }

        Ok(tool_result.into_value())
    }

    /// 연결 종료
    async fn close(&self) -> Result<()> {
        self.transport.close().await?;
        info!("Disconnected from MCP server: {}", self.server);
        Ok(())
    }
}
