//! MCP Bridge - Model Context Protocol 연동
//!
//! 외부 MCP 서버를 통해 도구를 제공합니다.
//!
//! ## 기능
//! - MCP 서버 연결 관리 (stdio)
//! - 도구 목록 동기화 → qualified name 레지스트리
//! - 도구 호출 프록시 (타임아웃, 취소, redaction)
//!
//! ## 참고
//! - https://modelcontextprotocol.io/

mod bridge;
mod client;
mod provider;
mod redact;
mod registry;
mod transport;
mod types;

pub use bridge::ToolBridge;
pub use client::{McpClient, ServerInfo};
pub use provider::{ProviderConnector, StdioConnector, ToolProvider};
pub use redact::{NoopRedactor, PatternRedactor, Redactions, Redactor, DEFAULT_PATTERNS};
pub use registry::{ToolRegistration, ToolRegistry};
pub use transport::{McpTransport, StdioTransport};
pub use types::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpContent, McpTool,
    McpToolResult, MCP_PROTOCOL_VERSION,
};
