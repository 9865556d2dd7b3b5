//! forge-core: Core layer for the Forge code-mode sandbox
//!
//! Layer2 - 도구 브릿지 및 코드 생성 레이어
//!
//! # 주요 모듈
//!
//! - `mcp`: MCP 서버 연결, qualified name 레지스트리, 도구 호출 (Tool Bridge)
//! - `schema`: JSON Schema 정규화
//! - `codegen`: stub / manifest 생성, 도구 카탈로그
//!
//! # 사용 예시
//!
//! ```ignore
//! use forge_core::{CodegenManager, ToolBridge};
//! use forge_foundation::{BridgeConfig, ServerConfig};
//!
//! let bridge = ToolBridge::new(BridgeConfig::default());
//! bridge
//!     .initialize(&[ServerConfig::new("k8s", "mcp-server-kubernetes")])
//!     .await?;
//!
//! // 도구 호출
//! let pods = bridge.call_tool("k8s__list_pods", json!({})).await?;
//!
//! // stub 생성
//! CodegenManager::new("./.forge/tools")
//!     .generate(&bridge.list_tools().await)
//!     .await?;
//! ```

pub mod codegen;
pub mod mcp;
pub mod schema;

// Re-exports: MCP
pub use mcp::{
    McpClient, McpTool, McpToolResult, NoopRedactor, PatternRedactor, ProviderConnector,
    Redactor, StdioConnector, ToolBridge, ToolProvider, ToolRegistration, ToolRegistry,
};

// Re-exports: Schema
pub use schema::{normalize, NormalizedSchema, Property, ScalarKind};

// Re-exports: Codegen
pub use codegen::{
    CatalogEntry, CodegenManager, GenerationReport, Manifest, ServerManifest, ToolCatalog,
    ToolManifestEntry,
};
