//! Provider seam between the bridge and whatever actually serves tools.
//!
//! The bridge only sees [`ToolProvider`]s produced by a [`ProviderConnector`];
//! [`StdioConnector`] is the production connector (spawned MCP process),
//! tests plug in in-memory providers.

use super::client::McpClient;
use super::transport::StdioTransport;
use super::types::McpTool;
use async_trait::async_trait;
use forge_foundation::config::DEFAULT_CALL_TIMEOUT_MS;
use forge_foundation::{Result, ServerConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A connected tool provider
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Server name this provider was connected as
    fn server(&self) -> &str;

    async fn list_tools(&self) -> Result<Vec<McpTool>>;

    /// Invoke `name` (the provider-local tool name).
    ///
    /// `cancel` fires when the caller abandons the call; the provider may
    /// stop work early but is not required to.
    async fn call_tool(&self, name: &str, args: Value, cancel: CancellationToken) -> Result<Value>;

    async fn close(&self) -> Result<()>;
}

/// Opens a provider for one server configuration
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ToolProvider>>;
}

/// Spawns the configured command and speaks MCP over its stdio
#[derive(Debug, Clone)]
pub struct StdioConnector {
    /// Budget for the `initialize` handshake when the server sets none
    handshake_timeout: Duration,
}

impl StdioConnector {
    pub fn new() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }

    pub fn with_handshake_timeout(timeout: Duration) -> Self {
        Self {
            handshake_timeout: timeout,
        }
    }
}

impl Default for StdioConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderConnector for StdioConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ToolProvider>> {
        let transport = Arc::new(StdioTransport::spawn(config).await?);
        let timeout = config
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.handshake_timeout);
        let client = McpClient::connect(&config.name, transport, timeout).await?;
        Ok(Arc::new(client))
    }
}
