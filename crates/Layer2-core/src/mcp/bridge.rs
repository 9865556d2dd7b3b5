//! Tool Bridge - MCP 서버 연결 관리 및 도구 호출 프록시
//!
//! ## 기능
//! - **초기화**: 서버별 연결 + `tools/list` → qualified name 레지스트리
//! - **호출**: 레지스트리 조회, redaction, 타임아웃 (`tokio::select!`)
//! - **종료**: 모든 연결 종료 및 레지스트리 / manifest 캐시 정리
//!
//! Initialisation is all-or-nothing: any failure closes what was opened and
//! leaves the bridge empty.

use super::provider::{ProviderConnector, StdioConnector, ToolProvider};
use super::redact::{NoopRedactor, PatternRedactor, Redactor};
use super::registry::{ToolRegistration, ToolRegistry};
use crate::codegen::Manifest;
use forge_foundation::config::validate_servers;
use forge_foundation::{BridgeConfig, Error, Result, ServerConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 연결된 서버
struct ServerConnection {
    config: ServerConfig,
    provider: Arc<dyn ToolProvider>,
}

#[derive(Default)]
struct BridgeState {
    initialized: bool,
    connections: Vec<ServerConnection>,
    registry: ToolRegistry,
}

impl BridgeState {
    fn connection(&self, server: &str) -> Option<&ServerConnection> {
        self.connections.iter().find(|c| c.config.name == server)
    }
}

/// Tool Bridge
///
/// All methods take `&self`; the bridge is meant to be shared behind an
/// `Arc` between the codegen step and any number of sandbox sessions.
pub struct ToolBridge {
    config: BridgeConfig,
    connector: Arc<dyn ProviderConnector>,
    redactor: Arc<dyn Redactor>,
    state: RwLock<BridgeState>,
    /// Discovery manifest, built lazily and dropped on `close`
    manifest: parking_lot::Mutex<Option<Arc<Manifest>>>,
}

impl ToolBridge {
    pub fn new(config: BridgeConfig) -> Self {
        let redactor: Arc<dyn Redactor> = if config.redact {
            Arc::new(PatternRedactor::with_defaults())
        } else {
            Arc::new(NoopRedactor)
        };
        Self {
            config,
            connector: Arc::new(StdioConnector::new()),
            redactor,
            state: RwLock::new(BridgeState::default()),
            manifest: parking_lot::Mutex::new(None),
        }
    }

    /// Provider connector (default: [`StdioConnector`])
    pub fn with_connector(mut self, connector: Arc<dyn ProviderConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_redactor(mut self, redactor: Arc<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Initialise from the servers listed in the bridge configuration
    pub async fn initialize_configured(&self) -> Result<()> {
        let servers = self.config.servers.clone();
        self.initialize(&servers).await
    }

    /// 서버 연결 및 도구 등록
    pub async fn initialize(&self, servers: &[ServerConfig]) -> Result<()> {
        let mut state = self.state.write().await;
        if state.initialized {
            return Err(Error::Config("bridge is already initialized".to_string()));
        }

        // 연결 전에 설정 검증 (중복 서버 이름 포함)
        validate_servers(servers)?;

        info!("Initializing tool bridge with {} server(s)", servers.len());

        let mut connections: Vec<ServerConnection> = Vec::with_capacity(servers.len());
        let mut registry = ToolRegistry::new();

        for config in servers {
            match self.connect_server(config, &mut registry).await {
                Ok(provider) => connections.push(ServerConnection {
                    config: config.clone(),
                    provider,
                }),
                Err(e) => {
                    error!("Bridge initialization failed at '{}': {}", config.name, e);
                    close_all(&connections).await;
                    return Err(e);
                }
            }
        }

        info!(
            "Tool bridge ready: {} server(s), {} tool(s)",
            connections.len(),
            registry.len()
        );

        state.connections = connections;
        state.registry = registry;
        state.initialized = true;
        *self.manifest.lock() = None;
        Ok(())
    }

    async fn connect_server(
        &self,
        config: &ServerConfig,
        registry: &mut ToolRegistry,
    ) -> Result<Arc<dyn ToolProvider>> {
        let provider = self.connector.connect(config).await?;

        let tools = match provider.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                let _ = provider.close().await;
                return Err(Error::connection(&config.name, format!("tools/list failed: {}", e)));
            }
        };

        debug!("Server '{}' listed {} tool(s)", config.name, tools.len());

        for tool in tools {
            if let Err(e) = registry.register(ToolRegistration::new(&config.name, tool)) {
                let _ = provider.close().await;
                return Err(e);
            }
        }

        Ok(provider)
    }

    /// 도구 호출 (qualified name 기준)
    pub async fn call_tool(&self, qualified_name: &str, args: Value) -> Result<Value> {
        let (provider, tool_name, budget_ms) = {
            let state = self.state.read().await;
            let registration = state
                .registry
                .get(qualified_name)
                .ok_or_else(|| Error::UnknownTool(qualified_name.to_string()))?;
            let connection = state
                .connection(&registration.server)
                .ok_or_else(|| Error::UnknownServer(registration.server.clone()))?;
            (
                Arc::clone(&connection.provider),
                registration.tool_name.clone(),
                self.config.timeout_for(&connection.config),
            )
        };

        let (args, redactions) = self.redactor.redact(args);
        let cancel = CancellationToken::new();

        debug!("Bridge call {} (budget {}ms)", qualified_name, budget_ms);

        let result = tokio::select! {
            result = provider.call_tool(&tool_name, args, cancel.clone()) => result,
            _ = tokio::time::sleep(Duration::from_millis(budget_ms)) => {
                cancel.cancel();
                warn!("Tool call '{}' abandoned after {}ms", qualified_name, budget_ms);
                return Err(Error::CallTimeout {
                    qualified_name: qualified_name.to_string(),
                    budget_ms,
                });
            }
        };

        match result {
            Ok(value) => Ok(self.redactor.restore(value, &redactions)),
            Err(Error::ToolExecution { message, .. }) => {
                // provider가 인자를 에러 메시지에 되돌려 보낼 수 있음
                let message = match self.redactor.restore(Value::String(message), &redactions) {
                    Value::String(message) => message,
                    other => other.to_string(),
                };
                Err(Error::tool_execution(qualified_name, message))
            }
            Err(e) => Err(e),
        }
    }

    /// 모든 연결 종료 (idempotent)
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.initialized {
            info!("Closing tool bridge ({} server(s))", state.connections.len());
        }
        close_all(&state.connections).await;
        *state = BridgeState::default();
        *self.manifest.lock() = None;
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }

    /// 등록된 전체 도구
    pub async fn list_tools(&self) -> Vec<ToolRegistration> {
        self.state.read().await.registry.to_vec()
    }

    /// 서버 이름 목록 (설정 순서)
    pub async fn list_servers(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .connections
            .iter()
            .map(|c| c.config.name.clone())
            .collect()
    }

    /// 특정 서버의 도구
    pub async fn server_tools(&self, server: &str) -> Result<Vec<ToolRegistration>> {
        let state = self.state.read().await;
        if state.connection(server).is_none() {
            return Err(Error::UnknownServer(server.to_string()));
        }
        Ok(state.registry.for_server(server).cloned().collect())
    }

    /// Discovery manifest, cached until `close`
    pub async fn manifest(&self) -> Arc<Manifest> {
        let cached = self.manifest.lock().clone();
        if let Some(manifest) = cached {
            return manifest;
        }
        let tools = self.list_tools().await;
        let manifest = Arc::new(Manifest::from_registrations(&tools));
        *self.manifest.lock() = Some(Arc::clone(&manifest));
        manifest
    }
}

async fn close_all(connections: &[ServerConnection]) {
    for connection in connections {
        if let Err(e) = connection.provider.close().await {
            warn!("Error closing server '{}': {}", connection.config.name, e);
        }
    }
}
