//! Tool Bridge 설정

use super::ServerConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Budget applied to a tool call when its server sets none
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Bridge-wide settings plus the provider list handed to `initialize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    #[serde(default = "default_call_timeout", alias = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Redact secret-looking strings from tool arguments before they leave
    /// the host, restoring them in the result
    #[serde(default)]
    pub redact: bool,
}

fn default_call_timeout() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            default_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            redact: false,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 서버 추가
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.servers.push(server);
        self
    }

    pub fn default_timeout_ms(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    pub fn redact(mut self, enabled: bool) -> Self {
        self.redact = enabled;
        self
    }

    /// Effective call budget for a server
    pub fn timeout_for(&self, server: &ServerConfig) -> u64 {
        server.timeout_ms.unwrap_or(self.default_timeout_ms)
    }

    /// 유효성 검증 (중복 서버 이름 포함)
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 {
            return Err(Error::Config("default timeout must be positive".to_string()));
        }
        validate_servers(&self.servers)
    }
}

/// Validate every server and reject duplicate names
pub fn validate_servers(servers: &[ServerConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for server in servers {
        server.validate()?;
        if !seen.insert(server.name.as_str()) {
            return Err(Error::DuplicateServer(server.name.clone()));
        }
    }
    Ok(())
}
