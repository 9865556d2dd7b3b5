//! MCP 서버 설정
//!
//! JSON 형식 (`timeoutMs` 등 camelCase 키 허용):
//! ```json
//! {
//!   "name": "k8s",
//!   "command": "npx",
//!   "args": ["-y", "mcp-server-kubernetes"],
//!   "env": { "KUBECONFIG": "${HOME}/.kube/config" },
//!   "timeoutMs": 15000
//! }
//! ```

use crate::{Error, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

/// One tool provider process the bridge should spawn and talk to over stdio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Unique server name; prefix of every qualified tool name
    pub name: String,

    /// 실행 명령
    pub command: String,

    /// 명령 인자
    #[serde(default)]
    pub args: Vec<String>,

    /// 환경 변수 (`${VAR}` / `${VAR:-default}` 확장 지원)
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Per-call budget; falls back to the bridge default when absent
    #[serde(default, alias = "timeout_ms", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout_ms: None,
        }
    }

    /// 인자 추가
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// 여러 인자 추가
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// 환경 변수 추가
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Environment with `${VAR}` references expanded against the host env
    pub fn expanded_env(&self) -> BTreeMap<String, String> {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), expand_env_var(v)))
            .collect()
    }

    /// 유효성 검증
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("server name must not be empty".to_string()));
        }
        if self.name.contains(crate::strings::QUALIFIED_NAME_SEPARATOR) {
            return Err(Error::Config(format!(
                "server name '{}' must not contain '{}'",
                self.name,
                crate::strings::QUALIFIED_NAME_SEPARATOR
            )));
        }
        if self.command.trim().is_empty() {
            return Err(Error::Config(format!(
                "server '{}' has an empty command",
                self.name
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(Error::Config(format!(
                "server '{}' has a zero timeout",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}:]+):-([^}]*)\}").ok())
        .as_ref()
}

fn simple_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").ok()).as_ref()
}

/// 환경변수 확장
/// - ${VAR}: 환경변수 값
/// - ${VAR:-default}: 환경변수가 없으면 기본값
pub fn expand_env_var(value: &str) -> String {
    let mut result = value.to_string();

    if let Some(re) = default_pattern() {
        result = re
            .replace_all(&result, |caps: &Captures| {
                std::env::var(&caps[1]).unwrap_or_else(|_| caps[2].to_string())
            })
            .into_owned();
    }

    if let Some(re) = simple_pattern() {
        result = re
            .replace_all(&result, |caps: &Captures| {
                std::env::var(&caps[1]).unwrap_or_else(|_| {
                    warn!("Environment variable {} is not set, expanding to empty", &caps[1]);
                    String::new()
                })
            })
            .into_owned();
    }

    result
}
