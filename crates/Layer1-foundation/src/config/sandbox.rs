//! Sandbox 실행 설정
//!
//! Resource ceilings for a session plus the inputs of backend selection.
//! Every field can be overridden from the environment via
//! [`SandboxSettings::from_env`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const ENV_FORCE_SHARED_HEAP: &str = "FORGE_SANDBOX_FORCE_SHARED_HEAP";
pub const ENV_HOST_VERSION: &str = "FORGE_SANDBOX_HOST_VERSION";
pub const ENV_TIMEOUT_MS: &str = "FORGE_SANDBOX_TIMEOUT_MS";
pub const ENV_MEMORY_LIMIT: &str = "FORGE_SANDBOX_MEMORY_LIMIT";

/// 64 MiB
pub const DEFAULT_MEMORY_LIMIT_BYTES: usize = 64 * 1024 * 1024;
pub const DEFAULT_MAX_STACK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 30_000;
/// Hosts reporting a major version above this get the shared-heap backend
pub const DEFAULT_ISOLATED_MAX_HOST_MAJOR: u64 = 22;

/// Version of the host runtime that embeds the sandbox (`major.minor.patch`,
/// leading `v` accepted, missing parts default to 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl HostVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for HostVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('v');
        let mut parts = trimmed.split('.');
        let mut next = |required: bool| -> Result<u64> {
            match parts.next() {
                Some(p) => p
                    .parse::<u64>()
                    .map_err(|_| Error::Config(format!("invalid host version '{}'", s))),
                None if required => Err(Error::Config(format!("invalid host version '{}'", s))),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxSettings {
    /// Heap ceiling for the isolated backend (ignored by shared-heap)
    pub memory_limit_bytes: usize,

    pub max_stack_size: usize,

    /// Wall-clock budget for one `run`
    pub timeout_ms: u64,

    /// Always use the shared-heap backend
    pub force_shared_heap: bool,

    /// Version reported by the embedding host, if any
    pub host_version: Option<HostVersion>,

    pub isolated_max_host_major: u64,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            timeout_ms: DEFAULT_SCRIPT_TIMEOUT_MS,
            force_shared_heap: false,
            host_version: None,
            isolated_max_host_major: DEFAULT_ISOLATED_MAX_HOST_MAJOR,
        }
    }
}

impl SandboxSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (testable without touching
    /// the process environment)
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_FORCE_SHARED_HEAP) {
            self.force_shared_heap = parse_flag(&v);
        }
        if let Some(v) = lookup(ENV_HOST_VERSION) {
            if !v.trim().is_empty() {
                self.host_version = Some(v.parse()?);
            }
        }
        if let Some(v) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = v.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be an integer, got '{}'", ENV_TIMEOUT_MS, v))
            })?;
        }
        if let Some(v) = lookup(ENV_MEMORY_LIMIT) {
            self.memory_limit_bytes = v.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be an integer, got '{}'",
                    ENV_MEMORY_LIMIT, v
                ))
            })?;
        }
        self.validate()?;
        debug!(
            "Sandbox settings: timeout {}ms, memory {} bytes, force_shared_heap={}, host {:?}",
            self.timeout_ms, self.memory_limit_bytes, self.force_shared_heap, self.host_version
        );
        Ok(self)
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn memory_limit_bytes(mut self, bytes: usize) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    pub fn force_shared_heap(mut self, force: bool) -> Self {
        self.force_shared_heap = force;
        self
    }

    pub fn host_version(mut self, version: HostVersion) -> Self {
        self.host_version = Some(version);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::Config("sandbox timeout must be positive".to_string()));
        }
        if self.memory_limit_bytes == 0 {
            return Err(Error::Config("memory limit must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
