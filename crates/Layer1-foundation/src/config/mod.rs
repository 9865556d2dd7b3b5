//! Config - 통합 설정 관리
//!
//! - `server.rs` - MCP 서버 연결 설정 (`ServerConfig`)
//! - `bridge.rs` - Tool Bridge 설정 (`BridgeConfig`)
//! - `sandbox.rs` - Sandbox 실행 한도 및 backend 선택 (`SandboxSettings`)
//!
//! Loading configuration files is left to the embedding process; these types
//! only define the shape, defaults and environment overrides.

mod bridge;
mod sandbox;
mod server;

pub use bridge::{validate_servers, BridgeConfig, DEFAULT_CALL_TIMEOUT_MS};
pub use sandbox::{
    HostVersion, SandboxSettings, DEFAULT_ISOLATED_MAX_HOST_MAJOR, DEFAULT_MAX_STACK_SIZE,
    DEFAULT_MEMORY_LIMIT_BYTES, DEFAULT_SCRIPT_TIMEOUT_MS, ENV_FORCE_SHARED_HEAP,
    ENV_HOST_VERSION, ENV_MEMORY_LIMIT, ENV_TIMEOUT_MS,
};
pub use server::{expand_env_var, ServerConfig};
