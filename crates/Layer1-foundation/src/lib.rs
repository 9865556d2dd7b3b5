//! # forge-foundation
//!
//! Foundation layer for the Forge code-mode sandbox:
//! - Error: 공통 에러 타입 (`Error`, `ErrorOrigin`, `ErrorPayload`)
//! - Config: Bridge / Server / Sandbox 설정 + 환경 변수 override
//! - Strings: qualified name, 식별자 변환 헬퍼
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  forge-sandbox  (Session, Backend, Module Loader)       │
//! │                     │                                   │
//! │                     ▼                                   │
//! │  forge-core     (Tool Bridge, Schema, Codegen)          │
//! │                     │                                   │
//! │                     ▼                                   │
//! │  forge-foundation (Error, Config, Strings)              │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod strings;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, ErrorOrigin, ErrorPayload, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{BridgeConfig, HostVersion, SandboxSettings, ServerConfig};
