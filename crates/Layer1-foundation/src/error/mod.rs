//! Error types for Forge
//!
//! 모든 에러를 중앙에서 관리
//!
//! Bridge, codegen and sandbox share one taxonomy so that a failure can be
//! traced back to where it started (a tool call, a module, or a timeout) and
//! converted into a serialisable [`ErrorPayload`] before it is handed to
//! sandboxed code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Where a script-visible failure originated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum ErrorOrigin {
    /// A bridge call, by qualified tool name
    Tool(String),
    /// A module, by resolved path or specifier
    Module(String),
    /// A host capability (`fs.readFile`, `console.log`, ...)
    Capability(String),
    /// The session wall-clock budget
    Timeout,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool(name) => write!(f, "tool:{}", name),
            Self::Module(path) => write!(f, "module:{}", path),
            Self::Capability(name) => write!(f, "capability:{}", name),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Forge 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Duplicate server name: {0}")]
    DuplicateServer(String),

    #[error("Duplicate tool registration: {0}")]
    DuplicateTool(String),

    // ========================================================================
    // Bridge 관련
    // ========================================================================
    #[error("Connection to server '{server}' failed: {message}")]
    Connection { server: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown server: {0}")]
    UnknownServer(String),

    #[error("Tool call '{qualified_name}' timed out after {budget_ms}ms")]
    CallTimeout { qualified_name: String, budget_ms: u64 },

    #[error("Tool execution failed: {tool} - {message}")]
    ToolExecution { tool: String, message: String },

    // ========================================================================
    // Sandbox 관련
    // ========================================================================
    #[error("Cannot resolve module '{specifier}' from '{referrer}': {reason}")]
    ModuleResolution {
        specifier: String,
        referrer: String,
        reason: String,
    },

    #[error("Path '{}' escapes workspace root '{}'", .path.display(), .root.display())]
    WorkspaceAccess { path: PathBuf, root: PathBuf },

    #[error("Sandbox initialization failed on {backend} backend: {message}")]
    SandboxInit { backend: String, message: String },

    #[error("Script error ({origin}): {message}")]
    Script { origin: ErrorOrigin, message: String },

    #[error("Script timed out after {budget_ms}ms")]
    ScriptTimeout { budget_ms: u64 },

    #[error("Invalid session state: {0}")]
    SessionState(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors that abort `initialize` / session construction outright
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::DuplicateServer(_)
                | Error::DuplicateTool(_)
                | Error::Connection { .. }
                | Error::SandboxInit { .. }
        )
    }

    /// Short, stable name of the variant; this is the `kind` scripts see
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "ConfigError",
            Error::DuplicateServer(_) => "DuplicateServerError",
            Error::DuplicateTool(_) => "DuplicateToolError",
            Error::Connection { .. } => "ConnectionError",
            Error::Protocol(_) => "ProtocolError",
            Error::UnknownTool(_) => "UnknownTool",
            Error::UnknownServer(_) => "UnknownServer",
            Error::CallTimeout { .. } => "CallTimeout",
            Error::ToolExecution { .. } => "ToolExecutionError",
            Error::ModuleResolution { .. } => "ModuleResolutionError",
            Error::WorkspaceAccess { .. } => "WorkspaceAccessError",
            Error::SandboxInit { .. } => "SandboxInitError",
            Error::Script { .. } => "ScriptError",
            Error::ScriptTimeout { .. } => "ScriptTimeout",
            Error::SessionState(_) => "SessionStateError",
            Error::Io(_) => "IoError",
            Error::Json(_) => "JsonError",
            Error::Internal(_) => "InternalError",
        }
    }

    /// Origin tag, when the variant carries one
    pub fn origin(&self) -> Option<ErrorOrigin> {
        match self {
            Error::UnknownTool(name) | Error::CallTimeout { qualified_name: name, .. } => {
                Some(ErrorOrigin::Tool(name.clone()))
            }
            Error::ToolExecution { tool, .. } => Some(ErrorOrigin::Tool(tool.clone())),
            Error::ModuleResolution { specifier, .. } => {
                Some(ErrorOrigin::Module(specifier.clone()))
            }
            Error::Script { origin, .. } => Some(origin.clone()),
            Error::ScriptTimeout { .. } => Some(ErrorOrigin::Timeout),
            _ => None,
        }
    }

    /// Serialisable shape handed across the sandbox boundary.
    ///
    /// `fallback` is used when the variant carries no origin of its own
    /// (e.g. an I/O error raised while serving `fs.readFile`).
    pub fn payload(&self, fallback: ErrorOrigin) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind().to_string(),
            message: self.to_string(),
            origin: self.origin().unwrap_or(fallback),
        }
    }

    /// Tool 실행 에러 생성 헬퍼
    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Connection 에러 생성 헬퍼
    pub fn connection(server: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Connection {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Module resolution 에러 생성 헬퍼
    pub fn module_resolution(
        specifier: impl Into<String>,
        referrer: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::ModuleResolution {
            specifier: specifier.into(),
            referrer: referrer.into(),
            reason: reason.into(),
        }
    }

    /// Sandbox init 에러 생성 헬퍼
    pub fn sandbox_init(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SandboxInit {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

/// Error as seen by sandboxed code: message plus where it came from.
///
/// Host stack state never crosses the boundary, only this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
    pub origin: ErrorOrigin,
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
