//! Console sinks
//!
//! `console.*` calls inside a session end up here. The default sink turns
//! them into `tracing` events; [`BufferedConsole`] keeps them in memory.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
}

impl ConsoleLevel {
    /// Unknown names fall back to `Log`
    pub fn parse(level: &str) -> Self {
        match level {
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Log,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLine {
    pub session_id: String,
    pub level: ConsoleLevel,
    pub message: String,
}

/// Receives console output; called synchronously from script code
pub trait ConsoleSink: Send + Sync {
    fn write(&self, line: ConsoleLine);
}

/// `tracing` 이벤트로 출력 (target: `forge_sandbox::console`)
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn write(&self, line: ConsoleLine) {
        match line.level {
            ConsoleLevel::Log | ConsoleLevel::Info => {
                info!(target: "forge_sandbox::console", session = %line.session_id, level = %line.level, "{}", line.message)
            }
            ConsoleLevel::Warn => {
                warn!(target: "forge_sandbox::console", session = %line.session_id, "{}", line.message)
            }
            ConsoleLevel::Error => {
                error!(target: "forge_sandbox::console", session = %line.session_id, "{}", line.message)
            }
        }
    }
}

/// Captures every line; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct BufferedConsole {
    lines: Arc<Mutex<Vec<ConsoleLine>>>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines.lock().clone()
    }

    /// Message text only, in order
    pub fn messages(&self) -> Vec<String> {
        self.lines.lock().iter().map(|l| l.message.clone()).collect()
    }

    pub fn take(&self) -> Vec<ConsoleLine> {
        std::mem::take(&mut *self.lines.lock())
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl ConsoleSink for BufferedConsole {
    fn write(&self, line: ConsoleLine) {
        self.lines.lock().push(line);
    }
}
