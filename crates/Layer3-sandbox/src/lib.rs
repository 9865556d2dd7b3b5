//! # forge-sandbox
//!
//! Sandboxed JavaScript execution for Forge code mode.
//!
//! Agent-authored ES modules run inside an embedded QuickJS engine and only
//! see what a [`CapabilitySet`] grants them:
//!
//! - `console.{log,info,warn,error}` → [`ConsoleSink`]
//! - `callTool(qualifiedName, args)` → [`ToolInvoker`] (usually the bridge)
//! - `fs.{readFile,writeFile,listDir,exists}` → [`Workspace`]
//! - `tools.<namespace>.<method>(args)`, `tools.list/search/help/call/servers`
//!
//! ```ignore
//! let caps = CapabilitySet::from_bridge(bridge)
//!     .await
//!     .workspace(Workspace::new("/tmp/job")?)
//!     .build();
//! let mut session = SandboxSession::create(caps, SandboxSettings::from_env()?).await?;
//! let pods = session.run_code("return tools.kubernetes.listPods({})").await?;
//! ```

pub mod backend;
mod bootstrap;
pub mod capability;
pub mod console;
pub mod loader;
pub mod session;
pub mod workspace;

pub use backend::{
    select_backend, Backend, BackendKind, IsolatedHeapBackend, Preemption, SharedHeapBackend,
    MIN_ISOLATED_MEMORY_BYTES,
};
pub use capability::{CapabilitySet, CapabilitySetBuilder, ToolInvoker};
pub use console::{BufferedConsole, ConsoleLevel, ConsoleLine, ConsoleSink, TracingConsole};
pub use loader::{ModuleCache, ModuleRecord, ModuleState};
pub use session::{SandboxSession, SessionState};
pub use workspace::{DirEntry, Workspace};
