//! Sandbox session
//!
//! ```text
//! Uninitialized ─initialize→ Initializing ─→ Ready ─run→ Running ─→ Ready
//!                                              │                  └→ Disposed (timeout)
//!                                              └──────dispose──────→ Disposed
//! Disposed ─reinitialize→ Initializing
//! ```
//!
//! A session owns one QuickJS context, the host state behind its
//! capabilities and the cache of modules declared into that context.
//! Sessions are `!Send`; run them on a current-thread runtime or a
//! `LocalSet`.

use crate::backend::{
    select_backend, Backend, BackendKind, IsolatedHeapBackend, Preemption, SharedHeapBackend,
};
use crate::bootstrap::{self, script_error, HostState};
use crate::capability::CapabilitySet;
use crate::loader::{collect_graph, resolve_entry, ModuleCache, ModuleRecord};
use forge_foundation::config::SandboxSettings;
use forge_foundation::{Error, Result};
use regex::Regex;
use rquickjs::{async_with, AsyncContext, CatchResultExt, Ctx, Module, Object};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Running,
    Disposed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Backend plus the context bootstrapped on it
struct Engine {
    backend: Box<dyn Backend>,
    context: AsyncContext,
}

impl Engine {
    async fn start(backend: Box<dyn Backend>, host: Arc<HostState>) -> Result<Self> {
        let context = backend.create_context().await?;
        bootstrap::install(&context, host, backend.kind()).await?;
        Ok(Self { backend, context })
    }
}

/// Result of one evaluation pass inside the context
struct Evaluation {
    /// How many of the new modules made it into the engine
    declared: usize,
    result: Result<Value>,
}

pub struct SandboxSession {
    id: String,
    state: SessionState,
    settings: SandboxSettings,
    host: Arc<HostState>,
    shared: Option<SharedHeapBackend>,
    engine: Option<Engine>,
    modules: ModuleCache,
    runs: u64,
}

impl SandboxSession {
    /// Uninitialized session; call [`initialize`](Self::initialize) before running
    pub fn new(capabilities: CapabilitySet, settings: SandboxSettings) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            host: Arc::new(HostState::new(id.clone(), capabilities)),
            id,
            state: SessionState::Uninitialized,
            settings,
            shared: None,
            engine: None,
            modules: ModuleCache::new(),
            runs: 0,
        }
    }

    /// Contexts on the shared-heap path come from `backend` instead of a
    /// runtime of their own
    pub fn with_shared_backend(mut self, backend: SharedHeapBackend) -> Self {
        self.shared = Some(backend);
        self
    }

    /// `new` + `initialize`
    pub async fn create(capabilities: CapabilitySet, settings: SandboxSettings) -> Result<Self> {
        let mut session = Self::new(capabilities, settings);
        session.initialize().await?;
        Ok(session)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        self.host.capabilities()
    }

    /// `None` until initialized
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.engine.as_ref().map(|e| e.backend.kind())
    }

    pub fn modules(&self) -> &ModuleCache {
        &self.modules
    }

    pub async fn initialize(&mut self) -> Result<()> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Disposed => {
                return Err(Error::SessionState(
                    "session is disposed; call reinitialize()".to_string(),
                ))
            }
            other => {
                return Err(Error::SessionState(format!(
                    "cannot initialize a session that is {}",
                    other
                )))
            }
        }
        self.settings.validate()?;

        self.state = SessionState::Initializing;
        match self.start_engine().await {
            Ok(engine) => {
                info!(session = %self.id, backend = %engine.backend.kind(), "sandbox session ready");
                self.engine = Some(engine);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                error!(session = %self.id, error = %e, "sandbox session failed to initialize");
                self.state = SessionState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Fresh context and empty module cache on a disposed session
    pub async fn reinitialize(&mut self) -> Result<()> {
        self.dispose();
        self.state = SessionState::Uninitialized;
        self.initialize().await
    }

    /// Release the context and, on the isolated backend, its runtime.
    /// Calling it again is a no-op.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        if let Some(engine) = self.engine.take() {
            debug!(session = %self.id, backend = %engine.backend.kind(), "disposing sandbox context");
        }
        self.modules.clear();
        self.host.clear_errors();
        self.state = SessionState::Disposed;
    }

    /// Evaluate the module at `entry` and return its default export as JSON.
    ///
    /// A relative `entry` is taken from the workspace root (the working
    /// directory when no workspace is configured). A default-exported
    /// function is called and awaited.
    pub async fn run(&mut self, entry: impl AsRef<Path>) -> Result<Value> {
        self.ensure_ready()?;
        let entry = resolve_entry(&self.base_dir()?, entry.as_ref())?;
        self.execute(entry, None).await
    }

    /// Run inline code: leading static imports are kept as module imports,
    /// the rest becomes the body of an async function whose `return` value
    /// is the result.
    pub async fn run_code(&mut self, source: &str) -> Result<Value> {
        self.ensure_ready()?;
        self.runs += 1;
        let entry = self.base_dir()?.join(format!(".forge-inline-{}.js", self.runs));
        self.execute(entry, Some(wrap_inline(source))).await
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Disposed => Err(Error::SessionState(
                "session is disposed; call reinitialize()".to_string(),
            )),
            SessionState::Running => Err(Error::SessionState(
                "a run is already in progress or was abandoned".to_string(),
            )),
            other => Err(Error::SessionState(format!("session is {}", other))),
        }
    }

    fn base_dir(&self) -> Result<PathBuf> {
        match self.host.capabilities().workspace() {
            Some(workspace) => Ok(workspace.root().to_path_buf()),
            None => Ok(std::env::current_dir()?),
        }
    }

    async fn start_engine(&mut self) -> Result<Engine> {
        let kind = select_backend(
            self.settings.host_version.as_ref(),
            self.settings.isolated_max_host_major,
            self.settings.force_shared_heap,
        );

        if kind == BackendKind::IsolatedHeap {
            match self.start_isolated().await {
                Ok(engine) => return Ok(engine),
                Err(e) => {
                    warn!(session = %self.id, error = %e, "isolated backend unavailable, falling back to shared heap");
                }
            }
        }

        let shared = match &self.shared {
            Some(shared) => shared.clone(),
            None => {
                let shared = SharedHeapBackend::new().await?;
                self.shared = Some(shared.clone());
                shared
            }
        };
        Engine::start(Box::new(shared), Arc::clone(&self.host)).await
    }

    async fn start_isolated(&self) -> Result<Engine> {
        let backend = IsolatedHeapBackend::from_settings(&self.settings).await?;
        Engine::start(Box::new(backend), Arc::clone(&self.host)).await
    }

    async fn execute(&mut self, entry: PathBuf, inline: Option<String>) -> Result<Value> {
        let records = collect_graph(&self.modules, &entry, inline).await?;
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| Error::SessionState("session has no context".to_string()))?;

        self.state = SessionState::Running;
        self.runs += 1;
        let trampoline = format!("<forge-run-{}>", self.runs);
        let entry_name = entry.to_string_lossy().into_owned();
        let sources: Vec<(String, String)> =
            records.iter().map(|r| (r.name(), r.source.clone())).collect();
        debug!(session = %self.id, entry = %entry_name, new_modules = sources.len(), "run started");

        let budget_ms = self.settings.timeout_ms;
        let budget = Duration::from_millis(budget_ms);
        let deadline = Instant::now() + budget;
        engine.backend.arm_deadline(Some(deadline));

        let outcome = tokio::time::timeout(
            budget,
            evaluate(
                &engine.context,
                Arc::clone(&self.host),
                sources,
                entry_name.clone(),
                trampoline,
            ),
        )
        .await;
        engine.backend.arm_deadline(None);
        let hard = engine.backend.preemption() == Preemption::Hard;

        let evaluation = match outcome {
            Ok(evaluation) => evaluation,
            Err(_) => Evaluation {
                declared: 0,
                result: Err(Error::ScriptTimeout { budget_ms }),
            },
        };
        let result = match evaluation.result {
            Err(Error::Script { .. }) if hard && Instant::now() >= deadline => {
                Err(Error::ScriptTimeout { budget_ms })
            }
            other => other,
        };
        self.host.clear_errors();

        match result {
            Err(Error::ScriptTimeout { budget_ms }) => {
                warn!(session = %self.id, entry = %entry_name, budget_ms, "script timed out, disposing session");
                self.dispose();
                Err(Error::ScriptTimeout { budget_ms })
            }
            result => {
                let success = result.is_ok();
                self.remember(records, evaluation.declared);
                if let Ok(value) = &result {
                    self.modules.mark_evaluated(&entry, Some(value.clone()));
                }
                self.state = SessionState::Ready;
                debug!(session = %self.id, entry = %entry_name, success, "run finished");
                result
            }
        }
    }

    fn remember(&mut self, records: Vec<ModuleRecord>, declared: usize) {
        for record in records.into_iter().take(declared) {
            self.modules.insert(record);
        }
    }
}

impl fmt::Debug for SandboxSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SandboxSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("backend", &self.backend_kind())
            .field("modules", &self.modules.len())
            .finish()
    }
}

/// Declare the new modules in order, then import the entry through a
/// one-off module and read its default export.
async fn evaluate(
    context: &AsyncContext,
    host: Arc<HostState>,
    sources: Vec<(String, String)>,
    entry: String,
    trampoline: String,
) -> Evaluation {
    async_with!(context => |ctx| {
        let mut declared = 0;
        for (name, source) in sources {
            if let Err(caught) = Module::declare(ctx.clone(), name.clone(), source).catch(&ctx) {
                return Evaluation {
                    declared,
                    result: Err(script_error(caught, &host, &name)),
                };
            }
            declared += 1;
        }

        let result = match run_entry(&ctx, &entry, &trampoline).await.catch(&ctx) {
            Ok(Some(json)) => serde_json::from_str(&json).map_err(Error::from),
            Ok(None) => Ok(Value::Null),
            Err(caught) => Err(script_error(caught, &host, &entry)),
        };
        Evaluation { declared, result }
    })
    .await
}

async fn run_entry<'js>(
    ctx: &Ctx<'js>,
    entry: &str,
    trampoline: &str,
) -> rquickjs::Result<Option<String>> {
    let specifier = serde_json::to_string(entry)
        .map_err(|e| rquickjs::Error::new_loading_message(entry, e.to_string()))?;
    let source = format!("import * as ns from {};\nexport default ns;\n", specifier);

    let (module, promise) = Module::declare(ctx.clone(), trampoline, source)?.eval()?;
    promise.into_future::<rquickjs::Value>().await?;

    let namespace: Object = module.namespace()?.get("default")?;
    let mut value: rquickjs::Value = namespace.get("default")?;

    let called = match value.as_function() {
        Some(function) => Some(function.call::<_, rquickjs::Value>(())?),
        None => None,
    };
    if let Some(returned) = called {
        value = returned;
    }
    let settled = match value.as_promise() {
        Some(promise) => Some(promise.clone().into_future::<rquickjs::Value>().await?),
        None => None,
    };
    if let Some(resolved) = settled {
        value = resolved;
    }

    match ctx.json_stringify(value)? {
        Some(json) => Ok(Some(json.to_string()?)),
        None => Ok(None),
    }
}

/// Leading `import …;` statements, possibly spanning lines
const LEADING_IMPORT_PATTERN: &str =
    r#"^\s*import\s*(?:[\w$*{}\s,]+?\s*from\s*)?["'][^"'\r\n]+["']\s*;?"#;

fn leading_import_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(LEADING_IMPORT_PATTERN).ok())
        .as_ref()
}

/// Split off leading static imports and wrap the rest as an async body
pub(crate) fn wrap_inline(source: &str) -> String {
    let mut imports = Vec::new();
    let mut rest = source;
    if let Some(re) = leading_import_regex() {
        while let Some(found) = re.find(rest) {
            imports.push(found.as_str().trim());
            rest = &rest[found.end()..];
        }
    }

    let mut module = String::new();
    for import in imports {
        module.push_str(import);
        module.push('\n');
    }
    module.push_str("const __forgeResult = await (async () => {\n");
    module.push_str(rest);
    module.push_str("\n})();\nexport default __forgeResult;\n");
    module
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_inline_hoists_imports() {
        let wrapped = wrap_inline(
            "import { a } from './a.js';\nimport b from \"./b.js\"\nconst x = a + b;\nreturn x;",
        );
        assert!(wrapped.starts_with("import { a } from './a.js';\nimport b from \"./b.js\"\n"));
        assert!(wrapped.contains("(async () => {\nconst x = a + b;\nreturn x;\n})()"));
        assert!(wrapped.ends_with("export default __forgeResult;\n"));
    }

    #[test]
    fn test_wrap_inline_without_imports() {
        let wrapped = wrap_inline("return 1 + 1;");
        assert!(wrapped.starts_with("const __forgeResult = await (async () => {\nreturn 1 + 1;"));
    }

    #[test]
    fn test_wrap_inline_leaves_dynamic_import() {
        let wrapped = wrap_inline("const m = await import('./x.js');\nreturn m;");
        assert!(wrapped.starts_with("const __forgeResult"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Disposed.to_string(), "disposed");
    }
}
