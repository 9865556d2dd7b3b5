//! Context bootstrap - identical on every backend
//!
//! Installs four hidden host functions, then runs the prelude which captures
//! and deletes them and defines `console`, `callTool`, `fs` and `tools`.
//!
//! Host replies are JSON envelopes, `{"ok": value}` or
//! `{"error": {kind, message, origin, errorId}}`. The original [`Error`] is
//! parked under `errorId` so a run that dies from it can return it typed.

use crate::backend::BackendKind;
use crate::capability::CapabilitySet;
use crate::console::{ConsoleLevel, ConsoleLine};
use forge_foundation::{Error, ErrorOrigin, Result};
use parking_lot::Mutex;
use rquickjs::prelude::Async;
use rquickjs::{async_with, AsyncContext, CatchResultExt, CaughtError, Ctx, Function};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

const PRELUDE: &str = include_str!("prelude.js");

/// State shared between a session and its host functions
pub(crate) struct HostState {
    session_id: String,
    capabilities: CapabilitySet,
    errors: Mutex<HashMap<u64, Error>>,
    next_error: AtomicU64,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    limit: Option<usize>,
}

impl HostState {
    pub(crate) fn new(session_id: String, capabilities: CapabilitySet) -> Self {
        Self {
            session_id,
            capabilities,
            errors: Mutex::new(HashMap::new()),
            next_error: AtomicU64::new(0),
        }
    }

    pub(crate) fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub(crate) fn take_error(&self, id: u64) -> Option<Error> {
        self.errors.lock().remove(&id)
    }

    pub(crate) fn clear_errors(&self) {
        self.errors.lock().clear();
    }

    fn ok(value: Value) -> String {
        json!({ "ok": value }).to_string()
    }

    fn fail(&self, error: Error, fallback: ErrorOrigin) -> String {
        let id = self.next_error.fetch_add(1, Ordering::Relaxed) + 1;
        let payload = error.payload(fallback);
        debug!(session = %self.session_id, kind = %payload.kind, origin = %payload.origin, "capability error");
        self.errors.lock().insert(id, error);
        json!({
            "error": {
                "kind": payload.kind,
                "message": payload.message,
                "origin": payload.origin,
                "errorId": id,
            }
        })
        .to_string()
    }

    fn reply(&self, result: Result<Value>, fallback: ErrorOrigin) -> String {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => self.fail(e, fallback),
        }
    }

    fn log(&self, level: &str, message: String) {
        self.capabilities.console().write(ConsoleLine {
            session_id: self.session_id.clone(),
            level: ConsoleLevel::parse(level),
            message,
        });
    }

    async fn call_tool(&self, qualified_name: String, args: String) -> String {
        let result = match serde_json::from_str::<Value>(&args) {
            Ok(args) => self.capabilities.tools().invoke(&qualified_name, args).await,
            Err(e) => Err(Error::Json(e)),
        };
        self.reply(result, ErrorOrigin::Tool(qualified_name))
    }

    async fn fs(&self, op: String, path: String, content: String) -> String {
        let origin = ErrorOrigin::Capability(format!("fs.{}", op));
        let result = self.fs_op(&op, &path, &content).await;
        self.reply(result, origin)
    }

    async fn fs_op(&self, op: &str, path: &str, content: &str) -> Result<Value> {
        let workspace = self.capabilities.workspace().ok_or_else(|| {
            Error::Config("fs capability is unavailable: no workspace root configured".to_string())
        })?;
        match op {
            "readFile" => Ok(Value::String(workspace.read_file(path).await?)),
            "writeFile" => {
                workspace.write_file(path, content).await?;
                Ok(Value::Null)
            }
            "listDir" => Ok(serde_json::to_value(workspace.list_dir(path).await?)?),
            "exists" => Ok(Value::Bool(workspace.exists(path).await?)),
            other => Err(Error::Internal(format!("unknown fs operation: {}", other))),
        }
    }

    fn tools(&self, op: String, arg: String) -> String {
        let origin = ErrorOrigin::Capability(format!("tools.{}", op));
        let result = self.tools_op(&op, &arg);
        self.reply(result, origin)
    }

    fn tools_op(&self, op: &str, arg: &str) -> Result<Value> {
        let catalog = self.capabilities.catalog();
        match op {
            "catalog" => Ok(serde_json::to_value(catalog.entries())?),
            "list" => {
                let server: Option<String> = serde_json::from_str(arg)?;
                Ok(serde_json::to_value(catalog.list(server.as_deref()))?)
            }
            "search" => {
                let args: SearchArgs = serde_json::from_str(arg)?;
                Ok(serde_json::to_value(catalog.search(&args.query, args.limit))?)
            }
            "help" => {
                let name: String = serde_json::from_str(arg)?;
                let entry = catalog.help(&name).ok_or(Error::UnknownTool(name))?;
                Ok(serde_json::to_value(entry)?)
            }
            "servers" => Ok(serde_json::to_value(catalog.servers())?),
            other => Err(Error::Internal(format!("unknown tools operation: {}", other))),
        }
    }
}

/// Install host functions and run the prelude
pub(crate) async fn install(
    context: &AsyncContext,
    host: Arc<HostState>,
    backend: BackendKind,
) -> Result<()> {
    async_with!(context => |ctx| {
        install_globals(&ctx, host)
            .catch(&ctx)
            .map_err(|e| Error::sandbox_init(backend.as_str(), format!("bootstrap failed: {}", e)))
    })
    .await
}

fn install_globals<'js>(ctx: &Ctx<'js>, host: Arc<HostState>) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    let log_host = Arc::clone(&host);
    let log = Function::new(ctx.clone(), move |level: String, message: String| {
        log_host.log(&level, message);
    })?;
    globals.set("__forge_log", log)?;

    let call_host = Arc::clone(&host);
    let call = Function::new(
        ctx.clone(),
        Async(move |name: String, args: String| {
            let host = Arc::clone(&call_host);
            async move { host.call_tool(name, args).await }
        }),
    )?;
    globals.set("__forge_call", call)?;

    let fs_host = Arc::clone(&host);
    let fs = Function::new(
        ctx.clone(),
        Async(move |op: String, path: String, content: String| {
            let host = Arc::clone(&fs_host);
            async move { host.fs(op, path, content).await }
        }),
    )?;
    globals.set("__forge_fs", fs)?;

    let tools_host = Arc::clone(&host);
    let tools = Function::new(ctx.clone(), move |op: String, arg: String| tools_host.tools(op, arg))?;
    globals.set("__forge_tools", tools)?;

    ctx.eval::<(), _>(PRELUDE)?;
    Ok(())
}

/// Turn an uncaught script failure into a typed error.
///
/// Failures raised by a host function come back as the original error;
/// anything else is a script error attributed to `module`.
pub(crate) fn script_error(caught: CaughtError<'_>, host: &HostState, module: &str) -> Error {
    let message = match caught {
        CaughtError::Exception(exception) => {
            let object = exception.as_object();
            if let Ok(Some(id)) = object.get::<_, Option<f64>>("errorId") {
                if let Some(error) = host.take_error(id as u64) {
                    return error;
                }
            }
            let name = object.get::<_, Option<String>>("name").ok().flatten();
            let text = exception
                .message()
                .unwrap_or_else(|| "uncaught exception".to_string());
            match name {
                Some(name) if !name.is_empty() => format!("{}: {}", name, text),
                _ => text,
            }
        }
        CaughtError::Value(value) => match value.as_string().and_then(|s| s.to_string().ok()) {
            Some(text) => format!("uncaught value: {}", text),
            None => format!("uncaught {} value", value.type_name()),
        },
        CaughtError::Error(error) => error.to_string(),
    };

    Error::Script {
        origin: ErrorOrigin::Module(module.to_string()),
        message,
    }
}
