//! Capability set - what a session is allowed to touch
//!
//! Built once, handed to [`SandboxSession`](crate::SandboxSession) and never
//! mutated afterwards. A capability that is absent here does not exist
//! inside the sandbox.

use crate::console::{ConsoleSink, TracingConsole};
use crate::workspace::Workspace;
use async_trait::async_trait;
use forge_core::{Manifest, ToolBridge, ToolCatalog};
use forge_foundation::Result;
use serde_json::Value;
use std::sync::Arc;

/// Dispatches `callTool(qualifiedName, args)` from script code
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, qualified_name: &str, args: Value) -> Result<Value>;
}

#[async_trait]
impl ToolInvoker for ToolBridge {
    async fn invoke(&self, qualified_name: &str, args: Value) -> Result<Value> {
        self.call_tool(qualified_name, args).await
    }
}

#[derive(Clone)]
pub struct CapabilitySet {
    tools: Arc<dyn ToolInvoker>,
    manifest: Arc<Manifest>,
    catalog: Arc<ToolCatalog>,
    workspace: Option<Arc<Workspace>>,
    console: Arc<dyn ConsoleSink>,
}

impl CapabilitySet {
    pub fn builder(tools: Arc<dyn ToolInvoker>) -> CapabilitySetBuilder {
        CapabilitySetBuilder {
            tools,
            manifest: None,
            workspace: None,
            console: None,
        }
    }

    /// Bridge as invoker, its current manifest as catalog
    pub async fn from_bridge(bridge: Arc<ToolBridge>) -> CapabilitySetBuilder {
        let manifest = bridge.manifest().await;
        Self::builder(bridge).manifest(manifest)
    }

    pub fn tools(&self) -> &Arc<dyn ToolInvoker> {
        &self.tools
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_deref()
    }

    pub fn console(&self) -> &Arc<dyn ConsoleSink> {
        &self.console
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("tools", &self.catalog.len())
            .field("workspace", &self.workspace.as_ref().map(|w| w.root().to_path_buf()))
            .finish()
    }
}

pub struct CapabilitySetBuilder {
    tools: Arc<dyn ToolInvoker>,
    manifest: Option<Arc<Manifest>>,
    workspace: Option<Arc<Workspace>>,
    console: Option<Arc<dyn ConsoleSink>>,
}

impl CapabilitySetBuilder {
    pub fn manifest(mut self, manifest: impl Into<Arc<Manifest>>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    pub fn workspace(mut self, workspace: Workspace) -> Self {
        self.workspace = Some(Arc::new(workspace));
        self
    }

    pub fn console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = Some(console);
        self
    }

    pub fn build(self) -> CapabilitySet {
        let manifest = self.manifest.unwrap_or_default();
        let catalog = Arc::new(ToolCatalog::from_manifest(&manifest));
        CapabilitySet {
            tools: self.tools,
            manifest,
            catalog,
            workspace: self.workspace,
            console: self.console.unwrap_or_else(|| Arc::new(TracingConsole)),
        }
    }
}
