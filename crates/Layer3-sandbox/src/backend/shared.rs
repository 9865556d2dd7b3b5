//! Shared-heap backend: one QuickJS runtime, one context per session
//!
//! Sessions get separate global objects but share heap and GC, so there is
//! no per-session memory ceiling and timeouts only take effect when a
//! script yields.

use super::{Backend, BackendKind, Preemption};
use crate::loader::{PreloadedOnly, SandboxResolver};
use async_trait::async_trait;
use forge_foundation::{Error, Result};
use rquickjs::{AsyncContext, AsyncRuntime};
use tracing::debug;

/// Clones share the same runtime
#[derive(Clone)]
pub struct SharedHeapBackend {
    runtime: AsyncRuntime,
}

impl SharedHeapBackend {
    pub async fn new() -> Result<Self> {
        let runtime = AsyncRuntime::new()
            .map_err(|e| Error::sandbox_init(BackendKind::SharedHeap.as_str(), e.to_string()))?;
        runtime.set_loader(SandboxResolver, PreloadedOnly).await;
        debug!("shared runtime created");
        Ok(Self { runtime })
    }
}

#[async_trait(?Send)]
impl Backend for SharedHeapBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SharedHeap
    }

    fn preemption(&self) -> Preemption {
        Preemption::Cooperative
    }

    async fn create_context(&self) -> Result<AsyncContext> {
        AsyncContext::full(&self.runtime)
            .await
            .map_err(|e| Error::sandbox_init(self.kind().as_str(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::async_with;

    #[tokio::test]
    async fn test_contexts_have_separate_globals() {
        let backend = SharedHeapBackend::new().await.unwrap();
        let first = backend.create_context().await.unwrap();
        let second = backend.clone().create_context().await.unwrap();

        async_with!(first => |ctx| {
            ctx.eval::<(), _>("globalThis.marker = 1;").unwrap();
        })
        .await;

        let seen = async_with!(second => |ctx| {
            ctx.eval::<bool, _>("typeof globalThis.marker === 'undefined'").unwrap()
        })
        .await;
        assert!(seen);
    }
}
