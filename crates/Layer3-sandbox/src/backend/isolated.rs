//! Isolated-heap backend: one QuickJS runtime per session

use super::{Backend, BackendKind, Preemption};
use crate::loader::{PreloadedOnly, SandboxResolver};
use async_trait::async_trait;
use forge_foundation::config::SandboxSettings;
use forge_foundation::{Error, Result};
use rquickjs::{AsyncContext, AsyncRuntime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Below this QuickJS cannot even build a full context
pub const MIN_ISOLATED_MEMORY_BYTES: usize = 1024 * 1024;

pub struct IsolatedHeapBackend {
    runtime: AsyncRuntime,
    origin: Instant,
    /// Nanoseconds since `origin`; 0 = disarmed
    deadline: Arc<AtomicU64>,
}

impl IsolatedHeapBackend {
    pub async fn new(memory_limit: usize, max_stack_size: usize) -> Result<Self> {
        if memory_limit < MIN_ISOLATED_MEMORY_BYTES {
            return Err(Error::sandbox_init(
                BackendKind::IsolatedHeap.as_str(),
                format!(
                    "memory limit {} bytes is below the minimum of {} bytes",
                    memory_limit, MIN_ISOLATED_MEMORY_BYTES
                ),
            ));
        }

        let runtime = AsyncRuntime::new()
            .map_err(|e| Error::sandbox_init(BackendKind::IsolatedHeap.as_str(), e.to_string()))?;
        runtime.set_memory_limit(memory_limit).await;
        runtime.set_max_stack_size(max_stack_size).await;

        let origin = Instant::now();
        let deadline = Arc::new(AtomicU64::new(0));
        let armed = Arc::clone(&deadline);
        runtime
            .set_interrupt_handler(Some(Box::new(move || {
                let at = armed.load(Ordering::Relaxed);
                at != 0 && origin.elapsed().as_nanos() as u64 >= at
            })))
            .await;
        runtime.set_loader(SandboxResolver, PreloadedOnly).await;

        debug!(memory_limit, max_stack_size, "isolated runtime created");
        Ok(Self {
            runtime,
            origin,
            deadline,
        })
    }

    pub async fn from_settings(settings: &SandboxSettings) -> Result<Self> {
        Self::new(settings.memory_limit_bytes, settings.max_stack_size).await
    }
}

#[async_trait(?Send)]
impl Backend for IsolatedHeapBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::IsolatedHeap
    }

    fn preemption(&self) -> Preemption {
        Preemption::Hard
    }

    async fn create_context(&self) -> Result<AsyncContext> {
        AsyncContext::full(&self.runtime)
            .await
            .map_err(|e| Error::sandbox_init(self.kind().as_str(), e.to_string()))
    }

    fn arm_deadline(&self, deadline: Option<Instant>) {
        let at = match deadline {
            Some(at) => (at.saturating_duration_since(self.origin).as_nanos() as u64).max(1),
            None => 0,
        };
        self.deadline.store(at, Ordering::Relaxed);
    }
}
