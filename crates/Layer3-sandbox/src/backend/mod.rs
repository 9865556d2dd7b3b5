//! Execution backends
//!
//! Both backends hand out QuickJS contexts; they differ in what the context
//! shares and in how a deadline is enforced:
//!
//! | backend  | heap / GC                  | memory ceiling | deadline    |
//! |----------|----------------------------|----------------|-------------|
//! | isolated | own runtime                | hard           | interrupt   |
//! | shared   | one runtime, many contexts | none           | cooperative |

mod isolated;
mod shared;

pub use isolated::{IsolatedHeapBackend, MIN_ISOLATED_MEMORY_BYTES};
pub use shared::SharedHeapBackend;

use async_trait::async_trait;
use forge_foundation::config::HostVersion;
use forge_foundation::Result;
use rquickjs::AsyncContext;
use serde::Serialize;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    IsolatedHeap,
    SharedHeap,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsolatedHeap => "isolated",
            Self::SharedHeap => "shared",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a deadline stops running code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preemption {
    /// The engine interrupts even a busy loop
    Hard,
    /// Only checked when the script awaits a capability
    Cooperative,
}

/// QuickJS 런타임 위에서 세션 컨텍스트를 만드는 백엔드
///
/// Contexts are `!Send`; sessions stay on the task that created them.
#[async_trait(?Send)]
pub trait Backend {
    fn kind(&self) -> BackendKind;

    fn preemption(&self) -> Preemption;

    /// Fresh context with the module resolver/loader already installed
    async fn create_context(&self) -> Result<AsyncContext>;

    /// `None` disarms; no-op for cooperative backends
    fn arm_deadline(&self, _deadline: Option<Instant>) {}
}

/// Isolated unless the host reports a major version above `threshold_major`.
/// `force_shared` overrides everything.
pub fn select_backend(
    host_version: Option<&HostVersion>,
    threshold_major: u64,
    force_shared: bool,
) -> BackendKind {
    if force_shared {
        return BackendKind::SharedHeap;
    }
    match host_version {
        Some(version) if version.major > threshold_major => BackendKind::SharedHeap,
        _ => BackendKind::IsolatedHeap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_backend() {
        let v20 = HostVersion::new(20, 11, 0);
        let v22 = HostVersion::new(22, 0, 0);
        let v23 = HostVersion::new(23, 1, 0);

        assert_eq!(select_backend(None, 22, false), BackendKind::IsolatedHeap);
        assert_eq!(select_backend(Some(&v20), 22, false), BackendKind::IsolatedHeap);
        assert_eq!(select_backend(Some(&v22), 22, false), BackendKind::IsolatedHeap);
        assert_eq!(select_backend(Some(&v23), 22, false), BackendKind::SharedHeap);
    }

    #[test]
    fn test_force_shared_wins() {
        assert_eq!(select_backend(None, 22, true), BackendKind::SharedHeap);
        let v18 = HostVersion::new(18, 0, 0);
        assert_eq!(select_backend(Some(&v18), 22, true), BackendKind::SharedHeap);
    }
}
