//! Module loader
//!
//! - `resolve`: specifier → file path
//! - `scan`: static import discovery, depth-first graph collection, cycles
//! - `cache`: per-session [`ModuleRecord`]s
//! - `engine`: resolver/loader installed into the QuickJS runtime

mod cache;
mod engine;
mod resolve;
mod scan;

pub use cache::{ModuleCache, ModuleRecord, ModuleState};
pub use engine::{PreloadedOnly, SandboxResolver};
pub use resolve::{
    candidates, first_existing, is_path_specifier, resolve_entry, resolve_specifier, target_path,
};
pub use scan::{collect_graph, scan_imports};
