//! Codegen - tool registry → typed, discoverable stubs
//!
//! - `manifest.rs` - discovery manifest (JSON)
//! - `catalog.rs` - runtime discovery index (namespaces, search)
//! - `emit.rs` - JavaScript / TypeScript rendering
//! - `runtime.rs` - shared `runtime.js` helper
//! - `manager.rs` - artifact tree writer

mod catalog;
mod emit;
mod manager;
mod manifest;
mod runtime;

pub use catalog::{
    namespace_for, CatalogEntry, CatalogSummary, ToolCatalog, DEFAULT_SEARCH_LIMIT, DOMAIN_RULES,
    RESERVED_NAMESPACES,
};
pub use emit::{ts_type, NameAllocator, StubNames};
pub use manager::{
    CodegenManager, GenerationReport, MANIFEST_JS, MANIFEST_JSON, RUNTIME_FILE, SERVERS_DIR,
};
pub use manifest::{Manifest, ServerManifest, ToolManifestEntry};
pub use runtime::RUNTIME_JS;
