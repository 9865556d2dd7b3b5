//! Engine-side resolver and loader
//!
//! Every module of a run is declared up front from
//! [`collect_graph`](super::collect_graph), so the engine finds imports among
//! its loaded modules and never needs to load anything itself. The loader therefore
//! refuses every request; in practice that only triggers for `import()` of
//! a module outside the declared graph.

use super::resolve::{first_existing, target_path};
use rquickjs::loader::{Loader, Resolver};
use rquickjs::module::Declared;
use rquickjs::{Ctx, Error, Module, Result};
use std::path::Path;

/// Same rules as the pre-scan; a missing file resolves to its normalized
/// target so that the loader can report it
#[derive(Debug, Default, Clone, Copy)]
pub struct SandboxResolver;

impl Resolver for SandboxResolver {
    fn resolve<'js>(&mut self, _ctx: &Ctx<'js>, base: &str, name: &str) -> Result<String> {
        let target = target_path(Path::new(base), name)
            .map_err(|e| Error::new_resolving_message(base, name, e.to_string()))?;
        let resolved = first_existing(&target).unwrap_or(target);
        Ok(resolved.to_string_lossy().into_owned())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PreloadedOnly;

impl Loader for PreloadedOnly {
    fn load<'js>(&mut self, _ctx: &Ctx<'js>, name: &str) -> Result<Module<'js, Declared>> {
        Err(Error::new_loading_message(
            name,
            "module is not part of the static import graph (dynamic import() is not supported)",
        ))
    }
}
