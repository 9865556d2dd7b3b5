//! Static import discovery and graph collection
//!
//! The graph is walked depth-first before anything reaches the engine, so
//! resolution errors and cycles surface as typed errors instead of engine
//! exceptions.

use super::cache::{ModuleCache, ModuleRecord};
use super::resolve::resolve_specifier;
use forge_foundation::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// `import x from "…"`, `import { a } from '…'`, `import * as ns from "…"`, `import "…"`
const IMPORT_PATTERN: &str = r#"\bimport\s*(?:[\w$*{}\s,]+?\s*from\s*)?["']([^"'\r\n]+)["']"#;
/// `export * from "…"`, `export * as ns from "…"`, `export { a } from "…"`
const EXPORT_FROM_PATTERN: &str =
    r#"\bexport\s*(?:\*\s*(?:as\s+[\w$]+\s*)?|\{[^}]*\}\s*)from\s*["']([^"'\r\n]+)["']"#;
const COMMENT_PATTERN: &str = r"(?s)/\*.*?\*/|//[^\n]*";

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn import_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, IMPORT_PATTERN)
}

fn export_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, EXPORT_FROM_PATTERN)
}

fn comment_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, COMMENT_PATTERN)
}

/// Static import specifiers in source order, duplicates removed
pub fn scan_imports(source: &str) -> Vec<String> {
    let stripped = match comment_regex() {
        Some(re) => re.replace_all(source, " "),
        None => source.into(),
    };

    let mut found: Vec<(usize, String)> = Vec::new();
    for re in [import_regex(), export_regex()].into_iter().flatten() {
        for caps in re.captures_iter(&stripped) {
            if let (Some(all), Some(spec)) = (caps.get(0), caps.get(1)) {
                found.push((all.start(), spec.as_str().to_string()));
            }
        }
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter_map(|(_, spec)| seen.insert(spec.clone()).then_some(spec))
        .collect()
}

struct Frame {
    path: PathBuf,
    source: String,
    imports: Vec<(String, PathBuf)>,
    next: usize,
}

async fn open(path: &Path, inline: Option<String>, referrer: &str) -> Result<Frame> {
    let source = match inline {
        Some(source) => source,
        None => tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::module_resolution(
                path.display().to_string(),
                referrer,
                format!("cannot read module: {}", e),
            )
        })?,
    };

    let imports = scan_imports(&source)
        .into_iter()
        .map(|spec| resolve_specifier(path, &spec).map(|resolved| (spec, resolved)))
        .collect::<Result<Vec<_>>>()?;

    debug!(module = %path.display(), imports = imports.len(), "module scanned");
    Ok(Frame {
        path: path.to_path_buf(),
        source,
        imports,
        next: 0,
    })
}

/// Records for every module reachable from `entry` that `cache` does not
/// hold yet, dependencies before dependents.
///
/// `inline` replaces the entry's on-disk source (used for synthetic entries).
pub async fn collect_graph(
    cache: &ModuleCache,
    entry: &Path,
    inline: Option<String>,
) -> Result<Vec<ModuleRecord>> {
    let mut ordered = Vec::new();
    if cache.contains(entry) {
        return Ok(ordered);
    }

    let mut done: HashSet<PathBuf> = HashSet::new();
    let mut stack = vec![open(entry, inline, "").await?];

    while let Some(frame) = stack.last_mut() {
        if frame.next < frame.imports.len() {
            let (specifier, dep) = frame.imports[frame.next].clone();
            frame.next += 1;
            let referrer = frame.path.display().to_string();

            if cache.contains(&dep) || done.contains(&dep) {
                continue;
            }
            if let Some(start) = stack.iter().position(|f| f.path == dep) {
                let chain = stack[start..]
                    .iter()
                    .map(|f| f.path.display().to_string())
                    .chain(std::iter::once(dep.display().to_string()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(Error::module_resolution(
                    specifier,
                    referrer,
                    format!("import cycle: {}", chain),
                ));
            }

            let next = open(&dep, None, &referrer).await?;
            stack.push(next);
        } else if let Some(frame) = stack.pop() {
            done.insert(frame.path.clone());
            let dependencies = frame.imports.into_iter().map(|(_, p)| p).collect();
            ordered.push(ModuleRecord::new(frame.path, frame.source, dependencies));
        }
    }

    Ok(ordered)
}
