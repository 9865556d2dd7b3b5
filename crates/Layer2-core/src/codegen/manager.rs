//! Codegen Manager - registry → stub 파일 트리
//!
//! ```text
//! <output>/
//! ├── index.js / index.d.ts        export * as <server> from ...
//! ├── runtime.js                   shared helper (ensured)
//! ├── manifest.json / manifest.js  discovery manifest
//! └── servers/<server>/
//!     ├── <tool>.js / <tool>.d.ts
//!     └── index.js / index.d.ts
//! ```
//!
//! Generation is a full rewrite: `servers/` is removed and rebuilt on every
//! run, so the tree always matches the registry it was generated from.

use super::emit::{self, NameAllocator, StubNames};
use super::manifest::Manifest;
use super::runtime::RUNTIME_JS;
use crate::mcp::ToolRegistration;
use crate::schema::normalize;
use forge_foundation::strings::{sanitize_file_name, sanitize_identifier};
use forge_foundation::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SERVERS_DIR: &str = "servers";
pub const RUNTIME_FILE: &str = "runtime.js";
pub const MANIFEST_JSON: &str = "manifest.json";
pub const MANIFEST_JS: &str = "manifest.js";

/// What one `generate` call produced
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub output_dir: PathBuf,
    pub servers: usize,
    pub tools: usize,
    /// Every file written, in write order
    pub files: Vec<PathBuf>,
    /// Whether `runtime.js` had to be (re)written
    pub runtime_written: bool,
}

pub struct CodegenManager {
    output_dir: PathBuf,
}

impl CodegenManager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Regenerate the whole artifact tree
    pub async fn generate(&self, registrations: &[ToolRegistration]) -> Result<GenerationReport> {
        let manifest = Manifest::from_registrations(registrations);
        let mut report = GenerationReport {
            output_dir: self.output_dir.clone(),
            ..Default::default()
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let servers_dir = self.output_dir.join(SERVERS_DIR);
        if tokio::fs::try_exists(&servers_dir).await? {
            tokio::fs::remove_dir_all(&servers_dir).await?;
        }

        let mut units: Vec<(String, String)> = Vec::new();
        let mut taken_dirs = HashSet::new();
        let mut taken_bindings = HashSet::new();

        for server in manifest.servers() {
            let dir = unique_name(&mut taken_dirs, sanitize_file_name(&server.server));
            let binding = unique_name(&mut taken_bindings, sanitize_identifier(&server.server));
            let unit_dir = servers_dir.join(&dir);
            tokio::fs::create_dir_all(&unit_dir).await?;

            let mut allocator = NameAllocator::new();
            let mut stubs: Vec<StubNames> = Vec::with_capacity(server.tools.len());

            for tool in &server.tools {
                let names = allocator.allocate(&tool.name);
                let schema = normalize(&tool.input_schema);

                self.write(
                    &mut report,
                    unit_dir.join(format!("{}.d.ts", names.file)),
                    &emit::tool_declaration(&names, &tool.description, &schema),
                )
                .await?;
                self.write(
                    &mut report,
                    unit_dir.join(format!("{}.js", names.file)),
                    &emit::tool_module(&names, &tool.qualified_name, &tool.description),
                )
                .await?;

                stubs.push(names);
                report.tools += 1;
            }

            self.write(&mut report, unit_dir.join(format!("{}.js", emit::SERVER_INDEX_STEM)), &emit::server_index_js(&stubs))
                .await?;
            self.write(&mut report, unit_dir.join(format!("{}.d.ts", emit::SERVER_INDEX_STEM)), &emit::server_index_dts(&stubs))
                .await?;

            debug!("Generated {} stub(s) for server '{}'", stubs.len(), server.server);
            units.push((binding, dir));
            report.servers += 1;
        }

        self.write(&mut report, self.output_dir.join("index.js"), &emit::root_index(&units, false))
            .await?;
        self.write(&mut report, self.output_dir.join("index.d.ts"), &emit::root_index(&units, true))
            .await?;

        let manifest_json = manifest.to_json_pretty()?;
        self.write(&mut report, self.output_dir.join(MANIFEST_JSON), &manifest_json)
            .await?;
        self.write(
            &mut report,
            self.output_dir.join(MANIFEST_JS),
            &emit::manifest_module(&manifest_json),
        )
        .await?;

        report.runtime_written = self.ensure_runtime(&mut report).await?;

        info!(
            "Codegen wrote {} server(s), {} tool(s) to {}",
            report.servers,
            report.tools,
            self.output_dir.display()
        );
        Ok(report)
    }

    /// Write `runtime.js` when it is missing or differs from the current helper
    async fn ensure_runtime(&self, report: &mut GenerationReport) -> Result<bool> {
        let path = self.output_dir.join(RUNTIME_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(existing) if existing == RUNTIME_JS => Ok(false),
            _ => {
                self.write(report, path, RUNTIME_JS).await?;
                Ok(true)
            }
        }
    }

    async fn write(&self, report: &mut GenerationReport, path: PathBuf, content: &str) -> Result<()> {
        tokio::fs::write(&path, content).await?;
        report.files.push(path);
        Ok(())
    }
}

fn unique_name(taken: &mut HashSet<String>, base: String) -> String {
    let mut candidate = base.clone();
    let mut n = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
    candidate
}
