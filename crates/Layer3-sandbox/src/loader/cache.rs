//! Per-session module records

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Compiled into the engine, not yet run
    Declared,
    Evaluated,
}

#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub resolved_path: PathBuf,
    pub source: String,
    pub dependencies: Vec<PathBuf>,
    pub state: ModuleState,
    /// Default export snapshot, set once the module ran as an entry
    pub exports: Option<Value>,
}

impl ModuleRecord {
    pub fn new(resolved_path: PathBuf, source: String, dependencies: Vec<PathBuf>) -> Self {
        Self {
            resolved_path,
            source,
            dependencies,
            state: ModuleState::Declared,
            exports: None,
        }
    }

    /// Engine-side module name
    pub fn name(&self) -> String {
        self.resolved_path.to_string_lossy().into_owned()
    }
}

/// Keyed by resolved absolute path; entries live as long as the session
#[derive(Debug, Default)]
pub struct ModuleCache {
    records: HashMap<PathBuf, ModuleRecord>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&ModuleRecord> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    pub fn insert(&mut self, record: ModuleRecord) {
        self.records.insert(record.resolved_path.clone(), record);
    }

    /// Mark `path` and everything it imports as evaluated
    pub fn mark_evaluated(&mut self, path: &Path, exports: Option<Value>) {
        let mut pending = vec![path.to_path_buf()];
        while let Some(next) = pending.pop() {
            if let Some(record) = self.records.get_mut(&next) {
                if record.state == ModuleState::Evaluated && next != path {
                    continue;
                }
                record.state = ModuleState::Evaluated;
                pending.extend(record.dependencies.iter().cloned());
            }
        }
        if let Some(record) = self.records.get_mut(path) {
            record.exports = exports;
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.records.values()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
