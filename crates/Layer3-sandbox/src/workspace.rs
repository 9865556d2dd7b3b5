//! Workspace - 샌드박스 `fs` capability가 접근할 수 있는 유일한 디렉토리
//!
//! Every path handed in by script code is joined onto the root, normalized
//! lexically, and then checked again against the canonical form of its
//! deepest existing ancestor so that a symlink inside the root cannot point
//! the access outside of it. Validation runs on every call; nothing is cached.

use forge_foundation::{Error, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// One row of [`Workspace::list_dir`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Confined filesystem root
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// The root must exist and be a directory; it is stored canonicalized
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = std::fs::canonicalize(root).map_err(|e| {
            Error::Config(format!("workspace root '{}' is not accessible: {}", root.display(), e))
        })?;
        if !canonical.is_dir() {
            return Err(Error::Config(format!(
                "workspace root '{}' is not a directory",
                canonical.display()
            )));
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a script-supplied path onto a real path inside the root
    pub async fn resolve(&self, path: &str) -> Result<PathBuf> {
        let lexical = normalize_path(&self.root.join(path));
        if !lexical.starts_with(&self.root) {
            return Err(self.escape(path));
        }

        // 존재하는 가장 깊은 조상을 canonicalize 해서 symlink 탈출 확인
        let mut existing = lexical.as_path();
        let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
        let canonical = loop {
            match tokio::fs::canonicalize(existing).await {
                Ok(canonical) => break canonical,
                Err(e) => {
                    // 대상이 없는 symlink: 링크 자체는 존재하므로 건너뛰면 밖으로 쓰게 됨
                    if let Ok(meta) = tokio::fs::symlink_metadata(existing).await {
                        if meta.file_type().is_symlink() {
                            warn!(path, link = %existing.display(), "workspace access through dangling symlink");
                            return Err(self.escape(path));
                        }
                        return Err(Error::Io(e));
                    }
                }
            }
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    rest.push(name);
                    existing = parent;
                }
                _ => return Err(self.escape(path)),
            }
        };

        if !canonical.starts_with(&self.root) {
            warn!(path, resolved = %canonical.display(), "workspace access escapes root via symlink");
            return Err(self.escape(path));
        }

        let mut resolved = canonical;
        for name in rest.into_iter().rev() {
            resolved.push(name);
        }
        Ok(resolved)
    }

    pub async fn read_file(&self, path: &str) -> Result<String> {
        let resolved = self.resolve(path).await?;
        debug!(path = %resolved.display(), "fs.readFile");
        Ok(tokio::fs::read_to_string(&resolved).await?)
    }

    /// Writes the whole file, creating parent directories inside the root
    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let resolved = self.resolve(path).await?;
        if resolved == self.root {
            return Err(Error::Config("cannot write to the workspace root itself".to_string()));
        }
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(path = %resolved.display(), bytes = content.len(), "fs.writeFile");
        tokio::fs::write(&resolved, content).await?;
        Ok(())
    }

    /// Entries sorted by name
    pub async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let resolved = self.resolve(path).await?;
        let mut reader = tokio::fs::read_dir(&resolved).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Escapes are errors, not `false`
    pub async fn exists(&self, path: &str) -> Result<bool> {
        let resolved = self.resolve(path).await?;
        Ok(tokio::fs::try_exists(&resolved).await?)
    }

    fn escape(&self, path: &str) -> Error {
        Error::WorkspaceAccess {
            path: PathBuf::from(path),
            root: self.root.clone(),
        }
    }
}

/// 경로 정규화 (canonicalize 없이)
///
/// `..` never climbs above a root component; on a relative path leading
/// `..` segments are kept.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}
