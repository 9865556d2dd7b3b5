//! Specifier → path resolution
//!
//! Only path specifiers are accepted (`./x`, `../x`, `/abs/x`). The target is
//! tried as-is, then with `.js`, `.mjs`, then as a directory holding
//! `index.js` or `index.mjs`; the first regular file wins.

use crate::workspace::normalize_path;
use forge_foundation::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || specifier == "."
        || specifier == ".."
}

/// Lookup order for one target path
pub fn candidates(target: &Path) -> Vec<PathBuf> {
    vec![
        target.to_path_buf(),
        with_suffix(target, ".js"),
        with_suffix(target, ".mjs"),
        target.join("index.js"),
        target.join("index.mjs"),
    ]
}

pub fn first_existing(target: &Path) -> Option<PathBuf> {
    candidates(target).into_iter().find(|c| c.is_file())
}

/// Normalized target of `specifier` as imported from the module at `referrer`
pub fn target_path(referrer: &Path, specifier: &str) -> Result<PathBuf> {
    if !is_path_specifier(specifier) {
        return Err(Error::module_resolution(
            specifier,
            referrer.display().to_string(),
            "bare specifiers are not supported, use ./, ../ or an absolute path",
        ));
    }

    let joined = if specifier.starts_with('/') {
        PathBuf::from(specifier)
    } else {
        referrer
            .parent()
            .unwrap_or_else(|| Path::new("/"))
            .join(specifier)
    };
    Ok(normalize_path(&joined))
}

pub fn resolve_specifier(referrer: &Path, specifier: &str) -> Result<PathBuf> {
    let target = target_path(referrer, specifier)?;
    first_existing(&target).ok_or_else(|| {
        Error::module_resolution(
            specifier,
            referrer.display().to_string(),
            format!("no module file found for {}", target.display()),
        )
    })
}

/// Entry points are paths, not specifiers: relative ones are taken from `base_dir`
pub fn resolve_entry(base_dir: &Path, entry: &Path) -> Result<PathBuf> {
    let target = normalize_path(&base_dir.join(entry));
    first_existing(&target).ok_or_else(|| {
        Error::module_resolution(
            entry.display().to_string(),
            base_dir.display().to_string(),
            format!("no module file found for {}", target.display()),
        )
    })
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "export default 1;").unwrap();
    }

    fn resolve_in(files: &[&str]) -> PathBuf {
        let dir = TempDir::new().unwrap();
        for f in files {
            touch(dir.path(), f);
        }
        let referrer = dir.path().join("main.js");
        let resolved = resolve_specifier(&referrer, "./a").unwrap();
        resolved.strip_prefix(dir.path()).unwrap().to_path_buf()
    }

    #[test]
    fn test_resolution_order() {
        assert_eq!(resolve_in(&["a", "a.js", "a.mjs"]), PathBuf::from("a"));
        assert_eq!(resolve_in(&["a.js", "a.mjs", "a/index.js"]), PathBuf::from("a.js"));
        assert_eq!(resolve_in(&["a.mjs", "a/index.js"]), PathBuf::from("a.mjs"));
        assert_eq!(resolve_in(&["a/index.js", "a/index.mjs"]), PathBuf::from("a/index.js"));
        assert_eq!(resolve_in(&["a/index.mjs"]), PathBuf::from("a/index.mjs"));
    }

    #[test]
    fn test_bare_specifier_rejected() {
        let err = target_path(Path::new("/w/main.js"), "lodash").unwrap_err();
        match err {
            Error::ModuleResolution { specifier, reason, .. } => {
                assert_eq!(specifier, "lodash");
                assert!(reason.contains("bare"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_target_path_normalizes() {
        let referrer = Path::new("/w/lib/util.js");
        assert_eq!(target_path(referrer, "../main").unwrap(), PathBuf::from("/w/main"));
        assert_eq!(target_path(referrer, "./x/./y").unwrap(), PathBuf::from("/w/lib/x/y"));
        assert_eq!(target_path(referrer, "/abs/mod.js").unwrap(), PathBuf::from("/abs/mod.js"));
    }

    #[test]
    fn test_missing_module() {
        let dir = TempDir::new().unwrap();
        let err = resolve_specifier(&dir.path().join("main.js"), "./nope").unwrap_err();
        assert!(matches!(err, Error::ModuleResolution { .. }));
    }

    #[test]
    fn test_resolve_entry() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "scripts/job.mjs");
        let entry = resolve_entry(dir.path(), Path::new("scripts/job")).unwrap();
        assert_eq!(entry, dir.path().join("scripts/job.mjs"));
    }
}
