//! Rooted-path guard (spec.md §4.1).
//!
//! The Go toolchain does not validate that the files it reads live inside the
//! project, and will silently follow a symlink leading anywhere. Every
//! filesystem reference the core touches goes through a `RootedPath`, whose
//! only constructor canonicalizes the candidate and rejects it if it escapes
//! the declared root.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A path known to be a descendant of `root`, after symlink and `..` resolution.
#[derive(Debug, Clone)]
pub struct RootedPath {
    root: PathBuf,
    path: PathBuf,
}

impl RootedPath {
    /// Wrap `root` itself as a rooted path. `root` must already exist.
    pub fn from_root(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let canonical = root.canonicalize().map_err(Error::Io)?;
        Ok(Self {
            root: canonical.clone(),
            path: canonical,
        })
    }

    /// Join `relative` onto this path, failing if the resolved path is not a
    /// descendant of the root.
    pub fn join_within_root(&self, relative: impl AsRef<Path>) -> Result<RootedPath> {
        let candidate = self.path.join(relative.as_ref());
        let resolved = resolve_lexically_and_symlinks(&candidate)?;

        if !resolved.starts_with(&self.root) {
            return Err(Error::PathOutsideRoot {
                root: self.root.clone(),
                attempted: candidate,
            });
        }

        Ok(RootedPath {
            root: self.root.clone(),
            path: resolved,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The portion of `path` below `root`, `.` if they are equal.
    pub fn subpath_from_root(&self) -> PathBuf {
        self.path
            .strip_prefix(&self.root)
            .map(|p| if p.as_os_str().is_empty() { PathBuf::from(".") } else { p.to_path_buf() })
            .unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// Resolve `..`/`.` segments and symlinks without requiring every component to
/// exist yet (a local replacement's target may not exist on disk at all).
fn resolve_lexically_and_symlinks(candidate: &Path) -> Result<PathBuf> {
    // Canonicalize the longest existing prefix, then append the remaining,
    // still-lexical components. This lets the guard reject symlink escapes
    // for paths that exist while still handling paths that don't exist yet
    // (e.g. a `replace` target that has not been fetched).
    let mut existing = candidate.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(canon) => {
                let mut result = canon;
                for component in tail.into_iter().rev() {
                    result.push(component);
                }
                return Ok(lexically_normalize(&result));
            }
            Err(_) => {
                let Some(name) = existing.file_name().map(|n| n.to_os_string()) else {
                    // Ran out of components; fall back to pure lexical normalization.
                    return Ok(lexically_normalize(candidate));
                };
                tail.push(name);
                if !existing.pop() {
                    return Ok(lexically_normalize(candidate));
                }
            }
        }
    }
}

fn lexically_normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Guard every `*.go` file under `module_root`, plus `go.mod`, `go.sum`, and
/// `vendor/modules.txt` (spec.md §4.1(a)).
pub fn guard_module_tree(module_root: &RootedPath) -> Result<()> {
    for fixed in ["go.mod", "go.sum", "vendor/modules.txt"] {
        guard_if_present(module_root, fixed)?;
    }

    for entry in walkdir::WalkDir::new(module_root.path())
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "go"))
    {
        let relative = entry
            .path()
            .strip_prefix(module_root.path())
            .unwrap_or(entry.path());
        module_root.join_within_root(relative)?;
    }

    Ok(())
}

fn guard_if_present(module_root: &RootedPath, relative: &str) -> Result<()> {
    let candidate = module_root.path().join(relative);
    if !candidate.exists() {
        return Ok(());
    }
    module_root.join_within_root(relative).map(|_| ())
}
