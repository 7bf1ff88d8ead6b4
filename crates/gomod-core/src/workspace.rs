//! Module-cache workspace (spec.md §4.2).
//!
//! A scoped temporary directory holding one resolution's `GOPATH`/`GOCACHE`/
//! `GOMODCACHE`. The Go module cache marks its contents read-only, so a plain
//! `remove_dir_all` fails with a permission error; `go clean -modcache` must
//! run first, on every exit path, exception or not.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::toolchain::ToolchainInvoker;

/// Owns a `tempfile::TempDir` and guarantees `go clean -modcache` runs before
/// the directory is removed.
pub struct ModuleCacheWorkspace {
    dir: Option<tempfile::TempDir>,
}

impl ModuleCacheWorkspace {
    pub fn new(prefix: &str) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(ModuleCacheWorkspace { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        self.dir.as_ref().expect("workspace already released").path()
    }

    pub fn gopath(&self) -> PathBuf {
        self.path().to_path_buf()
    }

    pub fn gocache(&self) -> PathBuf {
        self.path().to_path_buf()
    }

    pub fn gomodcache(&self) -> PathBuf {
        self.path().join("pkg").join("mod")
    }
}

impl Drop for ModuleCacheWorkspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else { return };
        let invoker = ToolchainInvoker::new();
        let env = [
            ("GOPATH".to_string(), dir.path().display().to_string()),
            ("GOCACHE".to_string(), dir.path().display().to_string()),
        ];
        if let Err(err) = invoker.run(&["go", "clean", "-modcache"], dir.path(), &env) {
            warn!("go clean -modcache failed during workspace teardown: {err}");
        }
        // `dir` is dropped here regardless of whether `go clean` succeeded,
        // attempting removal either way (spec.md "Scoped cleanup").
        drop(dir);
    }
}
