//! Main-module composer (spec.md §4.9).
//!
//! Derives the main module's public identity: `real_path` from the
//! repository's `origin` remote URL (host + path, trailing slash and `.git`
//! stripped), with the module's subpath within the repository appended when
//! the module does not live at the repository root.

use std::path::Path;

use git2::Repository;

use crate::error::{Error, Result};
use crate::model::Module;
use crate::path_guard::RootedPath;

/// Build the main module's `Module` record.
///
/// `module_name` and `module_version` come from `go list -m` and the version
/// reifier respectively; a missing version at this point is a programmer
/// error (spec.md §4.9: "invariant violated in the reifier").
pub fn compose_main_module(
    main_module_dir: &RootedPath,
    module_name: &str,
    module_version: &str,
) -> Result<Module> {
    if module_version.is_empty() {
        return Err(Error::package_rejected(
            "main module version was not resolved before composing its identity",
        ));
    }

    let repo_name = repository_name(main_module_dir.root())?;
    let subpath = main_module_dir.subpath_from_root();

    let real_path = if subpath == Path::new(".") {
        repo_name
    } else {
        format!("{repo_name}/{}", subpath.to_string_lossy())
    };

    Ok(Module::main_module(
        module_name.to_string(),
        real_path,
        module_version.to_string(),
    ))
}

/// The repository's name as derived from its `origin` remote: hostname plus
/// path, with a trailing slash and `.git` extension stripped.
fn repository_name(repo_root: &Path) -> Result<String> {
    let repo = Repository::open(repo_root).map_err(|e| {
        Error::package_rejected(format!(
            "{} is not inside a Git working copy: {e}",
            repo_root.display()
        ))
    })?;
    let remote = repo
        .find_remote("origin")
        .map_err(|e| Error::package_rejected(format!("no `origin` remote configured: {e}")))?;
    let url = remote
        .url()
        .ok_or_else(|| Error::package_rejected("origin remote has no URL"))?;

    let (host, path) = parse_origin_url(url)
        .ok_or_else(|| Error::package_rejected(format!("could not parse origin URL: {url}")))?;

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    Ok(format!("{host}{path}"))
}

/// Parse `https://host/path.git`, `ssh://git@host/path.git`, and the
/// scp-like `git@host:path.git` forms into `(host, "/path...")`.
fn parse_origin_url(url: &str) -> Option<(String, String)> {
    if let Some(rest) = url.split("://").nth(1) {
        // scheme://[user@]host[:port]/path
        let (authority, path) = rest.split_once('/')?;
        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = host.split(':').next().unwrap_or(host);
        return Some((host.to_string(), format!("/{path}")));
    }

    // scp-like: [user@]host:path
    if let Some((authority, path)) = url.split_once(':') {
        if !authority.contains('/') {
            let host = authority.rsplit('@').next().unwrap_or(authority);
            return Some((host.to_string(), format!("/{path}")));
        }
    }

    None
}
