//! Version reifier (spec.md §4.8).
//!
//! Computes the canonical version string `go list` would assign to a module
//! from the local version-control history: an exact semantic-version tag on
//! the target commit, a pseudo-version derived from the nearest reachable
//! tag, or a bare `v0.0.0-<timestamp>-<hash>` pseudo-version when there is no
//! tag at all. This is the Go toolchain's pseudo-version algorithm
//! (https://go.dev/ref/mod#pseudo-versions), re-derived here because it is
//! not exposed as a library API.

use std::path::Path;

use chrono::{TimeZone, Utc};
use git2::{Commit, Repository};
use regex::Regex;
use semver::Version;

use crate::error::{Error, Result};

static MODULE_MAJOR_SUFFIX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();

fn module_major_suffix_re() -> &'static Regex {
    MODULE_MAJOR_SUFFIX.get_or_init(|| Regex::new(r"(?:.+/v)(\d+)$").unwrap())
}

/// Parse a module path's trailing `/vN` (N >= 2), per spec.md §4.8 step 1.
pub fn module_major_version(module_name: &str) -> Option<u64> {
    module_major_suffix_re()
        .captures(module_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Compute the canonical version of `module_name` rooted at `app_dir`
/// (relative to the enclosing repository at `repo_root`).
///
/// `commit_sha` defaults to `HEAD` when `None`. When `update_tags` is set,
/// tags are force-fetched from the `origin` remote before resolution; a
/// failure there is fatal (`FetchError`).
pub fn reify_version(
    module_name: &str,
    repo_root: &Path,
    app_dir: &Path,
    commit_sha: Option<&str>,
    update_tags: bool,
) -> Result<String> {
    let repo = Repository::open(repo_root).map_err(|e| {
        Error::package_rejected(format!(
            "{} is not inside a Git working copy: {e}",
            repo_root.display()
        ))
    })?;

    if update_tags {
        fetch_tags_force(&repo, module_name)?;
    }

    let module_major = module_major_version(module_name);
    let major_candidates: Vec<u64> = match module_major {
        Some(n) => vec![n],
        None => vec![1, 0],
    };

    let commit = match commit_sha {
        Some(sha) => {
            let oid = git2::Oid::from_str(sha)
                .map_err(|e| Error::package_rejected(format!("invalid commit sha {sha}: {e}")))?;
            repo.find_commit(oid)
                .map_err(|e| Error::package_rejected(format!("commit {sha} not found: {e}")))?
        }
        None => repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| Error::package_rejected(format!("failed to resolve HEAD: {e}")))?,
    };

    let subpath = subpath_of(repo_root, app_dir);

    for major in &major_candidates {
        if let Some(tag) = highest_semver_tag(&repo, &commit, *major, false, subpath.as_deref())? {
            return Ok(tag.full_name);
        }
    }

    for major in &major_candidates {
        if let Some(tag) = highest_semver_tag(&repo, &commit, *major, true, subpath.as_deref())? {
            let pseudo = pseudo_version(&commit, Some(&tag.semver))?;
            return Ok(pseudo);
        }
    }

    pseudo_version_without_base(&commit, module_major)
}

fn subpath_of(repo_root: &Path, app_dir: &Path) -> Option<String> {
    if app_dir == repo_root {
        return None;
    }
    app_dir
        .strip_prefix(repo_root)
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .filter(|s| !s.is_empty() && s != ".")
}

fn fetch_tags_force(repo: &Repository, module_name: &str) -> Result<()> {
    let mut remote = repo.find_remote("origin").map_err(|e| Error::FetchError {
        module_name: module_name.to_string(),
        reason: e.to_string(),
    })?;
    remote
        .fetch(&["+refs/tags/*:refs/tags/*"], None, None)
        .map_err(|e| Error::FetchError {
            module_name: module_name.to_string(),
            reason: e.to_string(),
        })
}

struct TagMatch {
    full_name: String,
    semver: Version,
}

/// Parse `tag_name` (stripped of any `<subpath>/v` or bare `v` prefix) into a
/// semantic version, discarding tags that don't parse (spec.md §4.8 step 5).
fn parse_tag_semver(tag_name: &str, subpath: Option<&str>) -> Option<Version> {
    let stripped = match subpath {
        Some(sp) => tag_name.strip_prefix(&format!("{sp}/v"))?,
        None => tag_name.strip_prefix('v')?,
    };
    Version::parse(stripped).ok()
}

/// Highest semver tag matching `major_version`, either pointing exactly at
/// `target_commit` (`all_reachable = false`) or reachable from it
/// (`all_reachable = true`). Returns the tag's full `go list` name (with the
/// subpath prefix already stripped, per spec.md step 5).
fn highest_semver_tag(
    repo: &Repository,
    target_commit: &Commit,
    major_version: u64,
    all_reachable: bool,
    subpath: Option<&str>,
) -> Result<Option<TagMatch>> {
    let tag_names = repo
        .tag_names(None)
        .map_err(|e| Error::package_rejected(format!("failed to list tags: {e}")))?;

    let prefix = match subpath {
        Some(sp) => format!("{sp}/v"),
        None => "v".to_string(),
    };

    let mut best: Option<(String, Version)> = None;

    for name in tag_names.iter().flatten() {
        if !name.starts_with(&prefix) {
            continue;
        }

        let Some(tag_commit) = resolve_tag_commit(repo, name) else {
            continue;
        };

        let matches_commit = if all_reachable {
            tag_commit.id() == target_commit.id()
                || repo
                    .graph_descendant_of(target_commit.id(), tag_commit.id())
                    .unwrap_or(false)
        } else {
            tag_commit.id() == target_commit.id()
        };
        if !matches_commit {
            continue;
        }

        let Some(semver) = parse_tag_semver(name, subpath) else {
            continue;
        };
        if semver.major != major_version {
            continue;
        }

        if best.as_ref().map_or(true, |(_, b)| semver > *b) {
            best = Some((name.to_string(), semver));
        }
    }

    Ok(best.map(|(name, semver)| {
        let stripped = match subpath {
            Some(sp) => name.strip_prefix(&format!("{sp}/")).unwrap_or(&name).to_string(),
            None => name,
        };
        TagMatch {
            full_name: stripped,
            semver,
        }
    }))
}

fn resolve_tag_commit<'a>(repo: &'a Repository, tag_name: &str) -> Option<Commit<'a>> {
    let reference = repo.find_reference(&format!("refs/tags/{tag_name}")).ok()?;
    let object = reference.peel(git2::ObjectType::Commit).ok()?;
    object.into_commit().ok()
}

/// `vX.Y.Z-pre.0.<ts>-<hash>` (prerelease base) or `vX.Y.(Z+1)-0.<ts>-<hash>`
/// (no prerelease), per spec.md §4.8 step 7.
fn pseudo_version(commit: &Commit, base: Option<&Version>) -> Result<String> {
    let (timestamp, hash) = commit_timestamp_and_hash(commit)?;

    let Some(base) = base else {
        return Ok(format!("v0.0.0-{timestamp}-{hash}"));
    };

    if !base.pre.is_empty() {
        Ok(format!(
            "v{}.{}.{}-{}.0.{timestamp}-{hash}",
            base.major, base.minor, base.patch, base.pre
        ))
    } else {
        Ok(format!(
            "v{}.{}.{}-0.{timestamp}-{hash}",
            base.major,
            base.minor,
            base.patch + 1
        ))
    }
}

fn pseudo_version_without_base(commit: &Commit, module_major: Option<u64>) -> Result<String> {
    let (timestamp, hash) = commit_timestamp_and_hash(commit)?;
    Ok(format!(
        "v{}.0.0-{timestamp}-{hash}",
        module_major.unwrap_or(0)
    ))
}

fn commit_timestamp_and_hash(commit: &Commit) -> Result<(String, String)> {
    let time = commit.committer().when();
    let dt = Utc
        .timestamp_opt(time.seconds(), 0)
        .single()
        .ok_or_else(|| Error::package_rejected("commit has an unrepresentable timestamp"))?;
    let timestamp = dt.format("%Y%m%d%H%M%S").to_string();
    let hash = commit.id().to_string()[..12].to_string();
    Ok((timestamp, hash))
}
