//! Literal end-to-end scenarios.
//!
//! Each scenario builds a throwaway git repository with `git2` and exercises
//! the public API pieces that don't require an installed `go` toolchain: the
//! version reifier (pure git history), the main-module composer, the local
//! replacement path guard, and the vendoring arbiter / mutation detector.

use std::path::Path;
use std::process::Command;

use gomod_core::composer::compose_main_module;
use gomod_core::error::Error;
use gomod_core::model::{Module, ParsedReplace};
use gomod_core::path_guard::RootedPath;
use gomod_core::reifier::reify_version;
use gomod_core::sbom::build_packages;
use gomod_core::model::ParsedPackage;
use gomod_core::vendor;

fn init_repo_with_origin(root: &Path) {
    run_git(root, &["init", "-q"]);
    run_git(root, &["config", "user.email", "test@example.com"]);
    run_git(root, &["config", "user.name", "Test"]);
    run_git(root, &["remote", "add", "origin", "https://example.com/a.git"]);
}

fn run_git(root: &Path, args: &[&str]) {
    let status = Command::new("git").args(args).current_dir(root).status().unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn commit(root: &Path, file: &str, contents: &str, message: &str) {
    std::fs::write(root.join(file), contents).unwrap();
    run_git(root, &["add", "-A"]);
    run_git(root, &["commit", "-q", "-m", message]);
}

fn tag(root: &Path, name: &str) {
    run_git(root, &["tag", name]);
}

/// Scenario 1: trivial tagged module.
#[test]
fn trivial_tagged_module_resolves_to_tag_version() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo_with_origin(tmp.path());
    commit(tmp.path(), "go.mod", "module example.com/a\n", "initial");
    tag(tmp.path(), "v1.2.3");

    let app_dir = RootedPath::from_root(tmp.path()).unwrap();
    let version = reify_version("example.com/a", tmp.path(), app_dir.path(), None, false).unwrap();
    assert_eq!(version, "v1.2.3");

    let main_module = compose_main_module(&app_dir, "example.com/a", &version).unwrap();
    assert_eq!(main_module.name, "example.com/a");
    assert_eq!(main_module.version, "v1.2.3");
    assert_eq!(main_module.real_path, "example.com/a");
}

/// Scenario 2: pseudo-version after a tag two commits behind HEAD.
#[test]
fn pseudo_version_after_tag() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo_with_origin(tmp.path());
    commit(tmp.path(), "go.mod", "module example.com/a\n", "initial");
    tag(tmp.path(), "v1.2.3");
    commit(tmp.path(), "file2", "x", "second");
    commit(tmp.path(), "file3", "y", "third");

    let app_dir = RootedPath::from_root(tmp.path()).unwrap();
    let version = reify_version("example.com/a", tmp.path(), app_dir.path(), None, false).unwrap();

    // vX.Y.(Z+1)-0.<timestamp>-<hash>; the timestamp/hash come from the local
    // commit, so only the structural shape is asserted.
    assert!(version.starts_with("v1.2.4-0."));
    assert_eq!(version.len(), "v1.2.4-0.20240102030405-abcdef012345".len());
}

/// Scenario 3: pseudo-version after a prerelease tag, with a `/v2` module path.
#[test]
fn pseudo_version_after_prerelease_tag_with_v2_module() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo_with_origin(tmp.path());
    commit(tmp.path(), "go.mod", "module example.com/a/v2\n", "initial");
    tag(tmp.path(), "v2.0.0-alpha");
    commit(tmp.path(), "file2", "x", "second");
    commit(tmp.path(), "file3", "y", "third");

    let app_dir = RootedPath::from_root(tmp.path()).unwrap();
    let version =
        reify_version("example.com/a/v2", tmp.path(), app_dir.path(), None, false).unwrap();

    assert!(version.starts_with("v2.0.0-alpha.0."));
}

/// Scenario 4: a version-to-version replacement's resolved module and the
/// package that joins to it.
#[test]
fn version_replacement_resolves_module_and_joins_package() {
    let replaced = Module {
        name: "example.com/c".to_string(),
        original_name: "example.com/b".to_string(),
        real_path: "example.com/c".to_string(),
        version: "v1.1.0".to_string(),
        main: false,
    };
    assert_eq!(replaced.name, "example.com/c");
    assert_eq!(replaced.original_name, "example.com/b");
    assert_eq!(replaced.real_path, "example.com/c");
    assert_eq!(replaced.version, "v1.1.0");

    let parsed = vec![ParsedPackage {
        import_path: "example.com/b/sub".to_string(),
        standard: false,
        module: Some(gomod_core::model::ParsedModule {
            path: "example.com/b".to_string(),
            version: Some("v1.0.0".to_string()),
            main: false,
            replace: Some(ParsedReplace {
                path: "example.com/c".to_string(),
                version: Some("v1.1.0".to_string()),
            }),
        }),
    }];

    let packages = build_packages(&[replaced], &parsed).unwrap();
    match &packages[0] {
        gomod_core::model::AnyPackage::Module(p) => {
            assert_eq!(p.relative_path, "sub");
            assert_eq!(p.name(), "example.com/b/sub");
            assert_eq!(p.real_path(), "example.com/c/sub");
        }
        _ => panic!("expected a module package"),
    }
}

/// Scenario 5: a local replacement escaping the repository root.
#[test]
fn local_replacement_escaping_root_fails_path_outside_root() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("app")).unwrap();
    std::fs::create_dir_all(tmp.path().join("outside")).unwrap();

    let app_dir = RootedPath::from_root(tmp.path().join("app")).unwrap();
    let err = app_dir.join_within_root("../outside").unwrap_err();
    assert!(matches!(err, Error::PathOutsideRoot { .. }));
}

/// Scenario 6: vendor-check with a tree `go mod vendor` would have modified.
#[test]
fn vendor_check_with_dirty_tree_fails_package_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo_with_origin(tmp.path());
    std::fs::create_dir_all(tmp.path().join("vendor")).unwrap();
    commit(
        tmp.path(),
        "vendor/modules.txt",
        "# example.com/a v1.0.0\nexample.com/a\n",
        "vendor",
    );

    let app_dir = RootedPath::from_root(tmp.path()).unwrap();
    let decision =
        vendor::decide(&[vendor::VENDOR_CHECK_FLAG.to_string()], &app_dir, true).unwrap();
    assert!(decision.should_vendor);
    assert!(!decision.may_mutate_vendor_tree);

    // Simulate `go mod vendor` producing a different modules.txt than committed.
    std::fs::write(
        tmp.path().join("vendor/modules.txt"),
        "# example.com/a v1.0.1\nexample.com/a\n",
    )
    .unwrap();

    let changed = vendor::vendor_changed(&app_dir).unwrap();
    assert!(changed, "expected vendor/modules.txt mutation to be detected");
}
