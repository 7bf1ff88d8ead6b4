//! Resolver (spec.md §4.7).
//!
//! Drives the external Go toolchain to enumerate modules and packages,
//! reconciles the downloaded-set, imported-set, and vendored-set views, and
//! applies module-replacement rules. This is the core's central contract.

use std::collections::HashMap;

use tracing::info;

use crate::config::{default_environment_variables, Config, EnvironmentVariable};
use crate::error::{Error, Result};
use crate::json_stream::parse_concatenated;
use crate::model::{AnyPackage, Module, ParsedModule, ParsedPackage};
use crate::path_guard::{guard_module_tree, RootedPath};
use crate::reifier::reify_version;
use crate::sbom::build_packages;
use crate::toolchain::{DownloadInvoker, ToolchainInvoker};
use crate::vendor;
use crate::workspace::ModuleCacheWorkspace;
use crate::composer::compose_main_module;

/// Per-request flags threaded through from intake (spec.md §6, SPEC_FULL.md §11).
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub flags: Vec<String>,
    /// Gate on `_get_golang_version`'s `update_tags=true` (SPEC_FULL.md §14 Q1).
    pub update_tags: bool,
    pub force_tidy: bool,
}

impl ResolveRequest {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

pub struct ResolveOutput {
    pub main_module: Module,
    /// All non-main modules, deduplicated by spec.md §3's identity key.
    pub modules: Vec<Module>,
    pub packages: Vec<AnyPackage>,
    pub should_vendor: bool,
    /// The `GOPATH`/`GOCACHE`/`GOMODCACHE`/`GO111MODULE` contributions a
    /// downstream build must apply (spec.md §6, SPEC_FULL.md §11).
    pub environment: Vec<EnvironmentVariable>,
}

/// Resolve one Go module rooted at `app_dir` (already joined within the
/// repository root) against `request`, using `workspace` for the toolchain's
/// `GOPATH`/`GOCACHE`/`GOMODCACHE`.
pub fn resolve(
    app_dir: &RootedPath,
    request: &ResolveRequest,
    workspace: &ModuleCacheWorkspace,
    config: &Config,
) -> Result<ResolveOutput> {
    guard_module_tree(app_dir)?;

    let mut env: Vec<(String, String)> = vec![
        ("GOPATH".to_string(), workspace.gopath().display().to_string()),
        ("GO111MODULE".to_string(), "on".to_string()),
        ("GOCACHE".to_string(), workspace.gocache().display().to_string()),
        ("GOMODCACHE".to_string(), workspace.gomodcache().display().to_string()),
    ];
    if let Some(proxy) = &config.goproxy_url {
        env.push(("GOPROXY".to_string(), proxy.clone()));
    }
    if config.cgo_disable {
        env.push(("CGO_ENABLED".to_string(), "0".to_string()));
    }

    let invoker = ToolchainInvoker::new();
    let download_invoker = DownloadInvoker::new(config.gomod_download_max_tries);

    crate::toolchain::go_version(&invoker, app_dir.path())?;

    let decision = vendor::decide(&request.flags, app_dir, config.gomod_strict_vendor)?;

    let downloaded_modules: Vec<ParsedModule> = if decision.should_vendor {
        info!("vendoring the gomod dependencies");
        download_invoker.run(&["go", "mod", "vendor"], app_dir.path(), &env)?;
        if !decision.may_mutate_vendor_tree && vendor::vendor_changed(app_dir)? {
            return Err(Error::package_rejected(
                "The content of the vendor directory is not consistent with go.mod. \
                 Please check the logs for more details.",
            )
            .with_solution(
                "Please try running `go mod vendor` and committing the changes.\n\
                 Note that you may need to `git add --force` ignored files in the vendor/ dir.",
            ));
        }
        vendor::parse_vendor_modules(app_dir)?
    } else {
        info!("downloading the gomod dependencies");
        let out =
            download_invoker.run(&["go", "mod", "download", "-json"], app_dir.path(), &env)?;
        parse_concatenated(&out)?
    };

    if request.force_tidy {
        invoker.run(&["go", "mod", "tidy"], app_dir.path(), &env)?;
    }

    let mut go_list_base: Vec<&str> = vec!["go", "list", "-e"];
    if !decision.should_vendor {
        go_list_base.push("-mod");
        go_list_base.push("readonly");
    }

    let mut main_args = go_list_base.clone();
    main_args.push("-m");
    let main_module_name = invoker.run(&main_args, app_dir.path(), &env)?.trim().to_string();

    let main_module_version = reify_version(
        &main_module_name,
        app_dir.root(),
        app_dir.path(),
        None,
        request.update_tags,
    )?;
    let main_module = compose_main_module(app_dir, &main_module_name, &main_module_version)?;

    let go_list_deps = |pattern: &str| -> Result<Vec<ParsedPackage>> {
        let mut args = go_list_base.clone();
        args.extend(["-deps", "-json=ImportPath,Module,Standard,Deps", pattern]);
        let out = invoker.run(&args, app_dir.path(), &env)?;
        parse_concatenated(&out)
    };

    let all_packages_for_modules = go_list_deps("all")?;
    let package_modules: Vec<ParsedModule> = all_packages_for_modules
        .into_iter()
        .filter_map(|pkg| pkg.module)
        .filter(|m| !m.main)
        .collect();

    let merged_parsed_modules = deduplicate_resolved_modules(package_modules, downloaded_modules);

    info!("retrieving the list of packages");
    let compiled_packages = go_list_deps("./...")?;

    validate_local_replacements(&merged_parsed_modules, app_dir)?;

    let modules = create_modules_from_parsed_data(&main_module, app_dir, &merged_parsed_modules)?;

    let mut all_modules_for_join = modules.clone();
    all_modules_for_join.push(main_module.clone());
    let packages = build_packages(&all_modules_for_join, &compiled_packages)?;

    Ok(ResolveOutput {
        main_module,
        modules,
        packages,
        should_vendor: decision.should_vendor,
        environment: default_environment_variables(),
    })
}

/// Merge the package-modules-set and downloaded-set (spec.md §4.7 step 6).
///
/// The package view carries replacement information and must dominate, so it
/// is walked first; `setdefault`-style insertion means the first writer wins.
fn deduplicate_resolved_modules(
    package_modules: Vec<ParsedModule>,
    downloaded_modules: Vec<ParsedModule>,
) -> Vec<ParsedModule> {
    let mut by_key: HashMap<(String, Option<String>), ParsedModule> = HashMap::new();
    let mut order: Vec<(String, Option<String>)> = Vec::new();

    for module in package_modules.into_iter().chain(downloaded_modules) {
        let key = Module::identity_key(&module);
        if !by_key.contains_key(&key) {
            order.push(key.clone());
            by_key.insert(key, module);
        }
    }

    order.into_iter().filter_map(|k| by_key.remove(&k)).collect()
}

/// Every `replace.path` beginning with `.` must join within the app root
/// (spec.md §4.7 step 8).
fn validate_local_replacements(modules: &[ParsedModule], app_dir: &RootedPath) -> Result<()> {
    for module in modules {
        let Some(replace) = &module.replace else { continue };
        if !replace.path.starts_with('.') {
            continue;
        }
        if let Err(Error::PathOutsideRoot { root, attempted }) =
            app_dir.join_within_root(&replace.path)
        {
            return Err(Error::package_rejected(format!(
                "The module '{}' is being replaced by the local path '{}', which falls outside \
                 of the repository root ({} is not inside {}). Refusing to proceed.",
                module.path,
                replace.path,
                attempted.display(),
                root.display()
            )));
        }
    }
    Ok(())
}

/// Build canonical `Module`s from the merged parsed modules (spec.md §3's
/// `Module` construction rules).
fn create_modules_from_parsed_data(
    main_module: &Module,
    main_module_dir: &RootedPath,
    parsed_modules: &[ParsedModule],
) -> Result<Vec<Module>> {
    parsed_modules
        .iter()
        .map(|module| create_module(main_module, main_module_dir, module))
        .collect()
}

fn create_module(
    main_module: &Module,
    main_module_dir: &RootedPath,
    module: &ParsedModule,
) -> Result<Module> {
    let Some(replace) = &module.replace else {
        return Ok(Module {
            name: module.path.clone(),
            original_name: module.path.clone(),
            real_path: module.path.clone(),
            version: module.version.clone().unwrap_or_default(),
            main: false,
        });
    };

    if let Some(version) = &replace.version {
        // module/name v1.0.0 => replace/name v1.2.3
        return Ok(Module {
            name: replace.path.clone(),
            original_name: module.path.clone(),
            real_path: replace.path.clone(),
            version: version.clone(),
            main: false,
        });
    }

    // module/name v1.0.0 => ./local/path
    let resolved_replacement_path = main_module_dir.join_within_root(&replace.path)?;
    let version = reify_version(
        &module.path,
        main_module_dir.root(),
        resolved_replacement_path.path(),
        None,
        false,
    )?;
    let real_path = resolve_local_replacement_real_path(main_module, replace);

    Ok(Module {
        name: module.path.clone(),
        original_name: module.path.clone(),
        real_path,
        version,
        main: false,
    })
}

fn resolve_local_replacement_real_path(
    main_module: &Module,
    replace: &crate::model::ParsedReplace,
) -> String {
    let combined = format!("{}/{}", main_module.real_path, replace.path);
    normalize_posix_path(&combined)
}

fn normalize_posix_path(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParsedReplace;

    fn pm(path: &str, version: Option<&str>, replace: Option<ParsedReplace>) -> ParsedModule {
        ParsedModule {
            path: path.to_string(),
            version: version.map(str::to_string),
            main: false,
            replace,
        }
    }

    #[test]
    fn package_modules_dominate_downloaded_modules_on_key_collision() {
        let package_modules = vec![pm(
            "example.com/b",
            Some("v1.0.0"),
            Some(ParsedReplace {
                path: "example.com/c".to_string(),
                version: Some("v1.1.0".to_string()),
            }),
        )];
        let downloaded = vec![pm("example.com/c", Some("v1.1.0"), None)];

        let merged = deduplicate_resolved_modules(package_modules, downloaded);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].replace.is_some());
    }

    #[test]
    fn normalize_posix_path_collapses_dot_dot() {
        assert_eq!(normalize_posix_path("a/b/../c"), "a/c");
        assert_eq!(normalize_posix_path("./a/./b"), "a/b");
    }

    #[test]
    fn validate_local_replacements_rejects_escaping_path() {
        let tmp = tempfile::tempdir().unwrap();
        let app_dir = RootedPath::from_root(tmp.path()).unwrap();
        let modules = vec![pm(
            "example.com/b",
            None,
            Some(ParsedReplace {
                path: "../outside".to_string(),
                version: None,
            }),
        )];
        let err = validate_local_replacements(&modules, &app_dir).unwrap_err();
        assert!(matches!(err, Error::PackageRejected { .. }));
    }

    #[test]
    fn validate_local_replacements_accepts_in_root_path() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("local")).unwrap();
        let app_dir = RootedPath::from_root(tmp.path()).unwrap();
        let modules = vec![pm(
            "example.com/b",
            None,
            Some(ParsedReplace {
                path: "./local".to_string(),
                version: None,
            }),
        )];
        validate_local_replacements(&modules, &app_dir).unwrap();
    }
}
