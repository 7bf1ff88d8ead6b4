//! SBOM component projection (spec.md §4.10).
//!
//! Maps canonical modules and packages onto the purl-identified component
//! shape an external SBOM serializer consumes, and performs the
//! package-to-module join the resolver's raw package list still needs.

use std::collections::HashMap;

use packageurl::PackageUrl;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{AnyPackage, Module, Package, ParsedPackage, StandardPackage};

/// An SBOM component: name, optional version, and purl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub version: Option<String>,
    pub purl: String,
}

fn build_purl(name: &str, version: Option<&str>, component_type: &str) -> Result<String> {
    let mut purl = PackageUrl::new("golang", name)
        .map_err(|e| Error::package_rejected(format!("invalid purl name {name:?}: {e}")))?;
    if let Some(v) = version {
        purl.with_version(v)
            .map_err(|e| Error::package_rejected(format!("invalid purl version {v:?}: {e}")))?;
    }
    purl.add_qualifier("type", component_type)
        .map_err(|e| Error::package_rejected(format!("invalid purl qualifier: {e}")))?;
    Ok(purl.to_string())
}

pub fn module_component(module: &Module) -> Result<Component> {
    Ok(Component {
        name: module.name.clone(),
        version: Some(module.version.clone()),
        purl: build_purl(&module.real_path, Some(&module.version), "module")?,
    })
}

pub fn package_component(package: &Package) -> Result<Component> {
    Ok(Component {
        name: package.name(),
        version: Some(package.module.version.clone()),
        purl: build_purl(&package.real_path(), Some(&package.module.version), "package")?,
    })
}

pub fn standard_package_component(package: &StandardPackage) -> Result<Component> {
    Ok(Component {
        name: package.name.clone(),
        version: None,
        purl: build_purl(&package.name, None, "package")?,
    })
}

pub fn any_package_component(package: &AnyPackage) -> Result<Component> {
    match package {
        AnyPackage::Module(p) => package_component(p),
        AnyPackage::Standard(p) => standard_package_component(p),
    }
}

/// Join each parsed package to its owning canonical module, building the
/// final `Package`/`StandardPackage` list (spec.md §4.10's join rules).
///
/// Packages whose `Module` field is absent (the toolchain's `-e` flag
/// suppresses many errors, which can blank this field) fall back to a
/// longest-prefix match of `import_path` against modules' `original_name`.
/// Preserving that silence is the conservative choice (spec.md §9).
pub fn build_packages(
    modules: &[Module],
    parsed_packages: &[ParsedPackage],
) -> Result<Vec<AnyPackage>> {
    let indexed: HashMap<&str, &Module> = modules
        .iter()
        .map(|m| (m.original_name.as_str(), m))
        .collect();

    parsed_packages
        .iter()
        .map(|pkg| {
            if pkg.standard {
                return Ok(AnyPackage::Standard(StandardPackage {
                    name: pkg.import_path.clone(),
                }));
            }

            let module = match &pkg.module {
                Some(parsed_module) => indexed.get(parsed_module.path.as_str()).copied(),
                None => None,
            };
            let module = match module {
                Some(m) => m,
                None => find_parent_by_longest_prefix(&indexed, &pkg.import_path)?,
            };

            let relative_path = resolve_relative_path(&pkg.import_path, &module.original_name);

            Ok(AnyPackage::Module(Package {
                relative_path,
                module: module.clone(),
            }))
        })
        .collect()
}

fn find_parent_by_longest_prefix<'a>(
    indexed: &HashMap<&'a str, &'a Module>,
    import_path: &str,
) -> Result<&'a Module> {
    indexed
        .iter()
        .filter(|(original_name, _)| is_path_prefix(original_name, import_path))
        .max_by_key(|(original_name, _)| original_name.len())
        .map(|(_, module)| *module)
        .ok_or_else(|| {
            // Spec.md §4.10: "A package with no match is a programmer error";
            // the toolchain does not emit such packages outside error states.
            warn!(import_path, "package matched no owning module by longest prefix");
            Error::package_rejected(format!(
                "package {import_path} has no owning module (programmer error)"
            ))
        })
}

fn is_path_prefix(prefix: &str, path: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

fn resolve_relative_path(import_path: &str, module_original_name: &str) -> String {
    import_path
        .strip_prefix(module_original_name)
        .unwrap_or(import_path)
        .trim_start_matches('/')
        .to_string()
}

/// Sort components by purl, for the deterministic output spec.md §8 requires.
pub fn sort_components(components: &mut [Component]) {
    components.sort_by(|a, b| a.purl.cmp(&b.purl));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, real_path: &str, version: &str) -> Module {
        Module {
            name: name.to_string(),
            original_name: name.to_string(),
            real_path: real_path.to_string(),
            version: version.to_string(),
            main: false,
        }
    }

    #[test]
    fn module_purl_has_module_qualifier() {
        let m = module("example.com/a", "example.com/a", "v1.2.3");
        let c = module_component(&m).unwrap();
        assert_eq!(c.purl, "pkg:golang/example.com/a@v1.2.3?type=module");
    }

    #[test]
    fn package_purl_uses_relative_path_and_module_version() {
        let m = module("example.com/c", "example.com/c", "v1.1.0");
        let p = Package {
            relative_path: "sub".to_string(),
            module: m,
        };
        let c = package_component(&p).unwrap();
        assert_eq!(c.name, "example.com/c/sub");
        assert_eq!(c.purl, "pkg:golang/example.com/c/sub@v1.1.0?type=package");
    }

    #[test]
    fn standard_package_has_no_version_qualifier() {
        let sp = StandardPackage {
            name: "fmt".to_string(),
        };
        let c = standard_package_component(&sp).unwrap();
        assert_eq!(c.version, None);
        assert_eq!(c.purl, "pkg:golang/fmt?type=package");
    }

    #[test]
    fn purl_construction_is_deterministic() {
        let m = module("example.com/a", "example.com/a", "v1.0.0");
        let c1 = module_component(&m).unwrap();
        let c2 = module_component(&m).unwrap();
        assert_eq!(c1.purl, c2.purl);
    }

    #[test]
    fn build_packages_falls_back_to_longest_prefix_match() {
        let modules = vec![
            module("example.com/a", "example.com/a", "v1.0.0"),
            module("example.com/a/sub", "example.com/a/sub", "v1.0.0"),
        ];
        let parsed = vec![ParsedPackage {
            import_path: "example.com/a/sub/deep".to_string(),
            standard: false,
            module: None,
        }];
        let packages = build_packages(&modules, &parsed).unwrap();
        match &packages[0] {
            AnyPackage::Module(p) => {
                assert_eq!(p.module.original_name, "example.com/a/sub");
                assert_eq!(p.relative_path, "deep");
            }
            _ => panic!("expected module package"),
        }
    }
}
