//! Data model (spec.md §3): raw toolchain output, canonical modules and
//! packages, and the replacement tagged alternative (spec.md §9).

use serde::Deserialize;

/// A `replace` directive target, as emitted by `go mod download -json` / `go list`.
///
/// Distinguished by presence of `version`: a version-to-version replacement
/// carries one, a local-path replacement does not. Modeled as a tagged
/// alternative rather than inheritance, per spec.md §9.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsedReplace {
    pub path: String,
    pub version: Option<String>,
}

impl ParsedReplace {
    pub fn is_local(&self) -> bool {
        self.version.is_none()
    }
}

/// A Go module as returned by the `-json` option of various commands
/// (relevant fields only; see `go help mod download` / `go help list`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParsedModule {
    pub path: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub replace: Option<ParsedReplace>,
}

/// A Go package as returned by the `-json` option of `go list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsedPackage {
    #[serde(rename = "ImportPath")]
    pub import_path: String,
    #[serde(rename = "Standard", default)]
    pub standard: bool,
    #[serde(rename = "Module", default)]
    pub module: Option<ParsedModule>,
}

/// A Go module decorated with the identity the SBOM needs (spec.md §3).
///
/// `name` is the identity after any replacement; `original_name` is the path
/// as written in `go.mod`, used as the join key against parsed packages;
/// `real_path` locates the module on the internet for purl construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub original_name: String,
    pub real_path: String,
    pub version: String,
    pub main: bool,
}

impl Module {
    pub fn main_module(original_name: String, real_path: String, version: String) -> Self {
        Module {
            name: original_name.clone(),
            original_name,
            real_path,
            version,
            main: true,
        }
    }

    /// The uniqueness key of spec.md §3: identity collapses replacement.
    ///
    /// Version replacement -> `(replace.path, replace.version)`.
    /// Local replacement -> `(path, replace.path)`.
    /// No replacement -> `(path, version)`.
    pub fn identity_key(parsed: &ParsedModule) -> (String, Option<String>) {
        match &parsed.replace {
            None => (parsed.path.clone(), parsed.version.clone()),
            Some(replace) if replace.version.is_some() => {
                (replace.path.clone(), replace.version.clone())
            }
            Some(replace) => (parsed.path.clone(), Some(replace.path.clone())),
        }
    }
}

/// A Go package with the data the SBOM needs (spec.md §3).
///
/// `relative_path` is the portion of `import_path` below the owning module's
/// `original_name`; empty means the package is the module root.
#[derive(Debug, Clone)]
pub struct Package {
    pub relative_path: String,
    pub module: Module,
}

impl Package {
    pub fn name(&self) -> String {
        if self.relative_path.is_empty() {
            self.module.name.clone()
        } else {
            format!("{}/{}", self.module.name, self.relative_path)
        }
    }

    pub fn real_path(&self) -> String {
        if self.relative_path.is_empty() {
            self.module.real_path.clone()
        } else {
            format!("{}/{}", self.module.real_path, self.relative_path)
        }
    }
}

/// A Go standard-library package: no owning module, no version.
#[derive(Debug, Clone)]
pub struct StandardPackage {
    pub name: String,
}

/// Any resolved package, standard-library or module-owned.
#[derive(Debug, Clone)]
pub enum AnyPackage {
    Module(Package),
    Standard(StandardPackage),
}
