//! Process-wide configuration store (spec.md §9).
//!
//! Constructed once before resolution and passed by shared reference through
//! the resolver's entry point; no component mutates it.

/// How an environment-variable contribution's value should be interpreted by
/// a downstream build (spec.md §6: "Environment-variable output").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentVariableKind {
    /// `value` is relative to the request's output directory.
    Path,
    /// `value` is used verbatim.
    Literal,
}

#[derive(Debug, Clone)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
    pub kind: EnvironmentVariableKind,
}

impl EnvironmentVariable {
    pub fn path(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: EnvironmentVariableKind::Path,
        }
    }

    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: EnvironmentVariableKind::Literal,
        }
    }
}

/// The three path-kind env vars the core always contributes (spec.md §6),
/// plus the literal `GO111MODULE=on` reported as a first-class contribution
/// (SPEC_FULL.md §11).
pub fn default_environment_variables() -> Vec<EnvironmentVariable> {
    vec![
        EnvironmentVariable::path("GOCACHE", "deps/gomod"),
        EnvironmentVariable::path("GOPATH", "deps/gomod"),
        EnvironmentVariable::path("GOMODCACHE", "deps/gomod/pkg/mod"),
        EnvironmentVariable::literal("GO111MODULE", "on"),
    ]
}

/// Process-wide, read-only configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Max attempts for the download invoker's exponential backoff.
    pub gomod_download_max_tries: u32,
    /// Overrides `GOPROXY` for every toolchain invocation, if set.
    pub goproxy_url: Option<String>,
    /// Reject a vendor directory in the source tree unless a vendor flag is set.
    pub gomod_strict_vendor: bool,
    /// Add `CGO_ENABLED=0` to every toolchain invocation.
    pub cgo_disable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gomod_download_max_tries: 5,
            goproxy_url: None,
            gomod_strict_vendor: false,
            cgo_disable: false,
        }
    }
}
