//! Error taxonomy for the gomod prefetcher core.
//!
//! Every variant carries a human-readable reason plus the optional `solution`
//! and `docs` fields a CLI or service layer can surface; rendering them is an
//! external-collaborator concern (spec.md §7).

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// One of the five fatal error kinds the core can raise.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{reason}")]
    PackageRejected {
        reason: String,
        solution: Option<String>,
        docs: Option<String>,
    },

    #[error("go command `{}` failed with exit code {exit_code:?}", argv.join(" "))]
    ToolchainError {
        argv: Vec<String>,
        exit_code: Option<i32>,
        attempts: Option<u32>,
        stderr: String,
    },

    #[error("failed to fetch tags for {module_name}: {reason}")]
    FetchError { module_name: String, reason: String },

    #[error("path `{}` escapes root `{}`", attempted.display(), root.display())]
    PathOutsideRoot { root: PathBuf, attempted: PathBuf },

    #[error("vendor/modules.txt: {message}")]
    UnexpectedFormat {
        message: String,
        solution: Option<String>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn package_rejected(reason: impl Into<String>) -> Self {
        Error::PackageRejected {
            reason: reason.into(),
            solution: None,
            docs: None,
        }
    }

    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        if let Error::PackageRejected { solution: s, .. }
        | Error::UnexpectedFormat { solution: s, .. } = &mut self
        {
            *s = Some(solution.into());
        }
        self
    }

    pub fn with_docs(mut self, docs: impl Into<String>) -> Self {
        if let Error::PackageRejected { docs: d, .. } = &mut self {
            *d = Some(docs.into());
        }
        self
    }
}
