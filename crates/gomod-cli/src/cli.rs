use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gomod-prefetch", version, about = "Hermetic dependency prefetcher for Go modules", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a Go module's dependencies and emit an SBOM component list
    #[command(after_help = "EXAMPLES:
  # Download mode, main module at the repository root
  gomod-prefetch fetch --path .

  # Vendor mode: trust an existing vendor/ directory and regenerate it
  gomod-prefetch fetch --path . --flag gomod-vendor

  # Vendor-check mode: fail if `go mod vendor` would change vendor/
  gomod-prefetch fetch --path . --flag gomod-vendor-check

  # A module that lives below the repository root
  gomod-prefetch fetch --path services/worker")]
    Fetch {
        /// Path to the Go module's directory (must be inside a git working copy)
        #[arg(long, default_value = ".")]
        path: String,
        /// Repository-relative flags (gomod-vendor, gomod-vendor-check), may repeat
        #[arg(long = "flag", value_name = "FLAG")]
        flags: Vec<String>,
        /// Run `go mod tidy` before resolving
        #[arg(long)]
        force_tidy: bool,
        /// Skip force-fetching tags from `origin` before computing versions
        #[arg(long)]
        no_update_tags: bool,
        /// Reject a committed vendor/ directory unless a vendor flag is set
        #[arg(long)]
        strict_vendor: bool,
        /// Set CGO_ENABLED=0 for every toolchain invocation
        #[arg(long)]
        cgo_disable: bool,
        /// Override GOPROXY for every toolchain invocation
        #[arg(long, value_name = "URL")]
        goproxy: Option<String>,
        /// Maximum attempts for network-touching toolchain commands
        #[arg(long, default_value_t = 5)]
        download_max_tries: u32,
        /// Write the JSON component list here instead of stdout
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<String>,
    },
}
