use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use gomod_core::config::{Config, EnvironmentVariable, EnvironmentVariableKind};
use gomod_core::path_guard::RootedPath;
use gomod_core::resolver::{resolve, ResolveRequest};
use gomod_core::sbom::{any_package_component, module_component, sort_components, Component};
use gomod_core::workspace::ModuleCacheWorkspace;

mod cli;

use cli::{Cli, Commands};

#[derive(Serialize)]
struct ComponentJson {
    name: String,
    version: Option<String>,
    purl: String,
}

impl From<Component> for ComponentJson {
    fn from(c: Component) -> Self {
        ComponentJson {
            name: c.name,
            version: c.version,
            purl: c.purl,
        }
    }
}

#[derive(Serialize)]
struct EnvironmentVariableJson {
    name: String,
    value: String,
    kind: &'static str,
}

impl From<EnvironmentVariable> for EnvironmentVariableJson {
    fn from(e: EnvironmentVariable) -> Self {
        EnvironmentVariableJson {
            name: e.name,
            value: e.value,
            kind: match e.kind {
                EnvironmentVariableKind::Path => "path",
                EnvironmentVariableKind::Literal => "literal",
            },
        }
    }
}

#[derive(Serialize)]
struct OutputDoc {
    components: Vec<ComponentJson>,
    environment: Vec<EnvironmentVariableJson>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch {
            path,
            flags,
            force_tidy,
            no_update_tags,
            strict_vendor,
            cgo_disable,
            goproxy,
            download_max_tries,
            output,
        } => fetch(
            &path,
            flags,
            force_tidy,
            !no_update_tags,
            strict_vendor,
            cgo_disable,
            goproxy,
            download_max_tries,
            output.as_deref(),
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn fetch(
    path: &str,
    flags: Vec<String>,
    force_tidy: bool,
    update_tags: bool,
    strict_vendor: bool,
    cgo_disable: bool,
    goproxy: Option<String>,
    download_max_tries: u32,
    output: Option<&str>,
) -> Result<()> {
    let module_path = Path::new(path)
        .canonicalize()
        .with_context(|| format!("{path} does not exist"))?;

    let repo = git2::Repository::discover(&module_path)
        .with_context(|| format!("{} is not inside a git working copy", module_path.display()))?;
    let repo_root = repo
        .workdir()
        .context("git repository has no working directory")?
        .to_path_buf();

    let root = RootedPath::from_root(&repo_root)?;
    let relative = module_path.strip_prefix(&repo_root).unwrap_or(Path::new("."));
    let app_dir = root.join_within_root(relative)?;

    let config = Config {
        gomod_download_max_tries: download_max_tries,
        goproxy_url: goproxy,
        gomod_strict_vendor: strict_vendor,
        cgo_disable,
    };

    let workspace = ModuleCacheWorkspace::new("gomod-prefetch-")?;
    let request = ResolveRequest {
        flags,
        update_tags,
        force_tidy,
    };

    let result = resolve(&app_dir, &request, &workspace, &config)?;

    let mut components: Vec<Component> = Vec::new();
    components.push(module_component(&result.main_module)?);
    for module in &result.modules {
        components.push(module_component(module)?);
    }
    for package in &result.packages {
        components.push(any_package_component(package)?);
    }
    sort_components(&mut components);

    let components: Vec<ComponentJson> = components.into_iter().map(ComponentJson::from).collect();
    let environment: Vec<EnvironmentVariableJson> = result
        .environment
        .into_iter()
        .map(EnvironmentVariableJson::from)
        .collect();

    let output_doc = OutputDoc {
        components,
        environment,
    };
    let rendered = serde_json::to_string_pretty(&output_doc)?;

    match output {
        Some(file) => std::fs::write(file, rendered)?,
        None => println!("{rendered}"),
    }

    Ok(())
}
