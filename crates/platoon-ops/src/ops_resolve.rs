//! Operation: resolve a request against module catalogs and render the result.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use platoon_core::config::{GlobalConfig, ResolutionConfig};
use platoon_core::descriptor::ModuleCatalog;
use platoon_core::request::ResolutionRequest;
use platoon_resolver::cache::CachingProvider;
use platoon_resolver::graph::ResolvedGraph;
use platoon_resolver::propagator::Propagator;
use platoon_resolver::provider::InMemoryProvider;
use platoon_util::errors::PlatoonError;
use platoon_util::progress::{spinner, status, status_info, status_warn};

/// How the resolved graph is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Tree,
    List,
    Json,
}

impl FromStr for OutputFormat {
    type Err = PlatoonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tree" => Ok(Self::Tree),
            "list" => Ok(Self::List),
            "json" => Ok(Self::Json),
            other => Err(PlatoonError::Generic {
                message: format!("Unknown output format `{other}` (expected tree, list or json)"),
            }),
        }
    }
}

/// Options for `platoon resolve`.
#[derive(Debug, Default)]
pub struct ResolveOptions {
    /// Module catalogs, merged in order.
    pub catalogs: Vec<PathBuf>,
    pub format: OutputFormat,
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Explain why a module is in the graph.
    pub why: Option<String>,
    /// Show the dependents of a module instead of the full tree.
    pub inverted: Option<String>,
    /// Show version conflicts.
    pub conflicts: bool,
}

/// Resolve the request at `request_path` and print the result.
pub async fn resolve(request_path: &Path, opts: &ResolveOptions) -> miette::Result<()> {
    let config = match GlobalConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring global config: {e}");
            GlobalConfig::default()
        }
    };
    let graph = resolve_with_config(request_path, &opts.catalogs, &config.resolution).await?;
    print!("{}", render(&graph, opts)?);
    Ok(())
}

/// Load the request and catalogs, then run resolution to a fixpoint.
pub async fn resolve_with_config(
    request_path: &Path,
    catalogs: &[PathBuf],
    config: &ResolutionConfig,
) -> miette::Result<ResolvedGraph> {
    let request = ResolutionRequest::from_path(request_path)?;
    request.validate()?;

    let mut catalog = ModuleCatalog::default();
    for path in catalogs {
        catalog.extend(ModuleCatalog::from_path(path)?)?;
    }
    tracing::debug!(
        "Loaded {} module version(s) from {} catalog(s)",
        catalog.len(),
        catalogs.len()
    );

    let root = request.root.id.to_string();
    status("Resolving", &root);

    let scheme = config
        .with_overrides(&request.resolution)
        .version_scheme
        .scheme();
    let provider = Arc::new(CachingProvider::new(InMemoryProvider::new(catalog, scheme)));
    let mut propagator = Propagator::new(request, Arc::clone(&provider), config);

    let pb = spinner(&format!("Resolving {root}"));
    let outcome = propagator.run().await;
    pb.finish_and_clear();
    tracing::debug!(
        "Metadata cache: {} hit(s), {} miss(es)",
        provider.hits(),
        provider.misses()
    );

    match outcome {
        Ok(graph) => {
            for platform in graph.platforms() {
                status_info(
                    "Aligned",
                    &format!(
                        "{} to {} ({} member(s))",
                        platform.platform,
                        platform.version,
                        platform.members.len()
                    ),
                );
            }
            if !graph.conflicts().is_empty() {
                status_warn(
                    "Conflicts",
                    &format!("{} request(s) overridden", graph.conflicts().len()),
                );
            }
            status(
                "Resolved",
                &format!(
                    "{} module(s) in {} iteration(s)",
                    graph.len(),
                    graph.iterations()
                ),
            );
            Ok(graph)
        }
        Err(failure) => Err(miette::Report::new(failure)),
    }
}

/// Render the graph according to `opts`. `--why`, `--inverted` and
/// `--conflicts` take precedence over `--format`, in that order.
pub fn render(graph: &ResolvedGraph, opts: &ResolveOptions) -> miette::Result<String> {
    if let Some(target) = &opts.why {
        let Some(path) = graph.find_path(target) else {
            return Ok(format!("Module '{target}' not found in the graph.\n"));
        };
        let mut out = format!("Path to {target}:\n");
        for (i, node) in path.iter().enumerate() {
            out.push_str(&format!("{}{node}\n", "  ".repeat(i)));
        }
        return Ok(out);
    }

    if let Some(target) = &opts.inverted {
        let out = graph.print_inverted_tree(target);
        if out.is_empty() {
            return Ok(format!("Module '{target}' not found in the graph.\n"));
        }
        return Ok(out);
    }

    if opts.conflicts {
        return Ok(if graph.conflicts().is_empty() {
            "No version conflicts.\n".to_string()
        } else {
            graph.conflicts().to_string()
        });
    }

    match opts.format {
        OutputFormat::Tree => Ok(graph.print_tree(opts.depth)),
        OutputFormat::List => {
            let mut out = String::new();
            for m in graph.modules() {
                out.push_str(&format!("{} ({})\n", m.coordinates(), m.reason));
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let json = graph.to_json().map_err(|e| PlatoonError::Generic {
                message: format!("Failed to serialize resolution: {e}"),
            })?;
            Ok(format!("{json}\n"))
        }
    }
}
