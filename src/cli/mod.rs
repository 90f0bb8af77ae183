//! # Command Line Interface
//!
//! Inspect access scopes and decisions against a fleet fixture: compute the
//! effective access scope of a rule set, check one operation for a
//! principal, render the search filter a principal would get, or list the
//! known resources.

pub mod fixture;
pub mod output;

use crate::config::SacConfig;
use crate::domain::{list_resources, resource_by_name, Access, ResourceWithAccess};
use crate::observability::SacMetrics;
use crate::sac::authorizer::Directories;
use crate::sac::effective_access_scope::{compute_effective_access_scope, Detail};
use crate::sac::query_filter::build_sac_query_filter;
use crate::sac::scope_checker::for_principal;
use crate::sac::scope_key::keys_for;
use anyhow::Context;
use clap::{Parser, Subcommand};
use fixture::Fixture;
use output::{print_json, print_output, print_table_header, print_yaml, truncate, OutputFormat};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "fleetscope")]
#[command(about = "Fleetscope scoped access control tooling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the effective access scope of the fixture's rules
    Eas {
        /// Fixture with clusters, namespaces and rules
        fixture: PathBuf,

        /// Attribute detail of the computed tree
        #[arg(long)]
        detail: Option<Detail>,

        /// Print the full tree instead of the compacted form
        #[arg(long)]
        tree: bool,
    },

    /// Check one operation for a principal
    Check {
        /// Fixture with clusters, namespaces and roles
        fixture: PathBuf,

        #[arg(long)]
        principal: String,

        /// READ or READ_WRITE
        #[arg(long, default_value = "READ")]
        access: Access,

        /// Resource name, e.g. Deployment
        #[arg(long)]
        resource: String,

        /// Cluster id
        #[arg(long)]
        cluster: Option<String>,

        /// Namespace name, requires --cluster
        #[arg(long, requires = "cluster")]
        namespace: Option<String>,
    },

    /// Render the search filter for a principal and resource
    Filter {
        /// Fixture with clusters, namespaces and roles
        fixture: PathBuf,

        #[arg(long)]
        principal: String,

        #[arg(long, default_value = "READ")]
        access: Access,

        #[arg(long)]
        resource: String,

        /// Mark matched fields for highlighting
        #[arg(long)]
        highlight: bool,
    },

    /// List known resources and their scope
    Resources,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    initialise_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => SacConfig::load(Some(path.as_path()))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => SacConfig::from_env(),
    };

    match cli.command {
        Commands::Eas { fixture, detail, tree } => {
            handle_eas(&fixture, detail.unwrap_or(config.detail), tree, cli.output)?
        }
        Commands::Check { fixture, principal, access, resource, cluster, namespace } => {
            let request = CheckRequest { principal, access, resource, cluster, namespace };
            handle_check(&fixture, request, &config, cli.output).await?
        }
        Commands::Filter { fixture, principal, access, resource, highlight } => {
            handle_filter(&fixture, &principal, access, &resource, highlight, &config, cli.output)
                .await?
        }
        Commands::Resources => handle_resources(cli.output)?,
    }

    Ok(())
}

fn initialise_logging(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    if tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_env_filter(filter).with_writer(std::io::stderr).finish(),
    )
    .is_err()
    {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
    Ok(())
}

fn handle_eas(
    path: &std::path::Path,
    detail: Detail,
    full_tree: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let fixture = Fixture::load(path)?;
    let fleet = &fixture.directory.fleet;
    let tree =
        compute_effective_access_scope(fixture.rules.as_ref(), &fleet.clusters, &fleet.namespaces, detail)
            .context("Failed to compute effective access scope")?;

    match (full_tree, format) {
        (true, OutputFormat::Yaml) => print_yaml(&tree),
        (true, _) => print_json(&tree),
        (false, format) => print_output(&tree.compactify(), format),
    }
}

struct CheckRequest {
    principal: String,
    access: Access,
    resource: String,
    cluster: Option<String>,
    namespace: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckOutcome {
    principal: String,
    scope: String,
    allowed: bool,
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.allowed { "ALLOWED" } else { "DENIED" };
        write!(f, "{} for {} on {}", verdict, self.principal, self.scope)
    }
}

async fn session(
    path: &std::path::Path,
    principal: &str,
    config: &SacConfig,
) -> anyhow::Result<crate::sac::ScopeChecker> {
    let fixture = Fixture::load(path)?;
    let directories = Directories::from_static(fixture.directory);
    let checker = for_principal(&directories, principal, config, SacMetrics::disabled())
        .await
        .with_context(|| format!("Failed to bootstrap a session for {}", principal))?;
    Ok(checker)
}

async fn handle_check(
    path: &std::path::Path,
    request: CheckRequest,
    config: &SacConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let resource = resource_by_name(&request.resource)?;
    let checker = session(path, &request.principal, config).await?;

    let keys = keys_for(
        request.access,
        resource,
        request.cluster.as_deref(),
        request.namespace.as_deref(),
    );
    let allowed = checker.allowed_keys(&CancellationToken::new(), &keys).await?;

    let scope = keys.iter().map(ToString::to_string).collect::<Vec<_>>().join(" / ");
    print_output(&CheckOutcome { principal: request.principal, scope, allowed }, format)
}

#[derive(Debug, Serialize)]
struct FilterOutcome {
    resource: String,
    filter: Option<crate::sac::Query>,
}

impl fmt::Display for FilterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}", filter),
            None => write!(f, "<unfiltered>"),
        }
    }
}

async fn handle_filter(
    path: &std::path::Path,
    principal: &str,
    access: Access,
    resource: &str,
    highlight: bool,
    config: &SacConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let resource = resource_by_name(resource)?;
    let checker = session(path, principal, config).await?;
    let tree = checker.effective_access_scope(ResourceWithAccess::new(resource, access))?;
    let filter = build_sac_query_filter(Some(&tree), resource.scope, highlight)?;
    print_output(&FilterOutcome { resource: resource.to_string(), filter }, format)
}

#[derive(Debug, Serialize)]
struct ResourceRow {
    name: &'static str,
    scope: crate::domain::ResourceScope,
    replaced_by: Option<&'static str>,
}

fn handle_resources(format: OutputFormat) -> anyhow::Result<()> {
    let rows: Vec<ResourceRow> = list_resources()
        .into_iter()
        .map(|md| ResourceRow {
            name: md.resource,
            scope: md.scope,
            replaced_by: md.replacing.map(|r| r.resource),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Yaml => print_yaml(&rows),
        OutputFormat::Text => {
            print_table_header(&[("Resource", 24), ("Scope", 10), ("Replaced By", 24)]);
            for row in &rows {
                println!(
                    "{:<24} {:<10} {}",
                    truncate(row.name, 24),
                    format!("{:?}", row.scope),
                    row.replaced_by.unwrap_or("-")
                );
            }
            Ok(())
        }
    }
}
