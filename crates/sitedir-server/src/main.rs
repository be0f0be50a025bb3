mod cli;
mod output;

use std::env;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use sitedir_core::{Hostname, SiteConfig, SiteId, SitePatch};
use sitedir_server::config::loader::load_config;
use sitedir_server::observability::{apply_logging_level, init_tracing};
use sitedir_server::{AppBuilder, SiteDirectoryApp};

use cli::{Cli, Commands};
use output::print_error;

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From SITEDIR_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (sitedir.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (SITEDIR_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    init_tracing();

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let (config_path, source) = resolve_config_path(cli.config.as_deref());
    let cfg = load_config(Some(&config_path))
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;

    tracing::info!(path = %config_path, source = %source, "Configuration loaded");
    apply_logging_level(&cfg.logging.level);

    let app = AppBuilder::new().with_config(cfg).build().await?;
    let result = execute(&app, cli.command).await;
    app.shutdown().await;
    result
}

async fn execute(app: &SiteDirectoryApp, command: Commands) -> Result<()> {
    match command {
        Commands::Resolve(args) => {
            let resolution = app.directory().resolve(&args.hostname, args.force).await?;
            output::print_resolution(&args.hostname, &resolution)?;
        }
        Commands::List => {
            let snapshot = app
                .directory()
                .snapshot()
                .context("site directory is not loaded")?;
            let sites = snapshot.sites();
            output::print_sites_table(sites.iter().map(|s| s.as_ref()));
        }
        Commands::Create(args) => {
            let config = args.config.as_deref().map(parse_json).transpose()?;
            let site = app.lifecycle().create_site(&args.hostname, config).await?;
            output::print_success(&format!("Created site {}", site.id));
            output::print_site(&site)?;
        }
        Commands::Update(args) => {
            let id = SiteId::parse(args.id)?;
            let mut patch = SitePatch::new();
            if let Some(hostname) = args.hostname {
                patch = patch.with_hostname(Hostname::new(hostname)?);
            }
            if let Some(enabled) = args.enabled {
                patch = patch.with_enabled(enabled);
            }
            if let Some(raw) = args.config.as_deref() {
                patch = patch.with_config(SiteConfig::from_overrides(Some(parse_json(raw)?))?);
            }
            let affected = app.lifecycle().update_site(&id, patch).await?;
            output::print_success(&format!("Updated {affected} site(s)"));
        }
        Commands::Delete(args) => {
            let id = SiteId::parse(args.id)?;
            let affected = app.lifecycle().delete_site(&id).await?;
            output::print_success(&format!("Deleted {affected} site(s)"));
        }
        Commands::Health => {
            output::print_health(&app.directory().health());
        }
    }
    Ok(())
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("--config is not valid JSON")
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: SITEDIR_CONFIG
/// 3. Default: sitedir.toml
fn resolve_config_path(cli_path: Option<&str>) -> (String, ConfigSource) {
    if let Some(path) = cli_path {
        return (path.to_string(), ConfigSource::CliArgument);
    }

    if let Ok(path) = env::var("SITEDIR_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    (
        sitedir_server::config::loader::DEFAULT_CONFIG_PATH.to_string(),
        ConfigSource::Default,
    )
}
