use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sitedir")]
#[command(about = "Inspect and manage the hostname → site directory")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (overrides SITEDIR_CONFIG); goes before the subcommand
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a hostname to its site
    Resolve(ResolveArgs),
    /// List every site in the directory
    List,
    /// Create a site with its default storage profile
    Create(CreateArgs),
    /// Patch a site
    Update(UpdateArgs),
    /// Delete a site and its storage profile
    Delete(DeleteArgs),
    /// Show directory health
    Health,
}

#[derive(clap::Args)]
pub struct ResolveArgs {
    /// Request hostname, matched exactly
    pub hostname: String,
    /// Reload from the repository before resolving
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct CreateArgs {
    /// Hostname, or `*` for the catch-all site
    pub hostname: String,
    /// JSON object merged over the default site configuration
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(clap::Args)]
pub struct UpdateArgs {
    /// Site id
    pub id: String,
    #[arg(long)]
    pub hostname: Option<String>,
    #[arg(long)]
    pub enabled: Option<bool>,
    /// JSON object; replaces the stored configuration (merged over defaults)
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(clap::Args)]
pub struct DeleteArgs {
    /// Site id
    pub id: String,
}
