use colored::Colorize;
use sitedir_core::Site;
use sitedir_server::{DirectoryHealth, HealthStatus, Resolution};
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_site(site: &Site) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(site)?);
    Ok(())
}

pub fn print_resolution(hostname: &str, resolution: &Resolution) -> anyhow::Result<()> {
    match resolution {
        Resolution::Exact(site) => {
            println!("{} {} → {}", "Exact:".cyan(), hostname, site.id);
            print_site(site)
        }
        Resolution::Wildcard(site) => {
            println!("{} {} → {} (*)", "Wildcard:".yellow(), hostname, site.id);
            print_site(site)
        }
        Resolution::NoTenant => {
            println!("{} no tenant for {hostname}", "NoTenant:".red());
            Ok(())
        }
    }
}

pub fn print_sites_table<'a>(sites: impl IntoIterator<Item = &'a Site>) {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Hostname", "Enabled", "Title"]);
    let mut count = 0usize;
    for site in sites {
        builder.push_record([
            site.id.to_string(),
            site.hostname.to_string(),
            site.is_enabled.to_string(),
            site.config.title.clone(),
        ]);
        count += 1;
    }
    if count == 0 {
        println!("No sites found.");
        return;
    }
    let table = builder.build().with(Style::rounded()).to_string();
    println!("{table}");
    println!("Total: {count}");
}

pub fn print_health(health: &DirectoryHealth) {
    let status = match health.status {
        HealthStatus::Ready => health.status.to_string().green(),
        HealthStatus::Degraded => health.status.to_string().yellow(),
        HealthStatus::Unavailable => health.status.to_string().red(),
    };

    let mut builder = Builder::default();
    builder.push_record(["Status".to_string(), status.to_string()]);
    builder.push_record(["Version".to_string(), health.version.to_string()]);
    builder.push_record(["Sites".to_string(), health.site_count.to_string()]);
    builder.push_record([
        "Loaded at".to_string(),
        health
            .loaded_at
            .map_or_else(|| "-".to_string(), |t| t.to_string()),
    ]);
    builder.push_record([
        "Last error".to_string(),
        health.last_error.clone().unwrap_or_else(|| "-".to_string()),
    ]);
    println!("{}", builder.build().with(Style::rounded()));
}
