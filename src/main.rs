//! CLI entry point for sharekeeper.

use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use sharekeeper_core::{
    Config, Database, LinkService, LinkStatus, MaintenanceEngine, Scheduler, SqliteLinkStore,
    build_default_resolver,
};
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command, RunArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if loaded.loaded_from_file
        && let Some(path) = &loaded.path
    {
        debug!(path = %path.display(), "configuration loaded");
    }
    let mut config = loaded.config;

    if let Command::Resolve { url, json } = &args.command {
        return resolve_once(&config, url, *json).await;
    }

    let db_path = args.db.clone().unwrap_or_else(|| config.database_path());
    let service = open_service(&mut config, &db_path, run_overrides(&args.command)).await?;

    match args.command {
        Command::Add { urls } => add(&service, urls).await,
        Command::Remove { url } => {
            service
                .delete_link(&url)
                .await
                .with_context(|| format!("Failed to remove '{url}'"))?;
            info!(url = %url, "link removed");
            Ok(())
        }
        Command::List { json } => list(&service, json).await,
        Command::Run(_) => {
            let stats = service
                .engine()
                .run_once()
                .await
                .context("Maintenance run failed")?;
            println!(
                "checked {} links: {} active, {} failed",
                stats.total(),
                stats.active(),
                stats.failed()
            );
            Ok(())
        }
        Command::Serve {
            interval_secs,
            run_now,
            ..
        } => {
            let interval = interval_secs
                .map_or_else(|| config.schedule_interval(), std::time::Duration::from_secs);
            if run_now {
                service.trigger_maintenance_async();
            }
            let scheduler = Scheduler::new(service.engine().clone(), interval).spawn();

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            info!("shutting down scheduler");
            scheduler.abort();
            Ok(())
        }
        Command::Resolve { .. } => Ok(()),
    }
}

fn run_overrides(command: &Command) -> Option<&RunArgs> {
    match command {
        Command::Run(run) | Command::Serve { run, .. } => Some(run),
        _ => None,
    }
}

async fn open_service(
    config: &mut Config,
    db_path: &Path,
    overrides: Option<&RunArgs>,
) -> Result<LinkService> {
    if let Some(overrides) = overrides {
        if let Some(batch_size) = overrides.batch_size {
            config.maintenance.batch_size = usize::from(batch_size);
        }
        if let Some(max_attempts) = overrides.max_attempts {
            config.maintenance.max_attempts = max_attempts;
        }
        config.validate().context("Invalid command-line overrides")?;
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }

    let db = Database::new(db_path)
        .await
        .with_context(|| format!("Failed to open database '{}'", db_path.display()))?;
    let store = Arc::new(SqliteLinkStore::new(db));

    let resolver = build_default_resolver(&config.resolver_http_settings(), config.resolve_deadline())
        .context("Failed to build resolver")?;
    let engine = MaintenanceEngine::new(store.clone(), Arc::new(resolver), config.maintenance_settings())
        .context("Invalid maintenance settings")?;

    Ok(LinkService::new(store, engine))
}

async fn add(service: &LinkService, urls: Vec<String>) -> Result<()> {
    let urls = if !urls.is_empty() {
        urls
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer.lines().map(str::to_string).collect()
    } else {
        info!("No input provided. Pipe URLs via stdin or pass as arguments.");
        info!("Example: echo 'https://share.example/s/abc' | sharekeeper add");
        return Ok(());
    };

    let summary = service.add_links(&urls).await.context("Failed to add links")?;

    for invalid in &summary.invalid {
        warn!(input = %invalid, "Skipped input that is not an http(s) URL");
    }
    println!(
        "added {}, already present {}, invalid {}",
        summary.added.len(),
        summary.existing.len(),
        summary.invalid.len()
    );
    Ok(())
}

async fn list(service: &LinkService, json: bool) -> Result<()> {
    let snapshot = service.list_links().await.context("Failed to list links")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    for link in &snapshot.links {
        let checked = link
            .last_check
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
        match (&link.status, &link.error) {
            (LinkStatus::Failed, Some(error)) => {
                println!(
                    "{:<8} {}  (checked {checked}) {error}",
                    link.status.as_str(),
                    link.url
                );
            }
            _ => println!("{:<8} {}  (checked {checked})", link.status.as_str(), link.url),
        }
    }
    println!("{} links, {} active", snapshot.links.len(), snapshot.active_count);
    Ok(())
}

async fn resolve_once(config: &Config, url: &str, json: bool) -> Result<()> {
    let resolver = build_default_resolver(&config.resolver_http_settings(), config.resolve_deadline())
        .context("Failed to build resolver")?;

    match resolver.resolve(url).await {
        Ok(resolved) => {
            if json {
                let value = serde_json::json!({
                    "share_url": url,
                    "direct_url": resolved.url,
                    "status": resolved.status,
                    "strategy": resolved.strategy,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", resolved.url);
            }
            Ok(())
        }
        Err(error) => bail!("{error}"),
    }
}
