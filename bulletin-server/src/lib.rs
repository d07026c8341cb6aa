//! Library entrypoint for the `bulletin` binary, so the router can be driven
//! in-process by tests without binding a socket.

pub mod build;
pub mod cli;
pub mod server;

use anyhow::{Context, Result};
use bulletin_core::{source_from_config, Config};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::server::SiteSettings;

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Run a subcommand using CLI args (parsed by the caller).
pub async fn run_with_cli(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose)?;

    let mut config = Config::discover(cli.config.as_deref()).context("failed to load config")?;
    config.apply_overrides(cli.overrides());

    match cli.command {
        Command::Check => check(&config),
        Command::Build { output } => {
            let site = SiteSettings::from_config(&config).context("invalid configuration")?;
            let source = source_from_config(&config).context("invalid content source")?;
            let summary = build::build_files(&site, source.as_ref(), &output, Utc::now()).await?;
            for file in &summary.files {
                println!("wrote {}", file.display());
            }
            println!("{} sitemap URLs", summary.sitemap_urls);
            if let Some(entries) = summary.news_entries {
                println!("{entries} news entries");
            }
            Ok(())
        }
        Command::Serve { .. } => {
            let source = source_from_config(&config).context("invalid content source")?;
            server::serve(&config, source).await
        }
    }
}

fn check(config: &Config) -> Result<()> {
    let site = SiteSettings::from_config(config).context("invalid configuration")?;
    let source = config.get("source.kind").unwrap_or_default();

    println!("site:      {}", site.base);
    println!("source:    {source}");
    println!("sitemap:   {}", site.base.join("/sitemap.xml"));
    if site.news.enable {
        println!("news:      {}", site.base.join("/news-sitemap.xml"));
    }
    println!("robots:    {}", site.base.join("/robots.txt"));
    println!("static:    {} pages", site.static_pages.len());
    Ok(())
}
