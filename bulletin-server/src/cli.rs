use std::path::PathBuf;

use bulletin_core::Overrides;
use clap::{Parser, Subcommand};

/// CLI for the sitemap service. Every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bulletin",
    version,
    about = "Sitemap and crawler endpoints for The Bulletin Briefs"
)]
pub struct Cli {
    /// Path to bulletin.yml (defaults to ./bulletin.yml when present)
    #[arg(long, global = true, env = "BULLETIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Public site root used in every <loc>
    #[arg(long, global = true, env = "BULLETIN_SITE_URL")]
    pub site_url: Option<String>,

    /// Base URL of the hosted backend's table API
    #[arg(long, global = true, env = "VITE_SUPABASE_URL")]
    pub source_url: Option<String>,

    /// Service key for the table API
    #[arg(long, global = true, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub source_key: Option<String>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve sitemap.xml, news-sitemap.xml and robots.txt over HTTP
    Serve {
        /// Listen address (overrides server.listen_addr)
        #[arg(long, env = "BULLETIN_LISTEN_ADDR")]
        listen: Option<String>,
    },

    /// Fetch once and write the crawler files into a directory
    Build {
        /// Output directory
        #[arg(long, short, default_value = "dist")]
        output: PathBuf,
    },

    /// Validate configuration and print the resolved endpoints
    Check,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let listen_addr = match &self.command {
            Command::Serve { listen } => listen.clone(),
            _ => None,
        };
        Overrides {
            site_url: self.site_url.clone(),
            listen_addr,
            source_url: self.source_url.clone(),
            source_api_key: self.source_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_listen_flag_becomes_override() {
        let cli = Cli::try_parse_from([
            "bulletin",
            "serve",
            "--listen",
            "0.0.0.0:8080",
            "--site-url",
            "https://staging.example.com",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.listen_addr.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(overrides.site_url.as_deref(), Some("https://staging.example.com"));
    }

    #[test]
    fn build_defaults_to_dist() {
        let cli = Cli::try_parse_from(["bulletin", "build"]).unwrap();
        match cli.command {
            Command::Build { output } => assert_eq!(output, PathBuf::from("dist")),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
