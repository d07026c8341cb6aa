use anyhow::Result;
use clap::Parser;

use bulletin_server::{cli::Cli, run_with_cli};

#[tokio::main]
async fn main() -> Result<()> {
    run_with_cli(Cli::parse()).await
}
