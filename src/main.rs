use anyhow::Result;
use cert_renewer::cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cert_renewer::bootstrap::run(cli).await
}
