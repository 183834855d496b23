use clap::Parser;
use mydan_scripts::{cli::Cli, errors::DeployError};

#[tokio::main]
async fn main() -> Result<(), DeployError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    cli.run().await
}
