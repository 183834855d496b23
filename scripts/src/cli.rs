//! Definitions of CLI arguments and commands for the deploy scripts

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{deploy, show_ledger, upgrade},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_DEPLOYMENTS_DIR,
        DEFAULT_NUM_CONFIRMATIONS,
    },
    errors::DeployError,
    ledger::FileLedger,
    networks::Network,
    utils::{build_context, ContextConfig},
};

/// Deploy and configure the MyDan contracts
#[derive(Parser)]
pub struct Cli {
    /// The network to deploy to
    #[arg(short, long, default_value = "hardhat")]
    pub network: Network,

    /// Network RPC URL, defaulting to the network's public endpoint
    #[arg(short, long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Private key of the deployer, needed by every command but `ledger`
    #[arg(short, long = "pkey", env = "PKEY", hide_env_values = true)]
    pub priv_key: Option<String>,

    /// The root of the deployments ledger
    #[arg(long, default_value = DEFAULT_DEPLOYMENTS_DIR)]
    pub deployments_dir: PathBuf,

    /// The root of the compiled artifacts
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// Seconds to wait for each transaction to be confirmed
    #[arg(long, default_value_t = DEFAULT_CONFIRMATION_TIMEOUT_SECS)]
    pub confirmation_timeout: u64,

    /// The number of confirmations to wait for
    #[arg(long, default_value_t = DEFAULT_NUM_CONFIRMATIONS)]
    pub confirmations: u64,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Run the command, connecting to the network unless it only reads
    /// the ledger
    pub async fn run(self) -> Result<(), DeployError> {
        let network = self.network.config();
        if let Command::Ledger = self.command {
            let ledger = FileLedger::open(&self.deployments_dir, &network.name, network.chain_id)?;
            return show_ledger(&ledger, &network.name);
        }

        let priv_key = self.priv_key.as_deref().ok_or_else(|| {
            DeployError::Config("no deployer key given, set --pkey or PKEY".to_string())
        })?;
        let ctx = build_context(ContextConfig {
            network,
            priv_key,
            rpc_url: self.rpc_url.as_deref(),
            deployments_dir: &self.deployments_dir,
            artifacts_dir: &self.artifacts_dir,
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout),
            confirmations: self.confirmations,
        })
        .await?;

        match self.command {
            Command::Deploy(args) => deploy(args, ctx).await,
            Command::Upgrade(args) => upgrade(args, ctx).await,
            Command::Ledger => show_ledger(ctx.ledger(), &ctx.network().name),
        }
    }
}

/// The available commands
#[derive(Subcommand)]
pub enum Command {
    /// Run the deployment pipeline
    Deploy(DeployArgs),
    /// Point a proxy at its current implementation
    Upgrade(UpgradeArgs),
    /// Print the network's deployments ledger
    Ledger,
}

/// Run the deployment pipeline, or the part of it selected by tags
#[derive(Args)]
pub struct DeployArgs {
    /// Only run steps with these tags, and their dependencies
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Redeploy the named component even if it is recorded
    #[arg(short, long = "force")]
    pub force: Vec<String>,

    /// Redeploy every component
    #[arg(long, conflicts_with = "force")]
    pub force_all: bool,

    /// A JSON file of setup parameters, replacing the defaults
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// The Etherscan-compatible explorer API key used for verification
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    pub etherscan_api_key: Option<String>,
}

/// Point the proxy of a component at the implementation recorded for it
#[derive(Args)]
pub struct UpgradeArgs {
    /// The public name of the proxied component
    #[arg(short, long)]
    pub component: String,

    /// Optional calldata, in hex form, with which to
    /// call the implementation contract when upgrading
    #[arg(long)]
    pub calldata: Option<String>,
}
