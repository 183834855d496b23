//! The state shared by every step of a single run

use std::{collections::BTreeSet, sync::Arc};

use alloy_primitives::{Address, TxHash};

use crate::{
    artifacts::ArtifactRegistry, ledger::DeploymentLedger, networks::NetworkConfig,
    target::DeploymentTarget,
};

/// Which components to redeploy even when the ledger already has them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Redeploy {
    /// Reuse every recorded component
    #[default]
    Never,
    /// Redeploy every component
    All,
    /// Redeploy the named components only
    Only(BTreeSet<String>),
}

/// The outcome of one configuration call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    /// The component called
    pub component: String,
    /// The function called
    pub function: String,
    /// Whether the call was confirmed successfully
    pub success: bool,
    /// The transaction hash, when the call got as far as the network
    pub tx_hash: Option<TxHash>,
    /// Why the call failed
    pub error: Option<String>,
}

/// The run-wide context handed to each step.
///
/// Built once at the start of a run; only what the steps write to the
/// ledger outlives it.
pub struct ExecutionContext {
    /// The target network
    network: NetworkConfig,
    /// The account signing every transaction
    deployer: Address,
    /// The network's deployments ledger
    ledger: Box<dyn DeploymentLedger>,
    /// The network itself
    target: Arc<dyn DeploymentTarget>,
    /// The compiled contracts available for deployment
    artifacts: ArtifactRegistry,
    /// The redeploy policy
    redeploy: Redeploy,
    /// Every configuration call issued in this run, in order
    transactions: Vec<TxResult>,
}

impl ExecutionContext {
    /// Build the context of a run
    pub fn new(
        network: NetworkConfig,
        deployer: Address,
        ledger: Box<dyn DeploymentLedger>,
        target: Arc<dyn DeploymentTarget>,
        artifacts: ArtifactRegistry,
    ) -> Self {
        Self {
            network,
            deployer,
            ledger,
            target,
            artifacts,
            redeploy: Redeploy::Never,
            transactions: Vec::new(),
        }
    }

    /// Set the redeploy policy
    pub fn with_redeploy(mut self, redeploy: Redeploy) -> Self {
        self.redeploy = redeploy;
        self
    }

    /// The target network
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// The account signing every transaction
    pub fn deployer(&self) -> Address {
        self.deployer
    }

    /// The deployments ledger
    pub fn ledger(&self) -> &dyn DeploymentLedger {
        self.ledger.as_ref()
    }

    /// The deployments ledger, for writing
    pub fn ledger_mut(&mut self) -> &mut dyn DeploymentLedger {
        self.ledger.as_mut()
    }

    /// The deployment target
    pub fn target(&self) -> &dyn DeploymentTarget {
        self.target.as_ref()
    }

    /// The available artifacts
    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    /// Whether `name` must be redeployed regardless of the ledger
    pub fn is_forced(&self, name: &str) -> bool {
        match &self.redeploy {
            Redeploy::Never => false,
            Redeploy::All => true,
            Redeploy::Only(names) => names.contains(name),
        }
    }

    /// Append a configuration call outcome to the run's log
    pub fn record_transaction(&mut self, result: TxResult) {
        self.transactions.push(result);
    }

    /// Every configuration call issued so far
    pub fn transactions(&self) -> &[TxResult] {
        &self.transactions
    }
}
