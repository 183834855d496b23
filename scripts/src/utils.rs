//! Utilities for the deploy scripts.

use std::{path::Path, str::FromStr, sync::Arc, time::Duration};

use alloy::{
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use alloy_primitives::{hex, Address, Bytes};
use tracing::info;

use crate::{
    artifacts::ArtifactRegistry,
    context::ExecutionContext,
    errors::DeployError,
    ledger::FileLedger,
    networks::NetworkConfig,
    target::RpcTarget,
};

/// Sets up a signing client against `rpc_url`, returning it along with the
/// signer's address
pub fn setup_client(priv_key: &str, rpc_url: &str) -> Result<(DynProvider, Address), DeployError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| DeployError::ClientInitialization(e.to_string()))?;
    let deployer = signer.address();

    let url = rpc_url
        .parse()
        .map_err(|e| DeployError::ClientInitialization(format!("invalid RPC URL: {e}")))?;
    let provider = ProviderBuilder::new().wallet(signer).connect_http(url);

    Ok((DynProvider::new(provider), deployer))
}

/// Connection and storage settings of a run
pub struct ContextConfig<'a> {
    /// The target network
    pub network: NetworkConfig,
    /// The deployer's private key
    pub priv_key: &'a str,
    /// The RPC URL, overriding the network's default
    pub rpc_url: Option<&'a str>,
    /// The root of the deployments ledger
    pub deployments_dir: &'a Path,
    /// The root of the compiled artifacts
    pub artifacts_dir: &'a Path,
    /// How long to wait for each confirmation
    pub confirmation_timeout: Duration,
    /// The number of confirmations to wait for
    pub confirmations: u64,
}

/// Connect to the network and open its ledger and artifacts.
///
/// Fails if the endpoint serves a different chain than the network preset.
pub async fn build_context(config: ContextConfig<'_>) -> Result<ExecutionContext, DeployError> {
    let rpc_url = config
        .rpc_url
        .map(String::from)
        .or_else(|| config.network.default_rpc_url.clone())
        .ok_or_else(|| {
            DeployError::Config(format!(
                "no RPC URL given and network {} has no default",
                config.network.name
            ))
        })?;

    let (provider, deployer) = setup_client(config.priv_key, &rpc_url)?;
    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| DeployError::ClientInitialization(e.to_string()))?;
    if chain_id != config.network.chain_id {
        return Err(DeployError::Config(format!(
            "{} serves chain {}, but network {} is chain {}",
            rpc_url, chain_id, config.network.name, config.network.chain_id
        )));
    }
    info!(
        "Connected to {} (chain {}) as {:#x}",
        config.network.name, chain_id, deployer
    );

    let ledger = FileLedger::open(config.deployments_dir, &config.network.name, chain_id)?;
    let artifacts = ArtifactRegistry::load_dir(config.artifacts_dir)?;
    let target = RpcTarget::new(
        provider,
        config.network.gas_price,
        config.confirmations,
        config.confirmation_timeout,
    );

    Ok(ExecutionContext::new(
        config.network,
        deployer,
        Box::new(ledger),
        Arc::new(target),
        artifacts,
    ))
}

/// Parse optional hex calldata, defaulting to empty
pub fn parse_calldata(calldata: Option<&str>) -> Result<Bytes, DeployError> {
    match calldata {
        Some(calldata) => hex::decode(calldata)
            .map(Bytes::from)
            .map_err(|e| DeployError::Config(format!("invalid calldata: {e}"))),
        None => Ok(Bytes::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_calldata() {
        assert_eq!(parse_calldata(None).unwrap(), Bytes::new());
        assert_eq!(
            parse_calldata(Some("0x8129fc1c")).unwrap(),
            Bytes::from(vec![0x81, 0x29, 0xfc, 0x1c])
        );
        assert!(matches!(parse_calldata(Some("0xzz")), Err(DeployError::Config(_))));
    }

    #[test]
    fn test_setup_client_rejects_bad_key() {
        let res = setup_client("not a key", "http://127.0.0.1:8545");
        assert!(matches!(res, Err(DeployError::ClientInitialization(_))));
    }
}
