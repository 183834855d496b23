//! The remote deployment target: a network that can create contract instances
//! and execute calls against them

use std::time::Duration;

use alloy::{
    network::TransactionBuilder,
    providers::{DynProvider, PendingTransactionError, Provider, WatchTxError},
    rpc::types::{TransactionReceipt, TransactionRequest},
    transports::{RpcError, TransportError},
};
use alloy_primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use tracing::debug;

use crate::{artifacts::Artifact, errors::DeployError};

/// Proof that a transaction was included on the target network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// The transaction hash, used to correlate log lines with the chain
    pub tx_hash: TxHash,
    /// The created contract, for deployments
    pub contract_address: Option<Address>,
    /// The block the transaction was included in
    pub block_number: Option<u64>,
}

/// A request/response interface for deploying and calling contracts.
///
/// Both operations resolve only once the transaction is confirmed.
#[async_trait]
pub trait DeploymentTarget: Send + Sync {
    /// Deploy a new instance of `artifact` with the given encoded constructor arguments
    async fn deploy(
        &self,
        artifact: &Artifact,
        constructor_args: Bytes,
    ) -> Result<Confirmation, DeployError>;

    /// Submit a call with the given payload to an existing instance
    async fn call(&self, to: Address, payload: Bytes) -> Result<Confirmation, DeployError>;
}

/// A [`DeploymentTarget`] backed by a JSON-RPC provider with a local signer
pub struct RpcTarget {
    /// The signing provider
    provider: DynProvider,
    /// A fixed gas price applied to every transaction, if the network needs one
    gas_price: Option<u128>,
    /// The number of confirmations to wait for
    confirmations: u64,
    /// How long to wait for those confirmations
    timeout: Duration,
}

impl RpcTarget {
    /// Wrap a signing provider
    pub fn new(
        provider: DynProvider,
        gas_price: Option<u128>,
        confirmations: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            gas_price,
            confirmations,
            timeout,
        }
    }

    /// Submit a transaction and wait for a successful receipt
    async fn send(&self, mut tx: TransactionRequest) -> Result<TransactionReceipt, DeployError> {
        if let Some(gas_price) = self.gas_price {
            tx.set_gas_price(gas_price);
        }

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(submission_error)?;
        let tx_hash = *pending.tx_hash();
        debug!("Submitted transaction {:#x}", tx_hash);

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .with_timeout(Some(self.timeout))
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                    DeployError::ConfirmationTimeout(format!(
                        "{tx_hash:#x} not confirmed after {}s",
                        self.timeout.as_secs()
                    ))
                }
                e => DeployError::ConfirmationTimeout(format!("{tx_hash:#x}: {e}")),
            })?;

        if !receipt.status() {
            return Err(DeployError::ExecutionReverted(format!(
                "transaction {tx_hash:#x} reverted"
            )));
        }

        Ok(receipt)
    }
}

/// Classify an error returned while submitting a transaction
fn submission_error(err: TransportError) -> DeployError {
    match err {
        // Gas estimation runs the call, so remote business-rule failures
        // surface here before anything is broadcast
        RpcError::ErrorResp(payload) if payload.message.to_lowercase().contains("revert") => {
            let data = payload
                .data
                .map(|data| format!(" (data = {})", data.get()))
                .unwrap_or_default();
            DeployError::ExecutionReverted(format!("{}{}", payload.message, data))
        }
        e => DeployError::SubmissionRejected(e.to_string()),
    }
}

/// Convert a receipt into a [`Confirmation`]
fn confirmation(receipt: &TransactionReceipt) -> Confirmation {
    Confirmation {
        tx_hash: receipt.transaction_hash,
        contract_address: receipt.contract_address,
        block_number: receipt.block_number,
    }
}

#[async_trait]
impl DeploymentTarget for RpcTarget {
    async fn deploy(
        &self,
        artifact: &Artifact,
        constructor_args: Bytes,
    ) -> Result<Confirmation, DeployError> {
        let code = artifact.creation_code(&constructor_args)?;
        let receipt = self
            .send(TransactionRequest::default().with_deploy_code(code))
            .await?;

        if receipt.contract_address.is_none() {
            return Err(DeployError::ExecutionReverted(format!(
                "deployment of `{}` created no contract",
                artifact.contract_name
            )));
        }

        Ok(confirmation(&receipt))
    }

    async fn call(&self, to: Address, payload: Bytes) -> Result<Confirmation, DeployError> {
        let receipt = self
            .send(TransactionRequest::default().with_to(to).with_input(payload))
            .await?;

        Ok(confirmation(&receipt))
    }
}
