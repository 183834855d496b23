//! Deployment of a standalone component

use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::info;

use crate::{
    context::ExecutionContext,
    encoder::encode_constructor,
    errors::DeployError,
    ledger::ComponentRecord,
    target::Confirmation,
};

use super::{resolve_args, CallArg, Step, StepOutcome};

/// Deploys an artifact under a component name, unless the ledger already has it
pub struct DeployStep {
    /// The ledger key of the component
    component: String,
    /// The artifact to deploy
    artifact: String,
    /// The constructor arguments
    args: Vec<CallArg>,
}

impl DeployStep {
    /// Deploy `artifact` as `component`, with no constructor arguments
    pub fn new(component: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            artifact: artifact.into(),
            args: Vec::new(),
        }
    }

    /// Set the constructor arguments
    pub fn with_args(mut self, args: Vec<CallArg>) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
impl Step for DeployStep {
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome, DeployError> {
        let forced = ctx.is_forced(&self.component);
        let resolved =
            resolve_or_deploy(ctx, &self.component, &self.artifact, &self.args, forced).await?;

        if !resolved.fresh {
            return Ok(StepOutcome::Reused(resolved.record));
        }

        ctx.ledger_mut().put(resolved.record.clone())?;
        Ok(StepOutcome::Deployed(resolved.record))
    }
}

/// A component record together with whether it was just deployed
pub(crate) struct Resolved {
    /// The record to use
    pub record: ComponentRecord,
    /// Whether the record is new and not yet in the ledger
    pub fresh: bool,
}

/// Return the recorded instance of `name`, or deploy `artifact` if there is
/// none or `forced` is set.
///
/// A fresh record is returned without being written, so that callers can
/// withhold it until the rest of their work has succeeded.
pub(crate) async fn resolve_or_deploy(
    ctx: &ExecutionContext,
    name: &str,
    artifact: &str,
    args: &[CallArg],
    forced: bool,
) -> Result<Resolved, DeployError> {
    if !forced {
        if let Some(record) = ctx.ledger().get(name)? {
            info!("Reusing `{}` at {:#x}", name, record.address);
            return Ok(Resolved {
                record,
                fresh: false,
            });
        }
    }

    let artifact = ctx.artifacts().get(artifact)?;
    let params = artifact
        .abi
        .constructor
        .as_ref()
        .map(|constructor| constructor.inputs.as_slice())
        .unwrap_or_default();
    let values = resolve_args(ctx.ledger(), params, args)?;
    let constructor_args = encode_constructor(&artifact.abi, &values)?;

    info!(
        "Deploying `{}` from {}",
        name,
        artifact.fully_qualified_name()
    );
    let confirmation = ctx
        .target()
        .deploy(artifact, constructor_args.clone())
        .await?;
    let address = created_address(name, &confirmation)?;
    info!(
        "Deployed `{}` at {:#x} (tx {:#x})",
        name, address, confirmation.tx_hash
    );

    Ok(Resolved {
        record: ComponentRecord {
            name: name.to_string(),
            address,
            abi: artifact.abi.clone(),
            constructor_args,
            transaction_hash: Some(confirmation.tx_hash),
            implementation: None,
            artifact: Some(artifact.fully_qualified_name()),
        },
        fresh: true,
    })
}

/// The address a confirmed deployment created
pub(crate) fn created_address(
    name: &str,
    confirmation: &Confirmation,
) -> Result<Address, DeployError> {
    confirmation.contract_address.ok_or_else(|| {
        DeployError::ExecutionReverted(format!(
            "deployment of `{name}` in {:#x} created no contract",
            confirmation.tx_hash
        ))
    })
}
