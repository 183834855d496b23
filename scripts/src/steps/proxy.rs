//! Provisioning of a component behind an upgradeable proxy.
//!
//! The logic instance is recorded as `<Name>_Implementation`, while the
//! public name maps to the proxy, carrying the logic's schema. Callers only
//! ever address the proxy, so a new logic instance can be swapped in later
//! without moving the public address.

use alloy::{dyn_abi::DynSolValue, json_abi::JsonAbi};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    constants::{IMPLEMENTATION_SUFFIX, UPGRADE_FUNCTION},
    context::{ExecutionContext, TxResult},
    encoder::{encode_call, encode_constructor, select_function},
    errors::DeployError,
    ledger::ComponentRecord,
};

use super::{
    deploy::{created_address, resolve_or_deploy},
    resolve_args, CallArg, Step, StepOutcome,
};

/// The ledger key of the logic instance behind the proxy published as `public_name`
pub fn implementation_name(public_name: &str) -> String {
    format!("{public_name}{IMPLEMENTATION_SUFFIX}")
}

/// Deploys a logic instance and a proxy initialized against it
pub struct ProxyStep {
    /// The public name callers use, mapped to the proxy
    public_name: String,
    /// The logic artifact
    logic_artifact: String,
    /// The proxy artifact, constructed with `(address logic, bytes data)`
    proxy_artifact: String,
    /// The logic's initializer, run by the proxy on construction
    init_function: String,
    /// The initializer arguments
    init_args: Vec<CallArg>,
}

impl ProxyStep {
    /// Publish `logic_artifact` behind `proxy_artifact` as `public_name`
    pub fn new(
        public_name: impl Into<String>,
        logic_artifact: impl Into<String>,
        proxy_artifact: impl Into<String>,
    ) -> Self {
        Self {
            public_name: public_name.into(),
            logic_artifact: logic_artifact.into(),
            proxy_artifact: proxy_artifact.into(),
            init_function: String::new(),
            init_args: Vec::new(),
        }
    }

    /// Set the initializer the proxy calls on construction
    pub fn initializer(mut self, function: impl Into<String>, args: Vec<CallArg>) -> Self {
        self.init_function = function.into();
        self.init_args = args;
        self
    }

    /// The schema the initializer is encoded against: the recorded logic's,
    /// unless the logic is about to be redeployed from its artifact
    fn logic_schema(
        &self,
        ctx: &ExecutionContext,
        logic_name: &str,
        logic_forced: bool,
    ) -> Result<JsonAbi, DeployError> {
        if !logic_forced {
            if let Some(record) = ctx.ledger().get(logic_name)? {
                return Ok(record.abi);
            }
        }

        Ok(ctx.artifacts().get(&self.logic_artifact)?.abi.clone())
    }

    /// Build the proxy's initialization payload against the logic schema
    fn init_payload(&self, ctx: &ExecutionContext, schema: &JsonAbi) -> Result<Bytes, DeployError> {
        let function = select_function(schema, &self.init_function, self.init_args.len())?;
        let values = resolve_args(ctx.ledger(), &function.inputs, &self.init_args)?;
        encode_call(schema, &self.init_function, &values)
    }
}

/// The proxy constructor arguments `(logic, payload)`
fn proxy_constructor_args(
    proxy_abi: &JsonAbi,
    logic: Address,
    payload: &Bytes,
) -> Result<Bytes, DeployError> {
    encode_constructor(
        proxy_abi,
        &[DynSolValue::Address(logic), DynSolValue::Bytes(payload.to_vec())],
    )
}

#[async_trait]
impl Step for ProxyStep {
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome, DeployError> {
        let logic_name = implementation_name(&self.public_name);
        let proxy_forced = ctx.is_forced(&self.public_name);
        let logic_forced = proxy_forced || ctx.is_forced(&logic_name);

        let existing = if proxy_forced {
            None
        } else {
            ctx.ledger().get(&self.public_name)?
        };

        if let Some(proxy) = existing {
            let logic =
                resolve_or_deploy(ctx, &logic_name, &self.logic_artifact, &[], logic_forced)
                    .await?;
            if logic.fresh {
                ctx.ledger_mut().put(logic.record.clone())?;
            }
            if proxy.implementation != Some(logic.record.address) {
                warn!(
                    "`{}` proxy at {:#x} does not point at the current implementation {:#x}, \
                     run `upgrade` to switch",
                    self.public_name, proxy.address, logic.record.address
                );
            }

            info!("Reusing `{}` proxy at {:#x}", self.public_name, proxy.address);
            return Ok(StepOutcome::Reused(proxy));
        }

        // Everything that can fail locally is checked before the logic is deployed
        let schema = self.logic_schema(ctx, &logic_name, logic_forced)?;
        let payload = self.init_payload(ctx, &schema)?;
        let proxy_artifact = ctx.artifacts().get(&self.proxy_artifact)?;
        proxy_constructor_args(&proxy_artifact.abi, Address::ZERO, &payload)?;

        let logic =
            resolve_or_deploy(ctx, &logic_name, &self.logic_artifact, &[], logic_forced).await?;
        let constructor_args =
            proxy_constructor_args(&proxy_artifact.abi, logic.record.address, &payload)?;

        info!(
            "Deploying `{}` proxy for implementation {:#x}",
            self.public_name, logic.record.address
        );
        let confirmation = ctx
            .target()
            .deploy(proxy_artifact, constructor_args.clone())
            .await?;
        let address = created_address(&self.public_name, &confirmation)?;
        info!(
            "Deployed `{}` proxy at {:#x} (tx {:#x})",
            self.public_name, address, confirmation.tx_hash
        );

        let public = ComponentRecord {
            name: self.public_name.clone(),
            address,
            abi: logic.record.abi.clone(),
            constructor_args,
            transaction_hash: Some(confirmation.tx_hash),
            implementation: Some(logic.record.address),
            artifact: Some(proxy_artifact.fully_qualified_name()),
        };

        // Both records land only once the proxy is confirmed
        if logic.fresh {
            ctx.ledger_mut().put(logic.record)?;
        }
        ctx.ledger_mut().put(public.clone())?;

        Ok(StepOutcome::Deployed(public))
    }
}

/// Point the proxy published as `public_name` at the currently recorded
/// implementation, optionally calling it with `calldata`.
///
/// Returns the updated record, or `None` if the proxy already points there.
pub async fn upgrade_proxy(
    ctx: &mut ExecutionContext,
    public_name: &str,
    calldata: Bytes,
) -> Result<Option<ComponentRecord>, DeployError> {
    let proxy = ctx.ledger().require(public_name)?;
    let logic = ctx.ledger().require(&implementation_name(public_name))?;

    if proxy.implementation == Some(logic.address) {
        info!(
            "`{}` already points at implementation {:#x}",
            public_name, logic.address
        );
        return Ok(None);
    }

    let payload = encode_call(
        &proxy.abi,
        UPGRADE_FUNCTION,
        &[
            DynSolValue::Address(logic.address),
            DynSolValue::Bytes(calldata.to_vec()),
        ],
    )?;

    let submitted = ctx.target().call(proxy.address, payload).await;
    let confirmation = match submitted {
        Ok(confirmation) => confirmation,
        Err(e) => {
            ctx.record_transaction(TxResult {
                component: public_name.to_string(),
                function: UPGRADE_FUNCTION.to_string(),
                success: false,
                tx_hash: None,
                error: Some(e.to_string()),
            });
            return Err(e);
        }
    };

    info!(
        "Upgraded `{}` to implementation {:#x} (tx {:#x})",
        public_name, logic.address, confirmation.tx_hash
    );
    ctx.record_transaction(TxResult {
        component: public_name.to_string(),
        function: UPGRADE_FUNCTION.to_string(),
        success: true,
        tx_hash: Some(confirmation.tx_hash),
        error: None,
    });

    let upgraded = ComponentRecord {
        abi: logic.abi,
        implementation: Some(logic.address),
        ..proxy
    };
    ctx.ledger_mut().put(upgraded.clone())?;

    Ok(Some(upgraded))
}
