//! Configuration of deployed components through ordered call batches

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    context::{ExecutionContext, TxResult},
    encoder::{encode_call, select_function},
    errors::DeployError,
};

use super::{resolve_args, CallArg, Step, StepOutcome};

/// A single call against a component's schema
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigCall {
    /// The function to call
    pub function: String,
    /// The call arguments
    pub args: Vec<CallArg>,
}

impl ConfigCall {
    /// A call to `function` with `args`
    pub fn new(function: impl Into<String>, args: Vec<CallArg>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}

/// Issues a batch of calls against one component, in order, halting on the
/// first failure
pub struct ConfigureStep {
    /// The component called
    component: String,
    /// The calls, in submission order
    calls: Vec<ConfigCall>,
}

impl ConfigureStep {
    /// An empty batch against `component`
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            calls: Vec::new(),
        }
    }

    /// Append a call to the batch
    pub fn call(mut self, function: impl Into<String>, args: Vec<CallArg>) -> Self {
        self.calls.push(ConfigCall::new(function, args));
        self
    }

    /// Append several calls to the batch
    pub fn calls(mut self, calls: impl IntoIterator<Item = ConfigCall>) -> Self {
        self.calls.extend(calls);
        self
    }
}

#[async_trait]
impl Step for ConfigureStep {
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome, DeployError> {
        // The whole batch is encoded before the first call is submitted
        let prepared = self
            .calls
            .iter()
            .map(|call| prepare_call(ctx, &self.component, &call.function, &call.args))
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::with_capacity(prepared.len());
        for call in prepared {
            results.push(submit_call(ctx, call).await?);
        }

        Ok(StepOutcome::Configured(results))
    }
}

/// A call encoded against its component's schema, ready to submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    /// The component called
    pub component: String,
    /// The function called
    pub function: String,
    /// The recorded address of the component
    pub to: Address,
    /// The encoded call
    pub payload: Bytes,
}

/// Encode a call against the recorded instance of `component`, without
/// submitting it
pub fn prepare_call(
    ctx: &ExecutionContext,
    component: &str,
    function: &str,
    args: &[CallArg],
) -> Result<PreparedCall, DeployError> {
    let record = ctx.ledger().require(component)?;
    let selected = select_function(&record.abi, function, args.len())?;
    let values = resolve_args(ctx.ledger(), &selected.inputs, args)?;
    let payload = encode_call(&record.abi, function, &values)?;

    Ok(PreparedCall {
        component: component.to_string(),
        function: function.to_string(),
        to: record.address,
        payload,
    })
}

/// Submit a prepared call, logging its outcome in the run's transaction log
pub async fn submit_call(
    ctx: &mut ExecutionContext,
    call: PreparedCall,
) -> Result<TxResult, DeployError> {
    let PreparedCall {
        component,
        function,
        to,
        payload,
    } = call;

    info!("Calling `{}.{}` at {:#x}", component, function, to);
    let submitted = ctx.target().call(to, payload).await;
    let result = match submitted {
        Ok(confirmation) => {
            info!(
                "`{}.{}` confirmed (tx {:#x})",
                component, function, confirmation.tx_hash
            );
            TxResult {
                component,
                function,
                success: true,
                tx_hash: Some(confirmation.tx_hash),
                error: None,
            }
        }
        Err(e) => {
            error!("`{}.{}` failed: {}", component, function, e);
            ctx.record_transaction(TxResult {
                component,
                function,
                success: false,
                tx_hash: None,
                error: Some(e.to_string()),
            });
            return Err(e);
        }
    };

    ctx.record_transaction(result.clone());
    Ok(result)
}

/// Encode and submit one call against the recorded instance of `component`.
///
/// Encoding failures are returned before anything is submitted and are not
/// logged as transactions.
pub async fn configure_call(
    ctx: &mut ExecutionContext,
    component: &str,
    function: &str,
    args: &[CallArg],
) -> Result<TxResult, DeployError> {
    let call = prepare_call(ctx, component, function, args)?;
    submit_call(ctx, call).await
}
