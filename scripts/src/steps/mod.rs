//! The units of work the orchestrator schedules: deploying a component,
//! provisioning a component behind an upgradeable proxy, configuring a
//! deployed component, and submitting deployed sources for verification

use alloy::{dyn_abi::DynSolValue, json_abi::Param};
use alloy_primitives::Address;
use async_trait::async_trait;

use crate::{
    context::{ExecutionContext, TxResult},
    encoder::coerce_literal,
    errors::DeployError,
    ledger::{ComponentRecord, DeploymentLedger},
};

pub mod configure;
pub mod deploy;
pub mod proxy;
pub mod verify;

/// A single unit of orchestrated work
#[async_trait]
pub trait Step: Send + Sync {
    /// Execute the step against the run's context
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome, DeployError>;
}

/// What a successful step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A new instance was deployed and recorded
    Deployed(ComponentRecord),
    /// The recorded instance was kept
    Reused(ComponentRecord),
    /// Every call of a configuration batch was confirmed
    Configured(Vec<TxResult>),
    /// Verification requests were handed to the explorer
    Verified {
        /// Requests the explorer accepted
        submitted: usize,
        /// Components that could not be submitted
        skipped: usize,
    },
}

/// An argument to a constructor or a call
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    /// A value typed ahead of time
    Value(DynSolValue),
    /// A string parsed as the declared parameter type, e.g. `"[1,2]"`
    Literal(String),
    /// The recorded address of another component
    AddressOf(String),
}

impl CallArg {
    /// An address value
    pub fn address(address: Address) -> Self {
        CallArg::Value(DynSolValue::Address(address))
    }

    /// A string value
    pub fn string(value: impl Into<String>) -> Self {
        CallArg::Value(DynSolValue::String(value.into()))
    }

    /// A literal coerced to the declared parameter type
    pub fn literal(value: impl ToString) -> Self {
        CallArg::Literal(value.to_string())
    }

    /// The address recorded under `component`
    pub fn address_of(component: impl Into<String>) -> Self {
        CallArg::AddressOf(component.into())
    }
}

/// Turn step arguments into ABI values for the given parameter list,
/// reading component addresses from the ledger
pub fn resolve_args(
    ledger: &dyn DeploymentLedger,
    params: &[Param],
    args: &[CallArg],
) -> Result<Vec<DynSolValue>, DeployError> {
    if params.len() != args.len() {
        return Err(DeployError::SchemaMismatch(format!(
            "expected {} arguments, {} given",
            params.len(),
            args.len()
        )));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| match arg {
            CallArg::Value(value) => Ok(value.clone()),
            CallArg::Literal(literal) => coerce_literal(param, literal),
            CallArg::AddressOf(component) => {
                Ok(DynSolValue::Address(ledger.require(component)?.address))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use alloy::json_abi::JsonAbi;
    use alloy_primitives::{Bytes, U256};

    use super::*;
    use crate::ledger::MemoryLedger;

    #[test]
    fn test_resolve_args_reads_ledger_and_coerces_literals() {
        let abi = JsonAbi::parse(["function initialize(address usdt, address pass, uint16 bps)"])
            .unwrap();
        let params = &abi.function("initialize").unwrap()[0].inputs;

        let pass = Address::repeat_byte(0xaa);
        let mut ledger = MemoryLedger::new();
        ledger
            .put(ComponentRecord {
                name: "MyDanPass".to_string(),
                address: pass,
                abi: JsonAbi::new(),
                constructor_args: Bytes::new(),
                transaction_hash: None,
                implementation: None,
                artifact: None,
            })
            .unwrap();

        let usdt = Address::repeat_byte(0x55);
        let values = resolve_args(
            &ledger,
            params,
            &[
                CallArg::address(usdt),
                CallArg::address_of("MyDanPass"),
                CallArg::literal(100),
            ],
        )
        .unwrap();

        assert_eq!(
            values,
            vec![
                DynSolValue::Address(usdt),
                DynSolValue::Address(pass),
                DynSolValue::Uint(U256::from(100u64), 16),
            ]
        );
    }

    #[test]
    fn test_resolve_args_missing_reference() {
        let abi = JsonAbi::parse(["function setMinter(address minter)"]).unwrap();
        let params = &abi.function("setMinter").unwrap()[0].inputs;

        let res = resolve_args(&MemoryLedger::new(), params, &[CallArg::address_of("MyDanDefi")]);
        assert_eq!(res, Err(DeployError::UnknownComponent("MyDanDefi".to_string())));
    }
}
