//! ABI encoding of call and constructor payloads.
//!
//! Every payload is checked against the component's schema before it is
//! built, so a misspelled function or a malformed argument list surfaces as a
//! local [`DeployError::SchemaMismatch`] instead of a failed transaction.

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::{Function, JsonAbi, Param},
};
use alloy_primitives::Bytes;
use itertools::Itertools;

use crate::errors::DeployError;

/// Encode a call to `function` with `args`, selector included
pub fn encode_call(
    schema: &JsonAbi,
    function: &str,
    args: &[DynSolValue],
) -> Result<Bytes, DeployError> {
    let function = select_function(schema, function, args.len())?;
    check_args(&function.signature(), &function.inputs, args)?;

    function
        .abi_encode_input(args)
        .map(Bytes::from)
        .map_err(|e| DeployError::SchemaMismatch(e.to_string()))
}

/// Encode constructor arguments, to be appended to creation bytecode
pub fn encode_constructor(schema: &JsonAbi, args: &[DynSolValue]) -> Result<Bytes, DeployError> {
    match &schema.constructor {
        Some(constructor) => {
            check_args("constructor", &constructor.inputs, args)?;
            constructor
                .abi_encode_input(args)
                .map(Bytes::from)
                .map_err(|e| DeployError::SchemaMismatch(e.to_string()))
        }
        None if args.is_empty() => Ok(Bytes::new()),
        None => Err(DeployError::SchemaMismatch(format!(
            "schema declares no constructor, {} arguments given",
            args.len()
        ))),
    }
}

/// Find the overload of `name` taking `arity` arguments
pub fn select_function<'a>(
    schema: &'a JsonAbi,
    name: &str,
    arity: usize,
) -> Result<&'a Function, DeployError> {
    let overloads = schema
        .function(name)
        .ok_or_else(|| DeployError::SchemaMismatch(format!("no function `{name}` in schema")))?;

    overloads
        .iter()
        .find(|function| function.inputs.len() == arity)
        .ok_or_else(|| {
            let expected = overloads.iter().map(|f| f.inputs.len()).join(" or ");
            DeployError::SchemaMismatch(format!(
                "`{name}` takes {expected} arguments, {arity} given"
            ))
        })
}

/// Parse a string literal as a value of the parameter's type
pub fn coerce_literal(param: &Param, literal: &str) -> Result<DynSolValue, DeployError> {
    param_type(param)?.coerce_str(literal).map_err(|e| {
        DeployError::SchemaMismatch(format!("`{literal}` is not a valid `{}`: {e}", param.ty))
    })
}

/// Check arity and per-argument types of `args` against `params`
fn check_args(context: &str, params: &[Param], args: &[DynSolValue]) -> Result<(), DeployError> {
    if params.len() != args.len() {
        return Err(DeployError::SchemaMismatch(format!(
            "{context} takes {} arguments, {} given",
            params.len(),
            args.len()
        )));
    }

    for (i, (param, arg)) in params.iter().zip(args).enumerate() {
        let ty = param_type(param)?;
        if !ty.matches(arg) {
            let given = arg
                .as_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "unknown".to_string());

            return Err(DeployError::SchemaMismatch(format!(
                "{context}: argument {i} `{}` expects `{ty}`, got `{given}`",
                param.name
            )));
        }
    }

    Ok(())
}

/// Resolve a parameter's declared type
fn param_type(param: &Param) -> Result<DynSolType, DeployError> {
    param
        .resolve()
        .map_err(|e| DeployError::SchemaMismatch(format!("bad parameter type `{}`: {e}", param.ty)))
}

#[cfg(test)]
mod tests {
    use alloy::{dyn_abi::DynSolValue, json_abi::JsonAbi};
    use alloy_primitives::{hex, keccak256, Address, U256};
    use alloy_sol_types::{sol, SolCall};

    use super::*;

    sol! {
        function setDurations(uint256[] durations, uint256[] bonusRates) external;
    }

    fn schema() -> JsonAbi {
        JsonAbi::parse([
            "constructor(address logic, bytes data)",
            "function setDurations(uint256[] durations, uint256[] bonusRates)",
            "function insertTier(string label, uint256 minThreshold, uint256 maxThreshold, uint16 bonusRateBps, uint8 lockIndexFrom, uint8 lockIndexTo)",
            "function setAumCap(uint256 cap)",
            "function setAumCap(uint256 cap, bool strict)",
        ])
        .unwrap()
    }

    fn uint_array(values: &[u64]) -> DynSolValue {
        DynSolValue::Array(
            values
                .iter()
                .map(|v| DynSolValue::Uint(U256::from(*v), 256))
                .collect(),
        )
    }

    #[test]
    fn test_set_durations_canonical_payload() {
        let payload = encode_call(
            &schema(),
            "setDurations",
            &[uint_array(&[7776000, 15552000]), uint_array(&[0, 0])],
        )
        .unwrap();

        let selector = &keccak256("setDurations(uint256[],uint256[])")[..4];
        let expected_args = hex!(
            "0000000000000000000000000000000000000000000000000000000000000040"
            "00000000000000000000000000000000000000000000000000000000000000a0"
            "0000000000000000000000000000000000000000000000000000000000000002"
            "000000000000000000000000000000000000000000000000000000000076a700"
            "0000000000000000000000000000000000000000000000000000000000ed4e00"
            "0000000000000000000000000000000000000000000000000000000000000002"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
        );

        assert_eq!(&payload[..4], selector);
        assert_eq!(&payload[4..], &expected_args[..]);

        let reference = setDurationsCall {
            durations: vec![U256::from(7776000u64), U256::from(15552000u64)],
            bonusRates: vec![U256::ZERO, U256::ZERO],
        }
        .abi_encode();
        assert_eq!(payload.to_vec(), reference);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let args = [uint_array(&[1, 2, 3]), uint_array(&[4, 5, 6])];
        let first = encode_call(&schema(), "setDurations", &args).unwrap();
        let second = encode_call(&schema(), "setDurations", &args).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_wrong_arity_is_schema_mismatch() {
        let res = encode_call(&schema(), "setDurations", &[uint_array(&[7776000])]);
        assert!(matches!(res, Err(DeployError::SchemaMismatch(_))));
    }

    #[test]
    fn test_unknown_function_is_schema_mismatch() {
        let res = encode_call(&schema(), "setDuration", &[]);
        assert!(matches!(
            res,
            Err(DeployError::SchemaMismatch(msg)) if msg.contains("setDuration")
        ));
    }

    #[test]
    fn test_wrong_type_is_schema_mismatch() {
        let res = encode_call(
            &schema(),
            "setDurations",
            &[uint_array(&[1]), DynSolValue::Address(Address::ZERO)],
        );
        assert!(matches!(res, Err(DeployError::SchemaMismatch(msg)) if msg.contains("bonusRates")));
    }

    #[test]
    fn test_overload_selected_by_arity() {
        let cap = DynSolValue::Uint(U256::from(10u64), 256);
        let single = encode_call(&schema(), "setAumCap", &[cap.clone()]).unwrap();
        let strict =
            encode_call(&schema(), "setAumCap", &[cap, DynSolValue::Bool(true)]).unwrap();

        assert_eq!(&single[..4], &keccak256("setAumCap(uint256)")[..4]);
        assert_eq!(&strict[..4], &keccak256("setAumCap(uint256,bool)")[..4]);
    }

    #[test]
    fn test_constructor_args_have_no_selector() {
        let logic = Address::repeat_byte(0x11);
        let encoded = encode_constructor(
            &schema(),
            &[
                DynSolValue::Address(logic),
                DynSolValue::Bytes(vec![0xde, 0xad]),
            ],
        )
        .unwrap();

        // head (address, offset) + length word + one padded data word
        assert_eq!(encoded.len(), 4 * 32);
        assert_eq!(&encoded[12..32], logic.as_slice());
    }

    #[test]
    fn test_constructor_free_schema() {
        let schema = JsonAbi::parse(["function setMinter(address minter)"]).unwrap();
        assert_eq!(encode_constructor(&schema, &[]), Ok(Bytes::new()));
        assert!(encode_constructor(&schema, &[DynSolValue::Bool(true)]).is_err());
    }

    #[test]
    fn test_coerce_literal_respects_declared_width() {
        let schema = schema();
        let insert = select_function(&schema, "insertTier", 6).unwrap();
        let bps = &insert.inputs[3];

        assert_eq!(
            coerce_literal(bps, "250").unwrap(),
            DynSolValue::Uint(U256::from(250u64), 16)
        );
        assert!(coerce_literal(bps, "70000").is_err());
    }
}
