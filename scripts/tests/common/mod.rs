//! Fixtures shared by the pipeline tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use alloy::json_abi::JsonAbi;
use alloy_primitives::{address, keccak256, Address, Bytes, TxHash};
use async_trait::async_trait;
use mydan_scripts::{
    artifacts::{Artifact, ArtifactRegistry},
    context::ExecutionContext,
    errors::DeployError,
    ledger::{DeploymentLedger, MemoryLedger},
    networks::Network,
    target::{Confirmation, DeploymentTarget},
    verify::{VerificationRequest, Verifier},
};

/// The deployer account of every test run
pub const DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// The USDT address of the hardhat preset
pub const USDT: Address = address!("fa873c8A5C5F93c6BFac672df089FADc17127b73");

/// Something the target was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A deployment of the named contract, at the created address
    Deploy {
        contract: String,
        address: Address,
        constructor_args: Bytes,
    },
    /// A call to an instance
    Call { to: Address, payload: Bytes },
}

#[derive(Default)]
struct MockState {
    nonce: u64,
    events: Vec<Event>,
    num_deploys: usize,
    num_calls: usize,
    fail_deploy_at: Option<usize>,
    revert_call_at: Option<usize>,
}

/// An in-memory chain that records every request, addresses created
/// instances like the EVM does, and can revert a chosen call
pub struct MockTarget {
    state: Mutex<MockState>,
}

impl MockTarget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
        })
    }

    /// Reject the `n`-th deployment (1-based) submitted to the target
    pub fn fail_deploy_at(&self, n: usize) {
        self.state.lock().unwrap().fail_deploy_at = Some(n);
    }

    /// Revert the `n`-th call (1-based) made to the target
    pub fn revert_call_at(&self, n: usize) {
        self.state.lock().unwrap().revert_call_at = Some(n);
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn num_deployments(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::Deploy { .. }))
            .count()
    }

    pub fn num_calls(&self) -> usize {
        self.state.lock().unwrap().num_calls
    }

    fn next_hash(state: &mut MockState) -> TxHash {
        state.nonce += 1;
        keccak256(state.nonce.to_be_bytes())
    }
}

#[async_trait]
impl DeploymentTarget for MockTarget {
    async fn deploy(
        &self,
        artifact: &Artifact,
        constructor_args: Bytes,
    ) -> Result<Confirmation, DeployError> {
        let mut state = self.state.lock().unwrap();
        state.num_deploys += 1;
        if state.fail_deploy_at == Some(state.num_deploys) {
            return Err(DeployError::SubmissionRejected(
                "insufficient funds for gas * price + value".to_string(),
            ));
        }

        let address = DEPLOYER.create(state.nonce);
        let tx_hash = Self::next_hash(&mut state);
        state.events.push(Event::Deploy {
            contract: artifact.contract_name.clone(),
            address,
            constructor_args,
        });

        Ok(Confirmation {
            tx_hash,
            contract_address: Some(address),
            block_number: Some(state.nonce),
        })
    }

    async fn call(&self, to: Address, payload: Bytes) -> Result<Confirmation, DeployError> {
        let mut state = self.state.lock().unwrap();
        state.num_calls += 1;
        state.events.push(Event::Call { to, payload });
        if state.revert_call_at == Some(state.num_calls) {
            return Err(DeployError::ExecutionReverted(
                "execution reverted: TIER_OVERLAP".to_string(),
            ));
        }

        let tx_hash = Self::next_hash(&mut state);
        Ok(Confirmation {
            tx_hash,
            contract_address: None,
            block_number: Some(state.nonce),
        })
    }
}

/// A verifier counting the requests it receives
#[derive(Default)]
pub struct CountingVerifier {
    pub requests: Mutex<Vec<VerificationRequest>>,
}

#[async_trait]
impl Verifier for CountingVerifier {
    async fn verify(&self, request: VerificationRequest) -> Result<String, DeployError> {
        self.requests.lock().unwrap().push(request);
        Ok("guid".to_string())
    }
}

/// The application logic schema
pub fn app_abi() -> JsonAbi {
    JsonAbi::parse([
        "function initialize(address usdt)",
        "function initialize(address usdt, address pass)",
        "function setDurations(uint256[] durations, uint256[] bonusRates)",
        "function insertTier(string label, uint256 minThreshold, uint256 maxThreshold, uint16 bonusRateBps, uint8 lockIndexFrom, uint8 lockIndexTo)",
        "function setAumCap(uint256 cap)",
        "function setReferralBonusRates(uint16[] rates)",
        "function upgradeToAndCall(address newImplementation, bytes data)",
    ])
    .unwrap()
}

/// The compiled contracts of the system
pub fn artifacts() -> ArtifactRegistry {
    let code = Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52]);

    let mut registry = ArtifactRegistry::new();
    registry.insert(Artifact::new(
        "MyDanDefi",
        "src/MyDanDefi.sol",
        app_abi(),
        code.clone(),
    ));
    registry.insert(Artifact::new(
        "MyDanDefiProxy",
        "src/MyDanDefiProxy.sol",
        JsonAbi::parse(["constructor(address logic, bytes data)"]).unwrap(),
        code.clone(),
    ));
    registry.insert(Artifact::new(
        "MyDanPass",
        "src/MyDanPass.sol",
        JsonAbi::parse(["function setMinter(address minter)"]).unwrap(),
        code,
    ));

    registry
}

/// A hardhat context over the given ledger and target
pub fn context_with(
    ledger: Box<dyn DeploymentLedger>,
    target: Arc<MockTarget>,
) -> ExecutionContext {
    ExecutionContext::new(
        Network::Hardhat.config(),
        DEPLOYER,
        ledger,
        target,
        artifacts(),
    )
}

/// A hardhat context over an empty in-memory ledger
pub fn context(target: Arc<MockTarget>) -> ExecutionContext {
    context_with(Box::new(MemoryLedger::new()), target)
}
