//! Submission of deployed sources to an Etherscan-compatible block explorer

use std::time::Duration;

use alloy_primitives::{hex, Address, Bytes};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    constants::{ETHERSCAN_CODE_FORMAT, ETHERSCAN_OK_STATUS},
    errors::DeployError,
};

/// Everything an explorer needs to match a deployed instance to its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    /// The deployed instance
    pub address: Address,
    /// The encoded constructor arguments it was deployed with
    pub constructor_args: Bytes,
    /// The `<source>:<contract>` identifier
    pub contract: String,
    /// The full compiler version, e.g. `0.8.11+commit.d7f03943`
    pub compiler_version: String,
    /// The standard JSON compiler input
    pub source: serde_json::Value,
}

/// A source verification service
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Submit a verification request, returning the service's receipt
    async fn verify(&self, request: VerificationRequest) -> Result<String, DeployError>;
}

/// The form fields of a `verifysourcecode` request
#[derive(Serialize)]
struct VerifyForm<'a> {
    apikey: &'a str,
    module: &'static str,
    action: &'static str,
    contractaddress: String,
    #[serde(rename = "sourceCode")]
    source_code: String,
    codeformat: &'static str,
    contractname: &'a str,
    compilerversion: String,
    /// Misspelled by the explorer API
    #[serde(rename = "constructorArguements")]
    constructor_arguments: String,
}

/// The envelope of every explorer API response
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    message: String,
    result: String,
}

/// A [`Verifier`] backed by the Etherscan API, or any explorer mirroring it
pub struct EtherscanVerifier {
    /// The HTTP client
    client: Client,
    /// The explorer API endpoint, if the network has one
    api_url: Option<String>,
    /// The explorer API key
    api_key: Option<String>,
}

impl EtherscanVerifier {
    /// Create a verifier against the given endpoint
    pub fn new(api_url: Option<String>, api_key: Option<String>) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DeployError::Verification(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl Verifier for EtherscanVerifier {
    async fn verify(&self, request: VerificationRequest) -> Result<String, DeployError> {
        let api_url = self.api_url.as_deref().ok_or_else(|| {
            DeployError::Verification("network has no explorer API".to_string())
        })?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DeployError::Verification("no explorer API key set".to_string()))?;

        let form = VerifyForm {
            apikey: api_key,
            module: "contract",
            action: "verifysourcecode",
            contractaddress: format!("{:#x}", request.address),
            source_code: request.source.to_string(),
            codeformat: ETHERSCAN_CODE_FORMAT,
            contractname: &request.contract,
            compilerversion: format!("v{}", request.compiler_version),
            constructor_arguments: hex::encode(&request.constructor_args),
        };

        debug!("Submitting {} for verification", request.contract);
        let response: ExplorerResponse = self
            .client
            .post(api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| DeployError::Verification(e.to_string()))?
            .json()
            .await
            .map_err(|e| DeployError::Verification(e.to_string()))?;

        interpret_response(response)
    }
}

/// Map an explorer response onto a receipt or an error
fn interpret_response(response: ExplorerResponse) -> Result<String, DeployError> {
    if response.status == ETHERSCAN_OK_STATUS {
        return Ok(response.result);
    }

    if response.result.to_lowercase().contains("already verified") {
        return Ok(response.result);
    }

    Err(DeployError::Verification(format!(
        "{}: {}",
        response.message, response.result
    )))
}
