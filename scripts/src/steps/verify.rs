//! Source verification of recorded components

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    context::ExecutionContext,
    errors::DeployError,
    verify::{VerificationRequest, Verifier},
};

use super::{Step, StepOutcome};

/// Submits the sources of recorded components to a verifier.
///
/// Failures are logged and skipped, never failing the run.
pub struct VerifyStep {
    /// The components to verify
    components: Vec<String>,
    /// The verification service
    verifier: Arc<dyn Verifier>,
}

impl VerifyStep {
    /// Verify each of `components` through `verifier`
    pub fn new(components: Vec<String>, verifier: Arc<dyn Verifier>) -> Self {
        Self {
            components,
            verifier,
        }
    }

    /// Assemble and submit the request of a single component
    async fn verify_one(
        &self,
        ctx: &ExecutionContext,
        component: &str,
    ) -> Result<String, DeployError> {
        let record = ctx.ledger().require(component)?;
        let contract = record.artifact.clone().ok_or_else(|| {
            DeployError::Verification(format!("`{component}` has no recorded artifact"))
        })?;
        let build_info = ctx.artifacts().build_info(&contract)?.ok_or_else(|| {
            DeployError::Verification(format!("no build info for {contract}"))
        })?;

        self.verifier
            .verify(VerificationRequest {
                address: record.address,
                constructor_args: record.constructor_args,
                contract,
                compiler_version: build_info.solc_long_version,
                source: build_info.input,
            })
            .await
    }
}

#[async_trait]
impl Step for VerifyStep {
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome, DeployError> {
        let mut submitted = 0;
        let mut skipped = 0;

        for component in &self.components {
            match self.verify_one(ctx, component).await {
                Ok(receipt) => {
                    info!("Submitted `{}` for verification ({})", component, receipt);
                    submitted += 1;
                }
                Err(e) => {
                    warn!("Skipping verification of `{}`: {}", component, e);
                    skipped += 1;
                }
            }
        }

        Ok(StepOutcome::Verified { submitted, skipped })
    }
}
