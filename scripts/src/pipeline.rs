//! The deployment pipeline of the MyDan contracts

use std::sync::Arc;

use crate::{
    constants::{
        APP_COMPONENT, APP_INIT_FUNCTION, APP_PROXY_ARTIFACT, MAIN_TAG, PASS_COMPONENT, PASS_TAG,
        SETUP_TAG, SET_MINTER_FUNCTION, VERIFY_TAG,
    },
    errors::DeployError,
    networks::NetworkConfig,
    orchestrator::{Orchestrator, StepDescriptor},
    params::SetupParams,
    steps::{
        configure::ConfigureStep,
        deploy::DeployStep,
        proxy::{implementation_name, ProxyStep},
        verify::VerifyStep,
        CallArg,
    },
    verify::Verifier,
};

/// The name of the minter setup step
pub const SETUP_MINTER_STEP: &str = "setup-minter";
/// The name of the business rules setup step
pub const SETUP_RULES_STEP: &str = "setup-rules";
/// The name of the verification step
pub const VERIFY_STEP: &str = "verify";

/// Build the full pipeline for `network`:
/// - `MyDanPass`, the access token
/// - `MyDanDefi`, the application behind its proxy, initialized with the
///   network's USDT address and the access token
/// - the access token's minter, set to the application
/// - the application's business rules
/// - source verification of everything deployed
pub fn default_pipeline(
    network: &NetworkConfig,
    params: &SetupParams,
    verifier: Arc<dyn Verifier>,
) -> Result<Orchestrator, DeployError> {
    let usdt = network.usdt.ok_or_else(|| {
        DeployError::Config(format!("no USDT address known for network {}", network.name))
    })?;

    let pass = DeployStep::new(PASS_COMPONENT, PASS_COMPONENT);

    let app = ProxyStep::new(APP_COMPONENT, APP_COMPONENT, APP_PROXY_ARTIFACT).initializer(
        APP_INIT_FUNCTION,
        vec![CallArg::address(usdt), CallArg::address_of(PASS_COMPONENT)],
    );

    let setup_minter = ConfigureStep::new(PASS_COMPONENT)
        .call(SET_MINTER_FUNCTION, vec![CallArg::address_of(APP_COMPONENT)]);

    let setup_rules = ConfigureStep::new(APP_COMPONENT).calls(params.calls());

    let verify = VerifyStep::new(
        vec![
            PASS_COMPONENT.to_string(),
            implementation_name(APP_COMPONENT),
            APP_COMPONENT.to_string(),
        ],
        verifier,
    );

    Ok(Orchestrator::new()
        .with_step(
            StepDescriptor::new(PASS_COMPONENT, pass)
                .tag(PASS_TAG)
                .tag(MAIN_TAG),
        )
        .with_step(
            StepDescriptor::new(APP_COMPONENT, app)
                .tag(MAIN_TAG)
                .depends_on(PASS_COMPONENT),
        )
        .with_step(
            StepDescriptor::new(SETUP_MINTER_STEP, setup_minter)
                .tag(SETUP_TAG)
                .depends_on(APP_COMPONENT)
                .depends_on(PASS_COMPONENT),
        )
        .with_step(
            StepDescriptor::new(SETUP_RULES_STEP, setup_rules)
                .tag(SETUP_TAG)
                .depends_on(APP_COMPONENT),
        )
        .with_step(
            StepDescriptor::new(VERIFY_STEP, verify)
                .tag(VERIFY_TAG)
                .depends_on(MAIN_TAG),
        ))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{networks::Network, verify::VerificationRequest};

    struct NoVerifier;

    #[async_trait]
    impl Verifier for NoVerifier {
        async fn verify(&self, _: VerificationRequest) -> Result<String, DeployError> {
            Err(DeployError::Verification("disabled".to_string()))
        }
    }

    fn tags(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|tag| tag.to_string()).collect()
    }

    #[test]
    fn test_tag_selection() {
        let pipeline = default_pipeline(
            &Network::Hardhat.config(),
            &SetupParams::default(),
            Arc::new(NoVerifier),
        )
        .unwrap();

        assert_eq!(pipeline.plan(&tags(&["pass"])).unwrap(), vec!["MyDanPass"]);
        assert_eq!(
            pipeline.plan(&tags(&["main"])).unwrap(),
            vec!["MyDanPass", "MyDanDefi"]
        );
        assert_eq!(
            pipeline.plan(&tags(&["setup"])).unwrap(),
            vec!["MyDanPass", "MyDanDefi", "setup-minter", "setup-rules"]
        );
        assert_eq!(
            pipeline.plan(&[]).unwrap(),
            vec!["MyDanPass", "MyDanDefi", "setup-minter", "setup-rules", "verify"]
        );
    }

    #[test]
    fn test_network_without_usdt() {
        let res = default_pipeline(
            &Network::FtmTestnet.config(),
            &SetupParams::default(),
            Arc::new(NoVerifier),
        );
        assert!(matches!(res, Err(DeployError::Config(_))));
    }
}
