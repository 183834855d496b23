//! Implementations of the various deploy scripts

use std::{collections::BTreeSet, sync::Arc};

use tracing::{info, warn};

use crate::{
    cli::{DeployArgs, UpgradeArgs},
    context::{ExecutionContext, Redeploy},
    errors::DeployError,
    ledger::DeploymentLedger,
    orchestrator::RunReport,
    params::SetupParams,
    pipeline::default_pipeline,
    steps::{proxy::upgrade_proxy, StepOutcome},
    utils::parse_calldata,
    verify::EtherscanVerifier,
};

/// Run the deployment pipeline, failing if the run aborted
pub async fn deploy(args: DeployArgs, ctx: ExecutionContext) -> Result<(), DeployError> {
    let redeploy = if args.force_all {
        Redeploy::All
    } else if !args.force.is_empty() {
        Redeploy::Only(args.force.into_iter().collect::<BTreeSet<_>>())
    } else {
        Redeploy::Never
    };
    let mut ctx = ctx.with_redeploy(redeploy);

    let params = SetupParams::load(args.params.as_deref())?;
    let verifier = EtherscanVerifier::new(
        ctx.network().explorer_api_url.clone(),
        args.etherscan_api_key,
    )?;
    let pipeline = default_pipeline(ctx.network(), &params, Arc::new(verifier))?;

    info!(
        "Running the {} pipeline as {:#x}",
        ctx.network().name,
        ctx.deployer()
    );
    let report = pipeline.run(&mut ctx, &args.tags).await?;
    log_report(&report);

    if report.is_completed() {
        return Ok(());
    }

    match report.error {
        Some(e) => {
            if e.is_remote() {
                warn!("Rerunning resumes from the recorded deployments");
            } else {
                warn!("The failed step submitted nothing, fix the configuration and rerun");
            }
            Err(e)
        }
        None => Ok(()),
    }
}

/// Log the outcome of every step and configuration call
fn log_report(report: &RunReport) {
    for step in &report.steps {
        match &step.outcome {
            Some(StepOutcome::Deployed(record)) => {
                info!("{}: deployed at {:#x}", step.name, record.address)
            }
            Some(StepOutcome::Reused(record)) => {
                info!("{}: reused {:#x}", step.name, record.address)
            }
            Some(StepOutcome::Configured(calls)) => {
                info!("{}: {} calls confirmed", step.name, calls.len())
            }
            Some(StepOutcome::Verified { submitted, skipped }) => {
                info!("{}: {} submitted, {} skipped", step.name, submitted, skipped)
            }
            None => info!("{}: {:?}", step.name, step.state),
        }
    }

    for tx in report.transactions.iter().filter(|tx| !tx.success) {
        warn!(
            "{}.{} failed: {}",
            tx.component,
            tx.function,
            tx.error.as_deref().unwrap_or("unknown error")
        );
    }

    info!("Run {:?}", report.state);
}

/// Point a proxy at its recorded implementation
pub async fn upgrade(args: UpgradeArgs, mut ctx: ExecutionContext) -> Result<(), DeployError> {
    let calldata = parse_calldata(args.calldata.as_deref())?;
    if let Some(record) = upgrade_proxy(&mut ctx, &args.component, calldata).await? {
        info!(
            "{} at {:#x} now delegates to {:#x}",
            record.name,
            record.address,
            record.implementation.unwrap_or_default()
        );
    }

    Ok(())
}

/// Print every record of a network's ledger
pub fn show_ledger(ledger: &dyn DeploymentLedger, network: &str) -> Result<(), DeployError> {
    let records = ledger.records()?;
    if records.is_empty() {
        info!("No deployments recorded for {}", network);
    }

    for record in records {
        match record.implementation {
            Some(implementation) => println!(
                "{:<32} {:#x} (implementation {:#x})",
                record.name, record.address, implementation
            ),
            None => println!("{:<32} {:#x}", record.name, record.address),
        }
    }

    Ok(())
}
