//! Definitions of errors that can occur while deploying and configuring the contracts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deployment pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// A function name, arity, or argument type disagrees with the component's schema.
    /// Never submitted to the network.
    SchemaMismatch(String),
    /// A step referenced a component that has no record in the deployments ledger
    UnknownComponent(String),
    /// The target rejected a transaction before executing it
    SubmissionRejected(String),
    /// A transaction was accepted but not confirmed within the wait window
    ConfirmationTimeout(String),
    /// The transaction executed but the remote logic rejected it
    ExecutionReverted(String),
    /// Error reading the deployments ledger
    ReadDeployments(String),
    /// Error writing the deployments ledger
    WriteDeployments(String),
    /// Error parsing a compilation artifact
    ArtifactParsing(String),
    /// No compilation artifact was found under the given name
    UnknownArtifact(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// A step declared a dependency that matches no step name or tag
    UnknownDependency(String),
    /// The step dependency graph contains a cycle
    DependencyCycle(String),
    /// The tag filter selected no steps
    NoStepsSelected(String),
    /// Invalid configuration
    Config(String),
    /// Error submitting a source verification request
    Verification(String),
}

impl DeployError {
    /// Whether the error was produced by the target network rather than
    /// detected locally before any submission
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            DeployError::SubmissionRejected(_)
                | DeployError::ConfirmationTimeout(_)
                | DeployError::ExecutionReverted(_)
        )
    }
}

impl Display for DeployError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeployError::SchemaMismatch(s) => write!(f, "schema mismatch: {}", s),
            DeployError::UnknownComponent(s) => write!(f, "unknown component: {}", s),
            DeployError::SubmissionRejected(s) => write!(f, "submission rejected: {}", s),
            DeployError::ConfirmationTimeout(s) => write!(f, "confirmation timed out: {}", s),
            DeployError::ExecutionReverted(s) => write!(f, "execution reverted: {}", s),
            DeployError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            DeployError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            DeployError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            DeployError::UnknownArtifact(s) => write!(f, "unknown artifact: {}", s),
            DeployError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            DeployError::UnknownDependency(s) => write!(f, "unknown dependency: {}", s),
            DeployError::DependencyCycle(s) => write!(f, "dependency cycle: {}", s),
            DeployError::NoStepsSelected(s) => write!(f, "no steps selected: {}", s),
            DeployError::Config(s) => write!(f, "invalid configuration: {}", s),
            DeployError::Verification(s) => write!(f, "error verifying contract: {}", s),
        }
    }
}

impl Error for DeployError {}
