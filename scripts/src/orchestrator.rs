//! Scheduling of steps over their tag/dependency graph.
//!
//! The graph is resolved once, before anything runs: dependencies name either
//! another step or a tag, the requested tags select steps along with
//! everything they transitively depend on, and the selection is sorted
//! topologically, breaking ties by declaration order. Execution is strictly
//! sequential and stops at the first failed step.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use tracing::{error, info};

use crate::{
    context::{ExecutionContext, TxResult},
    errors::DeployError,
    steps::{Step, StepOutcome},
};

/// A step together with its scheduling metadata
pub struct StepDescriptor {
    /// The unique step name
    name: String,
    /// The tags selecting the step
    tags: BTreeSet<String>,
    /// Step names or tags that must succeed before this step runs
    dependencies: BTreeSet<String>,
    /// The work itself
    action: Box<dyn Step>,
}

impl StepDescriptor {
    /// Describe a step with no tags or dependencies
    pub fn new(name: impl Into<String>, action: impl Step + 'static) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            action: Box::new(action),
        }
    }

    /// Add a tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add a dependency on a step name or tag
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.insert(dependency.into());
        self
    }
}

/// The lifecycle of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Not yet started
    Pending,
    /// Currently executing
    Running,
    /// Finished successfully
    Succeeded,
    /// Finished with an error
    Failed,
}

/// The lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No step has started
    AllPending,
    /// Steps are executing
    InProgress,
    /// Every selected step succeeded
    Completed,
    /// A step failed and the remaining steps were not run
    Aborted,
}

/// The result of one scheduled step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// The step name
    pub name: String,
    /// The final step state
    pub state: StepState,
    /// What the step did, if it succeeded
    pub outcome: Option<StepOutcome>,
    /// Why the step failed, if it did
    pub error: Option<DeployError>,
}

/// The aggregated result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The final run state
    pub state: RunState,
    /// Every scheduled step, in execution order
    pub steps: Vec<StepReport>,
    /// Every configuration call issued, in order
    pub transactions: Vec<TxResult>,
    /// The error that aborted the run
    pub error: Option<DeployError>,
}

impl RunReport {
    /// Whether every selected step succeeded
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// The report of the named step
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.name == name)
    }
}

/// Owns the full set of steps and runs a selection of them in dependency order
#[derive(Default)]
pub struct Orchestrator {
    /// The steps, in declaration order
    steps: Vec<StepDescriptor>,
}

impl Orchestrator {
    /// An orchestrator with no steps
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a step
    pub fn with_step(mut self, step: StepDescriptor) -> Self {
        self.steps.push(step);
        self
    }

    /// Resolve the names of the steps selected by `tags`, in execution order.
    ///
    /// An empty tag list selects every step.
    pub fn plan(&self, tags: &[String]) -> Result<Vec<String>, DeployError> {
        Ok(self
            .schedule(tags)?
            .into_iter()
            .map(|idx| self.steps[idx].name.clone())
            .collect())
    }

    /// Run the steps selected by `tags` in dependency order, stopping at the
    /// first failure.
    ///
    /// Planning errors are returned before any step runs; step failures are
    /// reported in the returned [`RunReport`].
    pub async fn run(
        &self,
        ctx: &mut ExecutionContext,
        tags: &[String],
    ) -> Result<RunReport, DeployError> {
        let order = self.schedule(tags)?;
        info!(
            "Running {} steps: {}",
            order.len(),
            order.iter().map(|&idx| &self.steps[idx].name).join(", ")
        );

        let mut reports: Vec<StepReport> = order
            .iter()
            .map(|&idx| StepReport {
                name: self.steps[idx].name.clone(),
                state: StepState::Pending,
                outcome: None,
                error: None,
            })
            .collect();
        let mut state = RunState::AllPending;
        let mut abort_error = None;

        for (report, &idx) in reports.iter_mut().zip(&order) {
            state = RunState::InProgress;
            report.state = StepState::Running;
            info!("Step `{}` started", report.name);

            match self.steps[idx].action.run(ctx).await {
                Ok(outcome) => {
                    info!("Step `{}` succeeded", report.name);
                    report.state = StepState::Succeeded;
                    report.outcome = Some(outcome);
                }
                Err(e) => {
                    error!("Step `{}` failed: {}", report.name, e);
                    report.state = StepState::Failed;
                    report.error = Some(e.clone());
                    abort_error = Some(e);
                    break;
                }
            }
        }

        state = match (&abort_error, state) {
            (Some(_), _) => RunState::Aborted,
            (None, RunState::InProgress) => RunState::Completed,
            (None, state) => state,
        };

        Ok(RunReport {
            state,
            steps: reports,
            transactions: ctx.transactions().to_vec(),
            error: abort_error,
        })
    }

    /// Resolve the selection to step indices in execution order
    fn schedule(&self, tags: &[String]) -> Result<Vec<usize>, DeployError> {
        let edges = self.resolve_dependencies()?;
        let selected = self.select(tags, &edges)?;
        self.topological_order(&selected, &edges)
    }

    /// Map each step to the indices of the steps it depends on
    fn resolve_dependencies(&self) -> Result<Vec<BTreeSet<usize>>, DeployError> {
        let mut by_name = BTreeMap::new();
        for (idx, step) in self.steps.iter().enumerate() {
            if by_name.insert(step.name.as_str(), idx).is_some() {
                return Err(DeployError::Config(format!(
                    "step `{}` is declared twice",
                    step.name
                )));
            }
        }

        self.steps
            .iter()
            .enumerate()
            .map(|(idx, step)| {
                let mut deps = BTreeSet::new();
                for dependency in &step.dependencies {
                    let matched: Vec<usize> = match by_name.get(dependency.as_str()) {
                        Some(&dep) => vec![dep],
                        None => self.tagged(dependency).filter(|&dep| dep != idx).collect(),
                    };

                    if matched.is_empty() {
                        return Err(DeployError::UnknownDependency(format!(
                            "`{}` depends on `{}`, which names no step or tag",
                            step.name, dependency
                        )));
                    }
                    deps.extend(matched);
                }

                Ok(deps)
            })
            .collect()
    }

    /// The indices of the steps carrying `tag`
    fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.steps
            .iter()
            .enumerate()
            .filter(move |(_, step)| step.tags.contains(tag))
            .map(|(idx, _)| idx)
    }

    /// The steps matching `tags`, closed over their dependencies
    fn select(
        &self,
        tags: &[String],
        edges: &[BTreeSet<usize>],
    ) -> Result<BTreeSet<usize>, DeployError> {
        let mut stack: Vec<usize> = if tags.is_empty() {
            (0..self.steps.len()).collect()
        } else {
            tags.iter().flat_map(|tag| self.tagged(tag)).collect()
        };

        if stack.is_empty() {
            return Err(DeployError::NoStepsSelected(format!(
                "no step is tagged {}",
                tags.iter().map(|tag| format!("`{tag}`")).join(" or ")
            )));
        }

        let mut selected = BTreeSet::new();
        while let Some(idx) = stack.pop() {
            if selected.insert(idx) {
                stack.extend(edges[idx].iter().copied());
            }
        }

        Ok(selected)
    }

    /// Kahn's algorithm over the selected steps, always taking the earliest
    /// declared ready step
    fn topological_order(
        &self,
        selected: &BTreeSet<usize>,
        edges: &[BTreeSet<usize>],
    ) -> Result<Vec<usize>, DeployError> {
        let mut unmet: BTreeMap<usize, usize> =
            selected.iter().map(|&idx| (idx, edges[idx].len())).collect();
        let mut ready: BTreeSet<usize> = unmet
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&idx, _)| idx)
            .collect();

        let mut order = Vec::with_capacity(selected.len());
        while let Some(idx) = ready.pop_first() {
            order.push(idx);
            for &dependent in selected {
                if edges[dependent].contains(&idx) {
                    if let Some(count) = unmet.get_mut(&dependent) {
                        *count -= 1;
                        if *count == 0 {
                            ready.insert(dependent);
                        }
                    }
                }
            }
        }

        if order.len() < selected.len() {
            let stuck = selected
                .iter()
                .filter(|idx| !order.contains(*idx))
                .map(|&idx| format!("`{}`", self.steps[idx].name))
                .join(", ");
            return Err(DeployError::DependencyCycle(format!(
                "no valid order for {stuck}"
            )));
        }

        Ok(order)
    }
}
