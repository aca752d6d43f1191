use std::path::PathBuf;
use std::time::Instant;

use gridproof_common::wait::{WaitConfig, poll_until};
use gridproof_common::{ErrorKind, GridproofError, Result};
use gridproof_config::GridproofConfig;
use gridproof_drivers::{BrowserDriver, Target};
use tracing::{error, info, warn};

use crate::artifact::{ArtifactRecord, is_png, write_artifact_async};
use crate::document::DocumentRef;
use crate::report::RunReport;
use crate::state::FlowState;
use crate::step::{Action, FlowPlan, Step};

/// Where the artifact goes and how long each kind of wait may take.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub output: PathBuf,
    /// Bound for discovering a control before interacting with it.
    pub element_wait: WaitConfig,
    /// Bound for post-conditions such as the board being populated.
    pub condition_wait: WaitConfig,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from(gridproof_config::DEFAULT_OUTPUT),
            element_wait: WaitConfig::default(),
            condition_wait: WaitConfig::default(),
        }
    }
}

impl FlowSettings {
    pub fn from_config(config: &GridproofConfig) -> Self {
        Self {
            output: config.output.clone(),
            element_wait: config.timeouts.element_wait(),
            condition_wait: config.timeouts.condition_wait(),
        }
    }
}

/// A run that stopped at a step.
///
/// Carries the state reached before the failure and the report with every
/// remaining step marked skipped.
#[derive(Debug, thiserror::Error)]
#[error("step {step:?} failed: {source}")]
pub struct FlowFailure {
    pub step: String,
    pub state: FlowState,
    #[source]
    pub source: GridproofError,
    pub report: Box<RunReport>,
}

impl FlowFailure {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Executes a [`FlowPlan`] against a [`BrowserDriver`].
#[derive(Debug, Clone)]
pub struct VerificationFlow {
    plan: FlowPlan,
    settings: FlowSettings,
}

impl VerificationFlow {
    /// Rejects plans that fail [`FlowPlan::validate`].
    pub fn new(plan: FlowPlan, settings: FlowSettings) -> Result<Self> {
        plan.validate()?;
        Ok(Self { plan, settings })
    }

    /// The New Game / Hard / New Puzzle 1 journey.
    pub fn new_puzzle(settings: FlowSettings) -> Self {
        Self {
            plan: FlowPlan::new_puzzle(),
            settings,
        }
    }

    pub fn plan(&self) -> &FlowPlan {
        &self.plan
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// The driver is left open; see [`run_and_close`](Self::run_and_close).
    pub async fn run(
        &self,
        driver: &dyn BrowserDriver,
        document: &DocumentRef,
    ) -> std::result::Result<RunReport, FlowFailure> {
        let mut report = RunReport::new(document.to_string());
        let mut state = FlowState::Pending;
        info!(
            target: "gridproof.flow",
            run_id = %report.run_id,
            %document,
            steps = self.plan.len(),
            "flow started"
        );

        let steps = self.plan.steps();
        for (index, step) in steps.iter().enumerate() {
            let started = Instant::now();
            let outcome = self.execute(driver, step, document).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let outcome = outcome.and_then(|artifact| {
                let next = state.advance(index, step.milestone.clone())?;
                Ok((artifact, next))
            });
            match outcome {
                Ok((artifact, next)) => {
                    info!(
                        target: "gridproof.flow",
                        step = %step.name,
                        milestone = %step.milestone,
                        elapsed_ms,
                        "step passed"
                    );
                    report.passed(&step.name, step.action.kind(), elapsed_ms);
                    if artifact.is_some() {
                        report.artifact = artifact;
                    }
                    state = next;
                }
                Err(err) => {
                    error!(
                        target: "gridproof.flow",
                        step = %step.name,
                        kind = %err.kind(),
                        error = %err,
                        elapsed_ms,
                        "step failed"
                    );
                    report.failed(&step.name, step.action.kind(), elapsed_ms, &err);
                    for rest in &steps[index + 1..] {
                        report.skipped(&rest.name, rest.action.kind());
                    }
                    let failed = state.fail(index);
                    report.finish(failed.clone());
                    return Err(FlowFailure {
                        step: step.name.clone(),
                        state: failed,
                        source: err,
                        report: Box::new(report),
                    });
                }
            }
        }

        report.finish(state);
        info!(target: "gridproof.flow", run_id = %report.run_id, "flow passed");
        Ok(report)
    }

    /// [`run`](Self::run), then close the session whatever the outcome.
    pub async fn run_and_close(
        &self,
        driver: &dyn BrowserDriver,
        document: &DocumentRef,
    ) -> std::result::Result<RunReport, FlowFailure> {
        let result = self.run(driver, document).await;
        if let Err(e) = driver.close().await {
            warn!(target: "gridproof.flow", error = %e, "closing browser session failed");
        }
        result
    }

    async fn execute(
        &self,
        driver: &dyn BrowserDriver,
        step: &Step,
        document: &DocumentRef,
    ) -> Result<Option<ArtifactRecord>> {
        match &step.action {
            Action::Navigate => driver.navigate(document.url()).await?,
            Action::Click { target } => driver.click(target, self.settings.element_wait).await?,
            Action::SelectOption { target, option } => {
                driver
                    .select_option(target, option, self.settings.element_wait)
                    .await?
            }
            Action::WaitForValue { target } => {
                wait_for_value(driver, target, self.settings.condition_wait).await?
            }
            Action::Screenshot => {
                let png = driver.screenshot().await?;
                if !is_png(&png) {
                    warn!(
                        target: "gridproof.flow",
                        bytes = png.len(),
                        "screenshot does not start with a PNG signature"
                    );
                }
                let record = write_artifact_async(self.settings.output.clone(), png).await?;
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

/// Poll until the first match of `target` has a non-empty value.
async fn wait_for_value(driver: &dyn BrowserDriver, target: &Target, wait: WaitConfig) -> Result<()> {
    let populated = poll_until(wait, || async move {
        let value = driver.read_value(target).await?;
        Ok::<_, GridproofError>(value.filter(|v| !v.is_empty()))
    })
    .await?;
    match populated {
        Some(_) => Ok(()),
        None => Err(GridproofError::ConditionTimeout {
            condition: format!("{target} has a non-empty value"),
            timeout_ms: wait.timeout_ms(),
        }),
    }
}
