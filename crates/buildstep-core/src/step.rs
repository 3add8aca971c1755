//! Build step lifecycle and the harness that runs a step.

use crate::error::{Result, StepError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, Instrument};
use uuid::Uuid;

/// One discrete unit of build orchestration.
#[async_trait]
pub trait BuildStep: Send + Sync {
    /// Step name used in logs.
    fn name(&self) -> &str;

    /// Timeout applied to the step's long-running commands.
    fn timeout(&self) -> Duration;

    /// Perform the step's work.
    async fn run(&self) -> Result<()>;
}

/// Lifecycle state of a step run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum StepState {
    Constructed,
    Running,
    Succeeded,
    /// Carries the error that failed the step.
    Failed(String),
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Succeeded | StepState::Failed(_))
    }
}

/// Tracks a single run through `Constructed → Running → {Succeeded, Failed}`.
#[derive(Debug)]
pub struct StepRun {
    run_id: Uuid,
    state: StepState,
}

impl Default for StepRun {
    fn default() -> Self {
        Self::new()
    }
}

impl StepRun {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: StepState::Constructed,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    pub fn start(&mut self) -> Result<()> {
        match self.state {
            StepState::Constructed => {
                self.state = StepState::Running;
                Ok(())
            }
            ref other => Err(StepError::InvalidTransition(format!(
                "cannot start a run in state {other:?}"
            ))),
        }
    }

    /// Record the outcome of a running step.
    pub fn finish(&mut self, outcome: &Result<()>) -> Result<()> {
        if self.state != StepState::Running {
            return Err(StepError::InvalidTransition(format!(
                "cannot finish a run in state {:?}",
                self.state
            )));
        }
        self.state = match outcome {
            Ok(()) => StepState::Succeeded,
            Err(e) => StepState::Failed(e.to_string()),
        };
        Ok(())
    }
}

/// Final result of running a step through the harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_name: String,
    pub run_id: Uuid,
    pub state: StepState,
    pub duration_ms: u64,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == StepState::Succeeded
    }

    /// Process exit code: 0 on success, 1 on any failure.
    pub fn exit_code(&self) -> u8 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}

/// Run a step to completion and map its result to an outcome.
///
/// Step errors never escape; they are logged and recorded in the outcome.
pub async fn run_build_step(step: &dyn BuildStep) -> StepOutcome {
    let mut run = StepRun::new();
    let span = tracing::info_span!("step", step = step.name(), run_id = %run.run_id());
    let start = Instant::now();

    let work = async {
        // A fresh run is always Constructed, so start cannot fail here.
        run.start().ok();
        info!(timeout_secs = step.timeout().as_secs(), "Running step");

        let result = step.run().await;
        match &result {
            Ok(()) => info!("Step succeeded"),
            Err(e) => error!(error = %e, "Step failed"),
        }
        run.finish(&result).ok();
    }
    .instrument(span);
    work.await;

    StepOutcome {
        step_name: step.name().to_string(),
        run_id: run.run_id(),
        state: run.state().clone(),
        duration_ms: start.elapsed().as_millis() as u64,
    }
}
