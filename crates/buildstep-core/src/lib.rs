//! buildstep-core: lifecycle and plumbing for build-slave steps
//!
//! Provides what every step shares:
//! - The [`BuildStep`] trait and the [`run_build_step`] harness
//! - Ambient step configuration ([`StepContext`], [`StepArgs`])
//! - Local and storage playback directory sets
//! - Subprocess execution with scoped environment and timeouts

pub mod config;
pub mod error;
pub mod playback_dirs;
pub mod shell;
pub mod step;
pub mod telemetry;

pub use config::{StepArgs, StepContext, DEFAULT_TIMEOUT_SECS};
pub use error::{Result, StepError};
pub use playback_dirs::{LocalPlaybackDirs, StoragePlaybackDirs};
pub use shell::{run_command, CommandOutput, CommandSpec};
pub use step::{run_build_step, BuildStep, StepOutcome, StepRun, StepState};
pub use telemetry::init_tracing;
