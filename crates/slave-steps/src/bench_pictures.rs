//! Run the `bench_pictures` executable over the playback SKPs.
//!
//! [`BenchPictures`] holds the behavior shared by every platform; where the
//! executable actually runs is decided by a [`DeviceRunner`].

use async_trait::async_trait;
use buildstep_core::{run_command, BuildStep, CommandSpec, Result, StepContext, StepError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const BENCH_PICTURES: &str = "bench_pictures";
pub const DEFAULT_REPEATS: u32 = 20;
pub const DEFAULT_TIMERS: &str = "wc";

/// Where the benchmark executable runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceRunner {
    /// Run the locally built binary from `out/<build_type>/`.
    Host,
    /// Run on an attached device through `android_run_skia`.
    Android { device: String },
}

impl DeviceRunner {
    /// Full command line for running `binary` with `args`.
    pub fn command(
        &self,
        parent_dir: &Path,
        build_type: &str,
        binary: &str,
        args: &[String],
    ) -> Vec<String> {
        let mut cmd = match self {
            DeviceRunner::Host => {
                let exe = parent_dir.join("out").join(build_type).join(binary);
                vec![exe.to_string_lossy().to_string()]
            }
            DeviceRunner::Android { device } => {
                let wrapper = parent_dir
                    .join("android")
                    .join("bin")
                    .join("android_run_skia");
                let build_flag = if build_type.eq_ignore_ascii_case("release") {
                    "--release"
                } else {
                    "--debug"
                };
                vec![
                    wrapper.to_string_lossy().to_string(),
                    "-d".to_string(),
                    device.clone(),
                    build_flag.to_string(),
                    binary.to_string(),
                ]
            }
        };
        cmd.extend(args.iter().cloned());
        cmd
    }
}

/// Configuration for a `bench_pictures` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchConfig {
    pub runner: DeviceRunner,
    pub build_type: String,
    pub parent_dir: PathBuf,
    /// Staged SKPs on the slave; the bench is skipped when this is missing.
    pub local_skp_dir: PathBuf,
    /// SKP directory as seen by the executable, when it differs from the
    /// local one (e.g. a path on the device).
    pub target_skp_dir: Option<String>,
    pub repeats: u32,
    pub timers: String,
    /// Additional `bench_pictures` flags, appended in order.
    pub extra_args: Vec<String>,
    pub timeout_secs: u64,
}

impl BenchConfig {
    /// Reads optional `bench_repeats`, `bench_timers`, `bench_args` and
    /// `device_skp_dir` step arguments.
    pub fn from_context(
        ctx: &StepContext,
        runner: DeviceRunner,
        default_timeout_secs: u64,
    ) -> Result<Self> {
        let repeats = match ctx.args.get("bench_repeats") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                StepError::InvalidConfig(format!("bench_repeats `{raw}` is not a number"))
            })?,
            None => DEFAULT_REPEATS,
        };
        if repeats == 0 {
            return Err(StepError::InvalidConfig(
                "bench_repeats must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            runner,
            build_type: ctx.configuration.clone(),
            parent_dir: ctx.parent_dir.clone(),
            local_skp_dir: ctx.local_playback_dirs().playback_skp_dir(),
            target_skp_dir: ctx.args.get("device_skp_dir").map(str::to_string),
            repeats,
            timers: ctx
                .args
                .get("bench_timers")
                .unwrap_or(DEFAULT_TIMERS)
                .to_string(),
            extra_args: ctx
                .args
                .get("bench_args")
                .map(|a| a.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            timeout_secs: ctx.timeout_secs.unwrap_or(default_timeout_secs),
        })
    }
}

/// Shared `bench_pictures` behavior.
#[derive(Debug, Clone)]
pub struct BenchPictures {
    config: BenchConfig,
}

impl BenchPictures {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Arguments passed to `bench_pictures` itself.
    pub fn bench_args(&self) -> Vec<String> {
        let skp_dir = match &self.config.target_skp_dir {
            Some(dir) => dir.clone(),
            None => self.config.local_skp_dir.to_string_lossy().to_string(),
        };
        let mut args = vec![
            skp_dir,
            "--repeat".to_string(),
            self.config.repeats.to_string(),
            "--timers".to_string(),
            self.config.timers.clone(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    pub fn command_spec(&self) -> CommandSpec {
        let argv = self.config.runner.command(
            &self.config.parent_dir,
            &self.config.build_type,
            BENCH_PICTURES,
            &self.bench_args(),
        );
        CommandSpec::new(argv).with_timeout(Duration::from_secs(self.config.timeout_secs))
    }

    /// Run the benchmark, or skip it when no SKPs have been staged.
    pub async fn bench(&self) -> Result<()> {
        if !self.config.local_skp_dir.is_dir() {
            warn!(
                skp_dir = %self.config.local_skp_dir.display(),
                "No SKP directory; skipping bench_pictures"
            );
            return Ok(());
        }
        info!(runner = ?self.config.runner, repeats = self.config.repeats, "Benchmarking pictures");
        run_command(&self.command_spec()).await?;
        Ok(())
    }
}

#[async_trait]
impl BuildStep for BenchPictures {
    fn name(&self) -> &str {
        "bench_pictures"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn run(&self) -> Result<()> {
        self.bench().await
    }
}
