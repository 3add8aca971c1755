//! Compile step for Android.

use async_trait::async_trait;
use buildstep_core::{
    run_command, BuildStep, CommandSpec, Result, StepContext, DEFAULT_TIMEOUT_SECS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const ENV_VAR: &str = "ANDROID_SDK_ROOT";
pub const ANDROID_SDK_ROOT: &str = "/home/chrome-bot/android-sdk-linux";

/// Configuration for [`AndroidCompile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Build target, e.g. `most` or `android_tests`.
    pub target: String,
    /// Device identifier passed to `android_make -d`.
    pub device: String,
    /// Build type, e.g. `Debug` or `Release`.
    pub build_type: String,
    /// Extra make arguments, appended in order.
    pub extra_flags: Vec<String>,
    /// Directory containing the `android/` checkout.
    pub parent_dir: PathBuf,
    pub timeout_secs: u64,
}

impl CompileConfig {
    /// Requires the `target` and `device` step arguments.
    pub fn from_context(ctx: &StepContext) -> Result<Self> {
        Ok(Self {
            target: ctx.args.require("target")?.to_string(),
            device: ctx.args.require("device")?.to_string(),
            build_type: ctx.configuration.clone(),
            extra_flags: ctx.make_flags.clone(),
            parent_dir: ctx.parent_dir.clone(),
            timeout_secs: ctx.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

/// The SDK root to build with: an existing value always wins over the default.
pub fn resolve_sdk_root(existing: Option<String>) -> String {
    match existing {
        Some(value) => value,
        None => ANDROID_SDK_ROOT.to_string(),
    }
}

/// `<parent>/android/bin/android_make <target> -d <device> BUILDTYPE=<type> [flags...]`
pub fn compile_command(
    parent_dir: &Path,
    target: &str,
    device: &str,
    build_type: &str,
    extra_flags: &[String],
) -> Vec<String> {
    let android_make = parent_dir.join("android").join("bin").join("android_make");
    let mut cmd = vec![
        android_make.to_string_lossy().to_string(),
        target.to_string(),
        "-d".to_string(),
        device.to_string(),
        format!("BUILDTYPE={build_type}"),
    ];
    cmd.extend(extra_flags.iter().cloned());
    cmd
}

/// Builds a target with the Android toolchain wrapper.
#[derive(Debug, Clone)]
pub struct AndroidCompile {
    config: CompileConfig,
}

impl AndroidCompile {
    pub fn new(config: CompileConfig) -> Self {
        Self { config }
    }

    pub fn from_context(ctx: &StepContext) -> Result<Self> {
        Ok(Self::new(CompileConfig::from_context(ctx)?))
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// The exact invocation, given the SDK root currently in the environment.
    ///
    /// The SDK root is scoped to the spawned process; the step never writes
    /// to its own environment.
    pub fn command_spec(&self, env_sdk_root: Option<String>) -> CommandSpec {
        let argv = compile_command(
            &self.config.parent_dir,
            &self.config.target,
            &self.config.device,
            &self.config.build_type,
            &self.config.extra_flags,
        );
        CommandSpec::new(argv)
            .with_env(ENV_VAR, resolve_sdk_root(env_sdk_root))
            .with_timeout(self.timeout())
    }
}

#[async_trait]
impl BuildStep for AndroidCompile {
    fn name(&self) -> &str {
        "android_compile"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn run(&self) -> Result<()> {
        let spec = self.command_spec(std::env::var(ENV_VAR).ok());
        info!(build_target = %self.config.target, device = %self.config.device, "Compiling");
        run_command(&spec).await?;
        Ok(())
    }
}
