//! slave-step - run a single build-slave step
//!
//! ## Commands
//!
//! - `compile`: build a target with the Android toolchain wrapper
//! - `bench-pictures`: run bench_pictures on the host
//! - `android-bench-pictures`: run bench_pictures on an Android device
//! - `download-skps`: stage playback SKPs from Google Storage
//!
//! The process exits 0 when the step succeeds and 1 when it fails.

use anyhow::{Context, Result};
use buildstep_core::{run_build_step, BuildStep, StepArgs, StepContext, DEFAULT_TIMEOUT_SECS};
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};
use gs_sync::GsClient;
use slave_steps::{
    AndroidBenchPictures, AndroidCompile, BenchConfig, BenchPictures, DeviceRunner, DownloadSkps,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "slave-step")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a build-slave step", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Build type (Debug or Release)
    #[arg(long, global = true, env = "CONFIGURATION", default_value = "Debug")]
    configuration: String,

    /// Name of the builder running this step
    #[arg(long, global = true, env = "BUILDER_NAME", default_value = "unknown-builder")]
    builder_name: String,

    /// Directory holding per-builder perf and playback data
    #[arg(long, global = true, env = "PERF_OUTPUT_BASEDIR", default_value = "perfdata")]
    perf_output_basedir: PathBuf,

    /// Subdirectory for this builder's GM images
    #[arg(long, global = true, default_value = "base")]
    gm_image_subdir: String,

    /// Extra build flag; repeat to pass several, order is kept
    #[arg(long = "make-flags", global = true, allow_hyphen_values = true)]
    make_flags: Vec<String>,

    /// Stage SKPs through the playback framework
    #[arg(
        long,
        global = true,
        env = "USE_SKP_PLAYBACK_FRAMEWORK",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    use_skp_playback_framework: bool,

    /// Override the step's timeout, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Directory the build tools are resolved against
    #[arg(long, global = true, default_value = "..")]
    parent_dir: PathBuf,

    /// Step argument as key=value; repeat for several
    #[arg(long = "args", global = true)]
    args: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile for Android (needs target= and device= args)
    Compile,

    /// Run bench_pictures on the host
    BenchPictures,

    /// Run bench_pictures on an Android device (needs device= arg)
    AndroidBenchPictures,

    /// Download playback SKPs (optional dest_gsbase= arg)
    DownloadSkps,
}

impl Cli {
    fn step_context(&self) -> Result<StepContext> {
        let args = StepArgs::parse_pairs(&self.args).context("Invalid --args")?;
        Ok(StepContext {
            configuration: self.configuration.clone(),
            make_flags: self.make_flags.clone(),
            use_skp_playback_framework: self.use_skp_playback_framework,
            builder_name: self.builder_name.clone(),
            perf_output_basedir: self.perf_output_basedir.clone(),
            gm_image_subdir: self.gm_image_subdir.clone(),
            parent_dir: self.parent_dir.clone(),
            args,
            timeout_secs: self.timeout_secs,
        })
    }
}

fn build_step(command: &Commands, ctx: &StepContext) -> Result<Box<dyn BuildStep>> {
    let step: Box<dyn BuildStep> = match command {
        Commands::Compile => Box::new(AndroidCompile::from_context(ctx)?),
        Commands::BenchPictures => Box::new(BenchPictures::new(BenchConfig::from_context(
            ctx,
            DeviceRunner::Host,
            DEFAULT_TIMEOUT_SECS,
        )?)),
        Commands::AndroidBenchPictures => Box::new(AndroidBenchPictures::from_context(ctx)?),
        Commands::DownloadSkps => {
            let storage = GsClient::from_env().context("Failed to set up storage client")?;
            Box::new(DownloadSkps::from_context(ctx, Arc::new(storage)))
        }
    };
    Ok(step)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    buildstep_core::init_tracing(cli.json, level);

    let ctx = cli.step_context()?;
    let step = build_step(&cli.command, &ctx).context("Failed to construct step")?;

    let outcome = run_build_step(step.as_ref()).await;
    info!(
        step = %outcome.step_name,
        run_id = %outcome.run_id,
        duration_ms = outcome.duration_ms,
        exit_code = outcome.exit_code(),
        "Step finished"
    );
    Ok(ExitCode::from(outcome.exit_code()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compile_args() {
        let cli = Cli::try_parse_from([
            "slave-step",
            "--configuration",
            "Release",
            "--make-flags",
            "GYP_DEFINES=foo=1",
            "--make-flags",
            "-j8",
            "--args",
            "target=android_tests",
            "--args",
            "device=nexus7",
            "compile",
        ])
        .unwrap();
        let ctx = cli.step_context().unwrap();
        assert_eq!(ctx.configuration, "Release");
        assert_eq!(ctx.make_flags, vec!["GYP_DEFINES=foo=1", "-j8"]);
        assert_eq!(ctx.args.get("target"), Some("android_tests"));

        let step = build_step(&cli.command, &ctx).unwrap();
        assert_eq!(step.name(), "android_compile");
    }

    #[test]
    fn test_compile_without_target_is_rejected() {
        let cli = Cli::try_parse_from(["slave-step", "--args", "device=nexus7", "compile"]).unwrap();
        let ctx = cli.step_context().unwrap();
        assert!(build_step(&cli.command, &ctx).is_err());
    }

    #[test]
    fn test_malformed_args_rejected() {
        let cli = Cli::try_parse_from(["slave-step", "--args", "nexus7", "compile"]).unwrap();
        assert!(cli.step_context().is_err());
    }

    #[test]
    fn test_android_bench_default_timeout() {
        let cli = Cli::try_parse_from([
            "slave-step",
            "android-bench-pictures",
            "--args",
            "device=nexus7",
        ])
        .unwrap();
        let ctx = cli.step_context().unwrap();
        let step = build_step(&cli.command, &ctx).unwrap();
        assert_eq!(step.timeout().as_secs(), 134400);
    }

    #[test]
    fn test_download_skps_flag() {
        let cli = Cli::try_parse_from([
            "slave-step",
            "--use-skp-playback-framework",
            "download-skps",
        ])
        .unwrap();
        let ctx = cli.step_context().unwrap();
        assert!(ctx.use_skp_playback_framework);
        let step = build_step(&cli.command, &ctx).unwrap();
        assert_eq!(step.name(), "download_skps");
    }

    #[test]
    fn test_playback_flag_from_env_accepts_numeric() {
        std::env::set_var("USE_SKP_PLAYBACK_FRAMEWORK", "1");
        let on = Cli::try_parse_from(["slave-step", "download-skps"]);
        std::env::set_var("USE_SKP_PLAYBACK_FRAMEWORK", "0");
        let off = Cli::try_parse_from(["slave-step", "download-skps"]);
        std::env::remove_var("USE_SKP_PLAYBACK_FRAMEWORK");

        assert!(on.unwrap().use_skp_playback_framework);
        assert!(!off.unwrap().use_skp_playback_framework);
    }
}
