//! Integration tests running the steps through the harness.
//!
//! The Android wrappers are replaced by shell scripts in a temporary
//! parent directory that record how they were invoked.

use buildstep_core::{run_build_step, BuildStep, StepArgs, StepContext, StepError, StepState};
use chrono::{TimeZone, Utc};
use gs_sync::fakes::MemoryStorage;
use slave_steps::android_compile::{ANDROID_SDK_ROOT, ENV_VAR};
use slave_steps::{AndroidBenchPictures, AndroidCompile, DownloadSkps};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[cfg(unix)]
fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn compile_context(parent: &Path) -> StepContext {
    StepContext {
        configuration: "Release".to_string(),
        make_flags: vec!["GYP_DEFINES=foo=1".to_string(), "-j8".to_string()],
        parent_dir: parent.to_path_buf(),
        args: StepArgs::new()
            .with("target", "android_tests")
            .with("device", "nexus7"),
        ..StepContext::default()
    }
}

/// Test: compile invokes android_make once with the assembled arguments
#[cfg(unix)]
#[tokio::test]
async fn test_compile_invokes_android_make() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path();
    let record = parent.join("invocation.txt");
    write_script(
        &parent.join("android/bin/android_make"),
        &format!(
            "echo \"SDK=$ANDROID_SDK_ROOT\" >> {rec}\nfor a in \"$@\"; do echo \"$a\" >> {rec}; done",
            rec = record.display()
        ),
    );

    let env_before = std::env::var(ENV_VAR).ok();
    let step = AndroidCompile::from_context(&compile_context(parent)).unwrap();
    let outcome = run_build_step(&step).await;

    assert!(outcome.succeeded(), "compile failed: {:?}", outcome.state);
    assert_eq!(outcome.exit_code(), 0);

    let lines: Vec<String> = fs::read_to_string(&record)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    let expected_sdk = env_before.clone().unwrap_or_else(|| ANDROID_SDK_ROOT.to_string());
    assert_eq!(lines[0], format!("SDK={expected_sdk}"));
    assert_eq!(
        &lines[1..],
        &[
            "android_tests",
            "-d",
            "nexus7",
            "BUILDTYPE=Release",
            "GYP_DEFINES=foo=1",
            "-j8"
        ]
    );

    assert_eq!(std::env::var(ENV_VAR).ok(), env_before, "process env untouched");
}

/// Test: a failing build tool fails the step with a non-zero exit code
#[cfg(unix)]
#[tokio::test]
async fn test_compile_failure_maps_to_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path();
    write_script(&parent.join("android/bin/android_make"), "echo broken >&2\nexit 2");

    let step = AndroidCompile::from_context(&compile_context(parent)).unwrap();
    match step.run().await {
        Err(StepError::CommandFailed { exit_code, stderr, .. }) => {
            assert_eq!(exit_code, 2);
            assert!(stderr.contains("broken"));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }

    let outcome = run_build_step(&step).await;
    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(outcome.state, StepState::Failed(_)));
}

/// Test: a missing build tool is a step failure, not a panic
#[tokio::test]
async fn test_compile_without_toolchain_fails() {
    let dir = tempfile::tempdir().unwrap();
    let step = AndroidCompile::from_context(&compile_context(dir.path())).unwrap();
    let outcome = run_build_step(&step).await;
    assert!(!outcome.succeeded());
}

/// Test: android bench runs bench_pictures through android_run_skia
#[cfg(unix)]
#[tokio::test]
async fn test_android_bench_runs_wrapper() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path().join("skia");
    let record = dir.path().join("bench.txt");
    write_script(
        &parent.join("android/bin/android_run_skia"),
        &format!(
            "for a in \"$@\"; do echo \"$a\" >> {rec}; done",
            rec = record.display()
        ),
    );

    let ctx = StepContext {
        configuration: "Debug".to_string(),
        parent_dir: parent.clone(),
        perf_output_basedir: dir.path().join("perfdata"),
        builder_name: "Perf-Android-Nexus7".to_string(),
        args: StepArgs::new()
            .with("device", "nexus7")
            .with("bench_repeats", "2"),
        ..StepContext::default()
    };
    fs::create_dir_all(ctx.local_playback_dirs().playback_skp_dir()).unwrap();

    let step = AndroidBenchPictures::from_context(&ctx).unwrap();
    let outcome = run_build_step(&step).await;
    assert!(outcome.succeeded(), "bench failed: {:?}", outcome.state);

    let recorded = fs::read_to_string(&record).unwrap();
    let args: Vec<&str> = recorded.lines().collect();
    let skp_dir = ctx.local_playback_dirs().playback_skp_dir();
    assert_eq!(
        args,
        vec![
            "-d",
            "nexus7",
            "--debug",
            "bench_pictures",
            skp_dir.to_str().unwrap(),
            "--repeat",
            "2",
            "--timers",
            "wc",
        ]
    );
}

fn sync_context(basedir: &Path) -> StepContext {
    StepContext {
        use_skp_playback_framework: true,
        perf_output_basedir: basedir.to_path_buf(),
        builder_name: "Perf-Android-Nexus7".to_string(),
        gm_image_subdir: "base-android-nexus-7".to_string(),
        ..StepContext::default()
    }
}

/// Test: full SKP download prunes gm-actual, keeps sentinels, and fetches SKPs
#[tokio::test]
async fn test_download_skps_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = sync_context(dir.path());
    let local = ctx.local_playback_dirs();

    let gm_actual = local.playback_gm_actual_dir();
    fs::create_dir_all(gm_actual.join("sub")).unwrap();
    fs::write(gm_actual.join("old_result.png"), b"png").unwrap();
    fs::write(gm_actual.join("sub/old_result.json"), b"{}").unwrap();
    fs::write(gm_actual.join(gs_sync::TIMESTAMP_COMPLETED_FILENAME), b"1367409600").unwrap();
    fs::write(gm_actual.join(gs_sync::LAST_COMPARISON_FILENAME), b"").unwrap();

    let storage = Arc::new(MemoryStorage::new());
    let updated = Utc.with_ymd_and_hms(2013, 5, 1, 12, 0, 0).unwrap();
    storage.put(
        gs_sync::DEFAULT_PERFDATA_GS_BASE,
        "playback/skps",
        "desk_amazon.skp",
        b"skp-bytes",
        updated,
    );

    let step = DownloadSkps::from_context(&ctx, storage.clone());
    let outcome = run_build_step(&step).await;
    assert!(outcome.succeeded(), "download failed: {:?}", outcome.state);

    assert!(!gm_actual.join("old_result.png").exists());
    assert!(!gm_actual.join("sub/old_result.json").exists());
    assert!(gm_actual.join("sub").is_dir());
    assert!(gm_actual.join(gs_sync::TIMESTAMP_COMPLETED_FILENAME).exists());
    assert!(gm_actual.join(gs_sync::LAST_COMPARISON_FILENAME).exists());
    assert_eq!(
        fs::read(local.playback_skp_dir().join("desk_amazon.skp")).unwrap(),
        b"skp-bytes"
    );
    assert_eq!(storage.download_calls(), 1);

    // Unchanged remote: nothing new is fetched and the SKPs stay put.
    let outcome = run_build_step(&step).await;
    assert!(outcome.succeeded());
    assert_eq!(storage.download_calls(), 1);
    assert_eq!(
        fs::read(local.playback_skp_dir().join("desk_amazon.skp")).unwrap(),
        b"skp-bytes"
    );
}

/// Test: dest_gsbase overrides the default storage base
#[tokio::test]
async fn test_download_skps_uses_dest_gsbase() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = sync_context(dir.path());
    ctx.args = StepArgs::new().with("dest_gsbase", "gs://my-perf-bucket");

    let storage = Arc::new(MemoryStorage::new());
    let updated = Utc.with_ymd_and_hms(2013, 5, 1, 12, 0, 0).unwrap();
    storage.put("gs://my-perf-bucket", "playback/skps", "a.skp", b"a", updated);
    storage.put(
        gs_sync::DEFAULT_PERFDATA_GS_BASE,
        "playback/skps",
        "b.skp",
        b"b",
        updated,
    );

    let step = DownloadSkps::from_context(&ctx, storage.clone());
    assert!(run_build_step(&step).await.succeeded());

    let skp_dir = ctx.local_playback_dirs().playback_skp_dir();
    assert!(skp_dir.join("a.skp").exists());
    assert!(!skp_dir.join("b.skp").exists());
}

/// Test: transport failures fail the step
#[tokio::test]
async fn test_download_skps_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = sync_context(dir.path());

    let storage = Arc::new(MemoryStorage::new());
    let updated = Utc.with_ymd_and_hms(2013, 5, 1, 12, 0, 0).unwrap();
    storage.put(
        gs_sync::DEFAULT_PERFDATA_GS_BASE,
        "playback/skps",
        "a.skp",
        b"a",
        updated,
    );
    storage.fail_downloads_with("connection reset");

    let step = DownloadSkps::from_context(&ctx, storage);
    match step.run().await {
        Err(StepError::Storage(e)) => assert!(e.to_string().contains("connection reset")),
        other => panic!("expected storage error, got {other:?}"),
    }
    assert_eq!(run_build_step(&step).await.exit_code(), 1);
}
