//! Download the SKPs.

use async_trait::async_trait;
use buildstep_core::{
    BuildStep, LocalPlaybackDirs, Result, StepContext, StoragePlaybackDirs, DEFAULT_TIMEOUT_SECS,
};
use gs_sync::{download_directory_contents_if_changed, is_sentinel, RemoteStorage, SyncReport};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Configuration for [`DownloadSkps`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// When false the step does nothing at all.
    pub use_playback_framework: bool,
    /// Storage base override; the perf-data base is used when absent.
    pub dest_storage_base: Option<String>,
    pub local_dirs: LocalPlaybackDirs,
    pub storage_dirs: StoragePlaybackDirs,
    pub timeout_secs: u64,
}

impl SyncConfig {
    /// Reads the optional `dest_gsbase` step argument; an empty value
    /// counts as absent.
    pub fn from_context(ctx: &StepContext) -> Self {
        Self {
            use_playback_framework: ctx.use_skp_playback_framework,
            dest_storage_base: ctx
                .args
                .get("dest_gsbase")
                .filter(|base| !base.is_empty())
                .map(str::to_string),
            local_dirs: ctx.local_playback_dirs(),
            storage_dirs: ctx.storage_playback_dirs(),
            timeout_secs: ctx.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// The storage base SKPs are fetched from.
    pub fn storage_base(&self) -> &str {
        self.dest_storage_base
            .as_deref()
            .unwrap_or(gs_sync::DEFAULT_PERFDATA_GS_BASE)
    }
}

/// Stages SKPs produced by webpage playback from storage onto the slave.
pub struct DownloadSkps {
    config: SyncConfig,
    storage: Arc<dyn RemoteStorage>,
}

impl DownloadSkps {
    pub fn new(config: SyncConfig, storage: Arc<dyn RemoteStorage>) -> Self {
        Self { config, storage }
    }

    pub fn from_context(ctx: &StepContext, storage: Arc<dyn RemoteStorage>) -> Self {
        Self::new(SyncConfig::from_context(ctx), storage)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Creates the local SKP directory and empties the gm-actual directory,
    /// keeping its sentinel files. Returns the removed files.
    pub fn create_local_storage_dirs(&self) -> Result<Vec<PathBuf>> {
        let skp_dir = self.config.local_dirs.playback_skp_dir();
        if !skp_dir.exists() {
            fs::create_dir_all(&skp_dir)?;
        }

        let gm_actual_dir = self.config.local_dirs.playback_gm_actual_dir();
        if gm_actual_dir.exists() {
            prune_keeping_sentinels(&gm_actual_dir)
        } else {
            fs::create_dir_all(&gm_actual_dir)?;
            Ok(Vec::new())
        }
    }

    /// Copies SKPs from storage when their timestamps differ.
    pub async fn download_skps_from_storage(&self) -> Result<SyncReport> {
        info!("========Downloading skp files from Google Storage========");
        let report = download_directory_contents_if_changed(
            self.storage.as_ref(),
            self.config.storage_base(),
            &self.config.storage_dirs.playback_skp_dir(),
            &self.config.local_dirs.playback_skp_dir(),
        )
        .await?;
        Ok(report)
    }
}

/// Delete every file below `dir` except sentinel files. Directories stay.
///
/// Symlinks to directories count as directories and are left alone. A `dir`
/// that is not a directory is ignored.
pub fn prune_keeping_sentinels(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    if !dir.is_dir() {
        return Ok(removed);
    }
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }
        if entry.path_is_symlink() && fs::metadata(entry.path()).is_ok_and(|m| m.is_dir()) {
            continue;
        }
        let keep = entry.file_name().to_str().is_some_and(is_sentinel);
        if keep {
            debug!(path = %entry.path().display(), "Keeping sentinel");
            continue;
        }
        fs::remove_file(entry.path())?;
        removed.push(entry.into_path());
    }
    info!(dir = %dir.display(), removed = removed.len(), "Pruned directory");
    Ok(removed)
}

#[async_trait]
impl BuildStep for DownloadSkps {
    fn name(&self) -> &str {
        "download_skps"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    // With the playback framework off this succeeds without touching disk or
    // storage, even though later steps may then find no SKPs.
    async fn run(&self) -> Result<()> {
        if !self.config.use_playback_framework {
            info!("SKP playback framework disabled; nothing to download");
            return Ok(());
        }

        self.create_local_storage_dirs()?;
        self.download_skps_from_storage().await?;
        Ok(())
    }
}
