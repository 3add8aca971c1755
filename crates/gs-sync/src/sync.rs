//! One-directional directory sync from remote storage.

use crate::error::StorageError;
use crate::{join_url, RemoteObject, RemoteStorage, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// What a sync did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Objects copied down, relative to the local directory.
    pub downloaded: Vec<String>,

    /// Objects whose local copy was already current.
    pub up_to_date: Vec<String>,
}

/// Copy `gs_base/rel_dir` into `local_dir`, fetching only objects that are
/// missing locally or newer remotely.
///
/// Each downloaded file takes the remote object's timestamp as its mtime,
/// so running again against an unchanged remote downloads nothing. Files
/// that exist only locally are left alone.
pub async fn download_directory_contents_if_changed(
    storage: &dyn RemoteStorage,
    gs_base: &str,
    rel_dir: &str,
    local_dir: &Path,
) -> Result<SyncReport> {
    info!(
        source = %join_url(gs_base, rel_dir),
        dest = %local_dir.display(),
        "Syncing directory from storage"
    );
    fs::create_dir_all(local_dir)?;

    let mut report = SyncReport::default();
    for object in storage.list(gs_base, rel_dir).await? {
        let dest = local_path_for(local_dir, &object.relative_path)?;

        if is_current(&dest, &object)? {
            debug!(path = %object.relative_path, "Up to date");
            report.up_to_date.push(object.relative_path);
            continue;
        }

        let parent = dest
            .parent()
            .ok_or_else(|| StorageError::InvalidObjectPath(object.relative_path.clone()))?;
        fs::create_dir_all(parent)?;

        // Stage next to the destination so a failed transfer never leaves a
        // partial file that looks current.
        let staging = NamedTempFile::new_in(parent)?;
        storage
            .download(gs_base, rel_dir, &object, staging.path())
            .await?;
        staging.persist(&dest)?;

        fs::File::options()
            .write(true)
            .open(&dest)?
            .set_modified(SystemTime::from(object.updated))?;

        info!(path = %object.relative_path, size = object.size, "Downloaded");
        report.downloaded.push(object.relative_path);
    }

    info!(
        downloaded = report.downloaded.len(),
        up_to_date = report.up_to_date.len(),
        "Sync finished"
    );
    Ok(report)
}

/// Whether the local copy exists and is at least as new as the remote one.
fn is_current(dest: &Path, object: &RemoteObject) -> Result<bool> {
    match fs::metadata(dest) {
        Ok(meta) if meta.is_file() => Ok(meta.modified()? >= SystemTime::from(object.updated)),
        Ok(_) => Err(StorageError::InvalidObjectPath(object.relative_path.clone())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Map a `/`-separated object path under `local_dir`, rejecting anything
/// that could escape it.
fn local_path_for(local_dir: &Path, relative_path: &str) -> Result<PathBuf> {
    let rel = Path::new(relative_path);
    let only_normal = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if relative_path.is_empty() || !only_normal {
        return Err(StorageError::InvalidObjectPath(relative_path.to_string()));
    }
    Ok(local_dir.join(rel))
}
