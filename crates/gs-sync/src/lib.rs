//! gs-sync: remote storage access for build slaves
//!
//! Lists and downloads objects under a Google Storage base, either through
//! the `gsutil` CLI or the JSON API, and keeps a local directory in step
//! with a remote one.
//!
//! The sync is one-directional: remote is authoritative for files present
//! on both sides, and local-only files are never removed.

pub mod client;
pub mod error;
pub mod fakes;
pub mod gsutil;
pub mod http;
pub mod sync;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use client::{GsClient, GsConfig};
pub use error::StorageError;
pub use gsutil::GsUtilStorage;
pub use http::HttpStorage;
pub use sync::{download_directory_contents_if_changed, SyncReport};

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage base used when a step is not given one.
pub const DEFAULT_PERFDATA_GS_BASE: &str = "gs://chromium-skia-gm";

/// Written when an upload to a storage directory starts.
pub const TIMESTAMP_STARTED_FILENAME: &str = "TIMESTAMP_LAST_UPLOAD_STARTED";

/// Written when an upload to a storage directory completes.
pub const TIMESTAMP_COMPLETED_FILENAME: &str = "TIMESTAMP_LAST_UPLOAD_COMPLETED";

/// Written when the last image comparison succeeded.
pub const LAST_COMPARISON_FILENAME: &str = "LAST_COMPARISON_SUCCEEDED";

/// Files that record pipeline progress and survive directory cleanup.
pub const SENTINEL_FILENAMES: [&str; 2] = [TIMESTAMP_COMPLETED_FILENAME, LAST_COMPARISON_FILENAME];

/// Whether `file_name` is one of the [`SENTINEL_FILENAMES`].
pub fn is_sentinel(file_name: &str) -> bool {
    SENTINEL_FILENAMES.contains(&file_name)
}

/// An object under a remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// `/`-separated path relative to the listed directory.
    pub relative_path: String,

    /// Last modification time on the remote side.
    pub updated: DateTime<Utc>,

    /// Size in bytes.
    pub size: u64,
}

/// Directory-level access to a remote object store.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// List every object below `gs_base/rel_dir`, recursively.
    async fn list(&self, gs_base: &str, rel_dir: &str) -> Result<Vec<RemoteObject>>;

    /// Download one listed object to `dest`, overwriting it.
    async fn download(
        &self,
        gs_base: &str,
        rel_dir: &str,
        object: &RemoteObject,
        dest: &Path,
    ) -> Result<()>;
}

/// Split `gs://bucket/some/prefix` into `("bucket", "some/prefix")`.
pub fn parse_gs_url(url: &str) -> Result<(String, String)> {
    let rest = url
        .strip_prefix("gs://")
        .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;
    let (bucket, prefix) = match rest.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix.trim_matches('/')),
        None => (rest, ""),
    };
    if bucket.is_empty() {
        return Err(StorageError::InvalidUrl(url.to_string()));
    }
    Ok((bucket.to_string(), prefix.to_string()))
}

/// Join a storage base and relative path with exactly one `/` between parts.
pub fn join_url(base: &str, rel: &str) -> String {
    let base = base.trim_end_matches('/');
    let rel = rel.trim_matches('/');
    if rel.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{rel}")
    }
}
