//! `gsutil` command-line backend.

use crate::error::StorageError;
use crate::{join_url, RemoteObject, RemoteStorage, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Remote storage accessed by shelling out to `gsutil`.
#[derive(Debug, Clone)]
pub struct GsUtilStorage {
    gsutil: PathBuf,
}

impl Default for GsUtilStorage {
    fn default() -> Self {
        Self::new("gsutil")
    }
}

impl GsUtilStorage {
    pub fn new(gsutil: impl Into<PathBuf>) -> Self {
        Self {
            gsutil: gsutil.into(),
        }
    }

    async fn gsutil(&self, args: &[&str]) -> Result<String> {
        debug!(gsutil = %self.gsutil.display(), ?args, "Running gsutil");
        let output = Command::new(&self.gsutil)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StorageError::GsutilNotFound
                } else {
                    StorageError::Io(e)
                }
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(StorageError::GsutilCommandFailed(stderr.trim().to_string()))
        }
    }
}

#[async_trait]
impl RemoteStorage for GsUtilStorage {
    async fn list(&self, gs_base: &str, rel_dir: &str) -> Result<Vec<RemoteObject>> {
        let url = join_url(gs_base, rel_dir);
        match self.gsutil(&["ls", "-l", "-r", url.as_str()]).await {
            Ok(listing) => parse_long_listing(&listing, &url),
            // An absent directory lists as an error; treat it as empty.
            Err(StorageError::GsutilCommandFailed(msg)) if msg.contains("matched no objects") => {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn download(
        &self,
        gs_base: &str,
        rel_dir: &str,
        object: &RemoteObject,
        dest: &Path,
    ) -> Result<()> {
        let url = join_url(&join_url(gs_base, rel_dir), &object.relative_path);
        let dest = dest.to_string_lossy();
        self.gsutil(&["cp", url.as_str(), &*dest]).await.map(|_| ())
    }
}

/// Parse `gsutil ls -l -r` output for objects under `dir_url`.
///
/// Object lines look like `   1234  2013-05-01T12:00:00Z  gs://b/dir/a.skp`.
/// The URL is everything after the timestamp, so names may contain spaces.
/// Directory headers, placeholder objects and the `TOTAL:` line are skipped.
pub fn parse_long_listing(listing: &str, dir_url: &str) -> Result<Vec<RemoteObject>> {
    let prefix = format!("{}/", dir_url.trim_end_matches('/'));
    let mut objects = Vec::new();

    for line in listing.lines() {
        let line = line.trim_end_matches('\r');
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with("TOTAL:")
            || (trimmed.starts_with("gs://") && trimmed.ends_with(':'))
        {
            continue;
        }

        let fields = next_field(line).and_then(|(size, rest)| {
            next_field(rest).map(|(updated, url)| (size, updated, url))
        });
        let Some((size, updated, url)) = fields else {
            if trimmed.contains(prefix.as_str()) {
                return Err(StorageError::Parse(format!(
                    "unparseable listing line `{trimmed}`"
                )));
            }
            continue;
        };
        if url.ends_with('/') {
            continue;
        }
        let Some(relative_path) = url.strip_prefix(&prefix) else {
            continue;
        };

        let size = size
            .parse::<u64>()
            .map_err(|_| StorageError::Parse(format!("bad size in line `{trimmed}`")))?;
        let updated = DateTime::parse_from_rfc3339(updated)
            .map_err(|_| StorageError::Parse(format!("bad timestamp in line `{trimmed}`")))?
            .with_timezone(&Utc);

        objects.push(RemoteObject {
            relative_path: relative_path.to_string(),
            updated,
            size,
        });
    }

    Ok(objects)
}

/// Split off the first whitespace-delimited field, returning it and the rest
/// with leading whitespace removed.
fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace)?;
    let rest = s[end..].trim_start();
    (!rest.is_empty()).then(|| (&s[..end], rest))
}
