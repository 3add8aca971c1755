//! In-memory fakes for storage traits (testing only)
//!
//! `MemoryStorage` satisfies the [`RemoteStorage`] contract without any
//! network access and counts the calls made against it.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::{join_url, RemoteObject, RemoteStorage, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    contents: Vec<u8>,
    updated: DateTime<Utc>,
}

/// In-memory object store keyed by full object URL.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    list_calls: AtomicUsize,
    download_calls: AtomicUsize,
    fail_downloads: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) `gs_base/rel_dir/relative_path`.
    pub fn put(
        &self,
        gs_base: &str,
        rel_dir: &str,
        relative_path: &str,
        contents: &[u8],
        updated: DateTime<Utc>,
    ) {
        let key = join_url(&join_url(gs_base, rel_dir), relative_path);
        self.objects.lock().unwrap().insert(
            key,
            StoredObject {
                contents: contents.to_vec(),
                updated,
            },
        );
    }

    /// Make every subsequent download fail with an HTTP error.
    pub fn fail_downloads_with(&self, message: &str) {
        *self.fail_downloads.lock().unwrap() = Some(message.to_string());
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    pub fn calls(&self) -> usize {
        self.list_calls() + self.download_calls()
    }
}

#[async_trait]
impl RemoteStorage for MemoryStorage {
    async fn list(&self, gs_base: &str, rel_dir: &str) -> Result<Vec<RemoteObject>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let prefix = format!("{}/", join_url(gs_base, rel_dir));
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter_map(|(key, obj)| {
                key.strip_prefix(&prefix).map(|rel| RemoteObject {
                    relative_path: rel.to_string(),
                    updated: obj.updated,
                    size: obj.contents.len() as u64,
                })
            })
            .collect())
    }

    async fn download(
        &self,
        gs_base: &str,
        rel_dir: &str,
        object: &RemoteObject,
        dest: &Path,
    ) -> Result<()> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_downloads.lock().unwrap().clone() {
            return Err(StorageError::Http(message));
        }
        let key = join_url(&join_url(gs_base, rel_dir), &object.relative_path);
        let contents = self
            .objects
            .lock()
            .unwrap()
            .get(&key)
            .map(|o| o.contents.clone())
            .ok_or_else(|| StorageError::Http(format!("404 Not Found: {key}")))?;
        std::fs::write(dest, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_list_only_returns_objects_under_dir() {
        let storage = MemoryStorage::new();
        let t = Utc.with_ymd_and_hms(2013, 5, 1, 0, 0, 0).unwrap();
        storage.put("gs://b", "playback/skps", "a.skp", b"a", t);
        storage.put("gs://b", "playback/skps-old", "b.skp", b"b", t);

        let listed = storage.list("gs://b", "playback/skps").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].relative_path, "a.skp");
        assert_eq!(storage.list_calls(), 1);
    }
}
