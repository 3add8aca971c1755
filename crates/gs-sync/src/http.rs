//! Google Storage JSON API backend.

use crate::error::StorageError;
use crate::{join_url, parse_gs_url, RemoteObject, RemoteStorage, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://storage.googleapis.com/storage/v1";
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://storage.googleapis.com";

/// Remote storage accessed over HTTP, for slaves without `gsutil`.
///
/// Only public buckets are reachable; requests are unauthenticated.
#[derive(Debug, Clone)]
pub struct HttpStorage {
    api_base: String,
    download_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectResource {
    name: String,
    updated: DateTime<Utc>,
    /// The API encodes sizes as decimal strings.
    #[serde(default)]
    size: Option<String>,
}

impl HttpStorage {
    pub fn new(api_base: &str, download_base: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gs-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            download_base: download_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Listing endpoint for `bucket`.
    fn list_url(&self, bucket: &str) -> Result<Url> {
        with_segments(&self.api_base, ["b", bucket, "o"])
    }

    /// Public URL of object `name` in `bucket`, one escaped segment per
    /// path component.
    fn object_url(&self, bucket: &str, name: &str) -> Result<Url> {
        let segments = std::iter::once(bucket).chain(name.split('/').filter(|s| !s.is_empty()));
        with_segments(&self.download_base, segments)
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_token: Option<&str>,
    ) -> Result<ObjectList> {
        let url = self.list_url(bucket)?;
        let mut query = vec![("prefix", prefix.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self.client.get(url.clone()).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Http(format!(
                "listing {} returned {}",
                url,
                response.status()
            )));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RemoteStorage for HttpStorage {
    async fn list(&self, gs_base: &str, rel_dir: &str) -> Result<Vec<RemoteObject>> {
        let (bucket, base_prefix) = parse_gs_url(gs_base)?;
        let dir = join_url(&base_prefix, rel_dir);
        let dir = dir.trim_matches('/');
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .list_page(&bucket, &prefix, page_token.as_deref())
                .await?;
            for item in page.items {
                let Some(relative_path) = item.name.strip_prefix(&prefix) else {
                    continue;
                };
                if relative_path.is_empty() || relative_path.ends_with('/') {
                    continue;
                }
                let size = match item.size.as_deref() {
                    Some(s) => s
                        .parse::<u64>()
                        .map_err(|_| StorageError::Parse(format!("bad size `{s}` for {}", item.name)))?,
                    None => 0,
                };
                objects.push(RemoteObject {
                    relative_path: relative_path.to_string(),
                    updated: item.updated,
                    size,
                });
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = objects.len(), "Listed objects over HTTP");
        Ok(objects)
    }

    async fn download(
        &self,
        gs_base: &str,
        rel_dir: &str,
        object: &RemoteObject,
        dest: &Path,
    ) -> Result<()> {
        let (bucket, base_prefix) = parse_gs_url(gs_base)?;
        let name = join_url(&join_url(&base_prefix, rel_dir), &object.relative_path);
        let url = self.object_url(&bucket, &name)?;

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Http(format!(
                "download of {} returned {}",
                url,
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}

/// Append percent-encoded path segments to `base`.
fn with_segments<'a>(base: &str, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| StorageError::InvalidUrl(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| StorageError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
