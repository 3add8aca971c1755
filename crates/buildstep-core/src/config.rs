//! Step configuration shared by every step.

use crate::error::{Result, StepError};
use crate::playback_dirs::{LocalPlaybackDirs, StoragePlaybackDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for a step's external commands, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 9600;

/// Step-specific `key=value` arguments, in the order they were given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepArgs(Vec<(String, String)>);

impl StepArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` pairs. The value may itself contain `=`.
    pub fn parse_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                StepError::InvalidConfig(format!("argument `{pair}` is not of the form key=value"))
            })?;
            if key.is_empty() {
                return Err(StepError::InvalidConfig(format!(
                    "argument `{pair}` has an empty key"
                )));
            }
            args = args.with(key, value);
        }
        Ok(args)
    }

    /// Add or replace an argument.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`StepArgs::get`], but a missing or empty value is an error.
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(StepError::InvalidConfig(format!(
                "missing required argument `{key}`"
            ))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Ambient configuration handed to every step by the harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepContext {
    /// Build type, e.g. `Debug` or `Release`.
    pub configuration: String,

    /// Extra flags appended to build commands, in order.
    pub make_flags: Vec<String>,

    /// Whether the SKP playback input pipeline is active for this run.
    pub use_skp_playback_framework: bool,

    pub builder_name: String,

    /// Directory under which per-builder playback data lives.
    pub perf_output_basedir: PathBuf,

    pub gm_image_subdir: String,

    /// Directory the build tools are resolved against.
    pub parent_dir: PathBuf,

    /// Step-specific arguments.
    pub args: StepArgs,

    /// Timeout override in seconds; steps fall back to their own default.
    pub timeout_secs: Option<u64>,
}

impl Default for StepContext {
    fn default() -> Self {
        Self {
            configuration: "Debug".to_string(),
            make_flags: Vec::new(),
            use_skp_playback_framework: false,
            builder_name: "unknown-builder".to_string(),
            perf_output_basedir: PathBuf::from("perfdata"),
            gm_image_subdir: "base".to_string(),
            parent_dir: PathBuf::from(".."),
            args: StepArgs::new(),
            timeout_secs: None,
        }
    }
}

impl StepContext {
    pub fn local_playback_dirs(&self) -> LocalPlaybackDirs {
        LocalPlaybackDirs::new(
            &self.perf_output_basedir,
            &self.builder_name,
            &self.gm_image_subdir,
        )
    }

    pub fn storage_playback_dirs(&self) -> StoragePlaybackDirs {
        StoragePlaybackDirs::new(&self.gm_image_subdir)
    }

    /// The configured timeout, or `default_secs` when none was given.
    pub fn timeout_or(&self, default_secs: u64) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(default_secs))
    }

    /// Whether this is an optimized build.
    pub fn is_release(&self) -> bool {
        self.configuration.eq_ignore_ascii_case("release")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_keeps_order() {
        let args = StepArgs::parse_pairs(["target=android_tests", "device=nexus7"]).unwrap();
        let keys: Vec<_> = args.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["target", "device"]);
        assert_eq!(args.get("device"), Some("nexus7"));
    }

    #[test]
    fn test_parse_pairs_value_with_equals() {
        let args = StepArgs::parse_pairs(["flags=GYP_DEFINES=foo=1"]).unwrap();
        assert_eq!(args.get("flags"), Some("GYP_DEFINES=foo=1"));
    }

    #[test]
    fn test_parse_pairs_rejects_bare_word() {
        assert!(matches!(
            StepArgs::parse_pairs(["nexus7"]),
            Err(StepError::InvalidConfig(_))
        ));
        assert!(StepArgs::parse_pairs(["=value"]).is_err());
    }

    #[test]
    fn test_with_replaces_existing_key() {
        let args = StepArgs::new().with("device", "a").with("device", "b");
        assert_eq!(args.iter().count(), 1);
        assert_eq!(args.get("device"), Some("b"));
    }

    #[test]
    fn test_require() {
        let args = StepArgs::new().with("target", "most").with("dest_gsbase", "");
        assert_eq!(args.require("target").unwrap(), "most");
        assert!(args.require("device").is_err());
        assert!(args.require("dest_gsbase").is_err());
    }

    #[test]
    fn test_timeout_or() {
        let mut ctx = StepContext::default();
        assert_eq!(ctx.timeout_or(134400), Duration::from_secs(134400));
        ctx.timeout_secs = Some(60);
        assert_eq!(ctx.timeout_or(134400), Duration::from_secs(60));
    }

    #[test]
    fn test_is_release() {
        let mut ctx = StepContext::default();
        assert!(!ctx.is_release());
        ctx.configuration = "Release".to_string();
        assert!(ctx.is_release());
    }
}
