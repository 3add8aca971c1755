//! Local and storage locations of the SKP playback data.
//!
//! Local paths live under `<perf_output_basedir>/<builder_name>/playback`;
//! storage paths are relative to a storage base such as `gs://bucket`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ROOT_PLAYBACK_DIR_NAME: &str = "playback";
pub const SKPICTURES_DIR_NAME: &str = "skps";
pub const GM_ACTUAL_DIR_NAME: &str = "gm-actual";
pub const GM_EXPECTED_DIR_NAME: &str = "gm-expected";

/// Playback directories on the slave's disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPlaybackDirs {
    root: PathBuf,
    gm_image_subdir: String,
}

impl LocalPlaybackDirs {
    pub fn new(perf_output_basedir: &Path, builder_name: &str, gm_image_subdir: &str) -> Self {
        Self {
            root: perf_output_basedir
                .join(builder_name)
                .join(ROOT_PLAYBACK_DIR_NAME),
            gm_image_subdir: gm_image_subdir.to_string(),
        }
    }

    pub fn playback_root_dir(&self) -> &Path {
        &self.root
    }

    /// Where downloaded SKPs are staged.
    pub fn playback_skp_dir(&self) -> PathBuf {
        self.root.join(SKPICTURES_DIR_NAME)
    }

    /// Where rendered images are written before comparison.
    pub fn playback_gm_actual_dir(&self) -> PathBuf {
        self.root
            .join(GM_ACTUAL_DIR_NAME)
            .join(&self.gm_image_subdir)
    }

    pub fn playback_gm_expected_dir(&self) -> PathBuf {
        self.root
            .join(GM_EXPECTED_DIR_NAME)
            .join(&self.gm_image_subdir)
    }
}

/// Playback directories relative to a storage base. Always `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePlaybackDirs {
    gm_image_subdir: String,
}

impl StoragePlaybackDirs {
    pub fn new(gm_image_subdir: &str) -> Self {
        Self {
            gm_image_subdir: gm_image_subdir.to_string(),
        }
    }

    pub fn playback_root_dir(&self) -> String {
        ROOT_PLAYBACK_DIR_NAME.to_string()
    }

    pub fn playback_skp_dir(&self) -> String {
        format!("{ROOT_PLAYBACK_DIR_NAME}/{SKPICTURES_DIR_NAME}")
    }

    pub fn playback_gm_actual_dir(&self) -> String {
        format!(
            "{ROOT_PLAYBACK_DIR_NAME}/{GM_ACTUAL_DIR_NAME}/{}",
            self.gm_image_subdir
        )
    }

    pub fn playback_gm_expected_dir(&self) -> String {
        format!(
            "{ROOT_PLAYBACK_DIR_NAME}/{GM_EXPECTED_DIR_NAME}/{}",
            self.gm_image_subdir
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_dirs_layout() {
        let dirs = LocalPlaybackDirs::new(Path::new("/b/perfdata"), "Perf-Android-Nexus7", "base-android");
        assert_eq!(
            dirs.playback_root_dir(),
            Path::new("/b/perfdata/Perf-Android-Nexus7/playback")
        );
        assert_eq!(
            dirs.playback_skp_dir(),
            PathBuf::from("/b/perfdata/Perf-Android-Nexus7/playback/skps")
        );
        assert_eq!(
            dirs.playback_gm_actual_dir(),
            PathBuf::from("/b/perfdata/Perf-Android-Nexus7/playback/gm-actual/base-android")
        );
        assert_eq!(
            dirs.playback_gm_expected_dir(),
            PathBuf::from("/b/perfdata/Perf-Android-Nexus7/playback/gm-expected/base-android")
        );
    }

    #[test]
    fn test_storage_dirs_layout() {
        let dirs = StoragePlaybackDirs::new("base-android");
        assert_eq!(dirs.playback_root_dir(), "playback");
        assert_eq!(dirs.playback_skp_dir(), "playback/skps");
        assert_eq!(dirs.playback_gm_actual_dir(), "playback/gm-actual/base-android");
        assert_eq!(
            dirs.playback_gm_expected_dir(),
            "playback/gm-expected/base-android"
        );
    }
}
