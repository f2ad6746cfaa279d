use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_PERMISSION: &str = "android.permission.WRITE_EXTERNAL_STORAGE";

/// Picker settings. Every field has a default so an empty config block is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickerConfig {
    /// Permission checked before the picker is shown.
    pub permission: String,
    /// Optional subdirectory of the host cache dir for copies and thumbnails.
    pub cache_subdir: Option<String>,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub copy_chunk_size: usize,
    /// `None` waits forever for the OS to answer.
    pub selection_timeout_secs: Option<u64>,
    pub request_code_base: i32,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            permission: DEFAULT_PERMISSION.to_string(),
            cache_subdir: None,
            // MINI_KIND bounds
            thumbnail_width: 512,
            thumbnail_height: 384,
            copy_chunk_size: 8 * 1024,
            selection_timeout_secs: None,
            request_code_base: 0x4650,
        }
    }
}

impl PickerConfig {
    pub fn selection_timeout(&self) -> Option<Duration> {
        self.selection_timeout_secs.map(Duration::from_secs)
    }

    pub fn cache_dir_in(&self, host_cache_dir: &Path) -> PathBuf {
        match self.cache_subdir.as_deref().map(str::trim) {
            Some(sub) if !sub.is_empty() => host_cache_dir.join(sub),
            _ => host_cache_dir.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: PickerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.permission, DEFAULT_PERMISSION);
        assert_eq!(config.copy_chunk_size, 8192);
        assert_eq!((config.thumbnail_width, config.thumbnail_height), (512, 384));
        assert!(config.selection_timeout().is_none());
    }

    #[test]
    fn test_camel_case_overrides() {
        let config: PickerConfig = serde_json::from_str(
            r#"{"permission":"android.permission.READ_MEDIA_VIDEO","cacheSubdir":"picked","selectionTimeoutSecs":30}"#,
        )
        .unwrap();
        assert_eq!(config.permission, "android.permission.READ_MEDIA_VIDEO");
        assert_eq!(config.selection_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.cache_dir_in(Path::new("/data/cache")),
            PathBuf::from("/data/cache/picked")
        );
    }
}
