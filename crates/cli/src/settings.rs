use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use face_overlay_core::shared::constants::{
    DEFAULT_CAMERA_HEIGHT, DEFAULT_CAMERA_WIDTH, DEFAULT_CONFIDENCE, DEFAULT_REFRESH_RATE_HZ,
};

/// Persistent defaults, overridden per run by command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: Option<String>,
    pub input_format: Option<String>,
    pub width: u32,
    pub height: u32,
    pub confidence: f64,
    pub refresh_rate: u32,
    pub model_url: Option<String>,
    pub font: Option<PathBuf>,
    /// Box and label colour as `#rrggbb` or `#rrggbbaa`.
    pub box_color: Option<String>,
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: None,
            input_format: None,
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            confidence: DEFAULT_CONFIDENCE,
            refresh_rate: DEFAULT_REFRESH_RATE_HZ,
            model_url: None,
            font: None,
            box_color: None,
            screenshot_dir: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceOverlay").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unreadable files fall back to defaults; a malformed file
    /// is reported and ignored.
    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => {
                log::debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring malformed settings file {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let settings = Settings::load_from(&dir.path().join("settings.json"));

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.width, 640);
        assert_eq!(settings.refresh_rate, 60);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "confidence": 0.7, "screenshot_dir": "/tmp/shots" }"#).unwrap();

        let settings = Settings::load_from(&path);

        assert_eq!(settings.confidence, 0.7);
        assert_eq!(settings.screenshot_dir, Some(PathBuf::from("/tmp/shots")));
        assert_eq!(settings.height, 480);
        assert!(settings.device.is_none());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_serialized_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            device: Some("/dev/video2".into()),
            refresh_rate: 30,
            ..Settings::default()
        };
        fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

        assert_eq!(Settings::load_from(&path), settings);
    }
}
