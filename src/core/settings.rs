use crate::shared::errors::StorageError;
use crate::shared::paths::{default_image_dir, default_video_dir, ensure_dir, get_storage_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_FRAME_RATE: f64 = 24.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSettings {
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    /// Consecutive capture failures tolerated before a session is failed.
    /// Zero keeps the fail-fast behavior.
    #[serde(default)]
    pub capture_retries: u32,
}

fn default_frame_rate() -> f64 {
    DEFAULT_FRAME_RATE
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            video_dir: default_video_dir(),
            image_dir: default_image_dir(),
            frame_rate: DEFAULT_FRAME_RATE,
            capture_retries: 0,
        }
    }
}

impl RecorderSettings {
    /// Creates the video and image directories if they are missing.
    pub fn ensure_output_dirs(&self) -> Result<(), StorageError> {
        for dir in [&self.video_dir, &self.image_dir] {
            ensure_dir(dir)
                .map_err(|e| StorageError::directory(format!("{}: {}", dir.display(), e)))?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub fn get_settings_path() -> PathBuf {
    get_storage_dir().join("settings.json")
}

pub fn load_settings() -> RecorderSettings {
    let path = get_settings_path();

    if !path.exists() {
        return RecorderSettings::default();
    }

    match load_settings_from_file(&path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(target: "system", "[SETTINGS] Ignoring {:?}: {}", path, e);
            RecorderSettings::default()
        }
    }
}

pub fn load_settings_from_file(path: &Path) -> Result<RecorderSettings, SettingsError> {
    let contents = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

pub fn save_settings(settings: &RecorderSettings) -> Result<(), SettingsError> {
    let storage_dir = get_storage_dir();
    ensure_dir(&storage_dir)?;
    save_settings_to_file(settings, &get_settings_path())
}

pub fn save_settings_to_file(settings: &RecorderSettings, path: &Path) -> Result<(), SettingsError> {
    let contents = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RecorderSettings::default();
        assert_eq!(settings.frame_rate, 24.0);
        assert_eq!(settings.capture_retries, 0);
    }

    #[test]
    fn test_settings_roundtrip_uses_camel_case() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let settings = RecorderSettings {
            video_dir: tmp.path().join("videos"),
            image_dir: tmp.path().join("images"),
            frame_rate: 30.0,
            capture_retries: 2,
        };

        save_settings_to_file(&settings, &path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"videoDir\""));
        assert!(raw.contains("\"captureRetries\""));

        let loaded = load_settings_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_falls_back_per_field() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{ "frameRate": 12.5 }"#).unwrap();

        let loaded = load_settings_from_file(&path).unwrap();
        assert_eq!(loaded.frame_rate, 12.5);
        assert_eq!(loaded.capture_retries, 0);
        assert_eq!(loaded.video_dir, default_video_dir());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        let err = load_settings_from_file(&path).unwrap_err();
        assert!(matches!(err, SettingsError::ParseError(_)));
    }

    #[test]
    fn test_ensure_output_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = RecorderSettings {
            video_dir: tmp.path().join("v"),
            image_dir: tmp.path().join("i"),
            ..RecorderSettings::default()
        };

        settings.ensure_output_dirs().unwrap();
        assert!(settings.video_dir.is_dir());
        assert!(settings.image_dir.is_dir());
    }
}
