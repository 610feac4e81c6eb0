use chrono::{DateTime, Local};
use image::RgbaImage;
use std::path::{Path, PathBuf};

use super::errors::ScreenshotError;
use super::types::screenshot_path;
use crate::shared::paths::ensure_dir;

/// Writes a captured still as `Shot_<timestamp>.png` in `image_dir`.
pub fn save_screenshot(
    image: &RgbaImage,
    image_dir: &Path,
    at: DateTime<Local>,
) -> Result<PathBuf, ScreenshotError> {
    ensure_dir(image_dir).map_err(|e| ScreenshotError::StorageError(e.to_string()))?;

    let path = screenshot_path(image_dir, at);

    image
        .save(&path)
        .map_err(|e| ScreenshotError::SaveError(e.to_string()))?;

    tracing::info!(target: "recorder",
        "[SHOT] Saved {}x{} screenshot to {:?}", image.width(), image.height(), path);

    Ok(path)
}
