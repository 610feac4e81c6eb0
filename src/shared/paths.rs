use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "screen-recorder";

/// Get the base storage directory following XDG Base Directory Specification.
/// Returns `$XDG_DATA_HOME/screen-recorder`, `~/.local/share/screen-recorder`,
/// or the platform data dir when neither is available.
pub fn get_storage_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg_data).join(APP_DIR_NAME);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("share").join(APP_DIR_NAME);
    }

    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

/// Get the logs directory path.
/// Returns `{storage_dir}/logs`.
pub fn get_log_dir() -> PathBuf {
    get_storage_dir().join("logs")
}

/// Default directory for recorded videos: `~/Videos/Screen Recorder`.
pub fn default_video_dir() -> PathBuf {
    dirs::video_dir()
        .map(|dir| dir.join("Screen Recorder"))
        .unwrap_or_else(|| get_storage_dir().join("videos"))
}

/// Default directory for screenshots: `~/Pictures/Screenshots`.
pub fn default_image_dir() -> PathBuf {
    dirs::picture_dir()
        .map(|dir| dir.join("Screenshots"))
        .unwrap_or_else(|| get_storage_dir().join("screenshots"))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_dir_structure() {
        let storage = get_storage_dir();
        assert!(storage.ends_with(APP_DIR_NAME));

        let logs = get_log_dir();
        assert!(logs.ends_with("logs"));
        assert!(logs.starts_with(&storage));
    }

    #[test]
    fn test_ensure_dir_creates_nested_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");

        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        // Second call on an existing dir is a no-op
        ensure_dir(&nested).unwrap();
    }
}
