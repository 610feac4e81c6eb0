use super::errors::RecorderError;
use chrono::{DateTime, Local};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const VIDEO_EXTENSION: &str = "mp4";
pub const IMAGE_EXTENSION: &str = "png";
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Target capture cadence in frames per second. Always finite and positive,
/// with a period that fits in a `Duration`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize)]
pub struct FrameRate {
    fps: f64,
    #[serde(skip)]
    period: Duration,
}

impl FrameRate {
    pub fn new(fps: f64) -> Result<Self, RecorderError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(RecorderError::InvalidFrameRate(fps));
        }

        let period = Duration::try_from_secs_f64(1.0 / fps)
            .map_err(|_| RecorderError::InvalidFrameRate(fps))?;
        if period.is_zero() {
            return Err(RecorderError::InvalidFrameRate(fps));
        }

        Ok(Self { fps, period })
    }

    pub fn value(&self) -> f64 {
        self.fps
    }

    /// Duration of one frame, `1 / fps`.
    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Pixel size of the display area being recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(width: u32, height: u32) -> Result<Self, RecorderError> {
        if width == 0 || height == 0 {
            return Err(RecorderError::InvalidRegion { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// One raw RGBA capture, owned by the loop for a single iteration.
pub struct Frame {
    pub image: RgbaImage,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            captured_at: Instant::now(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// `Recording_<YYYY-MM-DD_HH-MM-SS>.mp4`
pub fn recording_file_name(at: DateTime<Local>) -> String {
    format!(
        "Recording_{}.{}",
        at.format(FILE_TIMESTAMP_FORMAT),
        VIDEO_EXTENSION
    )
}

/// `Shot_<YYYY-MM-DD_HH-MM-SS>.png`
pub fn screenshot_file_name(at: DateTime<Local>) -> String {
    format!("Shot_{}.{}", at.format(FILE_TIMESTAMP_FORMAT), IMAGE_EXTENSION)
}

pub fn recording_path(video_dir: &Path, at: DateTime<Local>) -> PathBuf {
    video_dir.join(recording_file_name(at))
}

pub fn screenshot_path(image_dir: &Path, at: DateTime<Local>) -> PathBuf {
    image_dir.join(screenshot_file_name(at))
}

/// Formats whole elapsed seconds as `MM:SS`. Minutes are not wrapped at 60.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "01:05");
        assert_eq!(format_elapsed(Duration::from_secs(3661)), "61:01");
        assert_eq!(format_elapsed(Duration::from_secs(75 * 60 + 3)), "75:03");
    }

    #[test]
    fn test_format_elapsed_truncates_fraction() {
        assert_eq!(format_elapsed(Duration::from_millis(59_999)), "00:59");
    }

    #[test]
    fn test_frame_rate_validation() {
        assert!(FrameRate::new(24.0).is_ok());
        assert!(FrameRate::new(0.5).is_ok());
        assert_eq!(
            FrameRate::new(0.0).unwrap_err(),
            RecorderError::InvalidFrameRate(0.0)
        );
        assert!(FrameRate::new(-1.0).is_err());
        assert!(FrameRate::new(f64::NAN).is_err());
        assert!(FrameRate::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_frame_rate_with_unrepresentable_period_is_rejected() {
        assert_eq!(
            FrameRate::new(1e-20).unwrap_err(),
            RecorderError::InvalidFrameRate(1e-20)
        );
        assert_eq!(
            FrameRate::new(f64::MIN_POSITIVE).unwrap_err(),
            RecorderError::InvalidFrameRate(f64::MIN_POSITIVE)
        );
        assert!(FrameRate::new(1e-3).is_ok());
    }

    #[test]
    fn test_frame_period() {
        let rate = FrameRate::new(25.0).unwrap();
        assert_eq!(rate.period(), Duration::from_millis(40));
    }

    #[test]
    fn test_region_validation() {
        assert!(CaptureRegion::new(1920, 1080).is_ok());
        assert_eq!(
            CaptureRegion::new(0, 1080).unwrap_err(),
            RecorderError::InvalidRegion {
                width: 0,
                height: 1080
            }
        );
        assert!(CaptureRegion::new(1920, 0).is_err());
    }

    #[test]
    fn test_file_names() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(recording_file_name(at), "Recording_2024-03-09_07-05-01.mp4");
        assert_eq!(screenshot_file_name(at), "Shot_2024-03-09_07-05-01.png");

        let path = recording_path(Path::new("/tmp/videos"), at);
        assert_eq!(
            path,
            PathBuf::from("/tmp/videos/Recording_2024-03-09_07-05-01.mp4")
        );
    }
}
