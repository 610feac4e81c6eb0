use super::errors::EncodingError;
use std::process::{Command, Stdio};

pub fn check_ffmpeg() -> Result<(), EncodingError> {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|_| EncodingError::FfmpegNotFound)?;
    Ok(())
}
