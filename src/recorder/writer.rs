use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use super::backend::FrameSink;
use super::errors::EncodingError;
use super::types::{CaptureRegion, FrameRate};

pub const ENCODING_CRF: &str = "23";
pub const ENCODING_PRESET: &str = "veryfast";

/// Owns the encoder process until `finalize` claims it.
///
/// Dropped before that (early return, loop thread unwinding), it closes the
/// frame pipe and waits, so FFmpeg still writes the container trailer and the
/// frames piped so far stay playable.
struct EncoderProcess {
    child: Option<Child>,
    output_path: PathBuf,
}

impl Drop for EncoderProcess {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        tracing::warn!(target: "recorder",
            "[ENCODER] Writer dropped without finalize, salvaging {:?}", self.output_path);

        drop(child.stdin.take());
        match child.wait() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                tracing::warn!(target: "recorder", "[ENCODER] FFmpeg exited with {} during salvage", status);
            }
            Err(e) => {
                tracing::warn!(target: "recorder", "[ENCODER] Failed to wait for FFmpeg: {}", e);
            }
        }
    }
}

/// Arguments for piping raw RGB frames into an H.264 MP4.
pub fn build_ffmpeg_args(output: &Path, region: CaptureRegion, frame_rate: FrameRate) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(), "error".to_string(),
        "-nostats".to_string(),
        "-f".to_string(), "rawvideo".to_string(),
        "-pixel_format".to_string(), "rgb24".to_string(),
        "-video_size".to_string(), format!("{}x{}", region.width, region.height),
        "-framerate".to_string(), frame_rate.value().to_string(),
        "-i".to_string(), "pipe:0".to_string(),
        // yuv420p needs even dimensions
        "-vf".to_string(), "pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string(),
        "-c:v".to_string(), "libx264".to_string(),
        "-pix_fmt".to_string(), "yuv420p".to_string(),
        "-crf".to_string(), ENCODING_CRF.to_string(),
        "-preset".to_string(), ENCODING_PRESET.to_string(),
        "-movflags".to_string(), "+faststart".to_string(),
        "-y".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Video encoder backed by an FFmpeg child process reading rawvideo on stdin.
pub struct FfmpegWriter {
    // Declared before `process` so the pipe closes before the salvage wait.
    stdin: Option<ChildStdin>,
    process: EncoderProcess,
    region: CaptureRegion,
    frames_written: u64,
}

impl FfmpegWriter {
    /// Creates the output file, then starts FFmpeg on it. A path that cannot
    /// be created fails here rather than on the first frame.
    pub fn open(output: &Path, region: CaptureRegion, frame_rate: FrameRate) -> Result<Self, EncodingError> {
        File::create(output).map_err(|e| EncodingError::OpenFailed {
            path: output.to_path_buf(),
            reason: e.to_string(),
        })?;

        let args = build_ffmpeg_args(output, region, frame_rate);

        tracing::info!(target: "recorder",
            "[ENCODER] Starting FFmpeg: {}x{} @ {}fps, preset={}, crf={} -> {:?}",
            region.width, region.height, frame_rate.value(), ENCODING_PRESET, ENCODING_CRF, output);
        tracing::debug!(target: "recorder", "[ENCODER] FFmpeg args: {:?}", args);

        let mut command = Command::new("ffmpeg");
        command.args(&args);
        Self::spawn(command, output, region)
    }

    /// Starts `command` as the encoder, piping frames to its stdin.
    fn spawn(mut command: Command, output: &Path, region: CaptureRegion) -> Result<Self, EncodingError> {
        let open_failed = |reason: String| EncodingError::OpenFailed {
            path: output.to_path_buf(),
            reason,
        };

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| open_failed(format!("Failed to spawn FFmpeg: {}", e)))?;

        let stdin = child.stdin.take();
        let process = EncoderProcess {
            child: Some(child),
            output_path: output.to_path_buf(),
        };
        let stdin = stdin.ok_or_else(|| open_failed("Failed to capture FFmpeg stdin".to_string()))?;

        Ok(Self {
            stdin: Some(stdin),
            process,
            region,
            frames_written: 0,
        })
    }
}

impl FrameSink for FfmpegWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), EncodingError> {
        if frame.dimensions() != self.region.dimensions() {
            return Err(EncodingError::FrameSizeMismatch {
                expected: self.region.dimensions(),
                got: frame.dimensions(),
            });
        }

        let stdin = self.stdin.as_mut().ok_or(EncodingError::AlreadyFinalized)?;

        stdin
            .write_all(frame.as_raw())
            .map_err(|e| EncodingError::WriteFailed {
                frame: self.frames_written,
                reason: e.to_string(),
            })?;

        self.frames_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), EncodingError> {
        let stdin = self.stdin.take().ok_or(EncodingError::AlreadyFinalized)?;
        drop(stdin);

        tracing::debug!(target: "recorder",
            "[ENCODER] Waiting for FFmpeg to finish ({} frames)...", self.frames_written);

        let child = self
            .process
            .child
            .take()
            .ok_or(EncodingError::AlreadyFinalized)?;

        let output = child
            .wait_with_output()
            .map_err(|e| EncodingError::ProcessFailed {
                exit_code: -1,
                stderr: format!("FFmpeg wait failed: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(target: "recorder", "[ENCODER] FFmpeg failed: {}", stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(EncodingError::ProcessFailed {
                exit_code,
                stderr: stderr.to_string(),
            });
        }

        tracing::info!(target: "recorder", "[ENCODER] FFmpeg complete, {} frames written", self.frames_written);
        Ok(())
    }
}
