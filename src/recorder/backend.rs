//! Seams between the capture loop and the platform primitives it drives.
//!
//! The loop only sees a [`FrameSource`] and a [`FrameSink`]; a
//! [`CaptureBackend`] opens both on the loop thread, so neither needs to be
//! `Send`.

use image::{RgbImage, RgbaImage};
use std::path::Path;

use super::capture::{self, MonitorSource};
use super::errors::{CaptureError, EncodingError};
use super::ffmpeg::check_ffmpeg;
use super::types::{CaptureRegion, Frame, FrameRate};
use super::writer::FfmpegWriter;

/// Screen-grab primitive: one raw RGBA frame per call.
pub trait FrameSource {
    fn grab(&mut self) -> Result<Frame, CaptureError>;
}

/// Video-encoding primitive: accepts normalized frames, produces a container file.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), EncodingError>;

    /// Flushes and closes the container. A second call returns
    /// [`EncodingError::AlreadyFinalized`].
    fn finalize(&mut self) -> Result<(), EncodingError>;
}

pub trait CaptureBackend: Send + Sync + 'static {
    type Source: FrameSource;
    type Sink: FrameSink;

    /// Verifies the encoder can be launched at all.
    fn check_encoder(&self) -> Result<(), EncodingError> {
        Ok(())
    }

    /// Size of the display area a new session records.
    fn resolve_region(&self) -> Result<CaptureRegion, CaptureError>;

    fn open_source(&self, region: CaptureRegion) -> Result<Self::Source, CaptureError>;

    fn open_sink(
        &self,
        path: &Path,
        region: CaptureRegion,
        frame_rate: FrameRate,
    ) -> Result<Self::Sink, EncodingError>;

    /// Full-resolution single frame for the screenshot command.
    fn grab_still(&self) -> Result<RgbaImage, CaptureError>;
}

/// Primary monitor via xcap, encoding via FFmpeg.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBackend;

impl CaptureBackend for SystemBackend {
    type Source = MonitorSource;
    type Sink = FfmpegWriter;

    fn check_encoder(&self) -> Result<(), EncodingError> {
        check_ffmpeg()
    }

    fn resolve_region(&self) -> Result<CaptureRegion, CaptureError> {
        capture::primary_region()
    }

    fn open_source(&self, _region: CaptureRegion) -> Result<Self::Source, CaptureError> {
        MonitorSource::open()
    }

    fn open_sink(
        &self,
        path: &Path,
        region: CaptureRegion,
        frame_rate: FrameRate,
    ) -> Result<Self::Sink, EncodingError> {
        FfmpegWriter::open(path, region, frame_rate)
    }

    fn grab_still(&self) -> Result<RgbaImage, CaptureError> {
        capture::grab_primary()
    }
}
