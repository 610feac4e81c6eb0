//! The capture-encode loop.
//!
//! Runs on the session thread: grab → normalize → write → report elapsed
//! time, paced to the target frame rate. Pause and stop are atomics read at
//! the top of each iteration, so a flag change lands within one frame period
//! and never interrupts a capture or write halfway.

use std::time::Instant;

use super::backend::{FrameSink, FrameSource};
use super::clock::SessionClock;
use super::errors::RecorderError;
use super::events::{EventSender, RecorderEvent, SessionSummary};
use super::normalize::normalize_frame;
use super::pacing::FramePacer;
use super::session::{SessionConfig, SessionFlags};
use super::types::format_elapsed;

/// How a session ended. The summary is filled in either way, since the
/// artifact is finalized even after a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub summary: SessionSummary,
    pub error: Option<RecorderError>,
}

impl SessionOutcome {
    pub fn into_result(self) -> Result<SessionSummary, RecorderError> {
        match self.error {
            None => Ok(self.summary),
            Some(error) => Err(error),
        }
    }
}

struct FrameWriter<'a, S, K> {
    source: &'a mut S,
    sink: &'a mut K,
    config: &'a SessionConfig,
    drift_logged: bool,
}

impl<S: FrameSource, K: FrameSink> FrameWriter<'_, S, K> {
    fn record_frame(&mut self) -> Result<(), RecorderError> {
        let frame = self.source.grab()?;

        if !self.drift_logged && frame.dimensions() != self.config.region.dimensions() {
            tracing::warn!(target: "recorder",
                "[LOOP] Capture size {:?} differs from session {:?}, resizing frames",
                frame.dimensions(), self.config.region.dimensions());
            self.drift_logged = true;
        }

        let normalized = normalize_frame(&frame.image, self.config.region);
        self.sink.write_frame(&normalized)?;
        Ok(())
    }
}

/// Runs until `flags` is stopped or a frame fails, then finalizes `sink`
/// and emits exactly one terminal event.
pub fn run_capture_loop<S: FrameSource, K: FrameSink>(
    source: &mut S,
    sink: &mut K,
    config: &SessionConfig,
    flags: &SessionFlags,
    events: &EventSender,
) -> SessionOutcome {
    let mut pacer = FramePacer::new(config.frame_rate);

    tracing::info!(target: "recorder",
        "[LOOP] Recording {}x{} @ {}fps (period {:?}) -> {:?}",
        config.region.width, config.region.height, config.frame_rate.value(),
        pacer.frame_period(), config.output_path);
    let mut clock = SessionClock::start(Instant::now());
    let mut writer = FrameWriter {
        source,
        sink,
        config,
        drift_logged: false,
    };
    let mut frames_written: u64 = 0;
    let mut consecutive_failures: u32 = 0;

    let loop_result = loop {
        if !flags.is_running() {
            break Ok(());
        }

        let iteration_start = pacer.begin_iteration();

        if flags.is_paused() {
            if !clock.is_paused() {
                tracing::info!(target: "recorder", "[LOOP] Paused after {} frames", frames_written);
            }
            clock.pause(iteration_start);
        } else {
            if clock.is_paused() {
                clock.resume(iteration_start);
                tracing::info!(target: "recorder",
                    "[LOOP] Resumed, {:.3}s paused in total", clock.paused_total().as_secs_f64());
            }

            match writer.record_frame() {
                Ok(()) => {
                    frames_written += 1;
                    consecutive_failures = 0;
                    events.time_update(format_elapsed(clock.elapsed(Instant::now())));

                    if frames_written % 120 == 0 {
                        tracing::debug!(target: "recorder", "[LOOP] Written {} frames", frames_written);
                    }
                }
                Err(RecorderError::Capture(e)) if consecutive_failures < config.capture_retries => {
                    consecutive_failures += 1;
                    tracing::warn!(target: "recorder",
                        "[LOOP] Capture failed ({}/{}), retrying next frame: {}",
                        consecutive_failures, config.capture_retries, e);
                }
                Err(e) => {
                    tracing::error!(target: "recorder",
                        "[LOOP] Frame {} failed, ending session: {}", frames_written, e);
                    break Err(e);
                }
            }
        }

        pacer.wait_for_next_frame();
    };

    let ended_at = Instant::now();
    clock.resume(ended_at);

    let finalize_result = writer.sink.finalize();

    let summary = SessionSummary {
        path: config.output_path.clone(),
        frames_written,
        elapsed_seconds: clock.elapsed(ended_at).as_secs_f64(),
        encoded_seconds: frames_written as f64 / config.frame_rate.value(),
        width: config.region.width,
        height: config.region.height,
    };

    let error = match (loop_result, finalize_result) {
        (Ok(()), Ok(())) => None,
        (Ok(()), Err(e)) => Some(RecorderError::Encoding(e)),
        (Err(e), finalize_result) => {
            if let Err(fe) = finalize_result {
                tracing::warn!(target: "recorder", "[LOOP] Finalize after failure also failed: {}", fe);
            }
            Some(e)
        }
    };

    match &error {
        None => {
            tracing::info!(target: "recorder",
                "[LOOP] Finished: {} frames, {:.2}s recorded, {} overruns -> {:?}",
                summary.frames_written, summary.elapsed_seconds, pacer.overruns(), summary.path);
            events.terminal(RecorderEvent::Finished(summary.clone()));
        }
        Some(error) => {
            tracing::error!(target: "recorder",
                "[LOOP] Session failed after {} frames: {}", summary.frames_written, error);
            events.terminal(RecorderEvent::Failed {
                summary: summary.clone(),
                error: error.clone(),
            });
        }
    }

    SessionOutcome { summary, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::errors::{CaptureError, EncodingError};
    use crate::recorder::events::event_channel;
    use crate::recorder::types::{CaptureRegion, Frame, FrameRate};
    use crossbeam_channel::Receiver;
    use image::{RgbImage, RgbaImage};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    /// Stops the session by itself after `stop_after` grabs.
    struct ScriptedSource {
        flags: Arc<SessionFlags>,
        stop_after: u64,
        grabs: u64,
        size: (u32, u32),
        fail_on: Vec<u64>,
    }

    impl FrameSource for ScriptedSource {
        fn grab(&mut self) -> Result<Frame, CaptureError> {
            self.grabs += 1;
            if self.grabs >= self.stop_after {
                self.flags.request_stop();
            }
            if self.fail_on.contains(&self.grabs) {
                return Err(CaptureError::GrabFailed(format!("grab {}", self.grabs)));
            }
            Ok(Frame::new(RgbaImage::new(self.size.0, self.size.1)))
        }
    }

    #[derive(Default)]
    struct MemorySink {
        frames: Vec<(u32, u32)>,
        finalize_calls: u32,
        fail_write_on: Option<usize>,
    }

    impl FrameSink for MemorySink {
        fn write_frame(&mut self, frame: &RgbImage) -> Result<(), EncodingError> {
            if self.fail_write_on == Some(self.frames.len() + 1) {
                return Err(EncodingError::WriteFailed {
                    frame: self.frames.len() as u64,
                    reason: "broken pipe".to_string(),
                });
            }
            self.frames.push(frame.dimensions());
            Ok(())
        }

        fn finalize(&mut self) -> Result<(), EncodingError> {
            self.finalize_calls += 1;
            Ok(())
        }
    }

    fn config(retries: u32) -> SessionConfig {
        SessionConfig {
            frame_rate: FrameRate::new(500.0).unwrap(),
            region: CaptureRegion::new(8, 6).unwrap(),
            output_path: PathBuf::from("/tmp/Recording_test.mp4"),
            capture_retries: retries,
        }
    }

    fn source(flags: &Arc<SessionFlags>, stop_after: u64, size: (u32, u32)) -> ScriptedSource {
        ScriptedSource {
            flags: Arc::clone(flags),
            stop_after,
            grabs: 0,
            size,
            fail_on: Vec::new(),
        }
    }

    fn drain(rx: &Receiver<RecorderEvent>) -> Vec<RecorderEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_writes_one_frame_per_iteration_until_stopped() {
        let flags = Arc::new(SessionFlags::new());
        let (tx, rx) = event_channel();
        let mut src = source(&flags, 10, (8, 6));
        let mut sink = MemorySink::default();

        let outcome = run_capture_loop(&mut src, &mut sink, &config(0), &flags, &tx);

        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.frames_written, 10);
        assert_eq!(sink.frames.len(), 10);
        assert_eq!(sink.finalize_calls, 1);

        let events = drain(&rx);
        let updates = events
            .iter()
            .filter(|e| matches!(e, RecorderEvent::TimeUpdate(_)))
            .count();
        assert_eq!(updates, 10);
        assert!(matches!(events.last(), Some(RecorderEvent::Finished(s)) if s.frames_written == 10));
    }

    #[test]
    fn test_mismatched_capture_reaches_sink_at_region_size() {
        let flags = Arc::new(SessionFlags::new());
        let (tx, _rx) = event_channel();
        let mut src = source(&flags, 3, (16, 12));
        let mut sink = MemorySink::default();

        run_capture_loop(&mut src, &mut sink, &config(0), &flags, &tx);

        assert_eq!(sink.frames, vec![(8, 6); 3]);
    }

    #[test]
    fn test_capture_failure_is_fatal_but_finalizes() {
        let flags = Arc::new(SessionFlags::new());
        let (tx, rx) = event_channel();
        let mut src = source(&flags, 100, (8, 6));
        src.fail_on = vec![4];
        let mut sink = MemorySink::default();

        let outcome = run_capture_loop(&mut src, &mut sink, &config(0), &flags, &tx);

        assert!(matches!(outcome.error, Some(RecorderError::Capture(_))));
        assert_eq!(outcome.summary.frames_written, 3);
        assert_eq!(sink.finalize_calls, 1);
        assert!(matches!(
            drain(&rx).last(),
            Some(RecorderEvent::Failed { error: RecorderError::Capture(_), summary }) if summary.frames_written == 3
        ));
    }

    #[test]
    fn test_capture_retries_within_budget() {
        let flags = Arc::new(SessionFlags::new());
        let (tx, _rx) = event_channel();
        let mut src = source(&flags, 8, (8, 6));
        src.fail_on = vec![2, 3];
        let mut sink = MemorySink::default();

        let outcome = run_capture_loop(&mut src, &mut sink, &config(2), &flags, &tx);

        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.frames_written, 6);
    }

    #[test]
    fn test_capture_retries_exhausted() {
        let flags = Arc::new(SessionFlags::new());
        let (tx, _rx) = event_channel();
        let mut src = source(&flags, 50, (8, 6));
        src.fail_on = vec![2, 3, 4];
        let mut sink = MemorySink::default();

        let outcome = run_capture_loop(&mut src, &mut sink, &config(2), &flags, &tx);

        assert!(matches!(outcome.error, Some(RecorderError::Capture(_))));
        assert_eq!(outcome.summary.frames_written, 1);
    }

    #[test]
    fn test_encode_failure_is_fatal() {
        let flags = Arc::new(SessionFlags::new());
        let (tx, _rx) = event_channel();
        let mut src = source(&flags, 50, (8, 6));
        let mut sink = MemorySink {
            fail_write_on: Some(5),
            ..MemorySink::default()
        };

        let outcome = run_capture_loop(&mut src, &mut sink, &config(3), &flags, &tx);

        assert!(matches!(
            outcome.error,
            Some(RecorderError::Encoding(EncodingError::WriteFailed { .. }))
        ));
        assert_eq!(outcome.summary.frames_written, 4);
        assert_eq!(sink.finalize_calls, 1);
    }

    #[test]
    fn test_paused_session_writes_nothing() {
        let flags = Arc::new(SessionFlags::new());
        flags.set_paused(true);
        let (tx, rx) = event_channel();
        let mut src = source(&flags, 1, (8, 6));
        let mut sink = MemorySink::default();

        let stopper = {
            let flags = Arc::clone(&flags);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                flags.request_stop();
            })
        };

        let outcome = run_capture_loop(&mut src, &mut sink, &config(0), &flags, &tx);
        stopper.join().unwrap();

        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.frames_written, 0);
        assert_eq!(src.grabs, 0);
        assert!(sink.frames.is_empty());
        assert!(outcome.summary.elapsed_seconds < 0.02);
        assert_eq!(
            drain(&rx)
                .iter()
                .filter(|e| matches!(e, RecorderEvent::TimeUpdate(_)))
                .count(),
            0
        );
    }

    #[test]
    fn test_encoded_duration_follows_frame_count() {
        let flags = Arc::new(SessionFlags::new());
        let (tx, _rx) = event_channel();
        let mut src = source(&flags, 25, (8, 6));
        let mut sink = MemorySink::default();

        let outcome = run_capture_loop(&mut src, &mut sink, &config(0), &flags, &tx);

        assert!((outcome.summary.encoded_seconds - 25.0 / 500.0).abs() < 1e-9);
    }
}
