//! Command surface consumed by the control layer.
//!
//! `Recorder` owns at most one session. `start_recording` returns as soon as
//! the loop is running; the other commands only flip session flags or touch
//! the screenshot path, so none of them wait on capture or encoding.

use chrono::Local;
use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::backend::{CaptureBackend, SystemBackend};
use super::errors::{RecorderError, ScreenshotError};
use super::events::{event_channel, EventSender, RecorderEvent, SessionSummary};
use super::screenshot::save_screenshot;
use super::session::{start_session, SessionConfig, SessionHandle};
use super::state::{transition, RecorderStatus, RecordingEvent, RecordingState, SideEffect};
use super::types::{recording_path, CaptureRegion, FrameRate};
use crate::core::settings::RecorderSettings;
use crate::shared::paths::ensure_dir;

struct ControllerState {
    state: RecordingState,
    session: Option<SessionHandle>,
    last_path: Option<PathBuf>,
}

pub struct Recorder<B: CaptureBackend = SystemBackend> {
    backend: Arc<B>,
    settings: RecorderSettings,
    events: EventSender,
    inner: Mutex<ControllerState>,
}

impl<B: CaptureBackend> Recorder<B> {
    /// Returns the recorder and the receiving end of its event channel.
    pub fn new(backend: B, settings: RecorderSettings) -> (Self, Receiver<RecorderEvent>) {
        let (events, rx) = event_channel();
        let recorder = Self {
            backend: Arc::new(backend),
            settings,
            events,
            inner: Mutex::new(ControllerState {
                state: RecordingState::Idle,
                session: None,
                last_path: None,
            }),
        };
        (recorder, rx)
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts recording the primary display at `frame_rate`.
    pub fn start_recording(&self, frame_rate: f64) -> Result<PathBuf, RecorderError> {
        let frame_rate = FrameRate::new(frame_rate)?;
        let region = self
            .backend
            .resolve_region()
            .map_err(RecorderError::initialization)?;
        self.start(frame_rate, region)
    }

    /// Starts a session for an explicit region. Fails with `AlreadyRecording`
    /// while another session is still running or finalizing.
    pub fn start(&self, frame_rate: FrameRate, region: CaptureRegion) -> Result<PathBuf, RecorderError> {
        let mut inner = self.lock();
        self.reap_finished(&mut inner);

        if inner.state.is_active() {
            tracing::warn!(target: "recorder", "[RECORD] Already recording");
            return Err(RecorderError::AlreadyRecording);
        }

        let region = CaptureRegion::new(region.width, region.height)?;

        self.backend
            .check_encoder()
            .map_err(RecorderError::initialization)?;

        ensure_dir(&self.settings.video_dir).map_err(|e| {
            RecorderError::initialization(format!(
                "Cannot create video directory {:?}: {}",
                self.settings.video_dir, e
            ))
        })?;

        let config = SessionConfig {
            frame_rate,
            region,
            output_path: recording_path(&self.settings.video_dir, Local::now()),
            capture_retries: self.settings.capture_retries,
        };
        let output_path = config.output_path.clone();

        tracing::info!(target: "recorder",
            "[RECORD] Starting: {}x{} @ {}fps -> {:?}",
            region.width, region.height, frame_rate.value(), output_path);

        let session = start_session(Arc::clone(&self.backend), config, self.events.clone())?;

        inner.session = Some(session);
        inner.last_path = Some(output_path.clone());
        self.apply(&mut inner, RecordingEvent::Started);

        Ok(output_path)
    }

    /// Flips pause on the active session and returns the new paused value.
    pub fn toggle_pause(&self) -> Result<bool, RecorderError> {
        let mut inner = self.lock();
        self.reap_finished(&mut inner);

        if !matches!(inner.state, RecordingState::Recording { .. }) {
            return Err(RecorderError::NotRecording);
        }

        self.apply(&mut inner, RecordingEvent::PauseToggled);
        Ok(inner.state.is_paused())
    }

    pub fn pause(&self) -> Result<(), RecorderError> {
        self.set_paused(true)
    }

    pub fn resume(&self) -> Result<(), RecorderError> {
        self.set_paused(false)
    }

    fn set_paused(&self, paused: bool) -> Result<(), RecorderError> {
        let mut inner = self.lock();
        self.reap_finished(&mut inner);

        match inner.state {
            RecordingState::Recording { paused: current, .. } if current != paused => {
                self.apply(&mut inner, RecordingEvent::PauseToggled);
                Ok(())
            }
            RecordingState::Recording { .. } => Ok(()),
            _ => Err(RecorderError::NotRecording),
        }
    }

    /// Signals the loop to stop. The `Finished` event follows once the
    /// artifact is closed. No-op when nothing is recording.
    pub fn stop_recording(&self) {
        let mut inner = self.lock();
        self.reap_finished(&mut inner);

        if matches!(inner.state, RecordingState::Recording { .. }) {
            tracing::info!(target: "recorder", "[RECORD] Stopping...");
            self.apply(&mut inner, RecordingEvent::StopRequested);
        }
    }

    /// Blocks until the current session's thread exits and returns its result.
    /// Returns `None` when there is no session. Does not request a stop.
    pub fn wait_for_session(&self) -> Option<Result<SessionSummary, RecorderError>> {
        let session = self.lock().session.take()?;

        let result = session
            .wait()
            .and_then(|outcome| outcome.into_result());

        let mut inner = self.lock();
        let event = match &result {
            Ok(_) => RecordingEvent::Finished,
            Err(error) => RecordingEvent::Failed {
                error: error.clone(),
            },
        };
        self.apply(&mut inner, event);

        Some(result)
    }

    /// Captures the primary display to `Shot_<timestamp>.png`. Independent of
    /// any running session.
    pub fn capture_screenshot(&self) -> Result<PathBuf, ScreenshotError> {
        let image = self.backend.grab_still()?;
        save_screenshot(&image, &self.settings.image_dir, Local::now())
    }

    pub fn status(&self) -> RecorderStatus {
        let mut inner = self.lock();
        self.reap_finished(&mut inner);

        let path = inner
            .last_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());
        RecorderStatus::from_state(&inner.state, path)
    }

    /// Clears a failed state so the control surface returns to idle.
    pub fn reset(&self) {
        let mut inner = self.lock();
        self.apply(&mut inner, RecordingEvent::Reset);
    }

    /// Moves the state machine on if the loop thread exited by itself.
    fn reap_finished(&self, inner: &mut ControllerState) {
        let finished = inner
            .session
            .as_ref()
            .is_some_and(|session| session.is_finished());
        if !finished {
            return;
        }

        let Some(session) = inner.session.take() else {
            return;
        };

        let event = match session.wait().and_then(|outcome| outcome.into_result()) {
            Ok(summary) => {
                tracing::info!(target: "recorder",
                    "[RECORD] Session finished: {} frames -> {:?}", summary.frames_written, summary.path);
                RecordingEvent::Finished
            }
            Err(error) => {
                tracing::error!(target: "recorder", "[RECORD] Session failed: {}", error);
                RecordingEvent::Failed { error }
            }
        };
        self.apply(inner, event);
    }

    fn apply(&self, inner: &mut ControllerState, event: RecordingEvent) {
        let previous = inner.state.clone();
        let (new_state, effects) = transition(previous.clone(), event);
        inner.state = new_state;

        if previous.is_active() && !inner.state.is_active() {
            log_session_end(&previous);
        }

        for effect in effects {
            match effect {
                SideEffect::SetPaused(paused) => {
                    if let Some(session) = &inner.session {
                        if paused {
                            session.pause();
                        } else {
                            session.resume();
                        }
                    }
                }
                SideEffect::SignalStop => {
                    if let Some(session) = &inner.session {
                        session.stop();
                    }
                }
                SideEffect::ReleaseSession => {
                    inner.session = None;
                }
            }
        }
    }
}

fn log_session_end(previous: &RecordingState) {
    let lasted = previous.started_at().map(|started_at| started_at.elapsed());

    match previous {
        RecordingState::Stopping {
            stop_requested_at, ..
        } => {
            tracing::info!(target: "recorder",
                "[RECORD] Session closed {:?} after stop (ran {:?})",
                stop_requested_at.elapsed(), lasted.unwrap_or_default());
        }
        _ => {
            tracing::info!(target: "recorder",
                "[RECORD] Session ended on its own (ran {:?})", lasted.unwrap_or_default());
        }
    }
}

impl<B: CaptureBackend> Drop for Recorder<B> {
    fn drop(&mut self) {
        let session = self.lock().session.take();
        if let Some(session) = session {
            tracing::info!(target: "recorder", "[RECORD] Recorder dropped, finalizing active session");
            if let Err(e) = session.stop_and_wait() {
                tracing::warn!(target: "recorder", "[RECORD] Session ended with error: {}", e);
            }
        }
    }
}
