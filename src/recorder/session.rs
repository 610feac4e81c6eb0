use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::backend::CaptureBackend;
use super::errors::RecorderError;
use super::events::{EventSender, RecorderEvent, SessionSummary};
use super::types::{CaptureRegion, FrameRate};
use super::worker::{run_capture_loop, SessionOutcome};

/// Write-once parameters of a recording session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub frame_rate: FrameRate,
    pub region: CaptureRegion,
    pub output_path: PathBuf,
    pub capture_retries: u32,
}

/// The only state shared between the control thread and the loop thread.
#[derive(Debug)]
pub struct SessionFlags {
    running: AtomicBool,
    paused: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Returns true if this call is the one that stopped the session.
    pub fn request_stop(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Control-side handle to a running session.
///
/// Dropping the handle stops the loop; the thread still finalizes the file.
pub struct SessionHandle {
    flags: Arc<SessionFlags>,
    config: SessionConfig,
    join_handle: Option<JoinHandle<SessionOutcome>>,
}

impl SessionHandle {
    pub fn pause(&self) {
        self.flags.set_paused(true);
    }

    pub fn resume(&self) {
        self.flags.set_paused(false);
    }

    pub fn is_paused(&self) -> bool {
        self.flags.is_paused()
    }

    /// Signals the loop to finalize and exit. No-op if already stopped.
    pub fn stop(&self) {
        if self.flags.request_stop() {
            tracing::info!(target: "recorder", "[SESSION] Stop requested for {:?}", self.config.output_path);
        }
    }

    /// True once the loop thread has exited and the artifact is closed.
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Blocks until the loop thread exits. Does not request a stop.
    pub fn wait(mut self) -> Result<SessionOutcome, RecorderError> {
        let handle = self.join_handle.take().ok_or(RecorderError::NotRecording)?;
        handle.join().map_err(|_| RecorderError::WorkerPanicked)
    }

    /// Requests a stop and waits for finalization.
    pub fn stop_and_wait(self) -> Result<SessionOutcome, RecorderError> {
        self.stop();
        self.wait()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.join_handle.is_some() {
            self.flags.request_stop();
        }
    }
}

/// Opens the capture source and encoder on a new thread and starts the loop.
///
/// Returns once both are open, so initialization failures surface here and
/// no session becomes active. Capture and encode failures after that point
/// arrive as a `Failed` event.
pub fn start_session<B: CaptureBackend>(
    backend: Arc<B>,
    config: SessionConfig,
    events: EventSender,
) -> Result<SessionHandle, RecorderError> {
    let flags = Arc::new(SessionFlags::new());
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), RecorderError>>(1);

    let thread_flags = Arc::clone(&flags);
    let thread_config = config.clone();

    let join_handle = std::thread::Builder::new()
        .name("capture-encode".to_string())
        .spawn(move || {
            let opened = backend
                .open_source(thread_config.region)
                .map_err(RecorderError::initialization)
                .and_then(|source| {
                    backend
                        .open_sink(
                            &thread_config.output_path,
                            thread_config.region,
                            thread_config.frame_rate,
                        )
                        .map(|sink| (source, sink))
                        .map_err(RecorderError::initialization)
                });

            let (mut source, mut sink) = match opened {
                Ok(pair) => {
                    let _ = ready_tx.send(Ok(()));
                    pair
                }
                Err(e) => {
                    tracing::error!(target: "recorder", "[SESSION] Initialization failed: {}", e);
                    let _ = ready_tx.send(Err(e.clone()));
                    return SessionOutcome {
                        summary: SessionSummary::empty(
                            &thread_config.output_path,
                            thread_config.region,
                        ),
                        error: Some(e),
                    };
                }
            };

            let looped = panic::catch_unwind(AssertUnwindSafe(|| {
                run_capture_loop(&mut source, &mut sink, &thread_config, &thread_flags, &events)
            }));

            looped.unwrap_or_else(|_| {
                tracing::error!(target: "recorder",
                    "[SESSION] Capture loop panicked, salvaging {:?}", thread_config.output_path);
                let summary =
                    SessionSummary::empty(&thread_config.output_path, thread_config.region);
                events.terminal(RecorderEvent::Failed {
                    summary: summary.clone(),
                    error: RecorderError::WorkerPanicked,
                });
                SessionOutcome {
                    summary,
                    error: Some(RecorderError::WorkerPanicked),
                }
            })
        })
        .map_err(|e| RecorderError::initialization(format!("Failed to spawn capture thread: {}", e)))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(SessionHandle {
            flags,
            config,
            join_handle: Some(join_handle),
        }),
        Ok(Err(e)) => {
            let _ = join_handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = join_handle.join();
            Err(RecorderError::initialization("Capture thread exited during setup"))
        }
    }
}
