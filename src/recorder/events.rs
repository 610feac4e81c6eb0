use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use super::errors::RecorderError;
use super::types::CaptureRegion;

/// Capacity of the loop -> control channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
const TERMINAL_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Totals reported when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub path: PathBuf,
    pub frames_written: u64,
    /// Recording time with paused intervals excluded, in seconds.
    pub elapsed_seconds: f64,
    /// Length of the encoded stream, `frames_written / fps`, in seconds.
    pub encoded_seconds: f64,
    pub width: u32,
    pub height: u32,
}

impl SessionSummary {
    /// Summary of a session that never wrote a frame.
    pub fn empty(path: &std::path::Path, region: CaptureRegion) -> Self {
        Self {
            path: path.to_path_buf(),
            frames_written: 0,
            elapsed_seconds: 0.0,
            encoded_seconds: 0.0,
            width: region.width,
            height: region.height,
        }
    }
}

/// Events emitted by the capture loop to the control layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// Formatted elapsed time, once per non-paused iteration.
    TimeUpdate(String),
    /// Artifact finalized after a requested stop.
    Finished(SessionSummary),
    /// The loop hit a fatal error. The artifact was still finalized with the
    /// frames written so far.
    Failed {
        summary: SessionSummary,
        error: RecorderError,
    },
}

/// Sending half used by the loop thread. Never blocks on time updates.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<RecorderEvent>,
}

pub fn event_channel() -> (EventSender, Receiver<RecorderEvent>) {
    let (tx, rx) = crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY);
    (EventSender { tx }, rx)
}

impl EventSender {
    /// Drops the update if the consumer is behind; only the latest value matters.
    pub fn time_update(&self, formatted: String) {
        match self.tx.try_send(RecorderEvent::TimeUpdate(formatted)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::trace!(target: "recorder", "[EVENTS] Channel full, dropping time update");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Delivers a terminal event, waiting briefly for room in the channel.
    pub fn terminal(&self, event: RecorderEvent) {
        match self.tx.send_timeout(event, TERMINAL_SEND_TIMEOUT) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                tracing::warn!(target: "recorder",
                    "[EVENTS] Control layer not draining events, terminal event dropped");
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                tracing::debug!(target: "recorder", "[EVENTS] No listener for terminal event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SessionSummary {
        SessionSummary {
            path: PathBuf::from("/tmp/out.mp4"),
            frames_written: 3,
            elapsed_seconds: 0.125,
            encoded_seconds: 0.125,
            width: 2,
            height: 2,
        }
    }

    #[test]
    fn test_time_updates_drop_when_full() {
        let (tx, rx) = event_channel();
        for i in 0..EVENT_CHANNEL_CAPACITY + 10 {
            tx.time_update(format!("{}", i));
        }

        assert_eq!(rx.len(), EVENT_CHANNEL_CAPACITY);
        assert_eq!(rx.recv().unwrap(), RecorderEvent::TimeUpdate("0".to_string()));
    }

    #[test]
    fn test_terminal_event_is_delivered() {
        let (tx, rx) = event_channel();
        tx.terminal(RecorderEvent::Finished(summary()));

        assert_eq!(rx.recv().unwrap(), RecorderEvent::Finished(summary()));
    }

    #[test]
    fn test_send_without_listener_does_not_panic() {
        let (tx, rx) = event_channel();
        drop(rx);
        tx.time_update("00:01".to_string());
        tx.terminal(RecorderEvent::Finished(summary()));
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let json = serde_json::to_string(&summary()).unwrap();
        assert!(json.contains("\"framesWritten\":3"));
        assert!(json.contains("\"encodedSeconds\""));
    }
}
