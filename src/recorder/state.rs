//! Pure state machine for the recording lifecycle seen by the control layer.
//!
//! `(State, Event) -> (NewState, Vec<SideEffect>)`. Invalid transitions
//! return the current state with no effects. The controller executes the
//! effects; this module never touches a session.

use serde::Serialize;
use std::time::Instant;

use super::errors::RecorderError;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecordingState {
    /// No session, ready to start.
    #[default]
    Idle,

    /// Loop running; `paused` mirrors the session's paused flag.
    Recording { started_at: Instant, paused: bool },

    /// Stop signalled, loop finalizing the artifact.
    Stopping {
        started_at: Instant,
        stop_requested_at: Instant,
    },

    /// The last session ended with an error. Starting again is allowed.
    Failed { error: String },
}

impl RecordingState {
    /// True while a session thread may still be running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RecordingState::Recording { .. } | RecordingState::Stopping { .. }
        )
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, RecordingState::Recording { paused: true, .. })
    }

    pub fn started_at(&self) -> Option<&Instant> {
        match self {
            RecordingState::Recording { started_at, .. }
            | RecordingState::Stopping { started_at, .. } => Some(started_at),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// A session was launched successfully.
    Started,
    PauseToggled,
    StopRequested,
    /// The loop exited and the artifact is closed.
    Finished,
    /// The loop exited with a capture/encode failure.
    Failed { error: RecorderError },
    /// Clears a failure without starting a new session.
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    SetPaused(bool),
    SignalStop,
    /// Drop the controller's session handle.
    ReleaseSession,
}

pub fn transition(state: RecordingState, event: RecordingEvent) -> (RecordingState, Vec<SideEffect>) {
    match (&state, event) {
        (RecordingState::Idle | RecordingState::Failed { .. }, RecordingEvent::Started) => {
            let new_state = RecordingState::Recording {
                started_at: Instant::now(),
                paused: false,
            };
            (new_state, vec![])
        }

        (RecordingState::Recording { started_at, paused }, RecordingEvent::PauseToggled) => {
            let paused = !paused;
            let new_state = RecordingState::Recording {
                started_at: *started_at,
                paused,
            };
            (new_state, vec![SideEffect::SetPaused(paused)])
        }

        (RecordingState::Recording { started_at, .. }, RecordingEvent::StopRequested) => {
            let new_state = RecordingState::Stopping {
                started_at: *started_at,
                stop_requested_at: Instant::now(),
            };
            (new_state, vec![SideEffect::SignalStop])
        }

        (
            RecordingState::Recording { .. } | RecordingState::Stopping { .. },
            RecordingEvent::Finished,
        ) => (RecordingState::Idle, vec![SideEffect::ReleaseSession]),

        (
            RecordingState::Recording { .. } | RecordingState::Stopping { .. },
            RecordingEvent::Failed { error },
        ) => {
            let new_state = RecordingState::Failed {
                error: error.to_string(),
            };
            (new_state, vec![SideEffect::ReleaseSession])
        }

        (RecordingState::Failed { .. }, RecordingEvent::Reset) => (RecordingState::Idle, vec![]),

        _ => (state, vec![]),
    }
}

/// Snapshot for the control surface: which affordances to enable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatus {
    pub is_recording: bool,
    pub is_paused: bool,
    pub is_stopping: bool,
    pub can_start: bool,
    pub can_pause: bool,
    pub output_path: Option<String>,
    pub error: Option<String>,
}

impl RecorderStatus {
    pub fn from_state(state: &RecordingState, output_path: Option<String>) -> Self {
        Self {
            is_recording: matches!(state, RecordingState::Recording { .. }),
            is_paused: state.is_paused(),
            is_stopping: matches!(state, RecordingState::Stopping { .. }),
            can_start: !state.is_active(),
            can_pause: matches!(state, RecordingState::Recording { .. }),
            output_path,
            error: match state {
                RecordingState::Failed { error } => Some(error.clone()),
                _ => None,
            },
        }
    }
}
