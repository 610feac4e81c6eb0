pub mod backend;
pub mod capture;
pub mod clock;
pub mod commands;
pub mod controller;
pub mod errors;
pub mod events;
pub mod ffmpeg;
pub mod normalize;
pub mod pacing;
pub mod screenshot;
pub mod session;
pub mod state;
pub mod types;
pub mod worker;
pub mod writer;

pub use backend::{CaptureBackend, FrameSink, FrameSource, SystemBackend};
pub use controller::Recorder;
pub use errors::{CaptureError, EncodingError, RecorderError, ScreenshotError};
pub use events::{RecorderEvent, SessionSummary};
pub use state::RecorderStatus;
pub use types::{format_elapsed, CaptureRegion, Frame, FrameRate};
