//! Text commands for the terminal control surface.

use super::backend::CaptureBackend;
use super::controller::Recorder;
use super::events::RecorderEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `start [fps]`; falls back to the configured frame rate.
    Start(Option<f64>),
    Pause,
    Resume,
    /// Pause when recording, resume when paused.
    Toggle,
    Stop,
    Shot,
    Status,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let name = parts.next().ok_or_else(|| "Empty command".to_string())?;

    let command = match name.to_ascii_lowercase().as_str() {
        "start" | "record" => {
            let fps = parts
                .next()
                .map(|raw| {
                    raw.parse::<f64>()
                        .map_err(|_| format!("Invalid frame rate: {}", raw))
                })
                .transpose()?;
            Command::Start(fps)
        }
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "toggle" | "p" => Command::Toggle,
        "stop" => Command::Stop,
        "shot" | "screenshot" => Command::Shot,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: {}", other)),
    };

    if parts.next().is_some() {
        return Err(format!("Too many arguments for {}", name));
    }

    Ok(command)
}

/// Runs one command and returns the line to show the user.
pub fn execute<B: CaptureBackend>(recorder: &Recorder<B>, command: &Command) -> Result<String, String> {
    match command {
        Command::Start(fps) => {
            let fps = fps.unwrap_or(recorder.settings().frame_rate);
            let path = recorder
                .start_recording(fps)
                .map_err(|e| e.to_string())?;
            Ok(format!("REC {}", path.display()))
        }
        Command::Pause => {
            recorder.pause().map_err(|e| e.to_string())?;
            Ok("PAUSED".to_string())
        }
        Command::Resume => {
            recorder.resume().map_err(|e| e.to_string())?;
            Ok("RESUMED".to_string())
        }
        Command::Toggle => {
            let paused = recorder.toggle_pause().map_err(|e| e.to_string())?;
            Ok(if paused { "PAUSED" } else { "RESUMED" }.to_string())
        }
        Command::Stop => {
            recorder.stop_recording();
            Ok("STOPPING".to_string())
        }
        Command::Shot => {
            let path = recorder.capture_screenshot().map_err(|e| e.to_string())?;
            Ok(format!("SAVED {}", path.display()))
        }
        Command::Status => serde_json::to_string(&recorder.status()).map_err(|e| e.to_string()),
        Command::Quit => {
            recorder.stop_recording();
            match recorder.wait_for_session() {
                Some(Ok(summary)) => Ok(format!("FINISH {}", summary.path.display())),
                Some(Err(e)) => Err(e.to_string()),
                None => Ok("BYE".to_string()),
            }
        }
    }
}

/// Renders a loop event for the terminal. Time updates overwrite one line.
pub fn describe_event(event: &RecorderEvent) -> String {
    match event {
        RecorderEvent::TimeUpdate(elapsed) => elapsed.clone(),
        RecorderEvent::Finished(summary) => format!(
            "FINISH {} ({} frames, {:.1}s)",
            summary.path.display(),
            summary.frames_written,
            summary.encoded_seconds
        ),
        RecorderEvent::Failed { summary, error } => format!(
            "FAILED {}: {} ({} frames kept)",
            summary.path.display(),
            error,
            summary.frames_written
        ),
    }
}
