pub mod core;
pub mod recorder;
pub mod shared;

use std::io::{BufRead, Write};

use crate::core::logging;
use crate::core::settings::{get_settings_path, load_settings, save_settings};
use crate::recorder::commands::{describe_event, execute, parse_command, Command};
use crate::recorder::{Recorder, RecorderEvent, SystemBackend};

const PROMPT_HELP: &str = "commands: start [fps] | pause | resume | toggle | stop | shot | status | quit";

/// Terminal entry point: reads commands from stdin until `quit` or EOF.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _logging_guards = logging::init_logging()?;

    let settings = load_settings();
    if !get_settings_path().exists() {
        if let Err(e) = save_settings(&settings) {
            tracing::warn!(target: "system", "[SETTINGS] Could not write defaults: {}", e);
        }
    }
    settings.ensure_output_dirs()?;

    tracing::info!(target: "system",
        "[SETTINGS] videos={:?} images={:?} fps={}",
        settings.video_dir, settings.image_dir, settings.frame_rate);

    let (recorder, events) = Recorder::new(SystemBackend, settings);

    std::thread::Builder::new()
        .name("event-printer".to_string())
        .spawn(move || {
            for event in events.iter() {
                let line = describe_event(&event);
                let mut stdout = std::io::stdout().lock();
                let _ = match event {
                    RecorderEvent::TimeUpdate(_) => write!(stdout, "\r{}", line),
                    _ => writeln!(stdout, "\r{}", line),
                };
                let _ = stdout.flush();
            }
        })?;

    println!("{}", PROMPT_HELP);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}\n{}", e, PROMPT_HELP);
                continue;
            }
        };

        match execute(&recorder, &command) {
            Ok(message) => println!("{}", message),
            Err(message) => eprintln!("ERROR {}", message),
        }

        if command == Command::Quit {
            return Ok(());
        }
    }

    // EOF: finalize whatever is still recording.
    match execute(&recorder, &Command::Quit) {
        Ok(message) => {
            println!("{}", message);
            Ok(())
        }
        Err(message) => Err(message.into()),
    }
}
