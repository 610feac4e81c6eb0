use crate::shared::paths::{ensure_dir, get_log_dir};
use std::collections::HashMap;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Log targets that get their own file. Everything else lands in `system.log`.
const ROUTED_TARGETS: [&str; 1] = ["recorder"];

/// Guards that must be kept alive to ensure logs are flushed.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Routes events to a per-target file based on the event's `target`.
struct TargetWriter {
    writers: HashMap<String, NonBlocking>,
    system_writer: NonBlocking,
}

impl TargetWriter {
    fn new(writers: HashMap<String, NonBlocking>, system_writer: NonBlocking) -> Self {
        Self {
            writers,
            system_writer,
        }
    }

    fn writer_for_target(&self, target: &str) -> &NonBlocking {
        self.writers
            .iter()
            .find(|(name, _)| target_matches(target, name))
            .map(|(_, writer)| writer)
            .unwrap_or(&self.system_writer)
    }
}

fn target_matches(target: &str, name: &str) -> bool {
    target == name
        || target
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with("::"))
}

impl<'a> MakeWriter<'a> for TargetWriter {
    type Writer = NonBlocking;

    fn make_writer(&'a self) -> Self::Writer {
        self.system_writer.clone()
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        self.writer_for_target(meta.target()).clone()
    }
}

/// Initialize the logging system with per-target log files.
pub fn init_logging() -> std::io::Result<LoggingGuards> {
    let log_dir = get_log_dir();
    ensure_dir(&log_dir)?;

    let mut guards = Vec::new();
    let mut writers = HashMap::new();

    for target in ROUTED_TARGETS {
        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &log_dir, format!("{}.log", target));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        writers.insert(target.to_string(), non_blocking);
        guards.push(guard);
    }

    let system_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "system.log");
    let (system_writer, system_guard) = tracing_appender::non_blocking(system_appender);
    guards.push(system_guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(TargetWriter::new(writers, system_writer))
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true),
    );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    tracing::info!(target: "system", "Logging initialized at {:?}", log_dir);

    Ok(LoggingGuards { _guards: guards })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_matching() {
        assert!(target_matches("recorder", "recorder"));
        assert!(target_matches("recorder::worker", "recorder"));
        assert!(!target_matches("recorders", "recorder"));
        assert!(!target_matches("system", "recorder"));
    }
}
