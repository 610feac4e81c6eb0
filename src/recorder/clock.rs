use std::time::{Duration, Instant};

/// Elapsed recording time with paused intervals excluded.
///
/// Every method takes the caller's `now` so the loop can use a single
/// timestamp per iteration.
#[derive(Debug, Clone)]
pub struct SessionClock {
    started_at: Instant,
    paused_total: Duration,
    paused_since: Option<Instant>,
}

impl SessionClock {
    pub fn start(now: Instant) -> Self {
        Self {
            started_at: now,
            paused_total: Duration::ZERO,
            paused_since: None,
        }
    }

    /// Opens a paused interval. Pausing while already paused keeps the
    /// original interval start.
    pub fn pause(&mut self, now: Instant) {
        if self.paused_since.is_none() {
            self.paused_since = Some(now);
        }
    }

    /// Closes the open paused interval, if any, and folds it into the total.
    pub fn resume(&mut self, now: Instant) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total += now.saturating_duration_since(since);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    /// `(now - start) - paused`, frozen while a paused interval is open.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let open_pause = self
            .paused_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();

        now.saturating_duration_since(self.started_at)
            .saturating_sub(self.paused_total)
            .saturating_sub(open_pause)
    }

    pub fn paused_total(&self) -> Duration {
        self.paused_total
    }
}
