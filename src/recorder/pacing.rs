// Feed-forward frame pacing for the capture loop

use std::time::{Duration, Instant};

use super::types::FrameRate;

/// Throttles loop iterations to the target frame period.
///
/// Each iteration sleeps for whatever is left of the period after its own
/// work. Iterations that overrun the period are not delayed further and the
/// deficit is not carried over, so the cadence can fall below the target
/// under load but never runs above it.
pub struct FramePacer {
    frame_period: Duration,
    iteration_start: Instant,
    overruns: u64,
}

impl FramePacer {
    pub fn new(frame_rate: FrameRate) -> Self {
        Self {
            frame_period: frame_rate.period(),
            iteration_start: Instant::now(),
            overruns: 0,
        }
    }

    /// Marks the top of an iteration.
    pub fn begin_iteration(&mut self) -> Instant {
        self.iteration_start = Instant::now();
        self.iteration_start
    }

    /// Time left in the current period given how long the iteration took.
    pub fn remaining(&self, iteration_duration: Duration) -> Duration {
        self.frame_period.saturating_sub(iteration_duration)
    }

    /// Sleeps out the rest of the current frame period.
    pub fn wait_for_next_frame(&mut self) {
        let spent = self.iteration_start.elapsed();
        let wait = self.remaining(spent);

        if wait.is_zero() {
            self.overruns += 1;
            if self.overruns % 100 == 1 {
                tracing::debug!(target: "recorder",
                    "[PACER] Iteration took {:?} (period {:?}), {} overruns so far",
                    spent, self.frame_period, self.overruns);
            }
            return;
        }

        std::thread::sleep(wait);
    }

    pub fn frame_period(&self) -> Duration {
        self.frame_period
    }

    /// Iterations that used up their whole frame period.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer(fps: f64) -> FramePacer {
        FramePacer::new(FrameRate::new(fps).unwrap())
    }

    #[test]
    fn test_remaining_is_period_minus_work() {
        let p = pacer(20.0);
        assert_eq!(p.frame_period(), Duration::from_millis(50));
        assert_eq!(p.remaining(Duration::from_millis(10)), Duration::from_millis(40));
    }

    #[test]
    fn test_overrun_is_not_delayed() {
        let p = pacer(20.0);
        assert_eq!(p.remaining(Duration::from_millis(50)), Duration::ZERO);
        assert_eq!(p.remaining(Duration::from_millis(300)), Duration::ZERO);
    }

    #[test]
    fn test_fast_iteration_is_throttled() {
        let mut p = pacer(50.0);
        let start = p.begin_iteration();
        p.wait_for_next_frame();

        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(p.overruns(), 0);
    }

    #[test]
    fn test_slow_iteration_counts_overrun() {
        let mut p = pacer(100.0);
        p.begin_iteration();
        std::thread::sleep(Duration::from_millis(15));

        let before = Instant::now();
        p.wait_for_next_frame();

        assert!(before.elapsed() < Duration::from_millis(5));
        assert_eq!(p.overruns(), 1);
    }
}
