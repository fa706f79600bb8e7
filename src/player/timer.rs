//! Periodic progress tick, driven by the caller's clock.

use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub struct ProgressTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl ProgressTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// True when a tick is due at `now`. Missed periods collapse into one tick.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let next = due + self.interval;
                self.next_due = Some(if next <= now { now + self.interval } else { next });
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_per_interval() {
        let start = Instant::now();
        let mut timer = ProgressTimer::new(Duration::from_millis(100));
        assert!(!timer.fire(start));

        timer.start(start);
        assert!(!timer.fire(start + Duration::from_millis(50)));
        assert!(timer.fire(start + Duration::from_millis(100)));
        assert!(!timer.fire(start + Duration::from_millis(150)));
        assert!(timer.fire(start + Duration::from_millis(200)));
    }

    #[test]
    fn test_missed_ticks_collapse() {
        let start = Instant::now();
        let mut timer = ProgressTimer::new(Duration::from_millis(100));
        timer.start(start);

        assert!(timer.fire(start + Duration::from_secs(5)));
        assert!(!timer.fire(start + Duration::from_millis(5050)));
    }

    #[test]
    fn test_cancel_stops_ticks() {
        let start = Instant::now();
        let mut timer = ProgressTimer::new(Duration::ZERO);
        assert_eq!(timer.interval(), MIN_INTERVAL);

        timer.start(start);
        assert!(timer.is_running());
        timer.cancel();
        assert!(!timer.is_running());
        assert!(!timer.fire(start + Duration::from_secs(1)));
    }
}
