use std::time::{Duration, Instant};

/// Rate limiter for progress reports.
///
/// The first report is allowed after `initial_delay`, later ones at most
/// every `interval`. Callers decide how often to ask; the throttle only
/// decides whether enough time has passed.
#[derive(Debug)]
pub struct ProgressThrottle {
    next_report: Instant,
    interval: Duration,
    sent_partial: bool,
}

impl ProgressThrottle {
    pub fn new(initial_delay: Duration, interval: Duration) -> Self {
        Self {
            next_report: Instant::now() + initial_delay,
            interval,
            sent_partial: false,
        }
    }

    /// Returns the percentage to report if a report is due now
    pub fn poll(&mut self, percent: f64) -> Option<f64> {
        let now = Instant::now();
        if now < self.next_report {
            return None;
        }
        self.next_report = now + self.interval;
        self.sent_partial = percent < 100.0;
        Some(percent)
    }

    /// A closing 100% report, needed only if the last report was below 100%
    pub fn finish(&mut self) -> Option<f64> {
        if std::mem::take(&mut self.sent_partial) {
            Some(100.0)
        } else {
            None
        }
    }
}

/// Percentage of `done` out of `total`, 100 for an empty total
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        100.0 * done as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_delay_suppresses() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(60), Duration::ZERO);
        assert_eq!(throttle.poll(50.0), None);
        assert_eq!(throttle.finish(), None);
    }

    #[test]
    fn test_interval_limits_reports() {
        let mut throttle = ProgressThrottle::new(Duration::ZERO, Duration::from_secs(60));
        assert_eq!(throttle.poll(10.0), Some(10.0));
        assert_eq!(throttle.poll(20.0), None);
        assert_eq!(throttle.finish(), Some(100.0));
        // only once
        assert_eq!(throttle.finish(), None);
    }

    #[test]
    fn test_no_closing_report_after_full() {
        let mut throttle = ProgressThrottle::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(throttle.poll(40.0), Some(40.0));
        assert_eq!(throttle.poll(100.0), Some(100.0));
        assert_eq!(throttle.finish(), None);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(0, 0), 100.0);
    }
}
