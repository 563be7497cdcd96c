//! Poll scheduling

use std::time::Duration;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_MAX_ATTEMPTS: u32 = 150;
const DEFAULT_DEADLINE: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Every wait is `interval`
    Fixed,
    /// `interval * factor^n`, capped at `max_interval`
    Exponential { factor: f64, max_interval: Duration },
}

/// Bounds for polling one job: wait between requests, attempt cap and overall deadline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Measured from the end of the upload; `None` disables it
    pub deadline: Option<Duration>,
    pub backoff: Backoff,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            deadline: Some(DEFAULT_DEADLINE),
            backoff: Backoff::Fixed,
        }
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Wait before the request numbered `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential {
                factor,
                max_interval,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = self.interval.as_secs_f64() * factor.max(1.0).powi(exponent);
                Duration::from_secs_f64(secs.min(max_interval.as_secs_f64()))
            }
        }
    }

    /// Whether a request scheduled `delay` after `elapsed` would still fall inside the deadline.
    pub fn within_deadline(&self, elapsed: Duration, delay: Duration) -> bool {
        match self.deadline {
            Some(deadline) => elapsed + delay <= deadline,
            None => true,
        }
    }
}
