use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tradier_types::BackoffConfig;

/// Stateful sequence of retry delays.
///
/// `None` is the stop sentinel: the caller must give up instead of retrying.
pub trait Backoff: Send {
    /// Delay to wait before the next attempt, or `None` to stop retrying.
    fn next_backoff(&mut self) -> Option<Duration>;
    /// Return to the initial delay.
    fn reset(&mut self);
}

/// Add up to `jitter_percent` percent of random jitter on top of `base_ms`.
#[must_use]
pub fn jitter_wait(base_ms: u64, jitter_percent: u32) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, (base_ms.saturating_mul(u64::from(jitter_percent))) / 100)
    };
    let mut rng = rand::rng();
    base_ms + rng.random_range(0..jitter_range)
}

/// Exponentially growing delays with jitter, capped per-delay and in total elapsed time.
///
/// The elapsed-time window opens at the first delay handed out after
/// construction or [`reset`](Backoff::reset) and is measured on the Tokio
/// clock. Once it closes every call returns the stop sentinel until the policy
/// is reset, so a long-lived owner that keeps one policy across calls must
/// reset it after recovering.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    cfg: BackoffConfig,
    current_ms: u64,
    started: Option<Instant>,
}

impl ExponentialBackoff {
    /// Build a policy starting at the configured initial interval.
    #[must_use]
    pub fn new(cfg: BackoffConfig) -> Self {
        Self {
            current_ms: cfg.initial_interval_ms,
            cfg,
            started: None,
        }
    }

    /// Configuration this policy was built from.
    #[must_use]
    pub const fn config(&self) -> &BackoffConfig {
        &self.cfg
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

impl Backoff for ExponentialBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        let started = *self.started.get_or_insert_with(Instant::now);
        if let Some(max_elapsed) = self.cfg.max_elapsed_ms
            && started.elapsed() > Duration::from_millis(max_elapsed)
        {
            return None;
        }
        let delay = jitter_wait(self.current_ms, u32::from(self.cfg.jitter_percent))
            .min(self.cfg.max_interval_ms);
        let grown = (self.current_ms as f64 * self.cfg.multiplier.max(1.0)) as u64;
        self.current_ms = grown
            .max(self.cfg.initial_interval_ms)
            .min(self.cfg.max_interval_ms);
        Some(Duration::from_millis(delay))
    }

    fn reset(&mut self) {
        self.current_ms = self.cfg.initial_interval_ms;
        self.started = None;
    }
}

/// The same delay every time, never stopping.
#[derive(Debug, Clone, Copy)]
pub struct ConstantBackoff(pub Duration);

impl Backoff for ConstantBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.0)
    }

    fn reset(&mut self) {}
}

/// Always returns the stop sentinel; disables retries after the first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopBackoff;

impl Backoff for StopBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}
}
