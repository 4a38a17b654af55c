//! Reconnect pacing.
//!
//! A controller that keeps refusing connections must not be hammered in a
//! hot loop, so each connection carries a backoff tracker. The very first
//! attempt of a connection (and the first attempt after a successful
//! activation) is immediate; every consecutive failure doubles the delay up
//! to the configured ceiling.

use std::time::Duration;

use crate::config::Config;

/// Per-connection exponential backoff state.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub(crate) const fn new(cfg: &Config) -> Self {
        Self {
            base: cfg.reconnect_ivl,
            max: cfg.reconnect_ivl_max,
            failures: 0,
        }
    }

    /// Delay to apply before the next connect attempt.
    pub(crate) fn next_delay(&self) -> Duration {
        match self.failures {
            0 => Duration::ZERO,
            n => {
                let shift = (n - 1).min(16);
                self.base
                    .saturating_mul(1u32 << shift)
                    .min(self.max)
            }
        }
    }

    /// Record a failed attempt.
    pub(crate) fn failed(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Record a successful activation.
    pub(crate) fn reset(&mut self) {
        self.failures = 0;
    }

    #[cfg(test)]
    pub(crate) const fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        let cfg = Config::default()
            .with_reconnect_ivl(Duration::from_millis(100))
            .with_reconnect_ivl_max(Duration::from_secs(1));
        Backoff::new(&cfg)
    }

    #[test]
    fn first_attempt_is_immediate() {
        let b = backoff();
        assert_eq!(b.next_delay(), Duration::ZERO);
    }

    #[test]
    fn doubles_and_caps() {
        let mut b = backoff();
        b.failed();
        assert_eq!(b.next_delay(), Duration::from_millis(100));
        b.failed();
        assert_eq!(b.next_delay(), Duration::from_millis(200));
        b.failed();
        assert_eq!(b.next_delay(), Duration::from_millis(400));
        b.failed();
        assert_eq!(b.next_delay(), Duration::from_millis(800));
        b.failed();
        assert_eq!(b.next_delay(), Duration::from_secs(1));
        b.failed();
        assert_eq!(b.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn reset_on_activation() {
        let mut b = backoff();
        b.failed();
        b.failed();
        assert_eq!(b.failures(), 2);
        b.reset();
        assert_eq!(b.next_delay(), Duration::ZERO);
    }
}
