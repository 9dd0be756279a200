//! Reconnect delay policy.
//!
//! Delays use full jitter: `random(0, min(max, base * 2^attempt))`. The
//! attempt counter runs from the last successful handshake, and an optional
//! limit turns a long outage into [`BackoffExhausted`].

use std::time::Duration;

/// Every allowed reconnect attempt has been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BackoffExhausted {
    pub(crate) limit: u32,
}

#[derive(Debug)]
pub(crate) struct Backoff {
    base_ms: u64,
    max_ms: u64,
    limit: Option<u32>,
    /// Delays handed out since the last reset.
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new(base_ms: u64, max_ms: u64, limit: Option<u32>) -> Self {
        Self {
            base_ms,
            max_ms,
            limit,
            attempt: 0,
        }
    }

    /// Delays handed out since the last successful handshake.
    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Upper bound of the next delay, before jitter.
    fn ceiling_ms(&self) -> u64 {
        let factor = 1u64.checked_shl(self.attempt).unwrap_or(u64::MAX);
        self.base_ms.saturating_mul(factor).min(self.max_ms)
    }

    /// Next jittered delay, or [`BackoffExhausted`] once the limit is used up.
    pub(crate) fn next_delay(&mut self) -> Result<Duration, BackoffExhausted> {
        if let Some(limit) = self.limit
            && self.attempt >= limit
        {
            return Err(BackoffExhausted { limit });
        }
        let ceiling = self.ceiling_ms();
        self.attempt = self.attempt.saturating_add(1);
        if ceiling == 0 {
            return Ok(Duration::ZERO);
        }
        Ok(Duration::from_millis(fastrand::u64(0..=ceiling)))
    }

    /// Start over after a successful handshake.
    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_stay_under_a_doubling_ceiling() {
        let mut b = Backoff::new(1000, 60_000, None);
        for ceiling in [1000, 2000, 4000, 8000] {
            assert_eq!(b.ceiling_ms(), ceiling);
            assert!(b.next_delay().unwrap() <= Duration::from_millis(ceiling));
        }
    }

    #[test]
    fn ceiling_is_capped() {
        let mut b = Backoff::new(1000, 5000, None);
        for _ in 0..20 {
            assert!(b.next_delay().unwrap() <= Duration::from_millis(5000));
        }
        assert_eq!(b.ceiling_ms(), 5000);
    }

    #[test]
    fn limit_counts_from_last_reset() {
        let mut b = Backoff::new(10, 100, Some(2));
        assert!(b.next_delay().is_ok());
        assert!(b.next_delay().is_ok());
        assert_eq!(b.next_delay(), Err(BackoffExhausted { limit: 2 }));

        b.reset();
        assert_eq!(b.attempt(), 0);
        assert!(b.next_delay().is_ok());
    }

    #[test]
    fn zero_base_never_waits() {
        let mut b = Backoff::new(0, 0, None);
        for _ in 0..10 {
            assert_eq!(b.next_delay().unwrap(), Duration::ZERO);
        }
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        let mut b = Backoff::new(1000, 60_000, None);
        b.attempt = u32::MAX;
        assert!(b.next_delay().unwrap() <= Duration::from_millis(60_000));
        assert_eq!(b.attempt(), u32::MAX);
    }
}
