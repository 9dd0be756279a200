//! Heartbeat timer and zombie-connection detection.
//!
//! The timer is polled by the session's event loop, so beats and reads are
//! sequenced by one task. Each beat sets an ack-pending flag; if the flag is
//! still set when the next beat is due, the connection is a zombie.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Outcome of a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Beat {
    /// Send a heartbeat now.
    Send,
    /// The previous heartbeat was never acknowledged.
    Missed,
}

/// Heartbeat state for one connection.
pub(crate) struct Heartbeat {
    interval: Interval,
    awaiting_ack: bool,
    last_sent: Option<Instant>,
    latency: Option<Duration>,
}

impl Heartbeat {
    /// Start a heartbeat with the given period.
    ///
    /// The first beat fires after `period * jitter`; `jitter` is clamped to
    /// `0.0..=1.0`.
    pub(crate) fn new(period: Duration, jitter: f64) -> Self {
        let period = period.max(Duration::from_millis(1));
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let now = Instant::now();
        let first = now.checked_add(period.mul_f64(jitter)).unwrap_or(now);

        let mut interval = tokio::time::interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            interval,
            awaiting_ack: false,
            last_sent: None,
            latency: None,
        }
    }

    /// Wait for the next beat. Cancel safe.
    pub(crate) async fn tick(&mut self) {
        self.interval.tick().await;
    }

    /// Record that a beat is due and decide what to do.
    ///
    /// Once a beat is missed the heartbeat stays dead; the connection must
    /// be replaced.
    pub(crate) fn beat(&mut self) -> Beat {
        if self.awaiting_ack {
            return Beat::Missed;
        }
        self.awaiting_ack = true;
        self.last_sent = Some(Instant::now());
        Beat::Send
    }

    /// Record a heartbeat ACK.
    pub(crate) fn ack(&mut self) {
        self.awaiting_ack = false;
        if let Some(sent) = self.last_sent.take() {
            self.latency = Some(sent.elapsed());
        }
    }

    /// Whether a sent heartbeat is still unacknowledged.
    pub(crate) fn is_awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    /// Round-trip time of the last acknowledged heartbeat.
    pub(crate) fn latency(&self) -> Option<Duration> {
        self.latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn beat_then_ack_stays_healthy() {
        let mut hb = Heartbeat::new(Duration::from_secs(45), 0.0);
        assert_eq!(hb.beat(), Beat::Send);
        assert!(hb.is_awaiting_ack());
        hb.ack();
        assert!(!hb.is_awaiting_ack());
        assert_eq!(hb.beat(), Beat::Send);
    }

    #[tokio::test(start_paused = true)]
    async fn missed_ack_is_detected() {
        let mut hb = Heartbeat::new(Duration::from_secs(45), 0.0);
        assert_eq!(hb.beat(), Beat::Send);
        assert_eq!(hb.beat(), Beat::Missed);
        assert_eq!(hb.beat(), Beat::Missed);
    }

    #[tokio::test(start_paused = true)]
    async fn ack_without_beat_is_harmless() {
        let mut hb = Heartbeat::new(Duration::from_secs(45), 0.5);
        hb.ack();
        assert!(hb.latency().is_none());
        assert_eq!(hb.beat(), Beat::Send);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_jittered() {
        let mut hb = Heartbeat::new(Duration::from_millis(1000), 0.25);
        let start = Instant::now();
        hb.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(250));
        hb.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(1250));
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_measured() {
        let mut hb = Heartbeat::new(Duration::from_millis(1000), 0.0);
        hb.tick().await;
        assert_eq!(hb.beat(), Beat::Send);
        tokio::time::advance(Duration::from_millis(40)).await;
        hb.ack();
        assert_eq!(hb.latency(), Some(Duration::from_millis(40)));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_jitter_fires_immediately() {
        let mut hb = Heartbeat::new(Duration::from_millis(1000), f64::NAN);
        let start = Instant::now();
        hb.tick().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
