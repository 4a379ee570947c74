//! Reconnection backoff.
//!
//! Two states: *stable* (no failures, nothing pending) and *retrying* (at least one
//! failure, exactly one retry timer pending). Each failure grows the delay by 1.5x until
//! the attempt ceiling, after which retries settle at the maximum delay indefinitely.
//! The ceiling crossing is announced once per failure streak.

use crate::config::ReconnectConfig;
use crate::timer::Timer;
use std::time::Duration;

/// Growth factor applied per attempt.
const GROWTH: f64 = 1.5;

/// What the session should do after a failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPlan {
    /// Attempt number after this failure (1-based).
    pub attempt: u32,
    /// How long to wait before reinitializing.
    pub delay: Duration,
    /// `true` exactly once per streak, when the attempt ceiling is reached.
    pub announce_disconnected: bool,
}

#[derive(Debug)]
pub struct Backoff {
    config: ReconnectConfig,
    attempts: u32,
    current_delay: Duration,
    announced: bool,
    pending: Option<Timer>,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
            current_delay: Duration::ZERO,
            announced: false,
            pending: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay chosen for the most recent failure (zero while stable).
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_stable(&self) -> bool {
        self.attempts == 0 && self.pending.is_none()
    }

    /// Delay for attempt `n`: `min(base * 1.5^n, max)`, or `max` from the ceiling on.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let max = Duration::from_millis(self.config.max_delay_ms);
        if attempt >= self.config.max_attempts {
            return max;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let millis = self.config.base_delay_ms as f64 * GROWTH.powi(exponent);
        Duration::from_secs_f64(millis / 1000.0).min(max)
    }

    /// Count one failure and decide the next retry.
    pub fn record_failure(&mut self) -> RetryPlan {
        self.attempts = self.attempts.saturating_add(1);
        let delay = self.delay_for(self.attempts).max(self.current_delay);
        self.current_delay = delay;

        let announce_disconnected =
            !self.announced && self.attempts >= self.config.max_attempts;
        if announce_disconnected {
            self.announced = true;
        }

        RetryPlan {
            attempt: self.attempts,
            delay,
            announce_disconnected,
        }
    }

    /// Install the retry timer, replacing (and cancelling) any previous one.
    pub(crate) fn arm(&mut self, timer: Timer) {
        if let Some(old) = self.pending.replace(timer) {
            old.cancel();
        }
    }

    /// Claim the pending timer if `token` is the one that fired. Stale fires return `false`.
    pub(crate) fn take_fired(&mut self, token: u64) -> bool {
        match &self.pending {
            Some(timer) if timer.token() == token => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel the pending retry, if any, without touching the streak.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.pending.take() {
            timer.cancel();
        }
    }

    /// Back to stable: streak over, pending retry cancelled.
    pub fn reset(&mut self) {
        self.cancel();
        self.attempts = 0;
        self.current_delay = Duration::ZERO;
        self.announced = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff::new(ReconnectConfig::default())
    }

    #[test]
    fn first_failure_waits_one_and_a_half_seconds() {
        let mut b = backoff();
        assert!(b.is_stable());
        let plan = b.record_failure();
        assert_eq!(plan.attempt, 1);
        assert_eq!(plan.delay, Duration::from_millis(1500));
        assert!(!plan.announce_disconnected);
        assert_eq!(b.attempts(), 1);
    }

    #[test]
    fn delays_follow_growth_curve_below_ceiling() {
        let b = backoff();
        let mut previous = Duration::ZERO;
        for n in 1..10u32 {
            let expected = (1000.0 * 1.5f64.powi(n as i32)).min(300_000.0);
            let got = b.delay_for(n);
            assert!(
                (got.as_secs_f64() * 1000.0 - expected).abs() < 1e-6,
                "n={n}: {got:?} vs {expected}ms"
            );
            assert!(got >= previous);
            previous = got;
        }
        assert_eq!(b.delay_for(2), Duration::from_millis(2250));
    }

    #[test]
    fn ceiling_pins_delay_and_announces_once() {
        let mut b = backoff();
        let plans: Vec<_> = (0..15).map(|_| b.record_failure()).collect();

        for plan in &plans[9..] {
            assert_eq!(plan.delay, Duration::from_secs(300));
        }
        let announced: Vec<_> = plans
            .iter()
            .filter(|p| p.announce_disconnected)
            .map(|p| p.attempt)
            .collect();
        assert_eq!(announced, [10]);
        assert!(plans.windows(2).all(|w| w[0].delay <= w[1].delay));
    }

    #[test]
    fn max_delay_clamps_growth() {
        let mut b = Backoff::new(ReconnectConfig {
            base_delay_ms: 1000,
            max_delay_ms: 3000,
            max_attempts: 10,
        });
        let delays: Vec<_> = (0..5).map(|_| b.record_failure().delay).collect();
        assert_eq!(delays[0], Duration::from_millis(1500));
        assert_eq!(delays[1], Duration::from_millis(2250));
        assert_eq!(delays[2], Duration::from_millis(3000));
        assert_eq!(delays[4], Duration::from_millis(3000));
    }

    #[test]
    fn reset_starts_a_new_streak() {
        let mut b = backoff();
        for _ in 0..12 {
            b.record_failure();
        }
        b.reset();
        assert!(b.is_stable());
        assert_eq!(b.current_delay(), Duration::ZERO);

        let plan = b.record_failure();
        assert_eq!(plan.attempt, 1);
        assert_eq!(plan.delay, Duration::from_millis(1500));
        for _ in 1..9 {
            assert!(!b.record_failure().announce_disconnected);
        }
        assert!(b.record_failure().announce_disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_fire_does_not_claim_pending_timer() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut b = backoff();
        b.record_failure();
        b.arm(Timer::once(&tx, crate::timer::TimerKind::Reconnect, 7, Duration::from_secs(1)));
        assert!(b.is_pending());
        assert!(!b.take_fired(6));
        assert!(b.is_pending());
        assert!(b.take_fired(7));
        assert!(!b.is_pending());
        assert!(!b.is_stable());
    }
}
