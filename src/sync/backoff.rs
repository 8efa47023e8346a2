//! Backoff and circuit breaking for the polling loop.
//!
//! The controller is stateless apart from its policy; all counters live in
//! the store's [`SyncState`] so they are visible to UI consumers.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::app::FailureKind;
use crate::config::PollingConfig;
use crate::domain::{CircuitState, SyncState};

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub base_interval_ms: u64,
    pub max_interval_ms: u64,
    pub backoff_multiplier: f64,
    pub rate_limit_cooldown_ms: u64,
    pub failure_threshold: u32,
    pub circuit_cooldown_ms: u64,
}

impl BackoffPolicy {
    pub fn new(config: &PollingConfig) -> Self {
        Self {
            base_interval_ms: config.base_interval_ms,
            max_interval_ms: config.max_interval_ms,
            backoff_multiplier: config.backoff_multiplier,
            rate_limit_cooldown_ms: config.rate_limit_cooldown_ms,
            failure_threshold: config.failure_threshold,
            circuit_cooldown_ms: config.circuit_cooldown_ms,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(&PollingConfig::default())
    }
}

/// What the scheduler should do after a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffDecision {
    pub next_delay_ms: u64,
    /// Stop scheduling entirely (authentication has to be fixed upstream).
    pub pause: bool,
}

/// Result of consulting the circuit before a scheduled poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitCheck {
    Proceed,
    /// Circuit still open; try again after `retry_in_ms`.
    ShortCircuit { retry_in_ms: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct BackoffController {
    policy: BackoffPolicy,
}

impl BackoffController {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }

    pub fn on_success(&self, state: &mut SyncState, now: DateTime<Utc>) {
        if state.circuit_state == CircuitState::Open {
            tracing::info!("Poll succeeded, closing circuit");
        }
        state.consecutive_failure_count = 0;
        state.current_interval_ms = self.policy.base_interval_ms;
        state.circuit_state = CircuitState::Closed;
        state.circuit_reopen_at = None;
        state.last_successful_poll_at = Some(now);
    }

    pub fn on_failure(
        &self,
        state: &mut SyncState,
        kind: FailureKind,
        now: DateTime<Utc>,
    ) -> BackoffDecision {
        if kind == FailureKind::AuthFailure {
            return BackoffDecision {
                next_delay_ms: state.current_interval_ms,
                pause: true,
            };
        }

        state.consecutive_failure_count += 1;

        let next_delay_ms = match kind {
            FailureKind::RateLimited => self.policy.rate_limit_cooldown_ms,
            _ => {
                // The first failure retries at the current cadence to ride out one-off blips
                if state.consecutive_failure_count >= 2 {
                    let grown = state.current_interval_ms as f64 * self.policy.backoff_multiplier;
                    state.current_interval_ms =
                        (grown.min(self.policy.max_interval_ms as f64) as u64)
                            .max(state.current_interval_ms);
                }
                state.current_interval_ms
            }
        };

        if state.consecutive_failure_count >= self.policy.failure_threshold {
            if state.circuit_state == CircuitState::Closed {
                tracing::warn!(
                    "Opening circuit after {} consecutive failures",
                    state.consecutive_failure_count
                );
            }
            state.circuit_state = CircuitState::Open;
            state.circuit_reopen_at =
                Some(now + ChronoDuration::milliseconds(self.policy.circuit_cooldown_ms as i64));
        }

        BackoffDecision {
            next_delay_ms,
            pause: false,
        }
    }

    /// Close an expired circuit, or report how long it stays open.
    pub fn check_circuit(&self, state: &mut SyncState, now: DateTime<Utc>) -> CircuitCheck {
        if state.circuit_state == CircuitState::Closed {
            return CircuitCheck::Proceed;
        }

        match state.circuit_reopen_at {
            Some(reopen_at) if now < reopen_at => CircuitCheck::ShortCircuit {
                retry_in_ms: reopen_at
                    .signed_duration_since(now)
                    .num_milliseconds()
                    .max(1) as u64,
            },
            _ => {
                tracing::info!("Circuit cooldown elapsed, resuming polls");
                state.circuit_state = CircuitState::Closed;
                state.circuit_reopen_at = None;
                CircuitCheck::Proceed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base_interval_ms: 1000,
            max_interval_ms: 10_000,
            backoff_multiplier: 2.0,
            rate_limit_cooldown_ms: 300_000,
            failure_threshold: 3,
            circuit_cooldown_ms: 60_000,
        }
    }

    fn setup() -> (BackoffController, SyncState) {
        (BackoffController::new(policy()), SyncState::new(1000))
    }

    #[test]
    fn test_new_from_config() {
        let p = BackoffPolicy::new(&PollingConfig::default());
        assert_eq!(p.base_interval_ms, 30_000);
        assert_eq!(p.max_interval_ms, 300_000);
        assert_eq!(p.backoff_multiplier, 2.0);
        assert_eq!(p.failure_threshold, 3);
    }

    #[test]
    fn test_first_failure_retries_at_base() {
        let (c, mut s) = setup();
        let d = c.on_failure(&mut s, FailureKind::Transient, Utc::now());
        assert_eq!(d.next_delay_ms, 1000);
        assert!(!d.pause);
    }

    #[test]
    fn test_third_failure_is_base_times_m_squared() {
        let (c, mut s) = setup();
        let now = Utc::now();
        let delays: Vec<u64> = (0..3)
            .map(|_| c.on_failure(&mut s, FailureKind::Transient, now).next_delay_ms)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000]);
    }

    #[test]
    fn test_backoff_capped_and_monotonic() {
        let (c, mut s) = setup();
        let now = Utc::now();
        let mut last = 0;
        for _ in 0..10 {
            let d = c.on_failure(&mut s, FailureKind::Transient, now).next_delay_ms;
            assert!(d >= last);
            assert!(d <= 10_000);
            last = d;
        }
        assert_eq!(last, 10_000);
    }

    #[test]
    fn test_rate_limited_uses_fixed_cooldown() {
        let (c, mut s) = setup();
        let now = Utc::now();
        c.on_failure(&mut s, FailureKind::Transient, now);
        c.on_failure(&mut s, FailureKind::Transient, now);
        assert_eq!(s.current_interval_ms, 2000);

        let d = c.on_failure(&mut s, FailureKind::RateLimited, now);
        assert_eq!(d.next_delay_ms, 300_000);
        // The exponential interval is left where it was
        assert_eq!(s.current_interval_ms, 2000);
    }

    #[test]
    fn test_rate_limited_from_fresh_state() {
        let (c, mut s) = setup();
        let d = c.on_failure(&mut s, FailureKind::RateLimited, Utc::now());
        assert_eq!(d.next_delay_ms, 300_000);
        assert_eq!(s.consecutive_failure_count, 1);
    }

    #[test]
    fn test_auth_failure_pauses() {
        let (c, mut s) = setup();
        let d = c.on_failure(&mut s, FailureKind::AuthFailure, Utc::now());
        assert!(d.pause);
        assert_eq!(s.consecutive_failure_count, 0);
        assert_eq!(s.circuit_state, CircuitState::Closed);
    }

    #[test]
    fn test_circuit_opens_on_third_failure() {
        let (c, mut s) = setup();
        let now = Utc::now();
        c.on_failure(&mut s, FailureKind::Transient, now);
        c.on_failure(&mut s, FailureKind::Transient, now);
        assert_eq!(s.circuit_state, CircuitState::Closed);

        c.on_failure(&mut s, FailureKind::Transient, now);
        assert_eq!(s.circuit_state, CircuitState::Open);
        assert_eq!(
            s.circuit_reopen_at,
            Some(now + ChronoDuration::milliseconds(60_000))
        );
    }

    #[test]
    fn test_check_circuit_short_circuits_until_cooldown() {
        let (c, mut s) = setup();
        let now = Utc::now();
        for _ in 0..3 {
            c.on_failure(&mut s, FailureKind::Transient, now);
        }

        let later = now + ChronoDuration::milliseconds(20_000);
        assert_eq!(
            c.check_circuit(&mut s, later),
            CircuitCheck::ShortCircuit {
                retry_in_ms: 40_000
            }
        );
        assert!(s.is_circuit_open());

        let expired = now + ChronoDuration::milliseconds(60_000);
        assert_eq!(c.check_circuit(&mut s, expired), CircuitCheck::Proceed);
        assert_eq!(s.circuit_state, CircuitState::Closed);
    }

    #[test]
    fn test_success_resets_everything() {
        let (c, mut s) = setup();
        let now = Utc::now();
        for _ in 0..4 {
            c.on_failure(&mut s, FailureKind::Transient, now);
        }
        assert!(s.is_circuit_open());

        c.on_success(&mut s, now);
        assert_eq!(s.consecutive_failure_count, 0);
        assert_eq!(s.current_interval_ms, 1000);
        assert_eq!(s.circuit_state, CircuitState::Closed);
        assert!(s.circuit_reopen_at.is_none());
        assert_eq!(s.last_successful_poll_at, Some(now));
    }

    #[test]
    fn test_failed_half_open_attempt_reopens() {
        let (c, mut s) = setup();
        let now = Utc::now();
        for _ in 0..3 {
            c.on_failure(&mut s, FailureKind::Transient, now);
        }
        let expired = now + ChronoDuration::milliseconds(60_000);
        c.check_circuit(&mut s, expired);

        c.on_failure(&mut s, FailureKind::Transient, expired);
        assert!(s.is_circuit_open());
        assert_eq!(
            s.circuit_reopen_at,
            Some(expired + ChronoDuration::milliseconds(60_000))
        );
    }
}
