//! Consecutive-failure circuit breaker guarding calls to the ML service.
//!
//! ```text
//!   ┌────────┐  failures >= threshold  ┌──────┐  reset timeout  ┌──────────┐
//!   │ Closed │ ──────────────────────► │ Open │ ──────────────► │ HalfOpen │
//!   └────────┘                         └──────┘                 └────┬─────┘
//!       ▲                                  ▲      failure            │
//!       │                                  └─────────────────────────┤
//!       └──────────────────────── success ───────────────────────────┘
//! ```

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitTransition {
    Opened { failures: u32 },
    HalfOpened,
    Closed,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    /// Whether a request may be attempted. An open circuit whose reset
    /// timeout has elapsed moves to half-open and lets the probe through.
    pub fn allow_request(&self) -> bool {
        let mut guard = self.inner.lock();
        match guard.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = guard
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.reset_timeout {
                    guard.state = CircuitState::HalfOpen;
                    info!("ML circuit breaker entering HALF_OPEN state");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) -> Option<CircuitTransition> {
        let mut guard = self.inner.lock();
        guard.failure_count = 0;
        if guard.state != CircuitState::Closed {
            guard.state = CircuitState::Closed;
            info!("ML circuit breaker CLOSED, service recovered");
            return Some(CircuitTransition::Closed);
        }
        None
    }

    pub fn record_failure(&self) -> Option<CircuitTransition> {
        let mut guard = self.inner.lock();
        guard.failure_count = guard.failure_count.saturating_add(1);
        guard.last_failure = Some(Instant::now());

        let should_open = guard.state == CircuitState::HalfOpen
            || guard.failure_count >= self.failure_threshold;
        if should_open && guard.state != CircuitState::Open {
            guard.state = CircuitState::Open;
            warn!(failures = guard.failure_count, "ML circuit breaker OPEN, service unavailable");
            return Some(CircuitTransition::Opened {
                failures: guard.failure_count,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert_eq!(breaker.record_failure(), None);
        assert_eq!(breaker.record_failure(), None);
        assert_eq!(
            breaker.record_failure(),
            Some(CircuitTransition::Opened { failures: 3 })
        );
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure();
        assert_eq!(breaker.record_success(), None);
        assert_eq!(breaker.failure_count(), 0);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_after_reset_timeout_then_closes() {
        let breaker = CircuitBreaker::new(1, Duration::ZERO);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.record_success(), Some(CircuitTransition::Closed));
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(5, Duration::ZERO);
        for _ in 0..5 {
            breaker.record_failure();
        }
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(matches!(
            breaker.record_failure(),
            Some(CircuitTransition::Opened { .. })
        ));
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
