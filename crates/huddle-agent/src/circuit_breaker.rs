//! Circuit breaker for decision backend calls
//!
//! One breaker lives inside each backend instance, so concurrent draft runs
//! with their own backends never trip each other. After the cool-down a
//! single probe is let through; every other caller keeps failing fast until
//! that probe reports back.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests allowed
    Closed,
    /// Too many consecutive failures, requests rejected immediately
    Open,
    /// Cool-down elapsed, one probe may go through
    HalfOpen,
}

/// Consecutive-failure circuit breaker with a single half-open probe
///
/// ```
/// use huddle_agent::CircuitBreaker;
///
/// let cb = CircuitBreaker::new(2, 30);
/// cb.record_failure();
/// cb.record_failure();
/// assert!(!cb.try_acquire());
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    consecutive_failures: AtomicU32,
    opened_at_ms: AtomicU64,
    probing: AtomicBool,
    threshold: u32,
    cool_down: Duration,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl CircuitBreaker {
    /// `threshold` consecutive failures open the circuit for `cool_down_secs`
    pub fn new(threshold: u32, cool_down_secs: u64) -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            probing: AtomicBool::new(false),
            threshold: threshold.max(1),
            cool_down: Duration::from_secs(cool_down_secs),
        }
    }

    fn since_last_failure(&self) -> u64 {
        now_millis().saturating_sub(self.opened_at_ms.load(Ordering::Acquire))
    }

    pub fn state(&self) -> CircuitState {
        if self.consecutive_failures.load(Ordering::Acquire) < self.threshold {
            CircuitState::Closed
        } else if self.since_last_failure() >= self.cool_down.as_millis() as u64 {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    /// Ask to send one request
    ///
    /// Always true while closed, never while open. In half-open exactly one
    /// caller wins the probe; it must report through `record_success` or
    /// `record_failure`.
    pub fn try_acquire(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => self
                .probing
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok(),
        }
    }

    /// A backend exchange succeeded: close the circuit
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.probing.store(false, Ordering::Release);
    }

    /// A backend exchange failed; a failed probe restarts the cool-down
    pub fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::AcqRel);
        self.opened_at_ms.store(now_millis(), Ordering::Release);
        self.probing.store(false, Ordering::Release);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    /// Time left before a probe is allowed, zero unless open
    pub fn remaining_cool_down(&self) -> Duration {
        match self.state() {
            CircuitState::Open => {
                let cool_down = self.cool_down.as_millis() as u64;
                Duration::from_millis(cool_down.saturating_sub(self.since_last_failure()))
            }
            _ => Duration::ZERO,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, 30)
    }
}
