//! Consecutive-failure circuit breaker for model calls.
//!
//! After `failure_threshold` failures in a row, calls are refused for
//! `cooldown`. The first call after the cooldown goes through; if it fails
//! the breaker opens again immediately.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

pub struct ModelBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    failures: AtomicU32,
    open_until: Mutex<Option<Instant>>,
}

impl ModelBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            failures: AtomicU32::new(0),
            open_until: Mutex::new(None),
        }
    }

    /// Whether a call may be attempted now.
    pub fn allow(&self) -> bool {
        let mut open_until = self.open_until.lock().unwrap_or_else(PoisonError::into_inner);
        match *open_until {
            Some(until) if Instant::now() < until => false,
            Some(_) => {
                *open_until = None;
                info!("Model breaker cooldown elapsed, allowing a trial call");
                true
            }
            None => true,
        }
    }

    pub fn record_success(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.failure_threshold {
            let mut open_until = self.open_until.lock().unwrap_or_else(PoisonError::into_inner);
            *open_until = Some(Instant::now() + self.cooldown);
            warn!(
                failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Model breaker open, skipping model calls"
            );
        }
    }

    /// Whether calls are currently refused. Does not start a trial call.
    pub fn is_open(&self) -> bool {
        let open_until = self.open_until.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*open_until, Some(until) if Instant::now() < until)
    }
}
