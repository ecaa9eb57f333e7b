// resilience/circuit_breaker.rs
//
// Call-guarding circuit breaker for the upstream dependency. State
// transitions happen under one lock; the guarded call itself runs with the
// lock released so a slow upstream never serializes unrelated callers.

use parking_lot::Mutex;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Error, Debug)]
pub enum BreakerError<E: std::error::Error> {
    /// The breaker short-circuited the call without invoking it
    #[error("circuit breaker is open")]
    Open,

    /// The guarded call ran and failed
    #[error(transparent)]
    Inner(E),
}

struct BreakerInner {
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker with closed, open and half-open states.
///
/// Every inner error counts as a failure; distinguishing error classes is
/// the caller's concern. After `threshold` consecutive failures the breaker
/// opens; once `reset_timeout` has elapsed the next call runs as a half-open
/// probe, and its outcome decides whether the breaker closes again.
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                last_failure: None,
            }),
            threshold,
            reset_timeout,
        }
    }

    /// Run the guarded call unless the breaker is open.
    pub async fn execute<T, E, F, Fut>(&self, f: F) -> Result<T, BreakerError<E>>
    where
        E: std::error::Error,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock();
            if inner.state == CircuitState::Open {
                let cooled_down = inner
                    .last_failure
                    .map(|at| at.elapsed() > self.reset_timeout)
                    .unwrap_or(true);

                if cooled_down {
                    info!("circuit breaker entering half-open probe");
                    inner.state = CircuitState::HalfOpen;
                } else {
                    return Err(BreakerError::Open);
                }
            }
        }

        let result = f().await;

        let mut inner = self.inner.lock();
        match result {
            Ok(value) => {
                if inner.state == CircuitState::HalfOpen {
                    info!("circuit breaker closed after successful probe");
                    inner.state = CircuitState::Closed;
                    inner.failures = 0;
                }
                Ok(value)
            }
            Err(err) => {
                inner.failures += 1;
                inner.last_failure = Some(Instant::now());
                if inner.failures >= self.threshold {
                    if inner.state != CircuitState::Open {
                        warn!(
                            "circuit breaker opened after {} consecutive failures",
                            inner.failures
                        );
                    }
                    inner.state = CircuitState::Open;
                }
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// Current state, for observability.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }
}

/// Test-only accessors
#[cfg(test)]
impl CircuitBreaker {
    fn failures(&self) -> u32 {
        self.inner.lock().failures
    }
}
