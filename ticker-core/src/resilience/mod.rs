// resilience/mod.rs

mod circuit_breaker;

pub use circuit_breaker::{BreakerError, CircuitBreaker, CircuitState};
