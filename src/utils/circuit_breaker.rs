use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guards calls to a downstream service. Tracks failures and blocks requests
// while the service is unhealthy instead of letting them pile up.
//
// States:
// - Closed: requests pass through
// - Open: requests rejected immediately until the timeout elapses
// - HalfOpen: probing; a run of successes closes the circuit again
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// How long to reject requests before probing again
    pub timeout: Duration,
    /// Successes needed in half-open before closing
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

struct BreakerState {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    state: Arc<Mutex<BreakerState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            })),
            config,
        }
    }

    /// Run `operation` unless the circuit is open.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut state = self.state.lock().await;

            if state.state == CircuitState::Open {
                let elapsed_timeout = state
                    .opened_at
                    .is_some_and(|opened| opened.elapsed() >= self.config.timeout);

                if elapsed_timeout {
                    tracing::info!("Circuit breaker probing after timeout, half-open");
                    state.state = CircuitState::HalfOpen;
                    state.successes = 0;
                } else {
                    return Err(CircuitBreakerError::CircuitOpen);
                }
            }
        }

        match operation.await {
            Ok(result) => {
                self.record_success().await;
                Ok(result)
            }
            Err(err) => {
                self.record_failure().await;
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    async fn record_success(&self) {
        let mut state = self.state.lock().await;

        match state.state {
            CircuitState::HalfOpen => {
                state.successes += 1;
                if state.successes >= self.config.success_threshold {
                    tracing::info!(successes = state.successes, "Circuit breaker closed");
                    state.state = CircuitState::Closed;
                    state.failures = 0;
                    state.successes = 0;
                    state.opened_at = None;
                }
            }
            CircuitState::Closed => {
                state.failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        state.failures += 1;

        match state.state {
            CircuitState::Closed => {
                if state.failures >= self.config.failure_threshold {
                    tracing::warn!(failures = state.failures, "Circuit breaker opened");
                    state.state = CircuitState::Open;
                    state.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!("Failure during half-open, reopening circuit");
                state.state = CircuitState::Open;
                state.successes = 0;
                state.opened_at = Some(Instant::now());
            }
            CircuitState::Open => {
                state.opened_at = Some(Instant::now());
            }
        }
    }

    pub async fn get_state(&self) -> CircuitState {
        self.state.lock().await.state
    }
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "Circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "Operation failed: {}", e),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}

// ============================================================================
// Unit Tests
// ============================================================================
