use failsafe::backoff::{self, Exponential};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::{Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding autosave writes to the durable slot.
pub type AutosaveBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Creates a circuit breaker for autosave writes so a failing disk is not
/// hit on every keystroke.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive write failures trigger OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before trying again.
///
/// # States
///
/// - **CLOSED**: Writes pass through.
/// - **OPEN**: Writes are skipped and reported as suspended.
/// - **HALF_OPEN**: The next write probes whether the slot recovered.
pub fn create_autosave_circuit_breaker() -> AutosaveBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::{CircuitBreaker, Error};

    #[test]
    fn test_circuit_breaker_opens_after_failures() {
        let cb = create_autosave_circuit_breaker();

        for _ in 0..5 {
            let result: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("disk full"));
            assert!(result.is_err());
        }

        let result: Result<(), Error<&str>> = cb.call(|| Ok::<(), &str>(()));

        match result {
            Err(Error::Rejected) => {}
            _ => panic!("Expected circuit to be open and reject writes"),
        }
    }

    #[test]
    fn test_circuit_breaker_allows_success() {
        let cb = create_autosave_circuit_breaker();

        let result: Result<i32, Error<&str>> = cb.call(|| Ok::<i32, &str>(42));

        assert_eq!(result.unwrap(), 42);
    }
}
