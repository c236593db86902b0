/// Submission coordinator
///
/// Sends a complete record to the intake service, at most one attempt at a
/// time. Each attempt gets a fresh submission id; retries are new attempts.
use crate::errors::SubmissionError;
use crate::intake_client::IntakeClient;
use crate::models::Record;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionAck {
    pub submission_id: Uuid,
    pub message: String,
}

/// Clones share the same in-flight guard.
#[derive(Clone)]
pub struct SubmissionCoordinator {
    client: IntakeClient,
    in_flight: Arc<AtomicBool>,
}

/// Holds the in-flight flag for the duration of one attempt.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl SubmissionCoordinator {
    pub fn new(client: IntakeClient) -> Self {
        Self {
            client,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Dispatches `record` unless another attempt is still running.
    ///
    /// A second call while one is in flight fails with
    /// `SubmissionError::AlreadyInFlight` without contacting the service. The
    /// guard is released when the attempt resolves, whatever the outcome.
    pub async fn submit(&self, record: &Record) -> Result<SubmissionAck, SubmissionError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!("Submission ignored: another attempt is in flight");
            return Err(SubmissionError::AlreadyInFlight);
        };

        let submission_id = Uuid::new_v4();
        tracing::info!(
            "Dispatching submission {} for {}",
            submission_id,
            record.applicant_name()
        );

        let ack = self.client.send(submission_id, record).await?;

        Ok(SubmissionAck {
            submission_id,
            message: ack.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_and_released() {
        let flag = AtomicBool::new(false);
        {
            let first = InFlightGuard::acquire(&flag);
            assert!(first.is_some());
            assert!(InFlightGuard::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::Acquire));
        assert!(InFlightGuard::acquire(&flag).is_some());
    }
}
