/// KYC form controller
///
/// Ties the session, the persistence bridge and the submission coordinator
/// together. Every accepted mutation is followed by an explicit save; save
/// failures are logged and never interrupt the user.
use crate::errors::SubmissionError;
use crate::models::{Artifact, Field, Step};
use crate::persistence::{PersistenceBridge, SlotStore};
use crate::session::Session;
use crate::submission::{SubmissionAck, SubmissionCoordinator};
use crate::validation::{FieldError, Reason};
use std::fmt;

/// Refusal to leave the current step, with the errors that explain it.
#[derive(Debug, Clone, PartialEq)]
pub struct StepBlocked {
    pub step: Step,
    pub errors: Vec<FieldError>,
}

impl fmt::Display for StepBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        if fields.is_empty() {
            write!(f, "Cannot move past step {}", self.step)
        } else {
            write!(f, "Step {} is incomplete: {}", self.step, fields.join("; "))
        }
    }
}

pub struct KycForm<S> {
    session: Session,
    bridge: PersistenceBridge<S>,
    coordinator: SubmissionCoordinator,
}

impl<S: SlotStore> KycForm<S> {
    /// Resumes the saved session if there is one, otherwise starts fresh.
    pub fn open(bridge: PersistenceBridge<S>, coordinator: SubmissionCoordinator) -> Self {
        let session = match bridge.load() {
            Some(snapshot) => {
                let session = Session::restore(snapshot);
                tracing::info!(
                    "Resumed saved session on step {}",
                    session.current_step().number()
                );
                session
            }
            None => Session::new(),
        };

        Self {
            session,
            bridge,
            coordinator,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn bridge(&self) -> &PersistenceBridge<S> {
        &self.bridge
    }

    fn autosave(&self) {
        if let Err(e) = self.bridge.save(&self.session) {
            tracing::warn!("Autosave failed, continuing without it: {}", e);
        }
    }

    // ============ Edits ============

    pub fn set_text(&mut self, field: Field, value: impl Into<String>) -> Result<(), FieldError> {
        let result = self.session.set_text(field, value);
        if was_stored(&result) {
            self.autosave();
        }
        result
    }

    pub fn attach(&mut self, field: Field, artifact: Artifact) -> Result<(), FieldError> {
        let result = self.session.attach(field, artifact);
        if was_stored(&result) {
            self.autosave();
        }
        result
    }

    pub fn clear_field(&mut self, field: Field) {
        self.session.clear_field(field);
        self.autosave();
    }

    // ============ Navigation ============

    /// Moves to the next step, or reports the current step's errors.
    pub fn next(&mut self) -> Result<Step, StepBlocked> {
        let from = self.session.current_step();
        if self.session.advance() {
            self.autosave();
            return Ok(self.session.current_step());
        }

        let errors = self.session.step_errors(from);
        for error in &errors {
            tracing::debug!("Step {} blocked by {}", from.number(), error);
        }
        Err(StepBlocked { step: from, errors })
    }

    pub fn back(&mut self) -> bool {
        let moved = self.session.retreat();
        if moved {
            self.autosave();
        }
        moved
    }

    pub fn jump_to(&mut self, step: Step) -> bool {
        let moved = self.session.jump_to(step);
        if moved {
            self.autosave();
        }
        moved
    }

    // ============ Submission ============

    /// Submits the record from the review step.
    ///
    /// On success the saved session is cleared and replaced by a fresh one
    /// whose status is `Succeeded`; the caller navigates away. On failure the
    /// status becomes `Failed` with a notice and every entered value is kept
    /// for a retry. A refusal because another attempt is in flight leaves the
    /// status as it was.
    pub async fn submit(&mut self) -> Result<SubmissionAck, SubmissionError> {
        let current = self.session.current_step();
        if current != Step::Review {
            return Err(SubmissionError::NotAtReview { current });
        }

        let record = match self.session.values().to_record() {
            Ok(record) => record,
            Err(errors) => return Err(SubmissionError::Incomplete { errors }),
        };

        let previous = self.session.mark_in_flight();
        match self.coordinator.submit(&record).await {
            Ok(ack) => {
                if let Err(e) = self.bridge.clear() {
                    tracing::warn!("Submitted, but saved session could not be cleared: {}", e);
                }
                self.session = Session::new();
                self.session.mark_succeeded();
                tracing::info!("KYC submitted successfully: {}", ack.submission_id);
                Ok(ack)
            }
            Err(SubmissionError::AlreadyInFlight) => {
                self.session.revert_in_flight(previous);
                Err(SubmissionError::AlreadyInFlight)
            }
            Err(e) => {
                tracing::error!("KYC submission failed: {}", e);
                self.session.mark_failed(e.notice());
                Err(e)
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.session.dismiss_notice();
    }

    /// Drops the saved session and starts over with an empty one.
    pub fn reset(&mut self) {
        if let Err(e) = self.bridge.clear() {
            tracing::warn!("Could not clear saved session: {}", e);
        }
        self.session = Session::new();
    }
}

/// Edits refused for the wrong value kind leave the values untouched.
fn was_stored(result: &Result<(), FieldError>) -> bool {
    !matches!(result, Err(e) if e.reason == Reason::WrongKind)
}
