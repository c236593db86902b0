/// Form state machine
///
/// A `Session` owns the current step, the in-progress values and the
/// submission status. Step statuses, reachability and field errors are always
/// derived from `current_step` and `values`; nothing derived is stored.
use crate::models::{Artifact, Field, FormValues, Step, StepStatus};
use crate::schema::{fields_for_step, first_invalid_step_on, is_step_valid_on, step_errors_on};
use crate::validation::{validate_on, FieldError, Reason};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Where the session stands with respect to submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Idle,
    InFlight,
    Succeeded,
    /// Failed with a user-visible notice. Values are kept for retry.
    Failed { notice: String },
}

/// What the persistence bridge stores and restores.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub step: Step,
    pub values: FormValues,
}

/// Everything the presentation layer needs to render one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: Step,
    pub title: &'static str,
    pub fields: &'static [Field],
    pub status: StepStatus,
    pub reachable: bool,
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    current_step: Step,
    values: FormValues,
    status: SubmissionStatus,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            current_step: Step::FIRST,
            values: FormValues::default(),
            status: SubmissionStatus::Idle,
        }
    }

    /// Rebuilds a session from a saved snapshot.
    ///
    /// The restored step is the earlier of the saved step and the first step
    /// that no longer validates. Artifacts are never saved, so anything saved
    /// past the identity step comes back on the identity step.
    pub fn restore(snapshot: SessionSnapshot) -> Self {
        Self::restore_on(snapshot, Utc::now().date_naive())
    }

    pub fn restore_on(snapshot: SessionSnapshot, today: NaiveDate) -> Self {
        let SessionSnapshot { step, values } = snapshot;
        let current_step = match first_invalid_step_on(&values, today) {
            Some(invalid) if invalid < step => {
                tracing::info!(
                    "Restored session demoted from step {} to step {}",
                    step.number(),
                    invalid.number()
                );
                invalid
            }
            _ => step,
        };

        Self {
            id: Uuid::new_v4(),
            current_step,
            values,
            status: SubmissionStatus::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            step: self.current_step,
            values: self.values.clone(),
        }
    }

    // ============ Edits ============

    /// Stores `value` for a text field and returns its validation result.
    ///
    /// Invalid values are kept so the user can keep typing. Artifact fields
    /// refuse text with `Reason::WrongKind` and keep their previous value.
    pub fn set_text(&mut self, field: Field, value: impl Into<String>) -> Result<(), FieldError> {
        if !self.values.set_text(field, value) {
            return Err(FieldError::new(field, Reason::WrongKind));
        }
        validate_on(field, self.values.value(field), today())
    }

    /// Stores an upload for an artifact field and returns its validation result.
    pub fn attach(&mut self, field: Field, artifact: Artifact) -> Result<(), FieldError> {
        if !self.values.set_artifact(field, artifact) {
            return Err(FieldError::new(field, Reason::WrongKind));
        }
        validate_on(field, self.values.value(field), today())
    }

    pub fn clear_field(&mut self, field: Field) {
        self.values.clear(field);
    }

    // ============ Transitions ============

    /// Moves one step forward if the current step validates.
    ///
    /// Refused (returns `false`) on an invalid step and on the review step.
    pub fn advance(&mut self) -> bool {
        self.advance_on(today())
    }

    pub fn advance_on(&mut self, today: NaiveDate) -> bool {
        let Some(next) = self.current_step.next() else {
            return false;
        };
        if !is_step_valid_on(self.current_step, &self.values, today) {
            return false;
        }
        self.current_step = next;
        true
    }

    /// Moves one step back without validating. No-op on the first step.
    pub fn retreat(&mut self) -> bool {
        match self.current_step.prev() {
            Some(prev) => {
                self.current_step = prev;
                true
            }
            None => false,
        }
    }

    /// Jumps to `target` if it is reachable; otherwise leaves the session untouched.
    pub fn jump_to(&mut self, target: Step) -> bool {
        self.jump_to_on(target, today())
    }

    pub fn jump_to_on(&mut self, target: Step, today: NaiveDate) -> bool {
        if !self.is_reachable_on(target, today) {
            return false;
        }
        self.current_step = target;
        true
    }

    /// Any step up to the current one, or exactly the next one when the
    /// current step validates.
    pub fn is_reachable(&self, target: Step) -> bool {
        self.is_reachable_on(target, today())
    }

    pub fn is_reachable_on(&self, target: Step, today: NaiveDate) -> bool {
        target <= self.current_step
            || (self.current_step.next() == Some(target)
                && is_step_valid_on(self.current_step, &self.values, today))
    }

    // ============ Derived state ============

    pub fn step_status(&self, step: Step) -> StepStatus {
        if step < self.current_step {
            StepStatus::Complete
        } else if step == self.current_step {
            StepStatus::Current
        } else {
            StepStatus::Upcoming
        }
    }

    pub fn step_statuses(&self) -> Vec<(Step, StepStatus)> {
        Step::ALL
            .into_iter()
            .map(|step| (step, self.step_status(step)))
            .collect()
    }

    pub fn is_step_valid(&self, step: Step) -> bool {
        is_step_valid_on(step, &self.values, today())
    }

    pub fn step_errors(&self, step: Step) -> Vec<FieldError> {
        step_errors_on(step, &self.values, today())
    }

    /// Field errors for every step reached so far.
    pub fn errors(&self) -> BTreeMap<Field, Reason> {
        let today = today();
        Step::ALL
            .into_iter()
            .filter(|&step| step <= self.current_step)
            .flat_map(|step| step_errors_on(step, &self.values, today))
            .map(|error| (error.field, error.reason))
            .collect()
    }

    pub fn is_submission_ready(&self) -> bool {
        first_invalid_step_on(&self.values, today()).is_none()
    }

    pub fn step_views(&self) -> Vec<StepView> {
        let today = today();
        Step::ALL
            .into_iter()
            .map(|step| StepView {
                step,
                title: step.title(),
                fields: fields_for_step(step),
                status: self.step_status(step),
                reachable: self.is_reachable_on(step, today),
                errors: step_errors_on(step, &self.values, today),
            })
            .collect()
    }

    // ============ Submission status ============

    /// Marks the session in flight and returns the status it replaced.
    pub fn mark_in_flight(&mut self) -> SubmissionStatus {
        std::mem::replace(&mut self.status, SubmissionStatus::InFlight)
    }

    /// Puts back a status returned by `mark_in_flight` when no attempt was made.
    pub fn revert_in_flight(&mut self, previous: SubmissionStatus) {
        if self.status == SubmissionStatus::InFlight {
            self.status = previous;
        }
    }

    pub fn mark_succeeded(&mut self) {
        self.status = SubmissionStatus::Succeeded;
    }

    pub fn mark_failed(&mut self, notice: impl Into<String>) {
        self.status = SubmissionStatus::Failed {
            notice: notice.into(),
        };
    }

    /// Dismisses a failure notice. Other statuses are left alone.
    pub fn dismiss_notice(&mut self) {
        if matches!(self.status, SubmissionStatus::Failed { .. }) {
            self.status = SubmissionStatus::Idle;
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_personal(session: &mut Session) {
        session.set_text(Field::FirstName, "Grace").unwrap();
        session.set_text(Field::LastName, "Hopper").unwrap();
        session.set_text(Field::Email, "grace@example.com").unwrap();
        session.set_text(Field::Phone, "555-555-0199").unwrap();
        session.set_text(Field::DateOfBirth, "1980-01-01").unwrap();
    }

    fn fill_address(session: &mut Session) {
        session.set_text(Field::Address, "1 Navy Yard").unwrap();
        session.set_text(Field::City, "Arlington").unwrap();
        session.set_text(Field::State, "tx").unwrap();
        session.set_text(Field::ZipCode, "12345-6789").unwrap();
        session.set_text(Field::Country, "us").unwrap();
    }

    #[test]
    fn test_new_session_starts_on_personal() {
        let session = Session::new();
        assert_eq!(session.current_step(), Step::Personal);
        assert_eq!(session.status(), &SubmissionStatus::Idle);
        assert_eq!(session.step_status(Step::Personal), StepStatus::Current);
        assert_eq!(session.step_status(Step::Review), StepStatus::Upcoming);
    }

    #[test]
    fn test_advance_requires_valid_step() {
        let mut session = Session::new();
        assert!(!session.advance());
        assert_eq!(session.current_step(), Step::Personal);

        fill_personal(&mut session);
        assert!(session.advance());
        assert_eq!(session.current_step(), Step::Address);
        assert_eq!(session.step_status(Step::Personal), StepStatus::Complete);
    }

    #[test]
    fn test_invalid_value_is_kept() {
        let mut session = Session::new();
        let result = session.set_text(Field::Email, "not-an-email");
        assert_eq!(result.unwrap_err().reason, Reason::InvalidEmail);
        assert_eq!(session.values().text(Field::Email), Some("not-an-email"));
    }

    #[test]
    fn test_text_into_artifact_field_is_refused() {
        let mut session = Session::new();
        let err = session.set_text(Field::IdDocument, "scan.pdf").unwrap_err();
        assert_eq!(err.reason, Reason::WrongKind);
        assert!(session.values().id_document.is_none());
    }

    #[test]
    fn test_retreat_then_advance_returns() {
        let mut session = Session::new();
        fill_personal(&mut session);
        assert!(session.advance());
        fill_address(&mut session);
        assert!(session.advance());
        assert_eq!(session.current_step(), Step::Identity);

        assert!(session.retreat());
        assert!(session.advance());
        assert_eq!(session.current_step(), Step::Identity);
    }

    #[test]
    fn test_retreat_from_first_step_is_noop() {
        let mut session = Session::new();
        assert!(!session.retreat());
        assert_eq!(session.current_step(), Step::Personal);
    }

    #[test]
    fn test_jump_rules() {
        let mut session = Session::new();
        fill_personal(&mut session);
        session.advance();
        fill_address(&mut session);

        assert!(!session.jump_to(Step::Employment));
        assert_eq!(session.current_step(), Step::Address);
        assert!(session.jump_to(Step::Identity));
        assert_eq!(session.current_step(), Step::Identity);

        // Backward jumps ignore validity.
        session.set_text(Field::FirstName, "G").unwrap_err();
        assert!(session.jump_to(Step::Address));
        assert!(session.jump_to(Step::Personal));
    }

    #[test]
    fn test_errors_cover_reached_steps_only() {
        let mut session = Session::new();
        fill_personal(&mut session);
        session.advance();

        let errors = session.errors();
        assert!(errors.contains_key(&Field::City));
        assert!(!errors.contains_key(&Field::FirstName));
        assert!(!errors.contains_key(&Field::IdNumber));
    }

    #[test]
    fn test_step_views_reflect_reachability() {
        let mut session = Session::new();
        fill_personal(&mut session);

        let views = session.step_views();
        assert_eq!(views.len(), 5);
        assert!(views[0].reachable);
        assert!(views[1].reachable);
        assert!(!views[2].reachable);
        assert!(views[0].errors.is_empty());
        assert_eq!(views[4].fields.len(), 0);
    }

    #[test]
    fn test_restore_demotes_past_identity() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut source = Session::new();
        fill_personal(&mut source);
        fill_address(&mut source);
        source.set_text(Field::IdType, "passport").unwrap();
        source.set_text(Field::IdNumber, "P998877").unwrap();

        let snapshot = SessionSnapshot {
            step: Step::Review,
            values: source.values().clone(),
        };
        let restored = Session::restore_on(snapshot, today);
        assert_eq!(restored.current_step(), Step::Identity);
        assert_ne!(restored.id(), source.id());
    }

    #[test]
    fn test_restore_keeps_earlier_step() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let snapshot = SessionSnapshot {
            step: Step::Personal,
            values: FormValues::default(),
        };
        assert_eq!(Session::restore_on(snapshot, today).current_step(), Step::Personal);
    }

    #[test]
    fn test_dismiss_notice_only_clears_failure() {
        let mut session = Session::new();
        session.mark_failed("Intake service unavailable");
        session.dismiss_notice();
        assert_eq!(session.status(), &SubmissionStatus::Idle);

        session.mark_succeeded();
        session.dismiss_notice();
        assert_eq!(session.status(), &SubmissionStatus::Succeeded);
    }

    #[test]
    fn test_revert_in_flight_restores_prior_notice() {
        let mut session = Session::new();
        session.mark_failed("Submission rejected");

        let previous = session.mark_in_flight();
        assert_eq!(session.status(), &SubmissionStatus::InFlight);

        session.revert_in_flight(previous);
        assert_eq!(
            session.status(),
            &SubmissionStatus::Failed {
                notice: "Submission rejected".to_string()
            }
        );
    }
}
