/// Property-based tests using proptest
/// Invariants of the validator, the step schema, navigation and persistence
use chrono::NaiveDate;
use kyc_intake::models::{Artifact, Field, FieldValue, FormValues, Step};
use kyc_intake::persistence::{MemorySlotStore, PersistenceBridge};
use kyc_intake::schema::{fields_for_step, is_step_valid_on};
use kyc_intake::session::{Session, SessionSnapshot};
use kyc_intake::validation::validate_on;
use proptest::prelude::*;

fn reference_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

fn valid_text(field: Field) -> &'static str {
    match field {
        Field::FirstName => "Ada",
        Field::LastName => "Lovelace",
        Field::Email => "ada@example.com",
        Field::Phone => "555-555-0100",
        Field::DateOfBirth => "1985-12-10",
        Field::Address => "12 Analytical Way",
        Field::City => "Austin",
        Field::State => "tx",
        Field::ZipCode => "73301",
        Field::Country => "us",
        Field::IdType => "national_id",
        Field::IdNumber => "N998877",
        Field::IdDocument | Field::Selfie => "",
        Field::Occupation => "Analyst",
        Field::EmployerName => "Babbage & Co",
        Field::AnnualIncome => "64000",
        Field::SourceOfFunds => "investments",
    }
}

fn scalar_fields() -> Vec<Field> {
    Field::ALL.into_iter().filter(|f| !f.is_artifact()).collect()
}

/// Per scalar field: absent, a known-good value, or arbitrary text.
fn scalar_values() -> impl Strategy<Value = Vec<(Field, Option<String>)>> {
    let per_field: Vec<BoxedStrategy<(Field, Option<String>)>> = scalar_fields()
        .into_iter()
        .map(|field| {
            prop_oneof![
                Just(None),
                Just(Some(valid_text(field).to_string())),
                "\\PC{0,16}".prop_map(Some),
            ]
            .prop_map(move |value| (field, value))
            .boxed()
        })
        .collect();
    per_field
}

fn values_from(entries: &[(Field, Option<String>)], with_uploads: bool) -> FormValues {
    let mut values = FormValues::default();
    for (field, value) in entries {
        if let Some(value) = value {
            values.set_text(*field, value.clone());
        }
    }
    if with_uploads {
        values.set_artifact(
            Field::IdDocument,
            Artifact::new("id.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]),
        );
        values.set_artifact(
            Field::Selfie,
            Artifact::new("me.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff]),
        );
    }
    values
}

fn complete_session() -> Session {
    let entries: Vec<(Field, Option<String>)> = scalar_fields()
        .into_iter()
        .map(|field| (field, Some(valid_text(field).to_string())))
        .collect();
    Session::restore_on(
        SessionSnapshot {
            step: Step::FIRST,
            values: values_from(&entries, true),
        },
        reference_day(),
    )
}

// Property: validation is deterministic
proptest! {
    #[test]
    fn validation_is_deterministic(index in 0usize..18, raw in "\\PC*") {
        let field = Field::ALL[index];
        let first = validate_on(field, FieldValue::Text(&raw), reference_day());
        let second = validate_on(field, FieldValue::Text(&raw), reference_day());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn step_validity_is_conjunction_of_fields(entries in scalar_values(), uploads in any::<bool>()) {
        let values = values_from(&entries, uploads);
        for step in Step::ALL {
            let every_field_ok = fields_for_step(step)
                .iter()
                .all(|&field| validate_on(field, values.value(field), reference_day()).is_ok());
            prop_assert_eq!(is_step_valid_on(step, &values, reference_day()), every_field_ok);
        }
    }
}

// Property: navigation
proptest! {
    #[test]
    fn retreat_then_advance_returns_to_step(k in 2u8..=5) {
        let target = Step::from_number(k).unwrap();
        let mut session = complete_session();
        while session.current_step() < target {
            prop_assert!(session.advance_on(reference_day()));
        }

        prop_assert!(session.retreat());
        prop_assert!(session.advance_on(reference_day()));
        prop_assert_eq!(session.current_step(), target);
    }

    #[test]
    fn forward_jumps_are_gated_by_current_step(entries in scalar_values(), uploads in any::<bool>()) {
        let today = reference_day();
        let mut session = Session::restore_on(
            SessionSnapshot { step: Step::FIRST, values: values_from(&entries, uploads) },
            today,
        );
        while session.advance_on(today) {}
        let current = session.current_step();

        for target in Step::ALL {
            let mut probe = session.clone();
            let jumped = probe.jump_to_on(target, today);
            if target <= current {
                prop_assert!(jumped);
                prop_assert_eq!(probe.current_step(), target);
            } else {
                // Walking stopped, so the current step is invalid or last
                prop_assert!(!jumped);
                prop_assert_eq!(probe.current_step(), current);
            }
        }
    }
}

// Property: persistence round trip keeps scalars and drops uploads
proptest! {
    #[test]
    fn saved_scalars_load_back(entries in scalar_values()) {
        let bridge = PersistenceBridge::new(MemorySlotStore::new());
        let mut session = Session::new();
        for (field, value) in &entries {
            if let Some(value) = value {
                let _ = session.set_text(*field, value.clone());
            }
        }
        let _ = session.attach(
            Field::Selfie,
            Artifact::new("me.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff]),
        );

        bridge.save(&session).unwrap();
        let snapshot = bridge.load().unwrap();

        prop_assert_eq!(snapshot.values.scalar_entries(), session.values().scalar_entries());
        prop_assert!(snapshot.values.artifact(Field::Selfie).is_none());
        prop_assert!(snapshot.values.artifact(Field::IdDocument).is_none());
    }
}
