/// Step schema registry
///
/// Fixed table from step to its ordered fields, plus the aggregate checks
/// built on the field validator. The review step owns no fields and is
/// vacuously valid.
use crate::models::{Field, FieldValue, FormValues, IdType, Record, SourceOfFunds, Step};
use crate::validation::{parse_birth_date, validate_on, FieldError, Reason};
use chrono::{NaiveDate, Utc};

const PERSONAL_FIELDS: &[Field] = &[
    Field::FirstName,
    Field::LastName,
    Field::Email,
    Field::Phone,
    Field::DateOfBirth,
];

const ADDRESS_FIELDS: &[Field] = &[
    Field::Address,
    Field::City,
    Field::State,
    Field::ZipCode,
    Field::Country,
];

const IDENTITY_FIELDS: &[Field] = &[
    Field::IdType,
    Field::IdNumber,
    Field::IdDocument,
    Field::Selfie,
];

const EMPLOYMENT_FIELDS: &[Field] = &[
    Field::Occupation,
    Field::EmployerName,
    Field::AnnualIncome,
    Field::SourceOfFunds,
];

/// Ordered field names owned by `step`.
pub fn fields_for_step(step: Step) -> &'static [Field] {
    match step {
        Step::Personal => PERSONAL_FIELDS,
        Step::Address => ADDRESS_FIELDS,
        Step::Identity => IDENTITY_FIELDS,
        Step::Employment => EMPLOYMENT_FIELDS,
        Step::Review => &[],
    }
}

/// Failures for every field of `step`, in field order.
pub fn step_errors_on(step: Step, values: &FormValues, today: NaiveDate) -> Vec<FieldError> {
    fields_for_step(step)
        .iter()
        .filter_map(|&field| validate_on(field, values.value(field), today).err())
        .collect()
}

pub fn step_errors(step: Step, values: &FormValues) -> Vec<FieldError> {
    step_errors_on(step, values, today())
}

pub fn is_step_valid_on(step: Step, values: &FormValues, today: NaiveDate) -> bool {
    fields_for_step(step)
        .iter()
        .all(|&field| validate_on(field, values.value(field), today).is_ok())
}

/// True iff every field of `step` validates.
pub fn is_step_valid(step: Step, values: &FormValues) -> bool {
    is_step_valid_on(step, values, today())
}

/// First step (in order) that is not step-valid, if any.
pub fn first_invalid_step_on(values: &FormValues, today: NaiveDate) -> Option<Step> {
    Step::ALL
        .into_iter()
        .find(|&step| !is_step_valid_on(step, values, today))
}

pub fn first_invalid_step(values: &FormValues) -> Option<Step> {
    first_invalid_step_on(values, today())
}

/// True iff steps 1 through 4 are all step-valid.
pub fn is_submission_valid(values: &FormValues) -> bool {
    first_invalid_step(values).is_none()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl FormValues {
    /// Builds a complete `Record`, or every field failure across all steps.
    pub fn to_record_on(&self, today: NaiveDate) -> Result<Record, Vec<FieldError>> {
        let errors: Vec<FieldError> = Step::ALL
            .into_iter()
            .flat_map(|step| step_errors_on(step, self, today))
            .collect();
        if !errors.is_empty() {
            return Err(errors);
        }

        // Every field validated above, so the lookups below only fail on a
        // rule/table mismatch.
        let text = |field: Field| -> Result<String, Vec<FieldError>> {
            match self.value(field) {
                FieldValue::Text(value) => Ok(value.trim().to_string()),
                _ => Err(vec![FieldError::new(field, Reason::Required)]),
            }
        };
        let artifact = |field: Field| {
            self.artifact(field)
                .cloned()
                .ok_or_else(|| vec![FieldError::new(field, Reason::MissingArtifact)])
        };
        let date_of_birth = parse_birth_date(&text(Field::DateOfBirth)?)
            .ok_or_else(|| vec![FieldError::new(Field::DateOfBirth, Reason::InvalidDate)])?;
        let id_type = IdType::from_code(&text(Field::IdType)?)
            .ok_or_else(|| vec![FieldError::new(Field::IdType, Reason::UnknownOption)])?;
        let source_of_funds = SourceOfFunds::from_code(&text(Field::SourceOfFunds)?)
            .ok_or_else(|| vec![FieldError::new(Field::SourceOfFunds, Reason::UnknownOption)])?;

        Ok(Record {
            first_name: text(Field::FirstName)?,
            last_name: text(Field::LastName)?,
            email: text(Field::Email)?,
            phone: text(Field::Phone)?,
            date_of_birth,
            address: text(Field::Address)?,
            city: text(Field::City)?,
            state: text(Field::State)?,
            zip_code: text(Field::ZipCode)?,
            country: text(Field::Country)?,
            id_type,
            id_number: text(Field::IdNumber)?,
            id_document: artifact(Field::IdDocument)?,
            selfie: artifact(Field::Selfie)?,
            occupation: text(Field::Occupation)?,
            employer_name: text(Field::EmployerName)?,
            annual_income: text(Field::AnnualIncome)?,
            source_of_funds,
        })
    }

    pub fn to_record(&self) -> Result<Record, Vec<FieldError>> {
        self.to_record_on(today())
    }
}
