/// Field validation rules for the KYC record
///
/// Each field has exactly one rule. Validation is pure: the only input besides
/// the value is the reference date used for the age check, which `validate`
/// takes from the clock and `validate_on` takes from the caller.
use crate::models::{
    Field, FieldValue, COUNTRY_OPTIONS, ID_TYPE_OPTIONS, SOURCE_OF_FUNDS_OPTIONS, STATE_OPTIONS,
};
use chrono::{Months, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Minimum applicant age in years.
pub const MINIMUM_AGE_YEARS: u32 = 18;

/// Minimum digit count for a phone number once formatting is stripped.
pub const MINIMUM_PHONE_DIGITS: usize = 10;

// RFC 5322 simplified: local@domain.tld
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("email regex is valid")
});

static ZIP_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip code regex is valid"));

static DIGITS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("digits regex is valid"));

/// Why a field failed. `code()` is stable; `Display` is the user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Reason {
    Required,
    TooShort { min: usize },
    InvalidEmail,
    InvalidPhone,
    InvalidDate,
    Underage,
    InvalidZipCode,
    UnknownOption,
    NotNumeric,
    MissingArtifact,
    WrongKind,
}

impl Reason {
    pub fn code(self) -> &'static str {
        match self {
            Reason::Required => "required",
            Reason::TooShort { .. } => "too_short",
            Reason::InvalidEmail => "invalid_email",
            Reason::InvalidPhone => "invalid_phone",
            Reason::InvalidDate => "invalid_date",
            Reason::Underage => "underage",
            Reason::InvalidZipCode => "invalid_zip_code",
            Reason::UnknownOption => "unknown_option",
            Reason::NotNumeric => "not_numeric",
            Reason::MissingArtifact => "missing_artifact",
            Reason::WrongKind => "wrong_kind",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Required => write!(f, "This field is required"),
            Reason::TooShort { min } => write!(f, "Min {} characters required", min),
            Reason::InvalidEmail => write!(f, "Invalid email address"),
            Reason::InvalidPhone => write!(f, "Invalid phone number"),
            Reason::InvalidDate => write!(f, "Invalid date, expected YYYY-MM-DD"),
            Reason::Underage => write!(f, "Must be at least {} years old", MINIMUM_AGE_YEARS),
            Reason::InvalidZipCode => write!(f, "Invalid ZIP code"),
            Reason::UnknownOption => write!(f, "Please select a valid option"),
            Reason::NotNumeric => write!(f, "Please enter a valid amount"),
            Reason::MissingArtifact => write!(f, "Please upload a file"),
            Reason::WrongKind => write!(f, "Unexpected value type for this field"),
        }
    }
}

/// A single field failing its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub reason: Reason,
}

impl FieldError {
    pub fn new(field: Field, reason: Reason) -> Self {
        Self { field, reason }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for FieldError {}

/// The shape of a field's rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    MinLength(usize),
    Email,
    Phone,
    AdultBirthDate,
    ZipCode,
    /// Code must be one of the `(code, label)` options.
    OneOf(&'static [(&'static str, &'static str)]),
    Digits,
    Artifact,
}

/// Rule table: one rule per field.
pub fn rule_for(field: Field) -> Rule {
    match field {
        Field::FirstName | Field::LastName => Rule::MinLength(2),
        Field::Email => Rule::Email,
        Field::Phone => Rule::Phone,
        Field::DateOfBirth => Rule::AdultBirthDate,
        Field::Address => Rule::MinLength(5),
        Field::City => Rule::MinLength(2),
        Field::State => Rule::OneOf(STATE_OPTIONS),
        Field::ZipCode => Rule::ZipCode,
        Field::Country => Rule::OneOf(COUNTRY_OPTIONS),
        Field::IdType => Rule::OneOf(ID_TYPE_OPTIONS),
        Field::IdNumber => Rule::MinLength(5),
        Field::IdDocument | Field::Selfie => Rule::Artifact,
        Field::Occupation | Field::EmployerName => Rule::MinLength(2),
        Field::AnnualIncome => Rule::Digits,
        Field::SourceOfFunds => Rule::OneOf(SOURCE_OF_FUNDS_OPTIONS),
    }
}

/// Validates `value` for `field` against today's UTC date.
pub fn validate(field: Field, value: FieldValue<'_>) -> Result<(), FieldError> {
    validate_on(field, value, Utc::now().date_naive())
}

/// Validates `value` for `field` with an explicit reference date.
pub fn validate_on(field: Field, value: FieldValue<'_>, today: NaiveDate) -> Result<(), FieldError> {
    check(rule_for(field), value, today).map_err(|reason| FieldError::new(field, reason))
}

fn check(rule: Rule, value: FieldValue<'_>, today: NaiveDate) -> Result<(), Reason> {
    match (rule, value) {
        (Rule::Artifact, FieldValue::Artifact(artifact)) => {
            if artifact.is_empty() {
                Err(Reason::MissingArtifact)
            } else {
                Ok(())
            }
        }
        (Rule::Artifact, FieldValue::Missing) => Err(Reason::MissingArtifact),
        (Rule::Artifact, FieldValue::Text(_)) => Err(Reason::WrongKind),
        (_, FieldValue::Artifact(_)) => Err(Reason::WrongKind),
        (_, FieldValue::Missing) => Err(Reason::Required),
        (rule, FieldValue::Text(raw)) => {
            let text = raw.trim();
            if text.is_empty() {
                return Err(Reason::Required);
            }
            check_text(rule, text, today)
        }
    }
}

fn check_text(rule: Rule, text: &str, today: NaiveDate) -> Result<(), Reason> {
    match rule {
        Rule::MinLength(min) => {
            if text.chars().count() >= min {
                Ok(())
            } else {
                Err(Reason::TooShort { min })
            }
        }
        Rule::Email => {
            if EMAIL_REGEX.is_match(text) {
                Ok(())
            } else {
                Err(Reason::InvalidEmail)
            }
        }
        Rule::Phone => {
            if normalize_phone(text).len() >= MINIMUM_PHONE_DIGITS {
                Ok(())
            } else {
                Err(Reason::InvalidPhone)
            }
        }
        Rule::AdultBirthDate => {
            let birth_date = parse_birth_date(text).ok_or(Reason::InvalidDate)?;
            if is_adult_on(birth_date, today) {
                Ok(())
            } else {
                Err(Reason::Underage)
            }
        }
        Rule::ZipCode => {
            if ZIP_CODE_REGEX.is_match(text) {
                Ok(())
            } else {
                Err(Reason::InvalidZipCode)
            }
        }
        Rule::OneOf(options) => {
            if options.iter().any(|(code, _)| *code == text) {
                Ok(())
            } else {
                Err(Reason::UnknownOption)
            }
        }
        Rule::Digits => {
            if DIGITS_REGEX.is_match(text) {
                Ok(())
            } else {
                Err(Reason::NotNumeric)
            }
        }
        Rule::Artifact => Err(Reason::WrongKind),
    }
}

/// Keeps only the digits of a phone number: `(555) 555-5555` → `5555555555`.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parses an ISO `YYYY-MM-DD` date.
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// True when the 18th birthday falls on or before `today`.
///
/// Uses calendar months, so a Feb 29 birthday turns 18 on Feb 28 of a
/// non-leap year.
pub fn is_adult_on(birth_date: NaiveDate, today: NaiveDate) -> bool {
    birth_date
        .checked_add_months(Months::new(MINIMUM_AGE_YEARS * 12))
        .map(|eighteenth| eighteenth <= today)
        .unwrap_or(false)
}

/// Display label for a select-style code, if the field is enumerated and the code known.
pub fn option_label(field: Field, code: &str) -> Option<&'static str> {
    match rule_for(field) {
        Rule::OneOf(options) => options
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label),
        _ => None,
    }
}
