use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============ Fields & Steps ============

/// Every field of a KYC record, named as it travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    DateOfBirth,
    Address,
    City,
    State,
    ZipCode,
    Country,
    IdType,
    IdNumber,
    IdDocument,
    Selfie,
    Occupation,
    EmployerName,
    AnnualIncome,
    SourceOfFunds,
}

impl Field {
    /// All fields in record order.
    pub const ALL: [Field; 18] = [
        Field::FirstName,
        Field::LastName,
        Field::Email,
        Field::Phone,
        Field::DateOfBirth,
        Field::Address,
        Field::City,
        Field::State,
        Field::ZipCode,
        Field::Country,
        Field::IdType,
        Field::IdNumber,
        Field::IdDocument,
        Field::Selfie,
        Field::Occupation,
        Field::EmployerName,
        Field::AnnualIncome,
        Field::SourceOfFunds,
    ];

    /// Wire name (multipart part name, persisted JSON key).
    pub fn name(self) -> &'static str {
        match self {
            Field::FirstName => "firstName",
            Field::LastName => "lastName",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::DateOfBirth => "dateOfBirth",
            Field::Address => "address",
            Field::City => "city",
            Field::State => "state",
            Field::ZipCode => "zipCode",
            Field::Country => "country",
            Field::IdType => "idType",
            Field::IdNumber => "idNumber",
            Field::IdDocument => "idDocument",
            Field::Selfie => "selfie",
            Field::Occupation => "occupation",
            Field::EmployerName => "employerName",
            Field::AnnualIncome => "annualIncome",
            Field::SourceOfFunds => "sourceOfFunds",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Human label used by the review step.
    pub fn label(self) -> &'static str {
        match self {
            Field::FirstName => "First Name",
            Field::LastName => "Last Name",
            Field::Email => "Email",
            Field::Phone => "Phone",
            Field::DateOfBirth => "Date of Birth",
            Field::Address => "Address",
            Field::City => "City",
            Field::State => "State",
            Field::ZipCode => "ZIP Code",
            Field::Country => "Country",
            Field::IdType => "ID Type",
            Field::IdNumber => "ID Number",
            Field::IdDocument => "ID Document",
            Field::Selfie => "Selfie",
            Field::Occupation => "Occupation",
            Field::EmployerName => "Employer",
            Field::AnnualIncome => "Annual Income",
            Field::SourceOfFunds => "Source of Funds",
        }
    }

    /// The step that owns this field.
    pub fn step(self) -> Step {
        match self {
            Field::FirstName
            | Field::LastName
            | Field::Email
            | Field::Phone
            | Field::DateOfBirth => Step::Personal,
            Field::Address | Field::City | Field::State | Field::ZipCode | Field::Country => {
                Step::Address
            }
            Field::IdType | Field::IdNumber | Field::IdDocument | Field::Selfie => Step::Identity,
            Field::Occupation | Field::EmployerName | Field::AnnualIncome | Field::SourceOfFunds => {
                Step::Employment
            }
        }
    }

    /// Binary artifact fields are uploads, never text.
    pub fn is_artifact(self) -> bool {
        matches!(self, Field::IdDocument | Field::Selfie)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The five fixed steps of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Personal = 1,
    Address = 2,
    Identity = 3,
    Employment = 4,
    Review = 5,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Personal,
        Step::Address,
        Step::Identity,
        Step::Employment,
        Step::Review,
    ];

    pub const FIRST: Step = Step::Personal;
    pub const LAST: Step = Step::Review;

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Step> {
        Step::ALL.into_iter().find(|step| step.number() == number)
    }

    /// Following step, `None` past the review step.
    pub fn next(self) -> Option<Step> {
        Step::from_number(self.number() + 1)
    }

    /// Preceding step, `None` before the first step.
    pub fn prev(self) -> Option<Step> {
        self.number().checked_sub(1).and_then(Step::from_number)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Personal => "Personal Information",
            Step::Address => "Address Information",
            Step::Identity => "Identity Verification",
            Step::Employment => "Employment Information",
            Step::Review => "Review Information",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.title())
    }
}

/// Derived progress marker for a step relative to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Complete,
    Current,
    Upcoming,
}

// ============ Enumerated options ============

/// Selectable `state` codes.
pub const STATE_OPTIONS: &[(&str, &str)] = &[("ny", "New York"), ("ca", "California"), ("tx", "Texas")];

/// Selectable `country` codes.
pub const COUNTRY_OPTIONS: &[(&str, &str)] = &[
    ("us", "United States"),
    ("ca", "Canada"),
    ("uk", "United Kingdom"),
];

/// Selectable `idType` codes.
pub const ID_TYPE_OPTIONS: &[(&str, &str)] = &[
    ("passport", "Passport"),
    ("driving_license", "Driving License"),
    ("national_id", "National ID"),
];

/// Selectable `sourceOfFunds` codes.
pub const SOURCE_OF_FUNDS_OPTIONS: &[(&str, &str)] = &[
    ("salary", "Salary"),
    ("business", "Business Income"),
    ("investments", "Investments"),
    ("inheritance", "Inheritance"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    Passport,
    DrivingLicense,
    NationalId,
}

impl IdType {
    pub const ALL: [IdType; 3] = [IdType::Passport, IdType::DrivingLicense, IdType::NationalId];

    pub fn code(self) -> &'static str {
        match self {
            IdType::Passport => "passport",
            IdType::DrivingLicense => "driving_license",
            IdType::NationalId => "national_id",
        }
    }

    pub fn from_code(code: &str) -> Option<IdType> {
        IdType::ALL.into_iter().find(|t| t.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOfFunds {
    Salary,
    Business,
    Investments,
    Inheritance,
}

impl SourceOfFunds {
    pub const ALL: [SourceOfFunds; 4] = [
        SourceOfFunds::Salary,
        SourceOfFunds::Business,
        SourceOfFunds::Investments,
        SourceOfFunds::Inheritance,
    ];

    pub fn code(self) -> &'static str {
        match self {
            SourceOfFunds::Salary => "salary",
            SourceOfFunds::Business => "business",
            SourceOfFunds::Investments => "investments",
            SourceOfFunds::Inheritance => "inheritance",
        }
    }

    pub fn from_code(code: &str) -> Option<SourceOfFunds> {
        SourceOfFunds::ALL.into_iter().find(|s| s.code() == code)
    }
}

// ============ Form values ============

/// An uploaded file held in memory. Never persisted client-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Original file name.
    pub file_name: String,
    /// MIME type reported by the uploader.
    pub content_type: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A candidate value handed to the validator.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Missing,
    Text(&'a str),
    Artifact(&'a Artifact),
}

/// In-progress record: any field may still be missing.
///
/// Serializes to the camelCase JSON kept in the `form-state` slot. Artifacts
/// are skipped, so a reload always comes back without them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    #[serde(skip)]
    pub id_document: Option<Artifact>,
    #[serde(skip)]
    pub selfie: Option<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_income: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_of_funds: Option<String>,
}

impl FormValues {
    fn text_slot(&self, field: Field) -> Option<&Option<String>> {
        match field {
            Field::FirstName => Some(&self.first_name),
            Field::LastName => Some(&self.last_name),
            Field::Email => Some(&self.email),
            Field::Phone => Some(&self.phone),
            Field::DateOfBirth => Some(&self.date_of_birth),
            Field::Address => Some(&self.address),
            Field::City => Some(&self.city),
            Field::State => Some(&self.state),
            Field::ZipCode => Some(&self.zip_code),
            Field::Country => Some(&self.country),
            Field::IdType => Some(&self.id_type),
            Field::IdNumber => Some(&self.id_number),
            Field::IdDocument | Field::Selfie => None,
            Field::Occupation => Some(&self.occupation),
            Field::EmployerName => Some(&self.employer_name),
            Field::AnnualIncome => Some(&self.annual_income),
            Field::SourceOfFunds => Some(&self.source_of_funds),
        }
    }

    fn text_slot_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::FirstName => Some(&mut self.first_name),
            Field::LastName => Some(&mut self.last_name),
            Field::Email => Some(&mut self.email),
            Field::Phone => Some(&mut self.phone),
            Field::DateOfBirth => Some(&mut self.date_of_birth),
            Field::Address => Some(&mut self.address),
            Field::City => Some(&mut self.city),
            Field::State => Some(&mut self.state),
            Field::ZipCode => Some(&mut self.zip_code),
            Field::Country => Some(&mut self.country),
            Field::IdType => Some(&mut self.id_type),
            Field::IdNumber => Some(&mut self.id_number),
            Field::IdDocument | Field::Selfie => None,
            Field::Occupation => Some(&mut self.occupation),
            Field::EmployerName => Some(&mut self.employer_name),
            Field::AnnualIncome => Some(&mut self.annual_income),
            Field::SourceOfFunds => Some(&mut self.source_of_funds),
        }
    }

    fn artifact_slot_mut(&mut self, field: Field) -> Option<&mut Option<Artifact>> {
        match field {
            Field::IdDocument => Some(&mut self.id_document),
            Field::Selfie => Some(&mut self.selfie),
            _ => None,
        }
    }

    /// Current value of `field` as the validator sees it.
    pub fn value(&self, field: Field) -> FieldValue<'_> {
        let found = match field {
            Field::IdDocument => self.id_document.as_ref().map(FieldValue::Artifact),
            Field::Selfie => self.selfie.as_ref().map(FieldValue::Artifact),
            _ => self
                .text_slot(field)
                .and_then(|slot| slot.as_deref())
                .map(FieldValue::Text),
        };
        found.unwrap_or(FieldValue::Missing)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.text_slot(field).and_then(|slot| slot.as_deref())
    }

    pub fn artifact(&self, field: Field) -> Option<&Artifact> {
        match field {
            Field::IdDocument => self.id_document.as_ref(),
            Field::Selfie => self.selfie.as_ref(),
            _ => None,
        }
    }

    /// Stores a text value. Returns `false` (and stores nothing) for artifact fields.
    pub fn set_text(&mut self, field: Field, value: impl Into<String>) -> bool {
        match self.text_slot_mut(field) {
            Some(slot) => {
                *slot = Some(value.into());
                true
            }
            None => false,
        }
    }

    /// Stores an upload. Returns `false` (and stores nothing) for text fields.
    pub fn set_artifact(&mut self, field: Field, artifact: Artifact) -> bool {
        match self.artifact_slot_mut(field) {
            Some(slot) => {
                *slot = Some(artifact);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, field: Field) {
        if let Some(slot) = self.text_slot_mut(field) {
            *slot = None;
        } else if let Some(slot) = self.artifact_slot_mut(field) {
            *slot = None;
        }
    }

    /// Scalar fields that hold a value, in record order.
    pub fn scalar_entries(&self) -> Vec<(Field, &str)> {
        Field::ALL
            .into_iter()
            .filter_map(|field| self.text(field).map(|value| (field, value)))
            .collect()
    }
}

/// A complete, validated KYC record ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub id_type: IdType,
    pub id_number: String,
    pub id_document: Artifact,
    pub selfie: Artifact,
    pub occupation: String,
    pub employer_name: String,
    pub annual_income: String,
    pub source_of_funds: SourceOfFunds,
}

impl Record {
    /// Scalar parts as `(field, text)` in record order.
    pub fn text_parts(&self) -> Vec<(Field, String)> {
        vec![
            (Field::FirstName, self.first_name.clone()),
            (Field::LastName, self.last_name.clone()),
            (Field::Email, self.email.clone()),
            (Field::Phone, self.phone.clone()),
            (
                Field::DateOfBirth,
                self.date_of_birth.format("%Y-%m-%d").to_string(),
            ),
            (Field::Address, self.address.clone()),
            (Field::City, self.city.clone()),
            (Field::State, self.state.clone()),
            (Field::ZipCode, self.zip_code.clone()),
            (Field::Country, self.country.clone()),
            (Field::IdType, self.id_type.code().to_string()),
            (Field::IdNumber, self.id_number.clone()),
            (Field::Occupation, self.occupation.clone()),
            (Field::EmployerName, self.employer_name.clone()),
            (Field::AnnualIncome, self.annual_income.clone()),
            (Field::SourceOfFunds, self.source_of_funds.code().to_string()),
        ]
    }

    /// Binary parts keyed by field.
    pub fn artifacts(&self) -> [(Field, &Artifact); 2] {
        [
            (Field::IdDocument, &self.id_document),
            (Field::Selfie, &self.selfie),
        ]
    }

    pub fn applicant_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ============ Intake API Models ============

/// Acknowledgment returned by the Record Intake Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeAck {
    /// Whether the record was accepted.
    pub success: bool,
    /// Message describing the result.
    #[serde(default)]
    pub message: String,
}

/// Summary of an uploaded artifact kept on the intake side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
    /// SHA-256 of the content (hex encoded).
    pub sha256: String,
}

/// Receipt of an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeReceipt {
    pub submission_id: Uuid,
    pub applicant: String,
    pub received_at: DateTime<Utc>,
    pub id_document: ArtifactDigest,
    pub selfie: ArtifactDigest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("userId"), None);
    }

    #[test]
    fn test_field_serde_matches_wire_name() {
        let json = serde_json::to_string(&Field::ZipCode).unwrap();
        assert_eq!(json, "\"zipCode\"");
    }

    #[test]
    fn test_step_navigation_bounds() {
        assert_eq!(Step::Personal.prev(), None);
        assert_eq!(Step::Review.next(), None);
        assert_eq!(Step::Address.next(), Some(Step::Identity));
        assert_eq!(Step::from_number(0), None);
        assert_eq!(Step::from_number(6), None);
    }

    #[test]
    fn test_artifact_fields_reject_text() {
        let mut values = FormValues::default();
        assert!(!values.set_text(Field::Selfie, "selfie.png"));
        assert!(values.selfie.is_none());
        assert!(!values.set_artifact(Field::City, Artifact::new("a", "b", vec![1])));
        assert!(values.city.is_none());
    }

    #[test]
    fn test_artifacts_are_not_serialized() {
        let mut values = FormValues::default();
        values.set_text(Field::IdNumber, "AB12345");
        values.set_artifact(
            Field::IdDocument,
            Artifact::new("id.pdf", "application/pdf", vec![1, 2, 3]),
        );

        let json = serde_json::to_string(&values).unwrap();
        assert!(json.contains("\"idNumber\":\"AB12345\""));
        assert!(!json.contains("idDocument"));

        let restored: FormValues = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.text(Field::IdNumber), Some("AB12345"));
        assert!(restored.id_document.is_none());
    }

    #[test]
    fn test_clear_field() {
        let mut values = FormValues::default();
        values.set_text(Field::City, "Austin");
        values.set_artifact(Field::Selfie, Artifact::new("me.jpg", "image/jpeg", vec![9]));
        values.clear(Field::City);
        values.clear(Field::Selfie);
        assert!(matches!(values.value(Field::City), FieldValue::Missing));
        assert!(matches!(values.value(Field::Selfie), FieldValue::Missing));
    }
}
