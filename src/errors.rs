use crate::models::{IntakeAck, Step};
use crate::validation::FieldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

/// Errors raised by the intake service's HTTP layer.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Resource not found error.
    NotFound(String),
    /// Malformed request (bad multipart body, missing submission id).
    BadRequest(String),
    /// The record failed validation on the intake side.
    Unprocessable(String),
    /// The submission id was already accepted.
    Conflict(String),
    /// Error interacting with an external service.
    ExternalApiError(String),
    /// Internal server error.
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unprocessable(msg) => write!(f, "Unprocessable: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each variant to a status code and an `{success: false, message}` body,
    /// the same shape the intake client reads for acknowledgments.
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::Unprocessable(msg) => {
                tracing::warn!("Submission rejected: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            AppError::Conflict(msg) => {
                tracing::warn!("Submission conflict: {}", msg);
                (StatusCode::CONFLICT, msg)
            }
            AppError::ExternalApiError(msg) => {
                tracing::error!("External API error: {}", msg);
                (StatusCode::BAD_GATEWAY, "External service error".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error processing KYC submission".to_string(),
                )
            }
        };

        let body = Json(IntakeAck {
            success: false,
            message,
        });

        (status, body).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

/// Why a submission attempt did not produce an acknowledgment.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionError {
    /// Another submission for this session is still in flight.
    AlreadyInFlight,
    /// Submission is only offered from the review step.
    NotAtReview { current: Step },
    /// Some fields still fail validation.
    Incomplete { errors: Vec<FieldError> },
    /// The intake service answered but refused the record.
    Rejected { status: u16, message: String },
    /// The intake service could not be reached or answered unreadably.
    Transport(String),
}

impl SubmissionError {
    /// Text for the top-level, dismissible failure notice.
    pub fn notice(&self) -> String {
        match self {
            SubmissionError::AlreadyInFlight => "A submission is already in progress".to_string(),
            SubmissionError::NotAtReview { .. } => {
                "Please review your information before submitting".to_string()
            }
            SubmissionError::Incomplete { errors } => {
                format!("{} field(s) still need attention", errors.len())
            }
            SubmissionError::Rejected { message, .. } => message.clone(),
            SubmissionError::Transport(_) => {
                "Could not reach the verification service. Please try again.".to_string()
            }
        }
    }
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::AlreadyInFlight => write!(f, "Submission already in flight"),
            SubmissionError::NotAtReview { current } => {
                write!(f, "Submission attempted from step {}", current)
            }
            SubmissionError::Incomplete { errors } => {
                let fields: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "Record incomplete: {}", fields.join("; "))
            }
            SubmissionError::Rejected { status, message } => {
                write!(f, "Intake service rejected submission ({}): {}", status, message)
            }
            SubmissionError::Transport(msg) => write!(f, "Intake transport failure: {}", msg),
        }
    }
}

impl std::error::Error for SubmissionError {}

/// Read or write failure on the durable slot. Never fatal to the form.
#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    Serialization(String),
    /// Writes are paused after repeated failures.
    Suspended,
    /// The slot backend is unavailable for some other reason.
    Unavailable(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "Slot I/O error: {}", e),
            PersistenceError::Serialization(msg) => write!(f, "Slot serialization error: {}", msg),
            PersistenceError::Suspended => {
                write!(f, "Autosave suspended after repeated write failures")
            }
            PersistenceError::Unavailable(msg) => write!(f, "Slot unavailable: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}
