use crate::errors::{AppError, SubmissionError};
use crate::models::{IntakeAck, Record};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing;
use uuid::Uuid;

/// Path of the intake endpoint relative to the service base URL.
pub const SUBMIT_PATH: &str = "/api/submit-kyc";

/// Multipart part carrying the per-attempt submission identifier.
pub const SUBMISSION_ID_PART: &str = "submissionId";

/// Client for the Record Intake Service.
#[derive(Clone)]
pub struct IntakeClient {
    client: reqwest::Client,
    endpoint: String,
}

impl IntakeClient {
    /// Creates a new `IntakeClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the intake service.
    /// * `timeout` - Upper bound for a whole submission round trip.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create intake client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), SUBMIT_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one record as a single multipart request.
    ///
    /// # Arguments
    ///
    /// * `submission_id` - Identifier of this attempt.
    /// * `record` - The complete record, artifacts included.
    ///
    /// # Returns
    ///
    /// * `Result<IntakeAck, SubmissionError>` - The acknowledgment when the
    ///   service accepted the record.
    pub async fn send(
        &self,
        submission_id: Uuid,
        record: &Record,
    ) -> Result<IntakeAck, SubmissionError> {
        let form = build_form(submission_id, record)?;
        tracing::info!(
            "Submitting record {} to intake service: {}",
            submission_id,
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(format!("Intake request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            SubmissionError::Transport(format!("Failed to read intake response: {}", e))
        })?;
        let ack: Option<IntakeAck> = serde_json::from_str(&body).ok();

        match ack {
            Some(ack) if status.is_success() && ack.success => {
                tracing::info!("✓ Record {} accepted: {}", submission_id, ack.message);
                Ok(ack)
            }
            Some(ack) => {
                let message = if ack.message.trim().is_empty() {
                    format!("Submission rejected ({})", status)
                } else {
                    ack.message
                };
                tracing::warn!("Record {} rejected ({}): {}", submission_id, status, message);
                Err(SubmissionError::Rejected {
                    status: status.as_u16(),
                    message,
                })
            }
            None if status.is_success() => Err(SubmissionError::Transport(
                "Intake service returned an unreadable acknowledgment".to_string(),
            )),
            None => {
                tracing::warn!("Intake service returned {}: {}", status, body);
                Err(SubmissionError::Transport(format!(
                    "Intake service returned {}",
                    status
                )))
            }
        }
    }
}

/// Scalar fields as text parts, artifacts as file parts, plus the submission id.
fn build_form(submission_id: Uuid, record: &Record) -> Result<Form, SubmissionError> {
    let mut form = Form::new().text(SUBMISSION_ID_PART, submission_id.to_string());

    for (field, value) in record.text_parts() {
        form = form.text(field.name(), value);
    }

    for (field, artifact) in record.artifacts() {
        let part = Part::bytes(artifact.bytes.clone())
            .file_name(artifact.file_name.clone())
            .mime_str(&artifact.content_type)
            .map_err(|e| {
                SubmissionError::Transport(format!(
                    "Invalid content type '{}' for {}: {}",
                    artifact.content_type, field, e
                ))
            })?;
        form = form.part(field.name(), part);
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = IntakeClient::new("https://example.com/", Duration::from_secs(5));
        assert!(client.is_ok());
        assert_eq!(
            client.unwrap().endpoint(),
            "https://example.com/api/submit-kyc"
        );
    }
}
