use crate::errors::AppError;
use crate::handlers::AppState;
use crate::intake_client::SUBMISSION_ID_PART;
use crate::models::{Artifact, ArtifactDigest, Field, FormValues, IntakeAck, IntakeReceipt, Record};
use crate::slot_entry::sha256_hex;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Message returned when a submission id was already accepted.
pub const DUPLICATE_SUBMISSION: &str = "duplicate submission";

/// POST /api/submit-kyc
///
/// Receives one multipart KYC record. Scalar fields arrive as text parts,
/// `idDocument` and `selfie` as file parts, plus a `submissionId`.
///
/// The record is validated again here; the service has the final word on
/// acceptance. Accepted records are acknowledged with `{success: true}` and a
/// receipt is kept for lookup and duplicate detection.
pub async fn submit_kyc(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<IntakeAck>), AppError> {
    let (submission_id, values) = read_submission(multipart).await?;
    tracing::info!("Received KYC submission {}", submission_id);

    let record = values.to_record().map_err(|errors| {
        let fields: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        AppError::Unprocessable(format!("Validation failed: {}", fields.join("; ")))
    })?;

    // Only the first request for an id gets a fresh entry
    let receipt = build_receipt(submission_id, &record);
    let entry = state
        .receipts
        .entry(submission_id)
        .or_insert_with(async move { receipt })
        .await;
    if !entry.is_fresh() {
        return Err(AppError::Conflict(DUPLICATE_SUBMISSION.to_string()));
    }

    let receipt = entry.value();
    tracing::info!(
        "✓ KYC submission {} accepted for {} (id document sha256 {}, selfie sha256 {})",
        submission_id,
        receipt.applicant,
        receipt.id_document.sha256,
        receipt.selfie.sha256
    );

    Ok((
        StatusCode::OK,
        Json(IntakeAck {
            success: true,
            message: "KYC data submitted successfully".to_string(),
        }),
    ))
}

/// Collects the multipart parts into form values and the submission id.
async fn read_submission(mut multipart: Multipart) -> Result<(Uuid, FormValues), AppError> {
    let mut submission_id = None;
    let mut values = FormValues::default();

    while let Some(part) = multipart.next_field().await? {
        let Some(name) = part.name().map(str::to_string) else {
            continue;
        };

        if name == SUBMISSION_ID_PART {
            let raw = part.text().await?;
            let id = Uuid::parse_str(raw.trim())
                .map_err(|_| AppError::BadRequest(format!("Invalid submissionId: {}", raw)))?;
            submission_id = Some(id);
            continue;
        }

        let Some(field) = Field::from_name(&name) else {
            tracing::debug!("Ignoring unknown multipart part '{}'", name);
            continue;
        };

        if field.is_artifact() {
            let file_name = part.file_name().unwrap_or(field.name()).to_string();
            let content_type = part
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = part.bytes().await?;
            values.set_artifact(field, Artifact::new(file_name, content_type, bytes.to_vec()));
        } else {
            let text = part.text().await?;
            values.set_text(field, text);
        }
    }

    let submission_id = submission_id
        .ok_or_else(|| AppError::BadRequest("Missing submissionId".to_string()))?;
    Ok((submission_id, values))
}

fn digest(artifact: &Artifact) -> ArtifactDigest {
    ArtifactDigest {
        file_name: artifact.file_name.clone(),
        content_type: artifact.content_type.clone(),
        size_bytes: artifact.bytes.len(),
        sha256: sha256_hex(&artifact.bytes),
    }
}

fn build_receipt(submission_id: Uuid, record: &Record) -> IntakeReceipt {
    IntakeReceipt {
        submission_id,
        applicant: record.applicant_name(),
        received_at: Utc::now(),
        id_document: digest(&record.id_document),
        selfie: digest(&record.selfie),
    }
}
