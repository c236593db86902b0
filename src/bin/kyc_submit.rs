//! Drives the KYC form from the command line.
//!
//! Usage: `kyc_submit <values.json> <id-document> <selfie>`
//!
//! `values.json` maps wire field names (`firstName`, `zipCode`, ...) to text.
//! The form resumes any session saved under `KYC_STATE_DIR`, walks the steps up
//! to review and submits to `KYC_INTAKE_URL`.
use anyhow::Context;
use kyc_intake::config::Config;
use kyc_intake::form::KycForm;
use kyc_intake::intake_client::IntakeClient;
use kyc_intake::models::{Artifact, Field, Step};
use kyc_intake::persistence::{FileSlotStore, PersistenceBridge};
use kyc_intake::submission::SubmissionCoordinator;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        anyhow::bail!("usage: {} <values.json> <id-document> <selfie>", args[0]);
    }

    let config = Config::from_env()?;

    let raw = std::fs::read_to_string(&args[1])
        .with_context(|| format!("reading {}", args[1]))?;
    let entries: BTreeMap<String, String> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", args[1]))?;

    let client = IntakeClient::new(
        &config.intake_url,
        Duration::from_secs(config.submit_timeout_secs),
    )?;
    let bridge = PersistenceBridge::new(FileSlotStore::new(&config.state_dir));
    let mut form = KycForm::open(bridge, SubmissionCoordinator::new(client));
    tracing::info!(
        "Session {} on step {}",
        form.session().id(),
        form.session().current_step()
    );

    for (name, value) in entries {
        let Some(field) = Field::from_name(&name) else {
            tracing::warn!("Skipping unknown field '{}'", name);
            continue;
        };
        if let Err(e) = form.set_text(field, value) {
            tracing::warn!("{}", e);
        }
    }

    for (field, path) in [(Field::IdDocument, &args[2]), (Field::Selfie, &args[3])] {
        let artifact = read_artifact(Path::new(path))?;
        if let Err(e) = form.attach(field, artifact) {
            tracing::warn!("{}", e);
        }
    }

    while form.session().current_step() != Step::Review {
        match form.next() {
            Ok(step) => tracing::info!("Moved to step {}", step),
            Err(blocked) => {
                for error in &blocked.errors {
                    eprintln!("  {}: {}", error.field.label(), error.reason);
                }
                anyhow::bail!("{}", blocked);
            }
        }
    }

    for (field, value) in form.session().values().scalar_entries() {
        println!("{:>16}: {}", field.label(), value);
    }

    let ack = form.submit().await?;
    println!("Submitted {}: {}", ack.submission_id, ack.message);

    Ok(())
}

fn read_artifact(path: &Path) -> anyhow::Result<Artifact> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    Ok(Artifact::new(file_name, content_type_for(path), bytes))
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
