use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the intake service listens on.
    pub port: u16,
    /// Base URL the form submits to.
    pub intake_url: String,
    /// Directory backing the durable slot.
    pub state_dir: PathBuf,
    /// Timeout for one submission round trip.
    pub submit_timeout_secs: u64,
    /// Largest accepted multipart body.
    pub max_upload_bytes: usize,
    /// How long intake receipts (and duplicate detection) are kept.
    pub receipt_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            intake_url: "http://127.0.0.1:3000".to_string(),
            state_dir: PathBuf::from(".kyc-state"),
            submit_timeout_secs: 30,
            max_upload_bytes: 10 * 1024 * 1024,
            receipt_ttl_secs: 86_400,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            port: env_or("PORT", defaults.port)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            intake_url: std::env::var("KYC_INTAKE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| validate_base_url(&url).map(|_| url))
                .transpose()?
                .unwrap_or(defaults.intake_url),
            state_dir: std::env::var("KYC_STATE_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            submit_timeout_secs: env_or("KYC_SUBMIT_TIMEOUT_SECS", defaults.submit_timeout_secs)
                .and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("KYC_SUBMIT_TIMEOUT_SECS must be greater than 0");
                    }
                    Ok(secs)
                })?,
            max_upload_bytes: env_or("KYC_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            receipt_ttl_secs: env_or("KYC_RECEIPT_TTL_SECS", defaults.receipt_ttl_secs)?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Intake URL: {}", config.intake_url);
        tracing::debug!("State directory: {}", config.state_dir.display());
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Reads `key` and parses it, falling back to `default` when unset or blank.
fn env_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        _ => Ok(default),
    }
}

/// Accepts absolute http(s) URLs only.
pub fn validate_base_url(raw: &str) -> anyhow::Result<url::Url> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("KYC_INTAKE_URL is not a valid URL: {}", e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("KYC_INTAKE_URL must start with http:// or https://");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_validation() {
        assert!(validate_base_url("https://kyc.example.com").is_ok());
        assert!(validate_base_url("http://127.0.0.1:3000/").is_ok());
        assert!(validate_base_url("ftp://kyc.example.com").is_err());
        assert!(validate_base_url("kyc.example.com").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.submit_timeout_secs, 30);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }
}
