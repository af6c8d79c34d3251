//! Send a submission JSON file to the import endpoint.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::model::NovelSubmission;

/// Large novels take a while to ingest server-side.
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 300;

/// POST the submission at `json_path` to `api_url`. The file is parsed
/// first so malformed submissions fail before any network traffic. Returns
/// the endpoint's response body (pretty-printed JSON when possible).
pub fn upload_file(
    json_path: &Path,
    api_url: &str,
    api_key: Option<&str>,
    timeout_secs: u64,
) -> anyhow::Result<String> {
    let raw = std::fs::read_to_string(json_path)
        .with_context(|| format!("cannot read {}", json_path.display()))?;
    let submission: NovelSubmission = serde_json::from_str(&raw)
        .with_context(|| format!("invalid submission JSON in {}", json_path.display()))?;

    eprintln!("Novel: {}", submission.name);
    eprintln!("Chapters: {}", submission.chapters.len());
    if let Some(ref image_path) = submission.image_path {
        if !Path::new(image_path).exists() {
            eprintln!("Warning: local cover {} not found; sending the path anyway", image_path);
        }
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let mut request = client.post(api_url).json(&submission);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().with_context(|| format!("could not reach {}", api_url))?;
    let status = response.status();
    let body = response.text().unwrap_or_default();
    if !status.is_success() {
        bail!("import endpoint returned HTTP {}: {}", status.as_u16(), body.trim());
    }

    // Pretty-print when the endpoint answered with JSON.
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => Ok(serde_json::to_string_pretty(&value).unwrap_or(body)),
        Err(_) => Ok(body),
    }
}
