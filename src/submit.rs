use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// JSON payload for `POST /api/captions`: caption text plus an optional
/// composed raster as a data URL.
#[derive(Debug, Clone, Serialize)]
pub struct CaptionSubmission {
    pub text: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmissionReply {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionError {
    error: String,
}

/// Post a caption to a running server. Returns the stored caption id.
pub async fn post_caption(base_url: &str, submission: &CaptionSubmission) -> Result<String> {
    let url = format!("{}/api/captions", base_url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .json(submission)
        .send()
        .await
        .with_context(|| format!("failed to reach caption server at {}", url))?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<SubmissionError>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("HTTP {}", status));
        return Err(anyhow!("caption submission rejected: {}", message));
    }

    let reply = response
        .json::<SubmissionReply>()
        .await
        .with_context(|| "failed to parse caption submission response")?;
    tracing::info!(id = %reply.id, "caption submitted");
    Ok(reply.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_omits_absent_fields() {
        let submission = CaptionSubmission {
            text: "hello".to_string(),
            language: Language::English,
            category: None,
            image: None,
        };
        let json = serde_json::to_string(&submission).unwrap();
        assert_eq!(json, r#"{"text":"hello","language":"english"}"#);
    }

    #[test]
    fn submission_carries_image_when_present() {
        let submission = CaptionSubmission {
            text: "hello".to_string(),
            language: Language::Urdu,
            category: Some("Vibes".to_string()),
            image: Some("data:image/jpeg;base64,AAAA".to_string()),
        };
        let json = serde_json::to_string(&submission).unwrap();
        assert!(json.contains("\"category\":\"Vibes\""));
        assert!(json.contains("\"image\":\"data:image/jpeg;base64,AAAA\""));
    }
}
