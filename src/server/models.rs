use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::language::Language;
use crate::store::{Caption, User};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct SignupRequest {
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct LoginRequest {
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct CaptionRequest {
    pub(crate) text: Option<String>,
    pub(crate) language: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) image: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct FavoriteRequest {
    #[serde(rename = "userId")]
    pub(crate) user_id: Option<String>,
    #[serde(rename = "captionId")]
    pub(crate) caption_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct CaptionsQuery {
    pub(crate) lang: Option<String>,
    pub(crate) search: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct FavoriteCheckQuery {
    #[serde(rename = "captionIds")]
    pub(crate) caption_ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CaptionPayload {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) language: Language,
    pub(crate) category: String,
    pub(crate) likes: u64,
    pub(crate) gradient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) image: Option<String>,
    #[serde(rename = "createdAt")]
    pub(crate) created_at: String,
}

impl CaptionPayload {
    pub(crate) fn from_caption(caption: Caption) -> Result<Self> {
        Ok(Self {
            id: caption.id,
            text: caption.text,
            language: caption.language,
            category: caption.category,
            likes: caption.likes,
            gradient: caption.gradient,
            image: caption.image,
            created_at: format_timestamp(caption.created_at)?,
        })
    }
}

/// A user as the API exposes it: the password never leaves the store.
#[derive(Debug, Serialize)]
pub(crate) struct UserPayload {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) avatar: String,
    #[serde(rename = "createdAt")]
    pub(crate) created_at: String,
}

impl UserPayload {
    pub(crate) fn from_user(user: User) -> Result<Self> {
        Ok(Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
            created_at: format_timestamp(user.created_at)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ToggleResponse {
    pub(crate) favorited: bool,
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

fn format_timestamp(unix_seconds: u64) -> Result<String> {
    let moment = OffsetDateTime::from_unix_timestamp(unix_seconds as i64)?;
    Ok(moment.format(&Rfc3339)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_payload_never_carries_the_password() {
        let user = User {
            id: "u1".to_string(),
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password: "secret".to_string(),
            avatar: "https://example.com/a.png".to_string(),
            created_at: 1767225600,
        };
        let payload = UserPayload::from_user(user).unwrap();
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"_id\":\"u1\""));
    }

    #[test]
    fn caption_payload_formats_created_at_as_rfc3339() {
        let caption = Caption {
            id: "c1".to_string(),
            text: "hello".to_string(),
            language: Language::English,
            category: "General".to_string(),
            likes: 0,
            gradient: "from-cyan-400 to-blue-600".to_string(),
            image: None,
            created_at: 1767225600,
        };
        let payload = CaptionPayload::from_caption(caption).unwrap();
        assert_eq!(payload.created_at, "2026-01-01T00:00:00Z");
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"createdAt\":\"2026-01-01T00:00:00Z\""));
        // absent images are dropped from the payload entirely
        assert!(!json.contains("\"image\""));
    }

    #[test]
    fn favorite_request_uses_camel_case_keys() {
        let request: FavoriteRequest =
            serde_json::from_str(r#"{"userId":"u1","captionId":"c1"}"#).unwrap();
        assert_eq!(request.user_id.as_deref(), Some("u1"));
        assert_eq!(request.caption_id.as_deref(), Some("c1"));
    }
}
