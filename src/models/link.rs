use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted short link. Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ShortLink {
    pub id: String,
    #[sqlx(rename = "user_id")]
    pub owner_id: String,
    #[sqlx(rename = "url")]
    pub target_url: String,
    pub short_code: String,
    pub title: Option<String>,
    pub clicks: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    #[serde(default)]
    pub short_code: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLinkRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub short_code: Option<String>,
    /// An empty string clears the title
    #[serde(default)]
    pub title: Option<String>,
}

/// Validated field changes handed to the store. `title: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPatch {
    pub target_url: Option<String>,
    pub short_code: Option<String>,
    pub title: Option<Option<String>>,
}

impl LinkPatch {
    pub fn is_empty(&self) -> bool {
        self.target_url.is_none() && self.short_code.is_none() && self.title.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct LinkPage {
    pub links: Vec<ShortLink>,
    pub next_cursor: Option<String>,
}
