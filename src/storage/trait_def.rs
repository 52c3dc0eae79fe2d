use crate::cursor::CursorData;
use crate::models::{LinkPatch, ShortLink};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error("link not found")]
    NotFound,
    #[error("link belongs to another owner")]
    Forbidden,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            _ => StorageError::Other(err.into()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A link about to be inserted with every column supplied by the caller
#[derive(Debug, Clone)]
pub struct SeedLink {
    pub id: String,
    pub owner_id: String,
    pub target_url: String,
    pub short_code: String,
    pub title: Option<String>,
    pub clicks: i64,
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Insert a new link with clicks = 0. Fails with `Conflict` if the code is taken.
    async fn create_with_code(
        &self,
        owner_id: &str,
        target_url: &str,
        short_code: &str,
        title: Option<&str>,
    ) -> StorageResult<ShortLink>;

    /// Get a link by short code
    async fn get_by_code(&self, short_code: &str) -> Result<Option<ShortLink>>;

    /// Get a link by id
    async fn get_by_id(&self, id: &str) -> Result<Option<ShortLink>>;

    /// Links owned by `owner_id`, newest first, starting after `after`
    async fn list_by_owner(
        &self,
        owner_id: &str,
        limit: i64,
        after: Option<&CursorData>,
    ) -> Result<Vec<ShortLink>>;

    /// Apply `patch` to a link owned by `owner_id`
    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        patch: &LinkPatch,
    ) -> StorageResult<ShortLink>;

    /// Delete a link owned by `owner_id`
    async fn delete(&self, id: &str, owner_id: &str) -> StorageResult<()>;

    /// Atomically increment the click counter. Returns false if no link has this code.
    async fn increment_clicks(&self, short_code: &str) -> Result<bool>;

    /// Insert a fully specified record (seeding)
    async fn insert_seed(&self, link: &SeedLink) -> StorageResult<ShortLink>;
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
