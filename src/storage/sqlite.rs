use crate::cursor::CursorData;
use crate::models::{LinkPatch, ShortLink};
use crate::storage::trait_def::now_millis;
use crate::storage::{LinkStore, SeedLink, StorageError, StorageResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid SQLite URL '{database_url}'"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn ownership_error(&self, id: &str) -> StorageError {
        match self.get_by_id(id).await {
            Ok(Some(_)) => StorageError::Forbidden,
            Ok(None) => StorageError::NotFound,
            Err(e) => StorageError::Other(e),
        }
    }
}

#[async_trait]
impl LinkStore for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id TEXT PRIMARY KEY NOT NULL,
                user_id TEXT NOT NULL,
                url TEXT NOT NULL,
                short_code TEXT NOT NULL UNIQUE,
                title TEXT,
                clicks INTEGER NOT NULL DEFAULT 0 CHECK (clicks >= 0),
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_links_owner ON links(user_id, created_at DESC, id DESC)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_with_code(
        &self,
        owner_id: &str,
        target_url: &str,
        short_code: &str,
        title: Option<&str>,
    ) -> StorageResult<ShortLink> {
        let now = now_millis();
        let id = uuid::Uuid::new_v4().to_string();

        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            INSERT INTO links (id, user_id, url, short_code, title, clicks, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            ON CONFLICT(short_code) DO NOTHING
            RETURNING id, user_id, url, short_code, title, clicks, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(target_url)
        .bind(short_code)
        .bind(title)
        .bind(now)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await?;

        link.ok_or(StorageError::Conflict)
    }

    async fn get_by_code(&self, short_code: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, user_id, url, short_code, title, clicks, created_at, updated_at
            FROM links
            WHERE short_code = ?
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, user_id, url, short_code, title, clicks, created_at, updated_at
            FROM links
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        limit: i64,
        after: Option<&CursorData>,
    ) -> Result<Vec<ShortLink>> {
        let links = if let Some(cursor) = after {
            sqlx::query_as::<_, ShortLink>(
                r#"
                SELECT id, user_id, url, short_code, title, clicks, created_at, updated_at
                FROM links
                WHERE user_id = ?
                  AND (created_at < ? OR (created_at = ? AND id < ?))
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                "#,
            )
            .bind(owner_id)
            .bind(cursor.created_at)
            .bind(cursor.created_at)
            .bind(&cursor.id)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?
        } else {
            sqlx::query_as::<_, ShortLink>(
                r#"
                SELECT id, user_id, url, short_code, title, clicks, created_at, updated_at
                FROM links
                WHERE user_id = ?
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                "#,
            )
            .bind(owner_id)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?
        };

        Ok(links)
    }

    async fn update(
        &self,
        id: &str,
        owner_id: &str,
        patch: &LinkPatch,
    ) -> StorageResult<ShortLink> {
        let title_set = patch.title.is_some();
        let title = patch.title.as_ref().and_then(|t| t.as_deref());

        // updated_at must move forward even when two writes land in the same millisecond
        let updated = sqlx::query_as::<_, ShortLink>(
            r#"
            UPDATE links
            SET url = COALESCE(?, url),
                short_code = COALESCE(?, short_code),
                title = CASE WHEN ? THEN ? ELSE title END,
                updated_at = MAX(?, updated_at + 1)
            WHERE id = ? AND user_id = ?
            RETURNING id, user_id, url, short_code, title, clicks, created_at, updated_at
            "#,
        )
        .bind(patch.target_url.as_deref())
        .bind(patch.short_code.as_deref())
        .bind(title_set)
        .bind(title)
        .bind(now_millis())
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match updated {
            Some(link) => Ok(link),
            None => Err(self.ownership_error(id).await),
        }
    }

    async fn delete(&self, id: &str, owner_id: &str) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM links
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.ownership_error(id).await);
        }

        Ok(())
    }

    async fn increment_clicks(&self, short_code: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET clicks = clicks + 1
            WHERE short_code = ?
            "#,
        )
        .bind(short_code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_seed(&self, link: &SeedLink) -> StorageResult<ShortLink> {
        let now = now_millis();

        let inserted = sqlx::query_as::<_, ShortLink>(
            r#"
            INSERT INTO links (id, user_id, url, short_code, title, clicks, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            RETURNING id, user_id, url, short_code, title, clicks, created_at, updated_at
            "#,
        )
        .bind(&link.id)
        .bind(&link.owner_id)
        .bind(&link.target_url)
        .bind(&link.short_code)
        .bind(link.title.as_deref())
        .bind(link.clicks)
        .bind(now)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await?;

        inserted.ok_or(StorageError::Conflict)
    }
}
