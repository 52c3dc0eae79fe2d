use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::code::{generate_short_code, is_reserved, validate_custom_code};
use super::error::LinkError;
use crate::config::ShortCodeConfig;
use crate::cursor::{create_cursor, verify_cursor, CursorData};
use crate::models::{LinkPage, LinkPatch, ShortLink, UpdateLinkRequest};
use crate::storage::{LinkStore, StorageError};

pub const MAX_PAGE_SIZE: i64 = 100;

/// Input for [`LinkService::create`]
#[derive(Debug, Clone, Default)]
pub struct NewLink {
    pub url: String,
    pub short_code: Option<String>,
    pub title: Option<String>,
}

/// Business rules around the link store: validation, code generation and
/// ownership-aware error mapping.
pub struct LinkService {
    storage: Arc<dyn LinkStore>,
    codes: ShortCodeConfig,
    generate: fn(usize) -> String,
}

impl LinkService {
    pub fn new(storage: Arc<dyn LinkStore>, codes: ShortCodeConfig) -> Self {
        Self {
            storage,
            codes,
            generate: generate_short_code,
        }
    }

    pub async fn create(&self, owner_id: &str, new: NewLink) -> Result<ShortLink, LinkError> {
        if owner_id.trim().is_empty() {
            return Err(LinkError::Unauthenticated);
        }

        let target_url = validate_target_url(&new.url)?;
        let title = normalize_title(new.title);

        if let Some(code) = new.short_code {
            validate_custom_code(&code, self.codes.max_length).map_err(LinkError::InvalidCode)?;

            let link = self
                .storage
                .create_with_code(owner_id, &target_url, &code, title.as_deref())
                .await?;
            info!(short_code = %link.short_code, owner = %owner_id, "created link");
            return Ok(link);
        }

        for attempt in 1..=self.codes.max_attempts {
            let code = (self.generate)(self.codes.length);
            if is_reserved(&code) {
                debug!(attempt, short_code = %code, "generated short code is reserved, retrying");
                continue;
            }
            match self
                .storage
                .create_with_code(owner_id, &target_url, &code, title.as_deref())
                .await
            {
                Ok(link) => {
                    info!(short_code = %link.short_code, owner = %owner_id, "created link");
                    return Ok(link);
                }
                Err(StorageError::Conflict) => {
                    debug!(attempt, short_code = %code, "generated short code collided, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            attempts = self.codes.max_attempts,
            length = self.codes.length,
            "exhausted short code generation attempts"
        );
        Err(LinkError::CodeSpaceExhausted(self.codes.max_attempts))
    }

    /// Look up a code for redirection and count the click
    pub async fn resolve(&self, short_code: &str) -> Result<ShortLink, LinkError> {
        let mut link = self
            .storage
            .get_by_code(short_code)
            .await?
            .ok_or(LinkError::NotFound)?;

        // The link may have been deleted between the lookup and the increment
        if !self.storage.increment_clicks(short_code).await? {
            return Err(LinkError::NotFound);
        }
        link.clicks += 1;

        Ok(link)
    }

    pub async fn get_owned(&self, owner_id: &str, short_code: &str) -> Result<ShortLink, LinkError> {
        let link = self
            .storage
            .get_by_code(short_code)
            .await?
            .ok_or(LinkError::NotFound)?;

        if link.owner_id != owner_id {
            return Err(LinkError::Forbidden);
        }

        Ok(link)
    }

    pub async fn list(
        &self,
        owner_id: &str,
        limit: i64,
        cursor: Option<&str>,
    ) -> Result<LinkPage, LinkError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let after = cursor
            .map(verify_cursor)
            .transpose()
            .map_err(|_| LinkError::InvalidCursor)?;

        let links = self
            .storage
            .list_by_owner(owner_id, limit, after.as_ref())
            .await?;

        let next_cursor = if links.len() as i64 == limit {
            links
                .last()
                .map(|last| create_cursor(&CursorData::from(last)))
                .transpose()?
        } else {
            None
        };

        Ok(LinkPage { links, next_cursor })
    }

    pub async fn update(
        &self,
        owner_id: &str,
        id: &str,
        request: UpdateLinkRequest,
    ) -> Result<ShortLink, LinkError> {
        let patch = LinkPatch {
            target_url: request
                .url
                .as_deref()
                .map(validate_target_url)
                .transpose()?,
            short_code: match request.short_code {
                Some(code) => {
                    validate_custom_code(&code, self.codes.max_length)
                        .map_err(LinkError::InvalidCode)?;
                    Some(code)
                }
                None => None,
            },
            title: request.title.map(|t| normalize_title(Some(t))),
        };

        if patch.is_empty() {
            let link = self
                .storage
                .get_by_id(id)
                .await?
                .ok_or(LinkError::NotFound)?;
            if link.owner_id != owner_id {
                return Err(LinkError::Forbidden);
            }
            return Ok(link);
        }

        let link = self.storage.update(id, owner_id, &patch).await?;
        info!(id = %link.id, short_code = %link.short_code, "updated link");
        Ok(link)
    }

    pub async fn delete(&self, owner_id: &str, id: &str) -> Result<(), LinkError> {
        self.storage.delete(id, owner_id).await?;
        info!(id = %id, owner = %owner_id, "deleted link");
        Ok(())
    }
}

/// Accepts absolute http(s) URLs with a host. Returns the normalized form.
pub fn validate_target_url(raw: &str) -> Result<String, LinkError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LinkError::InvalidUrl("URL cannot be empty".to_string()));
    }

    let parsed = Url::parse(trimmed).map_err(|e| LinkError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LinkError::InvalidUrl(format!(
            "unsupported scheme '{}', only http and https are allowed",
            parsed.scheme()
        )));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(LinkError::InvalidUrl("URL must include a host".to_string()));
    }

    Ok(parsed.to_string())
}

fn normalize_title(title: Option<String>) -> Option<String> {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_url_must_be_absolute_http() {
        assert_eq!(
            validate_target_url(" https://example.com/path?q=1 ").unwrap(),
            "https://example.com/path?q=1"
        );
        assert_eq!(
            validate_target_url("http://example.com").unwrap(),
            "http://example.com/"
        );

        assert!(matches!(validate_target_url(""), Err(LinkError::InvalidUrl(_))));
        assert!(matches!(
            validate_target_url("example.com/no-scheme"),
            Err(LinkError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_target_url("/relative/path"),
            Err(LinkError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_target_url("javascript:alert(1)"),
            Err(LinkError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_target_url("ftp://files.example.com"),
            Err(LinkError::InvalidUrl(_))
        ));
    }

    #[test]
    fn blank_titles_become_none() {
        assert_eq!(normalize_title(Some("  ".to_string())), None);
        assert_eq!(
            normalize_title(Some(" Docs ".to_string())).as_deref(),
            Some("Docs")
        );
        assert_eq!(normalize_title(None), None);
    }

    mod generated_codes {
        use super::*;
        use crate::storage::SqliteStorage;
        use std::sync::atomic::{AtomicUsize, Ordering};

        static CALLS: AtomicUsize = AtomicUsize::new(0);

        fn reserved_then_free(_length: usize) -> String {
            match CALLS.fetch_add(1, Ordering::SeqCst) {
                0 => "health".to_string(),
                1 => "Assets".to_string(),
                _ => "free42".to_string(),
            }
        }

        fn always_reserved(_length: usize) -> String {
            "dashboard".to_string()
        }

        async fn service(generate: fn(usize) -> String) -> LinkService {
            let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
            storage.init().await.unwrap();
            LinkService {
                storage: Arc::new(storage),
                codes: ShortCodeConfig::default(),
                generate,
            }
        }

        fn new_link() -> NewLink {
            NewLink {
                url: "https://example.com".to_string(),
                ..Default::default()
            }
        }

        #[tokio::test]
        async fn reserved_words_are_skipped() {
            let service = service(reserved_then_free).await;
            let link = service.create("owner", new_link()).await.unwrap();
            assert_eq!(link.short_code, "free42");
            assert!(service.storage.get_by_code("health").await.unwrap().is_none());
            assert_eq!(CALLS.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn only_reserved_words_exhaust_attempts() {
            let service = service(always_reserved).await;
            let err = service.create("owner", new_link()).await.unwrap_err();
            assert!(matches!(err, LinkError::CodeSpaceExhausted(5)));
            assert!(service.storage.get_by_code("dashboard").await.unwrap().is_none());
        }
    }
}
