//! Demo data for local development.

use anyhow::{bail, Result};
use tracing::warn;

use crate::models::ShortLink;
use crate::storage::{LinkStore, SeedLink, StorageError};

/// (short code, target, title, clicks)
pub const SAMPLE_LINKS: &[(&str, &str, &str, i64)] = &[
    ("gh-trend", "https://www.github.com/trending", "GitHub Trending Repositories", 42),
    ("yt-music", "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "Awesome Music Video", 156),
    ("r-prog", "https://www.reddit.com/r/programming", "Programming Subreddit", 89),
    (
        "so-ts",
        "https://stackoverflow.com/questions/tagged/typescript",
        "TypeScript Questions on Stack Overflow",
        234,
    ),
    (
        "li-jobs",
        "https://www.linkedin.com/jobs/software-engineer-jobs",
        "Software Engineer Jobs",
        67,
    ),
    ("dev-js", "https://dev.to/t/javascript", "JavaScript Articles on DEV", 123),
    ("npm-react", "https://www.npmjs.com/package/react", "React on NPM", 178),
    ("v-docs", "https://vercel.com/docs", "Vercel Documentation", 45),
    ("ts-docs", "https://www.typescriptlang.org/docs/", "TypeScript Official Docs", 201),
    ("next-docs", "https://nextjs.org/docs", "Next.js Documentation", 312),
];

#[derive(Debug, Default)]
pub struct SeedReport {
    pub inserted: Vec<ShortLink>,
    pub skipped: Vec<String>,
}

/// Insert the sample links for `owner_id`, skipping codes that already exist
pub async fn seed_sample_links(storage: &dyn LinkStore, owner_id: &str) -> Result<SeedReport> {
    if owner_id.trim().is_empty() {
        bail!("owner id must not be empty");
    }

    let mut report = SeedReport::default();

    for (code, url, title, clicks) in SAMPLE_LINKS {
        let link = SeedLink {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            target_url: url.to_string(),
            short_code: code.to_string(),
            title: Some(title.to_string()),
            clicks: *clicks,
        };

        match storage.insert_seed(&link).await {
            Ok(inserted) => report.inserted.push(inserted),
            Err(StorageError::Conflict) => {
                warn!(short_code = %code, "short code already exists, skipping");
                report.skipped.push(code.to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::service::validate_target_url;
    use crate::storage::SqliteStorage;

    #[test]
    fn sample_links_are_valid() {
        for (code, url, _, clicks) in SAMPLE_LINKS {
            assert!(crate::links::code::validate_custom_code(code, 32).is_ok(), "{code}");
            assert!(validate_target_url(url).is_ok(), "{url}");
            assert!(*clicks >= 0);
        }
    }

    #[tokio::test]
    async fn seeding_twice_skips_existing_codes() {
        let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        storage.init().await.unwrap();

        let first = seed_sample_links(&storage, "demo_user").await.unwrap();
        assert_eq!(first.inserted.len(), SAMPLE_LINKS.len());
        assert!(first.skipped.is_empty());

        let link = storage.get_by_code("next-docs").await.unwrap().unwrap();
        assert_eq!(link.clicks, 312);
        assert_eq!(link.owner_id, "demo_user");

        let second = seed_sample_links(&storage, "demo_user").await.unwrap();
        assert!(second.inserted.is_empty());
        assert_eq!(second.skipped.len(), SAMPLE_LINKS.len());
    }
}
