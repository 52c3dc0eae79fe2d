#[cfg(test)]
mod tests {
    use crate::cursor::CursorData;
    use crate::models::LinkPatch;
    use crate::storage::{LinkStore, SqliteStorage, StorageError};
    use std::sync::Arc;

    async fn setup_sqlite() -> Arc<dyn LinkStore> {
        let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        storage.init().await.unwrap();
        Arc::new(storage)
    }

    #[tokio::test]
    async fn test_create_starts_with_zero_clicks() {
        let storage = setup_sqlite().await;

        let created = storage
            .create_with_code("user_a", "https://example.com/a", "abc", Some("A"))
            .await
            .unwrap();
        assert_eq!(created.clicks, 0);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = storage.get_by_code("abc").await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.owner_id, "user_a");
        assert_eq!(fetched.title.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_duplicate_code_is_conflict() {
        let storage = setup_sqlite().await;

        storage
            .create_with_code("user_a", "https://example.com/a", "dup", None)
            .await
            .unwrap();
        let err = storage
            .create_with_code("user_b", "https://example.com/b", "dup", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        // The original record is untouched
        let link = storage.get_by_code("dup").await.unwrap().unwrap();
        assert_eq!(link.owner_id, "user_a");
    }

    #[tokio::test]
    async fn test_update_checks_ownership() {
        let storage = setup_sqlite().await;
        let link = storage
            .create_with_code("owner", "https://example.com", "mine", None)
            .await
            .unwrap();

        let patch = LinkPatch {
            title: Some(Some("stolen".to_string())),
            ..Default::default()
        };

        let err = storage.update(&link.id, "intruder", &patch).await.unwrap_err();
        assert!(matches!(err, StorageError::Forbidden));

        let err = storage.update("missing-id", "owner", &patch).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let unchanged = storage.get_by_id(&link.id).await.unwrap().unwrap();
        assert_eq!(unchanged.title, None);
    }

    #[tokio::test]
    async fn test_update_moves_updated_at_forward() {
        let storage = setup_sqlite().await;
        let link = storage
            .create_with_code("owner", "https://example.com", "ts", None)
            .await
            .unwrap();

        let patch = LinkPatch {
            title: Some(Some("Renamed".to_string())),
            ..Default::default()
        };
        let first = storage.update(&link.id, "owner", &patch).await.unwrap();
        let second = storage.update(&link.id, "owner", &patch).await.unwrap();

        assert!(first.updated_at > link.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.created_at, link.created_at);
        assert_eq!(second.title.as_deref(), Some("Renamed"));
    }

    #[tokio::test]
    async fn test_update_clears_title_and_keeps_other_fields() {
        let storage = setup_sqlite().await;
        let link = storage
            .create_with_code("owner", "https://example.com", "clr", Some("Title"))
            .await
            .unwrap();

        let patch = LinkPatch {
            title: Some(None),
            ..Default::default()
        };
        let updated = storage.update(&link.id, "owner", &patch).await.unwrap();

        assert_eq!(updated.title, None);
        assert_eq!(updated.target_url, "https://example.com");
        assert_eq!(updated.short_code, "clr");
    }

    #[tokio::test]
    async fn test_update_to_taken_code_is_conflict() {
        let storage = setup_sqlite().await;
        storage
            .create_with_code("owner", "https://example.com/1", "taken", None)
            .await
            .unwrap();
        let other = storage
            .create_with_code("owner", "https://example.com/2", "free", None)
            .await
            .unwrap();

        let patch = LinkPatch {
            short_code: Some("taken".to_string()),
            ..Default::default()
        };
        let err = storage.update(&other.id, "owner", &patch).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn test_delete_is_terminal() {
        let storage = setup_sqlite().await;
        let link = storage
            .create_with_code("owner", "https://example.com", "gone", None)
            .await
            .unwrap();

        let err = storage.delete(&link.id, "intruder").await.unwrap_err();
        assert!(matches!(err, StorageError::Forbidden));

        storage.delete(&link.id, "owner").await.unwrap();
        assert!(storage.get_by_code("gone").await.unwrap().is_none());

        let err = storage.delete(&link.id, "owner").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn test_increment_clicks_reports_missing_codes() {
        let storage = setup_sqlite().await;
        storage
            .create_with_code("owner", "https://example.com", "hit", None)
            .await
            .unwrap();

        assert!(storage.increment_clicks("hit").await.unwrap());
        assert!(storage.increment_clicks("hit").await.unwrap());
        assert!(!storage.increment_clicks("miss").await.unwrap());

        let link = storage.get_by_code("hit").await.unwrap().unwrap();
        assert_eq!(link.clicks, 2);
    }

    #[tokio::test]
    async fn test_list_by_owner_pages_newest_first() {
        let storage = setup_sqlite().await;
        for i in 0..5 {
            storage
                .create_with_code("owner", "https://example.com", &format!("own{i}"), None)
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        storage
            .create_with_code("someone_else", "https://example.com", "theirs", None)
            .await
            .unwrap();

        let first = storage.list_by_owner("owner", 3, None).await.unwrap();
        let codes: Vec<_> = first.iter().map(|l| l.short_code.as_str()).collect();
        assert_eq!(codes, vec!["own4", "own3", "own2"]);

        let last = first.last().unwrap();
        let cursor = CursorData {
            created_at: last.created_at,
            id: last.id.clone(),
        };
        let second = storage.list_by_owner("owner", 3, Some(&cursor)).await.unwrap();
        let codes: Vec<_> = second.iter().map(|l| l.short_code.as_str()).collect();
        assert_eq!(codes, vec!["own1", "own0"]);

        // Listing is re-callable and yields the same first page
        let again = storage.list_by_owner("owner", 3, None).await.unwrap();
        assert_eq!(again, first);
    }
}
