#[cfg(test)]
mod tests {
    use crate::models::{LinkChanges, NewLink};
    use crate::storage::{CachedStorage, SqliteStorage, Storage, StorageError};
    use std::sync::Arc;

    async fn setup_sqlite() -> Arc<dyn Storage> {
        let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
        storage.init().await.unwrap();
        Arc::new(storage)
    }

    fn new_link(title: &str, order: Option<i64>) -> NewLink {
        NewLink {
            title: title.to_string(),
            url: format!("https://{title}.example"),
            display_order: order,
        }
    }

    fn titles(links: &[crate::models::Link]) -> Vec<&str> {
        links.iter().map(|l| l.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_listing_puts_unordered_rows_last() {
        let storage = setup_sqlite().await;

        storage.create_link("owner", &new_link("legacy1", None)).await.unwrap();
        storage.create_link("owner", &new_link("b", Some(1))).await.unwrap();
        storage.create_link("owner", &new_link("legacy2", None)).await.unwrap();
        storage.create_link("owner", &new_link("a", Some(0))).await.unwrap();

        let links = storage.list_links("owner").await.unwrap();
        assert_eq!(titles(&links), vec!["a", "b", "legacy1", "legacy2"]);
    }

    #[tokio::test]
    async fn test_normalize_order_closes_holes() {
        let storage = setup_sqlite().await;

        storage.create_link("owner", &new_link("a", Some(0))).await.unwrap();
        let b = storage.create_link("owner", &new_link("b", Some(1))).await.unwrap();
        storage.create_link("owner", &new_link("c", Some(2))).await.unwrap();
        storage.create_link("owner", &new_link("d", None)).await.unwrap();

        storage.delete_link("owner", b.id).await.unwrap();

        let changed = storage.normalize_order("owner").await.unwrap();
        assert_eq!(changed, 2, "c moves from 2 to 1 and d gets 2");

        let orders: Vec<_> = storage
            .list_links("owner")
            .await
            .unwrap()
            .iter()
            .map(|l| l.display_order)
            .collect();
        assert_eq!(orders, vec![Some(0), Some(1), Some(2)]);

        // Already contiguous
        assert_eq!(storage.normalize_order("owner").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_other_owners_links_are_invisible() {
        let storage = setup_sqlite().await;

        let theirs = storage.create_link("alice", &new_link("a", Some(0))).await.unwrap();

        assert!(storage.list_links("bob").await.unwrap().is_empty());
        assert!(matches!(
            storage
                .update_link("bob", theirs.id, &LinkChanges::order(5))
                .await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            storage.delete_link("bob", theirs.id).await,
            Err(StorageError::NotFound)
        ));
        assert_eq!(storage.list_links("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cached_active_links_refresh_after_write() {
        let inner = setup_sqlite().await;
        let storage = CachedStorage::new(inner, 100, 300);

        let link = storage.create_link("owner", &new_link("a", Some(0))).await.unwrap();
        assert_eq!(storage.list_active_links("owner").await.unwrap().len(), 1);

        let hide = LinkChanges {
            is_active: Some(false),
            ..LinkChanges::default()
        };
        storage.update_link("owner", link.id, &hide).await.unwrap();

        assert!(
            storage.list_active_links("owner").await.unwrap().is_empty(),
            "deactivated link should disappear from the cached listing"
        );
    }
}
