//! End-to-end behavior of the JSON file store

use ads_bot::storage::{AdBody, AdRepository, AdStoreError, JsonAdStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Temp file path removed (with any siblings the store created) on drop
struct TempAdsFile {
    path: PathBuf,
}

impl TempAdsFile {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("ads-{}.json", uuid::Uuid::new_v4()));
        Self { path }
    }

    fn siblings(&self) -> Vec<PathBuf> {
        let Some(prefix) = self.path.file_name().and_then(|n| n.to_str()) else {
            return Vec::new();
        };
        std::fs::read_dir(std::env::temp_dir())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| {
                        p.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.starts_with(prefix) && n != prefix)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Drop for TempAdsFile {
    fn drop(&mut self) {
        if self.path.is_dir() {
            let _ = std::fs::remove_dir_all(&self.path);
        } else {
            let _ = std::fs::remove_file(&self.path);
        }
        for sibling in self.siblings() {
            let _ = std::fs::remove_file(sibling);
        }
    }
}

#[tokio::test]
async fn missing_file_loads_empty() {
    let file = TempAdsFile::new();
    let store = JsonAdStore::new(&file.path);

    assert!(store.load().await.is_empty());
    assert_eq!(store.count().await, 0);
    assert!(store.get_by_id(1).await.is_none());
}

#[tokio::test]
async fn ids_follow_count_and_persist() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    let store = JsonAdStore::new(&file.path);

    let first = store.add(10, AdBody::text("Bike for sale")).await?;
    let second = store
        .add(11, AdBody::photo("AgACphoto", Some("Lamp".into())))
        .await?;
    let third = store.add(10, AdBody::voice("AwADvoice", None)).await?;

    assert_eq!((first.id, second.id, third.id), (1, 2, 3));
    assert_eq!(first.likes, 0);
    assert!(first.liked_by.is_empty());

    let reopened = JsonAdStore::new(&file.path);
    let ads = reopened.load().await;
    assert_eq!(ads.len(), 3);
    assert_eq!(ads[1].body.caption(), Some("Lamp"));
    assert_eq!(ads[2].body.file_id(), Some("AwADvoice"));
    Ok(())
}

#[tokio::test]
async fn like_is_counted_once_per_user() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    let store = JsonAdStore::new(&file.path);
    let ad = store.add(1, AdBody::text("x")).await?;

    assert_eq!(store.like(ad.id, 2).await?, 1);
    assert!(matches!(
        store.like(ad.id, 2).await,
        Err(AdStoreError::AlreadyLiked(_))
    ));
    assert_eq!(store.like(ad.id, 3).await?, 2);

    let stored = store.get_by_id(ad.id).await;
    assert_eq!(stored.map(|a| (a.likes, a.liked_by.len())), Some((2, 2)));
    Ok(())
}

#[tokio::test]
async fn like_of_missing_ad_fails() {
    let file = TempAdsFile::new();
    let store = JsonAdStore::new(&file.path);

    assert!(matches!(
        store.like(42, 1).await,
        Err(AdStoreError::NotFound(42))
    ));
}

#[tokio::test]
async fn only_owner_can_delete() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    let store = JsonAdStore::new(&file.path);
    let ad = store.add(1, AdBody::text("mine")).await?;

    assert!(matches!(
        store.delete(ad.id, 2).await,
        Err(AdStoreError::Forbidden { .. })
    ));
    assert_eq!(store.count().await, 1);

    let deleted = store.delete(ad.id, 1).await?;
    assert_eq!(deleted.id, ad.id);
    assert!(store.get_by_id(ad.id).await.is_none());

    assert!(matches!(
        store.delete(ad.id, 1).await,
        Err(AdStoreError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn ids_are_not_reused_after_deleting_newest() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    let store = JsonAdStore::new(&file.path);
    store.add(1, AdBody::text("a")).await?;
    let newest = store.add(1, AdBody::text("b")).await?;

    store.delete(newest.id, 1).await?;
    let next = store.add(1, AdBody::text("c")).await?;

    assert_eq!(next.id, 3);
    Ok(())
}

#[tokio::test]
async fn save_of_loaded_list_is_identity() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    let store = JsonAdStore::new(&file.path);
    store.add(1, AdBody::text("a")).await?;
    let ad = store.add(2, AdBody::audio("CQAC", Some("Title: Song".into()))).await?;
    store.like(ad.id, 1).await?;

    let before = store.load().await;
    store.save(&before).await?;

    assert_eq!(store.load().await, before);
    Ok(())
}

#[tokio::test]
async fn get_by_user_keeps_insertion_order() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    let store = JsonAdStore::new(&file.path);
    store.add(5, AdBody::text("first")).await?;
    store.add(6, AdBody::text("other")).await?;
    store.add(5, AdBody::text("second")).await?;

    let ids: Vec<u64> = store.get_by_user(5).await.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert!(store.get_by_user(7).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn legacy_array_file_loads() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    std::fs::write(
        &file.path,
        r#"[
            {"id": 1, "user_id": 10, "type": "text", "content": "Old ad", "likes": 1, "liked_by": [11]},
            {"id": 2, "user_id": 11, "type": "photo", "file_id": "AgAC", "caption": "", "likes": 0}
        ]"#,
    )?;
    let store = JsonAdStore::new(&file.path);

    let ads = store.load().await;
    assert_eq!(ads.len(), 2);
    assert_eq!(ads[0].likes, 1);
    assert!(ads[1].liked_by.is_empty());
    assert_eq!(ads[1].body.caption(), None);

    let next = store.add(12, AdBody::text("new")).await?;
    assert_eq!(next.id, 3);
    Ok(())
}

#[tokio::test]
async fn corrupt_file_loads_empty_and_is_kept_aside() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    std::fs::write(&file.path, "{ not json")?;
    let store = JsonAdStore::new(&file.path);

    assert!(store.load().await.is_empty());

    store.add(1, AdBody::text("fresh")).await?;
    assert_eq!(store.count().await, 1);

    let quarantined: Vec<PathBuf> = file
        .siblings()
        .into_iter()
        .filter(|p| p.to_string_lossy().contains(".corrupt-"))
        .collect();
    assert_eq!(quarantined.len(), 1);
    assert_eq!(std::fs::read_to_string(&quarantined[0])?, "{ not json");
    Ok(())
}

#[tokio::test]
async fn unreadable_file_is_never_overwritten() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    // A directory cannot be read as a file, whatever the process permissions
    std::fs::create_dir(&file.path)?;
    std::fs::write(file.path.join("marker"), "old precious ad")?;
    let store = JsonAdStore::new(&file.path);

    assert!(store.load().await.is_empty());
    assert!(matches!(
        store.add(99, AdBody::text("new")).await,
        Err(AdStoreError::Io(_))
    ));
    assert!(matches!(store.like(1, 99).await, Err(AdStoreError::Io(_))));

    assert!(file.path.is_dir());
    assert_eq!(
        std::fs::read_to_string(file.path.join("marker"))?,
        "old precious ad"
    );
    assert!(file.siblings().is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_likes_are_all_kept() -> Result<(), AdStoreError> {
    let file = TempAdsFile::new();
    let store = Arc::new(JsonAdStore::new(&file.path));
    let ad_id = store.add(1, AdBody::text("popular")).await?.id;

    let tasks: Vec<_> = (100..120)
        .map(|user| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.like(ad_id, user).await })
        })
        .collect();
    for task in tasks {
        task.await.map_err(std::io::Error::other)??;
    }

    let stored = store.get_by_id(ad_id).await;
    assert_eq!(stored.map(|a| a.likes), Some(20));
    Ok(())
}
