//! Storage layer for advertisements
//!
//! The whole collection lives in one JSON file and every mutation is a
//! load-modify-save cycle. Cycles are serialized behind a single writer lock,
//! so concurrent handlers cannot overwrite each other's changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Errors that can occur during storage operations
///
/// The `Display` strings of the first three variants are shown to users as-is.
#[derive(Error, Debug)]
pub enum AdStoreError {
    /// No advertisement with this id
    #[error("Advertisement not found")]
    NotFound(u64),
    /// The acting user does not own the advertisement
    #[error("You can only delete your own ads")]
    Forbidden {
        /// Advertisement id
        ad_id: u64,
        /// User who attempted the action
        user_id: i64,
    },
    /// The user has already liked this advertisement
    #[error("You already liked this advertisement")]
    AlreadyLiked(u64),
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Kind of advertisement, mirrors the `type` field of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdKind {
    /// Plain text
    Text,
    /// Photo with optional caption
    Photo,
    /// Audio file
    Audio,
    /// Voice message
    Voice,
}

impl AdKind {
    /// Upper-case label used in rendered ad headers
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Photo => "PHOTO",
            Self::Audio => "AUDIO",
            Self::Voice => "VOICE",
        }
    }
}

/// Type-specific payload of an advertisement
///
/// Serialized with an internal `type` tag so that records keep the flat
/// `{type, content?, file_id?, caption?}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AdBody {
    /// Text advertisement
    Text {
        /// Text content
        content: String,
    },
    /// Photo advertisement
    Photo {
        /// Telegram file id
        file_id: String,
        /// Optional description
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    /// Audio advertisement
    Audio {
        /// Telegram file id
        file_id: String,
        /// Optional track info
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    /// Voice advertisement
    Voice {
        /// Telegram file id
        file_id: String,
        /// Optional duration info
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

fn non_empty(caption: Option<String>) -> Option<String> {
    caption.filter(|c| !c.trim().is_empty())
}

impl AdBody {
    /// Text body
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Photo body; blank captions are dropped
    #[must_use]
    pub fn photo(file_id: impl Into<String>, caption: Option<String>) -> Self {
        Self::Photo {
            file_id: file_id.into(),
            caption: non_empty(caption),
        }
    }

    /// Audio body; blank captions are dropped
    #[must_use]
    pub fn audio(file_id: impl Into<String>, caption: Option<String>) -> Self {
        Self::Audio {
            file_id: file_id.into(),
            caption: non_empty(caption),
        }
    }

    /// Voice body; blank captions are dropped
    #[must_use]
    pub fn voice(file_id: impl Into<String>, caption: Option<String>) -> Self {
        Self::Voice {
            file_id: file_id.into(),
            caption: non_empty(caption),
        }
    }

    /// Kind of this body
    #[must_use]
    pub const fn kind(&self) -> AdKind {
        match self {
            Self::Text { .. } => AdKind::Text,
            Self::Photo { .. } => AdKind::Photo,
            Self::Audio { .. } => AdKind::Audio,
            Self::Voice { .. } => AdKind::Voice,
        }
    }

    /// Media file id, `None` for text
    #[must_use]
    pub fn file_id(&self) -> Option<&str> {
        match self {
            Self::Text { .. } => None,
            Self::Photo { file_id, .. } | Self::Audio { file_id, .. } | Self::Voice { file_id, .. } => {
                Some(file_id)
            }
        }
    }

    /// Media caption, `None` for text or when absent
    #[must_use]
    pub fn caption(&self) -> Option<&str> {
        match self {
            Self::Text { .. } => None,
            Self::Photo { caption, .. } | Self::Audio { caption, .. } | Self::Voice { caption, .. } => {
                caption.as_deref()
            }
        }
    }
}

/// A stored advertisement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    /// Unique id, never reused
    pub id: u64,
    /// Owner
    pub user_id: i64,
    /// Type-specific payload
    #[serde(flatten)]
    pub body: AdBody,
    /// Number of likes, always `liked_by.len()`
    #[serde(default)]
    pub likes: usize,
    /// Users who liked this advertisement
    #[serde(default)]
    pub liked_by: BTreeSet<i64>,
}

impl Advertisement {
    /// Create a fresh advertisement with no likes
    #[must_use]
    pub fn new(id: u64, user_id: i64, body: AdBody) -> Self {
        Self {
            id,
            user_id,
            body,
            likes: 0,
            liked_by: BTreeSet::new(),
        }
    }

    /// Kind of this advertisement
    #[must_use]
    pub const fn kind(&self) -> AdKind {
        self.body.kind()
    }

    /// Whether `user_id` owns this advertisement
    #[must_use]
    pub const fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    /// Records a like. Returns `false` if the user already liked it.
    pub fn record_like(&mut self, user_id: i64) -> bool {
        let inserted = self.liked_by.insert(user_id);
        self.sync_likes();
        inserted
    }

    fn sync_likes(&mut self) {
        self.likes = self.liked_by.len();
    }
}

/// On-disk document: the records plus the id high-water mark
#[derive(Debug, Default, Serialize, Deserialize)]
struct AdLedger {
    next_id: u64,
    ads: Vec<Advertisement>,
}

/// Either the current document shape or a bare array written by older versions
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredAds {
    Legacy(Vec<Advertisement>),
    Ledger(AdLedger),
}

impl AdLedger {
    fn from_stored(stored: StoredAds) -> Self {
        let mut ledger = match stored {
            StoredAds::Legacy(ads) => Self { next_id: 0, ads },
            StoredAds::Ledger(ledger) => ledger,
        };
        ledger.normalize();
        ledger
    }

    /// Restores the invariants that a hand-edited or legacy file may break
    fn normalize(&mut self) {
        for ad in &mut self.ads {
            ad.sync_likes();
            if let AdBody::Photo { caption, .. }
            | AdBody::Audio { caption, .. }
            | AdBody::Voice { caption, .. } = &mut ad.body
            {
                *caption = non_empty(caption.take());
            }
        }
        let after_max = self.ads.iter().map(|ad| ad.id).max().unwrap_or(0) + 1;
        self.next_id = self.next_id.max(after_max);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn find_mut(&mut self, ad_id: u64) -> Option<&mut Advertisement> {
        self.ads.iter_mut().find(|ad| ad.id == ad_id)
    }
}

/// Interface for advertisement storage providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdRepository: Send + Sync {
    /// All advertisements in insertion order. Unreadable state yields an empty list.
    async fn load(&self) -> Vec<Advertisement>;
    /// Replace the whole collection
    async fn save(&self, ads: &[Advertisement]) -> Result<(), AdStoreError>;
    /// Append a new advertisement owned by `user_id`
    async fn add(&self, user_id: i64, body: AdBody) -> Result<Advertisement, AdStoreError>;
    /// Delete an advertisement owned by `user_id`
    async fn delete(&self, ad_id: u64, user_id: i64) -> Result<Advertisement, AdStoreError>;
    /// Like an advertisement, returns the new like count
    async fn like(&self, ad_id: u64, user_id: i64) -> Result<usize, AdStoreError>;
    /// Find an advertisement by id
    async fn get_by_id(&self, ad_id: u64) -> Option<Advertisement>;
    /// All advertisements owned by `user_id`, in insertion order
    async fn get_by_user(&self, user_id: i64) -> Vec<Advertisement>;
    /// Number of stored advertisements
    async fn count(&self) -> usize;
}

/// JSON file backed storage implementation
pub struct JsonAdStore {
    path: PathBuf,
    /// Single-writer point for every read and load-modify-save cycle
    lock: Mutex<()>,
}

impl JsonAdStore {
    /// Create a store over `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the ledger. The flag is `true` when the file exists but is corrupt.
    ///
    /// A file that exists but cannot be read is an error, never an empty ledger.
    /// Caller must hold `self.lock`.
    async fn read_ledger(&self) -> Result<(AdLedger, bool), AdStoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("File {} not found, starting with an empty list", self.path.display());
                return Ok((AdLedger::from_stored(StoredAds::Legacy(Vec::new())), false));
            }
            Err(e) => {
                error!("Error reading ads from {}: {}", self.path.display(), e);
                return Err(e.into());
            }
        };

        match serde_json::from_slice::<StoredAds>(&bytes) {
            Ok(stored) => {
                let ledger = AdLedger::from_stored(stored);
                info!("Loaded {} ads from {}", ledger.ads.len(), self.path.display());
                Ok((ledger, false))
            }
            Err(e) => {
                error!("Error parsing ads from {}: {}", self.path.display(), e);
                Ok((AdLedger::from_stored(StoredAds::Legacy(Vec::new())), true))
            }
        }
    }

    /// Writes the ledger through a sibling temp file and a rename.
    ///
    /// Caller must hold `self.lock`.
    async fn write_ledger(&self, ledger: &AdLedger) -> Result<(), AdStoreError> {
        let body = serde_json::to_vec_pretty(ledger)?;
        let tmp_path = self.sibling_path(&format!("{}.tmp", uuid::Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&tmp_path, &body).await {
            error!("Error saving ads to {}: {}", tmp_path.display(), e);
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            error!("Error replacing {}: {}", self.path.display(), e);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        info!("Saved {} ads to {}", ledger.ads.len(), self.path.display());
        Ok(())
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Moves a corrupt file aside so the next save does not destroy it
    async fn quarantine_corrupt(&self) {
        let target = self.sibling_path(&format!("corrupt-{}", uuid::Uuid::new_v4()));
        match tokio::fs::rename(&self.path, &target).await {
            Ok(()) => warn!(
                "Corrupt ads file moved to {} before overwrite",
                target.display()
            ),
            Err(e) => error!("Failed to move corrupt ads file aside: {}", e),
        }
    }

    /// Runs one load-modify-save cycle under the writer lock.
    ///
    /// Nothing is written if the file cannot be read or `modifier` fails.
    async fn modify<F, T>(&self, modifier: F) -> Result<T, AdStoreError>
    where
        F: FnOnce(&mut AdLedger) -> Result<T, AdStoreError>,
    {
        let _guard = self.lock.lock().await;
        let (mut ledger, corrupt) = self.read_ledger().await?;
        let value = modifier(&mut ledger)?;
        if corrupt {
            self.quarantine_corrupt().await;
        }
        self.write_ledger(&ledger).await?;
        Ok(value)
    }

    async fn snapshot(&self) -> Vec<Advertisement> {
        let _guard = self.lock.lock().await;
        self.read_ledger()
            .await
            .map(|(ledger, _)| ledger.ads)
            .unwrap_or_default()
    }
}

#[async_trait]
impl AdRepository for JsonAdStore {
    async fn load(&self) -> Vec<Advertisement> {
        self.snapshot().await
    }

    async fn save(&self, ads: &[Advertisement]) -> Result<(), AdStoreError> {
        self.modify(|ledger| {
            ledger.ads = ads.to_vec();
            ledger.normalize();
            Ok(())
        })
        .await
    }

    async fn add(&self, user_id: i64, body: AdBody) -> Result<Advertisement, AdStoreError> {
        let kind = body.kind();
        let ad = self
            .modify(|ledger| {
                let ad = Advertisement::new(ledger.allocate_id(), user_id, body);
                ledger.ads.push(ad.clone());
                Ok(ad)
            })
            .await?;
        info!("Added new {:?} ad {} for user {}", kind, ad.id, user_id);
        Ok(ad)
    }

    async fn delete(&self, ad_id: u64, user_id: i64) -> Result<Advertisement, AdStoreError> {
        let result = self
            .modify(|ledger| {
                let index = ledger
                    .ads
                    .iter()
                    .position(|ad| ad.id == ad_id)
                    .ok_or(AdStoreError::NotFound(ad_id))?;
                if !ledger.ads[index].is_owned_by(user_id) {
                    return Err(AdStoreError::Forbidden { ad_id, user_id });
                }
                Ok(ledger.ads.remove(index))
            })
            .await;

        match &result {
            Ok(_) => info!("Deleted ad {} by user {}", ad_id, user_id),
            Err(AdStoreError::NotFound(_) | AdStoreError::Forbidden { .. }) => {
                warn!("Ad {} not found or user {} is not the owner", ad_id, user_id);
            }
            Err(_) => {}
        }
        result
    }

    async fn like(&self, ad_id: u64, user_id: i64) -> Result<usize, AdStoreError> {
        let result = self
            .modify(|ledger| {
                let ad = ledger.find_mut(ad_id).ok_or(AdStoreError::NotFound(ad_id))?;
                if !ad.record_like(user_id) {
                    return Err(AdStoreError::AlreadyLiked(ad_id));
                }
                Ok(ad.likes)
            })
            .await;

        match &result {
            Ok(likes) => info!("User {} liked ad {}, total likes: {}", user_id, ad_id, likes),
            Err(AdStoreError::NotFound(_)) => warn!("Ad {} not found for liking", ad_id),
            Err(AdStoreError::AlreadyLiked(_)) => {
                info!("User {} already liked ad {}", user_id, ad_id);
            }
            Err(_) => {}
        }
        result
    }

    async fn get_by_id(&self, ad_id: u64) -> Option<Advertisement> {
        self.snapshot().await.into_iter().find(|ad| ad.id == ad_id)
    }

    async fn get_by_user(&self, user_id: i64) -> Vec<Advertisement> {
        let ads: Vec<Advertisement> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|ad| ad.is_owned_by(user_id))
            .collect();
        info!("Found {} ads for user {}", ads.len(), user_id);
        ads
    }

    async fn count(&self) -> usize {
        self.snapshot().await.len()
    }
}
