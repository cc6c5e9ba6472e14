//! Store-facing outcomes of user actions
//!
//! Each function performs one mutation against the [`AdRepository`] (and the
//! flow controller where a draft is involved) and returns the text to show.
//! No Telegram calls happen here.

use crate::bot::flow::{FlowController, PendingSubmission};
use crate::bot::views::{AdsView, DefaultAdsView};
use crate::storage::{AdBody, AdKind, AdRepository, AdStoreError, Advertisement};
use tracing::{error, warn};

/// Text reply for a finished action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTML text to show the user
    pub text: String,
    /// Whether the action took effect
    pub ok: bool,
}

impl Reply {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ok: true,
        }
    }

    fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ok: false,
        }
    }
}

/// Result of a like press
#[derive(Debug, Clone)]
pub struct LikeOutcome {
    /// Alert text
    pub alert: String,
    /// The ad after the like, present only when the like counted
    pub updated: Option<Advertisement>,
}

/// Notice for a draft dropped by an unrelated interaction
#[must_use]
pub fn discard_notice(dropped: Option<&PendingSubmission>) -> Option<String> {
    dropped.map(|draft| DefaultAdsView::draft_discarded(draft.draft_label()))
}

/// Returns the user to idle before a command or menu button runs.
///
/// Yields the discard notice when a draft was pending.
pub async fn reset_flow(flow: &FlowController, user_id: i64) -> Option<String> {
    discard_notice(flow.clear(user_id).await.as_ref())
}

/// Saves the buffered text as a text ad
pub async fn confirm_text(store: &dyn AdRepository, flow: &FlowController, user_id: i64) -> Reply {
    let Some(text) = flow.take_text(user_id).await else {
        warn!("User {} confirmed a text ad with nothing buffered", user_id);
        return Reply::failed(DefaultAdsView::text_not_found());
    };

    match store.add(user_id, AdBody::text(text.clone())).await {
        Ok(_) => Reply::ok(DefaultAdsView::text_ad_created(&text)),
        Err(e) => {
            error!("Failed to save text ad for user {}: {}", user_id, e);
            Reply::failed(DefaultAdsView::save_failed())
        }
    }
}

/// Discards the buffered text
pub async fn cancel_text(flow: &FlowController, user_id: i64) -> Reply {
    if flow.take_text(user_id).await.is_none() {
        warn!("User {} cancelled a text ad with nothing buffered", user_id);
    }
    Reply::ok(DefaultAdsView::text_cancelled())
}

/// Saves the buffered photo, with `caption` when the user supplied one
pub async fn save_photo(
    store: &dyn AdRepository,
    flow: &FlowController,
    user_id: i64,
    caption: Option<String>,
) -> Reply {
    let Some(file_id) = flow.take_photo(user_id).await else {
        warn!("User {} tried to save a photo ad with nothing buffered", user_id);
        return Reply::failed(DefaultAdsView::photo_not_found());
    };

    match store.add(user_id, AdBody::photo(file_id, caption)).await {
        Ok(ad) => Reply::ok(DefaultAdsView::photo_ad_created(ad.body.caption())),
        Err(e) => {
            error!("Failed to save photo ad for user {}: {}", user_id, e);
            Reply::failed(DefaultAdsView::save_failed())
        }
    }
}

/// Saves a single-step audio or voice ad
///
/// Any pending draft is dropped first; the second field carries it so the
/// caller can tell the user.
pub async fn save_media(
    store: &dyn AdRepository,
    flow: &FlowController,
    user_id: i64,
    body: AdBody,
    voice_duration: Option<u32>,
) -> (Reply, Option<&'static str>) {
    let dropped = flow.clear(user_id).await.map(|d| d.draft_label());
    let kind = body.kind();

    let reply = match store.add(user_id, body).await {
        Ok(ad) => match kind {
            AdKind::Voice => Reply::ok(DefaultAdsView::voice_ad_created(voice_duration)),
            _ => Reply::ok(DefaultAdsView::audio_ad_created(ad.body.caption())),
        },
        Err(e) => {
            error!("Failed to save {:?} ad for user {}: {}", kind, user_id, e);
            Reply::failed(DefaultAdsView::save_failed())
        }
    };
    (reply, dropped)
}

/// Records a like; the updated ad is returned for re-rendering
pub async fn like(store: &dyn AdRepository, ad_id: u64, user_id: i64) -> LikeOutcome {
    match store.like(ad_id, user_id).await {
        Ok(total) => LikeOutcome {
            alert: DefaultAdsView::liked(total),
            updated: store.get_by_id(ad_id).await,
        },
        Err(e @ (AdStoreError::NotFound(_) | AdStoreError::AlreadyLiked(_))) => LikeOutcome {
            alert: DefaultAdsView::like_failed(&e.to_string()),
            updated: None,
        },
        Err(e) => {
            error!("Failed to like ad {} for user {}: {}", ad_id, user_id, e);
            LikeOutcome {
                alert: DefaultAdsView::like_failed("Failed to like advertisement"),
                updated: None,
            }
        }
    }
}

/// Deletes an ad on behalf of its owner
///
/// A missing ad and a foreign ad produce the same refusal.
pub async fn delete(store: &dyn AdRepository, ad_id: u64, user_id: i64) -> Reply {
    match store.delete(ad_id, user_id).await {
        Ok(_) => Reply::ok(DefaultAdsView::deleted()),
        Err(AdStoreError::NotFound(_) | AdStoreError::Forbidden { .. }) => {
            Reply::failed(DefaultAdsView::delete_failed())
        }
        Err(e) => {
            error!("Failed to delete ad {} for user {}: {}", ad_id, user_id, e);
            Reply::failed(DefaultAdsView::delete_failed())
        }
    }
}
