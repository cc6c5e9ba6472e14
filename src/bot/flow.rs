//! Per-user pending submissions for multi-step ad creation
//!
//! A user with no entry in the cache is idle. Entries expire after a period
//! of inactivity, so abandoned drafts do not accumulate.

use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// A submission waiting for a follow-up action from its author
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingSubmission {
    /// Photo received, waiting for "add description" or "save without description"
    AwaitingCaptionChoice {
        /// Telegram file id of the largest photo size
        file_id: String,
    },
    /// User chose to add a description; the next text message is the caption
    AwaitingCaption {
        /// Telegram file id of the largest photo size
        file_id: String,
    },
    /// Text received, waiting for confirm or cancel
    AwaitingTextConfirm {
        /// Buffered text
        text: String,
    },
}

impl PendingSubmission {
    /// Short noun for the draft, used in discard notices
    #[must_use]
    pub const fn draft_label(&self) -> &'static str {
        match self {
            Self::AwaitingCaptionChoice { .. } | Self::AwaitingCaption { .. } => "photo",
            Self::AwaitingTextConfirm { .. } => "text",
        }
    }
}

/// Owner of every user's in-flight submission
#[derive(Clone)]
pub struct FlowController {
    pending: Cache<i64, PendingSubmission>,
}

impl FlowController {
    /// Creates a controller whose drafts expire after `ttl_secs` of inactivity
    ///
    /// # Examples
    ///
    /// ```
    /// use ads_bot::bot::flow::FlowController;
    ///
    /// let flow = FlowController::new(3600, 10_000);
    /// ```
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let pending = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(Duration::from_secs(ttl_secs))
            .build();
        Self { pending }
    }

    /// Current pending submission, `None` when idle
    pub async fn get(&self, user_id: i64) -> Option<PendingSubmission> {
        self.pending.get(&user_id).await
    }

    /// Whether the user's next text message should be taken as a photo caption
    pub async fn is_awaiting_caption(&self, user_id: i64) -> bool {
        matches!(
            self.get(user_id).await,
            Some(PendingSubmission::AwaitingCaption { .. })
        )
    }

    /// Buffers a received photo. Returns whatever draft it replaced.
    pub async fn begin_photo(
        &self,
        user_id: i64,
        file_id: String,
    ) -> Option<PendingSubmission> {
        self.replace(user_id, PendingSubmission::AwaitingCaptionChoice { file_id })
            .await
    }

    /// Buffers a received text. Returns whatever draft it replaced.
    pub async fn begin_text(&self, user_id: i64, text: String) -> Option<PendingSubmission> {
        self.replace(user_id, PendingSubmission::AwaitingTextConfirm { text })
            .await
    }

    /// Moves a buffered photo into caption collection.
    ///
    /// Returns `false` if there is no buffered photo; the state is left untouched then.
    pub async fn request_caption(&self, user_id: i64) -> bool {
        match self.get(user_id).await {
            Some(
                PendingSubmission::AwaitingCaptionChoice { file_id }
                | PendingSubmission::AwaitingCaption { file_id },
            ) => {
                self.pending
                    .insert(user_id, PendingSubmission::AwaitingCaption { file_id })
                    .await;
                true
            }
            _ => false,
        }
    }

    /// Takes the buffered photo file id, leaving the user idle.
    ///
    /// A non-photo draft is kept in place and `None` is returned.
    pub async fn take_photo(&self, user_id: i64) -> Option<String> {
        match self.get(user_id).await? {
            PendingSubmission::AwaitingCaptionChoice { file_id }
            | PendingSubmission::AwaitingCaption { file_id } => {
                self.pending.invalidate(&user_id).await;
                Some(file_id)
            }
            PendingSubmission::AwaitingTextConfirm { .. } => None,
        }
    }

    /// Takes the buffered text, leaving the user idle.
    ///
    /// A non-text draft is kept in place and `None` is returned.
    pub async fn take_text(&self, user_id: i64) -> Option<String> {
        match self.get(user_id).await? {
            PendingSubmission::AwaitingTextConfirm { text } => {
                self.pending.invalidate(&user_id).await;
                Some(text)
            }
            _ => None,
        }
    }

    /// Drops any pending submission. Returns what was dropped.
    pub async fn clear(&self, user_id: i64) -> Option<PendingSubmission> {
        let dropped = self.get(user_id).await;
        self.pending.invalidate(&user_id).await;
        if let Some(ref draft) = dropped {
            debug!("Discarded pending {} draft of user {}", draft.draft_label(), user_id);
        }
        dropped
    }

    async fn replace(&self, user_id: i64, next: PendingSubmission) -> Option<PendingSubmission> {
        // An expired entry may linger until eviction; `get` never returns it
        let previous = self.get(user_id).await;
        self.pending.insert(user_id, next).await;
        previous
    }

    /// Number of users with a pending submission
    #[must_use]
    pub fn pending_count(&self) -> u64 {
        self.pending.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> FlowController {
        FlowController::new(60, 100)
    }

    #[tokio::test]
    async fn test_new_user_is_idle() {
        let flow = flow();
        assert_eq!(flow.get(1).await, None);
        assert!(!flow.is_awaiting_caption(1).await);
    }

    #[tokio::test]
    async fn test_photo_then_caption() {
        let flow = flow();
        assert_eq!(flow.begin_photo(1, "photo-1".into()).await, None);
        assert!(!flow.is_awaiting_caption(1).await);

        assert!(flow.request_caption(1).await);
        assert!(flow.is_awaiting_caption(1).await);

        assert_eq!(flow.take_photo(1).await.as_deref(), Some("photo-1"));
        assert_eq!(flow.get(1).await, None);
    }

    #[tokio::test]
    async fn test_request_caption_without_photo() {
        let flow = flow();
        assert!(!flow.request_caption(1).await);

        flow.begin_text(1, "hello".into()).await;
        assert!(!flow.request_caption(1).await);
        assert_eq!(
            flow.get(1).await,
            Some(PendingSubmission::AwaitingTextConfirm {
                text: "hello".into()
            })
        );
    }

    #[tokio::test]
    async fn test_take_text_only_matches_text() {
        let flow = flow();
        flow.begin_photo(1, "photo".into()).await;
        assert_eq!(flow.take_text(1).await, None);
        assert!(flow.get(1).await.is_some());

        let replaced = flow.begin_text(1, "sell bike".into()).await;
        assert_eq!(replaced.map(|d| d.draft_label()), Some("photo"));
        assert_eq!(flow.take_text(1).await.as_deref(), Some("sell bike"));
        assert_eq!(flow.take_text(1).await, None);
    }

    #[tokio::test]
    async fn test_clear_reports_dropped_draft() {
        let flow = flow();
        assert_eq!(flow.clear(1).await, None);

        flow.begin_text(1, "draft".into()).await;
        let dropped = flow.clear(1).await;
        assert_eq!(dropped.map(|d| d.draft_label()), Some("text"));
        assert_eq!(flow.get(1).await, None);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let flow = flow();
        flow.begin_photo(1, "a".into()).await;
        flow.begin_text(2, "b".into()).await;

        assert_eq!(flow.take_text(1).await, None);
        assert_eq!(flow.take_photo(2).await, None);
        assert_eq!(flow.take_photo(1).await.as_deref(), Some("a"));
        assert_eq!(flow.take_text(2).await.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_idle_draft_expires() {
        let flow = FlowController::new(1, 100);
        flow.begin_photo(1, "photo".into()).await;
        assert!(flow.request_caption(1).await);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(flow.get(1).await, None);
        assert!(!flow.is_awaiting_caption(1).await);
        assert_eq!(flow.take_photo(1).await, None);
        assert_eq!(flow.begin_text(1, "fresh".into()).await, None);
    }

    #[tokio::test]
    async fn test_pending_count() {
        let flow = flow();
        flow.begin_photo(1, "a".into()).await;
        flow.begin_photo(2, "b".into()).await;
        flow.pending.run_pending_tasks().await;
        assert_eq!(flow.pending_count(), 2);
    }
}
