//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Sends are retried on transient network failures using exponential backoff
//! with jitter. Edits degrade gracefully: expected "not modified" / "not found"
//! errors are swallowed and reported as `false`.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, Message, MessageId, ParseMode};
use tracing::{debug, warn};

const ERROR_NOT_MODIFIED: &str = "message is not modified";
const ERROR_NOT_FOUND: &str = "message to edit not found";

/// Send an HTML message with automatic retry on network failures.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
///
/// # Examples
///
/// ```ignore
/// let msg = send_html_resilient(&bot, chat_id, "📑 Navigation:", Some(keyboard)).await?;
/// ```
pub async fn send_html_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<Message> {
    let text = text.into();
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot
            .send_message(chat_id, text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(ref kb) = markup {
            req = req.reply_markup(kb.clone());
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

fn log_edit_failure(err: &teloxide::RequestError) {
    let err_msg = err.to_string();
    if err_msg.contains(ERROR_NOT_MODIFIED) || err_msg.contains(ERROR_NOT_FOUND) {
        debug!("Message update skipped: {err_msg}");
    } else {
        warn!("Failed to edit message: {err}");
    }
}

/// Edit a text message in place (HTML).
///
/// Returns `false` if the edit was skipped or failed.
pub async fn edit_text_safe(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
    markup: Option<InlineKeyboardMarkup>,
) -> bool {
    let mut req = bot
        .edit_message_text(chat_id, msg_id, text)
        .parse_mode(ParseMode::Html);
    if let Some(kb) = markup {
        req = req.reply_markup(kb);
    }
    match req.await {
        Ok(_) => true,
        Err(e) => {
            log_edit_failure(&e);
            false
        }
    }
}

/// Edit the caption of a media message in place (HTML).
///
/// Returns `false` if the edit was skipped or failed.
pub async fn edit_caption_safe(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    caption: impl Into<String>,
    markup: Option<InlineKeyboardMarkup>,
) -> bool {
    let mut req = bot
        .edit_message_caption(chat_id, msg_id)
        .caption(caption)
        .parse_mode(ParseMode::Html);
    if let Some(kb) = markup {
        req = req.reply_markup(kb);
    }
    match req.await {
        Ok(_) => true,
        Err(e) => {
            log_edit_failure(&e);
            false
        }
    }
}
