use crate::bot::actions;
use crate::bot::flow::{FlowController, PendingSubmission};
use crate::bot::listing::send_ads_page;
use crate::bot::views::{
    confirm_text_keyboard, main_menu_keyboard, photo_description_keyboard, AdsView,
    DefaultAdsView,
};
use crate::config::Settings;
use crate::storage::{AdBody, AdRepository};
use crate::utils::log_preview;
use anyhow::Result;
use std::sync::Arc;
use teloxide::{prelude::*, types::ParseMode, utils::command::BotCommands};
use tracing::{info, warn};

// Helper function to get user name from Message
fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        // first_name is String, not Option<String>
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message and main menu
    #[command(description = "Start the bot and show main menu.")]
    Start,
    /// Show usage help
    #[command(description = "Get help and instructions.")]
    Help,
    /// Explain how to create an advertisement
    #[command(description = "Create a new advertisement.")]
    Add,
    /// Browse advertisements
    #[command(description = "Browse all advertisements.")]
    List,
}

/// Whether a text message is addressed to the bot as a command.
///
/// Such text is never buffered as ad content or taken as a photo description.
#[must_use]
pub fn is_command_text(text: &str) -> bool {
    text.starts_with('/')
}

/// Caption stored for an audio ad, built from the track metadata
#[must_use]
pub fn audio_caption(title: Option<&str>, performer: Option<&str>) -> Option<String> {
    let parts: Vec<String> = [
        title.map(|t| format!("Title: {t}")),
        performer.map(|p| format!("Artist: {p}")),
    ]
    .into_iter()
    .flatten()
    .collect();

    (!parts.is_empty()).then(|| parts.join(" | "))
}

/// Caption stored for a voice ad
#[must_use]
pub fn voice_caption(duration_secs: u32) -> String {
    if duration_secs > 0 {
        format!("Voice message ({duration_secs}s)")
    } else {
        "Voice message".to_string()
    }
}

async fn send_html(bot: &Bot, msg: &Message, text: impl Into<String>) -> Result<()> {
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Tells the user a draft was dropped by an unrelated interaction
///
/// # Errors
///
/// Returns an error if the notice cannot be sent.
pub async fn notify_discarded(bot: &Bot, chat_id: ChatId, notice: Option<String>) -> Result<()> {
    if let Some(text) = notice {
        bot.send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .await?;
    }
    Ok(())
}

/// Handle /start command
///
/// # Errors
///
/// Returns an error if the greeting cannot be sent.
pub async fn start(
    bot: Bot,
    msg: Message,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let notice = actions::reset_flow(&flow, user_id).await;
    notify_discarded(&bot, msg.chat.id, notice).await?;

    let username = msg.from.as_ref().and_then(|u| u.username.as_deref());
    let own_ads = store.get_by_user(user_id).await.len();
    info!(
        "User {} ({}) started the bot, owns {} ads ({} drafts pending overall)",
        user_id,
        get_user_name(&msg),
        own_ads,
        flow.pending_count()
    );

    let mut text = DefaultAdsView::welcome_message(username);
    if own_ads > 0 {
        text.push_str("\n\n");
        text.push_str(&DefaultAdsView::own_ads_summary(own_ads));
    }

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(main_menu_keyboard())
        .await?;
    Ok(())
}

/// Handle /help command
///
/// # Errors
///
/// Returns an error if the help text cannot be sent.
pub async fn help(bot: Bot, msg: Message, flow: Arc<FlowController>) -> Result<()> {
    let notice = actions::reset_flow(&flow, get_user_id_safe(&msg)).await;
    notify_discarded(&bot, msg.chat.id, notice).await?;

    bot.send_message(msg.chat.id, DefaultAdsView::help_message())
        .parse_mode(ParseMode::Html)
        .reply_markup(main_menu_keyboard())
        .await?;
    Ok(())
}

/// Handle /add command
///
/// # Errors
///
/// Returns an error if the instructions cannot be sent.
pub async fn add(bot: Bot, msg: Message, flow: Arc<FlowController>) -> Result<()> {
    let notice = actions::reset_flow(&flow, get_user_id_safe(&msg)).await;
    notify_discarded(&bot, msg.chat.id, notice).await?;

    bot.send_message(msg.chat.id, DefaultAdsView::add_instructions())
        .parse_mode(ParseMode::Html)
        .reply_markup(main_menu_keyboard())
        .await?;
    Ok(())
}

/// Handle /list command: first page of the listing
///
/// # Errors
///
/// Returns an error if the page cannot be sent.
pub async fn list(
    bot: Bot,
    msg: Message,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
    settings: Arc<Settings>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let notice = actions::reset_flow(&flow, user_id).await;
    notify_discarded(&bot, msg.chat.id, notice).await?;

    send_ads_page(
        &bot,
        msg.chat.id,
        store.as_ref(),
        user_id,
        1,
        settings.ads_per_page,
    )
    .await
}

/// Buffers a text message and asks whether to save it as an ad
///
/// # Errors
///
/// Returns an error if the confirmation prompt cannot be sent.
pub async fn handle_text(bot: Bot, msg: Message, flow: Arc<FlowController>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let text = msg.text().unwrap_or_default().to_string();
    info!(
        "User {} ({}) sent text: {}",
        user_id,
        get_user_name(&msg),
        log_preview(&text)
    );

    let replaced = flow.begin_text(user_id, text.clone()).await;
    // A newer text supersedes the previous one without a notice
    let dropped = replaced.filter(|d| !matches!(d, PendingSubmission::AwaitingTextConfirm { .. }));
    notify_discarded(&bot, msg.chat.id, actions::discard_notice(dropped.as_ref())).await?;

    bot.send_message(msg.chat.id, DefaultAdsView::text_received(&text))
        .parse_mode(ParseMode::Html)
        .reply_markup(confirm_text_keyboard())
        .await?;
    Ok(())
}

/// Slash-prefixed text that no command matched
///
/// # Errors
///
/// Returns an error if the hint cannot be sent.
pub async fn handle_unknown_command(bot: Bot, msg: Message) -> Result<()> {
    warn!(
        "Unknown command from user {}: {}",
        get_user_id_safe(&msg),
        log_preview(msg.text().unwrap_or_default())
    );
    send_html(&bot, &msg, DefaultAdsView::unknown_command()).await
}

/// Next message of a user who chose to describe their photo
///
/// Text becomes the caption and the photo ad is saved; anything else is
/// answered with a reminder and the draft is kept.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_caption_input(
    bot: Bot,
    msg: Message,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let Some(caption) = msg.text() else {
        return send_html(&bot, &msg, DefaultAdsView::caption_requires_text()).await;
    };
    info!(
        "User {} described their photo: {}",
        user_id,
        log_preview(caption)
    );

    let reply = actions::save_photo(store.as_ref(), &flow, user_id, Some(caption.to_string())).await;
    let mut req = bot
        .send_message(msg.chat.id, reply.text)
        .parse_mode(ParseMode::Html);
    if reply.ok {
        req = req.reply_markup(main_menu_keyboard());
    }
    req.await?;
    Ok(())
}

/// Buffers the largest size of a received photo and offers a description
///
/// # Errors
///
/// Returns an error if the prompt cannot be sent.
pub async fn handle_photo(bot: Bot, msg: Message, flow: Arc<FlowController>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let Some(photo) = msg.photo().and_then(<[_]>::last) else {
        return Ok(());
    };
    let file_id = photo.file.id.to_string();
    info!(
        "User {} ({}) sent a photo",
        user_id,
        get_user_name(&msg)
    );

    let replaced = flow.begin_photo(user_id, file_id).await;
    let dropped = replaced.filter(|d| !matches!(d, PendingSubmission::AwaitingCaptionChoice { .. }));
    notify_discarded(&bot, msg.chat.id, actions::discard_notice(dropped.as_ref())).await?;

    bot.send_message(msg.chat.id, DefaultAdsView::photo_received(msg.caption()))
        .parse_mode(ParseMode::Html)
        .reply_markup(photo_description_keyboard())
        .await?;
    Ok(())
}

/// Saves an audio file as an ad right away
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_audio(
    bot: Bot,
    msg: Message,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let Some(audio) = msg.audio() else {
        return Ok(());
    };
    info!("User {} ({}) sent audio", user_id, get_user_name(&msg));

    let caption = audio_caption(audio.title.as_deref(), audio.performer.as_deref());
    let body = AdBody::audio(audio.file.id.to_string(), caption);
    let (reply, dropped) = actions::save_media(store.as_ref(), &flow, user_id, body, None).await;
    send_media_reply(&bot, &msg, reply, dropped).await
}

/// Saves a voice message as an ad right away
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_voice(
    bot: Bot,
    msg: Message,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let Some(voice) = msg.voice() else {
        return Ok(());
    };
    info!("User {} ({}) sent a voice message", user_id, get_user_name(&msg));

    let duration = voice.duration.seconds();
    let body = AdBody::voice(voice.file.id.to_string(), Some(voice_caption(duration)));
    let (reply, dropped) =
        actions::save_media(store.as_ref(), &flow, user_id, body, Some(duration)).await;
    send_media_reply(&bot, &msg, reply, dropped).await
}

async fn send_media_reply(
    bot: &Bot,
    msg: &Message,
    reply: actions::Reply,
    dropped: Option<&'static str>,
) -> Result<()> {
    let mut text = reply.text;
    if let Some(label) = dropped {
        text = format!("{}\n\n{text}", DefaultAdsView::draft_discarded(label));
    }
    let mut req = bot
        .send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html);
    if reply.ok {
        req = req.reply_markup(main_menu_keyboard());
    }
    req.await?;
    Ok(())
}

/// Documents cannot become ads
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_document(bot: Bot, msg: Message) -> Result<()> {
    info!(
        "User {} sent a document, rejecting",
        get_user_id_safe(&msg)
    );
    send_html(&bot, &msg, DefaultAdsView::document_rejected()).await
}

/// Any message kind without a dedicated handler
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_unsupported(bot: Bot, msg: Message) -> Result<()> {
    info!(
        "User {} sent an unsupported message",
        get_user_id_safe(&msg)
    );
    send_html(&bot, &msg, DefaultAdsView::unsupported_message()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_caption_from_metadata() {
        assert_eq!(
            audio_caption(Some("Song"), Some("Band")).as_deref(),
            Some("Title: Song | Artist: Band")
        );
        assert_eq!(audio_caption(Some("Song"), None).as_deref(), Some("Title: Song"));
        assert_eq!(audio_caption(None, Some("Band")).as_deref(), Some("Artist: Band"));
        assert_eq!(audio_caption(None, None), None);
    }

    #[test]
    fn test_command_text_detection() {
        assert!(is_command_text("/foo"));
        assert!(is_command_text("/list@ads_bot"));
        assert!(!is_command_text("Lamp in good condition"));
        assert!(!is_command_text(" /not-a-command"));
        assert!(!is_command_text(""));
    }

    #[test]
    fn test_voice_caption() {
        assert_eq!(voice_caption(4), "Voice message (4s)");
        assert_eq!(voice_caption(0), "Voice message");
    }

    #[test]
    fn test_command_descriptions_cover_menu() {
        let text = Command::descriptions().to_string();
        for command in ["/start", "/help", "/add", "/list"] {
            assert!(text.contains(command), "{command} missing from {text}");
        }
    }
}
