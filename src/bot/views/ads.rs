//! Advertisement UI components
//!
//! Contains keyboards, text messages, and formatters for the ads board.

use crate::bot::callbacks::CallbackAction;
use crate::config::{MEDIA_CAPTION_MAX_CHARS, MESSAGE_TEXT_MAX_CHARS};
use crate::pagination::Page;
use crate::storage::{AdBody, Advertisement};
use crate::utils::truncate_str;
use html_escape::encode_text;
use lazy_regex::lazy_regex;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Match the list position in an ad header: `#3 |`
static RE_BLOCK_NUMBER: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"#(\d+) \|");

/// Match the like counter in an ad header: `❤️ 12`
static RE_LIKE_COUNTER: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"❤️ \d+");

// ─────────────────────────────────────────────────────────────────────────────
// Trait definition
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for ads board view rendering
///
/// Provides all text messages shown to users. Messages are HTML and any
/// user-supplied text is escaped before being embedded.
pub trait AdsView {
    /// Greeting for `/start`
    fn welcome_message(username: Option<&str>) -> String;

    /// Line appended to the greeting for users who already posted
    fn own_ads_summary(count: usize) -> String;

    /// Help text for `/help` and the help button
    fn help_message() -> &'static str;

    /// Instructions for `/add` and the create button
    fn add_instructions() -> &'static str;

    /// Main menu prompt
    fn main_menu() -> &'static str;

    /// Shown by `/list` when the board is empty
    fn no_ads() -> &'static str;

    /// First message of a listing page
    fn page_header(page: usize, total_pages: usize, total: usize) -> String;

    /// Text above the navigation keyboard
    fn navigation_prompt() -> &'static str;

    /// Temporary text of the navigation message while the next page loads
    fn page_loading() -> &'static str;

    /// Alert for the non-actionable page indicator
    fn current_page_notice() -> &'static str;

    /// Asks whether received text should become an ad
    fn text_received(text: &str) -> String;

    /// Text ad saved
    fn text_ad_created(content: &str) -> String;

    /// Text ad discarded by the user
    fn text_cancelled() -> &'static str;

    /// Confirm pressed with nothing buffered
    fn text_not_found() -> &'static str;

    /// Asks whether to add a description to a received photo
    fn photo_received(caption: Option<&str>) -> String;

    /// Prompt for the photo description
    fn photo_description_prompt() -> &'static str;

    /// Photo ad saved
    fn photo_ad_created(caption: Option<&str>) -> String;

    /// Photo follow-up with nothing buffered
    fn photo_not_found() -> &'static str;

    /// Non-text message while a description is expected
    fn caption_requires_text() -> &'static str;

    /// Audio ad saved
    fn audio_ad_created(info: Option<&str>) -> String;

    /// Voice ad saved
    fn voice_ad_created(duration_secs: Option<u32>) -> String;

    /// Storage failed to save a new ad
    fn save_failed() -> &'static str;

    /// Documents are not accepted
    fn document_rejected() -> &'static str;

    /// Any other message kind
    fn unsupported_message() -> &'static str;

    /// Slash-prefixed text that is not a known command
    fn unknown_command() -> &'static str;

    /// Notice that an in-flight draft was dropped
    fn draft_discarded(draft_label: &str) -> String;

    /// Alert after a successful like
    fn liked(total_likes: usize) -> String;

    /// Alert after a failed like
    fn like_failed(reason: &str) -> String;

    /// Alert after a successful delete
    fn deleted() -> &'static str;

    /// Alert after a refused delete
    fn delete_failed() -> &'static str;

    /// Replacement text when the ad message cannot be deleted
    fn deleted_placeholder() -> &'static str;

    /// Fallback block when a media ad cannot be sent
    fn ad_load_failed(number: usize, ad: &Advertisement) -> String;

    /// Alert for tokens the bot does not know
    fn unknown_action() -> &'static str;
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Default English implementation of `AdsView`
pub struct DefaultAdsView;

impl AdsView for DefaultAdsView {
    fn welcome_message(username: Option<&str>) -> String {
        let greeting = username.map_or_else(
            || "Hello! 👋".to_string(),
            |name| format!("Hello, <b>{}</b>! 👋", encode_text(name)),
        );
        format!(
            "{greeting}\n\n\
             Welcome to the Ads Bot! 📱\n\
             Here you can create and browse advertisements.\n\n\
             Use the menu below to get started:"
        )
    }

    fn own_ads_summary(count: usize) -> String {
        let noun = if count == 1 { "advertisement" } else { "advertisements" };
        format!("You have <b>{count}</b> {noun} on the board.")
    }

    fn help_message() -> &'static str {
        "📱 <b>Ads Bot - Help</b>\n\n\
         🔹 <b>Available commands:</b>\n\
         /start - Start the bot and show main menu\n\
         /help - Show this help message\n\
         /add - Create a new advertisement\n\
         /list - Show all saved advertisements\n\n\
         🔹 <b>How to use:</b>\n\
         • Use menu buttons for easy navigation\n\
         • Send text to create text ads\n\
         • Send photos to create photo ads\n\
         • Send audio/voice to create audio ads\n\
         • Like ads you enjoy ❤️\n\
         • Delete your own ads 🗑\n\n\
         🔹 <b>Supported media:</b>\n\
         • Text messages\n\
         • Photos with optional captions\n\
         • Audio files\n\
         • Voice messages\n\n\
         💡 <b>Tip:</b> All ads are automatically saved and can be viewed by all users!"
    }

    fn add_instructions() -> &'static str {
        "📝 <b>Create New Advertisement</b>\n\n\
         You can create different types of ads:\n\n\
         🔸 <b>Text Ad:</b> Just send me any text message\n\
         🔸 <b>Photo Ad:</b> Send a photo (with optional description)\n\
         🔸 <b>Audio Ad:</b> Send an audio file or voice message\n\n\
         💡 <b>What to do next:</b>\n\
         Simply send me the content you want to turn into an advertisement!\n\
         I'll guide you through the process."
    }

    fn main_menu() -> &'static str {
        "🏠 <b>Main Menu</b>\n\nChoose an action from the buttons below:"
    }

    fn no_ads() -> &'static str {
        "📋 <b>No Advertisements Found</b>\n\n\
         There are no advertisements yet. Be the first to create one!"
    }

    fn page_header(page: usize, total_pages: usize, total: usize) -> String {
        format!(
            "📋 <b>Advertisements</b>\nPage {page}/{total_pages} | Total: {total}\n{}",
            "=".repeat(30)
        )
    }

    fn navigation_prompt() -> &'static str {
        "📑 Navigation:"
    }

    fn page_loading() -> &'static str {
        "Loading..."
    }

    fn current_page_notice() -> &'static str {
        "You are currently viewing this page"
    }

    fn text_received(text: &str) -> String {
        format!(
            "📝 <b>Text Message Received</b>\n\n\
             <b>Your text:</b>\n{}\n\n\
             Do you want to save this as a text advertisement?",
            encode_text(text)
        )
    }

    fn text_ad_created(content: &str) -> String {
        format!(
            "✅ <b>Text Advertisement Created!</b>\n\n\
             Your text ad has been saved successfully!\n\n\
             <b>Content:</b> {}",
            encode_text(content)
        )
    }

    fn text_cancelled() -> &'static str {
        "❌ <b>Cancelled</b>\n\nText advertisement was not saved."
    }

    fn text_not_found() -> &'static str {
        "❌ <b>Error</b>\n\nText content not found. Please try again."
    }

    fn photo_received(caption: Option<&str>) -> String {
        let current = caption.map_or_else(String::new, |c| {
            format!("\n\n<b>Current caption:</b> {}", encode_text(c))
        });
        format!(
            "📸 <b>Photo Received</b>{current}\n\n\
             Would you like to add a description to your photo advertisement?"
        )
    }

    fn photo_description_prompt() -> &'static str {
        "📝 <b>Add Photo Description</b>\n\n\
         Send me a text description for your photo advertisement:"
    }

    fn photo_ad_created(caption: Option<&str>) -> String {
        match caption {
            Some(c) => format!(
                "✅ <b>Photo Advertisement Created!</b>\n\n\
                 Your photo ad with description has been saved successfully!\n\n\
                 <b>Description:</b> {}",
                encode_text(c)
            ),
            None => "✅ <b>Photo Advertisement Created!</b>\n\n\
                     Your photo ad has been saved successfully!"
                .to_string(),
        }
    }

    fn photo_not_found() -> &'static str {
        "❌ <b>Error</b>\n\nPhoto not found. Please try again."
    }

    fn caption_requires_text() -> &'static str {
        "Please send a text description for your photo."
    }

    fn audio_ad_created(info: Option<&str>) -> String {
        let info = info.map_or_else(String::new, |i| format!("\n<b>Info:</b> {}", encode_text(i)));
        format!(
            "🎶 <b>Audio Advertisement Added!</b>\n\n\
             Your audio file has been saved as an advertisement!{info}"
        )
    }

    fn voice_ad_created(duration_secs: Option<u32>) -> String {
        let duration = duration_secs
            .filter(|d| *d > 0)
            .map_or_else(String::new, |d| format!("\n<b>Duration:</b> {d}s"));
        format!(
            "🎙️ <b>Voice Advertisement Added!</b>\n\n\
             Your voice message has been saved as an advertisement!{duration}"
        )
    }

    fn save_failed() -> &'static str {
        "❌ <b>Error</b>\n\nFailed to save your advertisement. Please try again."
    }

    fn document_rejected() -> &'static str {
        "📄 <b>Document Received</b>\n\n\
         Sorry, documents are not supported for advertisements.\n\
         Supported formats: text, photos, audio files, and voice messages."
    }

    fn unsupported_message() -> &'static str {
        "Sorry, this kind of message cannot be turned into an advertisement.\n\
         Supported formats: text, photos, audio files, and voice messages."
    }

    fn unknown_command() -> &'static str {
        "Unknown command. Use /help to see what I can do."
    }

    fn draft_discarded(draft_label: &str) -> String {
        format!("<i>Your unsaved {draft_label} draft was discarded.</i>")
    }

    fn liked(total_likes: usize) -> String {
        format!("❤️ Liked! Total likes: {total_likes}")
    }

    fn like_failed(reason: &str) -> String {
        format!("❌ {reason}")
    }

    fn deleted() -> &'static str {
        "🗑️ Advertisement deleted successfully!"
    }

    fn delete_failed() -> &'static str {
        "❌ Failed to delete advertisement. You can only delete your own ads."
    }

    fn deleted_placeholder() -> &'static str {
        "🗑️ <b>This advertisement has been deleted.</b>"
    }

    fn ad_load_failed(number: usize, ad: &Advertisement) -> String {
        format!(
            "❌ <b>Ad #{number} - Error</b>\n\n\
             Failed to load this advertisement.\n\
             Type: {} | Likes: ❤️ {}",
            ad.kind().label().to_lowercase(),
            ad.likes
        )
    }

    fn unknown_action() -> &'static str {
        "❌ Unknown action"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ad blocks
// ─────────────────────────────────────────────────────────────────────────────

/// Header line of an ad block: `#n | ❤️ likes | Type: KIND`
#[must_use]
pub fn ad_header(number: usize, ad: &Advertisement) -> String {
    format!("#{number} | ❤️ {} | Type: {}", ad.likes, ad.kind().label())
}

/// Full HTML block for one ad; used as message text or media caption
///
/// The body is shortened so the visible block fits the Telegram limit for
/// its message kind.
#[must_use]
pub fn render_ad_block(number: usize, ad: &Advertisement) -> String {
    let header = ad_header(number, ad);
    let (icon, body, limit) = match &ad.body {
        AdBody::Text { content } => ("📝", Some(content.as_str()), MESSAGE_TEXT_MAX_CHARS),
        AdBody::Photo { caption, .. } => ("📸", caption.as_deref(), MEDIA_CAPTION_MAX_CHARS),
        AdBody::Audio { caption, .. } | AdBody::Voice { caption, .. } => {
            ("🎵", caption.as_deref(), MEDIA_CAPTION_MAX_CHARS)
        }
    };

    match body {
        Some(body) => {
            // icon, space, header, blank line
            let used = icon.chars().count() + 1 + header.chars().count() + 2;
            let body = fit_body(body, limit.saturating_sub(used));
            format!("{icon} <b>{header}</b>\n\n{}", encode_text(&body))
        }
        None => format!("{icon} <b>{header}</b>"),
    }
}

fn fit_body(body: &str, room: usize) -> String {
    if body.chars().count() <= room {
        return body.to_string();
    }
    format!("{}…", truncate_str(body, room.saturating_sub(1)))
}

/// Reads the `#n` list position back out of a rendered block
#[must_use]
pub fn block_number(rendered: &str) -> Option<usize> {
    RE_BLOCK_NUMBER
        .captures(rendered)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Replaces the `❤️ n` counter in already rendered text
#[must_use]
pub fn rewrite_like_counter(rendered: &str, likes: usize) -> String {
    RE_LIKE_COUNTER
        .replace(rendered, format!("❤️ {likes}").as_str())
        .into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

fn button(text: &str, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_string())
}

/// Main menu: create, list, help
///
/// # Examples
///
/// ```
/// use ads_bot::bot::views::main_menu_keyboard;
/// let keyboard = main_menu_keyboard();
/// assert_eq!(keyboard.inline_keyboard.len(), 3);
/// ```
#[must_use]
pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📝 Create advertisement", CallbackAction::CreateAd)],
        vec![button("📋 List advertisements", CallbackAction::ListAds)],
        vec![button("❓ Help", CallbackAction::Help)],
    ])
}

/// Save or discard a received text
#[must_use]
pub fn confirm_text_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Save as advertisement", CallbackAction::ConfirmText),
        button("❌ Cancel", CallbackAction::CancelText),
    ]])
}

/// Add a description to a received photo or save it as is
#[must_use]
pub fn photo_description_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("📝 Add description", CallbackAction::AddPhotoDescription),
        button(
            "✅ Save without description",
            CallbackAction::SavePhotoNoDescription,
        ),
    ]])
}

/// Like for everyone, delete only for the owner
#[must_use]
pub fn ad_actions_keyboard(ad: &Advertisement, viewer_id: i64) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![button("❤️ Like", CallbackAction::Like(ad.id))]];
    if ad.is_owned_by(viewer_id) {
        rows.push(vec![button("🗑 Delete", CallbackAction::Delete(ad.id))]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Previous / indicator / next row (only with more than one page) and main menu
#[must_use]
pub fn navigation_keyboard<T>(page: &Page<'_, T>) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();

    if page.total_pages > 1 {
        let mut nav = Vec::new();
        if page.has_previous() {
            nav.push(button("⬅️ Back", CallbackAction::Page(page.page - 1)));
        }
        nav.push(button(
            &format!("{}/{}", page.page, page.total_pages),
            CallbackAction::CurrentPage,
        ));
        if page.has_next() {
            nav.push(button("Next ➡️", CallbackAction::Page(page.page + 1)));
        }
        rows.push(nav);
    }

    rows.push(vec![button("🏠 Main menu", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::paginate;
    use insta::assert_snapshot;
    use teloxide::types::InlineKeyboardButtonKind;

    fn tokens(markup: &InlineKeyboardMarkup) -> Vec<Vec<String>> {
        markup
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| match &b.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect()
    }

    fn ad(id: u64, owner: i64) -> Advertisement {
        Advertisement::new(id, owner, AdBody::text("Selling <b>bike</b> & helmet"))
    }

    fn visible_chars(html: &str) -> usize {
        html.replace("<b>", "")
            .replace("</b>", "")
            .replace("&amp;", "&")
            .chars()
            .count()
    }

    #[test]
    fn test_long_photo_description_fits_caption_limit() {
        let description = "Lamp & shade ".repeat(300);
        let ad = Advertisement::new(1, 1, AdBody::photo("f", Some(description)));

        let block = render_ad_block(12, &ad);

        assert!(visible_chars(&block) <= MEDIA_CAPTION_MAX_CHARS);
        assert!(block.starts_with("📸 <b>#12 | ❤️ 0 | Type: PHOTO</b>\n\nLamp &amp; shade"));
        assert!(block.ends_with('…'));
        assert_eq!(block_number(&block), Some(12));
    }

    #[test]
    fn test_short_caption_and_long_text_ad() {
        let ad = Advertisement::new(1, 1, AdBody::voice("v", Some("Voice message (4s)".into())));
        assert!(render_ad_block(1, &ad).ends_with("Voice message (4s)"));

        let long_text = "x".repeat(MESSAGE_TEXT_MAX_CHARS);
        let ad = Advertisement::new(1, 1, AdBody::text(long_text));
        let block = render_ad_block(1, &ad);
        assert!(visible_chars(&block) <= MESSAGE_TEXT_MAX_CHARS);
        assert!(block.ends_with('…'));
    }

    #[test]
    fn test_ad_header_snapshot() {
        let mut ad = ad(4, 1);
        ad.record_like(7);
        assert_snapshot!(ad_header(3, &ad), @"#3 | ❤️ 1 | Type: TEXT");
    }

    #[test]
    fn test_text_block_is_escaped() {
        let block = render_ad_block(1, &ad(1, 1));
        assert_eq!(
            block,
            "📝 <b>#1 | ❤️ 0 | Type: TEXT</b>\n\nSelling &lt;b&gt;bike&lt;/b&gt; &amp; helmet"
        );
    }

    #[test]
    fn test_media_block_without_caption() {
        let ad = Advertisement::new(2, 1, AdBody::voice("f", None));
        assert_eq!(render_ad_block(6, &ad), "🎵 <b>#6 | ❤️ 0 | Type: VOICE</b>");
    }

    #[test]
    fn test_block_number_and_counter_rewrite() {
        let plain = "📸 #4 | ❤️ 2 | Type: PHOTO\n\nLamp";
        assert_eq!(block_number(plain), Some(4));
        assert_eq!(
            rewrite_like_counter(plain, 3),
            "📸 #4 | ❤️ 3 | Type: PHOTO\n\nLamp"
        );
        assert_eq!(block_number("no header"), None);
    }

    #[test]
    fn test_delete_button_only_for_owner() {
        let ad = ad(9, 100);
        assert_eq!(
            tokens(&ad_actions_keyboard(&ad, 100)),
            vec![vec!["like_ad:9".to_string()], vec!["delete_ad:9".to_string()]]
        );
        assert_eq!(
            tokens(&ad_actions_keyboard(&ad, 200)),
            vec![vec!["like_ad:9".to_string()]]
        );
    }

    #[test]
    fn test_navigation_first_of_two_pages() {
        let items: Vec<u32> = (1..=7).collect();
        let page = paginate(&items, 1, 5);
        assert_eq!(
            tokens(&navigation_keyboard(&page)),
            vec![
                vec!["current_page".to_string(), "page:2".to_string()],
                vec!["main_menu".to_string()],
            ]
        );
    }

    #[test]
    fn test_navigation_middle_page() {
        let items: Vec<u32> = (1..=15).collect();
        let page = paginate(&items, 2, 5);
        assert_eq!(
            tokens(&navigation_keyboard(&page))[0],
            vec![
                "page:1".to_string(),
                "current_page".to_string(),
                "page:3".to_string()
            ]
        );
    }

    #[test]
    fn test_navigation_single_page_has_only_menu() {
        let items = [1, 2];
        let page = paginate(&items, 1, 5);
        assert_eq!(
            tokens(&navigation_keyboard(&page)),
            vec![vec!["main_menu".to_string()]]
        );
    }

    #[test]
    fn test_page_header() {
        assert_eq!(
            DefaultAdsView::page_header(1, 2, 7),
            format!(
                "📋 <b>Advertisements</b>\nPage 1/2 | Total: 7\n{}",
                "=".repeat(30)
            )
        );
    }

    #[test]
    fn test_welcome_escapes_username() {
        let text = DefaultAdsView::welcome_message(Some("<evil>"));
        assert!(text.starts_with("Hello, <b>&lt;evil&gt;</b>! 👋"));
        assert!(DefaultAdsView::welcome_message(None).starts_with("Hello! 👋"));
    }

    #[test]
    fn test_own_ads_summary() {
        assert_snapshot!(DefaultAdsView::own_ads_summary(1), @"You have <b>1</b> advertisement on the board.");
        assert_snapshot!(DefaultAdsView::own_ads_summary(3), @"You have <b>3</b> advertisements on the board.");
    }

    #[test]
    fn test_voice_created_with_and_without_duration() {
        assert!(DefaultAdsView::voice_ad_created(Some(5)).ends_with("<b>Duration:</b> 5s"));
        assert!(DefaultAdsView::voice_ad_created(None).ends_with("as an advertisement!"));
    }
}
