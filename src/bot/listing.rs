//! Paginated ad listing
//!
//! A page is sent as a header, one message per ad, and a navigation message.

use crate::bot::resilient::send_html_resilient;
use crate::bot::views::{
    ad_actions_keyboard, main_menu_keyboard, navigation_keyboard, render_ad_block, AdsView,
    DefaultAdsView,
};
use crate::pagination::paginate;
use crate::storage::{AdBody, AdRepository, Advertisement};
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, InputFile, ParseMode};
use tracing::{error, info};

/// Sends page `requested_page` of the listing to `chat_id`.
///
/// Out-of-range pages are clamped. Delete buttons are shown only on ads
/// owned by `viewer_id`.
///
/// # Errors
///
/// Returns an error if a header or navigation message cannot be sent.
pub async fn send_ads_page(
    bot: &Bot,
    chat_id: ChatId,
    store: &dyn AdRepository,
    viewer_id: i64,
    requested_page: usize,
    page_size: usize,
) -> Result<()> {
    let ads = store.load().await;
    let page = paginate(&ads, requested_page, page_size);

    if page.is_empty() {
        send_html_resilient(bot, chat_id, DefaultAdsView::no_ads(), Some(main_menu_keyboard()))
            .await?;
        return Ok(());
    }

    if page.page != requested_page {
        info!(
            "Requested page {} clamped to {}/{}",
            requested_page, page.page, page.total_pages
        );
    }

    send_html_resilient(
        bot,
        chat_id,
        DefaultAdsView::page_header(page.page, page.total_pages, page.total),
        None,
    )
    .await?;

    for (index, ad) in page.items.iter().enumerate() {
        send_ad(bot, chat_id, page.offset + index + 1, ad, viewer_id).await?;
    }

    send_html_resilient(
        bot,
        chat_id,
        DefaultAdsView::navigation_prompt(),
        Some(navigation_keyboard(&page)),
    )
    .await?;

    info!(
        "Sent page {}/{} ({} ads) to user {}",
        page.page,
        page.total_pages,
        page.items.len(),
        viewer_id
    );
    Ok(())
}

/// Sends one ad block, as media with a caption where the ad has a file.
///
/// A media send that Telegram rejects falls back to a text block.
async fn send_ad(
    bot: &Bot,
    chat_id: ChatId,
    number: usize,
    ad: &Advertisement,
    viewer_id: i64,
) -> Result<()> {
    let block = render_ad_block(number, ad);
    let keyboard = ad_actions_keyboard(ad, viewer_id);

    let sent = match &ad.body {
        AdBody::Text { .. } => {
            send_html_resilient(bot, chat_id, block, Some(keyboard)).await?;
            return Ok(());
        }
        AdBody::Photo { file_id, .. } => {
            bot.send_photo(chat_id, media(file_id))
                .caption(block)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard.clone())
                .await
        }
        AdBody::Audio { file_id, .. } => {
            bot.send_audio(chat_id, media(file_id))
                .caption(block)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard.clone())
                .await
        }
        AdBody::Voice { file_id, .. } => {
            bot.send_voice(chat_id, media(file_id))
                .caption(block)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard.clone())
                .await
        }
    };

    if let Err(e) = sent {
        error!("Error sending ad {}: {}", ad.id, e);
        send_html_resilient(
            bot,
            chat_id,
            DefaultAdsView::ad_load_failed(number, ad),
            Some(keyboard),
        )
        .await?;
    }
    Ok(())
}

fn media(file_id: &str) -> InputFile {
    InputFile::file_id(FileId(file_id.to_owned()))
}
