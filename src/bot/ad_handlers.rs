//! Inline button presses
//!
//! Every callback query is answered exactly once, either with a toast, an
//! alert, or an empty acknowledgement.

use crate::bot::actions;
use crate::bot::callbacks::CallbackAction;
use crate::bot::flow::FlowController;
use crate::bot::handlers::notify_discarded;
use crate::bot::listing::send_ads_page;
use crate::bot::resilient::{edit_caption_safe, edit_text_safe, send_html_resilient};
use crate::bot::views::{
    ad_actions_keyboard, block_number, main_menu_keyboard, render_ad_block, rewrite_like_counter,
    AdsView, DefaultAdsView,
};
use crate::config::Settings;
use crate::storage::{AdRepository, Advertisement};
use anyhow::Result;
use html_escape::encode_text;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};
use tracing::{info, warn};

/// How the query gets acknowledged
#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Silent,
    Toast(String),
    Alert(String),
}

/// Message the pressed button is attached to
#[derive(Clone, Copy)]
struct Origin {
    chat_id: ChatId,
    message_id: MessageId,
}

/// Shared state a button press may touch
struct Deps {
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
    settings: Arc<Settings>,
}

/// Dispatches an inline button press
///
/// The query is answered even when the action itself fails.
///
/// # Errors
///
/// Returns an error if a reply or the query answer cannot be sent.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
    settings: Arc<Settings>,
) -> Result<()> {
    let user_id = q.from.id.0.cast_signed();
    let data = q.data.clone().unwrap_or_default();

    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(e) => {
            warn!("User {} pressed a button we do not handle: {}", user_id, e);
            return answer(&bot, &q, Answer::Alert(DefaultAdsView::unknown_action().into())).await;
        }
    };

    let Some(origin) = q.message.as_ref().map(|m| Origin {
        chat_id: m.chat().id,
        message_id: m.id(),
    }) else {
        warn!("Callback {} from user {} has no message attached", data, user_id);
        return answer(&bot, &q, Answer::Silent).await;
    };

    let deps = Deps {
        store,
        flow,
        settings,
    };
    let (reply, failure) = settle(dispatch(&bot, &q, &deps, origin, action, user_id).await);
    if failure.is_none() {
        info!("Handled {} for user {}", action, user_id);
    }

    answer(&bot, &q, reply).await?;
    failure.map_or(Ok(()), Err)
}

/// Splits an action outcome into the answer to send and the error to report afterwards
fn settle(outcome: Result<Answer>) -> (Answer, Option<anyhow::Error>) {
    match outcome {
        Ok(reply) => (reply, None),
        Err(e) => (Answer::Silent, Some(e)),
    }
}

async fn dispatch(
    bot: &Bot,
    q: &CallbackQuery,
    deps: &Deps,
    origin: Origin,
    action: CallbackAction,
    user_id: i64,
) -> Result<Answer> {
    if action.resets_flow() {
        let notice = actions::reset_flow(&deps.flow, user_id).await;
        notify_discarded(bot, origin.chat_id, notice).await?;
    }

    let store = &deps.store;
    let page_size = deps.settings.ads_per_page;
    let reply = match action {
        CallbackAction::Like(ad_id) => like(bot, q, store, origin, ad_id, user_id).await,
        CallbackAction::Delete(ad_id) => delete(bot, store, origin, ad_id, user_id).await,
        CallbackAction::Page(page) => {
            edit_text_safe(
                bot,
                origin.chat_id,
                origin.message_id,
                DefaultAdsView::page_loading(),
                None,
            )
            .await;
            send_ads_page(bot, origin.chat_id, store.as_ref(), user_id, page, page_size).await?;
            Answer::Silent
        }
        CallbackAction::ListAds => {
            send_ads_page(bot, origin.chat_id, store.as_ref(), user_id, 1, page_size).await?;
            Answer::Silent
        }
        CallbackAction::CurrentPage => {
            Answer::Toast(DefaultAdsView::current_page_notice().into())
        }
        CallbackAction::MainMenu | CallbackAction::Help | CallbackAction::CreateAd => {
            send_html_resilient(bot, origin.chat_id, menu_text(action), Some(main_menu_keyboard()))
                .await?;
            Answer::Silent
        }
        CallbackAction::ConfirmText
        | CallbackAction::CancelText
        | CallbackAction::SavePhotoNoDescription
        | CallbackAction::AddPhotoDescription => {
            draft_action(bot, store.as_ref(), &deps.flow, origin, action, user_id).await;
            Answer::Silent
        }
    };
    Ok(reply)
}

async fn answer(bot: &Bot, q: &CallbackQuery, answer: Answer) -> Result<()> {
    let req = bot.answer_callback_query(q.id.clone());
    match answer {
        Answer::Silent => req.await?,
        Answer::Toast(text) => req.text(text).await?,
        Answer::Alert(text) => req.text(text).show_alert(true).await?,
    };
    Ok(())
}

fn menu_text(action: CallbackAction) -> &'static str {
    match action {
        CallbackAction::Help => DefaultAdsView::help_message(),
        CallbackAction::CreateAd => DefaultAdsView::add_instructions(),
        _ => DefaultAdsView::main_menu(),
    }
}

/// Follow-up buttons of a text or photo draft; the prompt message is replaced by the outcome
async fn draft_action(
    bot: &Bot,
    store: &dyn AdRepository,
    flow: &FlowController,
    origin: Origin,
    action: CallbackAction,
    user_id: i64,
) {
    let reply = match action {
        CallbackAction::ConfirmText => actions::confirm_text(store, flow, user_id).await,
        CallbackAction::CancelText => actions::cancel_text(flow, user_id).await,
        CallbackAction::SavePhotoNoDescription => {
            actions::save_photo(store, flow, user_id, None).await
        }
        _ => {
            let text = if flow.request_caption(user_id).await {
                DefaultAdsView::photo_description_prompt()
            } else {
                DefaultAdsView::photo_not_found()
            };
            edit_text_safe(bot, origin.chat_id, origin.message_id, text, None).await;
            return;
        }
    };
    show_reply(bot, origin, reply).await;
}

async fn show_reply(bot: &Bot, origin: Origin, reply: actions::Reply) {
    let markup = reply.ok.then(main_menu_keyboard);
    edit_text_safe(bot, origin.chat_id, origin.message_id, reply.text, markup).await;
}

async fn like(
    bot: &Bot,
    q: &CallbackQuery,
    store: &Arc<dyn AdRepository>,
    origin: Origin,
    ad_id: u64,
    user_id: i64,
) -> Answer {
    let outcome = actions::like(store.as_ref(), ad_id, user_id).await;

    if let Some(ad) = outcome.updated {
        refresh_ad_message(bot, q, origin, &ad, user_id).await;
    }
    Answer::Alert(outcome.alert)
}

/// Rewrites the like counter of the message the button belongs to
async fn refresh_ad_message(
    bot: &Bot,
    q: &CallbackQuery,
    origin: Origin,
    ad: &Advertisement,
    viewer_id: i64,
) {
    let Some(message) = q.regular_message() else {
        return;
    };
    let keyboard = Some(ad_actions_keyboard(ad, viewer_id));

    if let Some(caption) = message.caption() {
        let updated = refreshed_block(caption, ad);
        edit_caption_safe(bot, origin.chat_id, origin.message_id, updated, keyboard).await;
    } else if let Some(text) = message.text() {
        let updated = refreshed_block(text, ad);
        edit_text_safe(bot, origin.chat_id, origin.message_id, updated, keyboard).await;
    }
}

/// HTML for an ad block after its like count changed.
///
/// `current` is the plain text Telegram reports for the message.
fn refreshed_block(current: &str, ad: &Advertisement) -> String {
    block_number(current).map_or_else(
        || encode_text(&rewrite_like_counter(current, ad.likes)).into_owned(),
        |number| render_ad_block(number, ad),
    )
}

async fn delete(
    bot: &Bot,
    store: &Arc<dyn AdRepository>,
    origin: Origin,
    ad_id: u64,
    user_id: i64,
) -> Answer {
    let reply = actions::delete(store.as_ref(), ad_id, user_id).await;

    if reply.ok {
        if let Err(e) = bot.delete_message(origin.chat_id, origin.message_id).await {
            warn!("Could not delete message of ad {}: {}", ad_id, e);
            // Media messages carry a caption, not text
            if !edit_text_safe(
                bot,
                origin.chat_id,
                origin.message_id,
                DefaultAdsView::deleted_placeholder(),
                None,
            )
            .await
            {
                edit_caption_safe(
                    bot,
                    origin.chat_id,
                    origin.message_id,
                    DefaultAdsView::deleted_placeholder(),
                    None,
                )
                .await;
            }
        }
    }
    Answer::Alert(reply.text)
}
