use crate::bot;
use crate::bot::handlers::{get_user_id_safe, is_command_text, Command};
use crate::bot::FlowController;
use crate::config::Settings;
use crate::storage::{AdRepository, JsonAdStore};
use crate::utils::log_preview;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, UpdateKind};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info};

/// Run the bot until Ctrl-C.
pub async fn run_bot(settings: Arc<Settings>) {
    let store = init_store(&settings).await;
    let flow = init_flow(&settings);

    let bot = Bot::new(settings.telegram_token.clone());
    register_commands(&bot).await;
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![store, flow, settings])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.kind);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn init_store(settings: &Settings) -> Arc<dyn AdRepository> {
    let store = JsonAdStore::new(settings.ads_file.clone());
    info!(
        "Ad store initialized at {} with {} ads.",
        store.path().display(),
        store.count().await
    );
    Arc::new(store)
}

fn init_flow(settings: &Settings) -> Arc<FlowController> {
    info!(
        "Initializing FlowController (ttl: {}s, max_entries: {})",
        settings.pending_ttl_secs, settings.pending_max_entries
    );
    Arc::new(FlowController::new(
        settings.pending_ttl_secs,
        settings.pending_max_entries,
    ))
}

async fn register_commands(bot: &Bot) {
    match bot.set_my_commands(Command::bot_commands()).await {
        Ok(_) => info!("Bot commands registered."),
        Err(e) => error!("Failed to register bot commands: {}", e),
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .inspect(|upd: Update| log_update(&upd))
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some_and(is_command_text))
                        .endpoint(handle_unknown_command),
                )
                .branch(
                    dptree::filter_async(|msg: Message, flow: Arc<FlowController>| async move {
                        flow.is_awaiting_caption(get_user_id_safe(&msg)).await
                    })
                    .endpoint(handle_caption_input),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.photo().is_some()).endpoint(handle_photo),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.audio().is_some()).endpoint(handle_audio),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.voice().is_some()).endpoint(handle_voice),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.document().is_some())
                        .endpoint(handle_document),
                )
                .branch(dptree::endpoint(handle_unsupported)),
        )
}

/// One line per incoming update: kind, command, user, text preview
fn log_update(upd: &Update) {
    match &upd.kind {
        UpdateKind::Message(msg) => {
            let user_id = get_user_id_safe(msg);
            let text = msg.text().or_else(|| msg.caption()).unwrap_or_default();
            match text.strip_prefix('/') {
                Some(command) => info!(
                    "Incoming message from user {}: command /{}",
                    user_id,
                    command.split_whitespace().next().unwrap_or_default()
                ),
                None => info!(
                    "Incoming message from user {}: {}",
                    user_id,
                    log_preview(text)
                ),
            }
        }
        UpdateKind::CallbackQuery(q) => info!(
            "Incoming callback from user {}: {}",
            q.from.id.0,
            q.data.as_deref().unwrap_or_default()
        ),
        other => debug!("Incoming update: {:?}", other),
    }
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::ad_handlers::handle_callback(bot, q, store, flow, settings).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg, store, flow).await,
        Command::Help => bot::handlers::help(bot, msg, flow).await,
        Command::Add => bot::handlers::add(bot, msg, flow).await,
        Command::List => bot::handlers::list(bot, msg, store, flow, settings).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_caption_input(
    bot: Bot,
    msg: Message,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_caption_input(bot, msg, store, flow).await {
        error!("Caption handler error: {}", e);
    }
    respond(())
}

async fn handle_unknown_command(bot: Bot, msg: Message) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_unknown_command(bot, msg).await {
        error!("Unknown command handler error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    flow: Arc<FlowController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_text(bot, msg, flow).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_photo(
    bot: Bot,
    msg: Message,
    flow: Arc<FlowController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_photo(bot, msg, flow).await {
        error!("Photo handler error: {}", e);
    }
    respond(())
}

async fn handle_audio(
    bot: Bot,
    msg: Message,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_audio(bot, msg, store, flow).await {
        error!("Audio handler error: {}", e);
    }
    respond(())
}

async fn handle_voice(
    bot: Bot,
    msg: Message,
    store: Arc<dyn AdRepository>,
    flow: Arc<FlowController>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_voice(bot, msg, store, flow).await {
        error!("Voice handler error: {}", e);
    }
    respond(())
}

async fn handle_document(bot: Bot, msg: Message) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_document(bot, msg).await {
        error!("Document handler error: {}", e);
    }
    respond(())
}

async fn handle_unsupported(bot: Bot, msg: Message) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_unsupported(bot, msg).await {
        error!("Unsupported message handler error: {}", e);
    }
    respond(())
}
