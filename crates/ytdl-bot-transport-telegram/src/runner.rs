use crate::bot;
use crate::bot::handlers::{get_user_id_safe, Command};
use crate::bot::views::{DefaultDownloadView, DownloadView, HELP_CALLBACK};
use crate::bot::UnauthorizedCache;
use crate::config::{get_unauthorized_cache_max_size, get_unauthorized_cooldown, BotSettings};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info};
use ytdl_bot_core::formats::FORMAT_CALLBACK_PREFIX;
use ytdl_bot_core::service::DownloadService;

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let service = init_download_service(&settings);
    let bot = Bot::new(settings.telegram.telegram_token.clone());
    let unauthorized_cache = init_unauthorized_cache();
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![settings, service, unauthorized_cache])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn init_download_service(settings: &BotSettings) -> Arc<DownloadService> {
    let downloader = settings.downloader.as_ref();
    info!(
        ytdlp = %downloader.ytdlp_path,
        workspace_root = %downloader.workspace_root().display(),
        ffmpeg_available = downloader.ffmpeg_available,
        timeout_secs = downloader.download_timeout_secs,
        "Download service initialized."
    );
    Arc::new(DownloadService::from_settings(downloader))
}

fn init_unauthorized_cache() -> Arc<UnauthorizedCache> {
    let cooldown = get_unauthorized_cooldown();
    let max_size = get_unauthorized_cache_max_size();

    info!(
        "Initializing UnauthorizedCache (cooldown: {}s, max_size: {})",
        cooldown, max_size
    );

    Arc::new(UnauthorizedCache::new(cooldown, max_size))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .filter(|q: CallbackQuery, settings: Arc<BotSettings>| {
                    settings.telegram.is_allowed(q.from.id.0.cast_signed())
                })
                .branch(
                    dptree::filter(|q: CallbackQuery| q.data.as_deref() == Some(HELP_CALLBACK))
                        .endpoint(handle_help_callback),
                )
                .branch(
                    dptree::filter(|q: CallbackQuery| {
                        q.data
                            .as_deref()
                            .is_some_and(|d| d.starts_with(FORMAT_CALLBACK_PREFIX))
                    })
                    .endpoint(handle_format_callback),
                ),
        )
        .branch(
            Update::filter_message().branch(
                // Main branch for authorized users
                dptree::filter(|msg: Message, settings: Arc<BotSettings>| {
                    settings.telegram.is_allowed(get_user_id_safe(&msg))
                })
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text),
                ),
            ),
        )
        .branch(
            // Users outside the allowlist
            Update::filter_message()
                .filter(|msg: Message, settings: Arc<BotSettings>| {
                    !settings.telegram.is_allowed(get_user_id_safe(&msg))
                })
                .endpoint(handle_unauthorized),
        )
}

async fn handle_unauthorized(
    bot: Bot,
    msg: Message,
    cache: Arc<UnauthorizedCache>,
) -> Result<(), teloxide::RequestError> {
    let user_id = get_user_id_safe(&msg);
    let user_name = msg
        .from
        .as_ref()
        .map_or_else(|| "Unknown".to_string(), |u| u.first_name.clone());

    if cache.should_send(user_id, &user_name) {
        info!(
            "⛔️ Unauthorized access from user {} ({}). Sending denial message.",
            user_id, user_name
        );

        if let Err(e) = bot
            .send_message(msg.chat.id, DefaultDownloadView::access_denied())
            .await
        {
            error!("Failed to send access denied message to {}: {}", user_id, e);
        } else {
            cache.mark_sent(user_id).await;
        }
    }

    respond(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg).await,
        Command::Help => bot::handlers::help(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    service: Arc<DownloadService>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_text(bot, msg, service).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_help_callback(bot: Bot, q: CallbackQuery) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::download_handlers::handle_help_callback(bot, q).await {
        error!("Help callback handler error: {}", e);
    }
    respond(())
}

async fn handle_format_callback(
    bot: Bot,
    q: CallbackQuery,
    service: Arc<DownloadService>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::download_handlers::handle_format_callback(bot, q, service).await {
        error!("Format callback handler error: {}", e);
    }
    respond(())
}
