use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use selfiebox_core::config::Config;
use selfiebox_core::{Compositor, HttpSegmenter, SessionStore, SessionTracker};

use crate::bot::{BotContext, dispatch_message, new_user_queues};
use crate::telegram::{TelegramClient, TelegramSettings};

mod bot;
mod commands;
mod handlers;
mod ingest;
mod telegram;
mod types;

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Runs the Telegram long-poll loop until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let settings = TelegramSettings::from_config(&config)?;
    let segmenter = HttpSegmenter::from_config(&config.segmentation)
        .context("Failed to build segmentation client")?;
    tracing::info!(
        endpoint = segmenter.endpoint(),
        max_concurrent = config.compositor.max_concurrent,
        timeout_secs = config.compositor.timeout_secs,
        "Compositor configured"
    );
    let compositor = Compositor::from_config(Arc::new(segmenter), &config.compositor);
    let tracker = SessionTracker::new(SessionStore::new(), Arc::new(compositor));

    run_bot(settings, tracker).await
}

async fn run_bot(settings: TelegramSettings, tracker: SessionTracker) -> Result<()> {
    let client = TelegramClient::new(settings.bot_token);
    if let Err(err) = client
        .set_my_commands(&commands::telegram_command_specs())
        .await
    {
        tracing::warn!("Failed to register bot commands: {err:#}");
    }

    let context = Arc::new(BotContext::new(client.clone(), tracker));
    let user_queues = new_user_queues();

    let mut offset: Option<i64> = None;
    let poll_timeout = settings.poll_timeout;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!("selfiebox bot started. Polling for updates...");

    loop {
        let current_offset = offset;
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down Telegram bot.");
                break;
            }
            updates = client.get_updates(current_offset, poll_timeout) => {
                let updates = match updates {
                    Ok(updates) => updates,
                    Err(err) => {
                        tracing::warn!("Telegram polling error: {err:#}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                if !updates.is_empty() {
                    tracing::debug!(count = updates.len(), "Received updates");
                }
                for update in updates {
                    offset = Some(update.update_id + 1);
                    if let Some(message) = update.message {
                        dispatch_message(&user_queues, &context, message).await;
                    }
                }
            }
        }
    }

    tracing::info!(live_sessions = context.tracker().len(), "Bot stopped");
    Ok(())
}
