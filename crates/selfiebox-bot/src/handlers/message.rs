use anyhow::Result;
use selfiebox_core::error::USER_FACING_FAILURE;
use selfiebox_core::{Outcome, SessionKey, SessionPhase};

use crate::bot::context::BotContext;
use crate::commands::{BotCommand, parse_command};
use crate::ingest;
use crate::telegram::Message;
use crate::types::IncomingMessage;

pub(crate) const GREETING: &str =
    "Hi! 👋 Send me your selfie first, then send the background image. I'll put you in the picture.";
pub(crate) const USAGE_HINT: &str =
    "Send me a photo to get started: your selfie first, then the background.";
pub(crate) const SUBJECT_RECEIVED: &str = "✅ Great selfie! Now send the background picture.";
pub(crate) const PROCESSING: &str = "⏳ Got both images! Processing...";
pub(crate) const RESULT_CAPTION: &str = "🎉 Here's your merged selfie!";
pub(crate) const RESULT_FILENAME: &str = "selfie.png";
pub(crate) const BUSY: &str = "⏳ Still working on your last pair, hang on.";
pub(crate) const CANCELLED: &str = "🗑️ Forgot your selfie. Send a new one whenever you're ready.";
pub(crate) const NOTHING_TO_CANCEL: &str = "There's nothing to cancel.";

pub(crate) async fn handle_message(context: &BotContext, message: Message) -> Result<()> {
    let Some(incoming) = ingest::parse_incoming_message(context.client(), message).await? else {
        return Ok(());
    };

    // Threading replies only helps in groups.
    let reply_to = (!incoming.is_private).then_some(incoming.message_id);
    let IncomingMessage {
        chat_id,
        user_id,
        text,
        image,
        ..
    } = incoming;
    let key = SessionKey::from(user_id);

    let Some(image) = image else {
        tracing::info!(user_id, chat_id, "Accepted text message");
        return handle_text(context, chat_id, text.as_deref(), &key, reply_to).await;
    };
    tracing::info!(
        user_id,
        chat_id,
        mime = %image.mime_type,
        bytes = image.data.len(),
        "Accepted image"
    );

    let client = context.client();
    let tracker = context.tracker();
    let completes_pair = tracker.phase(&key) == SessionPhase::AwaitingBackdrop;
    if completes_pair
        && let Err(err) = client.send_message(chat_id, PROCESSING, reply_to).await
    {
        tracing::warn!(chat_id, "Failed to send processing prompt: {err:#}");
    }

    let outcome = {
        let _uploading = completes_pair.then(|| client.start_chat_action(chat_id, "upload_photo"));
        tracker.submit_image(&key, image.data).await
    };

    match outcome {
        Outcome::AwaitingBackdrop => {
            client.send_message(chat_id, SUBJECT_RECEIVED, reply_to).await?;
        }
        Outcome::Composited(png) => {
            if let Err(err) = client
                .send_photo(chat_id, png, RESULT_FILENAME, RESULT_CAPTION, reply_to)
                .await
            {
                tracing::error!(chat_id, "Failed to upload composite: {err:#}");
                client
                    .send_message(chat_id, USER_FACING_FAILURE, reply_to)
                    .await?;
            }
        }
        Outcome::Failed(err) => {
            client.send_message(chat_id, err.user_message(), reply_to).await?;
        }
        Outcome::Busy => {
            client.send_message(chat_id, BUSY, reply_to).await?;
        }
    }

    Ok(())
}

async fn handle_text(
    context: &BotContext,
    chat_id: i64,
    text: Option<&str>,
    key: &SessionKey,
    reply_to: Option<i64>,
) -> Result<()> {
    let reply = match text.and_then(parse_command) {
        Some(BotCommand::Start) => GREETING,
        Some(BotCommand::Cancel) => {
            if context.tracker().cancel(key) {
                CANCELLED
            } else {
                NOTHING_TO_CANCEL
            }
        }
        None => USAGE_HINT,
    };

    context.client().send_message(chat_id, reply, reply_to).await
}
