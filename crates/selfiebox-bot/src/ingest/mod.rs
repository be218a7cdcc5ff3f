use anyhow::{Result, anyhow};

use crate::telegram::{Document, Message, PhotoSize, TelegramClient};
use crate::types::{IncomingImage, IncomingMessage};

const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024; // 10MB
const SUPPORTED_IMAGE_MIMES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

struct MessageTarget {
    chat: i64,
    message: i64,
}

/// Validates the sender and downloads the attached image, if any.
///
/// Returns `Ok(None)` for messages that should be ignored; an unreadable
/// attachment has already been answered by the time this returns.
pub(crate) async fn parse_incoming_message(
    client: &TelegramClient,
    message: Message,
) -> Result<Option<IncomingMessage>> {
    let target = MessageTarget {
        chat: message.chat.id,
        message: message.message_id,
    };

    let Some(user) = message.from.as_ref() else {
        tracing::debug!(chat_id = target.chat, "ignoring message without sender");
        return Ok(None);
    };
    if user.is_bot {
        return Ok(None);
    }
    let user_id = user.id;

    let text = extract_text(&message);
    let (image, had_attachment) = collect_image(client, &message, &target).await;

    if image.is_none() && had_attachment {
        tracing::warn!(chat_id = target.chat, "unsupported or unreadable attachment");
        let _ = client
            .send_message(
                target.chat,
                "Sorry, I couldn't read that image. Send it as a photo (JPEG, PNG or WebP).",
                Some(target.message),
            )
            .await;
        return Ok(None);
    }

    if text.is_none() && image.is_none() {
        tracing::debug!(chat_id = target.chat, "ignoring empty message");
        return Ok(None);
    }

    Ok(Some(IncomingMessage {
        chat_id: target.chat,
        message_id: target.message,
        user_id,
        is_private: message.chat.is_private(),
        text,
        image,
    }))
}

async fn collect_image(
    client: &TelegramClient,
    message: &Message,
    target: &MessageTarget,
) -> (Option<IncomingImage>, bool) {
    if let Some(photo) = message.photo.as_deref().and_then(select_best_photo) {
        return (
            log_failure(load_photo(client, target, photo).await, "photo"),
            true,
        );
    }

    if let Some(document) = message.document.as_ref() {
        let is_image = document
            .mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("image/"));
        if is_image {
            return (
                log_failure(load_document_image(client, target, document).await, "document image"),
                true,
            );
        }
        return (None, true);
    }

    (None, false)
}

fn log_failure(result: Result<Option<IncomingImage>>, label: &str) -> Option<IncomingImage> {
    match result {
        Ok(image) => image,
        Err(err) => {
            tracing::warn!("Failed to load {label}: {err:#}");
            None
        }
    }
}

fn extract_text(message: &Message) -> Option<String> {
    [message.text.as_deref(), message.caption.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Telegram sends several sizes of one photo; take the biggest.
fn select_best_photo(photos: &[PhotoSize]) -> Option<&PhotoSize> {
    photos.iter().max_by_key(|photo| {
        let size = photo.file_size.unwrap_or(0);
        let area = (photo.width.max(0) as u64) * (photo.height.max(0) as u64);
        (area, size)
    })
}

async fn load_photo(
    client: &TelegramClient,
    target: &MessageTarget,
    photo: &PhotoSize,
) -> Result<Option<IncomingImage>> {
    load_image(client, target, &photo.file_id, photo.file_size, None).await
}

async fn load_document_image(
    client: &TelegramClient,
    target: &MessageTarget,
    document: &Document,
) -> Result<Option<IncomingImage>> {
    load_image(
        client,
        target,
        &document.file_id,
        document.file_size,
        document.mime_type.as_deref(),
    )
    .await
}

async fn load_image(
    client: &TelegramClient,
    target: &MessageTarget,
    file_id: &str,
    declared_size: Option<u64>,
    declared_mime: Option<&str>,
) -> Result<Option<IncomingImage>> {
    if declared_size.unwrap_or(0) > MAX_IMAGE_BYTES {
        tracing::warn!(chat_id = target.chat, "skipping image over size limit");
        return Ok(None);
    }

    let bytes = download_file_bytes(client, file_id).await?;
    if bytes.len() as u64 > MAX_IMAGE_BYTES {
        tracing::warn!(chat_id = target.chat, "downloaded image over size limit");
        return Ok(None);
    }

    let Some(mime_type) = select_image_mime(declared_mime, &bytes) else {
        tracing::warn!(chat_id = target.chat, "unsupported image type");
        return Ok(None);
    };

    tracing::debug!(
        chat_id = target.chat,
        message_id = target.message,
        bytes = bytes.len(),
        %mime_type,
        "image downloaded"
    );
    Ok(Some(IncomingImage {
        mime_type,
        data: bytes,
    }))
}

fn detect_image_mime(bytes: &[u8]) -> Option<String> {
    let kind = infer::get(bytes)?;
    let mime = kind.mime_type();
    SUPPORTED_IMAGE_MIMES
        .contains(&mime)
        .then(|| mime.to_string())
}

/// Sniffed type wins; the declared type is only trusted when sniffing fails.
fn select_image_mime(declared: Option<&str>, bytes: &[u8]) -> Option<String> {
    if let Some(mime) = detect_image_mime(bytes) {
        return Some(mime);
    }
    if infer::get(bytes).is_some() {
        return None;
    }
    declared
        .filter(|mime| SUPPORTED_IMAGE_MIMES.contains(mime))
        .map(str::to_string)
}

async fn download_file_bytes(client: &TelegramClient, file_id: &str) -> Result<Vec<u8>> {
    let file = client.get_file(file_id).await?;
    let file_path = file
        .file_path
        .ok_or_else(|| anyhow!("Telegram file missing file_path"))?;
    client.download_file(&file_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const GIF_MAGIC: &[u8] = b"GIF89a\x01\x00\x01\x00";

    fn photo(file_id: &str, width: i64, height: i64) -> PhotoSize {
        PhotoSize {
            file_id: file_id.to_string(),
            width,
            height,
            file_size: None,
        }
    }

    #[test]
    fn best_photo_is_the_largest_area() {
        let photos = vec![photo("s", 90, 90), photo("l", 1280, 960), photo("m", 320, 240)];
        assert_eq!(select_best_photo(&photos).unwrap().file_id, "l");
        assert!(select_best_photo(&[]).is_none());
    }

    #[test]
    fn sniffed_png_is_supported() {
        assert_eq!(detect_image_mime(PNG_MAGIC).as_deref(), Some("image/png"));
    }

    #[test]
    fn gif_is_rejected_even_if_declared_as_png() {
        assert_eq!(select_image_mime(Some("image/png"), GIF_MAGIC), None);
    }

    #[test]
    fn declared_mime_is_a_fallback_for_unknown_bytes() {
        assert_eq!(
            select_image_mime(Some("image/jpeg"), b"????").as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(select_image_mime(Some("image/tiff"), b"????"), None);
        assert_eq!(select_image_mime(None, b"????"), None);
    }
}
