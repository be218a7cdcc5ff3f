use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use selfiebox_core::config::Config;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

mod types;

pub use types::{Document, Message, PhotoSize, TelegramFile, Update};

use crate::commands::TelegramCommandSpec;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
/// Telegram clears a chat action after ~5s.
const CHAT_ACTION_REFRESH: Duration = Duration::from_secs(4);

pub struct TelegramSettings {
    pub bot_token: String,
    pub poll_timeout: Duration,
}

impl TelegramSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let Some(bot_token) = config.telegram_bot_token() else {
            bail!(
                "telegram.bot_token, SELFIEBOX_TELEGRAM_BOT_TOKEN or TELEGRAM_BOT_TOKEN is required"
            );
        };
        Ok(Self {
            bot_token,
            poll_timeout: Duration::from_secs(config.telegram.poll_timeout_secs),
        })
    }
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, TELEGRAM_API_URL)
    }

    pub fn with_base_url(token: String, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: Some(vec!["message"]),
        };
        self.post("getUpdates", &request).await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<TelegramFile> {
        let request = GetFileRequest { file_id };
        self.post("getFile", &request).await
    }

    pub async fn download_file(&self, file_path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/file/bot{}/{}", self.base_url, self.token, file_path);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|_| anyhow!("Telegram file download failed"))?;

        if !response.status().is_success() {
            bail!(
                "Telegram file download failed with status {}",
                response.status()
            );
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|_| anyhow!("Failed to read Telegram file bytes"))?;
        Ok(bytes.to_vec())
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_to_message_id,
            allow_sending_without_reply: Some(true),
        };
        let _: Message = self.post("sendMessage", &request).await?;
        Ok(())
    }

    /// Uploads `png` as a photo with a caption.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        png: Vec<u8>,
        filename: &str,
        caption: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(png)
            .file_name(filename.to_string())
            .mime_str("image/png")?;
        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("allow_sending_without_reply", "true")
            .part("photo", part);
        if let Some(reply_to) = reply_to_message_id {
            form = form.text("reply_to_message_id", reply_to.to_string());
        }

        let url = self.method_url("sendPhoto");
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|_| anyhow!("Telegram photo upload failed"))?;
        let _: Message = decode_response(response).await?;
        Ok(())
    }

    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<()> {
        let request = SendChatActionRequest { chat_id, action };
        let _: bool = self.post("sendChatAction", &request).await?;
        Ok(())
    }

    /// Repeats `action` until the returned guard is dropped.
    pub fn start_chat_action(&self, chat_id: i64, action: &'static str) -> ChatActionGuard {
        let client = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                if let Err(err) = client.send_chat_action(chat_id, action).await {
                    tracing::debug!(chat_id, "chat action failed: {err}");
                }
                tokio::time::sleep(CHAT_ACTION_REFRESH).await;
            }
        });
        ChatActionGuard { handle }
    }

    pub async fn set_my_commands(&self, commands: &[TelegramCommandSpec]) -> Result<()> {
        let request = SetMyCommandsRequest {
            commands: commands
                .iter()
                .map(|spec| BotCommandPayload {
                    command: spec.command,
                    description: spec.description,
                })
                .collect(),
        };
        let _: bool = self.post("setMyCommands", &request).await?;
        Ok(())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, method: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|_| anyhow!("Telegram request failed"))?;
        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let payload: TelegramResponse<T> = response
        .json()
        .await
        .map_err(|_| anyhow!("Failed to decode Telegram response"))?;

    if !payload.ok {
        let description = payload
            .description
            .unwrap_or_else(|| "Telegram API error".to_string());
        bail!("{}", description);
    }

    payload
        .result
        .ok_or_else(|| anyhow!("Telegram response missing result"))
}

pub struct ChatActionGuard {
    handle: JoinHandle<()>,
}

impl Drop for ChatActionGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_updates: Option<Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allow_sending_without_reply: Option<bool>,
}

#[derive(Debug, Serialize)]
struct SendChatActionRequest<'a> {
    chat_id: i64,
    action: &'a str,
}

#[derive(Debug, Serialize)]
struct SetMyCommandsRequest {
    commands: Vec<BotCommandPayload>,
}

#[derive(Debug, Serialize)]
struct BotCommandPayload {
    command: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct GetFileRequest<'a> {
    file_id: &'a str,
}
