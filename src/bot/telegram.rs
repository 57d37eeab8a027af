use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::TelegramConfig;

/// Slack added on top of the long-poll timeout for the HTTP request itself
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API error {code:?}: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parameters: Option<ReplyParameters>,
}

#[derive(Debug, Serialize)]
struct ReplyParameters {
    message_id: i64,
    allow_sending_without_reply: bool,
}

/// Minimal Telegram Bot API client for long polling
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    api_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        poll_timeout: Duration,
    ) -> reqwest::Result<Self> {
        let base: String = api_url.into();
        Ok(Self {
            client: Client::builder().timeout(poll_timeout + POLL_GRACE).build()?,
            api_url: base.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &TelegramConfig) -> reqwest::Result<Self> {
        Self::new(
            &config.api_url,
            &config.bot_token,
            Duration::from_secs(config.poll_timeout_secs),
        )
    }

    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, TelegramError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{}", self.api_url, self.token, method);
        // Telegram reports failures in the JSON envelope, with a 4xx/5xx status
        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| e.without_url())?;
        let body: ApiResponse<T> = response.json().await.map_err(|e| e.without_url())?;

        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api {
                code: body.error_code,
                description: body
                    .description
                    .unwrap_or_else(|| format!("{} returned no result", method)),
            }),
        }
    }

    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for new message updates
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &params).await
    }

    /// Send `text` to `chat_id`, quoting `reply_to` when given
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<Message, TelegramError> {
        let params = SendMessage {
            chat_id,
            text,
            reply_parameters: reply_to.map(|message_id| ReplyParameters {
                message_id,
                allow_sending_without_reply: true,
            }),
        };
        self.call("sendMessage", &params).await
    }
}
