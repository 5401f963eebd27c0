//! Telegram Bot API notifier and command feed
//!
//! Outbound: `sendMessage` to the configured channel (HTML) or back to the
//! chat a command came from (plain text).
//! Inbound: `getUpdates` long polling; every line starting with `/` in a
//! message or channel post becomes one `InboundCommand`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::errors::{NotifyError, NotifyResult};
use crate::adapters::traits::{CommandTransport, Notifier};
use crate::adapters::types::InboundCommand;
use crate::config::constants::http_timeout;

/// Extra slack on top of the long-poll timeout before the HTTP call is abandoned
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    channel_post: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// Telegram Bot API client
#[derive(Debug)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    channel_id: String,
    poll_timeout: Duration,
    next_offset: AtomicI64,
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

impl TelegramClient {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        channel_id: impl Into<String>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            http: http_client(http_timeout()),
            api_base: api_base.into(),
            token: token.into(),
            channel_id: channel_id.into(),
            poll_timeout,
            next_offset: AtomicI64::new(0),
        }
    }

    /// Replace the deadline applied to `sendMessage` calls
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.http = http_client(timeout);
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<&str>,
    ) -> NotifyResult<()> {
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
        };

        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let parsed: Option<ApiResponse<serde_json::Value>> = serde_json::from_str(&text).ok();

        match parsed {
            Some(api) if api.ok && status.is_success() => Ok(()),
            Some(api) => Err(NotifyError::Api(
                api.description
                    .unwrap_or_else(|| format!("sendMessage returned {}", status)),
            )),
            None => Err(NotifyError::Api(format!(
                "sendMessage returned {} body={}",
                status, text
            ))),
        }
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(&self, text: &str) -> NotifyResult<()> {
        self.send_message(&self.channel_id, text, Some("HTML"))
            .await
    }

    async fn reply(&self, chat_id: &str, text: &str) -> NotifyResult<()> {
        self.send_message(chat_id, text, None).await
    }
}

#[async_trait]
impl CommandTransport for TelegramClient {
    async fn next_commands(&self) -> NotifyResult<Vec<InboundCommand>> {
        let offset = self.next_offset.load(Ordering::SeqCst);
        let response = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout.as_secs().to_string()),
            ])
            .timeout(self.poll_timeout + POLL_GRACE)
            .send()
            .await?;

        let api: ApiResponse<Vec<Update>> = response.json().await?;
        if !api.ok {
            return Err(NotifyError::Api(
                api.description
                    .unwrap_or_else(|| "getUpdates failed".to_string()),
            ));
        }

        let updates = api.result.unwrap_or_default();
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.next_offset.store(last + 1, Ordering::SeqCst);
        }

        let mut commands = Vec::new();
        for update in updates {
            let Some(message) = update.message.or(update.channel_post) else {
                debug!(update_id = update.update_id, "Skipping non-message update");
                continue;
            };
            let Some(text) = message.text else {
                continue;
            };
            let chat_id = message.chat.id.to_string();
            for line in text.lines().map(str::trim).filter(|l| l.starts_with('/')) {
                commands.push(InboundCommand::new(chat_id.clone(), line));
            }
        }

        debug!(offset = offset, count = commands.len(), "Polled command feed");

        Ok(commands)
    }
}
