use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::TelegramConfig;
use crate::notifier::Notifier;

#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// [`Notifier`] posting to a Telegram chat through the Bot API
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    pub fn build_message(&self, text: &str) -> SendMessage {
        SendMessage {
            chat_id: self.config.chat_id.clone(),
            text: escape_html(text),
            parse_mode: "HTML",
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip_all)]
    async fn send_message(&self, text: &str) -> anyhow::Result<()> {
        let message = self.build_message(text);

        let response = self
            .client
            .post(self.endpoint())
            .json(&message)
            .send()
            .await
            .context("failed to send Telegram message")?;

        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .with_context(|| format!("unreadable Telegram response (status {status})"))?;

        if !status.is_success() || !body.ok {
            bail!(
                "Telegram rejected message with status {status}: {}",
                body.description.unwrap_or_default()
            );
        }

        info!("Message sent successfully to Telegram");
        Ok(())
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
