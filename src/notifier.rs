use async_trait::async_trait;

pub const ALERT_PREFIX: &str = "🚨 ALERT 🚨";

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> anyhow::Result<()>;

    async fn send_alert(&self, text: &str) -> anyhow::Result<()> {
        self.send_message(&format!("{ALERT_PREFIX}\n\n{text}")).await
    }
}
