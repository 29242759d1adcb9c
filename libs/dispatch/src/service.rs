use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::{
    config::NotificationSettings,
    directory::PreferenceStore,
    error::{DeliveryFailure, NotifyError},
};

/// Delivers one rendered message to one service URL.
#[async_trait]
pub trait ServiceRouter: Send + Sync + 'static {
    async fn send(&self, message: &str, service_url: &str) -> Result<()>;
}

/// Records deliveries in the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogRouter;

#[async_trait]
impl ServiceRouter for LogRouter {
    async fn send(&self, message: &str, service_url: &str) -> Result<()> {
        info!(service = %service_url, message = %message, "notification (dry run)");
        Ok(())
    }
}

pub struct NotificationService {
    router: Arc<dyn ServiceRouter>,
    preferences: Arc<dyn PreferenceStore>,
    preference_category: String,
    preference_name: String,
}

impl NotificationService {
    pub fn new(
        router: Arc<dyn ServiceRouter>,
        preferences: Arc<dyn PreferenceStore>,
        settings: &NotificationSettings,
    ) -> Self {
        Self {
            router,
            preferences,
            preference_category: settings.preference_category.clone(),
            preference_name: settings.preference_name.clone(),
        }
    }

    /// Sends `message` to every service the user configured. Users without
    /// any configured service are skipped without error.
    pub async fn send_user_notification(
        &self,
        user_id: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let preferences = self
            .preferences
            .preferences(user_id)
            .await
            .inspect_err(|e| error!(user_id, error = %e, "failed to get user preferences"))?;

        let services = preferences
            .iter()
            .find(|pref| {
                pref.category == self.preference_category && pref.name == self.preference_name
            })
            .map(|pref| parse_service_urls(&pref.value))
            .unwrap_or_default();

        if services.is_empty() {
            debug!(user_id, "no notification services configured for user");
            return Ok(());
        }

        let mut failures = Vec::new();
        for service in services {
            match self.router.send(message, service).await {
                Ok(()) => debug!(user_id, service, "notification sent"),
                Err(e) => {
                    error!(user_id, service, error = %e, "failed to send notification");
                    failures.push(DeliveryFailure {
                        service: service.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Delivery(failures))
        }
    }

    pub async fn send_mention_notification(
        &self,
        user_id: &str,
        channel: &str,
        mentioned_by: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let text = mention_notification_text(mentioned_by, channel, message);
        self.send_user_notification(user_id, &text).await
    }
}

pub fn mention_notification_text(mentioned_by: &str, channel: &str, message: &str) -> String {
    format!("You were mentioned by @{mentioned_by} in {channel}: {message}")
}

/// Splits a comma separated preference value into trimmed, non-empty URLs.
pub fn parse_service_urls(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .collect()
}

/// Cuts `message` to at most `limit` bytes, ending long messages with `...`.
/// Never splits a character.
pub fn preview_message(message: &str, limit: usize) -> String {
    if message.len() <= limit {
        return message.to_string();
    }

    let budget = limit.saturating_sub(3);
    let end = message
        .char_indices()
        .map(|(idx, c)| idx + c.len_utf8())
        .take_while(|end| *end <= budget)
        .last()
        .unwrap_or(0);

    let mut preview = message.get(..end).unwrap_or_default().to_string();
    preview.push_str("...");
    preview
}
