use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RELAY_CONFIG_PATH: &str = "~/.relay/relay.toml";
pub const MAX_NOTIFICATIONS_ENV: &str = "RELAY_MAX_NOTIFICATIONS_PER_CHANNEL";

const DEFAULT_MAX_NOTIFICATIONS_PER_CHANNEL: usize = 1000;
const DEFAULT_PREVIEW_LIMIT: usize = 100;
const DEFAULT_PREFERENCE_CATEGORY: &str = "plugin_com.mattermost.plugin-shoutrrr";
const DEFAULT_PREFERENCE_NAME: &str = "notification_services";

/// Shortest preview that still fits an ellipsis after one character.
const MIN_PREVIEW_LIMIT: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct RelayCliFlags {
    pub max_notifications_per_channel: Option<usize>,
    pub allow_channel_mentions: Option<bool>,
    pub preview_limit: Option<usize>,
    pub notify_author: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct RelayConfig {
    pub broadcast: BroadcastSettings,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct BroadcastSettings {
    /// Channels with at least this many members never expand `@channel`,
    /// `@all` or `@here`. Zero disables the cap.
    pub max_notifications_per_channel: usize,
    pub allow_channel_mentions: bool,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            max_notifications_per_channel: DEFAULT_MAX_NOTIFICATIONS_PER_CHANNEL,
            allow_channel_mentions: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct NotificationSettings {
    pub preview_limit: usize,
    pub preference_category: String,
    pub preference_name: String,
    pub notify_author: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            preference_category: DEFAULT_PREFERENCE_CATEGORY.to_string(),
            preference_name: DEFAULT_PREFERENCE_NAME.to_string(),
            notify_author: false,
        }
    }
}

impl RelayConfig {
    pub fn load(config_path: Option<&Path>, cli: &RelayCliFlags) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_relay_config_path);

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|error| {
                anyhow!("failed to read relay config {}: {error}", path.display())
            })?;
            let persisted: PersistedRelayConfig = toml::from_str(&text).map_err(|error| {
                anyhow!("failed to parse relay config {}: {error}", path.display())
            })?;
            persisted.into_runtime()
        } else {
            RelayConfig::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(cli);
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_relay_config_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                anyhow!("failed to create config dir {}: {error}", parent.display())
            })?;
        }

        let persisted = PersistedRelayConfig::from_runtime(self);
        let text = toml::to_string_pretty(&persisted)
            .map_err(|error| anyhow!("failed to serialize relay config: {error}"))?;

        std::fs::write(&path, text).map_err(|error| {
            anyhow!("failed to write relay config {}: {error}", path.display())
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.notifications.preview_limit < MIN_PREVIEW_LIMIT {
            return Err(anyhow!(
                "notifications.preview_limit must be at least {MIN_PREVIEW_LIMIT}"
            ));
        }

        if self.notifications.preference_name.trim().is_empty() {
            return Err(anyhow!("notifications.preference_name cannot be empty"));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(value) = var(MAX_NOTIFICATIONS_ENV)
            && let Ok(parsed) = value.trim().parse()
        {
            self.broadcast.max_notifications_per_channel = parsed;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &RelayCliFlags) {
        if let Some(max) = cli.max_notifications_per_channel {
            self.broadcast.max_notifications_per_channel = max;
        }
        if let Some(allow) = cli.allow_channel_mentions {
            self.broadcast.allow_channel_mentions = allow;
        }
        if let Some(limit) = cli.preview_limit {
            self.notifications.preview_limit = limit;
        }
        if let Some(notify_author) = cli.notify_author {
            self.notifications.notify_author = notify_author;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
struct PersistedRelayConfig {
    #[serde(default)]
    broadcast: PersistedBroadcastSettings,
    #[serde(default)]
    notifications: PersistedNotificationSettings,
}

impl PersistedRelayConfig {
    fn into_runtime(self) -> RelayConfig {
        let broadcast = BroadcastSettings::default();
        let notifications = NotificationSettings::default();

        RelayConfig {
            broadcast: BroadcastSettings {
                max_notifications_per_channel: self
                    .broadcast
                    .max_notifications_per_channel
                    .unwrap_or(broadcast.max_notifications_per_channel),
                allow_channel_mentions: self
                    .broadcast
                    .allow_channel_mentions
                    .unwrap_or(broadcast.allow_channel_mentions),
            },
            notifications: NotificationSettings {
                preview_limit: self
                    .notifications
                    .preview_limit
                    .unwrap_or(notifications.preview_limit),
                preference_category: self
                    .notifications
                    .preference_category
                    .unwrap_or(notifications.preference_category),
                preference_name: self
                    .notifications
                    .preference_name
                    .unwrap_or(notifications.preference_name),
                notify_author: self
                    .notifications
                    .notify_author
                    .unwrap_or(notifications.notify_author),
            },
        }
    }

    fn from_runtime(config: &RelayConfig) -> Self {
        Self {
            broadcast: PersistedBroadcastSettings {
                max_notifications_per_channel: Some(
                    config.broadcast.max_notifications_per_channel,
                ),
                allow_channel_mentions: Some(config.broadcast.allow_channel_mentions),
            },
            notifications: PersistedNotificationSettings {
                preview_limit: Some(config.notifications.preview_limit),
                preference_category: Some(config.notifications.preference_category.clone()),
                preference_name: Some(config.notifications.preference_name.clone()),
                notify_author: Some(config.notifications.notify_author),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
struct PersistedBroadcastSettings {
    #[serde(default)]
    max_notifications_per_channel: Option<usize>,
    #[serde(default)]
    allow_channel_mentions: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
struct PersistedNotificationSettings {
    #[serde(default)]
    preview_limit: Option<usize>,
    #[serde(default)]
    preference_category: Option<String>,
    #[serde(default)]
    preference_name: Option<String>,
    #[serde(default)]
    notify_author: Option<bool>,
}

pub fn default_relay_config_path() -> PathBuf {
    expand_tilde_path(&PathBuf::from(DEFAULT_RELAY_CONFIG_PATH))
}

fn expand_tilde_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(stripped) = path_str.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }

    if path_str == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }

    path.to_path_buf()
}
