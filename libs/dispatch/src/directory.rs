use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use relay_mentions::{Channel, ChannelNotifyProps, Group, Thread, UserProfile, UserStatus};
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, NotifyError};

/// Channel membership, presence and permission data owned by the chat host.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    async fn channel(&self, channel_id: &str) -> Result<Channel, DispatchError>;

    async fn user(&self, user_id: &str) -> Result<UserProfile, DispatchError>;

    async fn members(&self, channel_id: &str) -> Result<Vec<UserProfile>, DispatchError>;

    async fn channel_notify_props(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<ChannelNotifyProps, DispatchError>;

    async fn status(&self, user_id: &str) -> Result<Option<UserStatus>, DispatchError>;

    async fn groups(&self, channel_id: &str) -> Result<Vec<Group>, DispatchError>;

    /// Posts of the thread rooted at `root_id`, root first.
    async fn thread(&self, root_id: &str) -> Result<Option<Thread>, DispatchError>;

    async fn can_use_channel_mentions(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<bool, DispatchError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Preference {
    pub category: String,
    pub name: String,
    pub value: String,
}

#[async_trait]
pub trait PreferenceStore: Send + Sync + 'static {
    async fn preferences(&self, user_id: &str) -> Result<Vec<Preference>, NotifyError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelMember {
    pub user_id: String,
    #[serde(default)]
    pub notify_props: ChannelNotifyProps,
}

/// A point-in-time copy of everything [`Directory`] and [`PreferenceStore`]
/// serve, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryDirectory {
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub users: Vec<UserProfile>,
    /// Channel id to members.
    #[serde(default)]
    pub members: HashMap<String, Vec<ChannelMember>>,
    #[serde(default)]
    pub statuses: HashMap<String, UserStatus>,
    /// Channel id to groups visible in it.
    #[serde(default)]
    pub groups: HashMap<String, Vec<Group>>,
    /// Root post id to thread.
    #[serde(default)]
    pub threads: HashMap<String, Thread>,
    #[serde(default)]
    pub preferences: HashMap<String, Vec<Preference>>,
    /// Users lacking permission to use channel-wide mentions.
    #[serde(default)]
    pub restricted_users: HashSet<String>,
}

impl InMemoryDirectory {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|error| anyhow!("invalid directory snapshot: {error}"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|error| {
            anyhow!("failed to read directory snapshot {}: {error}", path.display())
        })?;
        Self::from_json(&text)
    }

    pub fn with_channel(mut self, channel: Channel, members: Vec<UserProfile>) -> Self {
        let entries = members
            .iter()
            .map(|profile| ChannelMember {
                user_id: profile.id.clone(),
                notify_props: ChannelNotifyProps::default(),
            })
            .collect();
        self.members.insert(channel.id.clone(), entries);
        self.channels.push(channel);

        for profile in members {
            if !self.users.iter().any(|user| user.id == profile.id) {
                self.users.push(profile);
            }
        }
        self
    }

    fn find_user(&self, user_id: &str) -> Option<&UserProfile> {
        self.users.iter().find(|user| user.id == user_id)
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn channel(&self, channel_id: &str) -> Result<Channel, DispatchError> {
        self.channels
            .iter()
            .find(|channel| channel.id == channel_id)
            .cloned()
            .ok_or_else(|| DispatchError::ChannelNotFound(channel_id.to_string()))
    }

    async fn user(&self, user_id: &str) -> Result<UserProfile, DispatchError> {
        self.find_user(user_id)
            .cloned()
            .ok_or_else(|| DispatchError::UserNotFound(user_id.to_string()))
    }

    async fn members(&self, channel_id: &str) -> Result<Vec<UserProfile>, DispatchError> {
        let members = self
            .members
            .get(channel_id)
            .ok_or_else(|| DispatchError::ChannelNotFound(channel_id.to_string()))?;

        members
            .iter()
            .map(|member| {
                self.find_user(&member.user_id)
                    .cloned()
                    .ok_or_else(|| DispatchError::UserNotFound(member.user_id.clone()))
            })
            .collect()
    }

    async fn channel_notify_props(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<ChannelNotifyProps, DispatchError> {
        Ok(self
            .members
            .get(channel_id)
            .and_then(|members| members.iter().find(|member| member.user_id == user_id))
            .map(|member| member.notify_props)
            .unwrap_or_default())
    }

    async fn status(&self, user_id: &str) -> Result<Option<UserStatus>, DispatchError> {
        Ok(self.statuses.get(user_id).copied())
    }

    async fn groups(&self, channel_id: &str) -> Result<Vec<Group>, DispatchError> {
        Ok(self.groups.get(channel_id).cloned().unwrap_or_default())
    }

    async fn thread(&self, root_id: &str) -> Result<Option<Thread>, DispatchError> {
        Ok(self.threads.get(root_id).cloned())
    }

    async fn can_use_channel_mentions(
        &self,
        user_id: &str,
        _channel_id: &str,
    ) -> Result<bool, DispatchError> {
        Ok(!self.restricted_users.contains(user_id))
    }
}

#[async_trait]
impl PreferenceStore for InMemoryDirectory {
    async fn preferences(&self, user_id: &str) -> Result<Vec<Preference>, NotifyError> {
        if self.find_user(user_id).is_none() {
            return Err(NotifyError::Preferences(format!("unknown user {user_id}")));
        }
        Ok(self.preferences.get(user_id).cloned().unwrap_or_default())
    }
}
