use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::MentionableId;

pub const FIRST_NAME_NOTIFY_PROP: &str = "first_name";
pub const CHANNEL_MENTIONS_NOTIFY_PROP: &str = "channel";
pub const MENTION_KEYS_NOTIFY_PROP: &str = "mention_keys";
pub const COMMENTS_NOTIFY_PROP: &str = "comments";

pub const HERE_MENTION: &str = "@here";
pub const CHANNEL_MENTION: &str = "@channel";
pub const ALL_MENTION: &str = "@all";

/// Broadcast words that address a whole channel instead of a named recipient.
pub const SYSTEM_MENTIONS: [&str; 3] = [HERE_MENTION, CHANNEL_MENTION, ALL_MENTION];

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    /// Extra mention keys on top of the `mention_keys` notify prop.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub notify_props: HashMap<String, String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_notify_prop(mut self, key: &str, value: &str) -> Self {
        self.notify_props.insert(key.to_string(), value.to_string());
        self
    }

    /// Every alias the user answers to: the comma separated `mention_keys`
    /// notify prop followed by explicit aliases, trimmed, empties dropped.
    pub fn mention_keys(&self) -> Vec<String> {
        let from_props = self
            .notify_props
            .get(MENTION_KEYS_NOTIFY_PROP)
            .map(String::as_str)
            .unwrap_or_default()
            .split(',');

        from_props
            .chain(self.aliases.iter().map(String::as_str))
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn first_name_mentions_enabled(&self) -> bool {
        self.notify_prop_is_true(FIRST_NAME_NOTIFY_PROP)
    }

    pub fn channel_mentions_enabled(&self) -> bool {
        self.notify_prop_is_true(CHANNEL_MENTIONS_NOTIFY_PROP)
    }

    pub fn comments_notify(&self) -> CommentsNotify {
        match self
            .notify_props
            .get(COMMENTS_NOTIFY_PROP)
            .map(String::as_str)
        {
            Some("any") => CommentsNotify::Any,
            Some("root") => CommentsNotify::Root,
            _ => CommentsNotify::Never,
        }
    }

    fn notify_prop_is_true(&self, key: &str) -> bool {
        self.notify_props.get(key).map(String::as_str) == Some("true")
    }
}

/// Which thread replies implicitly mention a user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CommentsNotify {
    /// Replies to any thread the user posted in.
    Any,
    /// Replies to threads the user started.
    Root,
    #[default]
    Never,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Group {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Online,
    Away,
    Dnd,
    #[default]
    Offline,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreChannelMentions {
    On,
    Off,
    #[default]
    Default,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MarkUnread {
    #[default]
    All,
    Mention,
}

/// A member's notification settings for one channel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ChannelNotifyProps {
    #[serde(default)]
    pub ignore_channel_mentions: IgnoreChannelMentions,
    #[serde(default)]
    pub mark_unread: MarkUnread,
}

impl ChannelNotifyProps {
    /// Channel mentions are dropped when explicitly ignored, or when the
    /// channel is muted and the member kept the default setting.
    pub fn ignores_channel_mentions(&self) -> bool {
        match self.ignore_channel_mentions {
            IgnoreChannelMentions::On => true,
            IgnoreChannelMentions::Off => false,
            IgnoreChannelMentions::Default => self.mark_unread == MarkUnread::Mention,
        }
    }
}

/// Per member state needed while indexing a channel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct MemberState {
    #[serde(default)]
    pub channel_props: ChannelNotifyProps,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

/// Whether `@here`, `@channel` and `@all` may notify anyone for this post.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct BroadcastPolicy {
    pub allowed: bool,
}

impl BroadcastPolicy {
    pub const ALLOW: Self = Self { allowed: true };
    pub const DENY: Self = Self { allowed: false };

    /// A cap of zero means the channel size is never checked.
    pub fn evaluate(
        mention_highlight_disabled: bool,
        has_permission: bool,
        member_count: usize,
        max_notifications_per_channel: usize,
    ) -> Self {
        let within_cap =
            max_notifications_per_channel == 0 || member_count < max_notifications_per_channel;

        Self {
            allowed: !mention_highlight_disabled && has_permission && within_cap,
        }
    }
}

/// Maps mention keywords to everyone who answers to them.
///
/// Case-insensitive keywords are stored lower-cased; first names are stored
/// verbatim so they only match with the same casing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct KeywordIndex {
    entries: HashMap<String, Vec<MentionableId>>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(
        &mut self,
        profile: &UserProfile,
        channel_props: &ChannelNotifyProps,
        status: Option<UserStatus>,
        policy: BroadcastPolicy,
    ) -> &mut Self {
        let id = MentionableId::user(profile.id.as_str());

        self.insert(format!("@{}", profile.username.to_lowercase()), &id);

        for key in profile.mention_keys() {
            self.insert(key.to_lowercase(), &id);
        }

        if profile.first_name_mentions_enabled() && !profile.first_name.is_empty() {
            self.insert(profile.first_name.clone(), &id);
        }

        if policy.allowed
            && profile.channel_mentions_enabled()
            && !channel_props.ignores_channel_mentions()
        {
            self.insert(CHANNEL_MENTION.to_string(), &id);
            self.insert(ALL_MENTION.to_string(), &id);

            if status == Some(UserStatus::Online) {
                self.insert(HERE_MENTION.to_string(), &id);
            }
        }

        self
    }

    /// Registers `keyword` exactly as given.
    pub fn add_user_keyword(&mut self, user_id: &str, keyword: &str) -> &mut Self {
        self.insert(keyword.to_string(), &MentionableId::user(user_id));
        self
    }

    pub fn add_group(&mut self, group: &Group) -> &mut Self {
        if let Some(name) = group.name.as_deref().filter(|name| !name.is_empty()) {
            self.insert(format!("@{name}"), &MentionableId::group(group.id.as_str()));
        }
        self
    }

    pub fn add_groups<'a>(&mut self, groups: impl IntoIterator<Item = &'a Group>) -> &mut Self {
        for group in groups {
            self.add_group(group);
        }
        self
    }

    pub fn get(&self, keyword: &str) -> Option<&[MentionableId]> {
        self.entries.get(keyword).map(Vec::as_slice)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keywords in lexicographic order.
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }

    /// Keywords containing at least one multibyte character, longest first,
    /// ties in lexicographic order.
    pub fn multibyte_keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self
            .entries
            .keys()
            .map(String::as_str)
            .filter(|keyword| is_multibyte(keyword))
            .collect();
        keywords.sort_unstable_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        keywords
    }

    fn insert(&mut self, keyword: String, id: &MentionableId) {
        trace!(keyword = %keyword, mentionable = %id, "registering mention keyword");
        self.entries.entry(keyword).or_default().push(id.clone());
    }
}

/// True when the string holds a character encoded in more than one byte.
pub fn is_multibyte(text: &str) -> bool {
    text.len() != text.chars().count()
}

/// Builds the keyword index for one message from the channel's visible
/// members and groups. Members missing from `members` get default channel
/// props and no presence status.
pub fn build_keyword_index(
    profiles: &[UserProfile],
    groups: &[Group],
    members: &HashMap<String, MemberState>,
    policy: BroadcastPolicy,
) -> KeywordIndex {
    let mut index = KeywordIndex::new();

    for profile in profiles {
        let state = members.get(&profile.id).copied().unwrap_or_default();
        index.add_user(profile, &state.channel_props, state.status, policy);
    }

    index.add_groups(groups);
    index
}
