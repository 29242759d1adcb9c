use std::fmt;

use serde::{Deserialize, Serialize};

const USER_PREFIX: &str = "user:";
const GROUP_PREFIX: &str = "group:";

/// How a recipient was mentioned, ordered from lowest to highest priority.
///
/// The derived `Ord` follows declaration order, so a later variant always
/// outranks an earlier one.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd,
)]
#[serde(rename_all = "snake_case")]
pub enum MentionType {
    /// Placeholder, never recorded in practice.
    #[default]
    None,
    /// The post is in a group message channel.
    GroupMessage,
    /// The post is in a thread the user has commented on.
    Thread,
    /// The post is a reply to a thread the user started.
    Comment,
    /// The post contains `@here`, `@channel` or `@all`.
    Channel,
    /// The post is a direct message.
    DirectMessage,
    /// The post names the user through one of their keywords.
    Keyword,
    /// The post names a group.
    Group,
}

impl MentionType {
    pub const ALL: [MentionType; 8] = [
        MentionType::None,
        MentionType::GroupMessage,
        MentionType::Thread,
        MentionType::Comment,
        MentionType::Channel,
        MentionType::DirectMessage,
        MentionType::Keyword,
        MentionType::Group,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MentionType::None => "none",
            MentionType::GroupMessage => "gm",
            MentionType::Thread => "thread",
            MentionType::Comment => "comment",
            MentionType::Channel => "channel",
            MentionType::DirectMessage => "dm",
            MentionType::Keyword => "keyword",
            MentionType::Group => "group",
        }
    }
}

impl fmt::Display for MentionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a keyword can point at: exactly one user or one group.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MentionableId {
    User(String),
    Group(String),
}

impl MentionableId {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::Group(id.into())
    }

    pub fn as_user_id(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id),
            Self::Group(_) => None,
        }
    }

    pub fn as_group_id(&self) -> Option<&str> {
        match self {
            Self::Group(id) => Some(id),
            Self::User(_) => None,
        }
    }

    /// Parses the `user:<id>` / `group:<id>` wire form.
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(id) = value.strip_prefix(USER_PREFIX) {
            return Some(Self::User(id.to_string()));
        }
        value
            .strip_prefix(GROUP_PREFIX)
            .map(|id| Self::Group(id.to_string()))
    }
}

impl fmt::Display for MentionableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{USER_PREFIX}{id}"),
            Self::Group(id) => write!(f, "{GROUP_PREFIX}{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MentionType, MentionableId};

    #[test]
    fn mention_types_are_ordered_by_priority() {
        for pair in MentionType::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} should rank below {}", pair[0], pair[1]);
        }
        assert!(MentionType::Keyword > MentionType::Channel);
        assert!(MentionType::Group > MentionType::Keyword);
    }

    #[test]
    fn mention_type_labels() {
        let labels: Vec<&str> = MentionType::ALL.iter().map(|kind| kind.as_str()).collect();
        assert_eq!(
            labels,
            vec!["none", "gm", "thread", "comment", "channel", "dm", "keyword", "group"]
        );
    }

    #[test]
    fn mentionable_id_accessors_never_cross_kinds() {
        let user = MentionableId::user("u1");
        let group = MentionableId::group("g1");

        assert_eq!(user.as_user_id(), Some("u1"));
        assert_eq!(user.as_group_id(), None);
        assert_eq!(group.as_group_id(), Some("g1"));
        assert_eq!(group.as_user_id(), None);
    }

    #[test]
    fn mentionable_id_prefixed_form() {
        let user = MentionableId::user("abc");
        assert_eq!(user.to_string(), "user:abc");
        assert_eq!(MentionableId::parse("user:abc"), Some(user));
        assert_eq!(
            MentionableId::parse("group:xyz"),
            Some(MentionableId::group("xyz"))
        );
        assert_eq!(MentionableId::parse("team:xyz"), None);
    }

    #[test]
    fn mentionable_id_serializes_as_tagged_value() {
        let serialized = match serde_json::to_value(MentionableId::group("devs")) {
            Ok(value) => value,
            Err(error) => panic!("serialization failed: {error}"),
        };

        assert_eq!(serialized, json!({"kind": "group", "id": "devs"}));
    }
}
