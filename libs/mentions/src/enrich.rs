//! Implicit mentions that depend on where a post was made rather than what it says.
//!
//! Everything here goes through [`MentionResults::add_mention`] and
//! [`MentionResults::remove_mention`], so the parser never needs to know
//! about channel types or threads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    extract::Post,
    keywords::{CommentsNotify, UserProfile},
    results::MentionResults,
    types::MentionType,
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    #[default]
    Open,
    Private,
    Direct,
    Group,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Channel {
    pub id: String,
    /// For direct channels this is `<user_id>__<user_id>`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub channel_type: ChannelType,
}

impl Channel {
    pub fn direct(first_user: &str, second_user: &str) -> Self {
        Self {
            id: format!("dm-{first_user}-{second_user}"),
            name: format!("{first_user}__{second_user}"),
            display_name: String::new(),
            channel_type: ChannelType::Direct,
        }
    }

    /// The other participant of a direct channel. `None` for other channel
    /// types and for a user's channel with themselves.
    pub fn other_user_id_for_dm(&self, user_id: &str) -> Option<&str> {
        if self.channel_type != ChannelType::Direct {
            return None;
        }

        let (first, second) = self.name.split_once("__")?;
        if first == second {
            return None;
        }

        Some(if first == user_id { second } else { first })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ThreadPost {
    pub id: String,
    pub user_id: String,
}

/// Posts of the thread a reply belongs to, root first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Thread {
    pub posts: Vec<ThreadPost>,
}

impl Thread {
    pub fn root(&self) -> Option<&ThreadPost> {
        self.posts.first()
    }
}

/// Caller supplied facts about the post being processed.
#[derive(Debug, Clone, Copy)]
pub struct MentionContext<'a> {
    pub post: &'a Post,
    pub channel: &'a Channel,
    /// Channel members keyed by user id.
    pub members: &'a HashMap<String, UserProfile>,
    /// Present when the post is a reply.
    pub thread: Option<&'a Thread>,
}

/// Applies the direct message, group message, add-to-channel, thread and
/// self-mention rules to `results`.
pub fn apply_context(results: &mut MentionResults, context: &MentionContext<'_>) {
    let post = context.post;

    if context.channel.channel_type == ChannelType::Direct {
        apply_direct_message(results, context);
        return;
    }

    if context.channel.channel_type == ChannelType::Group {
        for id in context.members.keys() {
            results.add_mention(id, MentionType::GroupMessage);
        }
    }

    if let Some(added_user_id) = post.added_user_id() {
        results.add_mention(added_user_id, MentionType::Keyword);
    }

    if post.root_id().is_some()
        && let Some(thread) = context.thread
    {
        apply_thread(results, thread, context.members);
    }

    if !post.from_webhook() {
        results.remove_mention(&post.user_id);
    }
}

fn apply_direct_message(results: &mut MentionResults, context: &MentionContext<'_>) {
    let post = context.post;

    if !post.from_webhook() {
        results.remove_mention(&post.user_id);
    }

    if let Some(other) = context.channel.other_user_id_for_dm(&post.user_id)
        && context.members.contains_key(other)
    {
        results.add_mention(other, MentionType::DirectMessage);
    }

    // Webhook posts in a DM notify the account that owns the webhook too.
    if post.from_webhook() {
        results.add_mention(&post.user_id, MentionType::DirectMessage);
    }
}

fn apply_thread(
    results: &mut MentionResults,
    thread: &Thread,
    members: &HashMap<String, UserProfile>,
) {
    let root_id = thread.root().map(|root| root.id.as_str());

    for thread_post in &thread.posts {
        let Some(profile) = members.get(&thread_post.user_id) else {
            continue;
        };

        let is_root = Some(thread_post.id.as_str()) == root_id;
        let notify = match profile.comments_notify() {
            CommentsNotify::Any => true,
            CommentsNotify::Root => is_root,
            CommentsNotify::Never => false,
        };
        if !notify {
            continue;
        }

        let mention_type = if is_root {
            MentionType::Comment
        } else {
            MentionType::Thread
        };
        debug!(user_id = %thread_post.user_id, kind = %mention_type, "thread participant mentioned");
        results.add_mention(&thread_post.user_id, mention_type);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::{Channel, ChannelType, MentionContext, Thread, ThreadPost, apply_context};
    use crate::{
        extract::Post, keywords::UserProfile, results::MentionResults, types::MentionType,
    };

    fn members(profiles: Vec<UserProfile>) -> HashMap<String, UserProfile> {
        profiles
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect()
    }

    fn open_channel() -> Channel {
        Channel {
            id: "c1".to_string(),
            name: "town-square".to_string(),
            display_name: "Town Square".to_string(),
            channel_type: ChannelType::Open,
        }
    }

    #[test]
    fn self_mention_is_removed() {
        let post = Post::new("u1", "@me");
        let members = members(vec![UserProfile::new("u1", "me")]);
        let channel = open_channel();
        let mut results = MentionResults::new();
        results.add_mention("u1", MentionType::Keyword);
        results.add_mention("u2", MentionType::Keyword);

        apply_context(
            &mut results,
            &MentionContext {
                post: &post,
                channel: &channel,
                members: &members,
                thread: None,
            },
        );

        assert_eq!(results.mention_type("u1"), None);
        assert_eq!(results.mention_type("u2"), Some(MentionType::Keyword));
    }

    #[test]
    fn webhook_posts_keep_self_mention() {
        let mut post = Post::new("u1", "@me");
        post.props.insert("from_webhook".to_string(), json!("true"));
        let members = members(vec![UserProfile::new("u1", "me")]);
        let channel = open_channel();
        let mut results = MentionResults::new();
        results.add_mention("u1", MentionType::Keyword);

        apply_context(
            &mut results,
            &MentionContext {
                post: &post,
                channel: &channel,
                members: &members,
                thread: None,
            },
        );

        assert_eq!(results.mention_type("u1"), Some(MentionType::Keyword));
    }

    #[test]
    fn direct_message_mentions_other_member() {
        let post = Post::new("u1", "hi");
        let members = members(vec![UserProfile::new("u1", "a"), UserProfile::new("u2", "b")]);
        let channel = Channel::direct("u2", "u1");
        let mut results = MentionResults::new();

        apply_context(
            &mut results,
            &MentionContext {
                post: &post,
                channel: &channel,
                members: &members,
                thread: None,
            },
        );

        assert_eq!(results.mention_type("u2"), Some(MentionType::DirectMessage));
        assert_eq!(results.mention_type("u1"), None);
    }

    #[test]
    fn direct_message_drops_sender_self_mention() {
        let post = Post::new("u1", "note to @alice and @bob");
        let members = members(vec![
            UserProfile::new("u1", "alice"),
            UserProfile::new("u2", "bob"),
        ]);
        let channel = Channel::direct("u1", "u2");
        let mut results = MentionResults::new();
        results.add_mention("u1", MentionType::Keyword);
        results.add_mention("u2", MentionType::Keyword);

        apply_context(
            &mut results,
            &MentionContext {
                post: &post,
                channel: &channel,
                members: &members,
                thread: None,
            },
        );

        assert_eq!(results.mention_type("u1"), None);
        assert!(results.mention_type("u2").is_some());
    }

    #[test]
    fn webhook_direct_message_mentions_both_members() {
        let mut post = Post::new("u1", "build finished");
        post.props.insert("from_webhook".to_string(), json!("true"));
        let members = members(vec![UserProfile::new("u1", "a"), UserProfile::new("u2", "b")]);
        let channel = Channel::direct("u1", "u2");
        let mut results = MentionResults::new();

        apply_context(
            &mut results,
            &MentionContext {
                post: &post,
                channel: &channel,
                members: &members,
                thread: None,
            },
        );

        assert_eq!(results.mention_type("u1"), Some(MentionType::DirectMessage));
        assert_eq!(results.mention_type("u2"), Some(MentionType::DirectMessage));
    }

    #[test]
    fn direct_message_with_self_mentions_nobody() {
        let channel = Channel::direct("u1", "u1");
        assert_eq!(channel.other_user_id_for_dm("u1"), None);
        assert_eq!(open_channel().other_user_id_for_dm("u1"), None);
    }

    #[test]
    fn group_message_mentions_everyone_but_sender() {
        let post = Post::new("u1", "hi all");
        let members = members(vec![
            UserProfile::new("u1", "a"),
            UserProfile::new("u2", "b"),
            UserProfile::new("u3", "c"),
        ]);
        let channel = Channel {
            channel_type: ChannelType::Group,
            ..open_channel()
        };
        let mut results = MentionResults::new();
        results.add_mention("u3", MentionType::Keyword);

        apply_context(
            &mut results,
            &MentionContext {
                post: &post,
                channel: &channel,
                members: &members,
                thread: None,
            },
        );

        assert_eq!(results.mention_type("u1"), None);
        assert_eq!(results.mention_type("u2"), Some(MentionType::GroupMessage));
        assert_eq!(results.mention_type("u3"), Some(MentionType::Keyword));
    }

    #[test]
    fn added_user_gets_keyword_mention() {
        let mut post = Post::new("u1", "u2 added to the channel");
        post.post_type = "system_add_to_channel".to_string();
        post.props.insert("addedUserId".to_string(), json!("u2"));
        let members = members(vec![UserProfile::new("u1", "a")]);
        let channel = open_channel();
        let mut results = MentionResults::new();

        apply_context(
            &mut results,
            &MentionContext {
                post: &post,
                channel: &channel,
                members: &members,
                thread: None,
            },
        );

        assert_eq!(results.mention_type("u2"), Some(MentionType::Keyword));
    }

    #[test]
    fn thread_participants_follow_comment_settings() {
        let mut post = Post::new("u9", "reply");
        post.root_id = Some("p1".to_string());
        let members = members(vec![
            UserProfile::new("u1", "root_any").with_notify_prop("comments", "any"),
            UserProfile::new("u2", "reply_any").with_notify_prop("comments", "any"),
            UserProfile::new("u3", "reply_root").with_notify_prop("comments", "root"),
            UserProfile::new("u4", "never"),
            UserProfile::new("u9", "sender").with_notify_prop("comments", "any"),
        ]);
        let thread = Thread {
            posts: vec![
                ThreadPost {
                    id: "p1".to_string(),
                    user_id: "u1".to_string(),
                },
                ThreadPost {
                    id: "p2".to_string(),
                    user_id: "u2".to_string(),
                },
                ThreadPost {
                    id: "p3".to_string(),
                    user_id: "u3".to_string(),
                },
                ThreadPost {
                    id: "p4".to_string(),
                    user_id: "u4".to_string(),
                },
                ThreadPost {
                    id: "p5".to_string(),
                    user_id: "u9".to_string(),
                },
                ThreadPost {
                    id: "p6".to_string(),
                    user_id: "stranger".to_string(),
                },
            ],
        };
        let channel = open_channel();
        let mut results = MentionResults::new();

        apply_context(
            &mut results,
            &MentionContext {
                post: &post,
                channel: &channel,
                members: &members,
                thread: Some(&thread),
            },
        );

        assert_eq!(results.mention_type("u1"), Some(MentionType::Comment));
        assert_eq!(results.mention_type("u2"), Some(MentionType::Thread));
        assert_eq!(results.mention_type("u3"), None);
        assert_eq!(results.mention_type("u4"), None);
        assert_eq!(results.mention_type("u9"), None);
        assert_eq!(results.mention_type("stranger"), None);
    }

    #[test]
    fn thread_rules_need_a_reply() {
        let post = Post::new("u9", "top level");
        let members = members(vec![
            UserProfile::new("u1", "root_any").with_notify_prop("comments", "any"),
        ]);
        let thread = Thread {
            posts: vec![ThreadPost {
                id: "p1".to_string(),
                user_id: "u1".to_string(),
            }],
        };
        let channel = open_channel();
        let mut results = MentionResults::new();

        apply_context(
            &mut results,
            &MentionContext {
                post: &post,
                channel: &channel,
                members: &members,
                thread: Some(&thread),
            },
        );

        assert!(results.mentions.is_empty());
    }
}
