//! Mention detection for chat messages.
//!
//! A [`KeywordIndex`] is built per message from the channel's members and
//! groups, [`detect_mentions`] walks the message body and attachments, and
//! [`apply_context`] layers on the mentions implied by the channel and thread.
//! Nothing here performs I/O or keeps state between messages.

pub mod enrich;
pub mod extract;
pub mod format;
pub mod keywords;
pub mod parser;
pub mod results;
pub mod types;

pub use enrich::{Channel, ChannelType, MentionContext, Thread, ThreadPost, apply_context};
pub use extract::{Attachment, AttachmentField, Post, TextRuns, mentions_enabled_fields};
pub use format::format_mentions;
pub use keywords::{
    BroadcastPolicy, ChannelNotifyProps, CommentsNotify, Group, IgnoreChannelMentions,
    KeywordIndex, MarkUnread, MemberState, UserProfile, UserStatus, build_keyword_index,
};
pub use parser::{MentionParser, StandardMentionParser, detect_mentions};
pub use results::MentionResults;
pub use types::{MentionType, MentionableId};
