use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::MentionType;

/// Accumulated outcome of a mention detection pass.
///
/// Created empty per message, filled by the parser, then optionally adjusted
/// by [`crate::enrich`] before being read by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct MentionResults {
    /// User id to the highest priority way that user was mentioned.
    pub mentions: BTreeMap<String, MentionType>,

    /// Group id to how it was mentioned (always [`MentionType::Group`]).
    pub group_mentions: BTreeMap<String, MentionType>,

    /// `@words` that looked like mentions but matched no keyword, in order of appearance.
    pub other_potential_mentions: Vec<String>,

    pub here_mentioned: bool,
    pub channel_mentioned: bool,
    pub all_mentioned: bool,
}

impl MentionResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mention, keeping whichever of the old and new types ranks higher.
    pub fn add_mention(&mut self, user_id: &str, mention_type: MentionType) {
        if let Some(current) = self.mentions.get(user_id)
            && *current >= mention_type
        {
            return;
        }

        self.mentions.insert(user_id.to_string(), mention_type);
    }

    pub fn remove_mention(&mut self, user_id: &str) {
        self.mentions.remove(user_id);
    }

    pub fn add_group_mention(&mut self, group_id: &str) {
        self.group_mentions
            .insert(group_id.to_string(), MentionType::Group);
    }

    pub fn mention_type(&self, user_id: &str) -> Option<MentionType> {
        self.mentions.get(user_id).copied()
    }

    /// True when the id was named directly, or a broadcast word addressed everyone.
    pub fn is_user_mentioned(&self, user_id: &str) -> bool {
        if self.mentions.contains_key(user_id) || self.group_mentions.contains_key(user_id) {
            return true;
        }

        self.here_mentioned || self.all_mentioned || self.channel_mentioned
    }

    pub fn has_broadcast(&self) -> bool {
        self.here_mentioned || self.channel_mentioned || self.all_mentioned
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
            && self.group_mentions.is_empty()
            && self.other_potential_mentions.is_empty()
            && !self.has_broadcast()
    }
}
