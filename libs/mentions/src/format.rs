use std::{collections::BTreeMap, fmt};

use crate::{results::MentionResults, types::MentionType};

/// Renders a mention map as `[id:type, id:type]` in id order, or `none`.
pub fn format_mentions(mentions: &BTreeMap<String, MentionType>) -> String {
    if mentions.is_empty() {
        return "none".to_string();
    }

    let entries: Vec<String> = mentions
        .iter()
        .map(|(id, mention_type)| format!("{id}:{mention_type}"))
        .collect();

    format!("[{}]", entries.join(", "))
}

impl fmt::Display for MentionResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user_mentions={} group_mentions={} here={} channel={} all={} other_potential_mentions=[{}]",
            format_mentions(&self.mentions),
            format_mentions(&self.group_mentions),
            self.here_mentioned,
            self.channel_mentioned,
            self.all_mentioned,
            self.other_potential_mentions.join(", "),
        )
    }
}
