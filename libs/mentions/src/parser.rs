use tracing::trace;

use crate::{
    extract::{Post, text_runs},
    keywords::{
        ALL_MENTION, CHANNEL_MENTION, HERE_MENTION, KeywordIndex, SYSTEM_MENTIONS, is_multibyte,
    },
    results::MentionResults,
    types::{MentionType, MentionableId},
};

pub trait MentionParser {
    /// Scans one run of plain text, adding what it finds to the results.
    fn process_text(&mut self, text: &str);

    fn into_results(self) -> MentionResults;
}

/// Detects mentions in every mention-enabled field of `post`.
pub fn detect_mentions(post: &Post, keywords: &KeywordIndex) -> MentionResults {
    let mut parser = StandardMentionParser::new(keywords);

    for run in text_runs(post) {
        parser.process_text(&run);
    }

    parser.into_results()
}

pub struct StandardMentionParser<'k> {
    keywords: &'k KeywordIndex,
    multibyte_keywords: Vec<&'k str>,
    results: MentionResults,
}

impl<'k> StandardMentionParser<'k> {
    pub fn new(keywords: &'k KeywordIndex) -> Self {
        Self {
            keywords,
            multibyte_keywords: keywords.multibyte_keywords(),
            results: MentionResults::new(),
        }
    }

    fn process_word(&mut self, word: &str) {
        // `:word:` is an emoji shortcode.
        if word.starts_with(':') && word.ends_with(':') {
            return;
        }

        let word = word.trim_start_matches([':', '.', '-', '_']);

        if !self.check_for_mention(word) && !self.check_without_suffix(word) {
            if word.starts_with('@') && !is_system_mention(word) {
                // `@bob.and` still reaches bob; only an unmatched word is kept whole.
                let flags = self.broadcast_flags();
                let (matched, unmatched) = self.check_split_words(word);
                if matched {
                    self.push_potential_mentions(unmatched);
                } else {
                    // A word kept whole has no other effect on the results.
                    self.set_broadcast_flags(flags);
                    let trimmed = word.strip_suffix(['.', '-', ':']).unwrap_or(word);
                    self.push_potential_mentions([trimmed]);
                }
            } else if word.contains(['.', '-', ':']) {
                let (_, unmatched) = self.check_split_words(word);
                self.push_potential_mentions(unmatched);
            }
        }

        self.check_multibyte(word);
    }

    fn broadcast_flags(&self) -> (bool, bool, bool) {
        (
            self.results.here_mentioned,
            self.results.channel_mentioned,
            self.results.all_mentioned,
        )
    }

    fn set_broadcast_flags(&mut self, (here, channel, all): (bool, bool, bool)) {
        self.results.here_mentioned = here;
        self.results.channel_mentioned = channel;
        self.results.all_mentioned = all;
    }

    /// Checks each piece of `word` between `.`, `-` and `:`. Returns whether
    /// any piece matched, and the unmatched pieces that start with `@`.
    fn check_split_words<'w>(&mut self, word: &'w str) -> (bool, Vec<&'w str>) {
        let mut matched = false;
        let mut unmatched = Vec::new();

        for part in word.split(['.', '-', ':']).filter(|part| !part.is_empty()) {
            if self.check_for_mention(part) {
                matched = true;
            } else if part.starts_with('@') && !is_system_mention(part) {
                unmatched.push(part);
            }
        }

        (matched, unmatched)
    }

    /// Strips trailing `.`, `-`, `:` and `_` one at a time, retrying after each.
    fn check_without_suffix(&mut self, word: &str) -> bool {
        let mut candidate = word;

        while let Some(shorter) = candidate.strip_suffix(['.', '-', ':', '_']) {
            candidate = shorter;
            if candidate.is_empty() {
                break;
            }
            if self.check_for_mention(candidate) {
                return true;
            }
        }

        false
    }

    fn check_for_mention(&mut self, word: &str) -> bool {
        let lowered = word.to_lowercase();

        let mention_type = match lowered.as_str() {
            HERE_MENTION => {
                self.results.here_mentioned = true;
                MentionType::Channel
            }
            CHANNEL_MENTION => {
                self.results.channel_mentioned = true;
                MentionType::Channel
            }
            ALL_MENTION => {
                self.results.all_mentioned = true;
                MentionType::Channel
            }
            _ => MentionType::Keyword,
        };

        // Lower-cased first, then as written to catch case-sensitive first names.
        let keywords = self.keywords;
        let Some(ids) = keywords.get(&lowered).or_else(|| keywords.get(word)) else {
            return false;
        };

        trace!(word, kind = %mention_type, "matched mention keyword");
        self.add_mentions(ids, mention_type);
        true
    }

    fn check_multibyte(&mut self, word: &str) {
        if !is_multibyte(word) {
            return;
        }

        let keywords = self.keywords;
        let Some(ids) = self
            .multibyte_keywords
            .iter()
            .find(|keyword| word.contains(**keyword))
            .and_then(|keyword| keywords.get(keyword))
        else {
            return;
        };

        trace!(word, "matched multibyte keyword");
        self.add_mentions(ids, MentionType::Keyword);
    }

    fn add_mentions(&mut self, ids: &[MentionableId], mention_type: MentionType) {
        for id in ids {
            match id {
                MentionableId::User(user_id) => self.results.add_mention(user_id, mention_type),
                MentionableId::Group(group_id) => self.results.add_group_mention(group_id),
            }
        }
    }

    fn push_potential_mentions<'w>(&mut self, words: impl IntoIterator<Item = &'w str>) {
        for word in words {
            let name = word.strip_prefix('@').unwrap_or(word);
            self.results.other_potential_mentions.push(name.to_string());
        }
    }
}

impl MentionParser for StandardMentionParser<'_> {
    fn process_text(&mut self, text: &str) {
        for word in text.split(|c: char| !is_mention_char(c)) {
            if !word.is_empty() {
                self.process_word(word);
            }
        }
    }

    fn into_results(self) -> MentionResults {
        self.results
    }
}

/// Letters, digits and the punctuation that can appear inside a mention or emoji.
fn is_mention_char(c: char) -> bool {
    matches!(c, ':' | '.' | '-' | '_' | '@') || c.is_alphabetic() || c.is_numeric()
}

/// `@here`, `@channel` or `@all` in any case, ignoring trailing punctuation.
fn is_system_mention(word: &str) -> bool {
    let word = word.trim_end_matches(['.', '-', ':', '_']);
    SYSTEM_MENTIONS
        .iter()
        .any(|system| system.eq_ignore_ascii_case(word))
}
