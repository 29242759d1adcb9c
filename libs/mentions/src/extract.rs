use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

pub const FROM_WEBHOOK_PROP: &str = "from_webhook";
pub const ADDED_USER_ID_PROP: &str = "addedUserId";
pub const MENTION_HIGHLIGHT_DISABLED_PROP: &str = "mentionHighlightDisabled";
pub const ADD_TO_CHANNEL_POST_TYPE: &str = "system_add_to_channel";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub root_id: Option<String>,
    #[serde(default, rename = "type")]
    pub post_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub props: serde_json::Map<String, serde_json::Value>,
}

impl Post {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn from_webhook(&self) -> bool {
        self.prop_str(FROM_WEBHOOK_PROP) == Some("true")
    }

    pub fn mention_highlight_disabled(&self) -> bool {
        matches!(
            self.props.get(MENTION_HIGHLIGHT_DISABLED_PROP),
            Some(serde_json::Value::Bool(true))
        )
    }

    /// The user added by a `system_add_to_channel` post.
    pub fn added_user_id(&self) -> Option<&str> {
        if self.post_type != ADD_TO_CHANNEL_POST_TYPE {
            return None;
        }
        self.prop_str(ADDED_USER_ID_PROP)
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref().filter(|id| !id.is_empty())
    }

    fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    #[serde(default)]
    pub pretext: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub fields: Vec<AttachmentField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttachmentField {
    #[serde(default)]
    pub title: String,
    /// Free-form; only non-empty strings are scanned.
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub short: bool,
}

impl AttachmentField {
    pub fn new(title: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            title: title.into(),
            value,
            short: false,
        }
    }
}

/// Message body followed by every attachment pretext, text and string field
/// value that can carry mentions, in document order.
pub fn mentions_enabled_fields(post: &Post) -> Vec<&str> {
    let mut fields = vec![post.message.as_str()];

    for attachment in &post.attachments {
        if !attachment.pretext.is_empty() {
            fields.push(&attachment.pretext);
        }
        if !attachment.text.is_empty() {
            fields.push(&attachment.text);
        }

        fields.extend(
            attachment
                .fields
                .iter()
                .filter_map(|field| field.value.as_str())
                .filter(|value| !value.is_empty()),
        );
    }

    fields
}

/// Lazily flattens one markdown document into runs of plain text.
///
/// Adjacent text events are joined; any other node ends the current run.
/// Code spans, code blocks and raw HTML contribute nothing. Single pass: build
/// a new value to walk the document again.
pub struct TextRuns<'a> {
    events: Parser<'a>,
    buffer: String,
    code_block_depth: usize,
    finished: bool,
}

impl<'a> TextRuns<'a> {
    pub fn new(markdown: &'a str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        Self {
            events: Parser::new_ext(markdown, options),
            buffer: String::new(),
            code_block_depth: 0,
            finished: false,
        }
    }

    fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

impl Iterator for TextRuns<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        while let Some(event) = self.events.next() {
            match event {
                Event::Text(text) => {
                    if self.code_block_depth == 0 {
                        self.buffer.push_str(&text);
                    }
                    continue;
                }
                Event::Start(Tag::CodeBlock(_)) => self.code_block_depth += 1,
                Event::End(TagEnd::CodeBlock) => {
                    self.code_block_depth = self.code_block_depth.saturating_sub(1);
                    continue;
                }
                // Leaving a node does not interrupt the surrounding text.
                Event::End(_) => continue,
                _ => {}
            }

            if let Some(run) = self.flush() {
                return Some(run);
            }
        }

        self.finished = true;
        self.flush()
    }
}

/// Every text run of every mention-enabled field of the post.
pub fn text_runs(post: &Post) -> impl Iterator<Item = String> + '_ {
    mentions_enabled_fields(post).into_iter().flat_map(TextRuns::new)
}
