//! Formatted message text rendering
//!
//! Messages carry plain text plus formatting entities whose offsets and
//! lengths count UTF-16 code units. The archive stores the HTML markup the
//! platform itself emits for such text.

use serde::{Deserialize, Serialize};

/// Entity kinds that can appear on message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Spoiler,
    Code,
    Pre,
    Blockquote,
    TextLink,
    TextMention,
    Mention,
    Hashtag,
    Cashtag,
    BotCommand,
    Url,
    Email,
    PhoneNumber,
    #[serde(other)]
    Other,
}

/// A formatting span over message text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Offset in UTF-16 code units
    pub offset: usize,
    /// Length in UTF-16 code units
    pub length: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub language: Option<String>,
}

impl MessageEntity {
    pub fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
            url: None,
            user_id: None,
            language: None,
        }
    }

    fn tags(&self) -> Option<(String, &'static str)> {
        let tags = match self.kind {
            EntityKind::Bold => ("<b>".to_string(), "</b>"),
            EntityKind::Italic => ("<i>".to_string(), "</i>"),
            EntityKind::Underline => ("<u>".to_string(), "</u>"),
            EntityKind::Strikethrough => ("<s>".to_string(), "</s>"),
            EntityKind::Spoiler => ("<spoiler>".to_string(), "</spoiler>"),
            EntityKind::Code => ("<code>".to_string(), "</code>"),
            EntityKind::Blockquote => ("<blockquote>".to_string(), "</blockquote>"),
            EntityKind::Pre => match &self.language {
                Some(lang) if !lang.is_empty() => {
                    (format!("<pre language=\"{}\">", escape_html(lang)), "</pre>")
                }
                _ => ("<pre>".to_string(), "</pre>"),
            },
            EntityKind::TextLink => {
                let url = self.url.as_deref()?;
                (format!("<a href=\"{}\">", escape_html(url)), "</a>")
            }
            EntityKind::TextMention => {
                let user_id = self.user_id?;
                (format!("<a href=\"tg://user?id={}\">", user_id), "</a>")
            }
            _ => return None,
        };
        Some(tags)
    }
}

/// Escape `&`, `<`, `>`, `"` and `'` for inclusion in HTML
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

struct Span {
    start: usize,
    end: usize,
    open: String,
    close: &'static str,
}

/// Render text with formatting entities into HTML markup
///
/// Entities that do not map to markup (mentions, hashtags, bare URLs) are
/// left as plain escaped text. Ranges past the end of the text are clamped.
pub fn render_html(text: &str, entities: &[MessageEntity]) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();
    let len = units.len();

    let mut spans: Vec<Span> = entities
        .iter()
        .filter_map(|entity| {
            let (open, close) = entity.tags()?;
            let start = entity.offset.min(len);
            let end = entity.offset.saturating_add(entity.length).min(len);
            (start < end).then_some(Span {
                start,
                end,
                open,
                close,
            })
        })
        .collect();

    if spans.is_empty() {
        return escape_html(text);
    }

    // Outer spans open first
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut boundaries: Vec<usize> = spans.iter().flat_map(|s| [s.start, s.end]).collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut out = String::with_capacity(text.len() + spans.len() * 8);
    let mut cursor = 0;
    for pos in boundaries {
        out.push_str(&escape_html(&String::from_utf16_lossy(&units[cursor..pos])));
        cursor = pos;

        for span in spans.iter().rev().filter(|s| s.end == pos) {
            out.push_str(span.close);
        }
        for span in spans.iter().filter(|s| s.start == pos) {
            out.push_str(&span.open);
        }
    }
    out.push_str(&escape_html(&String::from_utf16_lossy(&units[cursor..])));

    out
}
