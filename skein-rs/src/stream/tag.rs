//! Display-ready text units and their coalescing rule.

use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

/// A run of text with its destination window and styling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextTag {
    pub text: String,
    /// Destination window; empty means the main window.
    pub window: String,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub href: Option<String>,
    pub command: Option<String>,
    pub mono: bool,
    pub bold: bool,
    pub is_prompt: bool,
    pub preset: Option<String>,
    pub player_command: bool,
}

impl TextTag {
    pub fn new(text: impl Into<String>) -> Self {
        TextTag {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Two tags combine iff every field other than `text` is equal.
    pub fn can_combine_with(&self, other: &TextTag) -> bool {
        self.window == other.window
            && self.is_prompt == other.is_prompt
            && self.mono == other.mono
            && self.bold == other.bold
            && self.preset == other.preset
            && self.color == other.color
            && self.background_color == other.background_color
            && self.href == other.href
            && self.command == other.command
            && self.player_command == other.player_command
    }

    /// Merge adjacent compatible tags, preserving order.
    pub fn combine(tags: Vec<TextTag>) -> Vec<TextTag> {
        let mut out: Vec<TextTag> = Vec::with_capacity(tags.len());
        for tag in tags {
            match out.last_mut() {
                Some(last) if last.can_combine_with(&tag) => last.text.push_str(&tag.text),
                _ => out.push(tag),
            }
        }
        out
    }
}

// ── Entity unescaping ─────────────────────────────────────────────────────────

const ENTITIES: &[&str] = &["&gt;", "&lt;", "&amp;"];
const REPLACEMENTS: &[&str] = &[">", "<", "&"];

fn entity_matcher() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| {
        AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .build(ENTITIES)
    })
}

/// Replace `&gt;`, `&lt;` and `&amp;` with the characters they stand for.
pub fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    entity_matcher().replace_all(text, REPLACEMENTS)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
