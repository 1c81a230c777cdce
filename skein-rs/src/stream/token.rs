//! Token tree produced by the [`tokenizer`](super::tokenizer).
//!
//! A chunk of game-stream text is a flat sequence of [`Token`]s; a tag that
//! is closed normally owns the complete token tree between its opening and
//! closing markers as its children.

use regex::Regex;

/// One node of the parsed game stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Tag {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<Token>,
    },
}

impl Token {
    /// Build a tag node (mostly useful in tests).
    pub fn tag(
        name: impl Into<String>,
        attrs: &[(&str, &str)],
        children: Vec<Token>,
    ) -> Self {
        Token::Tag {
            name: name.into(),
            attrs: attrs
                .iter()
                .map(|&(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Token::Text(text.into())
    }

    /// Tag name, `"text"` for character data, or `"eot"` for a text node
    /// that is exactly one newline.
    pub fn name(&self) -> &str {
        match self {
            Token::Text(t) if t == "\n" => "eot",
            Token::Text(_) => "text",
            Token::Tag { name, .. } => name,
        }
    }

    /// First attribute named `key` (attribute keys are case-sensitive).
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Token::Text(_) => None,
            Token::Tag { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
        }
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attr(key).is_some()
    }

    pub fn children(&self) -> &[Token] {
        match self {
            Token::Text(_) => &[],
            Token::Tag { children, .. } => children,
        }
    }

    /// Character data of this node.
    ///
    /// Text nodes yield their own text; a tag joins the values of its
    /// children with `separator`, recursively.
    pub fn value(&self, separator: &str) -> String {
        match self {
            Token::Text(t) => t.clone(),
            Token::Tag { children, .. } => children
                .iter()
                .map(|c| c.value(separator))
                .collect::<Vec<_>>()
                .join(separator),
        }
    }

    /// Children that appear between `pushbold` and `popbold` markers,
    /// excluding any whose value matches `ignore`.
    pub fn monsters(&self, ignore: Option<&Regex>) -> Vec<&Token> {
        let mut out = Vec::new();
        let mut capture = false;
        for child in self.children() {
            match child.name() {
                "pushbold" => capture = true,
                "popbold" => capture = false,
                _ if capture => {
                    let skip = ignore.is_some_and(|re| re.is_match(&child.value("")));
                    if !skip {
                        out.push(child);
                    }
                }
                _ => {}
            }
        }
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
