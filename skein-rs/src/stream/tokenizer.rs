//! Game-stream tokenizer.
//!
//! Parses one chunk of protocol text into a [`Token`] tree.  Every call is a
//! fresh parse; nothing is buffered across chunks.
//!
//! Grammar, informally:
//!
//! ```text
//! chunk    := (text | tag)*
//! tag      := '<' name (' ' attr*)? ( '/>' | '>' chunk '</' … '>' )
//! attr     := key '=' DELIM value DELIM
//! ```
//!
//! `DELIM` is whatever character follows `=` (normally `"` or `'`).  The
//! `subtitle` attribute of `streamwindow` is the exception: its value runs
//! up to and including the first `]`.
//!
//! Truncated input is not an error: parsing stops and the completed tokens
//! are returned.

use tracing::debug;

use super::token::Token;

/// Parse `text` into a sequence of tokens.
pub fn read(text: &str) -> Vec<Token> {
    let mut cur = Cursor::new(text);
    let mut tokens = Vec::new();

    loop {
        cur.read_text(&mut tokens);
        if cur.at_end() {
            break;
        }
        // A closing marker with nothing open: drop it and keep going.
        if cur.closing_tag_next() {
            debug!("tokenizer: stray closing tag at offset {}", cur.pos);
            cur.consume_closing_tag();
            continue;
        }
        match cur.read_tag() {
            TagOutcome::Tag(tag) => tokens.push(tag),
            TagOutcome::Dropped => {}
            TagOutcome::Truncated => break,
        }
    }

    tokens
}

// ── Cursor ────────────────────────────────────────────────────────────────────

enum TagOutcome {
    Tag(Token),
    /// Malformed tag header; the bytes were consumed and nothing is emitted.
    Dropped,
    /// Input ended before the tag was complete.
    Truncated,
}

/// Byte cursor over the chunk.  All structural characters are ASCII, so
/// positions always land on UTF-8 boundaries when we slice.
struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn eat(&mut self, ch: u8) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn skip_spaces(&mut self) {
        while self.eat(b' ') {}
    }

    fn closing_tag_next(&self) -> bool {
        self.peek() == Some(b'<') && self.peek2() == Some(b'/')
    }

    fn consume_closing_tag(&mut self) {
        self.take_while(|c| c != b'>');
        self.eat(b'>');
    }

    /// Character data up to the next `<`.
    fn read_text(&mut self, out: &mut Vec<Token>) {
        let text = self.take_while(|c| c != b'<');
        if !text.is_empty() {
            out.push(Token::Text(lossy(text)));
        }
    }

    fn read_tag(&mut self) -> TagOutcome {
        self.eat(b'<');
        let name = lossy(self.take_while(|c| c != b'/' && c != b'>' && c != b' ')).to_lowercase();
        let mut attrs = Vec::new();

        loop {
            match self.peek() {
                None => return TagOutcome::Truncated,
                Some(b'/') => {
                    self.advance();
                    return match self.peek() {
                        None => TagOutcome::Truncated,
                        Some(b'>') => {
                            self.advance();
                            TagOutcome::Tag(Token::Tag {
                                name,
                                attrs,
                                children: Vec::new(),
                            })
                        }
                        Some(_) => TagOutcome::Dropped,
                    };
                }
                Some(b'>') => {
                    self.advance();
                    return match self.read_children() {
                        Some(children) => TagOutcome::Tag(Token::Tag {
                            name,
                            attrs,
                            children,
                        }),
                        None => TagOutcome::Truncated,
                    };
                }
                Some(b' ') => attrs = self.read_attrs(&name),
                Some(_) => return TagOutcome::Dropped,
            }
        }
    }

    /// Tokens up to the closing marker, which is consumed.  `None` when the
    /// input ends first.
    fn read_children(&mut self) -> Option<Vec<Token>> {
        let mut children = Vec::new();
        loop {
            self.read_text(&mut children);
            if self.at_end() {
                return None;
            }
            if self.closing_tag_next() {
                self.consume_closing_tag();
                return Some(children);
            }
            match self.read_tag() {
                TagOutcome::Tag(tag) => children.push(tag),
                TagOutcome::Dropped => {}
                TagOutcome::Truncated => return None,
            }
        }
    }

    fn read_attrs(&mut self, tag_name: &str) -> Vec<(String, String)> {
        let mut attrs = Vec::new();
        self.skip_spaces();
        while let Some(c) = self.peek() {
            if c == b'>' || c == b'/' {
                break;
            }
            if let Some(attr) = self.read_attr(tag_name) {
                attrs.push(attr);
            }
            self.skip_spaces();
        }
        attrs
    }

    fn read_attr(&mut self, tag_name: &str) -> Option<(String, String)> {
        let key = self.take_while(|c| c != b'=');
        if key.is_empty() {
            // Bare `=`: step over it so the loop makes progress.
            self.advance();
            return None;
        }
        let key = lossy(key);
        self.eat(b'=');
        let delim = self.advance()?;

        let mut value = Vec::new();
        if key == "subtitle" && tag_name == "streamwindow" {
            self.read_quoted(b']', &mut value);
            value.push(b']');
            self.eat(b']');
        } else {
            self.read_quoted(delim, &mut value);
        }
        self.eat(delim);

        Some((key, lossy(&value)))
    }

    /// Copy bytes into `out` until `end`.  A backslash or carriage return
    /// takes the following byte verbatim.
    fn read_quoted(&mut self, end: u8, out: &mut Vec<u8>) {
        while let Some(c) = self.peek() {
            if c == end {
                break;
            }
            self.advance();
            match c {
                b'\\' | b'\r' => {
                    if let Some(next) = self.advance() {
                        out.push(next);
                    }
                }
                _ => out.push(c),
            }
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
