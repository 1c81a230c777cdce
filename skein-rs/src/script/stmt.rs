//! Line classification for script source.
//!
//! Scripts are executed line by line from an instruction pointer, so there
//! is no statement tree.  Each line is classified once at load time into a
//! [`Line`]; conditional lines keep their condition and body as raw text
//! because substitution must happen when the line runs, not when it loads.
//!
//! | Line                          | Classified as                          |
//! |-------------------------------|----------------------------------------|
//! | blank                         | [`Line::Blank`]                        |
//! | `# …`, `// …`                 | [`Line::Comment`]                      |
//! | `name:`                       | [`Line::Label`]                        |
//! | `{` / `}`                     | [`Line::BlockStart`] / [`Line::BlockEnd`] |
//! | `if <cond> [then] <body>`     | [`Line::If`]                           |
//! | `else if <cond> [then] <body>`| [`Line::ElseIf`]                       |
//! | `else <body>`                 | [`Line::Else`]                         |
//! | anything else                 | [`Line::Command`]                      |

/// What a conditional tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `if_N`: at least N arguments were passed.
    ArgCount(usize),
    /// Expression text, substituted when evaluated.
    Expr(String),
}

/// Where a conditional's body lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// A statement after the condition: `if x then echo hi`.
    Inline(String),
    /// A block opened on this line: `if x {`.
    Block,
    /// A block opened and closed on this line: `if x { echo hi }`.
    BlockInline(String),
    /// Nothing after the condition; the body is the next line, which may be
    /// a lone `{`.
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Blank,
    Comment,
    Label(String),
    BlockStart,
    BlockEnd,
    If { cond: Condition, body: Body },
    ElseIf { cond: Condition, body: Body },
    Else { body: Body },
    Command(String),
}

impl Line {
    /// How much this line changes brace depth.
    pub fn brace_delta(&self) -> i32 {
        match self {
            Line::BlockStart => 1,
            Line::BlockEnd => -1,
            Line::If { body: Body::Block, .. }
            | Line::ElseIf { body: Body::Block, .. }
            | Line::Else { body: Body::Block } => 1,
            _ => 0,
        }
    }

    /// Whether running this line leaves an if/else chain intact.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Line::If { .. } | Line::ElseIf { .. } | Line::Else { .. })
    }
}

// ── Classification ────────────────────────────────────────────────────────────

pub fn classify(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if line.starts_with('#') || line.starts_with("//") {
        return Line::Comment;
    }
    match line {
        "{" => return Line::BlockStart,
        "}" => return Line::BlockEnd,
        _ => {}
    }
    if let Some(name) = line.strip_suffix(':') {
        if !name.is_empty() && !name.contains(char::is_whitespace) {
            return Line::Label(name.to_owned());
        }
    }

    let (word, rest) = split_word(line);
    let lower = word.to_ascii_lowercase();

    if lower == "else" {
        let (next, after) = split_word(rest);
        if next.eq_ignore_ascii_case("if") || is_arg_count(next) {
            let (cond, body) = parse_conditional(next, after);
            return Line::ElseIf { cond, body };
        }
        return Line::Else { body: parse_body(rest) };
    }
    if lower.starts_with("else{") {
        return Line::Else { body: parse_body(&line[4..]) };
    }
    if lower == "if" || is_arg_count(word) {
        let (cond, body) = parse_conditional(word, rest);
        return Line::If { cond, body };
    }
    if lower.starts_with("if(") {
        let (cond, body) = parse_conditional("if", &line[2..]);
        return Line::If { cond, body };
    }
    Line::Command(raw.to_owned())
}

/// `if_3` style keyword.
fn is_arg_count(word: &str) -> bool {
    word.len() > 3
        && word[..3].eq_ignore_ascii_case("if_")
        && word[3..].bytes().all(|b| b.is_ascii_digit())
}

/// `keyword` is `if` or `if_N`; `rest` is everything after it.
fn parse_conditional(keyword: &str, rest: &str) -> (Condition, Body) {
    let (cond_text, body_text) = split_condition(rest);
    let cond = if is_arg_count(keyword) {
        Condition::ArgCount(keyword[3..].parse().unwrap_or(0))
    } else {
        Condition::Expr(cond_text.trim().to_owned())
    };
    (cond, parse_body(body_text))
}

/// Split `cond then body` or `cond { body }`.  The condition ends at the
/// first ` then` word or `{` outside double quotes.
fn split_condition(rest: &str) -> (&str, &str) {
    let bytes = rest.as_bytes();
    let mut in_quotes = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b'{' if !in_quotes => return (&rest[..i], &rest[i..]),
            b't' | b'T' if !in_quotes && is_then_at(rest, i) => {
                return (&rest[..i], &rest[i + 4..]);
            }
            _ => {}
        }
    }
    (rest, "")
}

fn is_then_at(s: &str, i: usize) -> bool {
    let Some(word) = s.get(i..i + 4) else { return false };
    if !word.eq_ignore_ascii_case("then") {
        return false;
    }
    let before = s[..i].chars().next_back();
    let after = s[i + 4..].chars().next();
    matches!(before, None | Some(' ' | '\t' | ')'))
        && matches!(after, None | Some(' ' | '\t' | '{'))
}

fn parse_body(text: &str) -> Body {
    let text = text.trim();
    if text.is_empty() {
        Body::Next
    } else if text == "{" {
        Body::Block
    } else if text.starts_with('{') && text.ends_with('}') && text.len() >= 2 {
        Body::BlockInline(text[1..text.len() - 1].trim().to_owned())
    } else {
        Body::Inline(text.to_owned())
    }
}

// ── Small utilities ───────────────────────────────────────────────────────────

/// Split off the first whitespace-delimited word.  `rest` keeps its
/// trailing whitespace.
pub fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Split `s` into whitespace-delimited words, honouring double-quoted
/// strings.  The quotes are removed.
pub fn split_args(s: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut quoted = false;

    for ch in s.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !cur.is_empty() || quoted {
                    args.push(std::mem::take(&mut cur));
                }
                quoted = false;
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() || quoted {
        args.push(cur);
    }
    args
}

/// Break `} else …` into `}` and `else …` so every brace that closes a
/// block sits on its own line.
pub fn split_leading_close(raw: &str) -> Option<(&str, &str)> {
    let line = raw.trim_start();
    let rest = line.strip_prefix('}')?.trim();
    if rest.is_empty() {
        None
    } else {
        Some(("}", rest))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
