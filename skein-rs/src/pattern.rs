//! Patterns used by scripts to wait on incoming lines.
//!
//! | Mode | Script command | Description |
//! |------|----------------|-------------|
//! | [`MatchMode::Regexp`] | `matchre`, `waitforre` | [`regex`] crate, case-sensitive unless the pattern says `(?i)` |
//! | [`MatchMode::Substr`] | `match`, `waitfor`     | plain substring search |

use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

/// Which matching algorithm a [`Pattern`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Regexp,
    Substr,
}

/// Error returned when a pattern cannot be compiled.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("regex error: {0}")]
    InvalidRegex(#[from] regex::Error),
}

#[derive(Clone)]
enum Compiled {
    Regex(Arc<Regex>),
    Substr,
}

/// A compiled pattern ready for matching.
#[derive(Clone)]
pub struct Pattern {
    src: String,
    mode: MatchMode,
    compiled: Compiled,
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("src", &self.src)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Pattern {
    /// Compile `src` using `mode`.
    pub fn new(src: &str, mode: MatchMode) -> Result<Self, PatternError> {
        let compiled = match mode {
            MatchMode::Regexp => Compiled::Regex(Arc::new(Regex::new(src)?)),
            MatchMode::Substr => Compiled::Substr,
        };
        Ok(Self {
            src: src.to_owned(),
            mode,
            compiled,
        })
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn matches(&self, text: &str) -> bool {
        match &self.compiled {
            Compiled::Regex(re) => re.is_match(text),
            Compiled::Substr => text.contains(self.src.as_str()),
        }
    }

    /// Attempt a match and return the capture groups on success.
    ///
    /// Group 0 is the whole match.  Substring patterns have only group 0.
    pub fn find(&self, text: &str) -> Option<Captures> {
        match &self.compiled {
            Compiled::Regex(re) => {
                let caps = re.captures(text)?;
                let groups = caps
                    .iter()
                    .map(|m| m.map(|m| m.as_str().to_owned()).unwrap_or_default())
                    .collect();
                Some(Captures { groups })
            }
            Compiled::Substr => {
                if text.contains(self.src.as_str()) {
                    Some(Captures {
                        groups: vec![self.src.clone()],
                    })
                } else {
                    None
                }
            }
        }
    }
}

/// Capture groups of a successful match; a group that did not participate
/// is the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    groups: Vec<String>,
}

impl Captures {
    pub fn whole(&self) -> &str {
        self.groups.first().map(String::as_str).unwrap_or("")
    }

    /// The nth group; 0 is the whole match.
    pub fn group(&self, n: usize) -> Option<&str> {
        self.groups.get(n).map(String::as_str)
    }

    /// Number of capture groups, excluding the overall match.
    pub fn group_count(&self) -> usize {
        self.groups.len().saturating_sub(1)
    }

    pub fn into_groups(self) -> Vec<String> {
        self.groups
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
