//! Runtime value type for script expressions.
//!
//! Script text is untyped; a word becomes a [`Value`] when an expression is
//! evaluated.  `true`/`false` (any case) are booleans, anything that parses
//! as a finite number is a number, and everything else is text.

use std::cmp::Ordering;
use std::fmt;

/// An expression operand or result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Text(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl Value {
    /// Classify a bare word.
    pub fn parse(word: &str) -> Value {
        let word = word.trim();
        if word.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if word.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        match parse_number(word) {
            Some(n) => Value::Number(n),
            None => Value::Text(word.to_owned()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Truth of a value standing on its own: a number is true when it is
    /// non-zero, text is never true.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(_) => false,
        }
    }

    /// Truth of an `&&` / `||` operand: a number counts only when it is
    /// exactly 1.
    pub fn logic_operand(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n == 1.0,
            Value::Text(_) => false,
        }
    }

    /// `==` as scripts see it.
    ///
    /// A boolean equals a number only when the number is exactly 1 (`true`)
    /// or 0 (`false`), and never equals text.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Bool(b), Value::Number(n)) | (Value::Number(n), Value::Bool(b)) => {
                *n == if *b { 1.0 } else { 0.0 }
            }
            (Value::Bool(_), Value::Text(_)) | (Value::Text(_), Value::Bool(_)) => false,
            (Value::Number(a), Value::Number(b)) => a == b,
            (a, b) => a.to_string() == b.to_string(),
        }
    }

    /// Ordering for `<`, `<=`, `>`, `>=`: numeric when both sides are
    /// numbers, otherwise by text.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (a, b) => a.to_string().cmp(&b.to_string()),
        }
    }
}

/// Parse a finite number.  `nan` and `inf` spellings are text.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Render a number the way scripts print it: integral values without a
/// decimal point, others with at most two fractional digits.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    if !n.is_finite() {
        return n.to_string();
    }
    let s = format!("{n:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_owned()
    } else {
        s.to_owned()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
