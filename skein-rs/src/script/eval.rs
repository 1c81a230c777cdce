//! Script expressions: plain expression text, function calls, and mixtures
//! of the two.
//!
//! A condition such as `tolower("$x") == one` is split into a
//! [`ScriptExpression::Sequence`] of a function call and the text around it.
//! Function results are spliced back into the text, which is then evaluated
//! as a single [`expr`](super::expr) expression.

use tracing::trace;

use super::builtins::{self, trim_quotes};
use super::expr;
use super::value::{format_number, Value};
use crate::var::{GlobalVars, VarStore};

// ── EvalContext ───────────────────────────────────────────────────────────────

/// What built-in functions may ask of their environment.
pub trait EvalContext {
    /// Whether a global variable named `name` exists.
    fn has_global(&self, name: &str) -> bool;
}

impl EvalContext for GlobalVars {
    fn has_global(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl EvalContext for VarStore {
    fn has_global(&self, name: &str) -> bool {
        self.contains(name)
    }
}

// ── ScriptExpression ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptExpression {
    Value(String),
    Function { name: String, args: Vec<String> },
    Sequence(Vec<ScriptExpression>),
}

/// Outcome of an evaluation.
///
/// `text` is the expression as evaluated (for diagnostics), `result` the
/// value, and `groups` any capture groups produced by `matchre` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalResult {
    pub text: String,
    pub result: String,
    pub groups: Vec<String>,
}

impl ScriptExpression {
    /// Split `text` into function calls and the plain text between them.
    pub fn parse(text: &str) -> ScriptExpression {
        let mut parts = Vec::new();
        let mut plain_start = 0;
        let mut pos = 0;
        let bytes = text.as_bytes();
        let mut in_quotes = false;

        while pos < bytes.len() {
            let c = bytes[pos];
            if c == b'"' {
                in_quotes = !in_quotes;
                pos += 1;
                continue;
            }
            if in_quotes || !is_ident_start(c) || (pos > 0 && blocks_call(bytes[pos - 1])) {
                pos += 1;
                continue;
            }

            let name_end = pos + bytes[pos..].iter().take_while(|&&b| is_ident(b)).count();
            if bytes.get(name_end) != Some(&b'(') {
                pos = name_end;
                continue;
            }
            let Some(close) = matching_paren(text, name_end) else {
                pos = name_end;
                continue;
            };

            if plain_start < pos {
                parts.push(ScriptExpression::Value(text[plain_start..pos].to_owned()));
            }
            parts.push(ScriptExpression::Function {
                name: text[pos..name_end].to_owned(),
                args: split_args(&text[name_end + 1..close]),
            });
            pos = close + 1;
            plain_start = pos;
        }

        if parts.is_empty() {
            return ScriptExpression::Value(text.to_owned());
        }
        if plain_start < text.len() {
            parts.push(ScriptExpression::Value(text[plain_start..].to_owned()));
        }

        let significant: Vec<&ScriptExpression> = parts
            .iter()
            .filter(|p| !matches!(p, ScriptExpression::Value(v) if v.trim().is_empty()))
            .collect();
        if let [only @ ScriptExpression::Function { .. }] = significant.as_slice() {
            return (*only).clone();
        }
        ScriptExpression::Sequence(parts)
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// A name preceded by one of these is part of a larger word or a variable
/// reference, not a function call.
fn blocks_call(prev: u8) -> bool {
    is_ident(prev) || matches!(prev, b'%' | b'$' | b'&' | b'.')
}

/// Index of the `)` closing the `(` at `open`, skipping quoted text.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    for (i, c) in text.bytes().enumerate().skip(open) {
        match c {
            b'"' => in_quotes = !in_quotes,
            b'(' if !in_quotes => depth += 1,
            b')' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are outside quotes and parentheses.
fn split_args(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                args.push(inner[start..i].trim().to_owned());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim().to_owned());
    args
}

// ── Evaluation ────────────────────────────────────────────────────────────────

/// Evaluate as a condition; `result` is `"true"` or `"false"`, or the error
/// text of a failed function call.
pub fn evaluate_bool(e: &ScriptExpression, ctx: &dyn EvalContext) -> EvalResult {
    match e {
        ScriptExpression::Value(v) => EvalResult {
            text: v.clone(),
            result: expr::evaluate_logic(v).to_string(),
            groups: Vec::new(),
        },
        ScriptExpression::Function { name, args } => match call_function(name, args, ctx) {
            Ok(mut r) => {
                r.result = Value::parse(&r.result).truthy().to_string();
                r
            }
            Err(r) => r,
        },
        ScriptExpression::Sequence(parts) => {
            let (joined, mut groups) = splice(parts, ctx);
            let mut r = evaluate_bool(&ScriptExpression::Value(joined), ctx);
            groups.append(&mut r.groups);
            r.groups = groups;
            r
        }
    }
}

/// Evaluate to text.  Text that is not a valid expression is returned as
/// is, minus surrounding quotes.
pub fn evaluate_str(e: &ScriptExpression, ctx: &dyn EvalContext) -> EvalResult {
    match e {
        ScriptExpression::Value(v) => EvalResult {
            text: v.clone(),
            result: match expr::evaluate(v) {
                Ok(value) => value.to_string(),
                Err(_) => trim_quotes(v.trim()).to_owned(),
            },
            groups: Vec::new(),
        },
        ScriptExpression::Function { name, args } => {
            call_function(name, args, ctx).unwrap_or_else(|err| err)
        }
        ScriptExpression::Sequence(parts) => {
            let (joined, mut groups) = splice(parts, ctx);
            let mut r = evaluate_str(&ScriptExpression::Value(joined), ctx);
            groups.append(&mut r.groups);
            r.groups = groups;
            r
        }
    }
}

/// Evaluate as arithmetic.  Anything that is not a number yields `"0"`.
pub fn evaluate_value(e: &ScriptExpression, ctx: &dyn EvalContext) -> EvalResult {
    match e {
        ScriptExpression::Value(v) => match expr::evaluate_number(v) {
            Ok(n) => EvalResult {
                text: v.clone(),
                result: format_number(n),
                groups: Vec::new(),
            },
            Err(err) => {
                trace!("evaluate_value: {v:?}: {err}");
                EvalResult {
                    text: v.clone(),
                    result: "0".to_owned(),
                    groups: Vec::new(),
                }
            }
        },
        ScriptExpression::Function { name, args } => {
            call_function(name, args, ctx).unwrap_or_else(|err| err)
        }
        ScriptExpression::Sequence(parts) => {
            let (joined, mut groups) = splice(parts, ctx);
            let mut r = evaluate_value(&ScriptExpression::Value(joined), ctx);
            groups.append(&mut r.groups);
            r.groups = groups;
            r
        }
    }
}

/// Run a function call.  Unquoted arguments that themselves contain calls
/// are evaluated first.  A failure comes back as an `EvalResult` whose
/// result is the error message.
fn call_function(
    name: &str,
    args: &[String],
    ctx: &dyn EvalContext,
) -> Result<EvalResult, EvalResult> {
    let mut groups = Vec::new();
    let args: Vec<String> = args
        .iter()
        .map(|arg| {
            if arg.starts_with('"') {
                return arg.clone();
            }
            match ScriptExpression::parse(arg) {
                ScriptExpression::Value(_) => arg.clone(),
                nested => {
                    let mut r = evaluate_str(&nested, ctx);
                    groups.append(&mut r.groups);
                    r.result
                }
            }
        })
        .collect();

    let text = format!(
        "{name}({})",
        args.iter()
            .map(|a| format!("\"{}\"", trim_quotes(a)))
            .collect::<Vec<_>>()
            .join(", ")
    );

    match builtins::call(name, &args, ctx) {
        Ok(out) => {
            groups.extend(out.groups);
            Ok(EvalResult {
                text,
                result: out.text,
                groups,
            })
        }
        Err(err) => Err(EvalResult {
            text: name.to_owned(),
            result: err.to_string(),
            groups: Vec::new(),
        }),
    }
}

/// Replace each function in `parts` with its result and join everything
/// into one expression string.
fn splice(parts: &[ScriptExpression], ctx: &dyn EvalContext) -> (String, Vec<String>) {
    let mut groups = Vec::new();
    let mut joined = String::new();
    for part in parts {
        match part {
            ScriptExpression::Value(v) => joined.push_str(v),
            other => {
                let mut r = evaluate_str(other, ctx);
                groups.append(&mut r.groups);
                joined.push_str(&quote_operand(&r.result));
            }
        }
    }
    (joined, groups)
}

/// Quote a spliced result unless it already reads as one operand.
fn quote_operand(s: &str) -> String {
    let plain = !s.is_empty()
        && !s.chars().any(|c| {
            c.is_whitespace() || matches!(c, '(' | ')' | '=' | '!' | '<' | '>' | '+' | '*' | '/' | '&' | '|' | '%')
        });
    if plain || s.contains('"') {
        s.to_owned()
    } else {
        format!("\"{s}\"")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
