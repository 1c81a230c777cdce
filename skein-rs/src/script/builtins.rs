//! Built-in script functions.
//!
//! Functions are looked up by lowercased name and argument count.  Every
//! argument arrives as text with surrounding double quotes removed, and every
//! function returns text; `true`/`false` results are the strings `"true"` and
//! `"false"`.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::eval::EvalContext;
use super::value::{format_number, parse_number};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunctionError {
    #[error("No function registered as {name}({arity})")]
    Missing { name: String, arity: usize },
    #[error("{0}")]
    Message(String),
}

/// Result text of a successful call, plus any capture groups it produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOutput {
    pub text: String,
    pub groups: Vec<String>,
}

impl From<String> for CallOutput {
    fn from(text: String) -> Self {
        CallOutput {
            text,
            groups: Vec::new(),
        }
    }
}

type Builtin = fn(&[String], &dyn EvalContext) -> Result<CallOutput, FunctionError>;

fn table() -> &'static HashMap<(&'static str, usize), Builtin> {
    static TABLE: OnceLock<HashMap<(&'static str, usize), Builtin>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let entries: [((&'static str, usize), Builtin); 23] = [
            (("contains", 2), contains),
            (("count", 2), count),
            (("countsplit", 2), countsplit),
            (("length", 1), length),
            (("len", 1), length),
            (("matchre", 2), matchre),
            (("tolower", 1), tolower),
            (("toupper", 1), toupper),
            (("tocaps", 1), toupper),
            (("trim", 1), trim),
            (("replace", 3), replace),
            (("replacere", 3), replacere),
            (("startswith", 2), startswith),
            (("endswith", 2), endswith),
            (("capitalize", 1), capitalize),
            (("titlecase", 1), capitalize),
            (("floor", 1), floor),
            (("ceil", 1), ceil),
            (("round", 1), round),
            (("def", 1), def),
            (("substring", 3), substring),
            (("substr", 3), substring),
            (("element", 2), element),
        ];
        entries.into_iter().collect()
    })
}

/// Call the builtin `name` with `args`.  The name is case-insensitive.
pub fn call(name: &str, args: &[String], ctx: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    let lower = name.to_lowercase();
    let func = table()
        .get(&(lower.as_str(), args.len()))
        .ok_or_else(|| FunctionError::Missing {
            name: lower.clone(),
            arity: args.len(),
        })?;
    let args: Vec<String> = args.iter().map(|a| trim_quotes(a).to_owned()).collect();
    func(&args, ctx)
}

pub fn is_builtin(name: &str) -> bool {
    let lower = name.to_lowercase();
    table().keys().any(|(n, _)| *n == lower)
}

pub fn trim_quotes(s: &str) -> &str {
    s.trim_matches('"')
}

fn bool_text(b: bool) -> CallOutput {
    CallOutput::from(if b { "true" } else { "false" }.to_owned())
}

fn number_arg(s: &str) -> f64 {
    parse_number(s).unwrap_or(0.0)
}

// ── Functions ─────────────────────────────────────────────────────────────────

fn contains(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(bool_text(a[0].to_lowercase().contains(&a[1].to_lowercase())))
}

fn tolower(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(a[0].to_lowercase().into())
}

fn toupper(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(a[0].to_uppercase().into())
}

fn trim(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(a[0].trim().to_owned().into())
}

fn replace(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(a[0].replace(a[1].as_str(), &a[2]).into())
}

fn startswith(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(bool_text(a[0].starts_with(a[1].as_str())))
}

fn endswith(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(bool_text(a[0].ends_with(a[1].as_str())))
}

fn floor(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(format_number(number_arg(&a[0]).floor()).into())
}

fn ceil(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(format_number(number_arg(&a[0]).ceil()).into())
}

/// Halves round away from zero.
fn round(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(format_number(number_arg(&a[0]).round()).into())
}

fn def(a: &[String], ctx: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(bool_text(ctx.has_global(&a[0])))
}

fn count(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    let n = if a[1].is_empty() { 0 } else { a[0].matches(a[1].as_str()).count() };
    Ok(n.to_string().into())
}

fn countsplit(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    let n = if a[1].is_empty() { 1 } else { a[0].split(a[1].as_str()).count() };
    Ok(n.to_string().into())
}

fn length(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    Ok(a[0].chars().count().to_string().into())
}

/// On a match the groups are the whole match followed by each group.  An
/// invalid pattern returns the source text unchanged.
fn matchre(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    let Ok(re) = Regex::new(&a[1]) else {
        return Ok(a[0].clone().into());
    };
    match re.captures(&a[0]) {
        Some(caps) => Ok(CallOutput {
            text: "true".to_owned(),
            groups: caps
                .iter()
                .map(|m| m.map(|m| m.as_str().to_owned()).unwrap_or_default())
                .collect(),
        }),
        None => Ok(bool_text(false)),
    }
}

fn replacere(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    match Regex::new(&a[1]) {
        Ok(re) => Ok(re.replace_all(&a[0], a[2].as_str()).into_owned().into()),
        Err(_) => Ok(a[0].clone().into()),
    }
}

fn capitalize(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    let mut chars = a[0].chars();
    let out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    };
    Ok(out.into())
}

/// `substring(s, start, len)` over characters.
fn substring(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    let chars: Vec<char> = a[0].chars().collect();
    let start: i64 = a[1].trim().parse().unwrap_or(0);
    let len: i64 = a[2].trim().parse().unwrap_or(0);

    if start < 0 || start as usize > chars.len() {
        return Err(FunctionError::Message("substring start index is out of bounds".into()));
    }
    let start = start as usize;
    if len < 0 || len as u64 > (chars.len() - start) as u64 {
        return Err(FunctionError::Message("substring end index is out of bounds".into()));
    }
    let end = start + len as usize;
    Ok(chars[start..end].iter().collect::<String>().into())
}

/// `element(index, list)`: the index-th entry of a `|`-separated list.
fn element(a: &[String], _: &dyn EvalContext) -> Result<CallOutput, FunctionError> {
    let Ok(idx) = a[0].trim().parse::<usize>() else {
        return Ok(String::new().into());
    };
    if a[1].is_empty() {
        return Ok(String::new().into());
    }
    Ok(a[1].split('|').nth(idx).unwrap_or("").to_owned().into())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
