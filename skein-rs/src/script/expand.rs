//! Variable substitution.
//!
//! Runs over a script line before it is executed:
//!
//! | Sequence     | Meaning                                                  |
//! |--------------|----------------------------------------------------------|
//! | `%0` … `%9`  | Argument slot (`%0` is all arguments joined by spaces)   |
//! | `%name`      | Local variable                                           |
//! | `$name`      | Global variable                                          |
//! | `$1`, `&1`   | Capture group from the last successful match             |
//! | `%name[i]`   | Element `i` of a `|`-separated list (also `$name[i]`)    |
//! | `%name(i)`   | Same as `%name[i]`                                       |
//!
//! Names are not delimited: the longest defined name that prefixes the text
//! after the sigil wins, so `%tarantulaSkillSets` reads `tarantulaSkillSet`
//! followed by a literal `s`.  References that match nothing are left as
//! they are.
//!
//! Names can be built from other references (`%attacks_%weapon[%c]`), so
//! substitution repeats until the text stops changing.

use tracing::warn;

use crate::var::{GlobalVars, VarStore};

/// Everything a line can refer to.
pub struct Scope<'a> {
    pub locals: &'a VarStore,
    /// Argument slots `0` to `9`.
    pub args: &'a [String],
    pub captures: &'a [String],
    pub globals: &'a GlobalVars,
}

/// Substitute until the text reaches a fixed point or `max_passes` passes
/// have run.
pub fn expand(src: &str, scope: &Scope<'_>, max_passes: usize) -> String {
    let mut text = src.to_owned();
    for _ in 0..max_passes {
        let next = expand_once(&desugar_parens(&text), scope);
        if next == text {
            return next;
        }
        text = next;
    }
    warn!("expand: {src:?} did not settle after {max_passes} passes");
    text
}

/// One left-to-right substitution pass.
pub fn expand_once(src: &str, scope: &Scope<'_>) -> String {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;

    while let Some(sigil) = rest.chars().next() {
        let after = &rest[sigil.len_utf8()..];
        let consumed = match sigil {
            '%' => substitute_local(after, scope, &mut out),
            '$' => substitute_global(after, scope, &mut out),
            '&' => substitute_capture(after, scope, &mut out),
            _ => None,
        };
        match consumed {
            Some(n) => rest = &after[n..],
            None => {
                out.push(sigil);
                rest = after;
            }
        }
    }
    out
}

/// Each `substitute_*` returns the number of bytes of `after` it consumed,
/// or `None` when nothing matched and the sigil is literal.
fn substitute_local(after: &str, scope: &Scope<'_>, out: &mut String) -> Option<usize> {
    if let Some(d) = leading_digit(after) {
        let value = scope.args.get(d).map(String::as_str).unwrap_or("");
        return Some(1 + write_indexed('%', &after[..1], value, &after[1..], out));
    }
    let (name, value) = scope.locals.longest_prefix(after)?;
    Some(name.len() + write_indexed('%', name, value, &after[name.len()..], out))
}

fn substitute_global(after: &str, scope: &Scope<'_>, out: &mut String) -> Option<usize> {
    if leading_digit(after).is_some() {
        return substitute_capture(after, scope, out);
    }
    let (name, value) = scope.globals.longest_prefix(after)?;
    Some(name.len() + write_indexed('$', &name, &value, &after[name.len()..], out))
}

fn substitute_capture(after: &str, scope: &Scope<'_>, out: &mut String) -> Option<usize> {
    let d = leading_digit(after)?;
    let group = scope.captures.get(d)?;
    out.push_str(group);
    Some(1)
}

/// Write `value`, applying a `[i]` index if one follows the name.  Returns
/// how many bytes of `tail` were consumed.
///
/// An index that still holds references is left for a later pass: the
/// sigil and name are written back verbatim and the bracket is scanned
/// normally.  A non-numeric index leaves the brackets as text.
fn write_indexed(sigil: char, name: &str, value: &str, tail: &str, out: &mut String) -> usize {
    let Some(index) = tail.strip_prefix('[').and_then(|t| t.find(']').map(|end| &t[..end])) else {
        out.push_str(value);
        return 0;
    };

    if index.contains(['%', '$', '&']) {
        out.push(sigil);
        out.push_str(name);
        return 0;
    }
    match index.trim().parse::<usize>() {
        Ok(i) => {
            out.push_str(value.split('|').nth(i).unwrap_or(""));
            index.len() + 2
        }
        Err(_) => {
            out.push_str(value);
            0
        }
    }
}

fn leading_digit(s: &str) -> Option<usize> {
    s.chars().next()?.to_digit(10).map(|d| d as usize)
}

/// Rewrite `%name(3)` and `$name(3)` as `%name[3]` and `$name[3]`.
fn desugar_parens(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out = String::with_capacity(src.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !matches!(bytes[i], b'%' | b'$') {
            i += 1;
            continue;
        }
        let name_end = i + 1 + bytes[i + 1..]
            .iter()
            .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
            .count();
        if name_end == i + 1 || bytes.get(name_end) != Some(&b'(') {
            i = name_end.max(i + 1);
            continue;
        }
        let digits = bytes[name_end + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        let close = name_end + 1 + digits;
        if digits == 0 || bytes.get(close) != Some(&b')') {
            i = name_end;
            continue;
        }
        out.push_str(&src[copied..name_end]);
        out.push('[');
        out.push_str(&src[name_end + 1..close]);
        out.push(']');
        copied = close + 1;
        i = copied;
    }
    out.push_str(&src[copied..]);
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
