//! Script sources and load-time flattening.
//!
//! A [`ScriptLoader`] maps a script name to its lines.  [`flatten`] expands
//! `include` lines one level deep and builds the label table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::stmt::{classify, split_leading_close, split_word, Line};
use crate::error::{EngineError, Result};

/// Somewhere scripts can be read from.
pub trait ScriptLoader: Send + Sync {
    /// The lines of script `name`, or `None` when there is no such script.
    fn load(&self, name: &str) -> Option<Vec<String>>;
}

// ── FileLoader ────────────────────────────────────────────────────────────────

/// Loads `<dir>/<name>.<extension>`.
#[derive(Debug, Clone)]
pub struct FileLoader {
    dir: PathBuf,
    extension: String,
}

impl FileLoader {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for `name`, adding the extension unless it is already there.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let suffix = format!(".{}", self.extension);
        if self.extension.is_empty() || name.ends_with(&suffix) {
            self.dir.join(name)
        } else {
            self.dir.join(format!("{name}{suffix}"))
        }
    }

    /// Like [`ScriptLoader::load`] but reports why reading failed.
    pub fn read(&self, name: &str) -> Result<Vec<String>> {
        let path = self.path_for(name);
        let text = std::fs::read_to_string(&path)
            .map_err(|source| EngineError::Io { path, source })?;
        Ok(text.lines().map(|l| l.trim_end_matches('\r').to_owned()).collect())
    }
}

impl ScriptLoader for FileLoader {
    fn load(&self, name: &str) -> Option<Vec<String>> {
        match self.read(name) {
            Ok(lines) => Some(lines),
            Err(e) => {
                debug!("FileLoader: {e}");
                None
            }
        }
    }
}

// ── MemoryLoader ──────────────────────────────────────────────────────────────

/// Scripts held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    scripts: HashMap<String, Vec<String>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: &str) {
        let lines = source.lines().map(str::to_owned).collect();
        self.scripts.insert(name.into(), lines);
    }

    pub fn with(mut self, name: impl Into<String>, source: &str) -> Self {
        self.insert(name, source);
        self
    }
}

impl ScriptLoader for MemoryLoader {
    fn load(&self, name: &str) -> Option<Vec<String>> {
        self.scripts.get(name).cloned()
    }
}

// ── Flattening ────────────────────────────────────────────────────────────────

/// One line of a flattened script and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    /// Script the line was read from.
    pub file: String,
    /// 1-based line number within `file`.
    pub number: usize,
}

/// A script ready to run: lines with includes expanded, and labels.
#[derive(Debug, Clone)]
pub struct LoadedScript {
    pub name: String,
    pub lines: Vec<SourceLine>,
    pub kinds: Vec<Line>,
    /// Lowercased label name → index into `lines`.
    pub labels: HashMap<String, usize>,
}

/// Load `name` and splice in its includes.
///
/// Includes are one level deep: an `include` inside an included file is
/// dropped, as is a script including itself.  A missing include is skipped.
pub fn flatten(name: &str, loader: &dyn ScriptLoader) -> Result<LoadedScript> {
    let source = loader
        .load(name)
        .ok_or_else(|| EngineError::ScriptNotFound(name.to_owned()))?;

    let mut lines = Vec::with_capacity(source.len());
    for (i, text) in source.iter().enumerate() {
        let Some(target) = include_target(text) else {
            push_line(&mut lines, text, name, i + 1);
            continue;
        };
        if target == name {
            debug!("{name}: ignoring include of itself");
            continue;
        }
        let Some(included) = loader.load(target) else {
            warn!("{name}({}): include {target:?} not found", i + 1);
            continue;
        };
        debug!("{name}: including {target} ({} lines)", included.len());
        for (j, inner) in included.iter().enumerate() {
            if include_target(inner).is_some() {
                debug!("{target}({}): nested include dropped", j + 1);
                continue;
            }
            push_line(&mut lines, inner, target, j + 1);
        }
    }

    let kinds: Vec<Line> = lines.iter().map(|l| classify(&l.text)).collect();
    let mut labels = HashMap::new();
    for (idx, kind) in kinds.iter().enumerate() {
        if let Line::Label(label) = kind {
            if let Some(prev) = labels.insert(label.to_lowercase(), idx) {
                debug!("{name}: label {label:?} at line {idx} overrides line {prev}");
            }
        }
    }

    Ok(LoadedScript {
        name: name.to_owned(),
        lines,
        kinds,
        labels,
    })
}

fn include_target(text: &str) -> Option<&str> {
    let (word, rest) = split_word(text);
    if word.eq_ignore_ascii_case("include") && !rest.trim().is_empty() {
        Some(rest.trim())
    } else {
        None
    }
}

fn push_line(lines: &mut Vec<SourceLine>, text: &str, file: &str, number: usize) {
    let line = |text: &str| SourceLine {
        text: text.to_owned(),
        file: file.to_owned(),
        number,
    };
    match split_leading_close(text) {
        Some((close, rest)) => {
            lines.push(line(close));
            lines.push(line(rest));
        }
        None => lines.push(line(text)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
