//! `skein.cfg` configuration file parser.
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `set <key>=<value>` or `set <key> <value>` | engine setting |
//! | `var <name> <value…>` | preset a global variable |
//! | Lines starting with `;` or `#` | comment, ignored |
//! | Anything else | silently skipped |
//!
//! Settings:
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `scripts_dir` | `scripts` | where [`FileLoader`](crate::script::FileLoader) looks |
//! | `script_extension` | `cmd` | appended to script names |
//! | `monster_ignore` | none | regex of creatures left out of `monsterlist` |
//! | `max_expand_passes` | `16` | substitution pass limit |
//! | `pause_default` | `1` | seconds a bare `pause` waits |

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::error::EngineError;
use crate::script::ScriptSettings;
use crate::var::VarStore;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub scripts_dir: PathBuf,
    pub script_extension: String,
    pub monster_ignore: Option<String>,
    pub max_expand_passes: usize,
    pub pause_default: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("scripts"),
            script_extension: "cmd".to_owned(),
            monster_ignore: None,
            max_expand_passes: 16,
            pause_default: Duration::from_secs(1),
        }
    }
}

impl Settings {
    pub fn script_settings(&self) -> ScriptSettings {
        ScriptSettings {
            max_expand_passes: self.max_expand_passes,
            pause_default: self.pause_default,
        }
    }
}

/// Parsed configuration: engine settings and preset globals.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: Settings,
    pub vars: VarStore,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.  Returns the config and any errors on
    /// recognised lines; a bad line never stops the rest from loading.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let (cmd, args) = line
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((line, ""));
            let args = args.trim();

            let result = match cmd {
                "set" => parse_set(args, &mut config.settings),
                "var" => parse_var(args, &mut config.vars),
                _ => Ok(()),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: i + 1, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> Result<(Self, Vec<ConfigError>), EngineError> {
        let s = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::load_str(&s))
    }
}

// ── Directives ────────────────────────────────────────────────────────────────

fn split_key_value(args: &str) -> Option<(&str, &str)> {
    let key_end = args
        .find(|c: char| c == '=' || c.is_ascii_whitespace())
        .unwrap_or(args.len());
    let key = &args[..key_end];
    if key.is_empty() {
        return None;
    }
    let rest = &args[key_end..];
    let value = match rest.strip_prefix('=') {
        Some(v) => v,
        None => rest.trim_start(),
    };
    Some((key, value.trim()))
}

fn parse_set(args: &str, settings: &mut Settings) -> Result<(), String> {
    let (key, value) = split_key_value(args).ok_or("set: missing key")?;
    match key {
        "scripts_dir" => settings.scripts_dir = PathBuf::from(value),
        "script_extension" => settings.script_extension = value.trim_start_matches('.').to_owned(),
        "monster_ignore" => {
            if value.is_empty() {
                settings.monster_ignore = None;
            } else {
                regex::Regex::new(value).map_err(|e| format!("monster_ignore: {e}"))?;
                settings.monster_ignore = Some(value.to_owned());
            }
        }
        "max_expand_passes" => {
            settings.max_expand_passes = value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("max_expand_passes: not a positive integer: {value}"))?;
        }
        "pause_default" => {
            let secs = value
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s >= 0.0)
                .ok_or_else(|| format!("pause_default: not a number of seconds: {value}"))?;
            settings.pause_default = Duration::from_secs_f64(secs);
        }
        other => return Err(format!("set: unknown setting {other:?}")),
    }
    Ok(())
}

fn parse_var(args: &str, vars: &mut VarStore) -> Result<(), String> {
    let (name, value) = match args.split_once(|c: char| c.is_ascii_whitespace()) {
        Some((name, value)) => (name, value.trim()),
        None => (args, ""),
    };
    if name.is_empty() {
        return Err("var: missing name".to_owned());
    }
    vars.set(name, value);
    Ok(())
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the user config file: `~/.skein.cfg`, then
/// `<config dir>/skein/skein.cfg`, then `./skein.cfg`.
pub fn find_user_config() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dirs) = directories::BaseDirs::new() {
        candidates.push(dirs.home_dir().join(".skein.cfg"));
        candidates.push(dirs.config_dir().join("skein").join("skein.cfg"));
    }
    candidates.push(PathBuf::from("skein.cfg"));
    candidates.into_iter().find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
