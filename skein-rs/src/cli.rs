//! Command-line argument parsing.
//!
//! Usage:
//!   skein [-s<dir>] [-f[<file>]] [-r<script>] [-a<arg>]... [-v] [<input>|-]

use std::path::PathBuf;

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct CliArgs {
    /// Script directory override (`-s<dir>`).
    pub scripts_dir: Option<PathBuf>,
    /// Which config file to load.
    pub config: ConfigFile,
    /// Script to start before replaying input (`-r<script>`).
    pub script: Option<String>,
    /// Arguments for that script (`-a<arg>`, repeatable).
    pub script_args: Vec<String>,
    /// Also print non-text stream commands (`-v`).
    pub verbose: bool,
    /// Protocol text to replay.
    pub input: Input,
}

/// How to choose the config file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search the standard locations (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip the config file.
    Skip,
    /// `-f<file>` or `-f <file>`.
    Explicit(PathBuf),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum Input {
    /// No positional argument, or `-`.
    #[default]
    Stdin,
    File(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(&raw[1..])
}

/// Parse `argv` without the program name.
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        if arg == "--" {
            positional.extend(argv[i + 1..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'v' => args.verbose = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                flag @ ('s' | 'r' | 'a') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{flag} requires an argument"));
                    };
                    match flag {
                        's' => args.scripts_dir = Some(PathBuf::from(value)),
                        'r' => args.script = Some(value),
                        _ => args.script_args.push(value),
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    match positional.len() {
        0 => {}
        1 => {
            let p = positional.remove(0);
            if p != "-" {
                args.input = Input::File(PathBuf::from(p));
            }
        }
        n => return Err(format!("too many arguments ({n})")),
    }

    if !args.script_args.is_empty() && args.script.is_none() {
        return Err("-a given without -r".to_owned());
    }

    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert!(matches!(a.config, ConfigFile::Search));
        assert_eq!(a.input, Input::Stdin);
        assert!(a.script.is_none());
    }

    #[test]
    fn input_file() {
        let a = parse_argv(&argv(&["session.log"])).unwrap();
        assert_eq!(a.input, Input::File(PathBuf::from("session.log")));
        let a = parse_argv(&argv(&["-"])).unwrap();
        assert_eq!(a.input, Input::Stdin);
    }

    #[test]
    fn script_and_args() {
        let a = parse_argv(&argv(&["-rhunt", "-a", "rat", "-aswim west"])).unwrap();
        assert_eq!(a.script.as_deref(), Some("hunt"));
        assert_eq!(a.script_args, vec!["rat", "swim west"]);
    }

    #[test]
    fn scripts_dir_separate() {
        let a = parse_argv(&argv(&["-s", "/some/dir"])).unwrap();
        assert_eq!(a.scripts_dir, Some(PathBuf::from("/some/dir")));
    }

    #[test]
    fn config_forms() {
        assert!(matches!(parse_argv(&argv(&["-f"])).unwrap().config, ConfigFile::Skip));
        let a = parse_argv(&argv(&["-fmy.cfg"])).unwrap();
        assert!(matches!(&a.config, ConfigFile::Explicit(p) if p == &PathBuf::from("my.cfg")));
        let a = parse_argv(&argv(&["-f", "my.cfg"])).unwrap();
        assert!(matches!(&a.config, ConfigFile::Explicit(p) if p == &PathBuf::from("my.cfg")));
    }

    #[test]
    fn combined_flags() {
        let a = parse_argv(&argv(&["-vrhunt"])).unwrap();
        assert!(a.verbose);
        assert_eq!(a.script.as_deref(), Some("hunt"));
    }

    #[test]
    fn errors() {
        assert!(parse_argv(&argv(&["a", "b"])).is_err());
        assert!(parse_argv(&argv(&["-z"])).is_err());
        assert!(parse_argv(&argv(&["-r"])).is_err());
        assert!(parse_argv(&argv(&["-afoo"])).is_err());
    }
}
