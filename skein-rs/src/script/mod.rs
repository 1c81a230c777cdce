//! Automation scripts.
//!
//! A script is a list of lines run from an instruction pointer:
//!
//! - Variable substitution (`%local`, `$global`, `%1`, `$1`, `%list[2]`)
//! - Expressions with functions (`matchre("$x", "(\d+)") && %n > 2`)
//! - `if` / `else if` / `else` chains, braces optional, arbitrarily nested
//! - `goto`, `gosub` / `return`, labels
//! - `match` / `matchre` / `matchwait`, `waitfor`, `pause`
//!
//! # Quick start
//!
//! ```rust
//! use skein::script::{MemoryLoader, Script, ScriptEvent, ScriptSettings};
//! use skein::var::GlobalVars;
//!
//! let loader = MemoryLoader::new().with("hello", "var x 6\nevalmath y %x * 7\necho %y");
//! let mut script = Script::load("hello", &loader, GlobalVars::new(), ScriptSettings::default()).unwrap();
//! script.run(&[]);
//! assert_eq!(script.drain_events(), vec![ScriptEvent::Echo("42\n".into())]);
//! ```

pub mod builtins;
pub mod eval;
pub mod expand;
pub mod expr;
pub mod interp;
pub mod loader;
pub mod stmt;
pub mod value;

pub use eval::{EvalContext, EvalResult, ScriptExpression};
pub use interp::{Script, ScriptEvent, ScriptSettings, ScriptState};
pub use loader::{FileLoader, LoadedScript, MemoryLoader, ScriptLoader, SourceLine};
pub use value::Value;
