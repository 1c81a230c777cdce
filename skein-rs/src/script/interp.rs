//! The script interpreter.
//!
//! A [`Script`] runs its flattened lines from an instruction pointer.  It
//! never blocks: when a line has to wait (`matchwait`, `waitfor`, `pause`)
//! the script records why in its [`ScriptState`] and returns control to the
//! caller, which resumes it with [`Script::feed`], [`Script::time_out`] or
//! [`Script::resume`] followed by another [`Script::run_until_blocked`].
//!
//! Conditionals are tracked with a stack of chain states, one per open
//! brace block.  The top entry says whether the current `if`/`else` chain
//! has already taken a branch (`Some(true)`), is still looking for one
//! (`Some(false)`), or whether there is no chain at all (`None`).

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::eval::{evaluate_bool, evaluate_str, evaluate_value, ScriptExpression};
use super::expand::{expand, Scope};
use super::loader::{flatten, LoadedScript, ScriptLoader, SourceLine};
use super::stmt::{split_args, split_word, Body, Condition, Line};
use super::value::{format_number, parse_number};
use crate::error::Result;
use crate::pattern::{MatchMode, Pattern};
use crate::var::{GlobalVars, VarStore};

// ── Public types ──────────────────────────────────────────────────────────────

/// Something a script produced for the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEvent {
    /// Text for the user; always ends in a newline.
    Echo(String),
    /// A command for the game.
    Send(String),
    /// A line the interpreter does not handle itself.
    Command(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptState {
    Loaded,
    Running,
    /// `matchwait`: waiting for one of the registered matches.
    WaitingForMatch { timeout: Option<Duration> },
    /// `waitfor` / `waitforre`: waiting for a single pattern.
    WaitingFor,
    /// `pause`: waiting for a timer.
    Paused(Duration),
    Finished,
}

impl ScriptState {
    pub fn is_finished(&self) -> bool {
        matches!(self, ScriptState::Finished)
    }
}

/// Interpreter knobs, filled in from the config file.
#[derive(Debug, Clone)]
pub struct ScriptSettings {
    pub max_expand_passes: usize,
    pub pause_default: Duration,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            max_expand_passes: 16,
            pause_default: Duration::from_secs(1),
        }
    }
}

// ── Internal state ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct PendingMatch {
    pattern: Pattern,
    /// Where to continue; `None` continues at the next line.
    label: Option<String>,
}

#[derive(Debug)]
struct CallFrame {
    return_ip: usize,
    levels: Vec<Option<bool>>,
    captures: Vec<String>,
    args: Vec<String>,
}

// ── Script ────────────────────────────────────────────────────────────────────

pub struct Script {
    name: String,
    lines: Vec<SourceLine>,
    kinds: Vec<Line>,
    labels: HashMap<String, usize>,
    settings: ScriptSettings,

    ip: usize,
    /// Line being executed, for error messages.
    current: usize,
    levels: Vec<Option<bool>>,
    stack: Vec<CallFrame>,

    locals: VarStore,
    globals: GlobalVars,
    args: Vec<String>,
    captures: Vec<String>,

    pending: Vec<PendingMatch>,
    state: ScriptState,
    events: Vec<ScriptEvent>,
}

impl Script {
    /// Load `name` through `loader`, expanding includes.
    pub fn load(
        name: &str,
        loader: &dyn ScriptLoader,
        globals: GlobalVars,
        settings: ScriptSettings,
    ) -> Result<Self> {
        Ok(Self::from_loaded(flatten(name, loader)?, globals, settings))
    }

    pub fn from_loaded(loaded: LoadedScript, globals: GlobalVars, settings: ScriptSettings) -> Self {
        Script {
            name: loaded.name,
            lines: loaded.lines,
            kinds: loaded.kinds,
            labels: loaded.labels,
            settings,
            ip: 0,
            current: 0,
            levels: vec![None],
            stack: Vec::new(),
            locals: VarStore::new(),
            globals,
            args: Vec::new(),
            captures: Vec::new(),
            pending: Vec::new(),
            state: ScriptState::Loaded,
            events: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }

    pub fn state(&self) -> &ScriptState {
        &self.state
    }

    pub fn locals(&self) -> &VarStore {
        &self.locals
    }

    pub fn locals_mut(&mut self) -> &mut VarStore {
        &mut self.locals
    }

    pub fn globals(&self) -> &GlobalVars {
        &self.globals
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    /// Argument slots `%0` to `%9`: slot 0 is every argument joined by a
    /// space, missing arguments are empty.
    pub fn arg_slots(&self) -> Vec<String> {
        let mut slots = Vec::with_capacity(10);
        slots.push(self.args.join(" "));
        slots.extend((0..9).map(|i| self.args.get(i).cloned().unwrap_or_default()));
        slots
    }

    /// Drop the first argument.  No-op when there are none.
    pub fn shift_args(&mut self) {
        if !self.args.is_empty() {
            self.args.remove(0);
        }
    }

    pub fn drain_events(&mut self) -> Vec<ScriptEvent> {
        std::mem::take(&mut self.events)
    }

    /// Begin execution from the first line with `args`.
    pub fn start(&mut self, args: &[String]) {
        info!("script {} started with {} args", self.name, args.len());
        self.args = args.to_vec();
        self.ip = 0;
        self.levels = vec![None];
        self.stack.clear();
        self.pending.clear();
        self.state = ScriptState::Running;
    }

    /// Start and run until the script blocks or finishes.
    pub fn run(&mut self, args: &[String]) -> ScriptState {
        self.start(args);
        self.run_until_blocked(usize::MAX)
    }

    /// Execute at most `budget` lines.  Returns `Running` when the budget
    /// ran out before the script blocked.
    pub fn run_until_blocked(&mut self, budget: usize) -> ScriptState {
        let mut steps = 0;
        while self.state == ScriptState::Running && steps < budget {
            steps += 1;
            let Some(kind) = self.kinds.get(self.ip).cloned() else {
                self.finish();
                break;
            };
            self.current = self.ip;
            self.step(kind);
        }
        self.state.clone()
    }

    /// Offer an incoming line to the pending matches.  Returns `true` when
    /// one matched and the script is ready to run again.
    pub fn feed(&mut self, line: &str) -> bool {
        if !matches!(self.state, ScriptState::WaitingForMatch { .. } | ScriptState::WaitingFor) {
            return false;
        }
        let hit = self
            .pending
            .iter()
            .find_map(|p| p.pattern.find(line).map(|caps| (p.label.clone(), caps)));
        let Some((label, caps)) = hit else {
            return false;
        };
        debug!("script {}: matched {line:?}", self.name);
        self.pending.clear();
        self.captures = caps.into_groups();
        self.state = ScriptState::Running;
        if let Some(label) = label {
            self.jump(&label);
        }
        true
    }

    /// A `matchwait` timeout expired: drop the matches and go on.
    pub fn time_out(&mut self) -> bool {
        if !matches!(self.state, ScriptState::WaitingForMatch { .. }) {
            return false;
        }
        debug!("script {}: matchwait timed out", self.name);
        self.pending.clear();
        self.state = ScriptState::Running;
        true
    }

    /// A `pause` timer expired.
    pub fn resume(&mut self) -> bool {
        if !matches!(self.state, ScriptState::Paused(_)) {
            return false;
        }
        self.state = ScriptState::Running;
        true
    }

    pub fn stop(&mut self) {
        self.pending.clear();
        self.stack.clear();
        if !self.state.is_finished() {
            self.finish();
        }
    }

    // ── Line dispatch ─────────────────────────────────────────────────────────

    fn step(&mut self, kind: Line) {
        match kind {
            Line::Blank | Line::Comment => self.ip += 1,
            Line::Label(_) => {
                self.set_chain(None);
                self.ip += 1;
            }
            Line::BlockStart => {
                self.levels.push(None);
                self.ip += 1;
            }
            Line::BlockEnd => {
                if self.levels.len() > 1 {
                    self.levels.pop();
                }
                self.ip += 1;
            }
            Line::If { cond, body } => {
                let taken = self.test(&cond);
                self.set_chain(Some(taken));
                self.run_body(&body, taken);
            }
            Line::ElseIf { cond, body } => {
                if self.chain() == Some(false) {
                    let taken = self.test(&cond);
                    if taken {
                        self.set_chain(Some(true));
                    }
                    self.run_body(&body, taken);
                } else {
                    self.run_body(&body, false);
                }
            }
            Line::Else { body } => {
                let taken = self.chain() == Some(false);
                if taken {
                    self.set_chain(Some(true));
                }
                self.run_body(&body, taken);
            }
            Line::Command(raw) => {
                self.set_chain(None);
                self.ip += 1;
                self.execute(&raw);
            }
        }
    }

    fn chain(&self) -> Option<bool> {
        self.levels.last().copied().flatten()
    }

    fn set_chain(&mut self, state: Option<bool>) {
        match self.levels.last_mut() {
            Some(top) => *top = state,
            None => self.levels.push(state),
        }
    }

    /// Run or skip a conditional's body.  Skipped bodies are passed over
    /// without substituting or evaluating anything inside them.
    fn run_body(&mut self, body: &Body, taken: bool) {
        match body {
            Body::Inline(stmt) | Body::BlockInline(stmt) => {
                self.ip += 1;
                if taken {
                    self.execute(stmt);
                }
            }
            Body::Block => {
                if taken {
                    self.levels.push(None);
                    self.ip += 1;
                } else {
                    self.ip = self.block_end(self.ip) + 1;
                }
            }
            Body::Next => {
                let next = self.next_significant(self.ip + 1);
                if !taken {
                    self.ip = self.statement_end(next);
                    return;
                }
                match self.kinds.get(next).cloned() {
                    Some(Line::BlockStart) => {
                        self.levels.push(None);
                        self.ip = next + 1;
                    }
                    Some(Line::Command(stmt)) => {
                        self.ip = next + 1;
                        self.current = next;
                        self.execute(&stmt);
                    }
                    _ => self.ip = next,
                }
            }
        }
    }

    /// Index just past the statement starting at `at`, including any block
    /// it opens or the body line it takes.
    fn statement_end(&self, at: usize) -> usize {
        match self.kinds.get(at) {
            Some(kind) if kind.brace_delta() > 0 => self.block_end(at) + 1,
            Some(
                Line::If { body: Body::Next, .. }
                | Line::ElseIf { body: Body::Next, .. }
                | Line::Else { body: Body::Next },
            ) => self.statement_end(self.next_significant(at + 1)),
            Some(_) => at + 1,
            None => at,
        }
    }

    fn next_significant(&self, from: usize) -> usize {
        (from..self.kinds.len())
            .find(|&i| !matches!(self.kinds[i], Line::Blank | Line::Comment))
            .unwrap_or(self.kinds.len())
    }

    /// Index of the `}` closing the block opened on line `open`.
    fn block_end(&self, open: usize) -> usize {
        let mut depth = 0;
        for (i, kind) in self.kinds.iter().enumerate().skip(open) {
            depth += kind.brace_delta();
            if depth <= 0 {
                return i;
            }
        }
        warn!("{}: block opened at line {} is never closed", self.name, self.location());
        self.kinds.len()
    }

    fn test(&mut self, cond: &Condition) -> bool {
        match cond {
            Condition::ArgCount(n) => self.args.len() >= *n,
            Condition::Expr(raw) => {
                let text = self.expand(raw);
                let expression = ScriptExpression::parse(&text);
                let r = evaluate_bool(&expression, &self.globals);
                if !r.groups.is_empty() {
                    self.captures = r.groups;
                }
                match r.result.as_str() {
                    "true" => true,
                    "false" => false,
                    message => {
                        let message = message.to_owned();
                        self.error(&message);
                        false
                    }
                }
            }
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    fn execute(&mut self, raw: &str) {
        let text = self.expand(raw);
        let (word, rest) = split_word(&text);
        if word.is_empty() {
            return;
        }

        match word.to_ascii_lowercase().as_str() {
            "echo" => self.emit(ScriptEvent::Echo(format!("{rest}\n"))),
            "put" | "send" => self.put(rest),
            "var" | "setvariable" => {
                let (name, value) = split_word(rest);
                if name.is_empty() {
                    self.error("var needs a name");
                } else {
                    self.locals.set(name, value.trim());
                }
            }
            "unvar" | "deletevariable" => {
                self.locals.unset(rest.trim());
            }
            "math" => {
                let mut parts = rest.split_whitespace();
                let name = parts.next().unwrap_or("");
                let op = parts.next().unwrap_or("");
                let amount = parts.collect::<Vec<_>>().join(" ");
                self.math(name, op, &amount);
            }
            "counter" => {
                let (op, amount) = split_word(rest);
                self.math("c", op, amount);
            }
            "eval" => {
                let (name, expression) = split_word(rest);
                let r = evaluate_str(&ScriptExpression::parse(expression.trim()), &self.globals);
                self.assign(name, r.result, r.groups);
            }
            "evalmath" => {
                let (name, expression) = split_word(rest);
                let r = evaluate_value(&ScriptExpression::parse(expression.trim()), &self.globals);
                self.assign(name, r.result, r.groups);
            }
            "goto" => {
                self.jump(rest.trim());
            }
            "gosub" => {
                let (label, arg_text) = split_word(rest);
                self.gosub(label, split_args(arg_text));
            }
            "return" => self.ret(),
            "shift" => self.shift_args(),
            "exit" => self.finish(),
            "match" => {
                let (label, text) = split_word(rest);
                self.add_match(Some(label), text.trim(), MatchMode::Substr);
            }
            "matchre" => {
                let (label, pattern) = split_word(rest);
                self.add_match(Some(label), pattern.trim(), MatchMode::Regexp);
            }
            "matchwait" => {
                let timeout = parse_number(rest)
                    .filter(|s| *s > 0.0)
                    .map(Duration::from_secs_f64);
                debug!("script {}: matchwait on {} patterns", self.name, self.pending.len());
                self.state = ScriptState::WaitingForMatch { timeout };
            }
            "waitfor" | "waitforre" => {
                let mode = if word.eq_ignore_ascii_case("waitforre") {
                    MatchMode::Regexp
                } else {
                    MatchMode::Substr
                };
                self.pending.clear();
                if self.add_match(None, rest.trim(), mode) {
                    debug!("script {}: waiting for {:?}", self.name, rest.trim());
                    self.state = ScriptState::WaitingFor;
                }
            }
            "pause" => {
                let duration = parse_number(rest)
                    .filter(|s| *s >= 0.0)
                    .map(Duration::from_secs_f64)
                    .unwrap_or(self.settings.pause_default);
                self.state = ScriptState::Paused(duration);
            }
            _ => self.emit(ScriptEvent::Command(text.trim().to_owned())),
        }
    }

    fn put(&mut self, rest: &str) {
        let (command, tail) = split_word(rest);
        if command.eq_ignore_ascii_case("#var") || command.eq_ignore_ascii_case("#tvar") {
            let (name, value) = split_word(tail);
            self.globals.set(name, value.trim());
        } else if command.starts_with('#') {
            self.emit(ScriptEvent::Command(rest.trim().to_owned()));
        } else {
            self.emit(ScriptEvent::Send(rest.trim().to_owned()));
        }
    }

    fn assign(&mut self, name: &str, value: String, groups: Vec<String>) {
        if !groups.is_empty() {
            self.captures = groups;
        }
        if name.is_empty() {
            self.error("missing variable name");
        } else {
            self.locals.set(name, value);
        }
    }

    fn math(&mut self, name: &str, op: &str, amount: &str) {
        let current = self.locals.get_number(name).unwrap_or(0.0);
        let amount = parse_number(amount).unwrap_or(0.0);
        let result = match op.to_ascii_lowercase().as_str() {
            "set" => amount,
            "+" | "add" => current + amount,
            "-" | "sub" | "subtract" => current - amount,
            "*" | "multiply" => current * amount,
            "/" | "divide" | "%" | "modulus" if amount == 0.0 => {
                self.error("cannot divide by zero!");
                return;
            }
            "/" | "divide" => current / amount,
            "%" | "modulus" => current % amount,
            other => {
                self.error(&format!("unknown math operation '{other}'"));
                return;
            }
        };
        self.locals.set(name, format_number(result));
    }

    fn add_match(&mut self, label: Option<&str>, pattern: &str, mode: MatchMode) -> bool {
        match Pattern::new(pattern, mode) {
            Ok(pattern) => {
                self.pending.push(PendingMatch {
                    pattern,
                    label: label.map(str::to_owned),
                });
                true
            }
            Err(e) => {
                self.error(&e.to_string());
                false
            }
        }
    }

    /// Move to `label`.  An unknown label ends the script.
    fn jump(&mut self, label: &str) -> bool {
        match self.labels.get(&label.to_lowercase()) {
            Some(&idx) => {
                self.ip = idx;
                self.levels = vec![None];
                true
            }
            None => {
                warn!("script {}: unknown label {label:?}", self.name);
                self.error(&format!("label '{label}' not found"));
                self.finish();
                false
            }
        }
    }

    fn gosub(&mut self, label: &str, args: Vec<String>) {
        let frame = CallFrame {
            return_ip: self.ip,
            levels: std::mem::take(&mut self.levels),
            captures: self.captures.clone(),
            args: self.args.clone(),
        };
        if !self.jump(label) {
            return;
        }
        self.stack.push(frame);
        self.captures = std::iter::once(args.join(" ")).chain(args.iter().cloned()).collect();
        self.args = args;
    }

    fn ret(&mut self) {
        match self.stack.pop() {
            Some(frame) => {
                self.ip = frame.return_ip;
                self.levels = frame.levels;
                self.captures = frame.captures;
                self.args = frame.args;
            }
            None => self.finish(),
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn expand(&self, raw: &str) -> String {
        let slots = self.arg_slots();
        let scope = Scope {
            locals: &self.locals,
            args: &slots,
            captures: &self.captures,
            globals: &self.globals,
        };
        expand(raw, &scope, self.settings.max_expand_passes)
    }

    fn emit(&mut self, event: ScriptEvent) {
        self.events.push(event);
    }

    fn location(&self) -> String {
        match self.lines.get(self.current) {
            Some(line) => format!("{}({})", line.file, line.number),
            None => format!("{}(?)", self.name),
        }
    }

    /// Report an error inline as `[file(line)]: message`.
    fn error(&mut self, message: &str) {
        let text = format!("[{}]: {message}\n", self.location());
        self.emit(ScriptEvent::Echo(text));
    }

    fn finish(&mut self) {
        if !self.state.is_finished() {
            info!("script {} finished", self.name);
        }
        self.pending.clear();
        self.state = ScriptState::Finished;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
