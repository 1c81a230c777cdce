//! Async runtime: the classifier plus every running script.
//!
//! ## Architecture
//!
//! Each script runs in its own [`tokio::spawn`]ed task (`script_task`).
//! [`Engine::ingest`] decodes protocol text and broadcasts every completed
//! main-window line to all script tasks; a task feeds the line to its
//! script when the script is waiting on a match.  Script output comes back
//! through one [`mpsc`] channel.
//!
//! ```text
//!   Engine::ingest ──► Classifier ──► StreamCommands (returned)
//!                          │
//!                          ▼  broadcast of text lines
//!        ┌────────────────┬────────────────┐
//!   script_task (1)   script_task (2)   ...      ◄── control (stop/pause/resume)
//!        └────────────────┴───► mpsc (ScriptId, ScriptEvent)
//! ```
//!
//! The classifier and every script share one [`GlobalVars`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::{Config, Settings};
use crate::error::{EngineError, Result};
use crate::script::{Script, ScriptEvent, ScriptLoader, ScriptState};
use crate::stream::{Classifier, StreamCommand};
use crate::var::GlobalVars;

pub type ScriptId = u64;

/// Lines a script may run before its task yields to the runtime.
const STEP_BUDGET: usize = 500;
const LINE_BUFFER: usize = 256;
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Stop,
    Pause,
    Resume,
}

struct ScriptHandle {
    name: String,
    control: mpsc::UnboundedSender<Control>,
}

#[derive(Clone, Default)]
struct Registry {
    inner: Arc<Mutex<HashMap<ScriptId, ScriptHandle>>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<ScriptId, ScriptHandle>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct Engine {
    classifier: Classifier,
    globals: GlobalVars,
    loader: Arc<dyn ScriptLoader>,
    settings: Settings,
    lines: broadcast::Sender<String>,
    events: mpsc::Sender<(ScriptId, ScriptEvent)>,
    registry: Registry,
    next_id: ScriptId,
    /// Main-window text after the last newline.
    partial: String,
}

impl Engine {
    /// Build an engine from `config`.  The receiver yields every script's
    /// output tagged with the script's id.
    pub fn new(
        config: Config,
        loader: Arc<dyn ScriptLoader>,
    ) -> (Self, mpsc::Receiver<(ScriptId, ScriptEvent)>) {
        let globals = GlobalVars::new();
        globals.update(|vars| {
            for (name, value) in config.vars.iter() {
                vars.set(name.clone(), value.clone());
            }
        });

        let mut classifier = Classifier::new(globals.clone());
        if let Some(pattern) = &config.settings.monster_ignore {
            if let Err(e) = classifier.set_monster_ignore(pattern) {
                warn!("monster_ignore {pattern:?}: {e}");
            }
        }

        let (lines, _) = broadcast::channel(LINE_BUFFER);
        let (events, events_rx) = mpsc::channel(EVENT_BUFFER);
        let engine = Engine {
            classifier,
            globals,
            loader,
            settings: config.settings,
            lines,
            events,
            registry: Registry::default(),
            next_id: 1,
            partial: String::new(),
        };
        (engine, events_rx)
    }

    pub fn globals(&self) -> &GlobalVars {
        &self.globals
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Decode a chunk of protocol text.  Completed main-window lines are
    /// passed on to running scripts; the commands are returned for display.
    pub fn ingest(&mut self, chunk: &str) -> Vec<StreamCommand> {
        let commands = self.classifier.stream(chunk);
        for command in &commands {
            let StreamCommand::Text(tags) = command else { continue };
            for tag in tags.iter().filter(|t| t.window.is_empty() && !t.is_prompt) {
                self.partial.push_str(&tag.text);
            }
        }
        while let Some(end) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=end).collect();
            let line = line.trim_end_matches('\n');
            if line.is_empty() {
                continue;
            }
            // No receivers just means no script is running.
            let _ = self.lines.send(line.to_owned());
        }
        commands
    }

    /// Load script `name` and start it in a new task.
    pub fn start_script(&mut self, name: &str, args: &[String]) -> Result<ScriptId> {
        let mut script = Script::load(
            name,
            self.loader.as_ref(),
            self.globals.clone(),
            self.settings.script_settings(),
        )?;
        script.start(args);

        let id = self.next_id;
        self.next_id += 1;
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        self.registry.lock().insert(
            id,
            ScriptHandle {
                name: name.to_owned(),
                control: control_tx,
            },
        );
        tokio::spawn(script_task(
            id,
            script,
            self.lines.subscribe(),
            control_rx,
            self.events.clone(),
            self.registry.clone(),
        ));
        Ok(id)
    }

    pub fn stop(&self, id: ScriptId) -> Result<()> {
        self.control(id, Control::Stop)
    }

    pub fn pause(&self, id: ScriptId) -> Result<()> {
        self.control(id, Control::Pause)
    }

    pub fn resume(&self, id: ScriptId) -> Result<()> {
        self.control(id, Control::Resume)
    }

    pub fn stop_all(&self) {
        for handle in self.registry.lock().values() {
            let _ = handle.control.send(Control::Stop);
        }
    }

    /// Running scripts as `(id, name)`, oldest first.
    pub fn running(&self) -> Vec<(ScriptId, String)> {
        let mut list: Vec<_> = self
            .registry
            .lock()
            .iter()
            .map(|(id, h)| (*id, h.name.clone()))
            .collect();
        list.sort_unstable_by_key(|(id, _)| *id);
        list
    }

    fn control(&self, id: ScriptId, control: Control) -> Result<()> {
        let registry = self.registry.lock();
        let handle = registry.get(&id).ok_or(EngineError::NoSuchScript(id))?;
        handle
            .control
            .send(control)
            .map_err(|_| EngineError::NoSuchScript(id))
    }
}

// ── Script task ───────────────────────────────────────────────────────────────

/// Drives one script.  Owns the [`Script`]; everything else reaches it
/// through channels.
async fn script_task(
    id: ScriptId,
    mut script: Script,
    mut lines: broadcast::Receiver<String>,
    mut control: mpsc::UnboundedReceiver<Control>,
    events: mpsc::Sender<(ScriptId, ScriptEvent)>,
    registry: Registry,
) {
    let mut held = false;
    let mut deadline: Option<Instant> = None;

    'run: loop {
        if !held && *script.state() == ScriptState::Running {
            script.run_until_blocked(STEP_BUDGET);
            for event in script.drain_events() {
                if events.send((id, event)).await.is_err() {
                    script.stop();
                    break 'run;
                }
            }
            deadline = match script.state() {
                ScriptState::WaitingForMatch { timeout: Some(t) } | ScriptState::Paused(t) => {
                    Some(Instant::now() + *t)
                }
                _ => None,
            };
            match script.state() {
                ScriptState::Finished => break,
                ScriptState::Running => {
                    tokio::task::yield_now().await;
                    while let Ok(c) = control.try_recv() {
                        if apply(c, &mut script, &mut held) {
                            break 'run;
                        }
                    }
                    continue;
                }
                other => debug!("script {id}: suspended {other:?}"),
            }
        }

        let timer = async {
            match deadline {
                Some(dl) if !held => sleep_until(dl).await,
                _ => std::future::pending().await,
            }
        };

        tokio::select! {
            c = control.recv() => {
                let c = c.unwrap_or(Control::Stop);
                if apply(c, &mut script, &mut held) {
                    break;
                }
            }
            line = lines.recv() => match line {
                Ok(line) => {
                    if !held && script.feed(&line) {
                        debug!("script {id}: resumed by {line:?}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("script {id}: missed {n} lines");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    script.stop();
                    break;
                }
            },
            _ = timer => {
                deadline = None;
                if !script.time_out() {
                    script.resume();
                }
            }
        }
    }

    for event in script.drain_events() {
        let _ = events.send((id, event)).await;
    }
    registry.lock().remove(&id);
    info!("script {id} ({}) removed", script.name());
}

/// Apply a control message.  Returns `true` when the task should end.
fn apply(control: Control, script: &mut Script, held: &mut bool) -> bool {
    match control {
        Control::Stop => {
            script.stop();
            true
        }
        Control::Pause => {
            *held = true;
            false
        }
        Control::Resume => {
            *held = false;
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
