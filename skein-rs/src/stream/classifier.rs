//! Stream classifier.
//!
//! Walks the tokens of each chunk, mirrors protocol state into the global
//! variable store, emits semantic [`StreamCommand`]s, and derives the
//! [`TextTag`]s that make up the display text.
//!
//! ## Store writes
//!
//! | Tag | Variables |
//! |-----|-----------|
//! | `prompt` | `prompt`, `gametime`, `gametimeupdate` |
//! | `left` / `right` | `lefthand`, `lefthandnoun`, `righthand`, `righthandnoun` |
//! | `spell` | `preparedspell` |
//! | `streamwindow` (main) | `roomtitle` |
//! | `component` | the component id, plus `monsterlist` / `monstercount` for `roomobjs` |
//! | `compass` | `north` … `out` as `"1"` / `"0"` |
//! | `indicator` | the indicator name as `"1"` / `"0"` |
//! | `dialogdata` | each progress bar id |
//! | `app` | `charactername`, `game` |

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;
use tracing::{debug, warn};

use super::tag::{unescape_html, TextTag};
use super::token::Token;
use super::tokenizer;
use crate::var::GlobalVars;

// ── StreamCommand ─────────────────────────────────────────────────────────────

/// Semantic events for the display layer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamCommand {
    Text(Vec<TextTag>),
    ClearStream(String),
    CreateWindow {
        name: String,
        title: String,
        if_closed: String,
    },
    Vitals {
        name: String,
        value: i64,
    },
    LaunchUrl(String),
    Spell(String),
    /// Absolute time at which the roundtime ends.
    Roundtime(SystemTime),
    Room,
    Compass(BTreeMap<String, String>),
    Hands(String, String),
    Character {
        game: String,
        name: String,
    },
}

// ── Tables ────────────────────────────────────────────────────────────────────

/// Tags after which an end-of-text newline is never synthesized.
const NO_EOT_AFTER: &[&str] = &[
    "app",
    "clearstream",
    "compass",
    "compdef",
    "component",
    "dialogdata",
    "endsetup",
    "exposecontainer",
    "indicator",
    "left",
    "mode",
    "opendialog",
    "nav",
    "output",
    "right",
    "streamwindow",
    "spell",
    "switchquickbar",
];

/// Streams whose `popstream` swallows the next end-of-text newline.
const SUPPRESS_EOT_AFTER_POP: &[&str] = &["experience", "inv", "popstream", "room", "logons", "death"];

const ROOM_COMPONENTS: &[&str] = &["roomdesc", "roomobjs", "roomplayers", "roomexits", "roomextra"];

pub const COMPASS: &[(&str, &str)] = &[
    ("n", "north"),
    ("s", "south"),
    ("e", "east"),
    ("w", "west"),
    ("ne", "northeast"),
    ("nw", "northwest"),
    ("se", "southeast"),
    ("sw", "southwest"),
    ("up", "up"),
    ("down", "down"),
    ("out", "out"),
];

// ── Classifier ────────────────────────────────────────────────────────────────

/// State carried from one token (and one chunk) to the next.
#[derive(Debug, Clone, Default)]
pub struct ClassifierState {
    pub bold: bool,
    pub mono: bool,
    pub in_stream: bool,
    /// Lowercased id of the pushed stream; empty when outside one.
    pub stream_id: String,
    /// Set by `endsetup`.  Before it, window definitions are forwarded and
    /// every display tag is flushed at once; after it, display text is
    /// batched until the next prompt.
    pub setup_complete: bool,
    pub last_token: Option<Token>,
    pub suppress_next_eot: bool,
}

pub struct Classifier {
    state: ClassifierState,
    pending: Vec<TextTag>,
    globals: GlobalVars,
    monster_ignore: Option<Regex>,
}

impl Classifier {
    pub fn new(globals: GlobalVars) -> Self {
        Classifier {
            state: ClassifierState::default(),
            pending: Vec::new(),
            globals,
            monster_ignore: None,
        }
    }

    /// Exclude bold room objects matching `pattern` from the monster list.
    /// An empty pattern clears the filter.
    pub fn set_monster_ignore(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.monster_ignore = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(pattern)?)
        };
        Ok(())
    }

    pub fn reset_setup(&mut self, complete: bool) {
        self.state.setup_complete = complete;
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    pub fn globals(&self) -> &GlobalVars {
        &self.globals
    }

    /// Run one chunk of protocol text through the tokenizer and classifier.
    pub fn stream(&mut self, chunk: &str) -> Vec<StreamCommand> {
        let normalized = chunk.replace("\r\n", "\n");
        let mut out = Vec::new();

        for token in tokenizer::read(&normalized) {
            self.process_into(&token, &mut out);

            let Some(tag) = self.tag_for(&token) else {
                continue;
            };
            let is_prompt = token.name() == "prompt";
            if is_prompt && self.pending.is_empty() {
                break;
            }
            self.pending.push(tag);
            if !self.state.setup_complete || is_prompt {
                out.push(StreamCommand::Text(TextTag::combine(std::mem::take(
                    &mut self.pending,
                ))));
            }
        }

        out
    }

    /// Apply the store and state effects of one token.
    pub fn process(&mut self, token: &Token) -> Vec<StreamCommand> {
        let mut out = Vec::new();
        self.process_into(token, &mut out);
        out
    }

    fn process_into(&mut self, token: &Token, out: &mut Vec<StreamCommand>) {
        let Token::Tag { name, children, .. } = token else {
            return;
        };

        match name.as_str() {
            "prompt" => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                self.globals.update(|vars| {
                    vars.set("prompt", token.value("").replace("&gt;", ">"));
                    vars.set("gametime", token.attr("time").unwrap_or(""));
                    vars.set("gametimeupdate", now.to_string());
                });
            }

            "roundtime" => {
                if let Some(secs) = token.attr("value").and_then(|v| v.parse::<u64>().ok()) {
                    out.push(StreamCommand::Roundtime(UNIX_EPOCH + Duration::from_secs(secs)));
                }
            }

            "left" | "right" => {
                let held = non_empty_or(token.value(""), "Empty");
                let noun = token.attr("noun").unwrap_or("").to_owned();
                let (left, right) = self.globals.update(|vars| {
                    vars.set(format!("{name}hand"), held);
                    vars.set(format!("{name}handnoun"), noun);
                    (
                        vars.get("lefthand").unwrap_or("Empty").to_owned(),
                        vars.get("righthand").unwrap_or("Empty").to_owned(),
                    )
                });
                out.push(StreamCommand::Hands(left, right));
            }

            "spell" => {
                let spell = token.value("");
                self.globals.set("preparedspell", spell.clone());
                out.push(StreamCommand::Spell(spell));
            }

            "pushbold" => self.state.bold = true,
            "popbold" => self.state.bold = false,

            "clearstream" => {
                if let Some(id) = token.attr("id") {
                    out.push(StreamCommand::ClearStream(id.to_lowercase()));
                }
            }

            "pushstream" => {
                self.state.in_stream = true;
                if let Some(id) = token.attr("id") {
                    self.state.stream_id = id.to_lowercase();
                }
            }

            "popstream" => {
                self.state.suppress_next_eot =
                    SUPPRESS_EOT_AFTER_POP.contains(&self.state.stream_id.as_str());
                self.state.in_stream = false;
                self.state.stream_id.clear();
            }

            "streamwindow" => {
                let id = token.attr("id");
                if let (Some("main"), Some(subtitle)) = (id, token.attr("subtitle")) {
                    if subtitle.chars().count() > 3 {
                        let title: String = subtitle.chars().skip(3).collect();
                        self.globals.set("roomtitle", title);
                    }
                }
                if !self.state.setup_complete {
                    if let Some(id) = id {
                        out.push(StreamCommand::CreateWindow {
                            name: id.to_owned(),
                            title: token.attr("title").unwrap_or("").to_owned(),
                            if_closed: token.attr("ifClosed").unwrap_or("").to_owned(),
                        });
                    }
                }
            }

            "component" => self.component(token, out),

            "compass" => self.compass(children, out),

            "indicator" => {
                let id: String = token
                    .attr("id")
                    .unwrap_or("")
                    .chars()
                    .skip(4)
                    .collect::<String>()
                    .to_lowercase();
                if !id.is_empty() {
                    let visible = if token.attr("visible") == Some("y") { "1" } else { "0" };
                    self.globals.set(id, visible);
                }
            }

            "dialogdata" => {
                for bar in children
                    .iter()
                    .filter(|c| c.name() == "progressbar" && c.has_attr("id"))
                {
                    let name = bar.attr("id").unwrap_or("").to_owned();
                    let value = bar.attr("value").unwrap_or("0");
                    self.globals.set(name.clone(), value);
                    out.push(StreamCommand::Vitals {
                        name,
                        value: value.trim().parse().unwrap_or(0),
                    });
                }
            }

            "app" => {
                let name = token.attr("char").unwrap_or("").to_owned();
                let game = token.attr("game").unwrap_or("").to_owned();
                self.globals.update(|vars| {
                    vars.set("charactername", name.clone());
                    vars.set("game", game.clone());
                });
                out.push(StreamCommand::Character { game, name });
            }

            "launchurl" => {
                if let Some(src) = token.attr("src") {
                    out.push(StreamCommand::LaunchUrl(src.to_owned()));
                }
            }

            "endsetup" => {
                debug!("classifier: setup complete");
                self.state.setup_complete = true;
            }

            _ => {}
        }
    }

    fn component(&mut self, token: &Token, out: &mut Vec<StreamCommand>) {
        let Some(raw_id) = token.attr("id") else {
            return;
        };
        if raw_id.starts_with("exp") {
            return;
        }
        let id = raw_id.replace(' ', "");
        self.globals.set(id.clone(), token.value(""));

        if id == "roomobjs" {
            let monsters: Vec<String> = token
                .monsters(self.monster_ignore.as_ref())
                .iter()
                .map(|m| m.value(""))
                .collect();
            self.globals.update(|vars| {
                vars.set("monsterlist", monsters.join("|"));
                vars.set("monstercount", monsters.len().to_string());
            });
        }

        if ROOM_COMPONENTS.contains(&id.as_str()) {
            out.push(StreamCommand::Room);
        }
    }

    fn compass(&mut self, children: &[Token], out: &mut Vec<StreamCommand>) {
        let mut dirs: BTreeMap<String, String> = COMPASS
            .iter()
            .map(|&(_, full)| (full.to_owned(), "0".to_owned()))
            .collect();

        for dir in children.iter().filter(|c| c.name() == "dir") {
            let Some(code) = dir.attr("value") else {
                continue;
            };
            match COMPASS.iter().find(|&&(short, _)| short == code) {
                Some(&(_, full)) => {
                    dirs.insert(full.to_owned(), "1".to_owned());
                }
                None => warn!("classifier: unknown compass direction {code:?}"),
            }
        }

        self.globals.update(|vars| {
            for (k, v) in &dirs {
                vars.set(k.clone(), v.clone());
            }
        });
        out.push(StreamCommand::Compass(dirs));
    }

    // ── Display derivation ────────────────────────────────────────────────────

    /// Display text for one token, if it produces any.  Also records the
    /// token as the previous one for adjacency rules.
    pub fn tag_for(&mut self, token: &Token) -> Option<TextTag> {
        let tag = self.derive_tag(token);
        self.state.last_token = Some(token.clone());
        tag
    }

    fn derive_tag(&mut self, token: &Token) -> Option<TextTag> {
        let in_stream = self.state.in_stream;

        match token.name() {
            "text" => {
                let mut tag = self.create_tag(token);
                tag.window = self.state.stream_id.clone();

                if in_stream && matches!(self.state.stream_id.as_str(), "logons" | "death") {
                    tag.text = tag.text.trim_matches([' ', '\t']).to_owned();
                }

                if let Some(last) = &self.state.last_token {
                    if last.name() == "preset" && tag.text.starts_with("  You also see") {
                        tag.preset = last.attr("id").map(str::to_owned);
                        tag.text = format!("\n{}", &tag.text[2..]);
                    }
                    if matches!(last.name(), "style" | "preset") && last.attr("id") == Some("roomName") {
                        tag.preset = Some("roomname".to_owned());
                    }
                }
                Some(tag)
            }

            "eot" => {
                let last = self.state.last_token.as_ref()?.name();
                if NO_EOT_AFTER.contains(&last) || in_stream || last == "prompt" {
                    return None;
                }
                if self.state.suppress_next_eot {
                    self.state.suppress_next_eot = false;
                    return None;
                }
                Some(TextTag::new("\n"))
            }

            "prompt" => {
                let mut tag = self.create_tag(token);
                tag.is_prompt = true;
                Some(tag)
            }

            "output" => {
                if let Some(class) = token.attr("class") {
                    self.state.mono = class == "mono";
                }
                None
            }

            "a" => {
                let mut tag = self.create_tag(token);
                tag.href = token.attr("href").map(str::to_owned);
                if in_stream {
                    tag.window = self.state.stream_id.clone();
                }
                Some(tag)
            }

            "b" => {
                let mut tag = self.create_tag(token);
                if in_stream {
                    tag.bold = true;
                    tag.window = self.state.stream_id.clone();
                }
                Some(tag)
            }

            "d" => {
                let mut tag = match token.children().first() {
                    Some(first) if matches!(first.name(), "b" | "text") => self.create_tag(first),
                    Some(_) => return None,
                    None => self.create_tag(token),
                };
                tag.command = token.attr("cmd").map(str::to_owned);
                if in_stream {
                    tag.window = self.state.stream_id.clone();
                }
                Some(tag)
            }

            "preset" => {
                let mut tag = self.create_tag(token);
                tag.window = self.state.stream_id.clone();
                tag.preset = token.attr("id").map(str::to_lowercase);
                Some(tag)
            }

            _ => None,
        }
    }

    fn create_tag(&self, token: &Token) -> TextTag {
        TextTag {
            bold: self.state.bold,
            mono: self.state.mono,
            ..TextTag::new(unescape_html(&token.value("")))
        }
    }
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_owned()
    } else {
        value
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
