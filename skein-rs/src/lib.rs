//! Stream decoder and automation script engine for a text-game client.
//!
//! - [`stream`]: tokenizer and classifier for the server's markup stream
//! - [`script`]: expression evaluator and line-based script interpreter
//! - [`engine`]: tokio runtime tying the two together
//! - [`var`]: local and shared global variable stores

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod script;
pub mod stream;
pub mod var;

pub use error::EngineError;
