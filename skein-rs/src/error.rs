//! Crate-level errors.
//!
//! Evaluation problems inside a running script never reach this type: they
//! are echoed as script output and the script carries on.  `EngineError`
//! covers the things a caller has to handle, like a script that cannot be
//! found or a config file that cannot be read.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("script not found: {0}")]
    ScriptNotFound(String),

    #[error("no running script with id {0}")]
    NoSuchScript(u64),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
