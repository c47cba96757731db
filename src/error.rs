//! Error taxonomy shared by the preference store, the search index and the
//! command runner.
//!
//! None of these errors is fatal to the process. Callers at the application
//! boundary report them (status line, appended output line, stderr) and keep
//! going.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A config file could not be read or written.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file is not valid JSON.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON that does not have the shape of a preferences document.
    #[error("invalid preferences: {0}")]
    Shape(String),

    /// Preferences could not be serialized for saving.
    #[error("failed to serialize preferences: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The user-supplied search expression does not compile.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The external command failed to resolve, launch, or exit cleanly.
    #[error(transparent)]
    Command(#[from] CommandFailure),

    /// No home directory could be determined for the default config path.
    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Failures of the command runner.
///
/// The `Display` text of each variant is the exact line appended to the
/// output pane.
#[derive(Debug, Error)]
pub enum CommandFailure {
    #[error("Error: Command '{command}' failed with return code {code}")]
    Exited { command: String, code: i32 },

    #[error("Error: Command '{command}' was terminated by a signal")]
    Killed { command: String },

    #[error("Unexpected error: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected error: {0}")]
    Resolve(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Parse {
            path: path.into(),
            source,
        }
    }
}
