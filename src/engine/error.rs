//! Error taxonomy for the encode engine.
//!
//! Every error is surfaced to the caller; none is fatal to the process.
//! There is no retry policy anywhere in the engine — the user decides
//! whether to try again with adjusted parameters.

use std::path::PathBuf;
use thiserror::Error;

/// A media file could not be inspected.
#[derive(Debug, Error)]
pub enum MediaReadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to run ffprobe: {0}")]
    ProbeFailed(#[from] std::io::Error),

    #[error("ffprobe could not parse {path}: {detail}")]
    Unparseable { path: PathBuf, detail: String },

    #[error("no video stream in {0}")]
    NoVideoStream(PathBuf),
}

/// A single violated validation rule. Validation stops at the first
/// violation, so `field` identifies exactly one offending option.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// The encoder process could not be started at all. The job never
/// enters Running when this is returned.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("encode command is empty")]
    EmptyCommand,

    #[error("job already launched")]
    AlreadyLaunched,

    #[error("failed to start encoder '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

/// Crop detection could not produce a usable crop expression.
#[derive(Debug, Error)]
pub enum CropDetectError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("cropdetect produced no crop samples; the clip may be too short")]
    NoCropDetected,
}

/// The encoder ran but exited with a nonzero status. Carries the exit
/// code (None when killed by a signal) and the tail of the captured log.
#[derive(Debug, Error)]
#[error("encoder exited with {}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
pub struct EncodeFailure {
    pub exit_code: Option<i32>,
    pub log_tail: Vec<String>,
}
