use serde::Serialize;
use thiserror::Error;

/// Contract violations raised by [`crate::Episode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpisodeError {
    /// `step` was called on an episode that was never reset.
    #[error("episode has not been started; call reset() before step()")]
    NotStarted,
    /// `step` was called after the terminal stage already returned done=true.
    #[error("episode already finished after {stages} stages; call reset() to start a new one")]
    Finished { stages: usize },
}

impl EpisodeError {
    pub fn code(&self) -> &'static str {
        match self {
            EpisodeError::NotStarted => codes::EPISODE_NOT_STARTED,
            EpisodeError::Finished { .. } => codes::EPISODE_FINISHED,
        }
    }
}

/// Reasons a [`crate::Script`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("invalid script JSON: {0}")]
    Parse(String),
    #[error("script has no stages")]
    NoStages,
    #[error("stage {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
    #[error("stage {index} ('{label}') has no reward keywords")]
    NoRewardKeywords { index: usize, label: String },
    #[error("stage label '{label}' is used more than once")]
    DuplicateLabel { label: String },
    #[error("stage label '{label}' collides with a reserved info key")]
    ReservedLabel { label: String },
    /// An empty keyword would match every reply.
    #[error("{set} contains an empty keyword")]
    EmptyKeyword { set: String },
}

impl ScriptError {
    pub fn code(&self) -> &'static str {
        codes::INVALID_SCRIPT
    }
}

/// Structured error payload for drivers that report failures as JSON.
/// Carries enough for a caller to tell what went wrong and what to do next.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Hint about how to recover
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl From<&EpisodeError> for ErrorReport {
    fn from(err: &EpisodeError) -> Self {
        ErrorReport {
            error: err.code().to_string(),
            message: err.to_string(),
            docs_hint: Some("Each episode accepts exactly one reply per stage after reset().".to_string()),
        }
    }
}

impl From<&ScriptError> for ErrorReport {
    fn from(err: &ScriptError) -> Self {
        ErrorReport {
            error: err.code().to_string(),
            message: err.to_string(),
            docs_hint: Some("Run `grandmas-house script show` for a valid script layout.".to_string()),
        }
    }
}

/// Error codes shared by the core and its drivers
pub mod codes {
    pub const EPISODE_NOT_STARTED: &str = "episode_not_started";
    pub const EPISODE_FINISHED: &str = "episode_finished";
    pub const INVALID_SCRIPT: &str = "invalid_script";
}
