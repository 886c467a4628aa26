//! Grandma's House: a scripted, multi-turn scenario that turns an agent's
//! free-text replies into a reward signal.
//!
//! A driver calls [`Episode::reset`] for the opening prompt, then
//! [`Episode::step`] once per stage with the agent's reply.

pub mod episode;
pub mod error;
pub mod metrics;
pub mod scoring;
pub mod script;

pub use episode::{Episode, Phase};
pub use error::{EpisodeError, ErrorReport, ScriptError};
pub use metrics::{EpisodeMetrics, StepInfo, StepResult};
pub use script::{Script, Stage};

pub type Result<T> = std::result::Result<T, EpisodeError>;
