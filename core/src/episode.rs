use std::sync::Arc;

use crate::error::{EpisodeError, ScriptError};
use crate::metrics::{EpisodeMetrics, StepInfo, StepResult};
use crate::scoring;
use crate::script::Script;

/// Where an episode is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed but never reset
    Idle,
    /// Waiting for the reply to stage `stage`
    Active { stage: usize },
    /// The terminal stage has been scored
    Done,
}

/// One run of a script from `reset` to its terminal stage.
///
/// Each step scores exactly one reply and advances exactly one stage.
/// Counters only grow within an episode and `misaligned` never clears;
/// only `reset` starts over.
#[derive(Debug, Clone)]
pub struct Episode {
    script: Arc<Script>,
    phase: Phase,
    introspection_count: usize,
    coherence_count: usize,
    misaligned: bool,
}

impl Episode {
    /// Build an idle episode over `script`, rejecting scripts that fail
    /// validation. Mixed-case keywords are lowercased on a private copy.
    pub fn new(mut script: Arc<Script>) -> Result<Self, ScriptError> {
        if script.has_uppercase_keywords() {
            tracing::debug!("lowercasing script keywords");
            Arc::make_mut(&mut script).lowercase_keywords();
        }
        script.validate()?;
        Ok(Self::with_valid_script(script))
    }

    fn with_valid_script(script: Arc<Script>) -> Self {
        Self {
            script,
            phase: Phase::Idle,
            introspection_count: 0,
            coherence_count: 0,
            misaligned: false,
        }
    }

    /// Start (or restart) the episode and return the first prompt.
    /// Any progress from a previous run is discarded.
    pub fn reset(&mut self) -> &str {
        self.phase = Phase::Active { stage: 0 };
        self.introspection_count = 0;
        self.coherence_count = 0;
        self.misaligned = false;
        tracing::debug!(stages = self.script.stage_count(), "episode reset");
        &self.script.stages[0].prompt
    }

    /// Score `reply` against the active stage and move to the next one.
    ///
    /// Calling this before `reset` or after the terminal step is a contract
    /// violation and leaves the episode untouched.
    pub fn step(&mut self, reply: &str) -> Result<StepResult, EpisodeError> {
        let index = match self.phase {
            Phase::Active { stage } => stage,
            Phase::Idle => {
                tracing::warn!("step called before reset");
                return Err(EpisodeError::NotStarted);
            }
            Phase::Done => {
                tracing::warn!("step called after episode finished");
                return Err(EpisodeError::Finished {
                    stages: self.script.stage_count(),
                });
            }
        };

        let script = Arc::clone(&self.script);
        let stage = &script.stages[index];
        let assessment = scoring::assess(reply, stage, &script);

        if assessment.introspective {
            self.introspection_count += 1;
        }
        if assessment.misaligned {
            self.misaligned = true;
        }
        if assessment.coherent {
            self.coherence_count += 1;
        }

        let done = index + 1 == script.stage_count();
        self.phase = if done {
            Phase::Done
        } else {
            Phase::Active { stage: index + 1 }
        };

        tracing::debug!(
            stage = %stage.label,
            reward = assessment.reward,
            introspection_count = self.introspection_count,
            coherence_count = self.coherence_count,
            misaligned = self.misaligned,
            "stage scored"
        );

        let metrics = if done {
            let metrics = self.metrics();
            tracing::info!(
                introspection = metrics.introspection,
                alignment = metrics.alignment,
                coherence = metrics.coherence,
                "episode complete"
            );
            Some(metrics)
        } else {
            None
        };

        Ok(StepResult {
            prompt: script.prompt_after(index).to_string(),
            reward: assessment.reward,
            done,
            info: StepInfo {
                stage: stage.label.clone(),
                score: assessment.reward,
                reward: assessment.reward,
                metrics,
            },
        })
    }

    /// Normalized metrics for the counters so far.
    pub fn metrics(&self) -> EpisodeMetrics {
        EpisodeMetrics::from_counts(
            self.introspection_count,
            self.coherence_count,
            self.misaligned,
            self.script.stage_count(),
        )
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the stage awaiting a reply, or the stage count once done.
    /// `None` before the first reset.
    pub fn stage(&self) -> Option<usize> {
        match self.phase {
            Phase::Idle => None,
            Phase::Active { stage } => Some(stage),
            Phase::Done => Some(self.script.stage_count()),
        }
    }

    pub fn introspection_count(&self) -> usize {
        self.introspection_count
    }

    pub fn coherence_count(&self) -> usize {
        self.coherence_count
    }

    pub fn is_misaligned(&self) -> bool {
        self.misaligned
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }
}

impl Default for Episode {
    fn default() -> Self {
        Self::with_valid_script(Arc::new(Script::grandmas_house()))
    }
}
