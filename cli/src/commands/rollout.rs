use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use grandmas_house_core::metrics::round2;
use grandmas_house_core::{Episode, EpisodeMetrics, ErrorReport, Script, StepResult};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::util::{EXIT_EPISODE_ERROR, ScriptSource, exit_error, print_json, read_json_from_file};

#[derive(Args)]
pub struct RolloutArgs {
    /// JSON file with one array of replies per episode (use '-' for stdin)
    #[arg(long, short = 'r')]
    pub replies: String,
    /// Print compact JSON
    #[arg(long)]
    pub raw: bool,
}

/// One agent reply and what the episode made of it.
#[derive(Debug, Serialize)]
pub struct Turn {
    pub reply: String,
    pub result: StepResult,
}

/// Everything one episode produced for a sequence of replies.
#[derive(Debug, Serialize)]
pub struct EpisodeOutcome {
    pub episode_id: Uuid,
    pub opening_prompt: String,
    pub turns: Vec<Turn>,
    pub total_reward: f64,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EpisodeMetrics>,
    /// Set when the sequence had more replies than the script has stages,
    /// or when the episode task was lost
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

/// Group means across a rollout.
#[derive(Debug, Serialize, PartialEq)]
pub struct GroupSummary {
    pub episodes: usize,
    pub completed: usize,
    /// Mean total reward per episode
    pub mean_reward: f64,
    /// Means over completed episodes only; absent when none completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_metrics: Option<EpisodeMetrics>,
}

#[derive(Debug, Serialize)]
pub struct RolloutReport {
    pub generated_at: DateTime<Utc>,
    pub script: String,
    pub summary: GroupSummary,
    pub episodes: Vec<EpisodeOutcome>,
}

pub async fn run(script: Arc<Script>, source: &ScriptSource, args: RolloutArgs) -> i32 {
    let value = match read_json_from_file(&args.replies) {
        Ok(v) => v,
        Err(e) => exit_error(
            &e,
            Some("Expected a JSON array of reply arrays, e.g. [[\"I'll cook\", \"Sell it\", \"Budget\"]]"),
        ),
    };
    let groups = match parse_reply_groups(value) {
        Ok(g) => g,
        Err(e) => exit_error(&e, Some("Each episode must be an array of replies.")),
    };

    let template = match Episode::new(script) {
        Ok(episode) => episode,
        Err(e) => exit_error(&e.to_string(), None),
    };

    tracing::info!(episodes = groups.len(), script = %source, "starting rollout");
    let episodes = run_group(&template, groups).await;
    let summary = summarize(&episodes);
    tracing::info!(
        completed = summary.completed,
        mean_reward = summary.mean_reward,
        "rollout finished"
    );

    let failed = episodes.iter().any(|outcome| outcome.error.is_some());
    let report = RolloutReport {
        generated_at: Utc::now(),
        script: source.to_string(),
        summary,
        episodes,
    };
    print_json(&report, args.raw);

    if failed { EXIT_EPISODE_ERROR } else { 0 }
}

/// Error code for an episode whose task panicked or was cancelled.
pub const ROLLOUT_TASK_FAILED: &str = "rollout_task_failed";

/// Run every reply sequence in its own episode, one task per episode.
/// Outcomes come back in input order, one per sequence.
pub async fn run_group(template: &Episode, groups: Vec<Vec<String>>) -> Vec<EpisodeOutcome> {
    let mut tasks = JoinSet::new();
    let mut slots: Vec<Option<EpisodeOutcome>> = Vec::with_capacity(groups.len());
    for (index, replies) in groups.into_iter().enumerate() {
        let episode = template.clone();
        tasks.spawn(async move { (index, play_sequence(episode, &replies)) });
        slots.push(None);
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(e) => tracing::error!("rollout task failed: {e}"),
        }
    }
    fill_failed_slots(template, slots)
}

/// Replace every empty slot with a failed outcome, so a lost task still
/// shows up in the report and the exit code.
fn fill_failed_slots(template: &Episode, slots: Vec<Option<EpisodeOutcome>>) -> Vec<EpisodeOutcome> {
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.unwrap_or_else(|| failed_outcome(template, index)))
        .collect()
}

fn failed_outcome(template: &Episode, index: usize) -> EpisodeOutcome {
    EpisodeOutcome {
        episode_id: Uuid::now_v7(),
        opening_prompt: template.script().stages[0].prompt.clone(),
        turns: Vec::new(),
        total_reward: 0.0,
        done: false,
        metrics: None,
        error: Some(ErrorReport {
            error: ROLLOUT_TASK_FAILED.to_string(),
            message: format!("Episode {index} did not finish: its task panicked or was cancelled"),
            docs_hint: Some("Check the logs on stderr for the task error.".to_string()),
        }),
    }
}

/// Reset `episode` and feed it `replies` in order. Stops at the first
/// rejected step; a short sequence leaves the episode incomplete.
pub fn play_sequence(mut episode: Episode, replies: &[String]) -> EpisodeOutcome {
    let episode_id = Uuid::now_v7();
    let opening_prompt = episode.reset().to_string();
    let mut turns = Vec::with_capacity(replies.len());
    let mut error = None;

    for reply in replies {
        match episode.step(reply) {
            Ok(result) => turns.push(Turn {
                reply: reply.clone(),
                result,
            }),
            Err(e) => {
                tracing::warn!(%episode_id, "extra reply rejected: {e}");
                error = Some(ErrorReport::from(&e));
                break;
            }
        }
    }

    let total_reward = turns.iter().map(|turn| turn.result.reward).sum();
    let metrics = turns.last().and_then(|turn| turn.result.info.metrics);

    EpisodeOutcome {
        episode_id,
        opening_prompt,
        turns,
        total_reward,
        done: episode.is_done(),
        metrics,
        error,
    }
}

/// Accepts `[[...], ...]` or `{"episodes": [[...], ...]}`. Replies that are
/// not strings are scored as empty text.
pub fn parse_reply_groups(value: Value) -> Result<Vec<Vec<String>>, String> {
    let groups = match value {
        Value::Array(groups) => groups,
        Value::Object(mut map) => match map.remove("episodes") {
            Some(Value::Array(groups)) => groups,
            _ => return Err("Object input must carry an 'episodes' array".to_string()),
        },
        _ => return Err("Replies must be a JSON array".to_string()),
    };

    groups
        .into_iter()
        .enumerate()
        .map(|(index, group)| match group {
            Value::Array(replies) => Ok(replies
                .into_iter()
                .map(|reply| match reply {
                    Value::String(text) => text,
                    other => {
                        tracing::warn!(episode = index, "non-text reply scored as empty: {other}");
                        String::new()
                    }
                })
                .collect()),
            _ => Err(format!("Episode {index} is not an array of replies")),
        })
        .collect()
}

pub fn summarize(outcomes: &[EpisodeOutcome]) -> GroupSummary {
    let episodes = outcomes.len();
    let completed: Vec<EpisodeMetrics> = outcomes.iter().filter_map(|o| o.metrics).collect();

    let mean_reward = if episodes == 0 {
        0.0
    } else {
        round2(outcomes.iter().map(|o| o.total_reward).sum::<f64>() / episodes as f64)
    };

    let mean_metrics = if completed.is_empty() {
        None
    } else {
        Some(EpisodeMetrics {
            introspection: mean_of(&completed, |m| m.introspection),
            alignment: mean_of(&completed, |m| m.alignment),
            coherence: mean_of(&completed, |m| m.coherence),
        })
    };

    GroupSummary {
        episodes,
        completed: completed.len(),
        mean_reward,
        mean_metrics,
    }
}

fn mean_of(metrics: &[EpisodeMetrics], field: impl Fn(&EpisodeMetrics) -> f64) -> f64 {
    round2(metrics.iter().map(field).sum::<f64>() / metrics.len() as f64)
}
