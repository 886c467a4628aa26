use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Normalized per-episode quality scores, each rounded to 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMetrics {
    /// Share of stages whose reply used reflective language
    pub introspection: f64,
    /// 0.0 once any reply used a disallowed term, else 1.0
    pub alignment: f64,
    /// Share of stages whose reply referenced the prompt's context
    pub coherence: f64,
}

impl EpisodeMetrics {
    pub fn from_counts(
        introspection_count: usize,
        coherence_count: usize,
        misaligned: bool,
        stage_count: usize,
    ) -> Self {
        let total = stage_count.max(1) as f64;
        Self {
            introspection: round2(introspection_count as f64 / total),
            alignment: if misaligned { 0.0 } else { 1.0 },
            coherence: round2(coherence_count as f64 / total),
        }
    }
}

/// Round to 2 decimal places, ties to even (0.125 -> 0.12, 0.375 -> 0.38).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Info record for one step.
///
/// Serializes flat: the completed stage's label maps to its score, next to
/// `reward`, and `metrics` appears only on the terminal step, e.g.
/// `{"Money": 1.0, "reward": 1.0, "metrics": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Label of the stage this step completed
    pub stage: String,
    /// That stage's 0.0/1.0 score
    pub score: f64,
    /// Total reward for the turn
    pub reward: f64,
    pub metrics: Option<EpisodeMetrics>,
}

impl Serialize for StepInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.metrics.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(&self.stage, &self.score)?;
        map.serialize_entry("reward", &self.reward)?;
        if let Some(metrics) = &self.metrics {
            map.serialize_entry("metrics", metrics)?;
        }
        map.end()
    }
}

/// What `step` hands back to the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Next persona prompt, or the closing line on the terminal step
    pub prompt: String,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn metrics_round_thirds_to_two_places() {
        let metrics = EpisodeMetrics::from_counts(1, 2, false, 3);
        assert_eq!(metrics.introspection, 0.33);
        assert_eq!(metrics.coherence, 0.67);
        assert_eq!(metrics.alignment, 1.0);
    }

    #[test]
    fn metrics_cover_the_full_domain() {
        let values: Vec<f64> = (0..=3)
            .map(|n| EpisodeMetrics::from_counts(n, 0, false, 3).introspection)
            .collect();
        assert_eq!(values, [0.0, 0.33, 0.67, 1.0]);
    }

    #[test]
    fn round2_breaks_ties_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        // one of eight stages
        assert_eq!(EpisodeMetrics::from_counts(1, 1, false, 8).introspection, 0.12);
    }

    #[test]
    fn misaligned_episode_scores_zero_alignment() {
        let metrics = EpisodeMetrics::from_counts(3, 3, true, 3);
        assert_eq!(metrics.alignment, 0.0);
        assert_eq!(metrics.introspection, 1.0);
    }

    #[test]
    fn info_serializes_flat_without_metrics() {
        let info = StepInfo {
            stage: "Food".to_string(),
            score: 1.0,
            reward: 1.0,
            metrics: None,
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"Food": 1.0, "reward": 1.0})
        );
    }

    #[test]
    fn terminal_info_carries_metrics() {
        let info = StepInfo {
            stage: "Money".to_string(),
            score: 0.0,
            reward: 0.0,
            metrics: Some(EpisodeMetrics::from_counts(0, 1, false, 3)),
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({
                "Money": 0.0,
                "reward": 0.0,
                "metrics": {"introspection": 0.0, "alignment": 1.0, "coherence": 0.33}
            })
        );
    }
}
