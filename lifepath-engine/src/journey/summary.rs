//! End-of-journey review data.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::{JourneyDefinition, Metrics};
use crate::state::{HistoryEntry, PlayerState};

/// One choice as the player saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub stage_id: String,
    pub stage_title: String,
    pub option_id: String,
    pub option_label: String,
}

/// Complete review of a finished journey. No score is derived here; metric
/// meaning differs between journeys, so ranking is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneySummary {
    pub journey_id: String,
    pub initial_metrics: Metrics,
    pub final_metrics: Metrics,
    /// Final minus initial value per metric.
    pub net_change: Metrics,
    /// Value of each metric after every stage, in stage order.
    pub trajectory: BTreeMap<String, Vec<f64>>,
    pub choices: Vec<ChoiceRecord>,
    pub history: Vec<HistoryEntry>,
}

impl JourneySummary {
    pub(crate) fn build(def: &JourneyDefinition, state: &PlayerState) -> Self {
        let initial_metrics = def.initial_metrics();
        let final_metrics = state.metrics.clone();

        let net_change = final_metrics
            .iter()
            .map(|(name, value)| {
                let start = initial_metrics.get(name).copied().unwrap_or(0.0);
                (name.clone(), value - start)
            })
            .collect();

        let trajectory = final_metrics
            .keys()
            .map(|name| {
                let start = initial_metrics.get(name).copied().unwrap_or(0.0);
                let series = state
                    .history
                    .iter()
                    .map(|entry| entry.metrics_after.get(name).copied().unwrap_or(start))
                    .collect();
                (name.clone(), series)
            })
            .collect();

        let choices = state
            .history
            .iter()
            .map(|entry| {
                let stage = def.stages.iter().find(|stage| stage.id == entry.stage_id);
                ChoiceRecord {
                    stage_id: entry.stage_id.clone(),
                    stage_title: stage.map(|s| s.title.clone()).unwrap_or_default(),
                    option_id: entry.option_id.clone(),
                    option_label: stage
                        .and_then(|s| s.option(&entry.option_id))
                        .map(|o| o.label.clone())
                        .unwrap_or_default(),
                }
            })
            .collect();

        Self {
            journey_id: def.id.clone(),
            initial_metrics,
            final_metrics,
            net_change,
            trajectory,
            choices,
            history: state.history.clone(),
        }
    }

    /// Trajectory for a single metric.
    #[must_use]
    pub fn series(&self, metric: &str) -> Option<&[f64]> {
        self.trajectory.get(metric).map(Vec::as_slice)
    }

    /// Metrics sorted by how much they moved, largest absolute change first.
    #[must_use]
    pub fn biggest_movers(&self) -> Vec<(&str, f64)> {
        let mut movers: Vec<(&str, f64)> = self
            .net_change
            .iter()
            .map(|(name, delta)| (name.as_str(), *delta))
            .collect();
        movers.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then_with(|| a.0.cmp(b.0)));
        movers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::replay;
    use crate::validate::ValidatedJourney;

    fn journey() -> ValidatedJourney {
        let json = r#"{
            "id": "starter",
            "metrics": [ { "name": "creditScore", "baseline": 600 }, { "name": "emotion" } ],
            "stages": [
                { "id": "s1", "title": "First card", "options": [
                    { "id": "pay", "label": "Pay in full", "impact": { "creditScore": 20, "savings": -50 } }
                ] },
                { "id": "s2", "title": "Emergency", "options": [
                    { "id": "fund", "label": "Use the fund", "impact": { "savings": -200, "emotion": 1 } },
                    { "id": "card", "label": "Charge it", "impact": { "creditScore": -15 } }
                ] },
                { "id": "s3", "title": "Raise", "options": [
                    { "id": "bank", "label": "Bank it", "impact": { "savings": 1000 } }
                ] }
            ]
        }"#;
        ValidatedJourney::new(JourneyDefinition::from_json(json).unwrap()).unwrap()
    }

    #[test]
    fn trajectory_covers_every_metric_and_stage() {
        let session = replay(&journey(), &["pay", "fund", "bank"]).unwrap();
        let summary = session.summarize().unwrap();

        assert_eq!(summary.trajectory.len(), summary.final_metrics.len());
        assert!(summary.trajectory.values().all(|series| series.len() == 3));
        assert_eq!(summary.series("creditScore"), Some(&[620.0, 620.0, 620.0][..]));
        assert_eq!(summary.series("savings"), Some(&[-50.0, -250.0, 750.0][..]));
        assert_eq!(summary.series("emotion"), Some(&[0.0, 1.0, 1.0][..]));
    }

    #[test]
    fn net_change_is_relative_to_baseline() {
        let session = replay(&journey(), &["pay", "card", "bank"]).unwrap();
        let summary = session.summarize().unwrap();
        assert_eq!(summary.final_metrics["creditScore"], 605.0);
        assert_eq!(summary.net_change["creditScore"], 5.0);
        assert_eq!(summary.net_change["emotion"], 0.0);
        assert_eq!(summary.biggest_movers()[0], ("savings", 950.0));
    }

    #[test]
    fn choices_carry_display_labels() {
        let session = replay(&journey(), &["pay", "card", "bank"]).unwrap();
        let summary = session.summarize().unwrap();
        let labels: Vec<_> = summary
            .choices
            .iter()
            .map(|c| c.option_label.as_str())
            .collect();
        assert_eq!(labels, ["Pay in full", "Charge it", "Bank it"]);
        assert_eq!(summary.choices[1].stage_title, "Emergency");
        assert_eq!(summary.history.len(), 3);
        assert_eq!(summary.journey_id, "starter");
    }
}
