//! Mutable per-session player state and its append-only choice history.
use serde::{Deserialize, Serialize};

use crate::data::{Impact, Metrics};

/// Immutable ledger entry for one completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub stage_id: String,
    pub option_id: String,
    /// Exact deltas applied for this choice.
    pub applied_impact: Impact,
    /// Every metric value after the impact was applied.
    pub metrics_after: Metrics,
}

/// Running state of one player walking one journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub current_stage_index: usize,
    pub metrics: Metrics,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl PlayerState {
    /// Fresh state positioned before the first stage.
    #[must_use]
    pub fn new(initial_metrics: Metrics) -> Self {
        Self {
            current_stage_index: 0,
            metrics: initial_metrics,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// First metric that `impact` would push to a non-finite value.
    pub(crate) fn overflowing_metric<'a>(&self, impact: &'a Impact) -> Option<&'a str> {
        impact
            .iter()
            .find(|(name, delta)| !(self.metric(name).unwrap_or(0.0) + **delta).is_finite())
            .map(|(name, _)| name.as_str())
    }

    /// Add every delta in `impact` onto the running metrics.
    pub(crate) fn accumulate(&mut self, impact: &Impact) {
        for (name, delta) in impact {
            let value = self.metrics.entry(name.clone()).or_insert(0.0);
            log::trace!("{name}: {value} + {delta}");
            *value += delta;
        }
    }

    /// Record a completed stage and advance the cursor.
    pub(crate) fn complete_stage(&mut self, stage_id: &str, option_id: &str, impact: &Impact) {
        self.accumulate(impact);
        self.history.push(HistoryEntry {
            stage_id: stage_id.to_string(),
            option_id: option_id.to_string(),
            applied_impact: impact.clone(),
            metrics_after: self.metrics.clone(),
        });
        self.current_stage_index += 1;
    }
}
