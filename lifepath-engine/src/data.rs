//! Journey content model: stages, options, impacts and the metric vocabulary.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named numeric values keyed by metric name.
pub type Metrics = BTreeMap<String, f64>;

/// Signed deltas an option applies when selected. Absent metrics mean zero.
pub type Impact = BTreeMap<String, f64>;

/// Narrative consequences shown after a choice. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Consequences {
    #[serde(default)]
    pub immediate: String,
    #[serde(default)]
    pub short_term: String,
    #[serde(default)]
    pub long_term: String,
}

/// A selectable choice within a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub consequences: Consequences,
}

impl StageOption {
    /// Delta this option applies to `metric`, zero when not mentioned.
    #[must_use]
    pub fn delta(&self, metric: &str) -> f64 {
        self.impact.get(metric).copied().unwrap_or(0.0)
    }
}

/// One narrative decision point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub narrative_text: String,
    /// Player age shown alongside the stage; display only.
    #[serde(default)]
    pub age_at_stage: Option<u16>,
    #[serde(default)]
    pub options: Vec<StageOption>,
}

impl Stage {
    #[must_use]
    pub fn option(&self, option_id: &str) -> Option<&StageOption> {
        self.options.iter().find(|option| option.id == option_id)
    }
}

/// Declaration of a metric the journey tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub baseline: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

impl MetricSpec {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            baseline: 0.0,
            unit: None,
        }
    }

    #[must_use]
    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = baseline;
        self
    }

    /// Label for display, falling back to the metric name.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// An ordered sequence of stages forming one themed journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl JourneyDefinition {
    /// Load a journey definition from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a journey definition.
    /// Structural rules are checked separately by the validator.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn stage(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    #[must_use]
    pub fn metric_spec(&self, name: &str) -> Option<&MetricSpec> {
        self.metrics.iter().find(|spec| spec.name == name)
    }

    /// Starting metric values: declared baselines, then zero for any metric an
    /// option references without declaring it.
    #[must_use]
    pub fn initial_metrics(&self) -> Metrics {
        let mut metrics: Metrics = self
            .metrics
            .iter()
            .map(|spec| (spec.name.clone(), spec.baseline))
            .collect();
        for option in self.stages.iter().flat_map(|stage| &stage.options) {
            for name in option.impact.keys() {
                metrics.entry(name.clone()).or_insert(0.0);
            }
        }
        metrics
    }
}
