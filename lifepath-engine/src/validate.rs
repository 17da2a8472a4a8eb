//! Structural checks run once per journey definition before any session starts.
use std::collections::HashSet;
use std::hash::Hasher;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::data::JourneyDefinition;

/// Structural problems in journey content.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("journey '{journey}' has no stages")]
    EmptyJourney { journey: String },
    #[error("journey definition is missing an id")]
    MissingJourneyId,
    #[error("stage #{index} is missing an id")]
    MissingStageId { index: usize },
    #[error("stage '{stage}' option #{index} is missing an id")]
    MissingOptionId { stage: String, index: usize },
    #[error("stage '{stage}' offers no options")]
    StageWithoutOptions { stage: String },
    #[error("stage id '{stage}' appears more than once")]
    DuplicateStage { stage: String },
    #[error("stage '{stage}' repeats option id '{option}'")]
    DuplicateOption { stage: String, option: String },
    #[error("stage '{stage}' option '{option}' has non-finite delta {value} for '{metric}'")]
    NonFiniteImpact {
        stage: String,
        option: String,
        metric: String,
        value: f64,
    },
    #[error("metric '{metric}' is declared more than once")]
    DuplicateMetric { metric: String },
    #[error("metric '{metric}' has non-finite baseline {value}")]
    NonFiniteBaseline { metric: String, value: f64 },
}

/// Check every structural rule, reporting the first violation found.
///
/// # Errors
///
/// Returns the first [`DefinitionError`] encountered walking metrics, then
/// stages in order.
pub fn validate_definition(def: &JourneyDefinition) -> Result<(), DefinitionError> {
    if def.id.trim().is_empty() {
        return Err(DefinitionError::MissingJourneyId);
    }
    if def.stages.is_empty() {
        return Err(DefinitionError::EmptyJourney {
            journey: def.id.clone(),
        });
    }

    let mut metric_names = HashSet::new();
    for spec in &def.metrics {
        if !metric_names.insert(spec.name.as_str()) {
            return Err(DefinitionError::DuplicateMetric {
                metric: spec.name.clone(),
            });
        }
        if !spec.baseline.is_finite() {
            return Err(DefinitionError::NonFiniteBaseline {
                metric: spec.name.clone(),
                value: spec.baseline,
            });
        }
    }

    let mut stage_ids = HashSet::new();
    for (index, stage) in def.stages.iter().enumerate() {
        if stage.id.trim().is_empty() {
            return Err(DefinitionError::MissingStageId { index });
        }
        if !stage_ids.insert(stage.id.as_str()) {
            return Err(DefinitionError::DuplicateStage {
                stage: stage.id.clone(),
            });
        }
        if stage.options.is_empty() {
            return Err(DefinitionError::StageWithoutOptions {
                stage: stage.id.clone(),
            });
        }

        let mut option_ids = HashSet::new();
        for (option_index, option) in stage.options.iter().enumerate() {
            if option.id.trim().is_empty() {
                return Err(DefinitionError::MissingOptionId {
                    stage: stage.id.clone(),
                    index: option_index,
                });
            }
            if !option_ids.insert(option.id.as_str()) {
                return Err(DefinitionError::DuplicateOption {
                    stage: stage.id.clone(),
                    option: option.id.clone(),
                });
            }
            if let Some((metric, value)) = option
                .impact
                .iter()
                .find(|(_, value)| !value.is_finite())
            {
                return Err(DefinitionError::NonFiniteImpact {
                    stage: stage.id.clone(),
                    option: option.id.clone(),
                    metric: metric.clone(),
                    value: *value,
                });
            }
        }
    }

    Ok(())
}

/// A definition that passed validation, shared read-only between sessions.
#[derive(Debug, Clone)]
pub struct ValidatedJourney {
    definition: Arc<JourneyDefinition>,
    fingerprint: u64,
}

impl ValidatedJourney {
    /// Validate `definition` and wrap it for sharing.
    ///
    /// # Errors
    ///
    /// Returns the first structural violation found.
    pub fn new(definition: JourneyDefinition) -> Result<Self, DefinitionError> {
        validate_definition(&definition)?;
        let fingerprint = fingerprint(&definition);
        log::debug!(
            "validated journey '{}' ({} stages, fingerprint {fingerprint:016x})",
            definition.id,
            definition.stages.len()
        );
        Ok(Self {
            definition: Arc::new(definition),
            fingerprint,
        })
    }

    #[must_use]
    pub fn definition(&self) -> &JourneyDefinition {
        &self.definition
    }

    /// Content hash used to pair saved sessions with the definition they ran on.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

impl Deref for ValidatedJourney {
    type Target = JourneyDefinition;

    fn deref(&self) -> &Self::Target {
        &self.definition
    }
}

impl TryFrom<JourneyDefinition> for ValidatedJourney {
    type Error = DefinitionError;

    fn try_from(value: JourneyDefinition) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Stable xxhash64 over every field that affects simulation or display.
#[must_use]
pub fn fingerprint(def: &JourneyDefinition) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    write_str(&mut hasher, &def.id);
    write_str(&mut hasher, &def.title);
    write_str(&mut hasher, &def.description);
    hasher.write_u64(def.metrics.len() as u64);
    for spec in &def.metrics {
        write_str(&mut hasher, &spec.name);
        write_str(&mut hasher, spec.label.as_deref().unwrap_or_default());
        write_str(&mut hasher, spec.unit.as_deref().unwrap_or_default());
        hasher.write_u64(spec.baseline.to_bits());
    }
    for stage in &def.stages {
        write_str(&mut hasher, &stage.id);
        write_str(&mut hasher, &stage.title);
        write_str(&mut hasher, &stage.narrative_text);
        hasher.write_u16(stage.age_at_stage.unwrap_or(u16::MAX));
        hasher.write_u64(stage.options.len() as u64);
        for option in &stage.options {
            write_str(&mut hasher, &option.id);
            write_str(&mut hasher, &option.label);
            write_str(&mut hasher, &option.description);
            hasher.write_u64(option.impact.len() as u64);
            for (metric, delta) in &option.impact {
                write_str(&mut hasher, metric);
                hasher.write_u64(delta.to_bits());
            }
            write_str(&mut hasher, &option.consequences.immediate);
            write_str(&mut hasher, &option.consequences.short_term);
            write_str(&mut hasher, &option.consequences.long_term);
        }
    }
    hasher.finish()
}

// Length prefix keeps ("ab", "c") and ("a", "bc") apart.
fn write_str(hasher: &mut XxHash64, value: &str) {
    hasher.write_u64(value.len() as u64);
    hasher.write(value.as_bytes());
}
