//! Serializable session snapshots for external persistence adapters.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::journey::{JourneyError, JourneySession};
use crate::state::PlayerState;
use crate::validate::ValidatedJourney;

/// Opaque save payload: the player state plus what it was played against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub journey_id: String,
    pub definition_fingerprint: u64,
    pub state: PlayerState,
}

impl SessionSnapshot {
    /// Encode as JSON for storage media that hold text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from JSON produced by [`SessionSnapshot::to_json`].
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Reasons a stored snapshot cannot be resumed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("snapshot belongs to journey '{found}', not '{expected}'")]
    JourneyMismatch { expected: String, found: String },
    #[error("snapshot was taken against different content ({found:016x} != {expected:016x})")]
    FingerprintMismatch { expected: u64, found: u64 },
    #[error("stage index {index} is past the final stage ({total} stages)")]
    IndexOutOfRange { index: usize, total: usize },
    #[error("history holds {history} entries but stage index is {index}")]
    HistoryLength { history: usize, index: usize },
    #[error("history entry {position} names stage '{found}', expected '{expected}'")]
    StageOrder {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("history entry {position} names unknown option '{option}'")]
    UnknownOption { position: usize, option: String },
    #[error("history entry {position} applied an impact that differs from its option")]
    ImpactMismatch { position: usize },
    #[error("metrics after history entry {position} do not match a replay")]
    MetricsMismatch { position: usize },
    #[error("final metrics do not match a replay of the history")]
    FinalMetricsMismatch,
}

impl JourneySession {
    /// Capture the session for an external persistence adapter.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            journey_id: self.journey().id.clone(),
            definition_fingerprint: self.journey().fingerprint(),
            state: self.state().clone(),
        }
    }

    /// Resume a session from a snapshot after re-deriving its history.
    ///
    /// # Errors
    ///
    /// Returns [`JourneyError::InvalidSnapshot`] when the snapshot does not
    /// belong to `journey` or its history cannot be replayed to the stored
    /// metrics.
    pub fn restore(
        journey: &ValidatedJourney,
        snapshot: SessionSnapshot,
    ) -> Result<Self, JourneyError> {
        if let Err(err) = check_snapshot(journey, &snapshot) {
            log::warn!("rejected snapshot for journey '{}': {err}", journey.id);
            return Err(err.into());
        }
        log::debug!(
            "restored journey '{}' at stage {}",
            journey.id,
            snapshot.state.current_stage_index
        );
        Ok(Self::from_parts(journey.clone(), snapshot.state))
    }
}

fn check_snapshot(
    journey: &ValidatedJourney,
    snapshot: &SessionSnapshot,
) -> Result<(), SnapshotError> {
    if snapshot.journey_id != journey.id {
        return Err(SnapshotError::JourneyMismatch {
            expected: journey.id.clone(),
            found: snapshot.journey_id.clone(),
        });
    }
    if snapshot.definition_fingerprint != journey.fingerprint() {
        return Err(SnapshotError::FingerprintMismatch {
            expected: journey.fingerprint(),
            found: snapshot.definition_fingerprint,
        });
    }

    let state = &snapshot.state;
    let total = journey.stages.len();
    if state.current_stage_index > total {
        return Err(SnapshotError::IndexOutOfRange {
            index: state.current_stage_index,
            total,
        });
    }
    if state.history.len() != state.current_stage_index {
        return Err(SnapshotError::HistoryLength {
            history: state.history.len(),
            index: state.current_stage_index,
        });
    }

    let mut replayed = PlayerState::new(journey.initial_metrics());
    for (position, (entry, stage)) in state.history.iter().zip(&journey.stages).enumerate() {
        if entry.stage_id != stage.id {
            return Err(SnapshotError::StageOrder {
                position,
                expected: stage.id.clone(),
                found: entry.stage_id.clone(),
            });
        }
        let Some(option) = stage.option(&entry.option_id) else {
            return Err(SnapshotError::UnknownOption {
                position,
                option: entry.option_id.clone(),
            });
        };
        if entry.applied_impact != option.impact {
            return Err(SnapshotError::ImpactMismatch { position });
        }
        replayed.complete_stage(&stage.id, &option.id, &option.impact);
        if replayed.metrics != entry.metrics_after {
            return Err(SnapshotError::MetricsMismatch { position });
        }
    }
    if replayed.metrics != state.metrics {
        return Err(SnapshotError::FinalMetricsMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::JourneyDefinition;
    use crate::journey::replay;

    fn journey() -> ValidatedJourney {
        let json = r#"{
            "id": "resume",
            "metrics": [ { "name": "savings", "baseline": 250 } ],
            "stages": [
                { "id": "one", "title": "One", "options": [
                    { "id": "a", "label": "A", "impact": { "savings": 100, "risk": 1 } },
                    { "id": "b", "label": "B", "impact": { "savings": -100 } }
                ] },
                { "id": "two", "title": "Two", "options": [
                    { "id": "c", "label": "C", "impact": { "savings": 50 } }
                ] }
            ]
        }"#;
        ValidatedJourney::new(JourneyDefinition::from_json(json).unwrap()).unwrap()
    }

    #[test]
    fn snapshot_roundtrips_through_json_and_resumes() {
        let journey = journey();
        let session = replay(&journey, &["a"]).unwrap();
        let json = session.snapshot().to_json().unwrap();

        let mut restored =
            JourneySession::restore(&journey, SessionSnapshot::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored.state(), session.state());
        restored.select_option("two", "c").unwrap();
        assert!(restored.is_complete());
        assert_eq!(restored.metric("savings"), Some(400.0));
    }

    #[test]
    fn restore_rejects_other_journeys_and_changed_content() {
        let journey = journey();
        let mut snapshot = replay(&journey, &["b"]).unwrap().snapshot();
        snapshot.journey_id = "elsewhere".to_string();
        assert!(matches!(
            JourneySession::restore(&journey, snapshot),
            Err(JourneyError::InvalidSnapshot(SnapshotError::JourneyMismatch { .. }))
        ));

        let mut snapshot = replay(&journey, &["b"]).unwrap().snapshot();
        snapshot.definition_fingerprint ^= 1;
        assert!(matches!(
            JourneySession::restore(&journey, snapshot),
            Err(JourneyError::InvalidSnapshot(SnapshotError::FingerprintMismatch { .. }))
        ));
    }

    #[test]
    fn restore_rejects_inconsistent_progress() {
        let journey = journey();
        let mut snapshot = replay(&journey, &["a"]).unwrap().snapshot();
        snapshot.state.current_stage_index = 2;
        assert!(matches!(
            JourneySession::restore(&journey, snapshot),
            Err(JourneyError::InvalidSnapshot(SnapshotError::HistoryLength { .. }))
        ));

        let mut snapshot = replay(&journey, &["a"]).unwrap().snapshot();
        snapshot.state.current_stage_index = 5;
        assert!(matches!(
            JourneySession::restore(&journey, snapshot),
            Err(JourneyError::InvalidSnapshot(SnapshotError::IndexOutOfRange { .. }))
        ));
    }

    #[test]
    fn restore_rejects_tampered_history_and_metrics() {
        let journey = journey();
        let mut snapshot = replay(&journey, &["a"]).unwrap().snapshot();
        snapshot.state.history[0].option_id = "z".to_string();
        assert!(matches!(
            JourneySession::restore(&journey, snapshot),
            Err(JourneyError::InvalidSnapshot(SnapshotError::UnknownOption { .. }))
        ));

        let mut snapshot = replay(&journey, &["a"]).unwrap().snapshot();
        snapshot
            .state
            .history[0]
            .applied_impact
            .insert("savings".to_string(), 9_999.0);
        assert!(matches!(
            JourneySession::restore(&journey, snapshot),
            Err(JourneyError::InvalidSnapshot(SnapshotError::ImpactMismatch { position: 0 }))
        ));

        let mut snapshot = replay(&journey, &["a"]).unwrap().snapshot();
        snapshot.state.metrics.insert("savings".to_string(), 1_000_000.0);
        assert!(matches!(
            JourneySession::restore(&journey, snapshot),
            Err(JourneyError::InvalidSnapshot(SnapshotError::FinalMetricsMismatch))
        ));

        let mut snapshot = replay(&journey, &["a"]).unwrap().snapshot();
        snapshot.state.history[0].stage_id = "two".to_string();
        assert!(matches!(
            JourneySession::restore(&journey, snapshot),
            Err(JourneyError::InvalidSnapshot(SnapshotError::StageOrder { .. }))
        ));
    }
}
