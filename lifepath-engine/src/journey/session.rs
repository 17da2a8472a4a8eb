use crate::data::{JourneyDefinition, Stage};
use crate::journey::summary::JourneySummary;
use crate::journey::{JourneyError, JourneyPhase};
use crate::state::PlayerState;
use crate::validate::ValidatedJourney;

/// Session wrapper binding one shared journey definition to one player state.
#[derive(Debug, Clone)]
pub struct JourneySession {
    journey: ValidatedJourney,
    state: PlayerState,
}

impl JourneySession {
    /// Begin a fresh session positioned at the first stage.
    #[must_use]
    pub fn new(journey: &ValidatedJourney) -> Self {
        let state = PlayerState::new(journey.initial_metrics());
        log::debug!(
            "starting journey '{}' with {} metrics",
            journey.id,
            state.metrics.len()
        );
        Self {
            journey: journey.clone(),
            state,
        }
    }

    /// Rebuild a session around a state that has already been checked.
    pub(crate) fn from_parts(journey: ValidatedJourney, state: PlayerState) -> Self {
        Self { journey, state }
    }

    #[must_use]
    pub const fn journey(&self) -> &ValidatedJourney {
        &self.journey
    }

    #[must_use]
    pub fn definition(&self) -> &JourneyDefinition {
        self.journey.definition()
    }

    /// Borrow the underlying player state.
    #[must_use]
    pub const fn state(&self) -> &PlayerState {
        &self.state
    }

    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.state.metric(name)
    }

    /// Completed and total stage counts.
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        (self.state.current_stage_index, self.journey.stages.len())
    }

    #[must_use]
    pub fn phase(&self) -> JourneyPhase {
        let (completed, total) = self.progress();
        JourneyPhase::from_progress(completed, total)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.current_stage_index == self.journey.stages.len()
    }

    /// Stage awaiting a choice.
    ///
    /// # Errors
    ///
    /// Returns [`JourneyError::JourneyComplete`] once every stage is done.
    pub fn current_stage(&self) -> Result<&Stage, JourneyError> {
        self.journey
            .stage(self.state.current_stage_index)
            .ok_or(JourneyError::JourneyComplete)
    }

    /// Apply the chosen option of the current stage and advance.
    ///
    /// Selection is all-or-nothing: on error the state is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`JourneyError::UnknownStage`] when `stage_id` is not the current
    /// stage (including after completion), [`JourneyError::UnknownOption`]
    /// when the current stage does not offer `option_id`, and
    /// [`JourneyError::MetricOverflow`] when a metric would leave the finite range.
    pub fn select_option(
        &mut self,
        stage_id: &str,
        option_id: &str,
    ) -> Result<&PlayerState, JourneyError> {
        let Some(stage) = self.journey.stage(self.state.current_stage_index) else {
            log::warn!("rejected '{stage_id}/{option_id}': journey already complete");
            return Err(JourneyError::UnknownStage {
                expected: None,
                requested: stage_id.to_string(),
            });
        };
        if stage.id != stage_id {
            log::warn!(
                "rejected stale stage '{stage_id}' (current stage is '{}')",
                stage.id
            );
            return Err(JourneyError::UnknownStage {
                expected: Some(stage.id.clone()),
                requested: stage_id.to_string(),
            });
        }
        let Some(option) = stage.option(option_id) else {
            log::warn!("rejected unknown option '{option_id}' at stage '{stage_id}'");
            return Err(JourneyError::UnknownOption {
                stage: stage.id.clone(),
                option: option_id.to_string(),
            });
        };

        if let Some(metric) = self.state.overflowing_metric(&option.impact) {
            log::warn!("rejected '{stage_id}/{option_id}': '{metric}' would overflow");
            return Err(JourneyError::MetricOverflow {
                stage: stage.id.clone(),
                option: option.id.clone(),
                metric: metric.to_string(),
            });
        }

        self.state
            .complete_stage(&stage.id, &option.id, &option.impact);
        log::debug!(
            "journey '{}' stage {}/{}: '{}' -> '{}'",
            self.journey.id,
            self.state.current_stage_index,
            self.journey.stages.len(),
            stage_id,
            option_id
        );
        Ok(&self.state)
    }

    /// End-of-journey review data.
    ///
    /// # Errors
    ///
    /// Returns [`JourneyError::JourneyIncomplete`] before the final stage is done.
    pub fn summarize(&self) -> Result<JourneySummary, JourneyError> {
        if !self.is_complete() {
            let (completed, total) = self.progress();
            return Err(JourneyError::JourneyIncomplete { completed, total });
        }
        Ok(JourneySummary::build(self.definition(), &self.state))
    }

    /// Consume the session, returning the underlying player state.
    #[must_use]
    pub fn into_state(self) -> PlayerState {
        self.state
    }
}

/// Validate `definition` and start a session on it.
///
/// # Errors
///
/// Returns [`JourneyError::InvalidDefinition`] when the definition breaks a
/// structural rule.
pub fn start_session(definition: JourneyDefinition) -> Result<JourneySession, JourneyError> {
    let journey = ValidatedJourney::new(definition)?;
    Ok(JourneySession::new(&journey))
}

/// Play `option_ids` in order, one per stage, from a fresh session.
///
/// # Errors
///
/// Returns the first selection error; more ids than stages yields
/// [`JourneyError::JourneyComplete`].
pub fn replay(
    journey: &ValidatedJourney,
    option_ids: &[&str],
) -> Result<JourneySession, JourneyError> {
    let mut session = JourneySession::new(journey);
    for option_id in option_ids {
        let stage_id = session.current_stage()?.id.clone();
        session.select_option(&stage_id, option_id)?;
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_STAGE: &str = r#"{
        "id": "two-stage",
        "stages": [
            { "id": "A", "title": "Stage A", "options": [
                { "id": "A1", "label": "Take the class", "impact": { "netWorth": -1000, "knowledge": 1 } },
                { "id": "A2", "label": "Pocket the money", "impact": { "netWorth": 500 } }
            ] },
            { "id": "B", "title": "Stage B", "options": [
                { "id": "B1", "label": "Invest", "impact": { "netWorth": 2000, "risk": 2 } }
            ] }
        ]
    }"#;

    fn two_stage() -> ValidatedJourney {
        ValidatedJourney::new(JourneyDefinition::from_json(TWO_STAGE).unwrap()).unwrap()
    }

    #[test]
    fn new_session_starts_at_first_stage_with_zeroed_metrics() {
        let session = JourneySession::new(&two_stage());
        assert_eq!(session.progress(), (0, 2));
        assert_eq!(session.phase(), JourneyPhase::NotStarted);
        assert_eq!(session.current_stage().unwrap().id, "A");
        assert_eq!(session.state().metrics.len(), 3);
        assert!(session.state().metrics.values().all(|v| *v == 0.0));
        assert!(session.state().history.is_empty());
    }

    #[test]
    fn selecting_advances_and_accumulates() {
        let mut session = JourneySession::new(&two_stage());
        session.select_option("A", "A1").unwrap();
        assert_eq!(session.phase(), JourneyPhase::InProgress { stage_index: 1 });
        assert_eq!(session.metric("netWorth"), Some(-1000.0));

        let state = session.select_option("B", "B1").unwrap();
        assert_eq!(state.current_stage_index, 2);
        assert!(session.is_complete());
        assert_eq!(session.metric("netWorth"), Some(1000.0));
        assert_eq!(session.metric("knowledge"), Some(1.0));
        assert_eq!(session.metric("risk"), Some(2.0));
        assert_eq!(session.current_stage(), Err(JourneyError::JourneyComplete));
    }

    #[test]
    fn stale_stage_is_rejected_without_mutation() {
        let mut session = JourneySession::new(&two_stage());
        session.select_option("A", "A2").unwrap();
        let before = session.state().clone();

        let err = session.select_option("A", "A2").unwrap_err();
        assert_eq!(
            err,
            JourneyError::UnknownStage {
                expected: Some("B".to_string()),
                requested: "A".to_string()
            }
        );
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn unknown_option_is_rejected_without_mutation() {
        let mut session = JourneySession::new(&two_stage());
        let before = session.state().clone();
        let err = session.select_option("A", "B1").unwrap_err();
        assert!(matches!(err, JourneyError::UnknownOption { ref option, .. } if option == "B1"));
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn selecting_after_completion_is_rejected() {
        let mut session = replay(&two_stage(), &["A1", "B1"]).unwrap();
        let before = session.state().clone();
        let err = session.select_option("B", "B1").unwrap_err();
        assert_eq!(
            err,
            JourneyError::UnknownStage {
                expected: None,
                requested: "B".to_string()
            }
        );
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn summarize_is_gated_on_completion() {
        let mut session = JourneySession::new(&two_stage());
        assert_eq!(
            session.summarize().unwrap_err(),
            JourneyError::JourneyIncomplete {
                completed: 0,
                total: 2
            }
        );
        session.select_option("A", "A1").unwrap();
        assert!(session.summarize().is_err());
        session.select_option("B", "B1").unwrap();
        let summary = session.summarize().unwrap();
        assert_eq!(summary.trajectory["netWorth"], vec![-1000.0, 1000.0]);
    }

    #[test]
    fn replay_reports_overrun_and_bad_ids() {
        let journey = two_stage();
        assert_eq!(
            replay(&journey, &["A1", "B1", "B1"]).unwrap_err(),
            JourneyError::JourneyComplete
        );
        assert!(matches!(
            replay(&journey, &["A3"]).unwrap_err(),
            JourneyError::UnknownOption { .. }
        ));
    }

    #[test]
    fn start_session_rejects_invalid_definitions() {
        let mut def = JourneyDefinition::from_json(TWO_STAGE).unwrap();
        def.stages[1].options.clear();
        assert!(matches!(
            start_session(def),
            Err(JourneyError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn sessions_share_definition_without_interference() {
        let journey = two_stage();
        let mut first = JourneySession::new(&journey);
        let second = JourneySession::new(&journey);
        first.select_option("A", "A1").unwrap();
        assert_eq!(second.progress(), (0, 2));
        assert_eq!(second.metric("netWorth"), Some(0.0));
    }

    #[test]
    fn overflowing_selection_is_rejected_without_mutation() {
        let def = JourneyDefinition::from_json(
            r#"{ "id": "huge", "stages": [
                { "id": "x", "title": "X", "options": [ { "id": "x1", "label": "X1", "impact": { "netWorth": 1e308 } } ] },
                { "id": "y", "title": "Y", "options": [ { "id": "y1", "label": "Y1", "impact": { "netWorth": 1e308 } } ] }
            ] }"#,
        )
        .unwrap();
        let journey = ValidatedJourney::new(def).unwrap();
        let mut session = replay(&journey, &["x1"]).unwrap();
        let before = session.state().clone();

        let err = session.select_option("y", "y1").unwrap_err();
        assert_eq!(
            err,
            JourneyError::MetricOverflow {
                stage: "y".to_string(),
                option: "y1".to_string(),
                metric: "netWorth".to_string()
            }
        );
        assert_eq!(session.state(), &before);

        let snapshot = session.snapshot();
        let restored = crate::SessionSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored.state.metrics["netWorth"], 1e308);
    }
}
