//! One automated walk through a journey, checking engine invariants at every step.
use anyhow::{Context, Result, bail, ensure};
use lifepath_engine::{
    JourneyError, JourneySession, Metrics, SessionStorage, MemoryStorage, ValidatedJourney,
};
use serde::{Deserialize, Serialize};

use crate::logic::policy::PlayStrategy;

const SAVE_SLOT: &str = "playthrough";
const MISSING_OPTION: &str = "__no-such-option__";

/// One resolved stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub stage_id: String,
    pub option_id: String,
    pub option_label: String,
    pub policy_name: String,
    pub rationale: Option<String>,
}

/// Outcome of a completed playthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaythroughRecord {
    pub journey_id: String,
    pub strategy: PlayStrategy,
    pub seed: u64,
    pub decisions: Vec<DecisionRecord>,
    pub final_metrics: Metrics,
    pub net_change: Metrics,
}

impl PlaythroughRecord {
    /// Option ids in stage order, used to count distinct paths.
    #[must_use]
    pub fn path(&self) -> Vec<&str> {
        self.decisions
            .iter()
            .map(|decision| decision.option_id.as_str())
            .collect()
    }
}

/// Drive `journey` to completion with `strategy`, failing on the first broken invariant.
pub fn run_playthrough(
    journey: &ValidatedJourney,
    strategy: PlayStrategy,
    seed: u64,
) -> Result<PlaythroughRecord> {
    let mut policy = strategy.create_policy(seed);
    let mut session = JourneySession::new(journey);
    let storage = MemoryStorage::default();
    let mut expected = journey.initial_metrics();
    let mut decisions = Vec::with_capacity(journey.stages.len());
    let total = journey.stages.len();

    for step in 0..total {
        check_progress(&session, step)?;
        check_summary_gate(&session, step, total)?;
        check_rejections(&mut session, journey, step)?;

        let stage = session.current_stage()?.clone();
        let decision = policy.pick_option(session.state(), &stage);
        let Some(option) = stage.options.get(decision.option_index) else {
            bail!(
                "{} picked option #{} at stage '{}' which offers {}",
                policy.name(),
                decision.option_index,
                stage.id,
                stage.options.len()
            );
        };
        log::debug!(
            "{}: stage '{}' -> '{}' ({})",
            policy.name(),
            stage.id,
            option.id,
            decision.rationale.as_deref().unwrap_or("-")
        );

        session
            .select_option(&stage.id, &option.id)
            .with_context(|| format!("selecting '{}' at stage '{}'", option.id, stage.id))?;
        for (metric, delta) in &option.impact {
            *expected.entry(metric.clone()).or_insert(0.0) += delta;
        }
        decisions.push(DecisionRecord {
            stage_id: stage.id.clone(),
            option_id: option.id.clone(),
            option_label: option.label.clone(),
            policy_name: policy.name().to_string(),
            rationale: decision.rationale,
        });

        session = check_save_and_resume(&session, journey, &storage)?;
    }

    check_progress(&session, total)?;
    ensure!(session.is_complete(), "session not complete after {total} stages");
    ensure!(
        matches!(session.current_stage(), Err(JourneyError::JourneyComplete)),
        "current stage still available after completion"
    );
    ensure!(
        session.state().metrics == expected,
        "accumulated metrics {:?} differ from summed impacts {:?}",
        session.state().metrics,
        expected
    );

    let summary = session.summarize()?;
    for (metric, series) in &summary.trajectory {
        ensure!(
            series.len() == total,
            "trajectory for '{metric}' has {} points, expected {total}",
            series.len()
        );
        ensure!(
            series.last() == summary.final_metrics.get(metric),
            "trajectory for '{metric}' does not end at the final value"
        );
    }

    Ok(PlaythroughRecord {
        journey_id: journey.id.clone(),
        strategy,
        seed,
        decisions,
        final_metrics: summary.final_metrics,
        net_change: summary.net_change,
    })
}

fn check_progress(session: &JourneySession, step: usize) -> Result<()> {
    let state = session.state();
    ensure!(
        state.current_stage_index == step,
        "stage index {} after {step} selections",
        state.current_stage_index
    );
    ensure!(
        state.history.len() == step,
        "history has {} entries after {step} selections",
        state.history.len()
    );
    Ok(())
}

fn check_summary_gate(session: &JourneySession, step: usize, total: usize) -> Result<()> {
    match session.summarize() {
        Err(JourneyError::JourneyIncomplete { completed, total: t })
            if completed == step && t == total =>
        {
            Ok(())
        }
        Err(other) => bail!("summary before completion failed unexpectedly: {other}"),
        Ok(_) => bail!("summary available after only {step} of {total} stages"),
    }
}

/// Stale stage ids and unknown options must fail and leave the state untouched.
fn check_rejections(
    session: &mut JourneySession,
    journey: &ValidatedJourney,
    step: usize,
) -> Result<()> {
    let before = session.state().clone();
    let current = session.current_stage()?.clone();
    let stale_id = if step > 0 {
        journey.stages[step - 1].id.clone()
    } else {
        journey
            .stages
            .get(1)
            .map_or_else(|| format!("{}-stale", current.id), |stage| stage.id.clone())
    };
    let any_option = current.options[0].id.clone();

    match session.select_option(&stale_id, &any_option) {
        Err(JourneyError::UnknownStage { .. }) => {}
        Err(other) => bail!("stale stage '{stale_id}' gave unexpected error: {other}"),
        Ok(_) => bail!("stale stage '{stale_id}' was accepted at step {step}"),
    }
    ensure!(
        session.state() == &before,
        "state mutated by stale stage '{stale_id}'"
    );

    if current.option(MISSING_OPTION).is_none() {
        match session.select_option(&current.id, MISSING_OPTION) {
            Err(JourneyError::UnknownOption { .. }) => {}
            Err(other) => bail!("unknown option gave unexpected error: {other}"),
            Ok(_) => bail!("unknown option accepted at stage '{}'", current.id),
        }
        ensure!(
            session.state() == &before,
            "state mutated by unknown option at stage '{}'",
            current.id
        );
    }
    Ok(())
}

fn check_save_and_resume(
    session: &JourneySession,
    journey: &ValidatedJourney,
    storage: &MemoryStorage,
) -> Result<JourneySession> {
    storage.save_session(SAVE_SLOT, &session.snapshot())?;
    let Some(snapshot) = storage.load_session(SAVE_SLOT)? else {
        bail!("saved snapshot vanished");
    };
    let resumed = JourneySession::restore(journey, snapshot).context("resuming saved session")?;
    ensure!(
        resumed.state() == session.state(),
        "resumed state differs from saved state"
    );
    Ok(resumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifepath_engine::JourneyKind;

    fn journey(kind: JourneyKind) -> ValidatedJourney {
        ValidatedJourney::new(kind.definition().unwrap()).unwrap()
    }

    #[test]
    fn every_strategy_completes_every_bundled_journey() {
        for kind in JourneyKind::ALL {
            let journey = journey(kind);
            for strategy in PlayStrategy::ALL {
                let record = run_playthrough(&journey, strategy, 1337)
                    .unwrap_or_else(|err| panic!("{kind}/{strategy}: {err:#}"));
                assert_eq!(record.decisions.len(), journey.stages.len());
                assert_eq!(record.journey_id, kind.id());
            }
        }
    }

    #[test]
    fn growth_strategy_follows_net_worth() {
        let record = run_playthrough(&journey(JourneyKind::Homebuyer), PlayStrategy::Growth, 1)
            .unwrap();
        assert_eq!(
            record.path(),
            ["pay-down-card", "three-percent", "cash-repair", "refinance"]
        );
        assert_eq!(record.final_metrics["netWorth"], 18_000.0 - 2_500.0 + 8_000.0);
        assert_eq!(record.net_change["netWorth"], 5_500.0);
    }

    #[test]
    fn single_stage_journey_uses_synthetic_stale_id() {
        let def = lifepath_engine::JourneyDefinition::from_json(
            r#"{ "id": "one", "stages": [ { "id": "only", "title": "Only", "options": [
                { "id": "go", "label": "Go", "impact": { "savings": 1 } }
            ] } ] }"#,
        )
        .unwrap();
        let journey = ValidatedJourney::new(def).unwrap();
        let record = run_playthrough(&journey, PlayStrategy::Cautious, 0).unwrap();
        assert_eq!(record.final_metrics["savings"], 1.0);
    }
}
