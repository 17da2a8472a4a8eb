//! Lifepath Journey Engine
//!
//! Platform-agnostic core for the financial life-journey simulations.
//! A player walks an ordered list of stages, picks one option per stage, and
//! each option adds a named-metric impact onto the running player state.
//! Rendering and storage are left to the host; this crate only needs a
//! [`DefinitionLoader`] for content and a [`SessionStorage`] for saves.

pub mod catalog;
pub mod data;
pub mod journey;
pub mod state;
pub mod storage;
pub mod validate;

use anyhow::Context;
use std::cell::RefCell;
use std::collections::HashMap;

// Re-export commonly used types
pub use catalog::{BundledDefinitions, CatalogError, JourneyKind, UnknownJourney};
pub use data::{Consequences, Impact, JourneyDefinition, MetricSpec, Metrics, Stage, StageOption};
pub use journey::{
    ChoiceRecord, JourneyError, JourneyPhase, JourneySession, JourneySummary, SessionSnapshot,
    SnapshotError, replay, start_session,
};
pub use state::{HistoryEntry, PlayerState};
pub use storage::MemoryStorage;
pub use validate::{DefinitionError, ValidatedJourney, fingerprint, validate_definition};

/// Trait for abstracting where journey content comes from
pub trait DefinitionLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the definition registered under `journey_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the definition cannot be found or parsed.
    fn load_definition(&self, journey_id: &str) -> Result<JourneyDefinition, Self::Error>;
}

/// Trait for abstracting save/load of in-progress sessions
/// Platform-specific implementations should provide this
pub trait SessionStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a session snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save_session(&self, slot: &str, snapshot: &SessionSnapshot) -> Result<(), Self::Error>;

    /// Load a session snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    fn load_session(&self, slot: &str) -> Result<Option<SessionSnapshot>, Self::Error>;

    /// Delete a saved session
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_session(&self, slot: &str) -> Result<(), Self::Error>;
}

/// Entry point for hosts: loads and caches validated journeys, starts
/// sessions, and routes saves through the injected storage.
pub struct JourneyEngine<L, S>
where
    L: DefinitionLoader,
    S: SessionStorage,
{
    loader: L,
    storage: S,
    journeys: RefCell<HashMap<String, ValidatedJourney>>,
}

impl<L, S> JourneyEngine<L, S>
where
    L: DefinitionLoader,
    S: SessionStorage,
{
    /// Create a new engine with the provided loader and storage
    pub fn new(loader: L, storage: S) -> Self {
        Self {
            loader,
            storage,
            journeys: RefCell::new(HashMap::new()),
        }
    }

    /// Validated journey for `journey_id`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition cannot be loaded or fails validation.
    pub fn journey(&self, journey_id: &str) -> anyhow::Result<ValidatedJourney>
    where
        L::Error: Into<anyhow::Error>,
    {
        if let Some(journey) = self.journeys.borrow().get(journey_id) {
            return Ok(journey.clone());
        }
        let definition = self
            .loader
            .load_definition(journey_id)
            .map_err(Into::<anyhow::Error>::into)
            .with_context(|| format!("loading journey '{journey_id}'"))?;
        let journey = ValidatedJourney::new(definition)
            .map_err(JourneyError::from)
            .with_context(|| format!("validating journey '{journey_id}'"))?;
        self.journeys
            .borrow_mut()
            .insert(journey_id.to_string(), journey.clone());
        Ok(journey)
    }

    /// Start a fresh session on `journey_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the journey cannot be loaded or validated.
    pub fn start_session(&self, journey_id: &str) -> anyhow::Result<JourneySession>
    where
        L::Error: Into<anyhow::Error>,
    {
        Ok(JourneySession::new(&self.journey(journey_id)?))
    }

    /// Save a session
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    pub fn save_session(&self, slot: &str, session: &JourneySession) -> Result<(), S::Error> {
        self.storage.save_session(slot, &session.snapshot())
    }

    /// Load and resume a session
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails, the journey cannot be loaded, or the
    /// snapshot does not replay against the current content.
    pub fn load_session(&self, slot: &str) -> anyhow::Result<Option<JourneySession>>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let loaded = self
            .storage
            .load_session(slot)
            .map_err(Into::<anyhow::Error>::into)?;
        let Some(snapshot) = loaded else {
            return Ok(None);
        };
        let journey = self.journey(&snapshot.journey_id)?;
        let session = JourneySession::restore(&journey, snapshot)
            .with_context(|| format!("resuming slot '{slot}'"))?;
        Ok(Some(session))
    }

    /// Delete a saved session
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_session(&self, slot: &str) -> Result<(), S::Error> {
        self.storage.delete_session(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;

    #[derive(Default)]
    struct CountingLoader {
        loads: Cell<usize>,
    }

    impl DefinitionLoader for CountingLoader {
        type Error = CatalogError;

        fn load_definition(&self, journey_id: &str) -> Result<JourneyDefinition, Self::Error> {
            self.loads.set(self.loads.get() + 1);
            BundledDefinitions.load_definition(journey_id)
        }
    }

    struct BrokenLoader;

    impl DefinitionLoader for BrokenLoader {
        type Error = Infallible;

        fn load_definition(&self, journey_id: &str) -> Result<JourneyDefinition, Self::Error> {
            Ok(JourneyDefinition {
                id: journey_id.to_string(),
                title: String::new(),
                description: String::new(),
                metrics: Vec::new(),
                stages: Vec::new(),
            })
        }
    }

    #[test]
    fn engine_starts_saves_and_resumes_sessions() {
        let engine = JourneyEngine::new(BundledDefinitions, MemoryStorage::default());
        let mut session = engine.start_session("homebuyer").unwrap();
        session
            .select_option("credit-check", "pay-down-card")
            .unwrap();
        engine.save_session("tab-1", &session).unwrap();

        let loaded = engine.load_session("tab-1").unwrap().expect("save exists");
        assert_eq!(loaded.state(), session.state());
        assert_eq!(loaded.current_stage().unwrap().id, "down-payment");
        assert!(engine.load_session("missing").unwrap().is_none());

        engine.delete_session("tab-1").unwrap();
        assert!(engine.load_session("tab-1").unwrap().is_none());
    }

    #[test]
    fn engine_caches_validated_journeys() {
        let engine = JourneyEngine::new(CountingLoader::default(), MemoryStorage::default());
        let first = engine.journey("working-parent").unwrap();
        let second = engine.journey("working-parent").unwrap();
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(engine.loader.loads.get(), 1);
    }

    #[test]
    fn engine_surfaces_invalid_content() {
        let engine = JourneyEngine::new(BrokenLoader, MemoryStorage::default());
        let err = engine.start_session("empty").unwrap_err();
        let root = err.downcast_ref::<JourneyError>().expect("journey error");
        assert!(matches!(
            root,
            JourneyError::InvalidDefinition(DefinitionError::EmptyJourney { .. })
        ));
    }

    #[test]
    fn engine_reports_unknown_journeys() {
        let engine = JourneyEngine::new(BundledDefinitions, MemoryStorage::default());
        let err = engine.start_session("retiree").unwrap_err();
        assert!(format!("{err:#}").contains("unknown journey 'retiree'"));
    }
}
