use anyhow::{Context, Result};
use lifepath_engine::{
    BundledDefinitions, DefinitionLoader, JourneyDefinition, JourneyEngine, JourneyKind,
    MemoryStorage, ValidatedJourney,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading a definition file from disk.
#[derive(Debug, Error)]
pub enum FileLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// [`DefinitionLoader`] that treats the journey id as a JSON file path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDefinitions;

impl DefinitionLoader for FileDefinitions {
    type Error = FileLoadError;

    fn load_definition(&self, journey_id: &str) -> Result<JourneyDefinition, Self::Error> {
        let path = Path::new(journey_id);
        let text = std::fs::read_to_string(path).map_err(|source| FileLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        JourneyDefinition::from_json(&text).map_err(|source| FileLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validated journeys selected for a test run.
#[derive(Debug, Clone, Default)]
pub struct TesterAssets {
    pub journeys: Vec<ValidatedJourney>,
}

impl TesterAssets {
    /// Bundled journeys named by `journey_ids` (`all` expands, `none` skips)
    /// followed by definitions read from `definition_paths`.
    pub fn load(journey_ids: &[String], definition_paths: &[PathBuf]) -> Result<Self> {
        let bundled = JourneyEngine::new(BundledDefinitions, MemoryStorage::default());
        let files = JourneyEngine::new(FileDefinitions, MemoryStorage::default());
        let mut journeys = Vec::new();

        for id in expand_journey_ids(journey_ids) {
            journeys.push(bundled.journey(&id)?);
        }
        for path in definition_paths {
            let key = path.to_string_lossy();
            let journey = files
                .journey(&key)
                .with_context(|| format!("definition file {}", path.display()))?;
            log::info!(
                "loaded journey '{}' from {} ({} stages)",
                journey.id,
                path.display(),
                journey.stages.len()
            );
            journeys.push(journey);
        }
        Ok(Self { journeys })
    }
}

fn expand_journey_ids(tokens: &[String]) -> Vec<String> {
    let mut ids = Vec::new();
    for token in tokens {
        if token.eq_ignore_ascii_case("none") {
            continue;
        }
        if token.eq_ignore_ascii_case("all") {
            ids.extend(JourneyKind::ALL.iter().map(|kind| kind.id().to_string()));
        } else {
            ids.push(token.to_ascii_lowercase());
        }
    }
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
    ids
}
