//! Bundled life-journey definitions.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::DefinitionLoader;
use crate::data::JourneyDefinition;

/// The journeys shipped with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JourneyKind {
    Homebuyer,
    MidCareer,
    SmallBusiness,
    WorkingParent,
    NewAmerican,
}

impl JourneyKind {
    pub const ALL: [Self; 5] = [
        Self::Homebuyer,
        Self::MidCareer,
        Self::SmallBusiness,
        Self::WorkingParent,
        Self::NewAmerican,
    ];

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Homebuyer => "homebuyer",
            Self::MidCareer => "mid-career",
            Self::SmallBusiness => "small-business",
            Self::WorkingParent => "working-parent",
            Self::NewAmerican => "new-american",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Homebuyer => "First-Time Homebuyer",
            Self::MidCareer => "Mid-Career Professional",
            Self::SmallBusiness => "Small-Business Owner",
            Self::WorkingParent => "Working Parent",
            Self::NewAmerican => "New American",
        }
    }

    #[must_use]
    pub const fn definition_json(self) -> &'static str {
        match self {
            Self::Homebuyer => include_str!("../static/journeys/homebuyer.json"),
            Self::MidCareer => include_str!("../static/journeys/mid-career.json"),
            Self::SmallBusiness => include_str!("../static/journeys/small-business.json"),
            Self::WorkingParent => include_str!("../static/journeys/working-parent.json"),
            Self::NewAmerican => include_str!("../static/journeys/new-american.json"),
        }
    }

    /// Parse the embedded definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded JSON is malformed.
    pub fn definition(self) -> Result<JourneyDefinition, serde_json::Error> {
        JourneyDefinition::from_json(self.definition_json())
    }
}

impl fmt::Display for JourneyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown journey '{0}'")]
pub struct UnknownJourney(pub String);

impl FromStr for JourneyKind {
    type Err = UnknownJourney;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == key)
            .ok_or_else(|| UnknownJourney(s.to_string()))
    }
}

/// Errors raised while loading bundled content.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Unknown(#[from] UnknownJourney),
    #[error("bundled journey '{journey}' is malformed: {source}")]
    Parse {
        journey: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// [`DefinitionLoader`] serving the definitions compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledDefinitions;

impl DefinitionLoader for BundledDefinitions {
    type Error = CatalogError;

    fn load_definition(&self, journey_id: &str) -> Result<JourneyDefinition, Self::Error> {
        let kind: JourneyKind = journey_id.parse()?;
        kind.definition().map_err(|source| CatalogError::Parse {
            journey: kind.id(),
            source,
        })
    }
}
