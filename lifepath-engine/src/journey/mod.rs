//! Session engine: lifecycle, selection rules, summaries and snapshots.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validate::DefinitionError;

pub mod session;
pub mod snapshot;
pub mod summary;

pub use session::{JourneySession, replay, start_session};
pub use snapshot::{SessionSnapshot, SnapshotError};
pub use summary::{ChoiceRecord, JourneySummary};

/// Position of a session within its journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum JourneyPhase {
    /// No stage has been completed yet.
    NotStarted,
    /// At least one stage completed, more remain.
    InProgress { stage_index: usize },
    /// Every stage has been completed.
    Complete,
}

impl JourneyPhase {
    #[must_use]
    pub const fn from_progress(completed: usize, total: usize) -> Self {
        if completed >= total {
            Self::Complete
        } else if completed == 0 {
            Self::NotStarted
        } else {
            Self::InProgress {
                stage_index: completed,
            }
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Errors raised by session operations. A failed call never mutates the session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JourneyError {
    #[error("invalid journey definition: {0}")]
    InvalidDefinition(#[from] DefinitionError),
    #[error("stage '{requested}' is not the current stage (expected {expected:?})")]
    UnknownStage {
        expected: Option<String>,
        requested: String,
    },
    #[error("stage '{stage}' has no option '{option}'")]
    UnknownOption { stage: String, option: String },
    #[error("journey is already complete")]
    JourneyComplete,
    #[error("option '{option}' at stage '{stage}' would push '{metric}' past the f64 range")]
    MetricOverflow {
        stage: String,
        option: String,
        metric: String,
    },
    #[error("journey is incomplete ({completed} of {total} stages done)")]
    JourneyIncomplete { completed: usize, total: usize },
    #[error("invalid session snapshot: {0}")]
    InvalidSnapshot(#[from] SnapshotError),
}
