//! Errors surfaced by the scoring engine.

use crate::{ScoreField, ScoreKey};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single score component outside its configured bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentViolation {
    pub field: ScoreField,
    pub value: f64,
    pub max: f64,
}

impl fmt::Display for ComponentViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must be between 0 and {} (got {})",
            self.field, self.max, self.value
        )
    }
}

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Persistence,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("{0}")]
    InvalidComponent(ComponentViolation),

    #[error("round_number must be at least 1 (got {0})")]
    InvalidRound(u32),

    #[error("{what} #{id} does not exist")]
    NotFound { what: &'static str, id: u64 },

    #[error("store error: {0}")]
    Persistence(String),

    /// Not produced while the write path serializes through a row lock.
    #[error("score {key:?} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        key: ScoreKey,
        expected: u32,
        found: u32,
    },
}

impl ScoringError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoringError::InvalidComponent(_) | ScoringError::InvalidRound(_) => {
                ErrorKind::Validation
            }
            ScoringError::NotFound { .. } => ErrorKind::NotFound,
            ScoringError::Persistence(_) => ErrorKind::Persistence,
            ScoringError::Conflict { .. } => ErrorKind::Conflict,
        }
    }

    pub fn entry_not_found(entry_id: u64) -> Self {
        ScoringError::NotFound {
            what: "entry",
            id: entry_id,
        }
    }

    pub fn judge_not_found(judge_id: u32) -> Self {
        ScoringError::NotFound {
            what: "judge",
            id: u64::from(judge_id),
        }
    }

    pub fn score_not_found(score_id: u64) -> Self {
        ScoringError::NotFound {
            what: "score",
            id: score_id,
        }
    }
}

#[cfg(feature = "database")]
impl From<diesel::result::Error> for ScoringError {
    fn from(err: diesel::result::Error) -> Self {
        ScoringError::Persistence(err.to_string())
    }
}
