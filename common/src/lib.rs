//! A library for recording judge scores and publishing competition results.

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod error;
pub mod memory_store;
pub mod modification_log;
pub mod ranking;
pub mod repository;
pub mod results_cache;
pub mod service;
pub mod statistics;
pub mod writer;

#[cfg(feature = "database")]
pub mod db_util;

pub use config::{ScoringConfig, ScoringConfigSource, ScoringConfigs};
pub use error::{ErrorKind, ScoringError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason recorded on a correction when the caller does not supply one.
pub const DEFAULT_CORRECTION_REASON: &str = "overwrite_by_submit_score";

/// The three judged components of a score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScoreField {
    #[serde(rename = "technique_score")]
    Technique,
    #[serde(rename = "performance_score")]
    Performance,
    #[serde(rename = "deduction")]
    Deduction,
}

impl ScoreField {
    pub fn name(self) -> &'static str {
        match self {
            ScoreField::Technique => "technique_score",
            ScoreField::Performance => "performance_score",
            ScoreField::Deduction => "deduction",
        }
    }
}

impl fmt::Display for ScoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a score: one judge, one entry, one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScoreKey {
    pub entry_id: u64,
    pub judge_id: u32,
    pub round_number: u32,
}

/// Raw component values as entered by a judge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub technique_score: f64,
    pub performance_score: f64,
    #[serde(default)]
    pub deduction: f64,
}

impl ScoreComponents {
    /// Each component rounded to the precision it is stored at.
    pub fn quantized(&self) -> Self {
        let places = config::STORED_DECIMAL_PLACES;
        Self {
            technique_score: config::round_to_places(self.technique_score, places),
            performance_score: config::round_to_places(self.performance_score, places),
            deduction: config::round_to_places(self.deduction, places),
        }
    }

    /// The derived total, rounded to the configured precision.
    pub fn total(&self, decimal_places: u32) -> f64 {
        config::round_to_places(
            self.technique_score + self.performance_score - self.deduction,
            decimal_places,
        )
    }
}

/// One judge's evaluation of one entry in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score_id: u64,
    pub entry_id: u64,
    pub judge_id: u32,
    pub round_number: u32,
    pub competition_id: Option<u32>,
    pub technique_score: f64,
    pub performance_score: f64,
    pub deduction: f64,
    pub total_score: f64,
    pub notes: String,
    pub version: u32,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub last_modified_by: Option<u32>,
    pub modification_reason: Option<String>,
}

impl ScoreRecord {
    pub fn key(&self) -> ScoreKey {
        ScoreKey {
            entry_id: self.entry_id,
            judge_id: self.judge_id,
            round_number: self.round_number,
        }
    }

    pub fn components(&self) -> ScoreComponents {
        ScoreComponents {
            technique_score: self.technique_score,
            performance_score: self.performance_score,
            deduction: self.deduction,
        }
    }
}

/// A score about to be inserted for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScoreRecord {
    pub key: ScoreKey,
    pub competition_id: Option<u32>,
    pub components: ScoreComponents,
    pub total_score: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Kind of change recorded in the modification log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    Correction,
    TieBreak,
    Adjustment,
}

impl ModificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModificationType::Correction => "correction",
            ModificationType::TieBreak => "tie_break",
            ModificationType::Adjustment => "adjustment",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "correction" => Ok(ModificationType::Correction),
            "tie_break" => Ok(ModificationType::TieBreak),
            "adjustment" => Ok(ModificationType::Adjustment),
            other => Err(format!("Unknown modification type: {other}")),
        }
    }
}

/// An audit record about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewModificationLogEntry {
    pub score_id: u64,
    pub competition_id: u32,
    pub entry_id: u64,
    pub judge_id: u32,
    pub round_number: u32,
    pub old: ScoreComponents,
    pub old_total_score: f64,
    pub new: ScoreComponents,
    pub new_total_score: f64,
    pub modification_type: ModificationType,
    pub reason: String,
    pub modified_by: u32,
    pub modified_at: DateTime<Utc>,
}

/// An immutable audit record of one correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationLogEntry {
    pub log_id: u64,
    pub score_id: u64,
    pub competition_id: u32,
    pub entry_id: u64,
    pub judge_id: u32,
    pub round_number: u32,
    pub old_technique_score: f64,
    pub new_technique_score: f64,
    pub old_performance_score: f64,
    pub new_performance_score: f64,
    pub old_deduction: f64,
    pub new_deduction: f64,
    pub old_total_score: f64,
    pub new_total_score: f64,
    pub modification_type: ModificationType,
    pub reason: String,
    pub modified_by: u32,
    pub modified_at: DateTime<Utc>,
}

/// A registered entry as seen by the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub entry_id: u64,
    pub competition_id: u32,
    pub registration_number: String,
}

/// Completeness of an aggregated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    NoScores,
    InsufficientScores,
    Valid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultValidation {
    pub status: ValidationStatus,
    pub warnings: Vec<String>,
}

/// The aggregated, not persisted, result of one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub entry_id: u64,
    pub registration_number: String,
    pub score_count: usize,
    pub average_score: Option<f64>,
    pub validation: ResultValidation,
}
