//! Per-entry aggregation of judge scores.

use crate::config::{ScoringConfig, ScoringConfigSource, round_to_places};
use crate::repository::{Roster, ScoreRepository};
use crate::{
    AggregateResult, EntrySummary, ResultValidation, ScoreRecord, ScoringError, ValidationStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Below this many scores nothing is dropped, whatever the policy says.
pub const MIN_SCORES_FOR_DROP: usize = 3;

/// Which rounds contribute to an entry's average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationScope {
    #[default]
    AllRounds,
    Round(u32),
}

impl AggregationScope {
    pub fn includes(self, record: &ScoreRecord) -> bool {
        match self {
            AggregationScope::AllRounds => true,
            AggregationScope::Round(round) => record.round_number == round,
        }
    }
}

/// Apply the drop-highest/lowest policy, returning the retained scores in ascending order.
pub fn retained_scores(scores: &[f64], drop_highest: bool, drop_lowest: bool) -> Vec<f64> {
    let mut retained = scores.to_vec();
    retained.sort_by(f64::total_cmp);
    if retained.len() < MIN_SCORES_FOR_DROP {
        return retained;
    }
    if drop_lowest {
        retained.remove(0);
    }
    if drop_highest {
        retained.pop();
    }
    retained
}

/// Mean of the retained scores, or `None` if there are no scores at all.
pub fn average_score(scores: &[f64], config: &ScoringConfig) -> Option<f64> {
    let retained = retained_scores(scores, config.drop_highest, config.drop_lowest);
    if retained.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = retained.iter().sum::<f64>() / retained.len() as f64;
    Some(round_to_places(mean, config.decimal_places))
}

/// Classify how complete a set of scores is.
pub fn validate_count(score_count: usize, min_judges: usize) -> ResultValidation {
    if score_count == 0 {
        ResultValidation {
            status: ValidationStatus::NoScores,
            warnings: vec!["No scores have been submitted".to_string()],
        }
    } else if score_count < min_judges {
        ResultValidation {
            status: ValidationStatus::InsufficientScores,
            warnings: vec![format!(
                "Insufficient scores ({score_count} submitted, at least {min_judges} required)"
            )],
        }
    } else {
        ResultValidation {
            status: ValidationStatus::Valid,
            warnings: Vec::new(),
        }
    }
}

/// Aggregate one entry from its score records; invalid records are ignored.
pub fn aggregate_entry(
    entry: &EntrySummary,
    records: &[ScoreRecord],
    scope: AggregationScope,
    config: &ScoringConfig,
) -> AggregateResult {
    let totals: Vec<f64> = records
        .iter()
        .filter(|r| r.is_valid && r.entry_id == entry.entry_id && scope.includes(r))
        .map(|r| r.total_score)
        .collect();

    AggregateResult {
        entry_id: entry.entry_id,
        registration_number: entry.registration_number.clone(),
        score_count: totals.len(),
        average_score: average_score(&totals, config),
        validation: validate_count(totals.len(), config.min_judges),
    }
}

pub struct ResultsAggregator<'a, C> {
    configs: &'a C,
}

impl<'a, C: ScoringConfigSource> ResultsAggregator<'a, C> {
    pub fn new(configs: &'a C) -> Self {
        Self { configs }
    }

    /// Aggregate every entry registered in a competition, keyed by entry id.
    ///
    /// Reads happen inside one transaction and take no locks.
    ///
    /// # Errors
    /// Returns a persistence error from the store.
    pub fn aggregate_for_competition<S>(
        &self,
        store: &mut S,
        competition_id: u32,
        scope: AggregationScope,
    ) -> Result<BTreeMap<u64, AggregateResult>, ScoringError>
    where
        S: ScoreRepository + Roster,
    {
        let config = self.configs.scoring_config(Some(competition_id));
        let results = store.in_transaction(|store| {
            let entries = store.entries_in_competition(competition_id)?;
            let mut results = BTreeMap::new();
            for entry in entries {
                let records = store.scores_for_entry(entry.entry_id)?;
                results.insert(
                    entry.entry_id,
                    aggregate_entry(&entry, &records, scope, &config),
                );
            }
            Ok(results)
        })?;
        log::debug!(
            "Aggregated {} entries for competition {competition_id} ({scope:?})",
            results.len()
        );
        Ok(results)
    }
}
