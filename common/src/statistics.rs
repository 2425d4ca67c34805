//! Summary statistics over a competition's scores.

use crate::config::round_to_places;
use crate::repository::{Roster, ScoreRepository};
use crate::{ScoreRecord, ScoringError};
use itertools::Itertools;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoringStatistics {
    pub total_entries: usize,
    pub scored_entries: usize,
    pub unscored_entries: usize,
    pub total_scores: usize,
    pub average_technique_score: f64,
    pub average_performance_score: f64,
    pub average_total_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
}

fn mean(values: impl Iterator<Item = f64>, decimal_places: u32) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = sum / count as f64;
    round_to_places(mean, decimal_places)
}

/// Compute statistics from each entry's records. Invalid records are not counted.
pub fn summarize(per_entry: &[Vec<ScoreRecord>], decimal_places: u32) -> ScoringStatistics {
    let valid: Vec<&ScoreRecord> = per_entry
        .iter()
        .flatten()
        .filter(|r| r.is_valid)
        .collect();
    let scored_entries = per_entry
        .iter()
        .filter(|records| records.iter().any(|r| r.is_valid))
        .count();

    let (lowest_score, highest_score) = valid
        .iter()
        .map(|r| r.total_score)
        .minmax_by(f64::total_cmp)
        .into_option()
        .unwrap_or((0.0, 0.0));

    ScoringStatistics {
        total_entries: per_entry.len(),
        scored_entries,
        unscored_entries: per_entry.len() - scored_entries,
        total_scores: valid.len(),
        average_technique_score: mean(valid.iter().map(|r| r.technique_score), decimal_places),
        average_performance_score: mean(
            valid.iter().map(|r| r.performance_score),
            decimal_places,
        ),
        average_total_score: mean(valid.iter().map(|r| r.total_score), decimal_places),
        highest_score,
        lowest_score,
    }
}

/// Records whose stored total disagrees with `round(technique + performance - deduction)`.
pub fn total_mismatches(records: &[ScoreRecord], decimal_places: u32) -> Vec<&ScoreRecord> {
    records
        .iter()
        .filter(|r| r.components().total(decimal_places) != r.total_score)
        .collect()
}

/// Read every entry of a competition and summarize its scores.
///
/// # Errors
/// Returns a persistence error from the store.
pub fn for_competition<S>(
    store: &mut S,
    competition_id: u32,
    decimal_places: u32,
) -> Result<ScoringStatistics, ScoringError>
where
    S: ScoreRepository + Roster,
{
    let per_entry = store.in_transaction(|store| {
        store
            .entries_in_competition(competition_id)?
            .iter()
            .map(|entry| store.scores_for_entry(entry.entry_id))
            .collect::<Result<Vec<_>, ScoringError>>()
    })?;
    Ok(summarize(&per_entry, decimal_places))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::{NewScoreRecord, ScoreComponents, ScoreKey};
    use chrono::Utc;

    fn insert(store: &mut MemoryStore, entry_id: u64, judge_id: u32, t: f64, p: f64, d: f64) -> u64 {
        let components = ScoreComponents {
            technique_score: t,
            performance_score: p,
            deduction: d,
        };
        store
            .insert_score(&NewScoreRecord {
                key: ScoreKey {
                    entry_id,
                    judge_id,
                    round_number: 1,
                },
                competition_id: Some(1),
                components,
                total_score: components.total(2),
                notes: String::new(),
                created_at: Utc::now(),
            })
            .unwrap()
            .score_id
    }

    #[test_log::test]
    fn test_statistics_over_competition() {
        let mut store = MemoryStore::new();
        store
            .add_entry(1, Some(1), "001")
            .add_entry(2, Some(1), "002")
            .add_entry(3, Some(1), "003");
        insert(&mut store, 1, 1, 8.0, 7.0, 1.0);
        insert(&mut store, 1, 2, 9.0, 8.0, 0.0);
        insert(&mut store, 2, 1, 6.0, 6.0, 0.5);
        let ignored = insert(&mut store, 2, 2, 10.0, 10.0, 0.0);
        store.set_score_validity(ignored, false).unwrap();

        let stats = for_competition(&mut store, 1, 2).unwrap();

        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.scored_entries, 2);
        assert_eq!(stats.unscored_entries, 1);
        assert_eq!(stats.total_scores, 3);
        assert_eq!(stats.average_technique_score, 7.67);
        assert_eq!(stats.average_performance_score, 7.0);
        assert_eq!(stats.average_total_score, 14.17);
        assert_eq!(stats.highest_score, 17.0);
        assert_eq!(stats.lowest_score, 11.5);
    }

    #[test_log::test]
    fn test_total_mismatches() {
        let mut store = MemoryStore::new();
        store.add_entry(1, Some(1), "001");
        insert(&mut store, 1, 1, 8.0, 7.0, 1.0);
        let drifted = insert(&mut store, 1, 2, 9.0, 8.0, 0.0);
        let mut record = store.get_score(drifted).unwrap().unwrap();
        record.total_score = 16.5;
        store.update_score(&record).unwrap();

        let records = store.scores_for_entry(1).unwrap();
        let mismatched = total_mismatches(&records, 2);

        assert_eq!(mismatched.len(), 1);
        assert_eq!(mismatched[0].score_id, drifted);
    }

    #[test_log::test]
    fn test_statistics_without_scores_are_zero() {
        let mut store = MemoryStore::new();
        store.add_entry(1, Some(1), "001");

        let stats = for_competition(&mut store, 1, 2).unwrap();

        assert_eq!(
            stats,
            ScoringStatistics {
                total_entries: 1,
                unscored_entries: 1,
                ..ScoringStatistics::default()
            }
        );
    }
}
