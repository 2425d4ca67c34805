//! First writes and corrections of judge scores.

use crate::clock::Clock;
use crate::config::ScoringConfigSource;
use crate::modification_log;
use crate::repository::{Roster, ScoreRepository};
use crate::{
    DEFAULT_CORRECTION_REASON, ModificationLogEntry, NewScoreRecord, ScoreComponents, ScoreKey,
    ScoreRecord, ScoringError,
};
use serde::Deserialize;

/// A judge's score as submitted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreSubmission {
    pub key: ScoreKey,
    pub components: ScoreComponents,
    pub notes: String,
    /// Who is making this write; recorded as `last_modified_by` on corrections.
    pub acting_judge_id: u32,
    pub reason: Option<String>,
}

/// What a submission did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreWrite {
    Created(ScoreRecord),
    Corrected {
        record: ScoreRecord,
        /// `None` when the entry's competition could not be resolved.
        log_entry: Option<ModificationLogEntry>,
    },
}

impl ScoreWrite {
    pub fn record(&self) -> &ScoreRecord {
        match self {
            ScoreWrite::Created(record) | ScoreWrite::Corrected { record, .. } => record,
        }
    }

    pub fn into_record(self) -> ScoreRecord {
        match self {
            ScoreWrite::Created(record) | ScoreWrite::Corrected { record, .. } => record,
        }
    }
}

pub struct ScoreWriter<'a, C, K> {
    configs: &'a C,
    clock: &'a K,
}

impl<'a, C: ScoringConfigSource, K: Clock> ScoreWriter<'a, C, K> {
    pub fn new(configs: &'a C, clock: &'a K) -> Self {
        Self { configs, clock }
    }

    /// Record a score, correcting the existing record for the same key if there is one.
    ///
    /// Runs as one transaction: the score write and its log entry commit together
    /// or not at all. Corrections are last-write-wins; whether `acting_judge_id`
    /// may overwrite another judge's score is decided before this is called.
    ///
    /// Checks run in this order: round number, entry, judge, then component bounds.
    /// Bounds come from the entry's competition, so an out-of-bounds score for an
    /// unknown entry or judge reports not-found.
    ///
    /// # Errors
    /// Returns a validation error for an out-of-bounds component or round 0,
    /// not-found for an unknown entry or judge, or a persistence error from the store.
    pub fn submit<S>(
        &self,
        store: &mut S,
        submission: &ScoreSubmission,
    ) -> Result<ScoreWrite, ScoringError>
    where
        S: ScoreRepository + Roster,
    {
        if submission.key.round_number == 0 {
            return Err(ScoringError::InvalidRound(submission.key.round_number));
        }

        store.in_transaction(|store| {
            let key = &submission.key;
            if !store.entry_exists(key.entry_id)? {
                return Err(ScoringError::entry_not_found(key.entry_id));
            }
            if !store.judge_exists(key.judge_id)? {
                return Err(ScoringError::judge_not_found(key.judge_id));
            }

            let existing = store.find_score_for_update(key)?;
            let competition_id = match existing.as_ref().and_then(|e| e.competition_id) {
                Some(id) => Some(id),
                None => store.resolve_competition_id(key.entry_id)?,
            };

            let components = submission.components.quantized();
            let config = self.configs.scoring_config(competition_id);
            config.validate(&components)?;
            let total_score = components.total(config.decimal_places);
            let now = self.clock.now();

            match existing {
                None => {
                    let record = store.insert_score(&NewScoreRecord {
                        key: *key,
                        competition_id,
                        components,
                        total_score,
                        notes: submission.notes.clone(),
                        created_at: now,
                    })?;
                    log::info!(
                        "Judge {} scored entry {} round {}: {}",
                        key.judge_id,
                        key.entry_id,
                        key.round_number,
                        record.total_score
                    );
                    Ok(ScoreWrite::Created(record))
                }
                Some(before) => {
                    let reason = submission
                        .reason
                        .as_deref()
                        .unwrap_or(DEFAULT_CORRECTION_REASON);
                    let updated = ScoreRecord {
                        competition_id,
                        technique_score: components.technique_score,
                        performance_score: components.performance_score,
                        deduction: components.deduction,
                        total_score,
                        notes: submission.notes.clone(),
                        version: before.version + 1,
                        last_modified_at: Some(now),
                        last_modified_by: Some(submission.acting_judge_id),
                        modification_reason: Some(reason.to_string()),
                        ..before.clone()
                    };
                    let record = store.update_score(&updated)?;

                    let log_entry = match competition_id {
                        Some(competition_id) => {
                            let entry = modification_log::correction_entry(
                                &before,
                                &record,
                                competition_id,
                                reason,
                                submission.acting_judge_id,
                                now,
                            );
                            Some(modification_log::append(store, &entry)?)
                        }
                        None => {
                            log::warn!(
                                "Score #{} corrected without an audit entry: entry {} has no resolvable competition",
                                record.score_id,
                                key.entry_id
                            );
                            None
                        }
                    };
                    log::info!(
                        "Judge {} corrected score #{} to v{}: {} -> {}",
                        submission.acting_judge_id,
                        record.score_id,
                        record.version,
                        before.total_score,
                        record.total_score
                    );
                    Ok(ScoreWrite::Corrected { record, log_entry })
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{ScoringConfig, round_to_places};
    use crate::error::ErrorKind;
    use crate::memory_store::MemoryStore;
    use crate::statistics::total_mismatches;
    use crate::{ScoreField, modification_log};
    use chrono::{TimeDelta, TimeZone, Utc};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .add_entry(1, Some(10), "001")
            .add_entry(2, None, "002")
            .add_judge(5)
            .add_judge(6);
        store
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap())
    }

    fn submission(entry_id: u64, judge_id: u32, t: f64, p: f64, d: f64) -> ScoreSubmission {
        ScoreSubmission {
            key: ScoreKey {
                entry_id,
                judge_id,
                round_number: 1,
            },
            components: ScoreComponents {
                technique_score: t,
                performance_score: p,
                deduction: d,
            },
            notes: String::new(),
            acting_judge_id: judge_id,
            reason: None,
        }
    }

    #[test_log::test]
    fn test_first_write_creates_version_one() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);

        let write = writer.submit(&mut store, &submission(1, 5, 8.3, 1.2, 0.5)).unwrap();

        let ScoreWrite::Created(record) = write else {
            panic!("expected a first write");
        };
        assert_eq!(record.version, 1);
        assert_eq!(record.total_score, 9.0);
        assert_eq!(record.competition_id, Some(10));
        assert!(record.is_valid);
        assert_eq!(record.last_modified_by, None);
        assert_eq!(store.log_count(), 0);
    }

    #[test_log::test]
    fn test_total_matches_rounded_components() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);
        let cases = [(9.99, 9.99, 0.01), (0.0, 0.0, 5.0), (7.333, 8.111, 1.005)];

        for (judge, (t, p, d)) in [5, 6, 5].into_iter().zip(cases) {
            let record = writer
                .submit(&mut store, &submission(1, judge, t, p, d))
                .unwrap()
                .into_record();
            assert_eq!(record.total_score, round_to_places(t + p - d, 2));
        }
    }

    #[test_log::test]
    fn test_components_are_stored_at_stored_precision() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);

        let first = writer
            .submit(&mut store, &submission(1, 5, 8.004_999_999_6, 0.0, 0.0))
            .unwrap()
            .into_record();
        assert_eq!(first.technique_score, 8.005);
        assert_eq!(first.total_score, first.components().total(2));

        let corrected = writer
            .submit(&mut store, &submission(1, 5, 7.123_456_789, 1.000_000_4, 0.0))
            .unwrap()
            .into_record();
        assert_eq!(corrected.technique_score, 7.123_457);
        assert_eq!(corrected.performance_score, 1.0);
        assert_eq!(corrected.total_score, corrected.components().total(2));
        assert!(total_mismatches(&store.scores_for_entry(1).unwrap(), 2).is_empty());
    }

    #[test_log::test]
    fn test_resubmission_updates_in_place() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);

        let first = writer
            .submit(&mut store, &submission(1, 5, 8.0, 7.0, 1.0))
            .unwrap()
            .into_record();
        clock.advance(TimeDelta::minutes(3));
        let mut correction = submission(1, 5, 9.0, 7.5, 0.5);
        correction.notes = "re-watched".to_string();
        let write = writer.submit(&mut store, &correction).unwrap();

        let ScoreWrite::Corrected { record, log_entry } = write else {
            panic!("expected a correction");
        };
        assert_eq!(store.score_count(), 1);
        assert_eq!(record.score_id, first.score_id);
        assert_eq!(record.version, first.version + 1);
        assert_eq!(record.total_score, 16.0);
        assert_eq!(record.notes, "re-watched");
        assert_eq!(record.created_at, first.created_at);
        assert_eq!(record.last_modified_at, Some(clock.now()));
        assert_eq!(record.last_modified_by, Some(5));

        let log_entry = log_entry.unwrap();
        assert_eq!(log_entry.old_technique_score, first.technique_score);
        assert_eq!(log_entry.old_performance_score, first.performance_score);
        assert_eq!(log_entry.old_deduction, first.deduction);
        assert_eq!(log_entry.old_total_score, first.total_score);
        assert_eq!(log_entry.new_technique_score, record.technique_score);
        assert_eq!(log_entry.new_performance_score, record.performance_score);
        assert_eq!(log_entry.new_deduction, record.deduction);
        assert_eq!(log_entry.new_total_score, record.total_score);
        assert_eq!(log_entry.reason, DEFAULT_CORRECTION_REASON);
        assert_eq!(log_entry.competition_id, 10);
    }

    #[test_log::test]
    fn test_each_correction_appends_one_entry() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);

        let mut score_id = 0;
        for (i, t) in [6.0, 7.0, 8.0, 9.0].into_iter().enumerate() {
            let mut sub = submission(1, 5, t, 5.0, 0.0);
            sub.reason = Some(format!("pass {i}"));
            score_id = writer.submit(&mut store, &sub).unwrap().record().score_id;
        }

        let history = modification_log::list_for(&mut store, score_id).unwrap();
        assert_eq!(history.len(), 3);
        let reasons: Vec<&str> = history.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["pass 1", "pass 2", "pass 3"]);
        assert_eq!(history[2].old_technique_score, 8.0);
        assert_eq!(history[2].new_technique_score, 9.0);
        assert_eq!(store.get_score(score_id).unwrap().unwrap().version, 4);
    }

    #[test_log::test]
    fn test_correction_by_another_judge_is_accepted() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);
        writer.submit(&mut store, &submission(1, 5, 8.0, 7.0, 0.0)).unwrap();

        let mut sub = submission(1, 5, 6.0, 7.0, 0.0);
        sub.acting_judge_id = 6;
        let write = writer.submit(&mut store, &sub).unwrap();

        assert_eq!(write.record().judge_id, 5);
        assert_eq!(write.record().last_modified_by, Some(6));
    }

    #[test_log::test]
    fn test_unresolved_competition_skips_audit_only() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);
        writer.submit(&mut store, &submission(2, 5, 8.0, 7.0, 0.0)).unwrap();

        let write = writer.submit(&mut store, &submission(2, 5, 9.0, 7.0, 0.0)).unwrap();

        let ScoreWrite::Corrected { record, log_entry } = write else {
            panic!("expected a correction");
        };
        assert_eq!(record.version, 2);
        assert_eq!(record.technique_score, 9.0);
        assert!(log_entry.is_none());
        assert_eq!(store.log_count(), 0);
    }

    #[test_log::test]
    fn test_out_of_bounds_is_not_persisted() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);

        let err = writer
            .submit(&mut store, &submission(1, 5, 8.0, 10.5, 0.0))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        let ScoringError::InvalidComponent(violation) = err else {
            panic!("expected a component violation");
        };
        assert_eq!(violation.field, ScoreField::Performance);
        assert_eq!(violation.max, 10.0);
        assert_eq!(store.score_count(), 0);
    }

    #[test_log::test]
    fn test_invalid_correction_leaves_record_untouched() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);
        let first = writer
            .submit(&mut store, &submission(1, 5, 8.0, 7.0, 0.0))
            .unwrap()
            .into_record();

        assert!(writer.submit(&mut store, &submission(1, 5, 8.0, 7.0, 5.5)).is_err());

        assert_eq!(store.get_score(first.score_id).unwrap(), Some(first));
        assert_eq!(store.log_count(), 0);
    }

    #[test_log::test]
    fn test_round_zero_is_rejected() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);
        let mut sub = submission(1, 5, 8.0, 7.0, 0.0);
        sub.key.round_number = 0;

        let err = writer.submit(&mut store, &sub).unwrap_err();
        assert_eq!(err, ScoringError::InvalidRound(0));
    }

    #[test_log::test]
    fn test_unknown_entry_and_judge() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);

        let err = writer.submit(&mut store, &submission(99, 5, 8.0, 7.0, 0.0)).unwrap_err();
        assert_eq!(err, ScoringError::entry_not_found(99));
        let err = writer.submit(&mut store, &submission(1, 42, 8.0, 7.0, 0.0)).unwrap_err();
        assert_eq!(err, ScoringError::judge_not_found(42));
        assert_eq!(store.score_count(), 0);
    }

    #[test_log::test]
    fn test_unknown_entry_wins_over_bounds() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);

        let err = writer.submit(&mut store, &submission(99, 5, 11.0, 7.0, 0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = writer.submit(&mut store, &submission(1, 42, 11.0, 7.0, 0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = writer.submit(&mut store, &submission(1, 5, 11.0, 7.0, 0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test_log::test]
    fn test_failed_log_append_rolls_back_update() {
        let (config, clock, mut store) = (ScoringConfig::default(), clock(), store());
        let writer = ScoreWriter::new(&config, &clock);
        let first = writer
            .submit(&mut store, &submission(1, 5, 8.0, 7.0, 0.0))
            .unwrap()
            .into_record();
        store.reject_log_appends(true);

        let err = writer
            .submit(&mut store, &submission(1, 5, 9.0, 7.0, 0.0))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(store.get_score(first.score_id).unwrap(), Some(first));
    }

    #[test_log::test]
    fn test_per_competition_bounds() {
        let configs = crate::ScoringConfigs::default().with_competition(
            10,
            ScoringConfig {
                technique_max: 20.0,
                ..ScoringConfig::default()
            },
        );
        let (clock, mut store) = (clock(), store());
        let writer = ScoreWriter::new(&configs, &clock);

        assert!(writer.submit(&mut store, &submission(1, 5, 15.0, 7.0, 0.0)).is_ok());
        assert!(writer.submit(&mut store, &submission(2, 5, 15.0, 7.0, 0.0)).is_err());
    }
}
