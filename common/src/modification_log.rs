//! Audit trail of score corrections.
//!
//! Entries are only ever appended; a correction produces exactly one entry and a
//! first write produces none.

use crate::repository::ScoreRepository;
use crate::{
    ModificationLogEntry, ModificationType, NewModificationLogEntry, ScoreRecord, ScoringError,
};
use chrono::{DateTime, Utc};

/// Describe the change from `before` to `after` as a correction.
pub fn correction_entry(
    before: &ScoreRecord,
    after: &ScoreRecord,
    competition_id: u32,
    reason: &str,
    modified_by: u32,
    modified_at: DateTime<Utc>,
) -> NewModificationLogEntry {
    NewModificationLogEntry {
        score_id: before.score_id,
        competition_id,
        entry_id: before.entry_id,
        judge_id: before.judge_id,
        round_number: before.round_number,
        old: before.components(),
        old_total_score: before.total_score,
        new: after.components(),
        new_total_score: after.total_score,
        modification_type: ModificationType::Correction,
        reason: reason.to_string(),
        modified_by,
        modified_at,
    }
}

/// Append an entry inside the caller's transaction.
pub(crate) fn append<S: ScoreRepository>(
    store: &mut S,
    entry: &NewModificationLogEntry,
) -> Result<ModificationLogEntry, ScoringError> {
    let logged = store.append_modification(entry)?;
    log::debug!(
        "Logged correction #{} for score #{} (total {} -> {})",
        logged.log_id,
        logged.score_id,
        logged.old_total_score,
        logged.new_total_score
    );
    Ok(logged)
}

/// The correction history of a score, oldest first.
///
/// # Errors
/// Returns not-found if the score does not exist, or a persistence error from the store.
pub fn list_for<S: ScoreRepository>(
    store: &mut S,
    score_id: u64,
) -> Result<Vec<ModificationLogEntry>, ScoringError> {
    if store.get_score(score_id)?.is_none() {
        return Err(ScoringError::score_not_found(score_id));
    }
    let mut entries = store.modifications_for_score(score_id)?;
    // log ids are assigned in append order
    entries.sort_by_key(|e| e.log_id);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::{NewScoreRecord, ScoreComponents, ScoreKey};
    use chrono::TimeZone;

    fn seeded_store() -> (MemoryStore, ScoreRecord) {
        let mut store = MemoryStore::new();
        store.add_entry(1, Some(10), "001").add_judge(5);
        let record = store
            .insert_score(&NewScoreRecord {
                key: ScoreKey {
                    entry_id: 1,
                    judge_id: 5,
                    round_number: 1,
                },
                competition_id: Some(10),
                components: ScoreComponents {
                    technique_score: 8.0,
                    performance_score: 7.0,
                    deduction: 1.0,
                },
                total_score: 14.0,
                notes: String::new(),
                created_at: Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
            })
            .unwrap();
        (store, record)
    }

    #[test_log::test]
    fn test_correction_entry_captures_both_sides() {
        let (_, before) = seeded_store();
        let mut after = before.clone();
        after.technique_score = 9.0;
        after.total_score = 15.0;
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();

        let entry = correction_entry(&before, &after, 10, "typo", 5, at);

        assert_eq!(entry.old.technique_score, 8.0);
        assert_eq!(entry.new.technique_score, 9.0);
        assert_eq!(entry.old_total_score, 14.0);
        assert_eq!(entry.new_total_score, 15.0);
        assert_eq!(entry.modification_type, ModificationType::Correction);
        assert_eq!(entry.reason, "typo");
    }

    #[test_log::test]
    fn test_list_for_returns_append_order() {
        let (mut store, record) = seeded_store();
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
        for reason in ["first", "second", "third"] {
            let entry = correction_entry(&record, &record, 10, reason, 5, at);
            append(&mut store, &entry).unwrap();
        }

        let reasons: Vec<String> = list_for(&mut store, record.score_id)
            .unwrap()
            .into_iter()
            .map(|e| e.reason)
            .collect();
        assert_eq!(reasons, vec!["first", "second", "third"]);
    }

    #[test_log::test]
    fn test_list_for_unknown_score() {
        let (mut store, _) = seeded_store();
        let err = list_for(&mut store, 999).unwrap_err();
        assert_eq!(err, ScoringError::score_not_found(999));
    }

    #[test_log::test]
    fn test_list_for_score_without_corrections_is_empty() {
        let (mut store, record) = seeded_store();
        assert!(list_for(&mut store, record.score_id).unwrap().is_empty());
    }
}
