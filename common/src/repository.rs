//! Storage seams used by the writer and the aggregator.
//!
//! Both traits are implemented by the in-memory store and, with the `database`
//! feature, directly on a `PgConnection`.

use crate::{
    EntrySummary, ModificationLogEntry, NewModificationLogEntry, NewScoreRecord, ScoreKey,
    ScoreRecord, ScoringError,
};

/// Durable storage of score records and their correction log.
pub trait ScoreRepository {
    /// Run `f` in one transaction. Any error rolls back every write made inside it.
    ///
    /// # Errors
    /// Returns the closure's error, or a persistence error if the transaction cannot commit.
    fn in_transaction<T, F>(&mut self, f: F) -> Result<T, ScoringError>
    where
        F: FnOnce(&mut Self) -> Result<T, ScoringError>;

    /// Look up the record for a key and hold an exclusive lock on it until the
    /// surrounding transaction ends.
    fn find_score_for_update(&mut self, key: &ScoreKey)
    -> Result<Option<ScoreRecord>, ScoringError>;

    /// Insert a first submission with version 1.
    fn insert_score(&mut self, new: &NewScoreRecord) -> Result<ScoreRecord, ScoringError>;

    /// Overwrite an existing record identified by `score_id`.
    fn update_score(&mut self, record: &ScoreRecord) -> Result<ScoreRecord, ScoringError>;

    fn get_score(&mut self, score_id: u64) -> Result<Option<ScoreRecord>, ScoringError>;

    /// All records of an entry, ordered by round then judge.
    fn scores_for_entry(&mut self, entry_id: u64) -> Result<Vec<ScoreRecord>, ScoringError>;

    /// Append-only; there is deliberately no update or delete counterpart.
    fn append_modification(
        &mut self,
        entry: &NewModificationLogEntry,
    ) -> Result<ModificationLogEntry, ScoringError>;

    /// Log entries of a score in append order.
    fn modifications_for_score(
        &mut self,
        score_id: u64,
    ) -> Result<Vec<ModificationLogEntry>, ScoringError>;
}

/// Read-only view of the roster owned by the registration side of the system.
pub trait Roster {
    fn entry_exists(&mut self, entry_id: u64) -> Result<bool, ScoringError>;

    fn judge_exists(&mut self, judge_id: u32) -> Result<bool, ScoringError>;

    /// The competition an entry belongs to, if the roster knows it.
    fn resolve_competition_id(&mut self, entry_id: u64) -> Result<Option<u32>, ScoringError>;

    fn entries_in_competition(
        &mut self,
        competition_id: u32,
    ) -> Result<Vec<EntrySummary>, ScoringError>;
}
