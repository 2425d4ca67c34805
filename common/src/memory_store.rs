//! In-process store for tests and offline tooling.
//!
//! Transactions snapshot the whole state and restore it on error. Exclusive
//! access comes from `&mut self`; wrap the store in a mutex to share it.

use crate::repository::{Roster, ScoreRepository};
use crate::{
    EntrySummary, ModificationLogEntry, NewModificationLogEntry, NewScoreRecord, ScoreKey,
    ScoreRecord, ScoringError,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone)]
struct RosterEntry {
    competition_id: Option<u32>,
    registration_number: String,
}

#[derive(Debug, Clone, Default)]
struct State {
    scores: BTreeMap<u64, ScoreRecord>,
    score_keys: HashMap<ScoreKey, u64>,
    logs: Vec<ModificationLogEntry>,
    entries: BTreeMap<u64, RosterEntry>,
    judges: BTreeSet<u32>,
    next_score_id: u64,
    next_log_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: State,
    reject_log_appends: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry; `competition_id = None` models an entry the roster cannot place.
    pub fn add_entry(
        &mut self,
        entry_id: u64,
        competition_id: Option<u32>,
        registration_number: &str,
    ) -> &mut Self {
        self.state.entries.insert(
            entry_id,
            RosterEntry {
                competition_id,
                registration_number: registration_number.to_string(),
            },
        );
        self
    }

    pub fn add_judge(&mut self, judge_id: u32) -> &mut Self {
        self.state.judges.insert(judge_id);
        self
    }

    /// Mark a score as excluded from (or restored to) aggregation.
    ///
    /// # Errors
    /// Returns not-found if the score does not exist.
    pub fn set_score_validity(&mut self, score_id: u64, is_valid: bool) -> Result<(), ScoringError> {
        let record = self
            .state
            .scores
            .get_mut(&score_id)
            .ok_or_else(|| ScoringError::score_not_found(score_id))?;
        record.is_valid = is_valid;
        Ok(())
    }

    /// Make every subsequent log append fail, to exercise rollback.
    pub fn reject_log_appends(&mut self, reject: bool) {
        self.reject_log_appends = reject;
    }

    pub fn score_count(&self) -> usize {
        self.state.scores.len()
    }

    pub fn log_count(&self) -> usize {
        self.state.logs.len()
    }
}

impl ScoreRepository for MemoryStore {
    fn in_transaction<T, F>(&mut self, f: F) -> Result<T, ScoringError>
    where
        F: FnOnce(&mut Self) -> Result<T, ScoringError>,
    {
        let snapshot = self.state.clone();
        let result = f(self);
        if result.is_err() {
            self.state = snapshot;
        }
        result
    }

    fn find_score_for_update(
        &mut self,
        key: &ScoreKey,
    ) -> Result<Option<ScoreRecord>, ScoringError> {
        Ok(self
            .state
            .score_keys
            .get(key)
            .and_then(|id| self.state.scores.get(id))
            .cloned())
    }

    fn insert_score(&mut self, new: &NewScoreRecord) -> Result<ScoreRecord, ScoringError> {
        if self.state.score_keys.contains_key(&new.key) {
            return Err(ScoringError::Persistence(format!(
                "duplicate key value violates unique constraint on {:?}",
                new.key
            )));
        }
        self.state.next_score_id += 1;
        let record = ScoreRecord {
            score_id: self.state.next_score_id,
            entry_id: new.key.entry_id,
            judge_id: new.key.judge_id,
            round_number: new.key.round_number,
            competition_id: new.competition_id,
            technique_score: new.components.technique_score,
            performance_score: new.components.performance_score,
            deduction: new.components.deduction,
            total_score: new.total_score,
            notes: new.notes.clone(),
            version: 1,
            is_valid: true,
            created_at: new.created_at,
            last_modified_at: None,
            last_modified_by: None,
            modification_reason: None,
        };
        self.state.score_keys.insert(new.key, record.score_id);
        self.state.scores.insert(record.score_id, record.clone());
        Ok(record)
    }

    fn update_score(&mut self, record: &ScoreRecord) -> Result<ScoreRecord, ScoringError> {
        let existing = self
            .state
            .scores
            .get_mut(&record.score_id)
            .ok_or_else(|| ScoringError::score_not_found(record.score_id))?;
        if existing.key() != record.key() {
            return Err(ScoringError::Persistence(format!(
                "score #{} cannot change its key",
                record.score_id
            )));
        }
        *existing = record.clone();
        Ok(record.clone())
    }

    fn get_score(&mut self, score_id: u64) -> Result<Option<ScoreRecord>, ScoringError> {
        Ok(self.state.scores.get(&score_id).cloned())
    }

    fn scores_for_entry(&mut self, entry_id: u64) -> Result<Vec<ScoreRecord>, ScoringError> {
        let mut scores: Vec<ScoreRecord> = self
            .state
            .scores
            .values()
            .filter(|s| s.entry_id == entry_id)
            .cloned()
            .collect();
        scores.sort_by_key(|s| (s.round_number, s.judge_id));
        Ok(scores)
    }

    fn append_modification(
        &mut self,
        entry: &NewModificationLogEntry,
    ) -> Result<ModificationLogEntry, ScoringError> {
        if self.reject_log_appends {
            return Err(ScoringError::Persistence(
                "score_modification_logs is not writable".to_string(),
            ));
        }
        self.state.next_log_id += 1;
        let logged = ModificationLogEntry {
            log_id: self.state.next_log_id,
            score_id: entry.score_id,
            competition_id: entry.competition_id,
            entry_id: entry.entry_id,
            judge_id: entry.judge_id,
            round_number: entry.round_number,
            old_technique_score: entry.old.technique_score,
            new_technique_score: entry.new.technique_score,
            old_performance_score: entry.old.performance_score,
            new_performance_score: entry.new.performance_score,
            old_deduction: entry.old.deduction,
            new_deduction: entry.new.deduction,
            old_total_score: entry.old_total_score,
            new_total_score: entry.new_total_score,
            modification_type: entry.modification_type,
            reason: entry.reason.clone(),
            modified_by: entry.modified_by,
            modified_at: entry.modified_at,
        };
        self.state.logs.push(logged.clone());
        Ok(logged)
    }

    fn modifications_for_score(
        &mut self,
        score_id: u64,
    ) -> Result<Vec<ModificationLogEntry>, ScoringError> {
        Ok(self
            .state
            .logs
            .iter()
            .filter(|l| l.score_id == score_id)
            .cloned()
            .collect())
    }
}

impl Roster for MemoryStore {
    fn entry_exists(&mut self, entry_id: u64) -> Result<bool, ScoringError> {
        Ok(self.state.entries.contains_key(&entry_id))
    }

    fn judge_exists(&mut self, judge_id: u32) -> Result<bool, ScoringError> {
        Ok(self.state.judges.contains(&judge_id))
    }

    fn resolve_competition_id(&mut self, entry_id: u64) -> Result<Option<u32>, ScoringError> {
        Ok(self
            .state
            .entries
            .get(&entry_id)
            .and_then(|e| e.competition_id))
    }

    fn entries_in_competition(
        &mut self,
        competition_id: u32,
    ) -> Result<Vec<EntrySummary>, ScoringError> {
        Ok(self
            .state
            .entries
            .iter()
            .filter(|(_, e)| e.competition_id == Some(competition_id))
            .map(|(entry_id, e)| EntrySummary {
                entry_id: *entry_id,
                competition_id,
                registration_number: e.registration_number.clone(),
            })
            .collect())
    }
}
