//! Interfaces between the application code and database.

mod conversions;
mod modification_logs;
mod roster;
mod scores;

use crate::repository::{Roster, ScoreRepository};
use crate::{
    EntrySummary, ModificationLogEntry, ModificationType, NewModificationLogEntry, NewScoreRecord,
    ScoreKey, ScoreRecord, ScoringError,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use std::env;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

fn database_url() -> Result<String, String> {
    dotenvy::dotenv().ok();
    env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())
}

/// Open a single connection, for jobs and scripts.
pub fn get_database_connection() -> Result<PgConnection, String> {
    let url = database_url()?;
    PgConnection::establish(&url).map_err(|err| format!("Error connecting to database: {err}"))
}

/// Build a connection pool, for the api.
pub fn get_database_pool() -> Result<PgPool, String> {
    let manager = ConnectionManager::<PgConnection>::new(database_url()?);
    Pool::builder()
        .test_on_check_out(true)
        .build(manager)
        .map_err(|err| format!("Could not build connection pool: {err}"))
}

pub fn get_pooled_database_connection(pool: &PgPool) -> Result<PgPooledConnection, String> {
    pool.get()
        .map_err(|err| format!("Could not get a pooled connection: {err}"))
}

impl ScoreRepository for PgConnection {
    fn in_transaction<T, F>(&mut self, f: F) -> Result<T, ScoringError>
    where
        F: FnOnce(&mut Self) -> Result<T, ScoringError>,
    {
        self.transaction(f)
    }

    fn find_score_for_update(
        &mut self,
        key: &ScoreKey,
    ) -> Result<Option<ScoreRecord>, ScoringError> {
        scores::get_score_for_update(self, key).map_err(ScoringError::Persistence)
    }

    fn insert_score(&mut self, new: &NewScoreRecord) -> Result<ScoreRecord, ScoringError> {
        scores::insert_score(self, new).map_err(ScoringError::Persistence)
    }

    fn update_score(&mut self, record: &ScoreRecord) -> Result<ScoreRecord, ScoringError> {
        scores::update_score(self, record).map_err(ScoringError::Persistence)
    }

    fn get_score(&mut self, score_id: u64) -> Result<Option<ScoreRecord>, ScoringError> {
        scores::get_score_by_id(self, score_id).map_err(ScoringError::Persistence)
    }

    fn scores_for_entry(&mut self, entry_id: u64) -> Result<Vec<ScoreRecord>, ScoringError> {
        scores::get_scores_for_entry(self, entry_id).map_err(ScoringError::Persistence)
    }

    fn append_modification(
        &mut self,
        entry: &NewModificationLogEntry,
    ) -> Result<ModificationLogEntry, ScoringError> {
        modification_logs::insert_modification_log(self, entry).map_err(ScoringError::Persistence)
    }

    fn modifications_for_score(
        &mut self,
        score_id: u64,
    ) -> Result<Vec<ModificationLogEntry>, ScoringError> {
        modification_logs::get_modification_logs_for_score(self, score_id).map_err(ScoringError::Persistence)
    }
}

impl Roster for PgConnection {
    fn entry_exists(&mut self, entry_id: u64) -> Result<bool, ScoringError> {
        roster::entry_exists(self, entry_id).map_err(ScoringError::Persistence)
    }

    fn judge_exists(&mut self, judge_id: u32) -> Result<bool, ScoringError> {
        roster::judge_exists(self, judge_id).map_err(ScoringError::Persistence)
    }

    fn resolve_competition_id(&mut self, entry_id: u64) -> Result<Option<u32>, ScoringError> {
        roster::get_competition_id_for_entry(self, entry_id).map_err(ScoringError::Persistence)
    }

    fn entries_in_competition(
        &mut self,
        competition_id: u32,
    ) -> Result<Vec<EntrySummary>, ScoringError> {
        roster::get_entries_in_competition(self, competition_id).map_err(ScoringError::Persistence)
    }
}
