//! The operations offered to transports such as the HTTP api.

use crate::aggregate::{AggregationScope, ResultsAggregator};
use crate::clock::Clock;
use crate::config::{ScoringConfigSource, format_score};
use crate::error::ComponentViolation;
use crate::repository::{Roster, ScoreRepository};
use crate::results_cache::ResultsCache;
use crate::statistics::{self, ScoringStatistics};
use crate::writer::{ScoreSubmission, ScoreWrite, ScoreWriter};
use crate::{
    AggregateResult, ModificationLogEntry, ScoreComponents, ScoreRecord, ScoringConfig,
    ScoringError, modification_log, ranking,
};
use chrono::TimeDelta;
use serde::Serialize;

/// Outcome of checking a score without recording it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePreview {
    pub is_valid: bool,
    pub violations: Vec<ComponentViolation>,
    pub total_score: f64,
    pub formatted_total: String,
}

pub struct ScoringService<C, K> {
    configs: C,
    cache: ResultsCache<K>,
}

impl<C: ScoringConfigSource, K: Clock> ScoringService<C, K> {
    /// A `results_ttl` of zero disables result caching.
    pub fn new(configs: C, clock: K, results_ttl: TimeDelta) -> Self {
        Self {
            configs,
            cache: ResultsCache::new(clock, results_ttl),
        }
    }

    pub fn scoring_config(&self, competition_id: Option<u32>) -> ScoringConfig {
        self.configs.scoring_config(competition_id)
    }

    /// Record a score and invalidate any cached ranking it contributes to.
    ///
    /// # Errors
    /// See [`ScoreWriter::submit`].
    pub fn submit_score<S>(
        &self,
        store: &mut S,
        submission: &ScoreSubmission,
    ) -> Result<ScoreWrite, ScoringError>
    where
        S: ScoreRepository + Roster,
    {
        let write = ScoreWriter::new(&self.configs, self.cache.clock()).submit(store, submission)?;
        match write.record().competition_id {
            Some(competition_id) => self.cache.invalidate(competition_id),
            None => self.cache.clear(),
        }
        Ok(write)
    }

    /// Aggregated results of a competition in publication order.
    ///
    /// # Errors
    /// Returns a persistence error from the store.
    pub fn aggregate_results<S>(
        &self,
        store: &mut S,
        competition_id: u32,
        scope: AggregationScope,
    ) -> Result<Vec<AggregateResult>, ScoringError>
    where
        S: ScoreRepository + Roster,
    {
        if let Some(results) = self.cache.get(competition_id, scope) {
            log::debug!("Serving cached results for competition {competition_id}");
            return Ok(results);
        }
        let results = ResultsAggregator::new(&self.configs)
            .aggregate_for_competition(store, competition_id, scope)?;
        let ordered = ranking::order(results.into_values().collect());
        self.cache.insert(competition_id, scope, ordered.clone());
        Ok(ordered)
    }

    /// # Errors
    /// Returns not-found for an unknown score, or a persistence error from the store.
    pub fn modification_history<S: ScoreRepository>(
        &self,
        store: &mut S,
        score_id: u64,
    ) -> Result<Vec<ModificationLogEntry>, ScoringError> {
        modification_log::list_for(store, score_id)
    }

    /// All scores of an entry, optionally limited to one round, ordered by round then judge.
    ///
    /// # Errors
    /// Returns not-found for an unknown entry, or a persistence error from the store.
    pub fn entry_scores<S>(
        &self,
        store: &mut S,
        entry_id: u64,
        round_number: Option<u32>,
    ) -> Result<Vec<ScoreRecord>, ScoringError>
    where
        S: ScoreRepository + Roster,
    {
        if !store.entry_exists(entry_id)? {
            return Err(ScoringError::entry_not_found(entry_id));
        }
        let scores = store.scores_for_entry(entry_id)?;
        Ok(scores
            .into_iter()
            .filter(|s| round_number.is_none_or(|round| s.round_number == round))
            .collect())
    }

    /// # Errors
    /// Returns a persistence error from the store.
    pub fn statistics<S>(
        &self,
        store: &mut S,
        competition_id: u32,
    ) -> Result<ScoringStatistics, ScoringError>
    where
        S: ScoreRepository + Roster,
    {
        let config = self.configs.scoring_config(Some(competition_id));
        statistics::for_competition(store, competition_id, config.decimal_places)
    }

    /// Check a score against the competition's bounds, reporting every violation.
    pub fn preview_score(
        &self,
        competition_id: Option<u32>,
        components: &ScoreComponents,
    ) -> ScorePreview {
        let components = components.quantized();
        let config = self.configs.scoring_config(competition_id);
        let violations = config.violations(&components);
        let total_score = components.total(config.decimal_places);
        ScorePreview {
            is_valid: violations.is_empty(),
            violations,
            total_score,
            formatted_total: format_score(Some(total_score), config.decimal_places),
        }
    }
}
