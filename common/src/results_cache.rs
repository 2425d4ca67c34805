//! Short-lived cache of published rankings.
//!
//! Lives with the caller, not inside the engine; every successful score write must
//! invalidate the competition it contributes to.

use crate::AggregateResult;
use crate::aggregate::AggregationScope;
use crate::clock::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

type CacheKey = (u32, AggregationScope);

pub struct ResultsCache<K> {
    clock: K,
    ttl: TimeDelta,
    entries: Mutex<HashMap<CacheKey, (DateTime<Utc>, Vec<AggregateResult>)>>,
}

impl<K: Clock> ResultsCache<K> {
    pub fn new(clock: K, ttl: TimeDelta) -> Self {
        Self {
            clock,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, (DateTime<Utc>, Vec<AggregateResult>)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, competition_id: u32, scope: AggregationScope) -> Option<Vec<AggregateResult>> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(&(competition_id, scope)) {
            Some((stored_at, results)) if now - *stored_at < self.ttl => Some(results.clone()),
            Some(_) => {
                entries.remove(&(competition_id, scope));
                None
            }
            None => None,
        }
    }

    /// Store a ranking, evicting every entry that has outlived the ttl.
    /// Nothing is stored when the ttl is zero or negative.
    pub fn insert(&self, competition_id: u32, scope: AggregationScope, results: Vec<AggregateResult>) {
        if self.ttl <= TimeDelta::zero() {
            return;
        }
        let now = self.clock.now();
        let mut entries = self.lock();
        entries.retain(|_, (stored_at, _)| now - *stored_at < self.ttl);
        entries.insert((competition_id, scope), (now, results));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached scope of a competition.
    pub fn invalidate(&self, competition_id: u32) {
        self.lock().retain(|(id, _), _| *id != competition_id);
        log::debug!("Invalidated cached results for competition {competition_id}");
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
