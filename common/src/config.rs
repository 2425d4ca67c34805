//! Scoring bounds and aggregation policy.

use crate::ScoreComponents;
use crate::ScoreField;
use crate::error::{ComponentViolation, ScoringError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::str::FromStr;

pub const DEFAULT_TECHNIQUE_MAX: f64 = 10.0;
pub const DEFAULT_PERFORMANCE_MAX: f64 = 10.0;
pub const DEFAULT_DEDUCTION_MAX: f64 = 5.0;
pub const DEFAULT_DECIMAL_PLACES: u32 = 2;
pub const DEFAULT_MIN_JUDGES: usize = 3;
pub const DEFAULT_MAX_JUDGES: usize = 9;

/// Precision score components and totals are stored at; also the largest
/// `decimal_places` we round to, which keeps `10^places` exact in an f64.
pub const STORED_DECIMAL_PLACES: u32 = 6;
const MAX_DECIMAL_PLACES: u32 = STORED_DECIMAL_PLACES;

/// Immutable configuration for one competition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub technique_max: f64,
    pub performance_max: f64,
    pub deduction_max: f64,
    pub decimal_places: u32,
    pub min_judges: usize,
    pub max_judges: usize,
    pub drop_highest: bool,
    pub drop_lowest: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            technique_max: DEFAULT_TECHNIQUE_MAX,
            performance_max: DEFAULT_PERFORMANCE_MAX,
            deduction_max: DEFAULT_DEDUCTION_MAX,
            decimal_places: DEFAULT_DECIMAL_PLACES,
            min_judges: DEFAULT_MIN_JUDGES,
            max_judges: DEFAULT_MAX_JUDGES,
            drop_highest: true,
            drop_lowest: true,
        }
    }
}

fn var_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, String> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

impl ScoringConfig {
    /// Build a config from `SCORING_*` environment variables, falling back to defaults.
    ///
    /// # Errors
    /// Returns an error if a variable cannot be parsed or the result fails [`Self::check`].
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a config from `SCORING_*` variables supplied by `lookup`.
    ///
    /// # Errors
    /// Returns an error if a variable cannot be parsed or the result fails [`Self::check`].
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = Self::default();
        let config = Self {
            technique_max: var_or(&lookup, "SCORING_TECHNIQUE_MAX", defaults.technique_max)?,
            performance_max: var_or(&lookup, "SCORING_PERFORMANCE_MAX", defaults.performance_max)?,
            deduction_max: var_or(&lookup, "SCORING_DEDUCTION_MAX", defaults.deduction_max)?,
            decimal_places: var_or(&lookup, "SCORING_DECIMAL_PLACES", defaults.decimal_places)?,
            min_judges: var_or(&lookup, "SCORING_MIN_JUDGES", defaults.min_judges)?,
            max_judges: var_or(&lookup, "SCORING_MAX_JUDGES", defaults.max_judges)?,
            drop_highest: var_or(&lookup, "SCORING_DROP_HIGHEST", defaults.drop_highest)?,
            drop_lowest: var_or(&lookup, "SCORING_DROP_LOWEST", defaults.drop_lowest)?,
        };
        config.check()?;
        Ok(config)
    }

    /// Reject configurations that could never validate a score sensibly.
    ///
    /// # Errors
    /// Returns a message naming the first bad setting.
    pub fn check(&self) -> Result<(), String> {
        for (name, bound) in [
            ("technique_max", self.technique_max),
            ("performance_max", self.performance_max),
            ("deduction_max", self.deduction_max),
        ] {
            if !bound.is_finite() || bound < 0.0 {
                return Err(format!("{name} must be a non-negative number (got {bound})"));
            }
        }
        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(format!(
                "decimal_places must be at most {MAX_DECIMAL_PLACES} (got {})",
                self.decimal_places
            ));
        }
        if self.min_judges > self.max_judges {
            return Err(format!(
                "min_judges ({}) exceeds max_judges ({})",
                self.min_judges, self.max_judges
            ));
        }
        Ok(())
    }

    fn bound(&self, field: ScoreField) -> f64 {
        match field {
            ScoreField::Technique => self.technique_max,
            ScoreField::Performance => self.performance_max,
            ScoreField::Deduction => self.deduction_max,
        }
    }

    /// Every component outside `0..=max`, in field order.
    pub fn violations(&self, components: &ScoreComponents) -> Vec<ComponentViolation> {
        [
            (ScoreField::Technique, components.technique_score),
            (ScoreField::Performance, components.performance_score),
            (ScoreField::Deduction, components.deduction),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            let max = self.bound(field);
            // NaN fails both comparisons, so it is caught here too
            if (0.0..=max).contains(&value) {
                None
            } else {
                Some(ComponentViolation { field, value, max })
            }
        })
        .collect()
    }

    /// Fail on the first out-of-bounds component.
    ///
    /// # Errors
    /// Returns [`ScoringError::InvalidComponent`] naming the field and its bound.
    pub fn validate(&self, components: &ScoreComponents) -> Result<(), ScoringError> {
        match self.violations(components).into_iter().next() {
            Some(violation) => Err(ScoringError::InvalidComponent(violation)),
            None => Ok(()),
        }
    }
}

/// Round half away from zero to a number of decimal places. Never returns `-0.0`.
pub fn round_to_places(value: f64, decimal_places: u32) -> f64 {
    let factor = 10f64.powi(decimal_places.min(MAX_DECIMAL_PLACES) as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Render a score with fixed decimals; a missing score renders as zero.
pub fn format_score(value: Option<f64>, decimal_places: u32) -> String {
    let places = decimal_places as usize;
    format!("{:.places$}", value.unwrap_or(0.0))
}

/// Lookup of the configuration governing a competition.
pub trait ScoringConfigSource {
    /// `None` means the competition could not be resolved; implementations return their default.
    fn scoring_config(&self, competition_id: Option<u32>) -> ScoringConfig;
}

impl ScoringConfigSource for ScoringConfig {
    fn scoring_config(&self, _competition_id: Option<u32>) -> ScoringConfig {
        self.clone()
    }
}

/// A default config plus per-competition overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfigs {
    pub default: ScoringConfig,
    #[serde(default)]
    pub competitions: HashMap<u32, ScoringConfig>,
}

impl ScoringConfigs {
    pub fn new(default: ScoringConfig) -> Self {
        Self {
            default,
            competitions: HashMap::new(),
        }
    }

    pub fn with_competition(mut self, competition_id: u32, config: ScoringConfig) -> Self {
        self.competitions.insert(competition_id, config);
        self
    }

    /// Parse overrides from JSON of the form `{"12": {...}, "13": {...}}`.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or an override fails its check.
    pub fn with_overrides_json(mut self, json: &str) -> Result<Self, String> {
        let overrides: HashMap<u32, ScoringConfig> =
            serde_json::from_str(json).map_err(|e| e.to_string())?;
        for (competition_id, config) in overrides {
            config
                .check()
                .map_err(|e| format!("competition {competition_id}: {e}"))?;
            self.competitions.insert(competition_id, config);
        }
        Ok(self)
    }

    /// Default from the environment, overrides from the file named by `SCORING_CONFIG_OVERRIDES`.
    ///
    /// # Errors
    /// Returns an error if any part of the configuration is unreadable or invalid.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// # Errors
    /// Returns an error if any part of the configuration is unreadable or invalid.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let configs = Self::new(ScoringConfig::from_vars(&lookup)?);
        match lookup("SCORING_CONFIG_OVERRIDES") {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .map_err(|e| format!("Could not read {path}: {e}"))?;
                configs.with_overrides_json(&json)
            }
            None => Ok(configs),
        }
    }
}

impl ScoringConfigSource for ScoringConfigs {
    fn scoring_config(&self, competition_id: Option<u32>) -> ScoringConfig {
        competition_id
            .and_then(|id| self.competitions.get(&id))
            .unwrap_or(&self.default)
            .clone()
    }
}
