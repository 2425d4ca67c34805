//! An api for recording judge scores and publishing competition results.

#[macro_use]
extern crate rocket;

mod helpers;
use helpers::*;

use chrono::TimeDelta;
use podium_common::aggregate::AggregationScope;
use podium_common::clock::SystemClock;
use podium_common::db_util::{PgPool, PgPooledConnection, get_database_pool, get_pooled_database_connection};
use podium_common::service::{ScorePreview, ScoringService};
use podium_common::statistics::ScoringStatistics;
use podium_common::writer::{ScoreSubmission, ScoreWrite};
use podium_common::{
    AggregateResult, ModificationLogEntry, ScoreComponents, ScoreKey, ScoreRecord, ScoringConfig,
    ScoringConfigs,
};
use rocket::State;
use rocket::serde::json::{Json, Value, json};
use rocket::serde::{Deserialize, Serialize};
use rocket_prometheus::PrometheusMetrics;
use std::env;
use tracing_subscriber::EnvFilter;

const DEFAULT_RESULTS_CACHE_SECS: i64 = 30;

struct AppState {
    pool: PgPool,
    service: ScoringService<ScoringConfigs, SystemClock>,
}

impl AppState {
    fn conn(&self) -> Result<PgPooledConnection, ApiError> {
        get_pooled_database_connection(&self.pool).map_err(|err| {
            tracing::error!(error = %err, "No database connection");
            internal_error("The score store is unavailable, please retry later.")
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
struct SubmitScoreBody {
    judge_id: u32,
    round_number: Option<u32>,
    technique_score: f64,
    performance_score: f64,
    deduction: Option<f64>,
    notes: Option<String>,
    /// Who is making the write, when an administrator corrects a judge's score.
    acting_judge_id: Option<u32>,
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
struct SubmitScoreResponse {
    corrected: bool,
    score: ScoreRecord,
    modification: Option<ModificationLogEntry>,
}

#[post("/scores/entry/<entry_id>", data = "<body>")]
fn submit_score(
    state: &State<AppState>,
    entry_id: u64,
    body: Json<SubmitScoreBody>,
) -> ApiResult<SubmitScoreResponse> {
    let body = body.into_inner();
    let submission = ScoreSubmission {
        key: ScoreKey {
            entry_id,
            judge_id: body.judge_id,
            round_number: body.round_number.unwrap_or(1),
        },
        components: ScoreComponents {
            technique_score: body.technique_score,
            performance_score: body.performance_score,
            deduction: body.deduction.unwrap_or(0.0),
        },
        notes: body.notes.unwrap_or_default().trim().to_string(),
        acting_judge_id: body.acting_judge_id.unwrap_or(body.judge_id),
        reason: body.reason,
    };

    let mut conn = state.conn()?;
    let write = state
        .service
        .submit_score(&mut *conn, &submission)
        .map_err(|err| scoring_error(&err))?;

    let response = match write {
        ScoreWrite::Created(score) => SubmitScoreResponse {
            corrected: false,
            score,
            modification: None,
        },
        ScoreWrite::Corrected { record, log_entry } => SubmitScoreResponse {
            corrected: true,
            score: record,
            modification: log_entry,
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
struct PreviewScoreBody {
    competition_id: Option<u32>,
    technique_score: f64,
    performance_score: f64,
    deduction: Option<f64>,
}

#[post("/scores/validate", data = "<body>")]
fn validate_score(state: &State<AppState>, body: Json<PreviewScoreBody>) -> Json<ScorePreview> {
    let components = ScoreComponents {
        technique_score: body.technique_score,
        performance_score: body.performance_score,
        deduction: body.deduction.unwrap_or(0.0),
    };
    Json(state.service.preview_score(body.competition_id, &components))
}

#[get("/scores/entry/<entry_id>?<round>")]
fn entry_scores(
    state: &State<AppState>,
    entry_id: u64,
    round: Option<u32>,
) -> ApiResult<Vec<ScoreRecord>> {
    let mut conn = state.conn()?;
    state
        .service
        .entry_scores(&mut *conn, entry_id, round)
        .map(Json)
        .map_err(|err| scoring_error(&err))
}

#[get("/scores/<score_id>/history")]
fn score_history(state: &State<AppState>, score_id: u64) -> ApiResult<Vec<ModificationLogEntry>> {
    let mut conn = state.conn()?;
    state
        .service
        .modification_history(&mut *conn, score_id)
        .map(Json)
        .map_err(|err| scoring_error(&err))
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
struct ResultsResponse {
    competition_id: u32,
    round: Option<u32>,
    min_judges: usize,
    drop_highest: bool,
    drop_lowest: bool,
    results: Vec<AggregateResult>,
}

#[get("/competitions/<competition_id>/results?<round>")]
fn competition_results(
    state: &State<AppState>,
    competition_id: u32,
    round: Option<u32>,
) -> ApiResult<ResultsResponse> {
    let scope = round.map_or(AggregationScope::AllRounds, AggregationScope::Round);
    let mut conn = state.conn()?;
    let results = state
        .service
        .aggregate_results(&mut *conn, competition_id, scope)
        .map_err(|err| scoring_error(&err))?;

    let config = state.service.scoring_config(Some(competition_id));
    Ok(Json(ResultsResponse {
        competition_id,
        round,
        min_judges: config.min_judges,
        drop_highest: config.drop_highest,
        drop_lowest: config.drop_lowest,
        results,
    }))
}

#[get("/competitions/<competition_id>/statistics")]
fn competition_statistics(
    state: &State<AppState>,
    competition_id: u32,
) -> ApiResult<ScoringStatistics> {
    let mut conn = state.conn()?;
    state
        .service
        .statistics(&mut *conn, competition_id)
        .map(Json)
        .map_err(|err| scoring_error(&err))
}

#[get("/scoring/config?<competition_id>")]
fn scoring_config(state: &State<AppState>, competition_id: Option<u32>) -> Json<ScoringConfig> {
    Json(state.service.scoring_config(competition_id))
}

#[catch(404)]
fn not_found() -> Value {
    json!("The requested resource could not be found.")
}

fn results_cache_ttl() -> Result<TimeDelta, String> {
    match env::var("RESULTS_CACHE_SECS") {
        Ok(raw) => raw
            .parse::<i64>()
            .map(TimeDelta::seconds)
            .map_err(|_| format!("RESULTS_CACHE_SECS has an invalid value: {raw:?}")),
        Err(_) => Ok(TimeDelta::seconds(DEFAULT_RESULTS_CACHE_SECS)),
    }
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let configs = ScoringConfigs::from_env()?;
    let pool = get_database_pool()?;
    let state = AppState {
        pool,
        service: ScoringService::new(configs, SystemClock, results_cache_ttl()?),
    };
    tracing::info!("Scoring api starting");

    let prometheus = PrometheusMetrics::new();
    let _rocket = rocket::build()
        .manage(state)
        .attach(RequestTimingFairing)
        .attach(CorsFairing)
        .attach(prometheus.clone())
        .mount(
            "/",
            routes![
                submit_score,
                validate_score,
                entry_scores,
                score_history,
                competition_results,
                competition_statistics,
                scoring_config
            ],
        )
        .mount("/metrics", prometheus)
        .register("/", catchers![not_found])
        .launch()
        .await?;
    Ok(())
}
