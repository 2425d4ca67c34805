#![allow(dead_code)]

use super::*;

table! {
    scores (id) {
        id -> BigInt,
        entry_id -> BigInt,
        judge_id -> Integer,
        round_number -> Integer,
        competition_id -> Nullable<Integer>,
        technique_score -> Numeric,
        performance_score -> Numeric,
        deduction -> Numeric,
        total_score -> Numeric,
        notes -> Text,
        version -> Integer,
        is_valid -> Bool,
        created_at -> Timestamptz,
        last_modified_at -> Nullable<Timestamptz>,
        last_modified_by -> Nullable<Integer>,
        modification_reason -> Nullable<Text>,
    }
}

#[derive(Queryable)]
#[diesel(table_name = scores)]
struct ScorePrivate {
    id: i64,
    entry_id: i64,
    judge_id: i32,
    round_number: i32,
    competition_id: Option<i32>,
    technique_score: BigDecimal,
    performance_score: BigDecimal,
    deduction: BigDecimal,
    total_score: BigDecimal,
    notes: String,
    version: i32,
    is_valid: bool,
    created_at: DateTime<Utc>,
    last_modified_at: Option<DateTime<Utc>>,
    last_modified_by: Option<i32>,
    modification_reason: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = scores)]
struct ScorePrivateNew {
    entry_id: i64,
    judge_id: i32,
    round_number: i32,
    competition_id: Option<i32>,
    technique_score: BigDecimal,
    performance_score: BigDecimal,
    deduction: BigDecimal,
    total_score: BigDecimal,
    notes: String,
    version: i32,
    is_valid: bool,
    created_at: DateTime<Utc>,
}

/// Everything a correction may change; the key and creation time stay fixed.
#[derive(AsChangeset)]
#[diesel(table_name = scores)]
#[diesel(treat_none_as_null = true)]
struct ScorePrivateUpdate {
    competition_id: Option<i32>,
    technique_score: BigDecimal,
    performance_score: BigDecimal,
    deduction: BigDecimal,
    total_score: BigDecimal,
    notes: String,
    version: i32,
    is_valid: bool,
    last_modified_at: Option<DateTime<Utc>>,
    last_modified_by: Option<i32>,
    modification_reason: Option<String>,
}

fn private_to_public(p: ScorePrivate) -> Result<ScoreRecord, String> {
    use conversions::*;
    Ok(ScoreRecord {
        score_id: i64_to_u64(p.id)?,
        entry_id: i64_to_u64(p.entry_id)?,
        judge_id: i32_to_u32(p.judge_id)?,
        round_number: i32_to_u32(p.round_number)?,
        competition_id: opti32_to_optu32(p.competition_id)?,
        technique_score: bigdec_to_f64(&p.technique_score)?,
        performance_score: bigdec_to_f64(&p.performance_score)?,
        deduction: bigdec_to_f64(&p.deduction)?,
        total_score: bigdec_to_f64(&p.total_score)?,
        notes: p.notes,
        version: i32_to_u32(p.version)?,
        is_valid: p.is_valid,
        created_at: p.created_at,
        last_modified_at: p.last_modified_at,
        last_modified_by: opti32_to_optu32(p.last_modified_by)?,
        modification_reason: p.modification_reason,
    })
}

fn build_new_row(new: &NewScoreRecord) -> Result<ScorePrivateNew, String> {
    use conversions::*;
    Ok(ScorePrivateNew {
        entry_id: u64_to_i64(new.key.entry_id)?,
        judge_id: u32_to_i32(new.key.judge_id)?,
        round_number: u32_to_i32(new.key.round_number)?,
        competition_id: optu32_to_opti32(new.competition_id)?,
        technique_score: f64_to_bigdec(new.components.technique_score)?,
        performance_score: f64_to_bigdec(new.components.performance_score)?,
        deduction: f64_to_bigdec(new.components.deduction)?,
        total_score: f64_to_bigdec(new.total_score)?,
        notes: new.notes.clone(),
        version: 1,
        is_valid: true,
        created_at: new.created_at,
    })
}

fn build_update(record: &ScoreRecord) -> Result<ScorePrivateUpdate, String> {
    use conversions::*;
    Ok(ScorePrivateUpdate {
        competition_id: optu32_to_opti32(record.competition_id)?,
        technique_score: f64_to_bigdec(record.technique_score)?,
        performance_score: f64_to_bigdec(record.performance_score)?,
        deduction: f64_to_bigdec(record.deduction)?,
        total_score: f64_to_bigdec(record.total_score)?,
        notes: record.notes.clone(),
        version: u32_to_i32(record.version)?,
        is_valid: record.is_valid,
        last_modified_at: record.last_modified_at,
        last_modified_by: optu32_to_opti32(record.last_modified_by)?,
        modification_reason: record.modification_reason.clone(),
    })
}

/// Find the score for a key and lock its row until the transaction ends.
pub fn get_score_for_update(
    conn: &mut PgConnection,
    key: &ScoreKey,
) -> Result<Option<ScoreRecord>, String> {
    use self::scores::dsl::*;

    let input_entry_id = conversions::u64_to_i64(key.entry_id)?;
    let input_judge_id = conversions::u32_to_i32(key.judge_id)?;
    let input_round_number = conversions::u32_to_i32(key.round_number)?;

    scores
        .filter(entry_id.eq(input_entry_id))
        .filter(judge_id.eq(input_judge_id))
        .filter(round_number.eq(input_round_number))
        .for_update()
        .first::<ScorePrivate>(conn)
        .optional()
        .map_err(|err| err.to_string())?
        .map(private_to_public)
        .transpose()
}

pub fn insert_score(conn: &mut PgConnection, new: &NewScoreRecord) -> Result<ScoreRecord, String> {
    use self::scores::dsl::*;

    let insert_row = build_new_row(new)?;

    diesel::insert_into(scores)
        .values(&insert_row)
        .get_result::<ScorePrivate>(conn)
        .map_err(|err| err.to_string())
        .and_then(private_to_public)
}

pub fn update_score(conn: &mut PgConnection, record: &ScoreRecord) -> Result<ScoreRecord, String> {
    use self::scores::dsl::*;

    let row_id = conversions::u64_to_i64(record.score_id)?;
    let changes = build_update(record)?;

    diesel::update(scores.filter(id.eq(row_id)))
        .set(&changes)
        .get_result::<ScorePrivate>(conn)
        .map_err(|err| err.to_string())
        .and_then(private_to_public)
}

pub fn get_score_by_id(conn: &mut PgConnection, row_id: u64) -> Result<Option<ScoreRecord>, String> {
    use self::scores::dsl::*;

    let row_id = conversions::u64_to_i64(row_id)?;

    scores
        .filter(id.eq(row_id))
        .first::<ScorePrivate>(conn)
        .optional()
        .map_err(|err| err.to_string())?
        .map(private_to_public)
        .transpose()
}

pub fn get_scores_for_entry(
    conn: &mut PgConnection,
    input_entry_id: u64,
) -> Result<Vec<ScoreRecord>, String> {
    use self::scores::dsl::*;

    let input_entry_id = conversions::u64_to_i64(input_entry_id)?;

    let items_private: Vec<ScorePrivate> = scores
        .filter(entry_id.eq(input_entry_id))
        .order((round_number.asc(), judge_id.asc()))
        .load(conn)
        .map_err(|err| err.to_string())?;

    items_private
        .into_iter()
        .map(private_to_public)
        .collect::<Result<Vec<ScoreRecord>, String>>()
}
