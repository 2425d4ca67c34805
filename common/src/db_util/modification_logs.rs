#![allow(dead_code)]

use super::*;

table! {
    score_modification_logs (id) {
        id -> BigInt,
        score_id -> BigInt,
        competition_id -> Integer,
        entry_id -> BigInt,
        judge_id -> Integer,
        round_number -> Integer,
        old_technique_score -> Numeric,
        new_technique_score -> Numeric,
        old_performance_score -> Numeric,
        new_performance_score -> Numeric,
        old_deduction -> Numeric,
        new_deduction -> Numeric,
        old_total_score -> Numeric,
        new_total_score -> Numeric,
        modification_type -> Varchar,
        reason -> Text,
        modified_by -> Integer,
        modified_at -> Timestamptz,
    }
}

#[derive(Queryable)]
#[diesel(table_name = score_modification_logs)]
struct LogPrivate {
    id: i64,
    score_id: i64,
    competition_id: i32,
    entry_id: i64,
    judge_id: i32,
    round_number: i32,
    old_technique_score: BigDecimal,
    new_technique_score: BigDecimal,
    old_performance_score: BigDecimal,
    new_performance_score: BigDecimal,
    old_deduction: BigDecimal,
    new_deduction: BigDecimal,
    old_total_score: BigDecimal,
    new_total_score: BigDecimal,
    modification_type: String,
    reason: String,
    modified_by: i32,
    modified_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = score_modification_logs)]
struct LogPrivateNew {
    score_id: i64,
    competition_id: i32,
    entry_id: i64,
    judge_id: i32,
    round_number: i32,
    old_technique_score: BigDecimal,
    new_technique_score: BigDecimal,
    old_performance_score: BigDecimal,
    new_performance_score: BigDecimal,
    old_deduction: BigDecimal,
    new_deduction: BigDecimal,
    old_total_score: BigDecimal,
    new_total_score: BigDecimal,
    modification_type: String,
    reason: String,
    modified_by: i32,
    modified_at: DateTime<Utc>,
}

fn private_to_public(p: LogPrivate) -> Result<ModificationLogEntry, String> {
    use conversions::*;
    Ok(ModificationLogEntry {
        log_id: i64_to_u64(p.id)?,
        score_id: i64_to_u64(p.score_id)?,
        competition_id: i32_to_u32(p.competition_id)?,
        entry_id: i64_to_u64(p.entry_id)?,
        judge_id: i32_to_u32(p.judge_id)?,
        round_number: i32_to_u32(p.round_number)?,
        old_technique_score: bigdec_to_f64(&p.old_technique_score)?,
        new_technique_score: bigdec_to_f64(&p.new_technique_score)?,
        old_performance_score: bigdec_to_f64(&p.old_performance_score)?,
        new_performance_score: bigdec_to_f64(&p.new_performance_score)?,
        old_deduction: bigdec_to_f64(&p.old_deduction)?,
        new_deduction: bigdec_to_f64(&p.new_deduction)?,
        old_total_score: bigdec_to_f64(&p.old_total_score)?,
        new_total_score: bigdec_to_f64(&p.new_total_score)?,
        modification_type: ModificationType::parse(&p.modification_type)?,
        reason: p.reason,
        modified_by: i32_to_u32(p.modified_by)?,
        modified_at: p.modified_at,
    })
}

fn build_new_row(entry: &NewModificationLogEntry) -> Result<LogPrivateNew, String> {
    use conversions::*;
    Ok(LogPrivateNew {
        score_id: u64_to_i64(entry.score_id)?,
        competition_id: u32_to_i32(entry.competition_id)?,
        entry_id: u64_to_i64(entry.entry_id)?,
        judge_id: u32_to_i32(entry.judge_id)?,
        round_number: u32_to_i32(entry.round_number)?,
        old_technique_score: f64_to_bigdec(entry.old.technique_score)?,
        new_technique_score: f64_to_bigdec(entry.new.technique_score)?,
        old_performance_score: f64_to_bigdec(entry.old.performance_score)?,
        new_performance_score: f64_to_bigdec(entry.new.performance_score)?,
        old_deduction: f64_to_bigdec(entry.old.deduction)?,
        new_deduction: f64_to_bigdec(entry.new.deduction)?,
        old_total_score: f64_to_bigdec(entry.old_total_score)?,
        new_total_score: f64_to_bigdec(entry.new_total_score)?,
        modification_type: entry.modification_type.as_str().to_string(),
        reason: entry.reason.clone(),
        modified_by: u32_to_i32(entry.modified_by)?,
        modified_at: entry.modified_at,
    })
}

/// Append a log row. There is no update or delete for this table.
pub fn insert_modification_log(
    conn: &mut PgConnection,
    entry: &NewModificationLogEntry,
) -> Result<ModificationLogEntry, String> {
    use self::score_modification_logs::dsl::*;

    let insert_row = build_new_row(entry)?;

    diesel::insert_into(score_modification_logs)
        .values(&insert_row)
        .get_result::<LogPrivate>(conn)
        .map_err(|err| err.to_string())
        .and_then(private_to_public)
}

pub fn get_modification_logs_for_score(
    conn: &mut PgConnection,
    input_score_id: u64,
) -> Result<Vec<ModificationLogEntry>, String> {
    use self::score_modification_logs::dsl::*;

    let input_score_id = conversions::u64_to_i64(input_score_id)?;

    let items_private: Vec<LogPrivate> = score_modification_logs
        .filter(score_id.eq(input_score_id))
        .order(id.asc())
        .load(conn)
        .map_err(|err| err.to_string())?;

    items_private
        .into_iter()
        .map(private_to_public)
        .collect::<Result<Vec<ModificationLogEntry>, String>>()
}
