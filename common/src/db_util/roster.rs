//! Read-only access to the registration side's tables.

#![allow(dead_code)]

use super::*;

table! {
    entries (id) {
        id -> BigInt,
        competition_id -> Nullable<Integer>,
        registration_number -> Varchar,
    }
}

table! {
    judges (id) {
        id -> Integer,
        name -> Varchar,
    }
}

#[derive(Queryable)]
#[diesel(table_name = entries)]
struct EntryPrivate {
    id: i64,
    competition_id: Option<i32>,
    registration_number: String,
}

pub fn entry_exists(conn: &mut PgConnection, row_id: u64) -> Result<bool, String> {
    use self::entries::dsl::*;

    let row_id = conversions::u64_to_i64(row_id)?;

    diesel::select(diesel::dsl::exists(entries.filter(id.eq(row_id))))
        .get_result(conn)
        .map_err(|err| err.to_string())
}

pub fn judge_exists(conn: &mut PgConnection, row_id: u32) -> Result<bool, String> {
    use self::judges::dsl::*;

    let row_id = conversions::u32_to_i32(row_id)?;

    diesel::select(diesel::dsl::exists(judges.filter(id.eq(row_id))))
        .get_result(conn)
        .map_err(|err| err.to_string())
}

pub fn get_competition_id_for_entry(
    conn: &mut PgConnection,
    row_id: u64,
) -> Result<Option<u32>, String> {
    use self::entries::dsl::*;

    let row_id = conversions::u64_to_i64(row_id)?;

    let found: Option<Option<i32>> = entries
        .filter(id.eq(row_id))
        .select(competition_id)
        .first(conn)
        .optional()
        .map_err(|err| err.to_string())?;

    conversions::opti32_to_optu32(found.flatten())
}

pub fn get_entries_in_competition(
    conn: &mut PgConnection,
    input_competition_id: u32,
) -> Result<Vec<EntrySummary>, String> {
    use self::entries::dsl::*;

    let input_competition_id = conversions::u32_to_i32(input_competition_id)?;

    let items_private: Vec<EntryPrivate> = entries
        .filter(competition_id.eq(input_competition_id))
        .order(id.asc())
        .load(conn)
        .map_err(|err| err.to_string())?;

    items_private
        .into_iter()
        .map(|p| {
            Ok(EntrySummary {
                entry_id: conversions::i64_to_u64(p.id)?,
                competition_id: conversions::i32_to_u32(input_competition_id)?,
                registration_number: p.registration_number,
            })
        })
        .collect::<Result<Vec<EntrySummary>, String>>()
}
