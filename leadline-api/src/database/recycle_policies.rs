use crate::database::source_databases;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use shared_types::{RecyclePolicy, UpdateRecyclePolicyRequest};

/// Longest idle delay a policy can store: one year.
pub const MAX_DELAY_MINUTES: i64 = 366 * 24 * 60;

/// Stored policy for a database, `None` when an administrator never saved one.
pub fn get_policy(conn: &Connection, source_database_id: i64) -> Result<Option<RecyclePolicy>> {
    let policy = conn
        .query_row(
            "SELECT source_database_id, enabled, delay_minutes, recycle_nrp,
                    recycle_answering_machine, recycle_absent, recycle_unreachable, updated_at
             FROM recycle_policies
             WHERE source_database_id = ?1",
            [source_database_id],
            |row| {
                Ok(RecyclePolicy {
                    source_database_id: row.get(0)?,
                    enabled: row.get(1)?,
                    delay_minutes: row.get(2)?,
                    recycle_nrp: row.get(3)?,
                    recycle_answering_machine: row.get(4)?,
                    recycle_absent: row.get(5)?,
                    recycle_unreachable: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(policy)
}

pub fn upsert_policy(
    conn: &Connection,
    source_database_id: i64,
    request: &UpdateRecyclePolicyRequest,
    now: i64,
) -> Result<RecyclePolicy> {
    source_databases::get_source_database(conn, source_database_id)?;

    let delay_minutes = request.delay_minutes.clamp(0, MAX_DELAY_MINUTES);
    conn.execute(
        "INSERT INTO recycle_policies
         (source_database_id, enabled, delay_minutes, recycle_nrp, recycle_answering_machine,
          recycle_absent, recycle_unreachable, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT (source_database_id) DO UPDATE SET
             enabled = excluded.enabled,
             delay_minutes = excluded.delay_minutes,
             recycle_nrp = excluded.recycle_nrp,
             recycle_answering_machine = excluded.recycle_answering_machine,
             recycle_absent = excluded.recycle_absent,
             recycle_unreachable = excluded.recycle_unreachable,
             updated_at = excluded.updated_at",
        params![
            source_database_id,
            request.enabled,
            delay_minutes,
            request.recycle_nrp,
            request.recycle_answering_machine,
            request.recycle_absent,
            request.recycle_unreachable,
            now,
        ],
    )?;

    Ok(RecyclePolicy {
        source_database_id,
        enabled: request.enabled,
        delay_minutes,
        recycle_nrp: request.recycle_nrp,
        recycle_answering_machine: request.recycle_answering_machine,
        recycle_absent: request.recycle_absent,
        recycle_unreachable: request.recycle_unreachable,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrations::run_migrations;
    use crate::error::LeadError;

    #[test]
    fn test_upsert_then_overwrite() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let db = source_databases::insert_source_database(&conn, "Leads", 0).unwrap();

        assert!(get_policy(&conn, db.id).unwrap().is_none());

        let mut request = UpdateRecyclePolicyRequest {
            enabled: true,
            delay_minutes: 30,
            recycle_nrp: true,
            recycle_answering_machine: false,
            recycle_absent: false,
            recycle_unreachable: false,
        };
        upsert_policy(&conn, db.id, &request, 1).unwrap();

        request.delay_minutes = -5;
        request.recycle_absent = true;
        upsert_policy(&conn, db.id, &request, 2).unwrap();

        let stored = get_policy(&conn, db.id).unwrap().unwrap();
        assert_eq!(stored.delay_minutes, 0);
        assert!(stored.recycle_absent);
        assert_eq!(stored.updated_at, 2);

        request.delay_minutes = i64::MAX / 2;
        let saved = upsert_policy(&conn, db.id, &request, 3).unwrap();
        assert_eq!(saved.delay_minutes, MAX_DELAY_MINUTES);
        assert_eq!(get_policy(&conn, db.id).unwrap().unwrap().delay_minutes, MAX_DELAY_MINUTES);
    }

    #[test]
    fn test_upsert_for_missing_database() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let request = UpdateRecyclePolicyRequest {
            enabled: true,
            delay_minutes: 30,
            recycle_nrp: true,
            recycle_answering_machine: false,
            recycle_absent: false,
            recycle_unreachable: false,
        };
        assert!(matches!(
            upsert_policy(&conn, 42, &request, 1),
            Err(LeadError::NotFound { .. })
        ));
    }
}
