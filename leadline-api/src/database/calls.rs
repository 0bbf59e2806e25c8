use crate::database::{agents, contacts, AsyncDbConnection};
use crate::error::{LeadError, OrNotFound, Result};
use crate::helpers::storage::is_store_relative;
use rusqlite::{params, Connection, Row};
use shared_types::{CallOutcome, CallRecord, LogCallRequest, RecordingStatus};
use std::path::Path;

const CALL_COLUMNS: &str = "id, contact_id, agent_id, outcome, notes, recording_path,
    recording_status, original_recording_name, renamed_at, created_at, updated_at";

fn call_from_row(row: &Row<'_>) -> rusqlite::Result<CallRecord> {
    let outcome: String = row.get(3)?;
    let recording_status: String = row.get(6)?;
    Ok(CallRecord {
        id: row.get(0)?,
        contact_id: row.get(1)?,
        agent_id: row.get(2)?,
        outcome: CallOutcome::parse(&outcome).unwrap_or(CallOutcome::Other),
        notes: row.get(4)?,
        recording_path: row.get(5)?,
        recording_status: RecordingStatus::parse(&recording_status)
            .unwrap_or(RecordingStatus::NoRecording),
        original_recording_name: row.get(7)?,
        renamed_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Appends an unqualified call attempt to the ledger.
pub fn insert_call(
    conn: &Connection,
    contact_id: i64,
    agent_id: i64,
    recording_path: Option<&str>,
    notes: Option<&str>,
    now: i64,
) -> Result<CallRecord> {
    let recording_path = recording_path.map(str::trim).filter(|p| !p.is_empty());
    if let Some(path) = recording_path.filter(|p| !is_store_relative(Path::new(p))) {
        return Err(LeadError::InvalidInput(format!(
            "recording path '{}' must be relative to the recording store",
            path
        )));
    }
    let recording_status = if recording_path.is_some() {
        RecordingStatus::Untreated
    } else {
        RecordingStatus::NoRecording
    };

    let id: i64 = conn.query_row(
        "INSERT INTO calls
         (contact_id, agent_id, outcome, notes, recording_path, recording_status,
          created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         RETURNING id",
        params![
            contact_id,
            agent_id,
            CallOutcome::Unqualified.as_str(),
            notes,
            recording_path,
            recording_status.as_str(),
            now,
        ],
        |row| row.get(0),
    )?;

    get_call(conn, id)
}

pub fn get_call(conn: &Connection, id: i64) -> Result<CallRecord> {
    conn.query_row(
        &format!("SELECT {} FROM calls WHERE id = ?1", CALL_COLUMNS),
        [id],
        call_from_row,
    )
    .or_not_found("call", id)
}

pub fn list_for_contact(conn: &Connection, contact_id: i64) -> Result<Vec<CallRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM calls WHERE contact_id = ?1 ORDER BY created_at ASC, id ASC",
        CALL_COLUMNS
    ))?;
    let calls = stmt
        .query_map([contact_id], call_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(calls)
}

/// Sets the outcome on a call. A call with a recording becomes `TREATED`.
/// `notes` only overwrite when given.
pub fn apply_outcome(
    conn: &Connection,
    call_id: i64,
    outcome: CallOutcome,
    notes: Option<&str>,
    now: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE calls
         SET outcome = ?1,
             notes = COALESCE(?2, notes),
             recording_status = CASE WHEN recording_path IS NULL
                                     THEN 'NO_RECORDING' ELSE 'TREATED' END,
             updated_at = ?3
         WHERE id = ?4",
        params![outcome.as_str(), notes, now, call_id],
    )?;
    Ok(())
}

/// Other recorded calls of a contact nobody has qualified yet.
pub fn untreated_siblings(
    conn: &Connection,
    contact_id: i64,
    exclude_call_id: i64,
) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM calls
         WHERE contact_id = ?1 AND id <> ?2
           AND recording_path IS NOT NULL
           AND recording_status = 'UNTREATED'
           AND outcome = 'UNQUALIFIED'
         ORDER BY created_at ASC, id ASC",
    )?;
    let ids = stmt
        .query_map(params![contact_id, exclude_call_id], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Everything the recording file name is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactContext {
    pub call_id: i64,
    pub recording_path: Option<String>,
    pub original_recording_name: Option<String>,
    pub outcome: CallOutcome,
    pub agent_name: String,
    pub company_name: Option<String>,
    pub phone: String,
    pub campaign_name: Option<String>,
}

pub fn artifact_context(conn: &Connection, call_id: i64) -> Result<ArtifactContext> {
    conn.query_row(
        "SELECT calls.id, calls.recording_path, calls.original_recording_name, calls.outcome,
                agents.name, contacts.company_name, contacts.phone, campaigns.name
         FROM calls
         JOIN agents ON agents.id = calls.agent_id
         JOIN contacts ON contacts.id = calls.contact_id
         LEFT JOIN campaigns ON campaigns.id = contacts.campaign_id
         WHERE calls.id = ?1",
        [call_id],
        |row| {
            let outcome: String = row.get(3)?;
            Ok(ArtifactContext {
                call_id: row.get(0)?,
                recording_path: row.get(1)?,
                original_recording_name: row.get(2)?,
                outcome: CallOutcome::parse(&outcome).unwrap_or(CallOutcome::Other),
                agent_name: row.get(4)?,
                company_name: row.get(5)?,
                phone: row.get(6)?,
                campaign_name: row.get(7)?,
            })
        },
    )
    .or_not_found("call", call_id)
}

/// Stores the new recording location. The first name a file ever had is kept.
pub fn record_rename(
    conn: &Connection,
    call_id: i64,
    new_path: &str,
    original_name: &str,
    now: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE calls
         SET recording_path = ?1,
             original_recording_name = COALESCE(original_recording_name, ?2),
             renamed_at = ?3,
             updated_at = ?3
         WHERE id = ?4",
        params![new_path, original_name, now, call_id],
    )?;
    Ok(())
}

pub async fn log_call(
    conn: AsyncDbConnection,
    request: &LogCallRequest,
    now: i64,
) -> Result<CallRecord> {
    let conn = conn.lock().await?;
    contacts::get_contact(&conn, request.contact_id)?;
    agents::get_agent(&conn, request.agent_id)?;
    insert_call(
        &conn,
        request.contact_id,
        request.agent_id,
        request.recording_path.as_deref(),
        request.notes.as_deref(),
        now,
    )
}

pub async fn list_calls(conn: AsyncDbConnection, contact_id: i64) -> Result<Vec<CallRecord>> {
    let conn = conn.lock().await?;
    contacts::get_contact(&conn, contact_id)?;
    list_for_contact(&conn, contact_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrations::run_migrations;
    use crate::database::source_databases;
    use shared_types::{AgentRole, CreateContactRequest};

    fn setup() -> (Connection, i64, i64) {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let db = source_databases::insert_source_database(&conn, "Leads", 0).unwrap();
        let campaign = source_databases::insert_campaign(&conn, db.id, "Solar 2026", 0).unwrap();
        let agent = agents::insert_agent(&conn, "Zoé", AgentRole::Agent, 0).unwrap();
        let request = CreateContactRequest {
            code: None,
            company_name: Some("Boulangerie Lefèvre".to_string()),
            contact_name: None,
            phone: "0600000000".to_string(),
            email: None,
            source_database_id: db.id,
            campaign_id: Some(campaign.id),
        };
        let contact = contacts::insert_contact(&conn, &request, 0).unwrap();
        (conn, contact.id, agent.id)
    }

    #[test]
    fn test_insert_sets_recording_status() {
        let (conn, contact, agent) = setup();
        let with = insert_call(&conn, contact, agent, Some("in/a.wav"), None, 1).unwrap();
        let without = insert_call(&conn, contact, agent, Some("  "), None, 2).unwrap();

        assert_eq!(with.recording_status, RecordingStatus::Untreated);
        assert_eq!(with.outcome, CallOutcome::Unqualified);
        assert_eq!(without.recording_status, RecordingStatus::NoRecording);
        assert!(without.recording_path.is_none());
    }

    #[test]
    fn test_insert_refuses_paths_outside_the_store() {
        let (conn, contact, agent) = setup();
        for path in ["../secret.txt", "/etc/passwd", "in/../../x.wav"] {
            assert!(matches!(
                insert_call(&conn, contact, agent, Some(path), None, 1),
                Err(LeadError::InvalidInput(_))
            ));
        }
        assert!(list_for_contact(&conn, contact).unwrap().is_empty());
    }

    #[test]
    fn test_apply_outcome_treats_recordings_only() {
        let (conn, contact, agent) = setup();
        let with = insert_call(&conn, contact, agent, Some("in/a.wav"), Some("first"), 1).unwrap();
        let without = insert_call(&conn, contact, agent, None, None, 2).unwrap();

        apply_outcome(&conn, with.id, CallOutcome::NotInterested, None, 3).unwrap();
        apply_outcome(&conn, without.id, CallOutcome::NotInterested, Some("late"), 3).unwrap();

        let with = get_call(&conn, with.id).unwrap();
        assert_eq!(with.recording_status, RecordingStatus::Treated);
        assert_eq!(with.notes.as_deref(), Some("first"));
        let without = get_call(&conn, without.id).unwrap();
        assert_eq!(without.recording_status, RecordingStatus::NoRecording);
        assert_eq!(without.notes.as_deref(), Some("late"));
    }

    #[test]
    fn test_untreated_siblings() {
        let (conn, contact, agent) = setup();
        let primary = insert_call(&conn, contact, agent, None, None, 1).unwrap();
        let recorded = insert_call(&conn, contact, agent, Some("in/b.wav"), None, 2).unwrap();
        let treated = insert_call(&conn, contact, agent, Some("in/c.wav"), None, 3).unwrap();
        insert_call(&conn, contact, agent, None, None, 4).unwrap();
        apply_outcome(&conn, treated.id, CallOutcome::Other, None, 5).unwrap();

        assert_eq!(untreated_siblings(&conn, contact, primary.id).unwrap(), vec![recorded.id]);
        assert!(untreated_siblings(&conn, contact, recorded.id).unwrap().is_empty());
    }

    #[test]
    fn test_artifact_context_and_rename_bookkeeping() {
        let (conn, contact, agent) = setup();
        let call = insert_call(&conn, contact, agent, Some("in/raw.wav"), None, 1).unwrap();

        let ctx = artifact_context(&conn, call.id).unwrap();
        assert_eq!(ctx.agent_name, "Zoé");
        assert_eq!(ctx.campaign_name.as_deref(), Some("Solar 2026"));

        record_rename(&conn, call.id, "treated/x.wav", "raw.wav", 9).unwrap();
        record_rename(&conn, call.id, "treated/y.wav", "x.wav", 10).unwrap();
        let stored = get_call(&conn, call.id).unwrap();
        assert_eq!(stored.recording_path.as_deref(), Some("treated/y.wav"));
        assert_eq!(stored.original_recording_name.as_deref(), Some("raw.wav"));
        assert_eq!(stored.renamed_at, Some(10));
    }
}
