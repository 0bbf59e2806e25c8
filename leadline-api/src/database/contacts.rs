use crate::database::AsyncDbConnection;
use crate::error::{LeadError, OrNotFound, Result};
use rusqlite::{params, Connection, Row, ToSql};
use shared_types::{Contact, ContactStatus, CreateContactRequest, DispatchState, ListContactsQuery};

const CONTACT_COLUMNS: &str = "c.id, c.code, c.company_name, c.contact_name, c.phone, c.email,
    c.status, c.assigned_agent_id, c.next_call_date, c.source_database_id, c.campaign_id,
    c.claimed_at, c.created_at, c.updated_at";

/// Contacts must be on an active source database to be handed out from a pool.
const ACTIVE_SOURCE_JOIN: &str =
    "JOIN source_databases sd ON sd.id = c.source_database_id AND sd.is_active = true";

/// Restricts a query to contacts inside the assignment set of agent `?1`.
const IN_AGENT_SCOPE: &str = "EXISTS (
    SELECT 1 FROM agent_assignments a
    WHERE a.agent_id = ?1 AND a.is_active = true
      AND a.source_database_id = c.source_database_id
      AND (a.campaign_id IS NULL OR a.campaign_id = c.campaign_id))";

fn parse_status(raw: &str) -> ContactStatus {
    ContactStatus::parse(raw).unwrap_or_else(|| {
        tracing::warn!("Unknown contact status '{}' in store, treating as NEW", raw);
        ContactStatus::New
    })
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    let status: String = row.get(6)?;
    Ok(Contact {
        id: row.get(0)?,
        code: row.get(1)?,
        company_name: row.get(2)?,
        contact_name: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        status: parse_status(&status),
        assigned_agent_id: row.get(7)?,
        next_call_date: row.get(8)?,
        source_database_id: row.get(9)?,
        campaign_id: row.get(10)?,
        claimed_at: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// SQL literal list for a set of statuses. Only ever fed our own constants.
fn status_list(statuses: &[ContactStatus]) -> String {
    statuses
        .iter()
        .map(|status| format!("'{}'", status.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every status whose dispatch state satisfies `class`.
fn statuses_in(class: fn(&DispatchState) -> bool) -> Vec<ContactStatus> {
    ContactStatus::ALL
        .into_iter()
        .filter(|status| class(&status.dispatch_state(None)))
        .collect()
}

fn generate_code() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("C-{}", raw[..10].to_uppercase())
}

pub fn insert_contact(
    conn: &Connection,
    request: &CreateContactRequest,
    now: i64,
) -> Result<Contact> {
    let phone = request.phone.trim();
    if phone.is_empty() {
        return Err(LeadError::InvalidInput("contact phone is empty".to_string()));
    }

    let code = match request.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => generate_code(),
    };

    let id: i64 = conn.query_row(
        "INSERT INTO contacts
         (code, company_name, contact_name, phone, email, status, source_database_id,
          campaign_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'NEW', ?6, ?7, ?8, ?8)
         RETURNING id",
        params![
            &code,
            request.company_name.as_ref(),
            request.contact_name.as_ref(),
            phone,
            request.email.as_ref(),
            request.source_database_id,
            request.campaign_id,
            now,
        ],
        |row| row.get(0),
    )?;

    get_contact(conn, id)
}

pub fn get_contact(conn: &Connection, id: i64) -> Result<Contact> {
    conn.query_row(
        &format!("SELECT {} FROM contacts c WHERE c.id = ?1", CONTACT_COLUMNS),
        [id],
        contact_from_row,
    )
    .or_not_found("contact", id)
}

pub fn list_contacts(conn: &Connection, query: &ListContactsQuery) -> Result<Vec<Contact>> {
    let status = query.status.as_deref().map(ContactStatus::parse);
    if let Some(None) = status {
        return Ok(Vec::new());
    }
    let status = status.flatten().map(|s| s.as_str());
    let limit = query.limit.unwrap_or(100).min(1000) as i64;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM contacts c
         WHERE (?1 IS NULL OR c.status = ?1)
           AND (?2 IS NULL OR c.assigned_agent_id = ?2)
         ORDER BY c.created_at DESC, c.id DESC
         LIMIT ?3",
        CONTACT_COLUMNS
    ))?;

    let contacts = stmt
        .query_map(params![status, query.assigned_agent_id, limit], contact_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(contacts)
}

/// A contact a dispatch tier would hand out, with the state it was read in.
/// Claiming compares against exactly this state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: i64,
    pub status: ContactStatus,
    pub assigned_agent_id: Option<i64>,
    /// Set for recycling candidates: the contact must still be idle since before this.
    pub stale_before: Option<i64>,
}

fn query_candidates(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
    stale_before: Option<i64>,
) -> Result<Vec<Candidate>> {
    let mut stmt = conn.prepare(sql)?;
    let candidates = stmt
        .query_map(params, |row| {
            let status: String = row.get(1)?;
            Ok(Candidate {
                id: row.get(0)?,
                status: parse_status(&status),
                assigned_agent_id: row.get(2)?,
                stale_before,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(candidates)
}

/// Callbacks and follow-ups owned by the agent that are due, most overdue first.
pub fn due_callbacks(
    conn: &Connection,
    agent_id: i64,
    now: i64,
    limit: usize,
) -> Result<Vec<Candidate>> {
    let sql = format!(
        "SELECT c.id, c.status, c.assigned_agent_id FROM contacts c
         WHERE c.assigned_agent_id = ?1
           AND c.status IN ({})
           AND c.next_call_date IS NOT NULL AND c.next_call_date <= ?2
         ORDER BY c.next_call_date ASC, c.id ASC
         LIMIT ?3",
        status_list(&statuses_in(|state| {
            matches!(state, DispatchState::CallbackPending { .. })
        }))
    );
    query_candidates(conn, &sql, &[&agent_id, &now, &(limit as i64)], None)
}

pub fn owned_new(conn: &Connection, agent_id: i64, limit: usize) -> Result<Vec<Candidate>> {
    query_candidates(
        conn,
        "SELECT c.id, c.status, c.assigned_agent_id FROM contacts c
         WHERE c.assigned_agent_id = ?1 AND c.status = 'NEW'
         ORDER BY c.created_at ASC, c.id ASC
         LIMIT ?2",
        &[&agent_id, &(limit as i64)],
        None,
    )
}

pub fn unowned_new_in_scope(
    conn: &Connection,
    agent_id: i64,
    limit: usize,
) -> Result<Vec<Candidate>> {
    let sql = format!(
        "SELECT c.id, c.status, c.assigned_agent_id FROM contacts c
         {}
         WHERE c.assigned_agent_id IS NULL AND c.status = 'NEW' AND {}
         ORDER BY c.created_at ASC, c.id ASC
         LIMIT ?2",
        ACTIVE_SOURCE_JOIN, IN_AGENT_SCOPE
    );
    query_candidates(conn, &sql, &[&agent_id, &(limit as i64)], None)
}

pub fn unowned_new_anywhere(conn: &Connection, limit: usize) -> Result<Vec<Candidate>> {
    let sql = format!(
        "SELECT c.id, c.status, c.assigned_agent_id FROM contacts c
         {}
         WHERE c.assigned_agent_id IS NULL AND c.status = 'NEW'
         ORDER BY c.created_at ASC, c.id ASC
         LIMIT ?1",
        ACTIVE_SOURCE_JOIN
    );
    query_candidates(conn, &sql, &[&(limit as i64)], None)
}

/// The agent's own unresolved contacts in a database that went idle before `cutoff`.
pub fn stale_owned(
    conn: &Connection,
    agent_id: i64,
    source_database_id: i64,
    statuses: &[ContactStatus],
    cutoff: i64,
    limit: usize,
) -> Result<Vec<Candidate>> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT c.id, c.status, c.assigned_agent_id FROM contacts c
         WHERE c.assigned_agent_id = ?1 AND c.source_database_id = ?2
           AND c.status IN ({}) AND c.updated_at < ?3
         ORDER BY c.updated_at ASC, c.id ASC
         LIMIT ?4",
        status_list(statuses)
    );
    query_candidates(
        conn,
        &sql,
        &[&agent_id, &source_database_id, &cutoff, &(limit as i64)],
        Some(cutoff),
    )
}

/// Unowned idle contacts in a database; `scope_agent` narrows to that
/// agent's campaigns.
pub fn stale_unowned(
    conn: &Connection,
    scope_agent: Option<i64>,
    source_database_id: i64,
    statuses: &[ContactStatus],
    cutoff: i64,
    limit: usize,
) -> Result<Vec<Candidate>> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let scope_clause = if scope_agent.is_some() {
        IN_AGENT_SCOPE
    } else {
        "?1 IS NULL"
    };
    let sql = format!(
        "SELECT c.id, c.status, c.assigned_agent_id FROM contacts c
         {}
         WHERE c.assigned_agent_id IS NULL AND c.source_database_id = ?2
           AND c.status IN ({}) AND c.updated_at < ?3 AND {}
         ORDER BY c.updated_at ASC, c.id ASC
         LIMIT ?4",
        ACTIVE_SOURCE_JOIN,
        status_list(statuses),
        scope_clause
    );
    query_candidates(
        conn,
        &sql,
        &[&scope_agent, &source_database_id, &cutoff, &(limit as i64)],
        Some(cutoff),
    )
}

/// Atomically hands `candidate` to `agent_id`.
///
/// One conditional UPDATE: succeeds only if owner, status and (for recycling)
/// idleness are still what the candidate was read with. `Ok(false)` means
/// another writer got there first.
pub fn try_claim(
    conn: &Connection,
    candidate: &Candidate,
    agent_id: i64,
    now: i64,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE contacts
         SET claimed_at = CASE WHEN assigned_agent_id IS ?1 THEN claimed_at ELSE ?2 END,
             assigned_agent_id = ?1
         WHERE id = ?3
           AND status = ?4
           AND assigned_agent_id IS ?5
           AND (?6 IS NULL OR updated_at < ?6)",
        params![
            agent_id,
            now,
            candidate.id,
            candidate.status.as_str(),
            candidate.assigned_agent_id,
            candidate.stale_before,
        ],
    )?;
    Ok(changed == 1)
}

/// Writes a qualification onto the contact. A non-callback status always
/// clears the next call date.
pub fn apply_qualification(
    conn: &Connection,
    contact_id: i64,
    status: ContactStatus,
    next_call_date: Option<i64>,
    new_owner: Option<i64>,
    now: i64,
) -> Result<()> {
    let next_call_date = match status.dispatch_state(next_call_date) {
        DispatchState::CallbackPending { due } => due,
        _ => None,
    };

    let changed = conn.execute(
        "UPDATE contacts
         SET status = ?1,
             next_call_date = ?2,
             assigned_agent_id = COALESCE(?3, assigned_agent_id),
             updated_at = ?4
         WHERE id = ?5",
        params![status.as_str(), next_call_date, new_owner, now, contact_id],
    )?;
    if changed == 0 {
        return Err(LeadError::not_found("contact", contact_id));
    }
    Ok(())
}

/// Statuses an administrative recycle puts back to `NEW`.
pub fn resettable_statuses() -> Vec<ContactStatus> {
    statuses_in(|state| {
        matches!(state, DispatchState::Fresh | DispatchState::Recyclable { .. })
    })
}

/// Returns every non-terminal, non-callback contact of a database to the
/// unowned `NEW` pool. Returns the ids that were reset.
pub fn reset_for_recycling(
    conn: &Connection,
    source_database_id: i64,
    now: i64,
) -> Result<Vec<i64>> {
    let sql = format!(
        "UPDATE contacts
         SET status = 'NEW', assigned_agent_id = NULL, next_call_date = NULL,
             claimed_at = NULL, updated_at = ?1
         WHERE source_database_id = ?2 AND status IN ({})
         RETURNING id",
        status_list(&resettable_statuses())
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map(params![now, source_database_id], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Removes a contact and its call ledger. Returns how many of the removed
/// calls referenced a recording.
pub fn delete_contact(conn: &Connection, contact_id: i64) -> Result<usize> {
    get_contact(conn, contact_id)?;
    let recordings: usize = conn.query_row(
        "SELECT COUNT(*) FROM calls WHERE contact_id = ?1 AND recording_path IS NOT NULL",
        [contact_id],
        |row| row.get::<_, i64>(0),
    )? as usize;
    conn.execute("DELETE FROM calls WHERE contact_id = ?1", [contact_id])?;
    conn.execute("DELETE FROM contacts WHERE id = ?1", [contact_id])?;
    Ok(recordings)
}

pub async fn list(conn: AsyncDbConnection, query: &ListContactsQuery) -> Result<Vec<Contact>> {
    let conn = conn.lock().await?;
    list_contacts(&conn, query)
}

pub async fn fetch(conn: AsyncDbConnection, id: i64) -> Result<Contact> {
    let conn = conn.lock().await?;
    get_contact(&conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrations::run_migrations;
    use crate::database::{agents, source_databases};
    use shared_types::AgentRole;

    fn setup() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let db = source_databases::insert_source_database(&conn, "Leads", 0).unwrap();
        agents::insert_agent(&conn, "Alice", AgentRole::Agent, 0).unwrap();
        agents::insert_agent(&conn, "Bob", AgentRole::Agent, 0).unwrap();
        (conn, db.id)
    }

    fn new_contact(conn: &Connection, db: i64, now: i64) -> Contact {
        let request = CreateContactRequest {
            code: None,
            company_name: Some("Acme".to_string()),
            contact_name: None,
            phone: "+33100000000".to_string(),
            email: None,
            source_database_id: db,
            campaign_id: None,
        };
        insert_contact(conn, &request, now).unwrap()
    }

    #[test]
    fn test_insert_generates_unique_codes() {
        let (conn, db) = setup();
        let a = new_contact(&conn, db, 10);
        let b = new_contact(&conn, db, 10);
        assert_eq!(a.status, ContactStatus::New);
        assert!(a.assigned_agent_id.is_none());
        assert!(a.code.starts_with("C-"));
        assert_ne!(a.code, b.code);
    }

    #[test]
    fn test_second_claim_on_same_read_loses() {
        let (conn, db) = setup();
        let contact = new_contact(&conn, db, 10);

        let candidates = unowned_new_anywhere(&conn, 5).unwrap();
        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];

        assert!(try_claim(&conn, candidate, 1, 20).unwrap());
        assert!(!try_claim(&conn, candidate, 2, 21).unwrap());

        let stored = get_contact(&conn, contact.id).unwrap();
        assert_eq!(stored.assigned_agent_id, Some(1));
        assert_eq!(stored.claimed_at, Some(20));
    }

    #[test]
    fn test_claim_fails_when_status_moved_on() {
        let (conn, db) = setup();
        let contact = new_contact(&conn, db, 10);
        let candidate = unowned_new_anywhere(&conn, 5).unwrap().remove(0);

        apply_qualification(&conn, contact.id, ContactStatus::NotInterested, None, None, 15)
            .unwrap();
        assert!(!try_claim(&conn, &candidate, 1, 20).unwrap());
    }

    #[test]
    fn test_reconfirming_own_contact_keeps_claim_time() {
        let (conn, db) = setup();
        new_contact(&conn, db, 10);
        let candidate = unowned_new_anywhere(&conn, 5).unwrap().remove(0);
        assert!(try_claim(&conn, &candidate, 1, 20).unwrap());

        let owned = owned_new(&conn, 1, 5).unwrap().remove(0);
        assert!(try_claim(&conn, &owned, 1, 30).unwrap());
        assert_eq!(get_contact(&conn, owned.id).unwrap().claimed_at, Some(20));
    }

    #[test]
    fn test_apply_qualification_clears_date_for_non_callback() {
        let (conn, db) = setup();
        let contact = new_contact(&conn, db, 10);

        apply_qualification(&conn, contact.id, ContactStatus::FollowUp, Some(500), Some(2), 20)
            .unwrap();
        let stored = get_contact(&conn, contact.id).unwrap();
        assert_eq!(stored.next_call_date, Some(500));
        assert_eq!(stored.assigned_agent_id, Some(2));

        apply_qualification(&conn, contact.id, ContactStatus::Nrp, Some(900), None, 30).unwrap();
        let stored = get_contact(&conn, contact.id).unwrap();
        assert_eq!(stored.next_call_date, None);
        assert_eq!(stored.assigned_agent_id, Some(2));
        assert_eq!(stored.updated_at, 30);
    }

    #[test]
    fn test_reset_skips_terminal_and_callbacks() {
        let (conn, db) = setup();
        let nrp = new_contact(&conn, db, 10);
        let callback = new_contact(&conn, db, 10);
        let done = new_contact(&conn, db, 10);

        apply_qualification(&conn, nrp.id, ContactStatus::Nrp, None, Some(1), 20).unwrap();
        let callback_status = ContactStatus::CallbackLater;
        apply_qualification(&conn, callback.id, callback_status, Some(99), Some(1), 20).unwrap();
        let done_status = ContactStatus::AppointmentTaken;
        apply_qualification(&conn, done.id, done_status, None, Some(1), 20).unwrap();

        let reset = reset_for_recycling(&conn, db, 30).unwrap();
        assert_eq!(reset, vec![nrp.id]);

        let stored = get_contact(&conn, nrp.id).unwrap();
        assert_eq!(stored.status, ContactStatus::New);
        assert!(stored.assigned_agent_id.is_none());
        assert_eq!(get_contact(&conn, callback.id).unwrap().status, ContactStatus::CallbackLater);
        assert_eq!(get_contact(&conn, done.id).unwrap().status, ContactStatus::AppointmentTaken);
    }

    #[test]
    fn test_resettable_statuses() {
        let statuses = resettable_statuses();
        assert!(statuses.contains(&ContactStatus::New));
        assert!(statuses.contains(&ContactStatus::Unreachable));
        assert!(!statuses.contains(&ContactStatus::FollowUp));
        assert!(!statuses.contains(&ContactStatus::WrongNumber));
        assert_eq!(statuses.len(), 5);
    }

    #[test]
    fn test_stale_cutoff_is_exclusive() {
        let (conn, db) = setup();
        let at_cutoff = new_contact(&conn, db, 10);
        let before = new_contact(&conn, db, 10);
        apply_qualification(&conn, at_cutoff.id, ContactStatus::Nrp, None, Some(1), 100).unwrap();
        apply_qualification(&conn, before.id, ContactStatus::Nrp, None, Some(1), 99).unwrap();

        let stale = stale_owned(&conn, 1, db, &[ContactStatus::Nrp], 100, 10).unwrap();
        assert_eq!(stale.iter().map(|c| c.id).collect::<Vec<_>>(), vec![before.id]);
        assert_eq!(stale[0].stale_before, Some(100));
    }

    #[test]
    fn test_delete_removes_calls() {
        let (conn, db) = setup();
        let contact = new_contact(&conn, db, 10);
        conn.execute(
            "INSERT INTO calls
             (contact_id, agent_id, recording_path, recording_status, created_at, updated_at)
             VALUES (?1, 1, 'in/a.wav', 'UNTREATED', 11, 11)",
            [contact.id],
        )
        .unwrap();

        assert_eq!(delete_contact(&conn, contact.id).unwrap(), 1);
        assert!(matches!(
            get_contact(&conn, contact.id),
            Err(LeadError::NotFound { .. })
        ));
        assert!(matches!(
            delete_contact(&conn, contact.id),
            Err(LeadError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_filters_by_status() {
        let (conn, db) = setup();
        let a = new_contact(&conn, db, 10);
        new_contact(&conn, db, 11);
        apply_qualification(&conn, a.id, ContactStatus::Absent, None, None, 20).unwrap();

        let query = ListContactsQuery {
            status: Some("absent".to_string()),
            ..Default::default()
        };
        let listed = list_contacts(&conn, &query).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a.id);

        let bogus = ListContactsQuery {
            status: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(list_contacts(&conn, &bogus).unwrap().is_empty());
    }
}
