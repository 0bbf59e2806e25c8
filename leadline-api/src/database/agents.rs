use crate::database::{source_databases, AsyncDbConnection};
use crate::error::{LeadError, OrNotFound, Result};
use rusqlite::{params, Connection, Row};
use shared_types::{Agent, AgentAssignment, AgentRole, CreateAgentRequest, CreateAssignmentRequest};

/// The part of the contact pool an agent may draw from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentScope {
    pub unrestricted: bool,
    pub assignments: Vec<AgentAssignment>,
}

impl AgentScope {
    /// Agents with no assignments fall back to the system-wide pool.
    pub fn uses_open_pool(&self) -> bool {
        self.unrestricted || self.assignments.is_empty()
    }

    /// Assigned source databases, deduplicated, in assignment order.
    pub fn source_database_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        for assignment in &self.assignments {
            if !ids.contains(&assignment.source_database_id) {
                ids.push(assignment.source_database_id);
            }
        }
        ids
    }
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    let role: String = row.get(2)?;
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        role: AgentRole::parse(&role).unwrap_or(AgentRole::Agent),
        is_active: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn insert_agent(conn: &Connection, name: &str, role: AgentRole, now: i64) -> Result<Agent> {
    let id: i64 = conn.query_row(
        "INSERT INTO agents (name, role, is_active, created_at)
         VALUES (?1, ?2, true, ?3)
         RETURNING id",
        params![name, role.as_str(), now],
        |row| row.get(0),
    )?;

    Ok(Agent {
        id,
        name: name.to_string(),
        role,
        is_active: true,
        created_at: now,
    })
}

pub fn get_agent(conn: &Connection, id: i64) -> Result<Agent> {
    conn.query_row(
        "SELECT id, name, role, is_active, created_at FROM agents WHERE id = ?1",
        [id],
        agent_from_row,
    )
    .or_not_found("agent", id)
}

pub fn insert_assignment(
    conn: &Connection,
    agent_id: i64,
    source_database_id: i64,
    campaign_id: Option<i64>,
    now: i64,
) -> Result<AgentAssignment> {
    get_agent(conn, agent_id)?;
    source_databases::ensure_provenance(conn, source_database_id, campaign_id)?;

    conn.execute(
        "INSERT INTO agent_assignments
         (agent_id, source_database_id, campaign_id, is_active, created_at)
         VALUES (?1, ?2, ?3, true, ?4)",
        params![agent_id, source_database_id, campaign_id, now],
    )?;

    Ok(AgentAssignment {
        agent_id,
        source_database_id,
        campaign_id,
    })
}

pub fn load_scope(conn: &Connection, agent: &Agent) -> Result<AgentScope> {
    let mut stmt = conn.prepare(
        "SELECT agent_id, source_database_id, campaign_id
         FROM agent_assignments
         WHERE agent_id = ?1 AND is_active = true
         ORDER BY id ASC",
    )?;

    let assignments = stmt
        .query_map([agent.id], |row| {
            Ok(AgentAssignment {
                agent_id: row.get(0)?,
                source_database_id: row.get(1)?,
                campaign_id: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(AgentScope {
        unrestricted: agent.role.is_unrestricted(),
        assignments,
    })
}

pub async fn create_agent(
    conn: AsyncDbConnection,
    request: &CreateAgentRequest,
    now: i64,
) -> Result<Agent> {
    let conn = conn.lock().await?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(LeadError::InvalidInput("agent name is empty".to_string()));
    }
    insert_agent(&conn, name, request.role.unwrap_or(AgentRole::Agent), now)
}

pub async fn create_assignment(
    conn: AsyncDbConnection,
    agent_id: i64,
    request: &CreateAssignmentRequest,
    now: i64,
) -> Result<AgentAssignment> {
    let conn = conn.lock().await?;
    insert_assignment(
        &conn,
        agent_id,
        request.source_database_id,
        request.campaign_id,
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_scope_for_plain_agent() {
        let conn = setup();
        let db_a = source_databases::insert_source_database(&conn, "A", 0).unwrap();
        let db_b = source_databases::insert_source_database(&conn, "B", 0).unwrap();
        let agent = insert_agent(&conn, "Alice", AgentRole::Agent, 0).unwrap();

        insert_assignment(&conn, agent.id, db_b.id, None, 0).unwrap();
        insert_assignment(&conn, agent.id, db_a.id, None, 0).unwrap();
        insert_assignment(&conn, agent.id, db_b.id, None, 0).unwrap();

        let scope = load_scope(&conn, &agent).unwrap();
        assert!(!scope.unrestricted);
        assert!(!scope.uses_open_pool());
        assert_eq!(scope.source_database_ids(), vec![db_b.id, db_a.id]);
    }

    #[test]
    fn test_admin_is_unrestricted() {
        let conn = setup();
        let admin = insert_agent(&conn, "Root", AgentRole::Admin, 0).unwrap();
        let scope = load_scope(&conn, &admin).unwrap();
        assert!(scope.unrestricted);
        assert!(scope.uses_open_pool());
    }

    #[test]
    fn test_assignment_rejects_foreign_campaign() {
        let conn = setup();
        let db_a = source_databases::insert_source_database(&conn, "A", 0).unwrap();
        let db_b = source_databases::insert_source_database(&conn, "B", 0).unwrap();
        let campaign = source_databases::insert_campaign(&conn, db_b.id, "Spring", 0).unwrap();
        let agent = insert_agent(&conn, "Alice", AgentRole::Agent, 0).unwrap();

        let result = insert_assignment(&conn, agent.id, db_a.id, Some(campaign.id), 0);
        assert!(matches!(result, Err(LeadError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_agent() {
        let conn = setup();
        assert!(matches!(
            get_agent(&conn, 99),
            Err(LeadError::NotFound { entity: "agent", id: 99 })
        ));
    }
}
