use crate::database::AsyncDbConnection;
use crate::error::{LeadError, OrNotFound, Result};
use rusqlite::{params, Connection};
use shared_types::{Campaign, CreateCampaignRequest, CreateSourceDatabaseRequest, SourceDatabase};

pub fn insert_source_database(conn: &Connection, name: &str, now: i64) -> Result<SourceDatabase> {
    let id: i64 = conn.query_row(
        "INSERT INTO source_databases (name, is_active, created_at)
         VALUES (?1, true, ?2)
         RETURNING id",
        params![name, now],
        |row| row.get(0),
    )?;

    Ok(SourceDatabase {
        id,
        name: name.to_string(),
        is_active: true,
        created_at: now,
    })
}

pub fn get_source_database(conn: &Connection, id: i64) -> Result<SourceDatabase> {
    conn.query_row(
        "SELECT id, name, is_active, created_at FROM source_databases WHERE id = ?1",
        [id],
        |row| {
            Ok(SourceDatabase {
                id: row.get(0)?,
                name: row.get(1)?,
                is_active: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .or_not_found("source database", id)
}

pub fn set_active(conn: &Connection, id: i64, is_active: bool) -> Result<()> {
    let changed = conn.execute(
        "UPDATE source_databases SET is_active = ?1 WHERE id = ?2",
        params![is_active, id],
    )?;
    if changed == 0 {
        return Err(LeadError::not_found("source database", id));
    }
    Ok(())
}

/// Active databases, for agents whose scope is the whole system.
pub fn list_active_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT id FROM source_databases WHERE is_active = true ORDER BY id ASC")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Source database a campaign belongs to.
pub fn campaign_source(conn: &Connection, campaign_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT source_database_id FROM campaigns WHERE id = ?1",
        [campaign_id],
        |row| row.get(0),
    )
    .or_not_found("campaign", campaign_id)
}

/// Checks that a database exists and, when given, that the campaign is one of its own.
pub fn ensure_provenance(
    conn: &Connection,
    source_database_id: i64,
    campaign_id: Option<i64>,
) -> Result<()> {
    get_source_database(conn, source_database_id)?;
    if let Some(campaign_id) = campaign_id {
        if campaign_source(conn, campaign_id)? != source_database_id {
            return Err(LeadError::InvalidInput(format!(
                "campaign {} does not belong to source database {}",
                campaign_id, source_database_id
            )));
        }
    }
    Ok(())
}

pub fn insert_campaign(
    conn: &Connection,
    source_database_id: i64,
    name: &str,
    now: i64,
) -> Result<Campaign> {
    get_source_database(conn, source_database_id)?;

    let id: i64 = conn.query_row(
        "INSERT INTO campaigns (source_database_id, name, created_at)
         VALUES (?1, ?2, ?3)
         RETURNING id",
        params![source_database_id, name, now],
        |row| row.get(0),
    )?;

    Ok(Campaign {
        id,
        source_database_id,
        name: name.to_string(),
        created_at: now,
    })
}

pub async fn create_source_database(
    conn: AsyncDbConnection,
    request: &CreateSourceDatabaseRequest,
    now: i64,
) -> Result<SourceDatabase> {
    let conn = conn.lock().await?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(LeadError::InvalidInput("source database name is empty".to_string()));
    }
    insert_source_database(&conn, name, now)
}

pub async fn create_campaign(
    conn: AsyncDbConnection,
    request: &CreateCampaignRequest,
    now: i64,
) -> Result<Campaign> {
    let conn = conn.lock().await?;
    insert_campaign(&conn, request.source_database_id, request.name.trim(), now)
}
