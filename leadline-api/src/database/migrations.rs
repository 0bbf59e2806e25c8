use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS agents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name VARCHAR NOT NULL,
            role VARCHAR NOT NULL DEFAULT 'AGENT' CHECK (role IN ('AGENT', 'SUPERVISOR', 'ADMIN')),
            is_active BOOLEAN NOT NULL DEFAULT true,
            created_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS source_databases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name VARCHAR NOT NULL UNIQUE,
            is_active BOOLEAN NOT NULL DEFAULT true,
            created_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS campaigns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_database_id INTEGER NOT NULL,
            name VARCHAR NOT NULL,
            created_at BIGINT NOT NULL,
            FOREIGN KEY (source_database_id) REFERENCES source_databases (id)
        )",
        [],
    )?;

    // A NULL campaign grants the whole source database
    conn.execute(
        "CREATE TABLE IF NOT EXISTS agent_assignments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            agent_id INTEGER NOT NULL,
            source_database_id INTEGER NOT NULL,
            campaign_id INTEGER,
            is_active BOOLEAN NOT NULL DEFAULT true,
            created_at BIGINT NOT NULL,
            FOREIGN KEY (agent_id) REFERENCES agents (id),
            FOREIGN KEY (source_database_id) REFERENCES source_databases (id),
            FOREIGN KEY (campaign_id) REFERENCES campaigns (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_agent_assignments_agent
            ON agent_assignments(agent_id, is_active)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code VARCHAR NOT NULL UNIQUE,
            company_name VARCHAR,
            contact_name VARCHAR,
            phone VARCHAR NOT NULL,
            email VARCHAR,
            status VARCHAR NOT NULL DEFAULT 'NEW',
            assigned_agent_id INTEGER,
            next_call_date BIGINT,
            source_database_id INTEGER NOT NULL,
            campaign_id INTEGER,
            claimed_at BIGINT,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (assigned_agent_id) REFERENCES agents (id),
            FOREIGN KEY (source_database_id) REFERENCES source_databases (id),
            FOREIGN KEY (campaign_id) REFERENCES campaigns (id)
        )",
        [],
    )?;

    // Indexes backing the dispatch tiers
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contacts_owner_status
            ON contacts(assigned_agent_id, status, next_call_date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contacts_pool
            ON contacts(source_database_id, status, created_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contacts_staleness
            ON contacts(source_database_id, status, updated_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS calls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contact_id INTEGER NOT NULL,
            agent_id INTEGER NOT NULL,
            outcome VARCHAR NOT NULL DEFAULT 'UNQUALIFIED',
            notes VARCHAR,
            recording_path VARCHAR,
            recording_status VARCHAR NOT NULL DEFAULT 'NO_RECORDING'
                CHECK (recording_status IN ('NO_RECORDING', 'UNTREATED', 'TREATED')),
            original_recording_name VARCHAR,
            renamed_at BIGINT,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            CHECK (recording_status <> 'TREATED' OR outcome <> 'UNQUALIFIED'),
            FOREIGN KEY (contact_id) REFERENCES contacts (id),
            FOREIGN KEY (agent_id) REFERENCES agents (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_calls_contact
            ON calls(contact_id, recording_status)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS recycle_policies (
            source_database_id INTEGER PRIMARY KEY,
            enabled BOOLEAN NOT NULL DEFAULT false,
            delay_minutes BIGINT NOT NULL DEFAULT 0,
            recycle_nrp BOOLEAN NOT NULL DEFAULT false,
            recycle_answering_machine BOOLEAN NOT NULL DEFAULT false,
            recycle_absent BOOLEAN NOT NULL DEFAULT false,
            recycle_unreachable BOOLEAN NOT NULL DEFAULT false,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (source_database_id) REFERENCES source_databases (id)
        )",
        [],
    )?;

    Ok(())
}
