//! Seeded engine over a throwaway database and recording store.

use crate::config::ApiConfig;
use crate::database::{agents, calls, contacts, source_databases, AsyncDbConnection, Database};
use crate::engine::Engine;
use crate::helpers::audit::{AuditAction, AuditEntry, AuditSink};
use crate::helpers::clock::{Clock, ManualClock};
use crate::helpers::notifier::Notifier;
use crate::helpers::storage::{ArtifactStorage, LocalStorage};
use chrono::{DateTime, Duration};
use rusqlite::params;
use shared_types::{
    Agent, AgentRole, CallOutcome, CallRecord, Campaign, Contact, ContactNotice, ContactStatus,
    CreateContactRequest, SourceDatabase,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// 2026-10-01T09:00:00Z
const START: i64 = 1_790_845_200;

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<ContactNotice>>,
}

impl RecordingNotifier {
    pub fn take(&self) -> Vec<ContactNotice> {
        std::mem::take(&mut *self.notices.lock().unwrap())
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, notice: ContactNotice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn actions(&self) -> Vec<AuditAction> {
        self.entries.lock().unwrap().iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

pub struct TestEnv {
    _dir: TempDir,
    pub db: Arc<Database>,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<LocalStorage>,
    pub notices: Arc<RecordingNotifier>,
    pub audit: Arc<MemoryAuditSink>,
    pub engine: Arc<Engine>,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::new(&dir.path().join("leadline.db"), 16).unwrap());
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(START, 0).unwrap()));
        let storage = Arc::new(LocalStorage::new(dir.path().join("recordings")));
        let notices = Arc::new(RecordingNotifier::default());
        let audit = Arc::new(MemoryAuditSink::default());

        let engine = Engine::new(
            db.async_connection.clone(),
            &ApiConfig::default(),
            clock.clone(),
            storage.clone(),
            notices.clone(),
            audit.clone(),
        );

        Self {
            _dir: dir,
            db,
            clock,
            storage,
            notices,
            audit,
            engine: Arc::new(engine),
        }
    }

    fn conn(&self) -> AsyncDbConnection {
        self.db.async_connection.clone()
    }

    pub fn now(&self) -> i64 {
        self.clock.timestamp()
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }

    pub async fn agent(&self, name: &str) -> Agent {
        self.agent_with_role(name, AgentRole::Agent).await
    }

    pub async fn agent_with_role(&self, name: &str, role: AgentRole) -> Agent {
        let conn = self.conn().lock().await.unwrap();
        agents::insert_agent(&conn, name, role, self.now()).unwrap()
    }

    pub async fn source_database(&self, name: &str) -> SourceDatabase {
        let conn = self.conn().lock().await.unwrap();
        source_databases::insert_source_database(&conn, name, self.now()).unwrap()
    }

    pub async fn campaign(&self, source_database_id: i64, name: &str) -> Campaign {
        let conn = self.conn().lock().await.unwrap();
        source_databases::insert_campaign(&conn, source_database_id, name, self.now()).unwrap()
    }

    pub async fn assign(&self, agent_id: i64, source_database_id: i64, campaign_id: Option<i64>) {
        let conn = self.conn().lock().await.unwrap();
        agents::insert_assignment(&conn, agent_id, source_database_id, campaign_id, self.now())
            .unwrap();
    }

    pub async fn contact(
        &self,
        source_database_id: i64,
        campaign_id: Option<i64>,
        company: &str,
    ) -> Contact {
        let request = CreateContactRequest {
            code: None,
            company_name: Some(company.to_string()),
            contact_name: None,
            phone: "+33100000000".to_string(),
            email: None,
            source_database_id,
            campaign_id,
        };
        let conn = self.conn().lock().await.unwrap();
        contacts::insert_contact(&conn, &request, self.now()).unwrap()
    }

    /// Puts a contact in an arbitrary state, bypassing the engine.
    pub async fn set_state(
        &self,
        contact_id: i64,
        status: ContactStatus,
        next_call_date: Option<i64>,
        owner: Option<i64>,
        updated_at: i64,
    ) {
        let conn = self.conn().lock().await.unwrap();
        conn.execute(
            "UPDATE contacts
             SET status = ?1, next_call_date = ?2, assigned_agent_id = ?3, updated_at = ?4
             WHERE id = ?5",
            params![status.as_str(), next_call_date, owner, updated_at, contact_id],
        )
        .unwrap();
    }

    pub async fn fetch(&self, contact_id: i64) -> Contact {
        let conn = self.conn().lock().await.unwrap();
        contacts::get_contact(&conn, contact_id).unwrap()
    }

    pub async fn call(
        &self,
        contact_id: i64,
        agent_id: i64,
        recording: Option<&str>,
    ) -> CallRecord {
        let conn = self.conn().lock().await.unwrap();
        calls::insert_call(&conn, contact_id, agent_id, recording, None, self.now()).unwrap()
    }

    pub async fn set_outcome(&self, call_id: i64, outcome: CallOutcome) {
        let conn = self.conn().lock().await.unwrap();
        calls::apply_outcome(&conn, call_id, outcome, None, self.now()).unwrap();
    }

    pub async fn get_call(&self, call_id: i64) -> CallRecord {
        let conn = self.conn().lock().await.unwrap();
        calls::get_call(&conn, call_id).unwrap()
    }

    /// Drops a fake recording into the store.
    pub fn recording(&self, path: &str) {
        self.storage.write(Path::new(path), b"RIFF").unwrap();
    }

    pub fn recording_exists(&self, path: &str) -> bool {
        self.storage.exists(Path::new(path))
    }
}
