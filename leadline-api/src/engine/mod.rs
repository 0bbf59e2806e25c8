pub mod dispatcher;
pub mod qualification;
pub mod recycling;
pub mod renamer;

use crate::config::ApiConfig;
use crate::database::{contacts, source_databases, AsyncDbConnection};
use crate::error::Result;
use crate::helpers::audit::{AuditAction, AuditEntry, AuditSink};
use crate::helpers::clock::Clock;
use crate::helpers::notifier::Notifier;
use crate::helpers::storage::ArtifactStorage;
use dispatcher::Dispatcher;
use qualification::QualificationProcessor;
use recycling::RecyclingService;
use renamer::ArtifactRenamer;
use rusqlite::TransactionBehavior;
use shared_types::{Contact, CreateContactRequest};
use std::sync::Arc;

/// The lead engine: dispatch, qualification, recycling and recording renames
/// over one store, one clock and one set of outbound seams.
pub struct Engine {
    pub dispatcher: Dispatcher,
    pub qualifier: QualificationProcessor,
    pub recycling: RecyclingService,
    pub renamer: Arc<ArtifactRenamer>,
    db_conn: AsyncDbConnection,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
}

impl Engine {
    pub fn new(
        db_conn: AsyncDbConnection,
        config: &ApiConfig,
        clock: Arc<dyn Clock>,
        storage: Arc<dyn ArtifactStorage>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let renamer = Arc::new(ArtifactRenamer::new(
            db_conn.clone(),
            storage,
            clock.clone(),
            audit.clone(),
            config.recordings.treated_dir.clone(),
            config.recordings.max_component_len,
        ));

        Self {
            dispatcher: Dispatcher::new(
                db_conn.clone(),
                clock.clone(),
                notifier.clone(),
                config.dispatch.candidate_batch,
                config.dispatch.max_claim_rounds,
            ),
            qualifier: QualificationProcessor::new(
                db_conn.clone(),
                clock.clone(),
                renamer.clone(),
                notifier.clone(),
                audit.clone(),
            ),
            recycling: RecyclingService::new(
                db_conn.clone(),
                clock.clone(),
                notifier,
                audit.clone(),
            ),
            renamer,
            db_conn,
            clock,
            audit,
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.timestamp()
    }

    pub fn db_conn(&self) -> AsyncDbConnection {
        self.db_conn.clone()
    }

    /// Adds a contact to a source database as unowned `NEW`.
    pub async fn create_contact(&self, request: &CreateContactRequest) -> Result<Contact> {
        let now = self.now();
        let contact = {
            let conn = self.db_conn.lock().await?;
            source_databases::ensure_provenance(
                &conn,
                request.source_database_id,
                request.campaign_id,
            )?;
            contacts::insert_contact(&conn, request, now)?
        };

        tracing::info!(
            "Created contact {} ({}) in database {}",
            contact.id,
            contact.code,
            contact.source_database_id
        );
        self.audit.record(AuditEntry {
            action: AuditAction::ContactCreated,
            agent_id: None,
            subject_id: contact.id,
            detail: serde_json::json!({
                "code": &contact.code,
                "source_database_id": contact.source_database_id,
                "campaign_id": contact.campaign_id,
            }),
            at: now,
        });

        Ok(contact)
    }

    /// Deletes a contact with its call history. Recording files stay in the store.
    pub async fn delete_contact(&self, contact_id: i64) -> Result<()> {
        let now = self.now();
        let recordings = {
            let mut conn = self.db_conn.lock().await?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let recordings = contacts::delete_contact(&tx, contact_id)?;
            tx.commit()?;
            recordings
        };

        tracing::info!("Deleted contact {}", contact_id);
        self.audit.record(AuditEntry {
            action: AuditAction::ContactDeleted,
            agent_id: None,
            subject_id: contact_id,
            detail: serde_json::json!({ "recorded_calls": recordings }),
            at: now,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::LeadError;
    use crate::helpers::audit::AuditAction;
    use crate::testing::TestEnv;
    use shared_types::{ContactStatus, CreateContactRequest};

    fn request(db: i64, campaign_id: Option<i64>) -> CreateContactRequest {
        CreateContactRequest {
            code: Some("ACME-001".to_string()),
            company_name: Some("Acme".to_string()),
            contact_name: Some("Wile E.".to_string()),
            phone: "+33 1 00 00 00 00".to_string(),
            email: None,
            source_database_id: db,
            campaign_id,
        }
    }

    #[tokio::test]
    async fn test_create_contact_is_audited() {
        let env = TestEnv::new();
        let db = env.source_database("Leads").await;

        let contact = env.engine.create_contact(&request(db.id, None)).await.unwrap();
        assert_eq!(contact.code, "ACME-001");
        assert_eq!(contact.status, ContactStatus::New);
        assert!(contact.assigned_agent_id.is_none());
        assert_eq!(env.audit.actions(), vec![AuditAction::ContactCreated]);
    }

    #[tokio::test]
    async fn test_create_contact_checks_provenance() {
        let env = TestEnv::new();
        let db = env.source_database("Leads").await;
        let other = env.source_database("Other").await;
        let campaign = env.campaign(other.id, "Spring").await;

        assert!(matches!(
            env.engine.create_contact(&request(404, None)).await,
            Err(LeadError::NotFound { .. })
        ));
        assert!(matches!(
            env.engine.create_contact(&request(db.id, Some(campaign.id))).await,
            Err(LeadError::InvalidInput(_))
        ));
        assert!(env.audit.actions().is_empty());
    }

    #[tokio::test]
    async fn test_delete_contact() {
        let env = TestEnv::new();
        let db = env.source_database("Leads").await;
        let alice = env.agent("Alice").await;
        let contact = env.contact(db.id, None, "Acme").await;
        env.call(contact.id, alice.id, Some("incoming/raw.wav")).await;

        env.engine.delete_contact(contact.id).await.unwrap();
        assert_eq!(env.audit.actions(), vec![AuditAction::ContactDeleted]);
        assert!(matches!(
            env.engine.delete_contact(contact.id).await,
            Err(LeadError::NotFound { entity: "contact", .. })
        ));
    }
}
