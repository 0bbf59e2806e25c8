use crate::database::{contacts, recycle_policies, source_databases, AsyncDbConnection};
use crate::error::Result;
use crate::helpers::audit::{AuditAction, AuditEntry, AuditSink};
use crate::helpers::clock::Clock;
use crate::helpers::notifier::Notifier;
use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{Connection, TransactionBehavior};
use shared_types::{
    ContactNotice, ContactStatus, DispatchState, NoticeKind, RecycleNowResponse, RecyclePolicy,
    RecycleReason, UpdateRecyclePolicyRequest,
};
use std::sync::Arc;

const REASONS: [RecycleReason; 4] = [
    RecycleReason::Nrp,
    RecycleReason::AnsweringMachine,
    RecycleReason::Absent,
    RecycleReason::Unreachable,
];

/// Which unresolved contacts of one database may go back into the pool right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecycleWindow {
    pub source_database_id: i64,
    pub eligible: Vec<RecycleReason>,
    /// Contacts last touched strictly before this timestamp are idle enough.
    pub cutoff: i64,
}

impl RecycleWindow {
    fn covers(&self, status: ContactStatus) -> bool {
        match status.dispatch_state(None) {
            DispatchState::Recyclable { reason } => self.eligible.contains(&reason),
            _ => false,
        }
    }

    /// Statuses whose contacts this window puts back into play.
    pub fn statuses(&self) -> Vec<ContactStatus> {
        ContactStatus::ALL
            .into_iter()
            .filter(|status| self.covers(*status))
            .collect()
    }
}

/// Evaluates a policy at `now`. A missing or disabled policy, one that
/// allows no outcome, or a delay reaching past the representable time range
/// yields no window.
pub fn evaluate(policy: Option<&RecyclePolicy>, now: DateTime<Utc>) -> Option<RecycleWindow> {
    let policy = policy.filter(|p| p.enabled)?;

    let eligible: Vec<RecycleReason> = REASONS
        .into_iter()
        .filter(|reason| policy.allows(*reason))
        .collect();
    if eligible.is_empty() {
        return None;
    }

    let Some(cutoff) = TimeDelta::try_minutes(policy.delay_minutes.max(0))
        .and_then(|delay| now.checked_sub_signed(delay))
    else {
        tracing::warn!(
            "Recycle delay of {} minutes for database {} is out of range, not recycling",
            policy.delay_minutes,
            policy.source_database_id
        );
        return None;
    };
    Some(RecycleWindow {
        source_database_id: policy.source_database_id,
        eligible,
        cutoff: cutoff.timestamp(),
    })
}

/// Windows for each database, in the given order, skipping those that do not recycle.
pub fn recycle_windows(
    conn: &Connection,
    source_database_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<Vec<RecycleWindow>> {
    let mut windows = Vec::new();
    for id in source_database_ids {
        let policy = recycle_policies::get_policy(conn, *id)?;
        if let Some(window) = evaluate(policy.as_ref(), now) {
            windows.push(window);
        }
    }
    Ok(windows)
}

/// Administrative side of recycling: policy edits and bulk resets.
pub struct RecyclingService {
    db_conn: AsyncDbConnection,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditSink>,
}

impl RecyclingService {
    pub fn new(
        db_conn: AsyncDbConnection,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db_conn,
            clock,
            notifier,
            audit,
        }
    }

    pub async fn get_policy(&self, source_database_id: i64) -> Result<RecyclePolicy> {
        let conn = self.db_conn.lock().await?;
        source_databases::get_source_database(&conn, source_database_id)?;
        Ok(recycle_policies::get_policy(&conn, source_database_id)?
            .unwrap_or_else(|| RecyclePolicy::disabled(source_database_id)))
    }

    pub async fn update_policy(
        &self,
        source_database_id: i64,
        request: &UpdateRecyclePolicyRequest,
    ) -> Result<RecyclePolicy> {
        let now = self.clock.timestamp();
        let conn = self.db_conn.lock().await?;
        let policy = recycle_policies::upsert_policy(&conn, source_database_id, request, now)?;

        tracing::info!(
            "Recycle policy for database {} set: enabled={}, delay={}min",
            source_database_id,
            policy.enabled,
            policy.delay_minutes
        );
        self.audit.record(AuditEntry {
            action: AuditAction::RecyclePolicyUpdated,
            agent_id: None,
            subject_id: source_database_id,
            detail: serde_json::to_value(&policy).unwrap_or_default(),
            at: now,
        });

        Ok(policy)
    }

    /// Puts every non-terminal, non-callback contact of the database back to
    /// unowned `NEW`.
    pub async fn recycle_now(&self, source_database_id: i64) -> Result<RecycleNowResponse> {
        let now = self.clock.timestamp();
        let mut conn = self.db_conn.lock().await?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        source_databases::get_source_database(&tx, source_database_id)?;
        let reset = contacts::reset_for_recycling(&tx, source_database_id, now)?;
        tx.commit()?;

        tracing::info!(
            "Recycled {} contacts of database {}",
            reset.len(),
            source_database_id
        );
        for contact_id in &reset {
            self.notifier.publish(ContactNotice {
                contact_id: *contact_id,
                status: ContactStatus::New,
                assigned_agent_id: None,
                kind: NoticeKind::Recycled,
            });
        }
        self.audit.record(AuditEntry {
            action: AuditAction::ContactsRecycled,
            agent_id: None,
            subject_id: source_database_id,
            detail: serde_json::json!({ "reset_count": reset.len() }),
            at: now,
        });

        Ok(RecycleNowResponse {
            source_database_id,
            reset_count: reset.len(),
        })
    }
}
