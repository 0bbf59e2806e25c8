use crate::database::{agents, calls, contacts, AsyncDbConnection};
use crate::engine::renamer::{ArtifactRenamer, RenamedArtifact};
use crate::error::{LeadError, Result};
use crate::helpers::audit::{AuditAction, AuditEntry, AuditSink};
use crate::helpers::clock::Clock;
use crate::helpers::notifier::Notifier;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::{Connection, TransactionBehavior};
use shared_types::{
    CallOutcome, Contact, ContactNotice, ContactStatus, DispatchState, NoticeKind,
    QualificationResponse, QualifyRequest, QualifyTarget,
};
use std::sync::Arc;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a next call date. Accepts RFC 3339, naive date-times and dates
/// (read as UTC), and unix seconds.
pub fn parse_call_date(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LeadError::InvalidInput("empty call date".to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().timestamp());
    }
    if let Ok(ts) = raw.parse::<i64>() {
        return Ok(ts);
    }

    Err(LeadError::InvalidInput(format!("unparsable call date '{}'", raw)))
}

/// State written by one qualification, read back inside its transaction.
struct Applied {
    contact: Contact,
    call_id: i64,
    propagated: Vec<i64>,
}

pub struct QualificationProcessor {
    db_conn: AsyncDbConnection,
    clock: Arc<dyn Clock>,
    renamer: Arc<ArtifactRenamer>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditSink>,
}

impl QualificationProcessor {
    pub fn new(
        db_conn: AsyncDbConnection,
        clock: Arc<dyn Clock>,
        renamer: Arc<ArtifactRenamer>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            db_conn,
            clock,
            renamer,
            notifier,
            audit,
        }
    }

    /// Records the outcome of a call and moves the contact to its new status.
    ///
    /// Call outcome, propagation to sibling recordings, the contact update and
    /// the recording renames commit together. On failure nothing is written
    /// and any file already moved is put back.
    pub async fn qualify(&self, request: &QualifyRequest) -> Result<QualificationResponse> {
        let outcome = CallOutcome::normalize(&request.outcome);
        if CallOutcome::parse(&request.outcome) != Some(outcome) {
            tracing::debug!("Outcome '{}' normalized to {}", request.outcome, outcome.as_str());
        }

        let now = self.clock.timestamp();
        let mut conn = self.db_conn.lock().await?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut renamed = Vec::new();
        let applied = match self.apply(&tx, request, outcome, now, &mut renamed) {
            Ok(applied) => applied,
            Err(e) => {
                self.renamer.undo(&renamed);
                return Err(e);
            }
        };
        if let Err(e) = tx.commit() {
            self.renamer.undo(&renamed);
            return Err(e.into());
        }

        let contact = applied.contact;
        tracing::info!(
            "Agent {} qualified contact {} as {} (call {}, outcome {})",
            request.agent_id,
            contact.id,
            contact.status.as_str(),
            applied.call_id,
            outcome.as_str()
        );

        self.notifier.publish(ContactNotice {
            contact_id: contact.id,
            status: contact.status,
            assigned_agent_id: contact.assigned_agent_id,
            kind: NoticeKind::Qualified,
        });
        let renamed_files: Vec<String> = renamed.iter().map(|a| a.file_name.clone()).collect();
        self.audit.record(AuditEntry {
            action: AuditAction::ContactQualified,
            agent_id: Some(request.agent_id),
            subject_id: contact.id,
            detail: serde_json::json!({
                "call_id": applied.call_id,
                "outcome": outcome.as_str(),
                "status": contact.status.as_str(),
                "next_call_date": contact.next_call_date,
                "propagated_call_ids": &applied.propagated,
                "renamed_files": &renamed_files,
            }),
            at: now,
        });

        Ok(QualificationResponse {
            contact,
            call_id: applied.call_id,
            outcome,
            propagated_call_ids: applied.propagated,
            renamed_files,
        })
    }

    fn apply(
        &self,
        conn: &Connection,
        request: &QualifyRequest,
        outcome: CallOutcome,
        now: i64,
        renamed: &mut Vec<RenamedArtifact>,
    ) -> Result<Applied> {
        agents::get_agent(conn, request.agent_id)?;
        let notes = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

        let (contact, call_id) = match request.target {
            QualifyTarget::Call(call_id) => {
                let call = calls::get_call(conn, call_id)?;
                (contacts::get_contact(conn, call.contact_id)?, call.id)
            }
            QualifyTarget::Contact(contact_id) => {
                let contact = contacts::get_contact(conn, contact_id)?;
                let call = calls::insert_call(conn, contact.id, request.agent_id, None, None, now)?;
                (contact, call.id)
            }
        };

        calls::apply_outcome(conn, call_id, outcome, notes, now)?;

        let propagated = calls::untreated_siblings(conn, contact.id, call_id)?;
        for sibling in &propagated {
            calls::apply_outcome(conn, *sibling, outcome, None, now)?;
        }
        if !propagated.is_empty() {
            tracing::info!(
                "Outcome {} propagated to {} untreated call(s) of contact {}",
                outcome.as_str(),
                propagated.len(),
                contact.id
            );
        }

        let status = self.resolve_status(&contact, &request.status);
        let callback = matches!(
            status.dispatch_state(None),
            DispatchState::CallbackPending { .. }
        );
        let (next_call_date, new_owner) = if callback {
            (
                Some(self.resolve_call_date(&contact, request.next_call_date.as_deref(), now)),
                Some(request.agent_id),
            )
        } else {
            (None, None)
        };
        contacts::apply_qualification(conn, contact.id, status, next_call_date, new_owner, now)?;

        for call in std::iter::once(call_id).chain(propagated.iter().copied()) {
            if let Some(artifact) = self.renamer.rename_in(conn, call, now)? {
                if artifact.moved() {
                    renamed.push(artifact);
                }
            }
        }

        Ok(Applied {
            contact: contacts::get_contact(conn, contact.id)?,
            call_id,
            propagated,
        })
    }

    fn resolve_status(&self, contact: &Contact, raw: &str) -> ContactStatus {
        ContactStatus::parse(raw).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown status '{}' for contact {}, keeping {}",
                raw,
                contact.id,
                contact.status.as_str()
            );
            contact.status
        })
    }

    /// A bad or missing date never fails the qualification: the contact keeps
    /// its current date, or is due right away.
    fn resolve_call_date(&self, contact: &Contact, raw: Option<&str>, now: i64) -> i64 {
        let fallback = match contact.dispatch_state() {
            DispatchState::CallbackPending { due: Some(due) } => due,
            _ => now,
        };
        match raw.map(parse_call_date) {
            Some(Ok(ts)) => ts,
            Some(Err(e)) => {
                tracing::warn!("{} for contact {}, using {}", e, contact.id, fallback);
                fallback
            }
            None => fallback,
        }
    }
}
