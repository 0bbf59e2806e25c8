use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ContactCreated,
    ContactDeleted,
    ContactQualified,
    ContactsRecycled,
    RecyclePolicyUpdated,
    RecordingRenamed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub agent_id: Option<i64>,
    pub subject_id: i64,
    pub detail: serde_json::Value,
    pub at: i64,
}

/// Outbound seam to the audit log.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Writes audit entries as structured events on the `audit` target.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        let detail = serde_json::to_string(&entry.detail).unwrap_or_default();
        tracing::info!(
            target: "audit",
            action = ?entry.action,
            agent_id = ?entry.agent_id,
            subject_id = entry.subject_id,
            at = entry.at,
            detail = %detail,
            "audit entry"
        );
    }
}
