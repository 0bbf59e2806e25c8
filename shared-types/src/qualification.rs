use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::call::CallOutcome;
use crate::contact::Contact;

/// What the agent is qualifying: a specific logged call, or the contact as a
/// whole (a call record is synthesized in that case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum QualifyTarget {
    Contact(i64),
    Call(i64),
}

/// Raw qualification input. `outcome` and `status` are free strings on
/// purpose: unknown values are coerced, never rejected.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct QualifyRequest {
    pub target: QualifyTarget,
    pub agent_id: i64,
    pub outcome: String,
    pub status: String,
    pub notes: Option<String>,
    pub next_call_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct QualificationResponse {
    pub contact: Contact,
    pub call_id: i64,
    pub outcome: CallOutcome,
    pub propagated_call_ids: Vec<i64>,
    pub renamed_files: Vec<String>,
}
