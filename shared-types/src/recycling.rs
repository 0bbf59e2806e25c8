use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::contact::RecycleReason;

/// Per source database recycling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecyclePolicy {
    pub source_database_id: i64,
    pub enabled: bool,
    pub delay_minutes: i64,
    pub recycle_nrp: bool,
    pub recycle_answering_machine: bool,
    pub recycle_absent: bool,
    pub recycle_unreachable: bool,
    pub updated_at: i64,
}

impl RecyclePolicy {
    /// The policy a database has until an administrator saves one.
    pub fn disabled(source_database_id: i64) -> Self {
        Self {
            source_database_id,
            enabled: false,
            delay_minutes: 0,
            recycle_nrp: false,
            recycle_answering_machine: false,
            recycle_absent: false,
            recycle_unreachable: false,
            updated_at: 0,
        }
    }

    pub fn allows(&self, reason: RecycleReason) -> bool {
        match reason {
            RecycleReason::Nrp => self.recycle_nrp,
            RecycleReason::AnsweringMachine => self.recycle_answering_machine,
            RecycleReason::Absent => self.recycle_absent,
            RecycleReason::Unreachable => self.recycle_unreachable,
        }
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct UpdateRecyclePolicyRequest {
    pub enabled: bool,
    pub delay_minutes: i64,
    #[serde(default)]
    pub recycle_nrp: bool,
    #[serde(default)]
    pub recycle_answering_machine: bool,
    #[serde(default)]
    pub recycle_absent: bool,
    #[serde(default)]
    pub recycle_unreachable: bool,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct RecycleNowResponse {
    pub source_database_id: i64,
    pub reset_count: usize,
}
