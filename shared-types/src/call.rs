use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::contact::{normalize_key, ContactStatus};

/// Outcome recorded against a single call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallOutcome {
    /// Default for a freshly logged call nobody has qualified yet.
    Unqualified,
    AppointmentTaken,
    CallbackLater,
    NotInterested,
    AlreadyClient,
    WrongContact,
    Unreachable,
    AnsweringMachine,
    Other,
}

impl CallOutcome {
    pub const ALL: [CallOutcome; 9] = [
        CallOutcome::Unqualified,
        CallOutcome::AppointmentTaken,
        CallOutcome::CallbackLater,
        CallOutcome::NotInterested,
        CallOutcome::AlreadyClient,
        CallOutcome::WrongContact,
        CallOutcome::Unreachable,
        CallOutcome::AnsweringMachine,
        CallOutcome::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Unqualified => "UNQUALIFIED",
            CallOutcome::AppointmentTaken => "APPOINTMENT_TAKEN",
            CallOutcome::CallbackLater => "CALLBACK_LATER",
            CallOutcome::NotInterested => "NOT_INTERESTED",
            CallOutcome::AlreadyClient => "ALREADY_CLIENT",
            CallOutcome::WrongContact => "WRONG_CONTACT",
            CallOutcome::Unreachable => "UNREACHABLE",
            CallOutcome::AnsweringMachine => "ANSWERING_MACHINE",
            CallOutcome::Other => "OTHER",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let key = normalize_key(raw);
        Self::ALL.into_iter().find(|outcome| outcome.as_str() == key)
    }

    /// Human-readable label, used in recording file names.
    pub fn label(&self) -> &'static str {
        match self {
            CallOutcome::Unqualified => "Unqualified",
            CallOutcome::AppointmentTaken => "Appointment taken",
            CallOutcome::CallbackLater => "Callback later",
            CallOutcome::NotInterested => "Not interested",
            CallOutcome::AlreadyClient => "Already client",
            CallOutcome::WrongContact => "Wrong contact",
            CallOutcome::Unreachable => "Unreachable",
            CallOutcome::AnsweringMachine => "Answering machine",
            CallOutcome::Other => "Other",
        }
    }

    pub fn from_status(status: ContactStatus) -> Self {
        match status {
            ContactStatus::New => CallOutcome::Other,
            ContactStatus::Nrp | ContactStatus::Absent | ContactStatus::Unreachable => {
                CallOutcome::Unreachable
            }
            ContactStatus::AnsweringMachine => CallOutcome::AnsweringMachine,
            ContactStatus::CallbackLater | ContactStatus::FollowUp => CallOutcome::CallbackLater,
            ContactStatus::NotInterested | ContactStatus::OutOfTarget => {
                CallOutcome::NotInterested
            }
            ContactStatus::AppointmentTaken => CallOutcome::AppointmentTaken,
            ContactStatus::AlreadyClient => CallOutcome::AlreadyClient,
            ContactStatus::WrongNumber => CallOutcome::WrongContact,
        }
    }

    /// Maps whatever the agent submitted onto the outcome taxonomy.
    ///
    /// Contact statuses go through the status mapping, outcome names are taken
    /// as-is, and anything else becomes `Other`. Never yields `Unqualified`.
    pub fn normalize(raw: &str) -> Self {
        if let Some(status) = ContactStatus::parse(raw) {
            return Self::from_status(status);
        }
        match Self::parse(raw) {
            Some(CallOutcome::Unqualified) | None => CallOutcome::Other,
            Some(outcome) => outcome,
        }
    }

    pub fn is_qualified(&self) -> bool {
        !matches!(self, CallOutcome::Unqualified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingStatus {
    NoRecording,
    Untreated,
    Treated,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::NoRecording => "NO_RECORDING",
            RecordingStatus::Untreated => "UNTREATED",
            RecordingStatus::Treated => "TREATED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_key(raw).as_str() {
            "NO_RECORDING" => Some(RecordingStatus::NoRecording),
            "UNTREATED" => Some(RecordingStatus::Untreated),
            "TREATED" => Some(RecordingStatus::Treated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CallRecord {
    pub id: i64,
    pub contact_id: i64,
    pub agent_id: i64,
    pub outcome: CallOutcome,
    pub notes: Option<String>,
    pub recording_path: Option<String>,
    pub recording_status: RecordingStatus,
    pub original_recording_name: Option<String>,
    pub renamed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A call attempt reported by the telephony layer.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct LogCallRequest {
    pub contact_id: i64,
    pub agent_id: i64,
    pub recording_path: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct CallsResponse {
    pub calls: Vec<CallRecord>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct RenameResponse {
    pub call_id: i64,
    pub file_name: Option<String>,
}
