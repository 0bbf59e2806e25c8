use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Business-qualification state of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactStatus {
    New,
    Nrp,
    Unreachable,
    AnsweringMachine,
    Absent,
    CallbackLater,
    FollowUp,
    NotInterested,
    AppointmentTaken,
    OutOfTarget,
    AlreadyClient,
    WrongNumber,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 12] = [
        ContactStatus::New,
        ContactStatus::Nrp,
        ContactStatus::Unreachable,
        ContactStatus::AnsweringMachine,
        ContactStatus::Absent,
        ContactStatus::CallbackLater,
        ContactStatus::FollowUp,
        ContactStatus::NotInterested,
        ContactStatus::AppointmentTaken,
        ContactStatus::OutOfTarget,
        ContactStatus::AlreadyClient,
        ContactStatus::WrongNumber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "NEW",
            ContactStatus::Nrp => "NRP",
            ContactStatus::Unreachable => "UNREACHABLE",
            ContactStatus::AnsweringMachine => "ANSWERING_MACHINE",
            ContactStatus::Absent => "ABSENT",
            ContactStatus::CallbackLater => "CALLBACK_LATER",
            ContactStatus::FollowUp => "FOLLOW_UP",
            ContactStatus::NotInterested => "NOT_INTERESTED",
            ContactStatus::AppointmentTaken => "APPOINTMENT_TAKEN",
            ContactStatus::OutOfTarget => "OUT_OF_TARGET",
            ContactStatus::AlreadyClient => "ALREADY_CLIENT",
            ContactStatus::WrongNumber => "WRONG_NUMBER",
        }
    }

    /// Lenient parse: case-insensitive, accepts `-` and spaces as separators.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = normalize_key(raw);
        Self::ALL.into_iter().find(|status| status.as_str() == key)
    }

    /// Callback-type statuses are the only ones allowed to carry a next call date.
    pub fn is_callback(&self) -> bool {
        matches!(self, ContactStatus::CallbackLater | ContactStatus::FollowUp)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ContactStatus::NotInterested
                | ContactStatus::AppointmentTaken
                | ContactStatus::OutOfTarget
                | ContactStatus::AlreadyClient
                | ContactStatus::WrongNumber
        )
    }

    pub fn recycle_reason(&self) -> Option<RecycleReason> {
        match self {
            ContactStatus::Nrp => Some(RecycleReason::Nrp),
            ContactStatus::AnsweringMachine => Some(RecycleReason::AnsweringMachine),
            ContactStatus::Absent => Some(RecycleReason::Absent),
            ContactStatus::Unreachable => Some(RecycleReason::Unreachable),
            _ => None,
        }
    }

    pub fn dispatch_state(&self, next_call_date: Option<i64>) -> DispatchState {
        if self.is_callback() {
            return DispatchState::CallbackPending {
                due: next_call_date,
            };
        }
        if let Some(reason) = self.recycle_reason() {
            return DispatchState::Recyclable { reason };
        }
        if self.is_terminal() {
            DispatchState::Terminal
        } else {
            DispatchState::Fresh
        }
    }
}

pub(crate) fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Unresolved statuses a recycling policy can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecycleReason {
    Nrp,
    AnsweringMachine,
    Absent,
    Unreachable,
}

impl RecycleReason {
    pub fn status(&self) -> ContactStatus {
        match self {
            RecycleReason::Nrp => ContactStatus::Nrp,
            RecycleReason::AnsweringMachine => ContactStatus::AnsweringMachine,
            RecycleReason::Absent => ContactStatus::Absent,
            RecycleReason::Unreachable => ContactStatus::Unreachable,
        }
    }
}

/// What the dispatcher can do with a contact, independent of the outcome
/// of its last call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchState {
    Fresh,
    CallbackPending { due: Option<i64> },
    Recyclable { reason: RecycleReason },
    Terminal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Contact {
    pub id: i64,
    pub code: String,
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub status: ContactStatus,
    pub assigned_agent_id: Option<i64>,
    pub next_call_date: Option<i64>,
    pub source_database_id: i64,
    pub campaign_id: Option<i64>,
    pub claimed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Contact {
    pub fn dispatch_state(&self) -> DispatchState {
        self.status.dispatch_state(self.next_call_date)
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateContactRequest {
    pub code: Option<String>,
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub source_database_id: i64,
    pub campaign_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct ListContactsQuery {
    pub status: Option<String>,
    pub assigned_agent_id: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ContactsResponse {
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeKind {
    Claimed,
    Qualified,
    Recycled,
}

/// Payload pushed to the real-time channel whenever a contact changes hands
/// or state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContactNotice {
    pub contact_id: i64,
    pub status: ContactStatus,
    pub assigned_agent_id: Option<i64>,
    pub kind: NoticeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!(ContactStatus::parse("nrp"), Some(ContactStatus::Nrp));
        assert_eq!(
            ContactStatus::parse(" callback-later "),
            Some(ContactStatus::CallbackLater)
        );
        assert_eq!(
            ContactStatus::parse("appointment taken"),
            Some(ContactStatus::AppointmentTaken)
        );
        assert_eq!(ContactStatus::parse("bogus"), None);
    }

    #[test]
    fn test_as_str_round_trips_through_parse() {
        for status in ContactStatus::ALL {
            assert_eq!(ContactStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_dispatch_state() {
        assert_eq!(ContactStatus::New.dispatch_state(None), DispatchState::Fresh);
        assert_eq!(
            ContactStatus::FollowUp.dispatch_state(Some(42)),
            DispatchState::CallbackPending { due: Some(42) }
        );
        assert_eq!(
            ContactStatus::Absent.dispatch_state(None),
            DispatchState::Recyclable {
                reason: RecycleReason::Absent
            }
        );
        assert_eq!(
            ContactStatus::WrongNumber.dispatch_state(None),
            DispatchState::Terminal
        );
    }

    #[test]
    fn test_every_status_has_exactly_one_class() {
        for status in ContactStatus::ALL {
            let classes = [
                status == ContactStatus::New,
                status.is_callback(),
                status.recycle_reason().is_some(),
                status.is_terminal(),
            ];
            assert_eq!(classes.iter().filter(|c| **c).count(), 1, "{:?}", status);
        }
    }

    #[test]
    fn test_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&ContactStatus::AnsweringMachine).unwrap();
        assert_eq!(json, "\"ANSWERING_MACHINE\"");
    }
}
