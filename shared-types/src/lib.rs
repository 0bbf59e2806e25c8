use serde::{Deserialize, Serialize};

pub mod agent;
pub mod call;
pub mod contact;
pub mod qualification;
pub mod recycling;

pub use agent::{
    Agent, AgentAssignment, AgentRole, Campaign, CreateAgentRequest, CreateAssignmentRequest,
    CreateCampaignRequest, CreateSourceDatabaseRequest, SourceDatabase,
};
pub use call::{
    CallOutcome, CallRecord, CallsResponse, LogCallRequest, RecordingStatus, RenameResponse,
};
pub use contact::{
    Contact, ContactNotice, ContactStatus, ContactsResponse, CreateContactRequest, DispatchState,
    ListContactsQuery, NoticeKind, RecycleReason,
};
pub use qualification::{QualificationResponse, QualifyRequest, QualifyTarget};
pub use recycling::{RecycleNowResponse, RecyclePolicy, UpdateRecyclePolicyRequest};

/// Error response for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
