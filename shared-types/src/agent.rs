use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::contact::normalize_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentRole {
    Agent,
    Supervisor,
    Admin,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Agent => "AGENT",
            AgentRole::Supervisor => "SUPERVISOR",
            AgentRole::Admin => "ADMIN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_key(raw).as_str() {
            "AGENT" => Some(AgentRole::Agent),
            "SUPERVISOR" => Some(AgentRole::Supervisor),
            "ADMIN" => Some(AgentRole::Admin),
            _ => None,
        }
    }

    /// Administrative roles see every source database.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, AgentRole::Supervisor | AgentRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub role: AgentRole,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateAgentRequest {
    pub name: String,
    pub role: Option<AgentRole>,
}

/// Grants an agent a source database, optionally narrowed to one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgentAssignment {
    pub agent_id: i64,
    pub source_database_id: i64,
    pub campaign_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateAssignmentRequest {
    pub source_database_id: i64,
    pub campaign_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SourceDatabase {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateSourceDatabaseRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Campaign {
    pub id: i64,
    pub source_database_id: i64,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateCampaignRequest {
    pub source_database_id: i64,
    pub name: String,
}
