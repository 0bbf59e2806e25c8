use crate::database::agents::{self, AgentScope};
use crate::database::contacts::{self, Candidate};
use crate::database::{source_databases, AsyncDbConnection};
use crate::engine::recycling::{self, RecycleWindow};
use crate::error::{LeadError, Result};
use crate::helpers::clock::Clock;
use crate::helpers::notifier::Notifier;
use rusqlite::Connection;
use shared_types::{Contact, ContactNotice, NoticeKind};
use std::sync::Arc;

/// Where the dispatcher looks for work, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tier {
    /// Callbacks and follow-ups owned by the agent that are due.
    DueCallback,
    /// `NEW` contacts already owned by the agent.
    OwnedNew,
    /// Unowned `NEW` contacts inside the agent's assignments.
    ScopedNew,
    /// Any unowned `NEW` contact, for agents not bound to assignments.
    OpenNew,
    /// The agent's own contacts that went idle in a recycling database.
    RecycleOwned(RecycleWindow),
    /// Unowned idle contacts of a recycling database.
    RecycleOpen {
        window: RecycleWindow,
        scope_agent: Option<i64>,
    },
}

impl Tier {
    fn name(&self) -> &'static str {
        match self {
            Tier::DueCallback => "due-callback",
            Tier::OwnedNew => "owned-new",
            Tier::ScopedNew => "scoped-new",
            Tier::OpenNew => "open-new",
            Tier::RecycleOwned(_) => "recycle-owned",
            Tier::RecycleOpen { .. } => "recycle-open",
        }
    }
}

/// Orders the tiers for an agent. `windows` must follow the order the
/// agent's databases should be recycled in.
pub fn plan_tiers(agent_id: i64, scope: &AgentScope, windows: Vec<RecycleWindow>) -> Vec<Tier> {
    let mut tiers = vec![Tier::DueCallback, Tier::OwnedNew];
    if !scope.assignments.is_empty() {
        tiers.push(Tier::ScopedNew);
    }
    if scope.uses_open_pool() {
        tiers.push(Tier::OpenNew);
    }

    let scope_agent = if scope.uses_open_pool() {
        None
    } else {
        Some(agent_id)
    };
    for window in windows {
        tiers.push(Tier::RecycleOwned(window.clone()));
        tiers.push(Tier::RecycleOpen {
            window,
            scope_agent,
        });
    }
    tiers
}

fn candidates(
    conn: &Connection,
    tier: &Tier,
    agent_id: i64,
    now: i64,
    limit: usize,
) -> Result<Vec<Candidate>> {
    match tier {
        Tier::DueCallback => contacts::due_callbacks(conn, agent_id, now, limit),
        Tier::OwnedNew => contacts::owned_new(conn, agent_id, limit),
        Tier::ScopedNew => contacts::unowned_new_in_scope(conn, agent_id, limit),
        Tier::OpenNew => contacts::unowned_new_anywhere(conn, limit),
        Tier::RecycleOwned(window) => contacts::stale_owned(
            conn,
            agent_id,
            window.source_database_id,
            &window.statuses(),
            window.cutoff,
            limit,
        ),
        Tier::RecycleOpen {
            window,
            scope_agent,
        } => contacts::stale_unowned(
            conn,
            *scope_agent,
            window.source_database_id,
            &window.statuses(),
            window.cutoff,
            limit,
        ),
    }
}

/// Hands out the next contact an agent should call.
pub struct Dispatcher {
    db_conn: AsyncDbConnection,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    candidate_batch: usize,
    max_claim_rounds: usize,
}

impl Dispatcher {
    pub fn new(
        db_conn: AsyncDbConnection,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        candidate_batch: usize,
        max_claim_rounds: usize,
    ) -> Self {
        Self {
            db_conn,
            clock,
            notifier,
            candidate_batch: candidate_batch.max(1),
            max_claim_rounds: max_claim_rounds.max(1),
        }
    }

    /// Returns a contact now owned by `agent_id`, or `None` when there is no
    /// work. Every returned contact was claimed by a single conditional
    /// update, so two agents never receive the same one.
    pub async fn next_contact(&self, agent_id: i64) -> Result<Option<Contact>> {
        let now = self.clock.now();
        let conn = self.db_conn.lock().await?;

        let agent = agents::get_agent(&conn, agent_id)?;
        if !agent.is_active {
            tracing::info!("Agent {} is inactive, no contact dispatched", agent_id);
            return Ok(None);
        }

        let scope = agents::load_scope(&conn, &agent)?;
        let recycle_ids = if scope.uses_open_pool() {
            source_databases::list_active_ids(&conn)?
        } else {
            scope.source_database_ids()
        };
        let windows = recycling::recycle_windows(&conn, &recycle_ids, now)?;

        for tier in plan_tiers(agent_id, &scope, windows) {
            if let Some(contact) = self.claim_from_tier(&conn, &tier, agent_id, now.timestamp())? {
                return Ok(Some(contact));
            }
            tracing::debug!("Tier {} empty for agent {}", tier.name(), agent_id);
        }

        tracing::debug!("No work available for agent {}", agent_id);
        Ok(None)
    }

    fn claim_from_tier(
        &self,
        conn: &Connection,
        tier: &Tier,
        agent_id: i64,
        now: i64,
    ) -> Result<Option<Contact>> {
        for round in 0..self.max_claim_rounds {
            let batch = candidates(conn, tier, agent_id, now, self.candidate_batch)?;
            if batch.is_empty() {
                return Ok(None);
            }

            for candidate in &batch {
                match self.claim(conn, candidate, agent_id, now) {
                    Ok(contact) => {
                        tracing::info!(
                            "Dispatched contact {} to agent {} from tier {}",
                            contact.id,
                            agent_id,
                            tier.name()
                        );
                        return Ok(Some(contact));
                    }
                    Err(LeadError::RaceLost) => {
                        tracing::debug!(
                            "Agent {} lost contact {} in tier {} (round {})",
                            agent_id,
                            candidate.id,
                            tier.name(),
                            round
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(None)
    }

    fn claim(
        &self,
        conn: &Connection,
        candidate: &Candidate,
        agent_id: i64,
        now: i64,
    ) -> Result<Contact> {
        if !contacts::try_claim(conn, candidate, agent_id, now)? {
            return Err(LeadError::RaceLost);
        }

        let contact = contacts::get_contact(conn, candidate.id)?;
        if candidate.assigned_agent_id != Some(agent_id) {
            self.notifier.publish(ContactNotice {
                contact_id: contact.id,
                status: contact.status,
                assigned_agent_id: Some(agent_id),
                kind: NoticeKind::Claimed,
            });
        }
        Ok(contact)
    }
}
