use crate::database::{calls, AsyncDbConnection};
use crate::error::{LeadError, Result};
use crate::helpers::audit::{AuditAction, AuditEntry, AuditSink};
use crate::helpers::clock::Clock;
use crate::helpers::sanitize::file_component;
use crate::helpers::storage::ArtifactStorage;
use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Gives up looking for a free name after this many suffixes.
const MAX_COLLISION_SUFFIX: usize = 10_000;

/// A recording that was (or already is) filed under its deterministic name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedArtifact {
    pub call_id: i64,
    pub from: PathBuf,
    pub to: PathBuf,
    pub file_name: String,
}

impl RenamedArtifact {
    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

/// Builds the file stem: `agent_company_outcome_campaign`.
pub fn file_stem(ctx: &calls::ArtifactContext, max_len: usize) -> String {
    let agent = file_component(&ctx.agent_name, max_len).unwrap_or_else(|| "agent".to_string());
    let company = ctx
        .company_name
        .as_deref()
        .and_then(|name| file_component(name, max_len))
        .or_else(|| file_component(&ctx.phone, max_len))
        .unwrap_or_else(|| "unknown".to_string());
    let outcome = file_component(ctx.outcome.label(), max_len)
        .unwrap_or_else(|| ctx.outcome.as_str().to_lowercase());
    let campaign = ctx
        .campaign_name
        .as_deref()
        .and_then(|name| file_component(name, max_len))
        .unwrap_or_else(|| "no-campaign".to_string());

    format!("{}_{}_{}_{}", agent, company, outcome, campaign)
}

fn with_extension(stem: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem.to_string(),
    }
}

pub struct ArtifactRenamer {
    db_conn: AsyncDbConnection,
    storage: Arc<dyn ArtifactStorage>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    treated_dir: PathBuf,
    max_component_len: usize,
}

impl ArtifactRenamer {
    pub fn new(
        db_conn: AsyncDbConnection,
        storage: Arc<dyn ArtifactStorage>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
        treated_dir: impl Into<PathBuf>,
        max_component_len: usize,
    ) -> Self {
        Self {
            db_conn,
            storage,
            clock,
            audit,
            treated_dir: treated_dir.into(),
            max_component_len: max_component_len.max(1),
        }
    }

    /// First name under the treated directory that is free or already ours.
    fn pick_target(&self, current: &Path, stem: &str) -> Option<PathBuf> {
        let extension = current.extension().and_then(|ext| ext.to_str());

        for n in 0..=MAX_COLLISION_SUFFIX {
            let name = if n == 0 {
                with_extension(stem, extension)
            } else {
                with_extension(&format!("{}_{}", stem, n), extension)
            };
            let target = self.treated_dir.join(name);
            if target == current || !self.storage.exists(&target) {
                return Some(target);
            }
        }
        None
    }

    /// Renames the recording of `call_id` using `conn`, which the caller owns
    /// (usually a transaction). Returns `None` when there is nothing to rename.
    ///
    /// If the database write fails after the file moved, the move is undone.
    pub fn rename_in(
        &self,
        conn: &Connection,
        call_id: i64,
        now: i64,
    ) -> Result<Option<RenamedArtifact>> {
        let ctx = calls::artifact_context(conn, call_id)?;
        if !ctx.outcome.is_qualified() {
            tracing::debug!("Call {} not qualified yet, recording left as is", call_id);
            return Ok(None);
        }
        let Some(recording_path) = ctx.recording_path.as_deref() else {
            return Ok(None);
        };

        let current = PathBuf::from(recording_path);
        if !self.storage.exists(&current) {
            let err = LeadError::StorageUnavailable(format!(
                "recording {} of call {} is missing",
                recording_path, call_id
            ));
            tracing::warn!("{}", err);
            return Ok(None);
        }

        let stem = file_stem(&ctx, self.max_component_len);
        let Some(target) = self.pick_target(&current, &stem) else {
            tracing::warn!(
                "No free file name for call {} under {}",
                call_id,
                self.treated_dir.display()
            );
            return Ok(None);
        };
        let file_name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| stem.clone());

        let renamed = RenamedArtifact {
            call_id,
            from: current.clone(),
            to: target.clone(),
            file_name,
        };
        if !renamed.moved() {
            return Ok(Some(renamed));
        }

        self.storage.move_file(&current, &target)?;

        let original_name = current
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| recording_path.to_string());
        if let Err(e) = calls::record_rename(
            conn,
            call_id,
            &target.to_string_lossy(),
            &original_name,
            now,
        ) {
            self.undo(std::slice::from_ref(&renamed));
            return Err(e);
        }

        tracing::info!(
            "Renamed recording of call {}: {} -> {}",
            call_id,
            current.display(),
            target.display()
        );
        Ok(Some(renamed))
    }

    /// Moves files back, newest first. Failures are logged; the database
    /// side is expected to roll back with its transaction.
    pub fn undo(&self, renamed: &[RenamedArtifact]) {
        for artifact in renamed.iter().rev().filter(|a| a.moved()) {
            if let Err(e) = self.storage.move_file(&artifact.to, &artifact.from) {
                tracing::error!(
                    "Failed to restore recording of call {} to {}: {}",
                    artifact.call_id,
                    artifact.from.display(),
                    e
                );
            }
        }
    }

    /// Standalone rename of one call's recording in its own transaction.
    pub async fn rename(&self, call_id: i64) -> Result<Option<String>> {
        let now = self.clock.timestamp();
        let mut conn = self.db_conn.lock().await?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let renamed = self.rename_in(&tx, call_id, now)?;
        if let Err(e) = tx.commit() {
            if let Some(artifact) = &renamed {
                self.undo(std::slice::from_ref(artifact));
            }
            return Err(e.into());
        }

        if let Some(artifact) = renamed.as_ref().filter(|a| a.moved()) {
            self.audit.record(AuditEntry {
                action: AuditAction::RecordingRenamed,
                agent_id: None,
                subject_id: call_id,
                detail: serde_json::json!({
                    "from": artifact.from.to_string_lossy(),
                    "to": artifact.to.to_string_lossy(),
                }),
                at: now,
            });
        }

        Ok(renamed.map(|artifact| artifact.file_name))
    }
}
