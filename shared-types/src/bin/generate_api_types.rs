use shared_types::*;
use std::fs;
use std::path::PathBuf;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for API types
    let mut types = Vec::new();

    // Contact types
    types.push(clean_type(ContactStatus::export_to_string()?));
    types.push(clean_type(RecycleReason::export_to_string()?));
    types.push(clean_type(DispatchState::export_to_string()?));
    types.push(clean_type(Contact::export_to_string()?));
    types.push(clean_type(CreateContactRequest::export_to_string()?));
    types.push(clean_type(ListContactsQuery::export_to_string()?));
    types.push(clean_type(ContactsResponse::export_to_string()?));
    types.push(clean_type(NoticeKind::export_to_string()?));
    types.push(clean_type(ContactNotice::export_to_string()?));

    // Call ledger types
    types.push(clean_type(CallOutcome::export_to_string()?));
    types.push(clean_type(RecordingStatus::export_to_string()?));
    types.push(clean_type(CallRecord::export_to_string()?));
    types.push(clean_type(LogCallRequest::export_to_string()?));
    types.push(clean_type(CallsResponse::export_to_string()?));
    types.push(clean_type(RenameResponse::export_to_string()?));

    // Agent and scope types
    types.push(clean_type(AgentRole::export_to_string()?));
    types.push(clean_type(Agent::export_to_string()?));
    types.push(clean_type(CreateAgentRequest::export_to_string()?));
    types.push(clean_type(AgentAssignment::export_to_string()?));
    types.push(clean_type(CreateAssignmentRequest::export_to_string()?));
    types.push(clean_type(SourceDatabase::export_to_string()?));
    types.push(clean_type(CreateSourceDatabaseRequest::export_to_string()?));
    types.push(clean_type(Campaign::export_to_string()?));
    types.push(clean_type(CreateCampaignRequest::export_to_string()?));

    // Recycling types
    types.push(clean_type(RecyclePolicy::export_to_string()?));
    types.push(clean_type(UpdateRecyclePolicyRequest::export_to_string()?));
    types.push(clean_type(RecycleNowResponse::export_to_string()?));

    // Qualification types
    types.push(clean_type(QualifyTarget::export_to_string()?));
    types.push(clean_type(QualifyRequest::export_to_string()?));
    types.push(clean_type(QualificationResponse::export_to_string()?));

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bindings"));
    fs::create_dir_all(&output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // Everything lands in one file, so cross-type imports are dropped
    let filtered: Vec<&str> = type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
