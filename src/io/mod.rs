//! Ingestion boundary: JSON loading and record validation.
//!
//! The engine assumes clean input; everything entering from disk passes
//! through `validate_records` first. Validation errors name the offending
//! call so operators can fix the export, not guess.

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::core::{CallRecord, CallStatus, CampaignConfig};
use crate::errors::{EngineError, Result};

const MAX_CALL_DURATION_SECONDS: u32 = 7200;

/// Read a JSON array of call records from disk.
pub fn load_records(path: &Path) -> anyhow::Result<Vec<CallRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read call records from {}", path.display()))?;
    let records: Vec<CallRecord> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse call records in {}", path.display()))?;
    log::debug!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read a campaign configuration from disk.
pub fn load_campaign(path: &Path) -> anyhow::Result<CampaignConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read campaign config from {}", path.display()))?;
    let campaign: CampaignConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse campaign config in {}", path.display()))?;
    Ok(campaign)
}

/// Check every record for structural problems before analysis.
///
/// Rejects duplicate or empty call identifiers, out-of-range durations and
/// sentiment, negative revenue figures, and status-dependent fields present
/// on the wrong status (a drop-off stage on a completed call, an escalation
/// reason on a dropped one).
pub fn validate_records(records: &[CallRecord]) -> Result<()> {
    let mut seen = std::collections::HashSet::with_capacity(records.len());
    for record in records {
        validate_record(record)?;
        if !seen.insert(record.call_id.as_str()) {
            return Err(EngineError::Validation(format!(
                "duplicate call_id '{}'",
                record.call_id
            )));
        }
    }
    Ok(())
}

fn validate_record(record: &CallRecord) -> Result<()> {
    let id = &record.call_id;
    if id.is_empty() {
        return Err(EngineError::Validation(
            "call record with empty call_id".to_string(),
        ));
    }
    if record.duration_seconds > MAX_CALL_DURATION_SECONDS {
        return Err(EngineError::Validation(format!(
            "call '{id}': duration {}s exceeds {MAX_CALL_DURATION_SECONDS}s",
            record.duration_seconds
        )));
    }
    if !(-1.0..=1.0).contains(&record.sentiment_score) {
        return Err(EngineError::Validation(format!(
            "call '{id}': sentiment_score {} outside [-1, 1]",
            record.sentiment_score
        )));
    }
    if record.conversion_value < 0.0 {
        return Err(EngineError::Validation(format!(
            "call '{id}': negative conversion_value"
        )));
    }
    if record.actual_revenue < 0.0 {
        return Err(EngineError::Validation(format!(
            "call '{id}': negative actual_revenue"
        )));
    }
    if record.drop_off_stage.is_some() && record.status != CallStatus::Dropped {
        return Err(EngineError::Validation(format!(
            "call '{id}': drop_off_stage set but status is not dropped"
        )));
    }
    if record.status == CallStatus::Dropped && record.drop_off_stage.is_none() {
        return Err(EngineError::Validation(format!(
            "call '{id}': dropped call missing drop_off_stage"
        )));
    }
    if record.escalation_reason.is_some() && record.status != CallStatus::Escalated {
        return Err(EngineError::Validation(format!(
            "call '{id}': escalation_reason set but status is not escalated"
        )));
    }
    if record.agent_id.is_some() && record.status != CallStatus::Escalated {
        return Err(EngineError::Validation(format!(
            "call '{id}': agent_id set but status is not escalated"
        )));
    }
    Ok(())
}
