//! Contributing-factor analysis behind detected issues.
//!
//! These helpers inspect the raw records for patterns worth surfacing next
//! to an issue (weak scripts, frustrated callers, stage-specific timing).
//! They only produce human-readable strings; no thresholds here feed back
//! into detection.

use std::collections::BTreeMap;

use crate::core::{CallRecord, CallStatus, DropOffStage};

/// Why conversions are lagging: sentiment, engagement, weak script versions.
pub fn conversion_factors(records: &[CallRecord], target_rate: f64) -> Vec<String> {
    let mut factors = Vec::new();

    if !records.is_empty() {
        let avg_sentiment: f64 =
            records.iter().map(|r| r.sentiment_score).sum::<f64>() / records.len() as f64;
        if avg_sentiment < 0.0 {
            factors.push(format!(
                "Negative average sentiment score: {avg_sentiment:.2}"
            ));
        }
    }

    let completed: Vec<&CallRecord> = records
        .iter()
        .filter(|r| r.status == CallStatus::Completed)
        .collect();
    if !completed.is_empty() {
        let avg_duration: f64 = completed
            .iter()
            .map(|r| r.duration_seconds as f64)
            .sum::<f64>()
            / completed.len() as f64;
        if avg_duration < 180.0 {
            factors.push(format!(
                "Very short call duration ({:.1} min) suggests low engagement",
                avg_duration / 60.0
            ));
        }
    }

    // Script versions converting well below target.
    let mut per_script: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = per_script.entry(record.script_version.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if record.is_conversion() {
            entry.1 += 1;
        }
    }
    for (script, (total, converted)) in &per_script {
        if *total == 0 || script.is_empty() {
            continue;
        }
        let rate = *converted as f64 / *total as f64;
        if rate < target_rate * 0.7 {
            factors.push(format!(
                "Script version {script} has low conversion rate: {:.1}%",
                rate * 100.0
            ));
        }
    }

    if factors.is_empty() {
        factors.push("Multiple factors affecting conversion; requires deeper analysis".to_string());
    }
    factors
}

/// Why calls are abandoning at the worst stage.
pub fn drop_off_factors(records: &[CallRecord], stage: Option<DropOffStage>) -> Vec<String> {
    let mut factors = Vec::new();

    if let Some(stage) = stage {
        let stage_drops: Vec<&CallRecord> = records
            .iter()
            .filter(|r| r.drop_off_stage == Some(stage))
            .collect();
        if !stage_drops.is_empty() {
            let avg_duration: f64 = stage_drops
                .iter()
                .map(|r| r.duration_seconds as f64)
                .sum::<f64>()
                / stage_drops.len() as f64;
            let avg_sentiment: f64 = stage_drops
                .iter()
                .map(|r| r.sentiment_score)
                .sum::<f64>()
                / stage_drops.len() as f64;

            factors.push(format!("Stage '{stage}' has the highest drop-off"));
            factors.push(format!(
                "Average duration before drop: {:.1} minutes",
                avg_duration / 60.0
            ));
            if avg_sentiment < -0.2 {
                factors.push(format!(
                    "Negative sentiment ({avg_sentiment:.2}) indicates caller frustration"
                ));
            }
            if stage == DropOffStage::Intro && avg_duration < 30.0 {
                factors.push(
                    "Callers hang up within 30 seconds; intro is too long or unengaging"
                        .to_string(),
                );
            } else if stage == DropOffStage::Pitch && avg_duration > 300.0 {
                factors.push("Pitch phase runs long and loses attention".to_string());
            }
        }
    }

    if factors.is_empty() {
        factors.push("High overall drop-off across multiple stages".to_string());
    }
    factors
}

/// Escalation reasons ranked by count; deterministic across runs.
pub fn escalation_reasons(records: &[CallRecord]) -> BTreeMap<String, usize> {
    let mut reasons = BTreeMap::new();
    for record in records {
        if record.status == CallStatus::Escalated {
            if let Some(reason) = &record.escalation_reason {
                *reasons.entry(reason.clone()).or_insert(0) += 1;
            }
        }
    }
    reasons
}

/// Compliance flags ranked by count.
pub fn compliance_flag_counts(records: &[CallRecord]) -> BTreeMap<String, usize> {
    let mut flags = BTreeMap::new();
    for record in records {
        for flag in &record.compliance_flags {
            *flags.entry(flag.clone()).or_insert(0) += 1;
        }
    }
    flags
}

/// Most frequent entry; ties resolved by the map's key order.
pub fn top_entry(counts: &BTreeMap<String, usize>) -> Option<(String, usize)> {
    counts
        .iter()
        .fold(None::<(&String, usize)>, |best, (key, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((key, count)),
        })
        .map(|(key, count)| (key.clone(), count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_entry_prefers_count_then_key_order() {
        let mut counts = BTreeMap::new();
        counts.insert("billing".to_string(), 3);
        counts.insert("angry_caller".to_string(), 3);
        counts.insert("pricing".to_string(), 1);
        // Equal counts: the lexically first key wins.
        assert_eq!(top_entry(&counts), Some(("angry_caller".to_string(), 3)));
    }

    #[test]
    fn top_entry_empty_is_none() {
        assert_eq!(top_entry(&BTreeMap::new()), None);
    }
}
