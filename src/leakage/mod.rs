//! Revenue leakage attribution.
//!
//! Every call whose conversion value exceeds realized revenue contributes
//! its gap to exactly one source bucket, chosen by priority: compliance
//! violation, then escalation, then drop-off, then technical failure, then
//! generic no-conversion. The same gaps are independently partitioned by
//! funnel stage, so both breakdowns sum to the total. Attribution is a map
//! plus commutative reduce over fixed-size input shards merged in chunk
//! order, the same deterministic shape as metric aggregation; ranking
//! happens only after the full merge.

use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::core::{
    CallRecord, CallStatus, CampaignConfig, PerformanceMetrics, RecoveryDifficulty, RevenueLeakage,
};
use crate::metrics::SHARD_SIZE;

/// Stage key for leakage that occurred after the funnel completed (the call
/// was not dropped mid-funnel).
const STAGE_FULL_CONVERSATION: &str = "full_conversation";

/// Cause bucket a revenue gap is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakSource {
    ComplianceViolation,
    Escalation,
    DropOff,
    TechnicalFailure,
    NoConversion,
}

impl LeakSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeakSource::ComplianceViolation => "compliance_violation",
            LeakSource::Escalation => "escalation",
            LeakSource::DropOff => "drop_off",
            LeakSource::TechnicalFailure => "technical_failure",
            LeakSource::NoConversion => "no_conversion",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "compliance_violation" => Some(LeakSource::ComplianceViolation),
            "escalation" => Some(LeakSource::Escalation),
            "drop_off" => Some(LeakSource::DropOff),
            "technical_failure" => Some(LeakSource::TechnicalFailure),
            "no_conversion" => Some(LeakSource::NoConversion),
            _ => None,
        }
    }

    /// Attribution priority; compliance wins over everything else.
    fn classify(record: &CallRecord) -> Self {
        if record.has_compliance_violation() {
            LeakSource::ComplianceViolation
        } else if record.status == CallStatus::Escalated {
            LeakSource::Escalation
        } else if record.status == CallStatus::Dropped {
            LeakSource::DropOff
        } else if record.status == CallStatus::Failed {
            LeakSource::TechnicalFailure
        } else {
            LeakSource::NoConversion
        }
    }

    fn recovery_rate(&self, config: &AnalysisConfig) -> f64 {
        match self {
            LeakSource::ComplianceViolation => config.recovery.compliance_violation,
            LeakSource::Escalation => config.recovery.escalation,
            LeakSource::DropOff => config.recovery.drop_off,
            LeakSource::TechnicalFailure => config.recovery.technical_failure,
            LeakSource::NoConversion => config.recovery.no_conversion,
        }
    }

    /// Compliance leakage is largely non-recoverable, escalations require
    /// deep bot work; technical fixes are the easy wins.
    fn difficulty(&self) -> RecoveryDifficulty {
        match self {
            LeakSource::TechnicalFailure => RecoveryDifficulty::Low,
            LeakSource::DropOff | LeakSource::NoConversion => RecoveryDifficulty::Medium,
            LeakSource::Escalation | LeakSource::ComplianceViolation => RecoveryDifficulty::High,
        }
    }
}

/// Partial attribution state; merging is commutative.
#[derive(Debug, Clone, Default)]
struct LeakAccumulator {
    by_source: BTreeMap<&'static str, f64>,
    by_stage: BTreeMap<String, f64>,
    total: f64,
}

impl LeakAccumulator {
    fn add(&mut self, record: &CallRecord) {
        let gap = record.revenue_gap();
        if gap <= 0.0 {
            return;
        }
        let source = LeakSource::classify(record);
        *self.by_source.entry(source.as_str()).or_insert(0.0) += gap;

        let stage_key = match record.drop_off_stage {
            Some(stage) => stage.as_str().to_string(),
            None => STAGE_FULL_CONVERSATION.to_string(),
        };
        *self.by_stage.entry(stage_key).or_insert(0.0) += gap;
        self.total += gap;
    }

    fn merge(mut self, other: LeakAccumulator) -> LeakAccumulator {
        for (source, amount) in other.by_source {
            *self.by_source.entry(source).or_insert(0.0) += amount;
        }
        for (stage, amount) in other.by_stage {
            *self.by_stage.entry(stage).or_insert(0.0) += amount;
        }
        self.total += other.total;
        self
    }
}

pub struct LeakageCalculator {
    campaign: CampaignConfig,
    config: AnalysisConfig,
}

impl LeakageCalculator {
    pub fn new(campaign: CampaignConfig, config: AnalysisConfig) -> Self {
        Self { campaign, config }
    }

    pub fn calculate(
        &self,
        records: &[CallRecord],
        metrics: &PerformanceMetrics,
    ) -> RevenueLeakage {
        if records.is_empty() {
            return RevenueLeakage::empty();
        }

        let merged = records
            .par_chunks(SHARD_SIZE)
            .map(|shard| {
                let mut acc = LeakAccumulator::default();
                shard.iter().for_each(|record| acc.add(record));
                acc
            })
            .collect::<Vec<_>>()
            .into_iter()
            .fold(LeakAccumulator::default(), LeakAccumulator::merge);

        let recoverable_amount: f64 = merged
            .by_source
            .iter()
            .filter_map(|(key, amount)| {
                LeakSource::from_key(key).map(|source| amount * source.recovery_rate(&self.config))
            })
            .sum();

        let recovery_difficulty = dominant_source(&merged.by_source)
            .map(|source| source.difficulty())
            .unwrap_or(RecoveryDifficulty::Low);

        let top_3_reasons = top_reasons(&merged.by_source, 3);

        let breakdown_by_source = merged
            .by_source
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();

        log::debug!(
            "attributed {:.2} leakage across {} sources",
            merged.total,
            top_3_reasons.len()
        );

        RevenueLeakage {
            total_leakage: merged.total,
            breakdown_by_source,
            breakdown_by_stage: merged.by_stage,
            recoverable_amount,
            recovery_difficulty,
            top_3_reasons,
            if_conversion_improved: self.conversion_scenario(metrics),
            if_drop_off_reduced: self.drop_off_scenario(metrics),
            if_escalations_handled: self.escalation_scenario(metrics),
        }
    }

    /// Revenue gained by closing the conversion gap to target.
    fn conversion_scenario(&self, metrics: &PerformanceMetrics) -> f64 {
        let gap = (self.campaign.target_conversion_rate - metrics.conversion_rate).max(0.0);
        gap * metrics.total_calls as f64 * self.campaign.avg_deal_value
    }

    /// Revenue gained by rescuing a fraction of dropped calls at the target
    /// conversion rate.
    fn drop_off_scenario(&self, metrics: &PerformanceMetrics) -> f64 {
        metrics.dropped_calls as f64
            * self.config.recovery.drop_off_reduction
            * self.campaign.target_conversion_rate
            * self.campaign.avg_deal_value
    }

    /// Revenue gained by keeping a fraction of escalations in the bot.
    fn escalation_scenario(&self, metrics: &PerformanceMetrics) -> f64 {
        metrics.escalated_calls as f64
            * self.config.recovery.escalation_deflection
            * self.campaign.target_conversion_rate
            * self.campaign.avg_deal_value
    }
}

/// Source with the largest attributed amount; ties resolved by key order.
fn dominant_source(by_source: &BTreeMap<&'static str, f64>) -> Option<LeakSource> {
    by_source
        .iter()
        .fold(None::<(&str, f64)>, |best, (&key, &amount)| match best {
            Some((_, best_amount)) if best_amount >= amount => best,
            _ => Some((key, amount)),
        })
        .and_then(|(key, _)| LeakSource::from_key(key))
}

/// Stable top-N by amount descending, ties by lexical reason name.
fn top_reasons(by_source: &BTreeMap<&'static str, f64>, n: usize) -> Vec<(String, f64)> {
    let mut reasons: Vec<(String, f64)> = by_source
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();
    reasons.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    reasons.truncate(n);
    reasons
}
