//! Issue detection: compares a metrics snapshot against campaign targets and
//! fixed benchmarks.
//!
//! Each rule is independent and may co-fire, but no two issues share an
//! issue type for the same period. The returned list is ordered by revenue
//! impact descending, with ties broken by severity rank and then issue-type
//! name, so detection is fully deterministic.

pub mod factors;

use serde_json::json;
use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::core::{
    CallRecord, CallStatus, CampaignConfig, DropOffStage, IssueType, PerformanceIssue,
    PerformanceMetrics, Severity,
};

pub struct IssueDetector {
    campaign: CampaignConfig,
    config: AnalysisConfig,
}

impl IssueDetector {
    pub fn new(campaign: CampaignConfig, config: AnalysisConfig) -> Self {
        Self { campaign, config }
    }

    /// Run all detection rules over one period.
    ///
    /// An insufficient-data snapshot yields no issues; there is nothing to
    /// detect against.
    pub fn detect(
        &self,
        metrics: &PerformanceMetrics,
        records: &[CallRecord],
    ) -> Vec<PerformanceIssue> {
        if metrics.insufficient_data {
            return Vec::new();
        }

        let mut issues: Vec<PerformanceIssue> = [
            self.detect_low_conversion(metrics, records),
            self.detect_high_drop_off(metrics, records),
            self.detect_escalation_spike(metrics, records),
            self.detect_compliance_violation(metrics, records),
            self.detect_technical_failure(metrics, records),
        ]
        .into_iter()
        .flatten()
        .collect();

        issues.sort_by(|a, b| {
            b.revenue_impact
                .total_cmp(&a.revenue_impact)
                .then_with(|| a.severity.rank().cmp(&b.severity.rank()))
                .then_with(|| a.issue_type.as_str().cmp(b.issue_type.as_str()))
        });
        log::debug!("detected {} issues", issues.len());
        issues
    }

    fn detect_low_conversion(
        &self,
        metrics: &PerformanceMetrics,
        records: &[CallRecord],
    ) -> Option<PerformanceIssue> {
        let target = self.campaign.target_conversion_rate;
        let actual = metrics.conversion_rate;
        if target <= 0.0 || actual >= target * self.config.detection.low_conversion_ratio {
            return None;
        }

        let relative_gap = (target - actual) / target;
        let severity = if relative_gap > self.config.detection.conversion_gap_critical {
            Severity::Critical
        } else if relative_gap > self.config.detection.conversion_gap_high {
            Severity::High
        } else {
            Severity::Medium
        };
        let lost_conversions = (target - actual) * metrics.total_calls as f64;
        let revenue_impact = (lost_conversions * self.campaign.avg_deal_value).max(0.0);

        let call_ids = ids_matching(records, |r| {
            r.status == CallStatus::Completed && !r.is_conversion()
        });

        let mut evidence = BTreeMap::new();
        evidence.insert("target_rate".to_string(), json!(target));
        evidence.insert("actual_rate".to_string(), json!(actual));
        evidence.insert("relative_gap".to_string(), json!(relative_gap));
        evidence.insert("lost_conversions".to_string(), json!(lost_conversions));

        Some(PerformanceIssue {
            issue_type: IssueType::LowConversion,
            severity,
            revenue_impact,
            affected_calls: metrics.total_calls,
            root_cause: format!(
                "Conversion rate {:.1}% is {:.1}% below target {:.1}%",
                actual * 100.0,
                relative_gap * 100.0,
                target * 100.0
            ),
            contributing_factors: factors::conversion_factors(records, target),
            problematic_stage: None,
            call_ids,
            evidence,
        })
    }

    fn detect_high_drop_off(
        &self,
        metrics: &PerformanceMetrics,
        records: &[CallRecord],
    ) -> Option<PerformanceIssue> {
        if metrics.drop_off_rate <= self.config.detection.high_drop_off_rate {
            return None;
        }

        let severity = if metrics.drop_off_rate > self.config.detection.critical_drop_off_rate {
            Severity::High
        } else {
            Severity::Medium
        };
        let worst_stage = worst_drop_off_stage(&metrics.drop_off_breakdown);
        let revenue_impact = sum_conversion_value(records, |r| r.status == CallStatus::Dropped);
        let call_ids = ids_matching(records, |r| r.status == CallStatus::Dropped);

        let mut evidence = BTreeMap::new();
        evidence.insert("drop_off_rate".to_string(), json!(metrics.drop_off_rate));
        evidence.insert(
            "drop_off_by_stage".to_string(),
            json!(metrics
                .drop_off_breakdown
                .iter()
                .map(|(stage, count)| (stage.as_str().to_string(), *count))
                .collect::<BTreeMap<String, usize>>()),
        );
        if let Some(stage) = worst_stage {
            evidence.insert("worst_stage".to_string(), json!(stage.as_str()));
        }

        Some(PerformanceIssue {
            issue_type: IssueType::HighDropOff,
            severity,
            revenue_impact,
            affected_calls: metrics.dropped_calls,
            root_cause: format!(
                "High drop-off rate of {:.1}% (threshold: {:.1}%)",
                metrics.drop_off_rate * 100.0,
                self.config.detection.high_drop_off_rate * 100.0
            ),
            contributing_factors: factors::drop_off_factors(records, worst_stage),
            problematic_stage: worst_stage,
            call_ids,
            evidence,
        })
    }

    fn detect_escalation_spike(
        &self,
        metrics: &PerformanceMetrics,
        records: &[CallRecord],
    ) -> Option<PerformanceIssue> {
        let benchmark = self.config.benchmarks.escalation_rate;
        let threshold = benchmark * self.config.detection.escalation_spike_factor;
        if metrics.escalation_rate <= threshold {
            return None;
        }

        let reasons = factors::escalation_reasons(records);
        let top_reason = factors::top_entry(&reasons);
        let revenue_impact = sum_conversion_value(records, |r| r.status == CallStatus::Escalated);
        let call_ids = ids_matching(records, |r| r.status == CallStatus::Escalated);

        let mut contributing_factors = Vec::new();
        if let Some((reason, count)) = &top_reason {
            contributing_factors.push(format!("Top escalation reason: {reason} ({count} calls)"));
        }
        contributing_factors.push(format!(
            "Escalation rate {:.1}% vs benchmark {:.1}%",
            metrics.escalation_rate * 100.0,
            benchmark * 100.0
        ));
        contributing_factors
            .push("Bot unable to handle complex objections or questions".to_string());

        let mut evidence = BTreeMap::new();
        evidence.insert(
            "escalation_rate".to_string(),
            json!(metrics.escalation_rate),
        );
        evidence.insert("escalation_reasons".to_string(), json!(reasons));
        if let Some((reason, _)) = &top_reason {
            evidence.insert("top_reason".to_string(), json!(reason));
        }

        Some(PerformanceIssue {
            issue_type: IssueType::EscalationSpike,
            severity: Severity::Medium,
            revenue_impact,
            affected_calls: metrics.escalated_calls,
            root_cause: format!(
                "Escalation rate {:.1}% is {:.0}% above benchmark",
                metrics.escalation_rate * 100.0,
                (metrics.escalation_rate / benchmark - 1.0) * 100.0
            ),
            contributing_factors,
            problematic_stage: None,
            call_ids,
            evidence,
        })
    }

    /// Zero tolerance: a single flagged call fires a Critical issue.
    fn detect_compliance_violation(
        &self,
        metrics: &PerformanceMetrics,
        records: &[CallRecord],
    ) -> Option<PerformanceIssue> {
        if metrics.compliance_violations == 0 {
            return None;
        }

        let flag_counts = factors::compliance_flag_counts(records);
        let top_violation = factors::top_entry(&flag_counts);
        let revenue_impact = sum_conversion_value(records, CallRecord::has_compliance_violation);
        let call_ids = ids_matching(records, CallRecord::has_compliance_violation);

        let mut contributing_factors = Vec::new();
        if let Some((flag, count)) = &top_violation {
            contributing_factors.push(format!(
                "Most common violation: {flag} ({count} occurrences)"
            ));
        }
        contributing_factors.push(format!(
            "{} of {} calls carry compliance flags",
            metrics.compliance_violations, metrics.total_calls
        ));
        contributing_factors.push("Risk of regulatory fines and brand damage".to_string());

        let mut evidence = BTreeMap::new();
        evidence.insert("violation_types".to_string(), json!(flag_counts));
        evidence.insert(
            "violation_count".to_string(),
            json!(metrics.compliance_violations),
        );
        if let Some((flag, _)) = &top_violation {
            evidence.insert("top_violation".to_string(), json!(flag));
        }

        Some(PerformanceIssue {
            issue_type: IssueType::ComplianceViolation,
            severity: Severity::Critical,
            revenue_impact,
            affected_calls: metrics.compliance_violations,
            root_cause: format!(
                "{} compliance violation(s) detected; required clean rate is {:.0}%",
                metrics.compliance_violations,
                self.config.benchmarks.compliance_rate * 100.0
            ),
            contributing_factors,
            problematic_stage: None,
            call_ids,
            evidence,
        })
    }

    fn detect_technical_failure(
        &self,
        metrics: &PerformanceMetrics,
        records: &[CallRecord],
    ) -> Option<PerformanceIssue> {
        if metrics.failure_rate <= self.config.detection.technical_failure_rate {
            return None;
        }

        let revenue_impact = sum_conversion_value(records, |r| r.status == CallStatus::Failed);
        let call_ids = ids_matching(records, |r| r.status == CallStatus::Failed);

        let mut evidence = BTreeMap::new();
        evidence.insert("failure_rate".to_string(), json!(metrics.failure_rate));
        evidence.insert("failed_calls".to_string(), json!(metrics.failed_calls));

        Some(PerformanceIssue {
            issue_type: IssueType::TechnicalFailure,
            severity: Severity::High,
            revenue_impact,
            affected_calls: metrics.failed_calls,
            root_cause: format!(
                "Technical failure rate of {:.1}% affecting {} calls",
                metrics.failure_rate * 100.0,
                metrics.failed_calls
            ),
            contributing_factors: vec![
                format!(
                    "{} calls failed to complete due to technical errors",
                    metrics.failed_calls
                ),
                "Potential infrastructure, API, or telephony problems".to_string(),
            ],
            problematic_stage: None,
            call_ids,
            evidence,
        })
    }
}

fn sum_conversion_value(records: &[CallRecord], predicate: impl Fn(&CallRecord) -> bool) -> f64 {
    records
        .iter()
        .filter(|r| predicate(r))
        .map(|r| r.conversion_value)
        .sum()
}

fn ids_matching(records: &[CallRecord], predicate: impl Fn(&CallRecord) -> bool) -> Vec<String> {
    records
        .iter()
        .filter(|r| predicate(r))
        .map(|r| r.call_id.clone())
        .collect()
}

/// Stage with the most drops; ties resolved by funnel order.
fn worst_drop_off_stage(breakdown: &BTreeMap<DropOffStage, usize>) -> Option<DropOffStage> {
    breakdown
        .iter()
        .fold(None::<(DropOffStage, usize)>, |best, (&stage, &count)| {
            match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((stage, count)),
            }
        })
        .map(|(stage, _)| stage)
}
