//! Campaign health scoring.
//!
//! Five component scores on a 0-100 scale are combined with fixed weights
//! that must sum to exactly 1.0; the scorer refuses to construct otherwise.
//! Compliance uses a multiplicative penalty model so that violations drag
//! the overall score disproportionately, and detected issues subtract
//! severity-based penalties from the components they implicate.

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::core::{
    CampaignConfig, HealthScore, IssueType, PerformanceIssue, PerformanceMetrics, Severity, Trend,
};
use crate::errors::{EngineError, Result};

/// Multiplier applied once per distinct violation type present.
const COMPLIANCE_DECAY: f64 = 0.8;

/// Caps on each efficiency penalty contribution.
const DROP_OFF_PENALTY_CAP: f64 = 40.0;
const ESCALATION_PENALTY_CAP: f64 = 40.0;
const FAILURE_PENALTY_CAP: f64 = 20.0;

/// WoW revenue change, in percent, separating stable from trending.
const TREND_BAND: f64 = 3.0;

#[derive(Debug)]
pub struct HealthScorer {
    campaign: CampaignConfig,
    config: AnalysisConfig,
}

impl HealthScorer {
    /// Fails fast on weights that do not sum to 1.0 or targets that would
    /// leave a ratio denominator at zero. Never renormalizes.
    pub fn new(campaign: CampaignConfig, config: AnalysisConfig) -> Result<Self> {
        config.weights.validate()?;
        if campaign.target_conversion_rate <= 0.0 {
            return Err(EngineError::Configuration(
                "target_conversion_rate must be positive".to_string(),
            ));
        }
        if campaign.target_revenue_per_call <= 0.0 {
            return Err(EngineError::Configuration(
                "target_revenue_per_call must be positive".to_string(),
            ));
        }
        Ok(Self { campaign, config })
    }

    pub fn score(
        &self,
        metrics: &PerformanceMetrics,
        issues: &[PerformanceIssue],
        previous: Option<&PerformanceMetrics>,
    ) -> HealthScore {
        let conversion = apply_issue_penalty(self.score_conversion(metrics), issues, "conversion");
        let revenue = apply_issue_penalty(self.score_revenue(metrics), issues, "revenue");
        let compliance = apply_issue_penalty(self.score_compliance(metrics), issues, "compliance");
        let efficiency = score_efficiency(metrics);
        let quality = score_quality(metrics);

        let weights = &self.config.weights;
        let overall = conversion * weights.conversion
            + revenue * weights.revenue
            + compliance * weights.compliance
            + efficiency * weights.efficiency
            + quality * weights.quality;
        let overall_score = overall.round().clamp(0.0, 100.0) as u8;

        let (trend, week_over_week_change) = trend_against(metrics, previous);

        let mut components = BTreeMap::new();
        components.insert("conversion".to_string(), conversion);
        components.insert("revenue".to_string(), revenue);
        components.insert("compliance".to_string(), compliance);
        components.insert("efficiency".to_string(), efficiency);
        components.insert("quality".to_string(), quality);

        HealthScore {
            overall_score,
            components,
            trend,
            week_over_week_change,
        }
    }

    fn score_conversion(&self, metrics: &PerformanceMetrics) -> f64 {
        ratio_to_score(
            metrics.conversion_rate,
            self.campaign.target_conversion_rate,
        )
    }

    fn score_revenue(&self, metrics: &PerformanceMetrics) -> f64 {
        let expected = self.campaign.target_revenue_per_call * metrics.total_calls as f64;
        ratio_to_score(metrics.total_revenue, expected)
    }

    /// Strict penalty model: each distinct violation type compounds.
    fn score_compliance(&self, metrics: &PerformanceMetrics) -> f64 {
        let mut distinct_types = metrics.compliance_flag_types.len();
        if distinct_types == 0 && metrics.compliance_violations > 0 {
            // Terminal compliance_violation status without a flag still
            // counts as one violation type.
            distinct_types = 1;
        }
        (100.0 * COMPLIANCE_DECAY.powi(distinct_types as i32)).clamp(0.0, 100.0)
    }
}

fn ratio_to_score(actual: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (100.0 * actual / target).clamp(0.0, 100.0)
}

fn score_efficiency(metrics: &PerformanceMetrics) -> f64 {
    let drop_penalty = (metrics.drop_off_rate * 100.0).min(DROP_OFF_PENALTY_CAP);
    let escalation_penalty = (metrics.escalation_rate * 100.0).min(ESCALATION_PENALTY_CAP);
    let failure_penalty = (metrics.failure_rate * 200.0).min(FAILURE_PENALTY_CAP);
    (100.0 - drop_penalty - escalation_penalty - failure_penalty).clamp(0.0, 100.0)
}

/// Rescale average sentiment from [-1, 1] to [0, 100].
fn score_quality(metrics: &PerformanceMetrics) -> f64 {
    ((metrics.avg_sentiment + 1.0) / 2.0 * 100.0).clamp(0.0, 100.0)
}

/// Components a given issue type drags down.
fn penalized_components(issue_type: IssueType) -> &'static [&'static str] {
    match issue_type {
        IssueType::LowConversion | IssueType::HighDropOff => &["conversion", "revenue"],
        IssueType::ComplianceViolation => &["compliance"],
        IssueType::EscalationSpike | IssueType::TechnicalFailure => &[],
    }
}

fn severity_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 20.0,
        Severity::High => 12.0,
        Severity::Medium => 6.0,
        Severity::Low => 2.0,
    }
}

fn apply_issue_penalty(score: f64, issues: &[PerformanceIssue], component: &str) -> f64 {
    let penalty: f64 = issues
        .iter()
        .filter(|issue| penalized_components(issue.issue_type).contains(&component))
        .map(|issue| severity_penalty(issue.severity))
        .sum();
    (score - penalty).clamp(0.0, 100.0)
}

fn trend_against(
    current: &PerformanceMetrics,
    previous: Option<&PerformanceMetrics>,
) -> (Trend, f64) {
    let Some(previous) = previous else {
        return (Trend::Unknown, 0.0);
    };
    if previous.total_revenue == 0.0 {
        return if current.total_revenue > 0.0 {
            (Trend::Improving, 100.0)
        } else {
            (Trend::Stable, 0.0)
        };
    }
    let change =
        (current.total_revenue - previous.total_revenue) / previous.total_revenue * 100.0;
    let trend = if change > TREND_BAND {
        Trend::Improving
    } else if change < -TREND_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    };
    (trend, change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallRecord, CallStatus, DropOffStage};
    use crate::metrics::MetricAggregator;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn campaign() -> CampaignConfig {
        CampaignConfig {
            campaign_id: "camp-1".to_string(),
            campaign_name: "Spring outbound".to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            target_calls_per_day: 200,
            target_conversion_rate: 0.15,
            target_revenue_per_call: 75.0,
            avg_deal_value: 500.0,
            compliance_rules: Vec::new(),
            script_versions: Vec::new(),
        }
    }

    fn scorer() -> HealthScorer {
        HealthScorer::new(campaign(), AnalysisConfig::default()).unwrap()
    }

    fn record(id: &str, status: CallStatus, cv: f64, ar: f64, sentiment: f64) -> CallRecord {
        CallRecord {
            call_id: id.to_string(),
            campaign_id: "camp-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
            duration_seconds: 240,
            status,
            drop_off_stage: if status == CallStatus::Dropped {
                Some(DropOffStage::Intro)
            } else {
                None
            },
            escalation_reason: None,
            compliance_flags: BTreeSet::new(),
            conversion_value: cv,
            actual_revenue: ar,
            sentiment_score: sentiment,
            script_version: "v1".to_string(),
            agent_id: None,
        }
    }

    fn metrics_for(records: &[CallRecord]) -> PerformanceMetrics {
        MetricAggregator::aggregate("camp-1", records, None).unwrap()
    }

    #[test]
    fn construction_rejects_bad_weights() {
        let mut config = AnalysisConfig::default();
        config.weights.quality = 0.50;
        let err = HealthScorer::new(campaign(), config).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn construction_rejects_zero_targets() {
        let mut bad = campaign();
        bad.target_conversion_rate = 0.0;
        assert!(HealthScorer::new(bad, AnalysisConfig::default()).is_err());

        let mut bad = campaign();
        bad.target_revenue_per_call = -1.0;
        assert!(HealthScorer::new(bad, AnalysisConfig::default()).is_err());
    }

    #[test]
    fn perfect_period_scores_near_maximum() {
        // Every call converts at target revenue with perfect sentiment.
        let records: Vec<CallRecord> = (0..10)
            .map(|i| record(&format!("c{i}"), CallStatus::Completed, 75.0, 75.0, 1.0))
            .collect();
        let score = scorer().score(&metrics_for(&records), &[], None);
        assert_eq!(score.overall_score, 100);
        assert_eq!(score.trend, Trend::Unknown);
    }

    #[test]
    fn all_zero_input_stays_in_range() {
        let snapshot = MetricAggregator::empty_snapshot("camp-1", None);
        let score = scorer().score(&snapshot, &[], None);
        assert!(score.overall_score <= 100);
        assert_eq!(score.components["conversion"], 0.0);
        assert_eq!(score.components["compliance"], 100.0);
        assert_eq!(score.components["quality"], 50.0);
    }

    #[test]
    fn compliance_penalty_is_multiplicative() {
        let mut r1 = record("a", CallStatus::Completed, 75.0, 75.0, 0.5);
        r1.compliance_flags.insert("missing_disclosure".to_string());
        let mut r2 = record("b", CallStatus::Completed, 75.0, 75.0, 0.5);
        r2.compliance_flags.insert("dnc_breach".to_string());
        let clean: Vec<CallRecord> = (0..8)
            .map(|i| record(&format!("c{i}"), CallStatus::Completed, 75.0, 75.0, 0.5))
            .collect();

        let mut one_type = clean.clone();
        one_type.push(r1.clone());
        let mut two_types = clean;
        two_types.push(r1);
        two_types.push(r2);

        let one = scorer().score(&metrics_for(&one_type), &[], None);
        let two = scorer().score(&metrics_for(&two_types), &[], None);
        assert!((one.components["compliance"] - 80.0).abs() < 1e-9);
        assert!((two.components["compliance"] - 64.0).abs() < 1e-9);
    }

    #[test]
    fn issue_penalties_drag_their_components() {
        let records: Vec<CallRecord> = (0..10)
            .map(|i| record(&format!("c{i}"), CallStatus::Completed, 75.0, 75.0, 0.0))
            .collect();
        let metrics = metrics_for(&records);
        let issue = PerformanceIssue {
            issue_type: IssueType::LowConversion,
            severity: Severity::High,
            revenue_impact: 1000.0,
            affected_calls: 10,
            root_cause: "below target".to_string(),
            contributing_factors: Vec::new(),
            problematic_stage: None,
            call_ids: Vec::new(),
            evidence: BTreeMap::new(),
        };

        let without = scorer().score(&metrics, &[], None);
        let with = scorer().score(&metrics, &[issue], None);
        assert!(
            (without.components["conversion"] - with.components["conversion"] - 12.0).abs() < 1e-9
        );
        assert!((without.components["revenue"] - with.components["revenue"] - 12.0).abs() < 1e-9);
        assert_eq!(without.components["compliance"], with.components["compliance"]);
    }

    #[test]
    fn trend_classification_uses_three_percent_band() {
        let current = metrics_for(&[record("a", CallStatus::Completed, 100.0, 104.0, 0.0)]);
        let previous = metrics_for(&[record("b", CallStatus::Completed, 100.0, 100.0, 0.0)]);
        let score = scorer().score(&current, &[], Some(&previous));
        assert_eq!(score.trend, Trend::Improving);
        assert!((score.week_over_week_change - 4.0).abs() < 1e-9);

        let flat = metrics_for(&[record("c", CallStatus::Completed, 100.0, 101.0, 0.0)]);
        let score = scorer().score(&flat, &[], Some(&previous));
        assert_eq!(score.trend, Trend::Stable);

        let down = metrics_for(&[record("d", CallStatus::Completed, 100.0, 90.0, 0.0)]);
        let score = scorer().score(&down, &[], Some(&previous));
        assert_eq!(score.trend, Trend::Declining);
    }

    #[test]
    fn missing_previous_period_reports_unknown() {
        let current = metrics_for(&[record("a", CallStatus::Completed, 100.0, 100.0, 0.0)]);
        let score = scorer().score(&current, &[], None);
        assert_eq!(score.trend, Trend::Unknown);
        assert_eq!(score.week_over_week_change, 0.0);
    }
}
