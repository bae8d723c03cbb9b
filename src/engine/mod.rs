//! Top-level orchestration: one entry point that runs the full pipeline.
//!
//! `CampaignIntelligence` wires aggregation, detection, leakage, scoring,
//! recommendations, and alerting together. Construction validates campaign
//! and analysis configuration up front; a constructed engine never fails on
//! bad configuration mid-pipeline.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use crate::alerts::AlertSystem;
use crate::config::AnalysisConfig;
use crate::core::{
    Alert, CallRecord, CampaignConfig, HealthScore, IntelligenceReport, IssueDrilldown,
    PerformanceIssue, PerformanceMetrics, QuickStatus, RevenueLeakage, Severity, Trend,
};
use crate::detection::IssueDetector;
use crate::errors::{EngineError, Result};
use crate::leakage::LeakageCalculator;
use crate::metrics::MetricAggregator;
use crate::recommend::RecommendationEngine;
use crate::scoring::HealthScorer;

pub struct CampaignIntelligence {
    campaign: CampaignConfig,
    detector: IssueDetector,
    leakage: LeakageCalculator,
    recommender: RecommendationEngine,
    scorer: HealthScorer,
    alerts: AlertSystem,
}

impl CampaignIntelligence {
    /// Validates configuration before anything runs.
    pub fn new(campaign: CampaignConfig, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let scorer = HealthScorer::new(campaign.clone(), config.clone())?;
        Ok(Self {
            detector: IssueDetector::new(campaign.clone(), config.clone()),
            leakage: LeakageCalculator::new(campaign.clone(), config.clone()),
            recommender: RecommendationEngine::new(),
            scorer,
            alerts: AlertSystem::new(config.alerts),
            campaign,
        })
    }

    /// Full analysis of one period, optionally compared against a prior one.
    ///
    /// An empty current period does not error here: the report carries a
    /// zeroed metrics snapshot with `insufficient_data` set, and detection,
    /// recommendations, and alerting are skipped.
    pub fn analyze(
        &self,
        current: &[CallRecord],
        previous: Option<&[CallRecord]>,
    ) -> Result<IntelligenceReport> {
        let report_date = Utc::now();
        let campaign_id = self.campaign.campaign_id.as_str();

        let metrics = match MetricAggregator::aggregate(campaign_id, current, None) {
            Ok(metrics) => metrics,
            Err(EngineError::InsufficientData) => {
                log::warn!("no records for campaign {campaign_id}; reporting empty snapshot");
                return Ok(self.insufficient_report(report_date));
            }
            Err(err) => return Err(err),
        };

        let issues = self.detector.detect(&metrics, current);
        let leakage = self.leakage.calculate(current, &metrics);
        let recommendations = self.recommender.recommend(&issues, &leakage);

        let previous_metrics = match previous {
            Some(records) if !records.is_empty() => {
                Some(MetricAggregator::aggregate(campaign_id, records, None)?)
            }
            _ => None,
        };
        let health = self
            .scorer
            .score(&metrics, &issues, previous_metrics.as_ref());

        let (alerts, wow_changes) = match &previous_metrics {
            Some(prev) => {
                // Previous health is scored without re-running detection on
                // the old records; issue penalties only apply to the period
                // under analysis.
                let previous_health = self.scorer.score(prev, &[], None);
                let alerts = self
                    .alerts
                    .diff(&metrics, prev, &health, &previous_health, report_date);
                (alerts, wow_changes(&metrics, prev))
            }
            None => (Vec::new(), BTreeMap::new()),
        };

        let summary = executive_summary(&self.campaign, &metrics, &health, &leakage, &issues);
        let key_insights = key_insights(&metrics, &health, &leakage, &wow_changes);
        let urgent_actions = urgent_actions(&issues, &alerts, &recommendations);

        log::info!(
            "campaign {campaign_id}: score {}, {} issues, {} alerts",
            health.overall_score,
            issues.len(),
            alerts.len()
        );

        Ok(IntelligenceReport {
            campaign_id: campaign_id.to_string(),
            report_date,
            period: metrics.period(),
            metrics,
            health_score: health,
            leakage,
            issues: issues.into_iter().collect(),
            recommendations: recommendations.into_iter().collect(),
            alerts: alerts.into_iter().collect(),
            wow_changes,
            summary,
            key_insights,
            urgent_actions,
        })
    }

    /// Cheap health check: metrics and score only, no issue or leakage
    /// analysis.
    pub fn quick_status(&self, records: &[CallRecord]) -> Result<QuickStatus> {
        let campaign_id = self.campaign.campaign_id.as_str();
        let metrics = match MetricAggregator::aggregate(campaign_id, records, None) {
            Ok(metrics) => metrics,
            Err(EngineError::InsufficientData) => {
                MetricAggregator::empty_snapshot(campaign_id, None)
            }
            Err(err) => return Err(err),
        };
        let health = self.scorer.score(&metrics, &[], None);
        Ok(QuickStatus {
            campaign_id: campaign_id.to_string(),
            health_score: health.overall_score,
            health_status: health.status(),
            total_calls: metrics.total_calls,
            conversion_rate: metrics.conversion_rate,
            total_revenue: metrics.total_revenue,
            revenue_leakage: metrics.revenue_leakage,
            insufficient_data: metrics.insufficient_data,
        })
    }

    /// Drill into one issue over the calls it implicates.
    pub fn analyze_specific_issue(
        &self,
        issue: &PerformanceIssue,
        records: &[CallRecord],
    ) -> Result<IssueDrilldown> {
        let ids: HashSet<&str> = issue.call_ids.iter().map(String::as_str).collect();
        let subset: Vec<CallRecord> = records
            .iter()
            .filter(|r| ids.contains(r.call_id.as_str()))
            .cloned()
            .collect();

        let campaign_id = self.campaign.campaign_id.as_str();
        let leakage = if subset.is_empty() {
            RevenueLeakage::empty()
        } else {
            let subset_metrics = MetricAggregator::aggregate(campaign_id, &subset, None)?;
            self.leakage.calculate(&subset, &subset_metrics)
        };
        let recommendations = self
            .recommender
            .recommend(std::slice::from_ref(issue), &leakage);
        let affected_calls_percentage = if records.is_empty() {
            0.0
        } else {
            subset.len() as f64 / records.len() as f64 * 100.0
        };

        Ok(IssueDrilldown {
            issue: issue.clone(),
            leakage,
            recommendations,
            affected_calls_percentage,
        })
    }

    fn insufficient_report(&self, report_date: chrono::DateTime<Utc>) -> IntelligenceReport {
        let metrics =
            MetricAggregator::empty_snapshot(self.campaign.campaign_id.as_str(), None);
        let health = self.scorer.score(&metrics, &[], None);
        IntelligenceReport {
            campaign_id: self.campaign.campaign_id.clone(),
            report_date,
            period: metrics.period(),
            metrics,
            health_score: health,
            leakage: RevenueLeakage::empty(),
            issues: im::Vector::new(),
            recommendations: im::Vector::new(),
            alerts: im::Vector::new(),
            wow_changes: BTreeMap::new(),
            summary: format!(
                "No call records available for campaign '{}'; analysis skipped",
                self.campaign.campaign_name
            ),
            key_insights: Vec::new(),
            urgent_actions: Vec::new(),
        }
    }
}

/// Signed percentage changes for the headline metrics. Metrics with a zero
/// prior baseline are omitted rather than reported as infinite.
fn wow_changes(
    current: &PerformanceMetrics,
    previous: &PerformanceMetrics,
) -> BTreeMap<String, f64> {
    let mut changes = BTreeMap::new();
    let mut push = |name: &str, cur: f64, prev: f64| {
        if prev > 0.0 {
            changes.insert(name.to_string(), (cur - prev) / prev * 100.0);
        }
    };
    push("revenue", current.total_revenue, previous.total_revenue);
    push(
        "conversion_rate",
        current.conversion_rate,
        previous.conversion_rate,
    );
    push(
        "call_volume",
        current.total_calls as f64,
        previous.total_calls as f64,
    );
    push(
        "drop_off_rate",
        current.drop_off_rate,
        previous.drop_off_rate,
    );
    changes
}

fn executive_summary(
    campaign: &CampaignConfig,
    metrics: &PerformanceMetrics,
    health: &HealthScore,
    leakage: &RevenueLeakage,
    issues: &[PerformanceIssue],
) -> String {
    let mut summary = format!(
        "Campaign '{}' health: {}/100 ({}). {} calls produced ${:.0} revenue at a {:.1}% conversion rate.",
        campaign.campaign_name,
        health.overall_score,
        health.status(),
        metrics.total_calls,
        metrics.total_revenue,
        metrics.conversion_rate * 100.0,
    );
    if leakage.total_leakage > 0.0 {
        summary.push_str(&format!(
            " Revenue leakage is ${:.0}, of which ${:.0} looks recoverable.",
            leakage.total_leakage, leakage.recoverable_amount
        ));
    }
    match issues.len() {
        0 => summary.push_str(" No performance issues detected."),
        1 => summary.push_str(&format!(
            " 1 issue detected: {} with ${:.0} at stake.",
            issues[0].issue_type,
            issues[0].revenue_impact
        )),
        n => summary.push_str(&format!(
            " {n} issues detected; the largest is {} with ${:.0} at stake.",
            issues[0].issue_type,
            issues[0].revenue_impact
        )),
    }
    summary
}

fn key_insights(
    metrics: &PerformanceMetrics,
    health: &HealthScore,
    leakage: &RevenueLeakage,
    wow_changes: &BTreeMap<String, f64>,
) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some((source, amount)) = leakage.top_3_reasons.first() {
        insights.push(format!(
            "Largest leakage source is {source} at ${amount:.0} ({:.0}% of total leakage)",
            if leakage.total_leakage > 0.0 {
                amount / leakage.total_leakage * 100.0
            } else {
                0.0
            }
        ));
    }

    if let Some((stage, count)) = metrics
        .drop_off_breakdown
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
    {
        insights.push(format!(
            "Most drops occur at the {stage} stage ({count} of {} dropped calls)",
            metrics.dropped_calls
        ));
    }

    match health.trend {
        Trend::Improving => insights.push(format!(
            "Revenue is up {:.1}% week over week",
            health.week_over_week_change
        )),
        Trend::Declining => insights.push(format!(
            "Revenue is down {:.1}% week over week",
            health.week_over_week_change.abs()
        )),
        Trend::Stable | Trend::Unknown => {}
    }

    if let Some((metric, change)) = wow_changes
        .iter()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()).then_with(|| b.0.cmp(a.0)))
    {
        if change.abs() >= 5.0 {
            insights.push(format!(
                "Biggest period-over-period swing: {metric} changed {change:+.1}%"
            ));
        }
    }

    if metrics.avg_sentiment < 0.0 {
        insights.push(format!(
            "Caller sentiment is negative on average ({:.2})",
            metrics.avg_sentiment
        ));
    }

    insights
}

fn urgent_actions(
    issues: &[PerformanceIssue],
    alerts: &[Alert],
    recommendations: &[crate::core::ActionableRecommendation],
) -> Vec<String> {
    let mut actions = Vec::new();
    for alert in alerts.iter().filter(|a| a.is_critical()) {
        actions.push(format!("ALERT: {}", alert.title));
    }
    for issue in issues.iter().filter(|i| i.severity == Severity::Critical) {
        actions.push(format!(
            "Resolve critical {} issue (${:.0} at stake)",
            issue.issue_type, issue.revenue_impact
        ));
    }
    if !actions.is_empty() {
        if let Some(top) = recommendations.first() {
            actions.push(format!("Start with: {}", top.action));
        }
    }
    actions
}
