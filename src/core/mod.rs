//! Core data model for campaign intelligence.
//!
//! Input types (`CallRecord`, `CampaignConfig`) are immutable once handed to
//! the engine; everything else is derived fresh per analysis and never
//! mutated afterwards. Ordered maps (`BTreeMap`) are used for every breakdown
//! so that reports serialize and iterate deterministically.

use chrono::{DateTime, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Outcome of a single voice bot call.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Completed,
    Dropped,
    Escalated,
    Failed,
    ComplianceViolation,
}

/// Funnel stage at which a dropped call was abandoned.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DropOffStage {
    Intro,
    Qualification,
    Pitch,
    ObjectionHandling,
    Closing,
    FollowUp,
}

impl DropOffStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropOffStage::Intro => "intro",
            DropOffStage::Qualification => "qualification",
            DropOffStage::Pitch => "pitch",
            DropOffStage::ObjectionHandling => "objection_handling",
            DropOffStage::Closing => "closing",
            DropOffStage::FollowUp => "follow_up",
        }
    }
}

impl fmt::Display for DropOffStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call, as supplied by the ingestion boundary. Never mutated by the
/// engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CallRecord {
    pub call_id: String,
    #[serde(default)]
    pub campaign_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: u32,
    pub status: CallStatus,
    #[serde(default)]
    pub drop_off_stage: Option<DropOffStage>,
    #[serde(default)]
    pub escalation_reason: Option<String>,
    #[serde(default)]
    pub compliance_flags: BTreeSet<String>,
    /// Expected revenue if this call converted.
    #[serde(default)]
    pub conversion_value: f64,
    /// Revenue actually realized.
    pub actual_revenue: f64,
    #[serde(default)]
    pub sentiment_score: f64,
    #[serde(default)]
    pub script_version: String,
    /// Human agent the call was handed to, when escalated.
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl CallRecord {
    /// Gap between expected and realized revenue, floored at zero.
    pub fn revenue_gap(&self) -> f64 {
        (self.conversion_value - self.actual_revenue).max(0.0)
    }

    /// A converted call: completed and produced revenue.
    pub fn is_conversion(&self) -> bool {
        self.status == CallStatus::Completed && self.actual_revenue > 0.0
    }

    /// Any compliance problem, whether terminal or flagged in passing.
    pub fn has_compliance_violation(&self) -> bool {
        self.status == CallStatus::ComplianceViolation || !self.compliance_flags.is_empty()
    }
}

/// Campaign identity and targets. Supplied once per analysis.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CampaignConfig {
    pub campaign_id: String,
    pub campaign_name: String,
    pub start_date: DateTime<Utc>,
    pub target_calls_per_day: u32,
    /// Target conversion rate in [0, 1].
    pub target_conversion_rate: f64,
    pub target_revenue_per_call: f64,
    pub avg_deal_value: f64,
    #[serde(default)]
    pub compliance_rules: Vec<String>,
    #[serde(default)]
    pub script_versions: Vec<String>,
}

impl CampaignConfig {
    pub fn expected_daily_revenue(&self) -> f64 {
        self.target_calls_per_day as f64 * self.target_conversion_rate * self.avg_deal_value
    }
}

/// Analyzed time window.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Reduced snapshot of one period of call records.
///
/// All rates are fractions in [0, 1] except `revenue_leakage_percentage`,
/// which is reported as a percentage of expected revenue. Division-by-zero
/// cases resolve to 0.0, never NaN; an empty period is marked with
/// `insufficient_data` instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub campaign_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,

    pub total_calls: usize,
    pub completed_calls: usize,
    pub dropped_calls: usize,
    pub escalated_calls: usize,
    pub failed_calls: usize,
    pub compliance_violations: usize,
    /// Distinct compliance flag types seen in the period.
    pub compliance_flag_types: BTreeSet<String>,

    /// Completed calls that produced revenue.
    pub conversions: usize,
    pub conversion_rate: f64,
    pub completion_rate: f64,
    pub escalation_rate: f64,
    pub drop_off_rate: f64,
    pub failure_rate: f64,

    pub total_revenue: f64,
    /// Sum of conversion values across all calls.
    pub expected_revenue: f64,
    /// Sum of per-call revenue gaps, each floored at zero.
    pub revenue_leakage: f64,
    /// Leakage as a percentage of expected revenue (0 when none expected).
    pub revenue_leakage_percentage: f64,

    pub avg_call_duration: f64,
    pub avg_sentiment: f64,

    pub drop_off_breakdown: BTreeMap<DropOffStage, usize>,

    /// True when the period held no records; rates above are all zero.
    pub insufficient_data: bool,
}

impl PerformanceMetrics {
    pub fn period(&self) -> Period {
        Period {
            start: self.period_start,
            end: self.period_end,
        }
    }
}

/// Category of a detected performance issue.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    LowConversion,
    HighDropOff,
    EscalationSpike,
    ComplianceViolation,
    TechnicalFailure,
}

impl IssueType {
    /// Stable name used for ordering tie-breaks and report keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::LowConversion => "low_conversion",
            IssueType::HighDropOff => "high_drop_off",
            IssueType::EscalationSpike => "escalation_spike",
            IssueType::ComplianceViolation => "compliance_violation",
            IssueType::TechnicalFailure => "technical_failure",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Rank for ordering; lower is more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        f.write_str(s)
    }
}

/// A detected performance issue with quantified revenue impact.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceIssue {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub revenue_impact: f64,
    pub affected_calls: usize,
    pub root_cause: String,
    pub contributing_factors: Vec<String>,
    /// Funnel stage most implicated, when the issue is stage-specific.
    pub problematic_stage: Option<DropOffStage>,
    /// Identifiers of the calls behind this issue, for drill-down.
    pub call_ids: Vec<String>,
    pub evidence: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryDifficulty {
    Low,
    Medium,
    High,
}

impl fmt::Display for RecoveryDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryDifficulty::Low => "low",
            RecoveryDifficulty::Medium => "medium",
            RecoveryDifficulty::High => "high",
        };
        f.write_str(s)
    }
}

/// Revenue leakage attributed to causes and funnel stages.
///
/// `breakdown_by_source` and `breakdown_by_stage` are two independent
/// partitions of the same total; each sums to `total_leakage`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RevenueLeakage {
    pub total_leakage: f64,
    pub breakdown_by_source: BTreeMap<String, f64>,
    pub breakdown_by_stage: BTreeMap<String, f64>,
    /// Portion of the total estimated as realistically fixable.
    pub recoverable_amount: f64,
    pub recovery_difficulty: RecoveryDifficulty,
    /// Largest sources, descending by amount; ties broken by name.
    pub top_3_reasons: Vec<(String, f64)>,
    pub if_conversion_improved: f64,
    pub if_drop_off_reduced: f64,
    pub if_escalations_handled: f64,
}

impl RevenueLeakage {
    pub fn empty() -> Self {
        Self {
            total_leakage: 0.0,
            breakdown_by_source: BTreeMap::new(),
            breakdown_by_stage: BTreeMap::new(),
            recoverable_amount: 0.0,
            recovery_difficulty: RecoveryDifficulty::Low,
            top_3_reasons: Vec::new(),
            if_conversion_improved: 0.0,
            if_drop_off_reduced: 0.0,
            if_escalations_handled: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Effort::Low => "low",
            Effort::Medium => "medium",
            Effort::High => "high",
        };
        f.write_str(s)
    }
}

/// A prioritized remediation action instantiated from the catalog.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionableRecommendation {
    /// 1-based rank; 1 is the highest priority.
    pub priority: usize,
    pub issue_type: IssueType,
    pub action: String,
    pub steps: Vec<String>,
    pub expected_impact: String,
    pub expected_revenue_recovery: f64,
    pub implementation_effort: Effort,
    pub estimated_time: String,
    /// Numeric form of `estimated_time`, used for ranking ties.
    pub estimated_days: u32,
    /// Confidence in the estimate, in [0, 1].
    pub confidence: f64,
    pub resource_requirements: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    /// No prior period to compare against.
    Unknown,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
            Trend::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Excellent => "Excellent",
            HealthStatus::Good => "Good",
            HealthStatus::Fair => "Fair",
            HealthStatus::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// Weighted 0-100 composite of five component scores.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthScore {
    pub overall_score: u8,
    /// Component name -> score in [0, 100]. Keys: conversion, revenue,
    /// compliance, efficiency, quality.
    pub components: BTreeMap<String, f64>,
    pub trend: Trend,
    /// Signed percentage change against the prior period.
    pub week_over_week_change: f64,
}

impl HealthScore {
    pub fn status(&self) -> HealthStatus {
        match self.overall_score {
            80..=100 => HealthStatus::Excellent,
            60..=79 => HealthStatus::Good,
            40..=59 => HealthStatus::Fair,
            _ => HealthStatus::Critical,
        }
    }
}

/// A threshold-crossing alert computed by diffing two periods.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub alert_type: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub current_value: f64,
    pub previous_value: f64,
    pub threshold_crossed: f64,
    pub percentage_change: f64,
    pub triggered_at: DateTime<Utc>,
}

impl Alert {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Complete intelligence report for one campaign and period.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntelligenceReport {
    pub campaign_id: String,
    pub report_date: DateTime<Utc>,
    pub period: Period,
    pub metrics: PerformanceMetrics,
    pub health_score: HealthScore,
    pub leakage: RevenueLeakage,
    pub issues: Vector<PerformanceIssue>,
    pub recommendations: Vector<ActionableRecommendation>,
    pub alerts: Vector<Alert>,
    /// Metric name -> signed percentage change vs. the prior period.
    pub wow_changes: BTreeMap<String, f64>,
    pub summary: String,
    pub key_insights: Vec<String>,
    pub urgent_actions: Vec<String>,
}

/// Lightweight status summary from the cheap analysis path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuickStatus {
    pub campaign_id: String,
    pub health_score: u8,
    pub health_status: HealthStatus,
    pub total_calls: usize,
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub revenue_leakage: f64,
    pub insufficient_data: bool,
}

/// Drill-down analysis of a single issue over its contributing calls.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IssueDrilldown {
    pub issue: PerformanceIssue,
    pub leakage: RevenueLeakage,
    pub recommendations: Vec<ActionableRecommendation>,
    /// Share of the full record set contributing to the issue, in percent.
    pub affected_calls_percentage: f64,
}
