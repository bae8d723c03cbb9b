//! Recommendation engine: turns detected issues into a ranked action plan.
//!
//! Actions come from a fixed template catalog keyed by issue type (and,
//! for drop-off issues, by funnel stage). Each template carries an
//! effectiveness factor; expected recovery is the issue's revenue impact
//! scaled by that factor, and the final plan is ranked by recovery with
//! deterministic tie-breaks.

use crate::core::{
    ActionableRecommendation, DropOffStage, Effort, IssueType, PerformanceIssue, RevenueLeakage,
    Severity,
};

/// One remediation play from the catalog.
#[derive(Debug, Clone)]
pub struct RecommendationTemplate {
    pub issue_type: IssueType,
    /// Only instantiated when the issue is at least this severe.
    pub min_severity: Option<Severity>,
    /// Only instantiated when the issue implicates this funnel stage.
    pub stage: Option<DropOffStage>,
    pub action: &'static str,
    pub steps: &'static [&'static str],
    pub effort: Effort,
    pub estimated_time: &'static str,
    /// Numeric form of `estimated_time`, used for ranking ties.
    pub estimated_days: u32,
    pub confidence: f64,
    /// Fraction of the issue's revenue impact this play should recover.
    pub effectiveness: f64,
    pub resources: &'static [&'static str],
}

pub fn default_catalog() -> Vec<RecommendationTemplate> {
    vec![
        // Low conversion
        RecommendationTemplate {
            issue_type: IssueType::LowConversion,
            min_severity: None,
            stage: None,
            action: "A/B test revised pitch script against the current version",
            steps: &[
                "Draft an alternate pitch emphasizing outcomes over features",
                "Split traffic 50/50 between current and revised scripts",
                "Compare conversion rates after 500 calls per variant",
                "Promote the winner to all traffic",
            ],
            effort: Effort::Medium,
            estimated_time: "3-5 days",
            estimated_days: 5,
            confidence: 0.70,
            effectiveness: 0.40,
            resources: &["script writer", "campaign manager"],
        },
        RecommendationTemplate {
            issue_type: IssueType::LowConversion,
            min_severity: None,
            stage: None,
            action: "Expand objection-handling branches in the bot flow",
            steps: &[
                "Mine transcripts of non-converting completed calls for objections",
                "Add scripted responses for the top five objections",
                "Retrain intent matching on the new branches",
            ],
            effort: Effort::Medium,
            estimated_time: "4-6 days",
            estimated_days: 6,
            confidence: 0.65,
            effectiveness: 0.30,
            resources: &["conversation designer", "bot engineer"],
        },
        RecommendationTemplate {
            issue_type: IssueType::LowConversion,
            min_severity: Some(Severity::High),
            stage: None,
            action: "Add social proof and urgency to the closing sequence",
            steps: &[
                "Insert customer references relevant to the caller segment",
                "Add a time-bound incentive to the close",
            ],
            effort: Effort::Low,
            estimated_time: "2-3 days",
            estimated_days: 3,
            confidence: 0.55,
            effectiveness: 0.25,
            resources: &["script writer"],
        },
        // High drop-off, stage-specific first
        RecommendationTemplate {
            issue_type: IssueType::HighDropOff,
            min_severity: None,
            stage: Some(DropOffStage::Intro),
            action: "Shorten the intro and state the value proposition in the first 15 seconds",
            steps: &[
                "Cut the intro script to two sentences",
                "Lead with the caller-specific benefit",
                "Verify drop rate within the first 30 seconds falls",
            ],
            effort: Effort::Low,
            estimated_time: "2 days",
            estimated_days: 2,
            confidence: 0.80,
            effectiveness: 0.50,
            resources: &["script writer"],
        },
        RecommendationTemplate {
            issue_type: IssueType::HighDropOff,
            min_severity: None,
            stage: Some(DropOffStage::Pitch),
            action: "Break the pitch into interactive segments with check-in questions",
            steps: &[
                "Split the pitch into segments under 60 seconds",
                "Add a confirmation question between segments",
                "Drop segments where callers consistently disengage",
            ],
            effort: Effort::Medium,
            estimated_time: "5 days",
            estimated_days: 5,
            confidence: 0.75,
            effectiveness: 0.45,
            resources: &["conversation designer", "bot engineer"],
        },
        RecommendationTemplate {
            issue_type: IssueType::HighDropOff,
            min_severity: None,
            stage: Some(DropOffStage::ObjectionHandling),
            action: "Rebuild objection handling with acknowledgement-first responses",
            steps: &[
                "Audit transcripts of calls dropped during objection handling",
                "Script empathetic acknowledgements before rebuttals",
                "Add a human-handoff path for repeated objections",
            ],
            effort: Effort::High,
            estimated_time: "7 days",
            estimated_days: 7,
            confidence: 0.70,
            effectiveness: 0.50,
            resources: &["conversation designer", "bot engineer", "qa analyst"],
        },
        RecommendationTemplate {
            issue_type: IssueType::HighDropOff,
            min_severity: None,
            stage: None,
            action: "Instrument per-stage engagement monitoring across the funnel",
            steps: &[
                "Track sentiment and duration per funnel stage",
                "Alert when any stage's drop rate exceeds its baseline",
            ],
            effort: Effort::Medium,
            estimated_time: "6 days",
            estimated_days: 6,
            confidence: 0.60,
            effectiveness: 0.20,
            resources: &["analytics engineer"],
        },
        // Escalation spike
        RecommendationTemplate {
            issue_type: IssueType::EscalationSpike,
            min_severity: None,
            stage: None,
            action: "Retrain the bot on the top escalation reasons",
            steps: &[
                "Rank escalation reasons for the period",
                "Add automated resolutions for the top three reasons",
                "Measure escalation rate over the following week",
            ],
            effort: Effort::High,
            estimated_time: "1-2 weeks",
            estimated_days: 10,
            confidence: 0.65,
            effectiveness: 0.40,
            resources: &["bot engineer", "support lead"],
        },
        RecommendationTemplate {
            issue_type: IssueType::EscalationSpike,
            min_severity: None,
            stage: None,
            action: "Tighten escalation criteria to filter resolvable calls",
            steps: &[
                "Require one automated resolution attempt before handoff",
                "Review the deflected calls for caller frustration",
            ],
            effort: Effort::Low,
            estimated_time: "3 days",
            estimated_days: 3,
            confidence: 0.70,
            effectiveness: 0.25,
            resources: &["support lead"],
        },
        // Compliance
        RecommendationTemplate {
            issue_type: IssueType::ComplianceViolation,
            min_severity: None,
            stage: None,
            action: "Patch the script sections producing compliance flags",
            steps: &[
                "Map each flag type to the script section that produced it",
                "Rewrite those sections with legal review",
                "Redeploy and confirm zero flags over 24 hours",
            ],
            effort: Effort::Low,
            estimated_time: "2 days",
            estimated_days: 2,
            confidence: 0.95,
            effectiveness: 0.80,
            resources: &["compliance officer", "script writer"],
        },
        RecommendationTemplate {
            issue_type: IssueType::ComplianceViolation,
            min_severity: None,
            stage: None,
            action: "Add pre-call rule validation to the dialer pipeline",
            steps: &[
                "Encode campaign compliance rules as pre-call checks",
                "Block calls that fail validation and log the reason",
            ],
            effort: Effort::Medium,
            estimated_time: "7 days",
            estimated_days: 7,
            confidence: 0.90,
            effectiveness: 0.90,
            resources: &["platform engineer", "compliance officer"],
        },
        // Technical failure
        RecommendationTemplate {
            issue_type: IssueType::TechnicalFailure,
            min_severity: None,
            stage: None,
            action: "Diagnose and fix the telephony failure root cause",
            steps: &[
                "Correlate failure timestamps with carrier and platform incidents",
                "Fix or route around the failing component",
                "Re-dial the affected numbers",
            ],
            effort: Effort::High,
            estimated_time: "5 days",
            estimated_days: 5,
            confidence: 0.85,
            effectiveness: 0.90,
            resources: &["platform engineer", "telephony vendor"],
        },
        RecommendationTemplate {
            issue_type: IssueType::TechnicalFailure,
            min_severity: None,
            stage: None,
            action: "Add graceful degradation and automatic retry for failed calls",
            steps: &[
                "Queue failed calls for retry with backoff",
                "Fall back to a secondary carrier on repeated failure",
            ],
            effort: Effort::Medium,
            estimated_time: "7 days",
            estimated_days: 7,
            confidence: 0.75,
            effectiveness: 0.60,
            resources: &["platform engineer"],
        },
    ]
}

pub struct RecommendationEngine {
    catalog: Vec<RecommendationTemplate>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
        }
    }
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_catalog(catalog: Vec<RecommendationTemplate>) -> Self {
        Self { catalog }
    }

    /// Instantiate every matching template and rank the resulting plan.
    ///
    /// Ranking is expected recovery descending, then effort ascending, then
    /// estimated days ascending, then action text; `priority` is assigned
    /// from the final order, starting at 1.
    pub fn recommend(
        &self,
        issues: &[PerformanceIssue],
        leakage: &RevenueLeakage,
    ) -> Vec<ActionableRecommendation> {
        let mut recommendations: Vec<ActionableRecommendation> = issues
            .iter()
            .flat_map(|issue| {
                self.catalog
                    .iter()
                    .filter(|t| template_applies(t, issue))
                    .map(|t| instantiate(t, issue, leakage))
            })
            .collect();

        recommendations.sort_by(|a, b| {
            b.expected_revenue_recovery
                .total_cmp(&a.expected_revenue_recovery)
                .then_with(|| a.implementation_effort.cmp(&b.implementation_effort))
                .then_with(|| a.estimated_days.cmp(&b.estimated_days))
                .then_with(|| a.action.cmp(&b.action))
        });
        for (index, rec) in recommendations.iter_mut().enumerate() {
            rec.priority = index + 1;
        }
        log::debug!(
            "generated {} recommendations from {} issues",
            recommendations.len(),
            issues.len()
        );
        recommendations
    }
}

fn template_applies(template: &RecommendationTemplate, issue: &PerformanceIssue) -> bool {
    if template.issue_type != issue.issue_type {
        return false;
    }
    if let Some(min) = template.min_severity {
        // Severity ranks ascend from Critical = 0.
        if issue.severity.rank() > min.rank() {
            return false;
        }
    }
    match template.stage {
        Some(stage) => issue.problematic_stage == Some(stage),
        None => true,
    }
}

fn instantiate(
    template: &RecommendationTemplate,
    issue: &PerformanceIssue,
    leakage: &RevenueLeakage,
) -> ActionableRecommendation {
    let recovery = issue.revenue_impact * template.effectiveness;
    let expected_impact = if leakage.total_leakage > 0.0 {
        format!(
            "Recover an estimated ${recovery:.0} of ${:.0} total period leakage",
            leakage.total_leakage
        )
    } else {
        format!("Recover an estimated ${recovery:.0}")
    };
    ActionableRecommendation {
        priority: 0, // assigned after ranking
        issue_type: template.issue_type,
        action: template.action.to_string(),
        steps: template.steps.iter().map(|s| s.to_string()).collect(),
        expected_impact,
        expected_revenue_recovery: recovery,
        implementation_effort: template.effort,
        estimated_time: template.estimated_time.to_string(),
        estimated_days: template.estimated_days,
        confidence: template.confidence,
        resource_requirements: template.resources.iter().map(|s| s.to_string()).collect(),
    }
}
