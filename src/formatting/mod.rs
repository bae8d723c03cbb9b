//! Terminal rendering for reports and alert digests.
//!
//! Everything renders to a `String` so the CLI can decide whether it goes
//! to stdout or a file. Colors degrade gracefully when the terminal does
//! not support them; the `colored` crate handles detection.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::core::{
    Alert, CampaignConfig, HealthStatus, IntelligenceReport, QuickStatus, Severity,
};

pub fn render_report(report: &IntelligenceReport, campaign: &CampaignConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n",
        format!(
            "Campaign Intelligence Report: {} ({})",
            campaign.campaign_name, report.period
        )
        .bold()
    ));
    out.push_str(&format!(
        "Health: {} {}\n\n",
        format!("{}/100", report.health_score.overall_score).bold(),
        status_label(report.health_score.status())
    ));

    out.push_str(&metrics_table(report));
    out.push('\n');
    out.push_str(&components_table(report));
    out.push('\n');

    if report.leakage.total_leakage > 0.0 {
        out.push_str(&format!(
            "{}: ${:.0} total, ${:.0} recoverable ({} difficulty)\n",
            "Revenue leakage".bold(),
            report.leakage.total_leakage,
            report.leakage.recoverable_amount,
            report.leakage.recovery_difficulty
        ));
        for (source, amount) in &report.leakage.top_3_reasons {
            out.push_str(&format!("  - {source}: ${amount:.0}\n"));
        }
        out.push('\n');
    }

    if !report.issues.is_empty() {
        out.push_str(&format!("{}\n", "Issues".bold()));
        for issue in &report.issues {
            out.push_str(&format!(
                "  [{}] {}: ${:.0} at stake, {} calls affected\n",
                severity_label(issue.severity),
                issue.root_cause,
                issue.revenue_impact,
                issue.affected_calls
            ));
            for factor in &issue.contributing_factors {
                out.push_str(&format!("      {factor}\n"));
            }
        }
        out.push('\n');
    }

    if !report.recommendations.is_empty() {
        out.push_str(&format!("{}\n", "Recommended actions".bold()));
        for rec in &report.recommendations {
            out.push_str(&format!(
                "  {}. {} (recovers ~${:.0}, {} effort, {})\n",
                rec.priority,
                rec.action,
                rec.expected_revenue_recovery,
                rec.implementation_effort,
                rec.estimated_time
            ));
        }
        out.push('\n');
    }

    if !report.alerts.is_empty() {
        let alerts: Vec<Alert> = report.alerts.iter().cloned().collect();
        out.push_str(&format_alert_summary(&alerts));
        out.push('\n');
    }

    if !report.key_insights.is_empty() {
        out.push_str(&format!("{}\n", "Key insights".bold()));
        for insight in &report.key_insights {
            out.push_str(&format!("  - {insight}\n"));
        }
        out.push('\n');
    }

    if !report.urgent_actions.is_empty() {
        out.push_str(&format!("{}\n", "Urgent".red().bold()));
        for action in &report.urgent_actions {
            out.push_str(&format!("  ! {action}\n"));
        }
        out.push('\n');
    }

    out.push_str(&format!("{}\n", report.summary));
    out
}

pub fn render_quick_status(status: &QuickStatus) -> String {
    if status.insufficient_data {
        return format!(
            "Campaign {}: no call data available\n",
            status.campaign_id
        );
    }
    format!(
        "Campaign {}: {}/100 {} | {} calls | {:.1}% conversion | ${:.0} revenue | ${:.0} leakage\n",
        status.campaign_id,
        status.health_score,
        status_label(status.health_status),
        status.total_calls,
        status.conversion_rate * 100.0,
        status.total_revenue,
        status.revenue_leakage
    )
}

pub fn format_alert_summary(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return format!("{}\n", "No alerts for this period".green());
    }
    let mut out = format!("{}\n", "Alerts".bold());
    for alert in alerts {
        out.push_str(&format!(
            "  [{}] {} ({:+.1}%)\n",
            severity_label(alert.severity),
            alert.message,
            alert.percentage_change
        ));
    }
    out
}

fn metrics_table(report: &IntelligenceReport) -> String {
    let m = &report.metrics;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("Total calls"),
        Cell::new(m.total_calls.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Conversion rate"),
        Cell::new(format!("{:.1}%", m.conversion_rate * 100.0)),
    ]);
    table.add_row(vec![
        Cell::new("Completion rate"),
        Cell::new(format!("{:.1}%", m.completion_rate * 100.0)),
    ]);
    table.add_row(vec![
        Cell::new("Drop-off rate"),
        Cell::new(format!("{:.1}%", m.drop_off_rate * 100.0)),
    ]);
    table.add_row(vec![
        Cell::new("Escalation rate"),
        Cell::new(format!("{:.1}%", m.escalation_rate * 100.0)),
    ]);
    table.add_row(vec![
        Cell::new("Revenue"),
        Cell::new(format!("${:.0}", m.total_revenue)),
    ]);
    table.add_row(vec![
        Cell::new("Revenue leakage"),
        Cell::new(format!(
            "${:.0} ({:.1}%)",
            m.revenue_leakage, m.revenue_leakage_percentage
        )),
    ]);
    table.add_row(vec![
        Cell::new("Avg sentiment"),
        Cell::new(format!("{:.2}", m.avg_sentiment)),
    ]);
    format!("{table}\n")
}

fn components_table(report: &IntelligenceReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Health component", "Score"]);
    for (name, value) in &report.health_score.components {
        table.add_row(vec![Cell::new(name), Cell::new(format!("{value:.0}"))]);
    }
    format!("{table}\n")
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Critical => "CRITICAL".red().bold().to_string(),
        Severity::High => "HIGH".red().to_string(),
        Severity::Medium => "MEDIUM".yellow().to_string(),
        Severity::Low => "LOW".green().to_string(),
    }
}

fn status_label(status: HealthStatus) -> String {
    match status {
        HealthStatus::Excellent => "excellent".green().bold().to_string(),
        HealthStatus::Good => "good".green().to_string(),
        HealthStatus::Fair => "fair".yellow().to_string(),
        HealthStatus::Critical => "critical".red().bold().to_string(),
    }
}
