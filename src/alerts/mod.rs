//! Period-over-period alerting.
//!
//! Alerts fire only when both a current and a previous period are present.
//! Each check compares one metric against a configured threshold; severity
//! scales with how far past the threshold the change landed. Compliance is
//! the exception: any increase in violations is Critical, no threshold.

use chrono::{DateTime, Utc};

use crate::config::AlertThresholds;
use crate::core::{Alert, HealthScore, PerformanceMetrics, Severity};

/// Overshoot ratio beyond which a High alert becomes Critical.
const CRITICAL_OVERSHOOT: f64 = 1.5;

pub struct AlertSystem {
    thresholds: AlertThresholds,
}

impl AlertSystem {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// Compare two periods and emit every alert whose threshold was crossed.
    ///
    /// Output ordering is severity first (Critical before High), then alert
    /// type name, so repeated runs over the same data produce the same list.
    pub fn diff(
        &self,
        current: &PerformanceMetrics,
        previous: &PerformanceMetrics,
        current_health: &HealthScore,
        previous_health: &HealthScore,
        at: DateTime<Utc>,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if let Some(alert) = self.revenue_drop(current, previous, at) {
            alerts.push(alert);
        }
        if let Some(alert) = self.conversion_drop(current, previous, at) {
            alerts.push(alert);
        }
        if let Some(alert) = self.drop_off_spike(current, previous, at) {
            alerts.push(alert);
        }
        if let Some(alert) = self.escalation_spike(current, previous, at) {
            alerts.push(alert);
        }
        if let Some(alert) = self.compliance_increase(current, previous, at) {
            alerts.push(alert);
        }
        if let Some(alert) = self.health_drop(current_health, previous_health, at) {
            alerts.push(alert);
        }
        if let Some(alert) = self.leakage_increase(current, previous, at) {
            alerts.push(alert);
        }

        alerts.sort_by(|a, b| {
            a.severity
                .rank()
                .cmp(&b.severity.rank())
                .then_with(|| a.alert_type.cmp(&b.alert_type))
        });
        if !alerts.is_empty() {
            log::info!("{} alerts triggered for period comparison", alerts.len());
        }
        alerts
    }

    pub fn get_critical_alerts(alerts: &[Alert]) -> Vec<&Alert> {
        alerts.iter().filter(|a| a.is_critical()).collect()
    }

    fn revenue_drop(
        &self,
        current: &PerformanceMetrics,
        previous: &PerformanceMetrics,
        at: DateTime<Utc>,
    ) -> Option<Alert> {
        drop_alert(
            "revenue_drop",
            "Revenue dropped versus previous period",
            current.total_revenue,
            previous.total_revenue,
            self.thresholds.revenue_drop_pct,
            at,
        )
    }

    fn conversion_drop(
        &self,
        current: &PerformanceMetrics,
        previous: &PerformanceMetrics,
        at: DateTime<Utc>,
    ) -> Option<Alert> {
        drop_alert(
            "conversion_drop",
            "Conversion rate dropped versus previous period",
            current.conversion_rate,
            previous.conversion_rate,
            self.thresholds.conversion_drop_pct,
            at,
        )
    }

    fn drop_off_spike(
        &self,
        current: &PerformanceMetrics,
        previous: &PerformanceMetrics,
        at: DateTime<Utc>,
    ) -> Option<Alert> {
        spike_alert(
            "drop_off_spike",
            "Call drop-off rate spiked versus previous period",
            current.drop_off_rate,
            previous.drop_off_rate,
            self.thresholds.drop_off_spike_pct,
            at,
        )
    }

    fn escalation_spike(
        &self,
        current: &PerformanceMetrics,
        previous: &PerformanceMetrics,
        at: DateTime<Utc>,
    ) -> Option<Alert> {
        spike_alert(
            "escalation_spike",
            "Escalation rate spiked versus previous period",
            current.escalation_rate,
            previous.escalation_rate,
            self.thresholds.escalation_spike_pct,
            at,
        )
    }

    /// Zero tolerance: any increase fires at Critical.
    fn compliance_increase(
        &self,
        current: &PerformanceMetrics,
        previous: &PerformanceMetrics,
        at: DateTime<Utc>,
    ) -> Option<Alert> {
        if current.compliance_violations <= previous.compliance_violations {
            return None;
        }
        let cur = current.compliance_violations as f64;
        let prev = previous.compliance_violations as f64;
        let pct = if prev > 0.0 {
            (cur - prev) / prev * 100.0
        } else {
            100.0
        };
        Some(Alert {
            alert_type: "compliance_increase".to_string(),
            severity: Severity::Critical,
            title: "Compliance violations increased".to_string(),
            message: format!(
                "Compliance violations rose from {} to {}; immediate review required",
                previous.compliance_violations, current.compliance_violations
            ),
            current_value: cur,
            previous_value: prev,
            threshold_crossed: prev,
            percentage_change: pct,
            triggered_at: at,
        })
    }

    /// Health drop is measured in points, not percent.
    fn health_drop(
        &self,
        current: &HealthScore,
        previous: &HealthScore,
        at: DateTime<Utc>,
    ) -> Option<Alert> {
        let cur = current.overall_score as f64;
        let prev = previous.overall_score as f64;
        let drop = prev - cur;
        if drop <= self.thresholds.health_score_drop {
            return None;
        }
        let severity = if drop > self.thresholds.health_score_drop * CRITICAL_OVERSHOOT {
            Severity::Critical
        } else {
            Severity::High
        };
        let pct = if prev > 0.0 { -drop / prev * 100.0 } else { 0.0 };
        Some(Alert {
            alert_type: "health_score_drop".to_string(),
            severity,
            title: "Campaign health score fell sharply".to_string(),
            message: format!(
                "Health score fell {drop:.0} points, from {prev:.0} to {cur:.0}"
            ),
            current_value: cur,
            previous_value: prev,
            threshold_crossed: prev - self.thresholds.health_score_drop,
            percentage_change: pct,
            triggered_at: at,
        })
    }

    fn leakage_increase(
        &self,
        current: &PerformanceMetrics,
        previous: &PerformanceMetrics,
        at: DateTime<Utc>,
    ) -> Option<Alert> {
        spike_alert(
            "leakage_increase",
            "Revenue leakage grew versus previous period",
            current.revenue_leakage,
            previous.revenue_leakage,
            self.thresholds.leakage_increase_pct,
            at,
        )
    }
}

/// Alert on a relative decrease past `threshold_pct`. No previous signal
/// means nothing to compare, so no alert.
fn drop_alert(
    alert_type: &str,
    title: &str,
    current: f64,
    previous: f64,
    threshold_pct: f64,
    at: DateTime<Utc>,
) -> Option<Alert> {
    if previous <= 0.0 {
        return None;
    }
    let change = (current - previous) / previous * 100.0;
    if change >= -threshold_pct {
        return None;
    }
    Some(Alert {
        alert_type: alert_type.to_string(),
        severity: scale_severity(change.abs(), threshold_pct),
        title: title.to_string(),
        message: format!(
            "{title}: {change:.1}% change ({previous:.2} to {current:.2})"
        ),
        current_value: current,
        previous_value: previous,
        threshold_crossed: previous * (1.0 - threshold_pct / 100.0),
        percentage_change: change,
        triggered_at: at,
    })
}

/// Alert on a relative increase past `threshold_pct`.
fn spike_alert(
    alert_type: &str,
    title: &str,
    current: f64,
    previous: f64,
    threshold_pct: f64,
    at: DateTime<Utc>,
) -> Option<Alert> {
    if previous <= 0.0 {
        return None;
    }
    let change = (current - previous) / previous * 100.0;
    if change <= threshold_pct {
        return None;
    }
    Some(Alert {
        alert_type: alert_type.to_string(),
        severity: scale_severity(change, threshold_pct),
        title: title.to_string(),
        message: format!(
            "{title}: {change:+.1}% change ({previous:.2} to {current:.2})"
        ),
        current_value: current,
        previous_value: previous,
        threshold_crossed: previous * (1.0 + threshold_pct / 100.0),
        percentage_change: change,
        triggered_at: at,
    })
}

fn scale_severity(overshoot_pct: f64, threshold_pct: f64) -> Severity {
    if overshoot_pct > threshold_pct * CRITICAL_OVERSHOOT {
        Severity::Critical
    } else {
        Severity::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricAggregator;
    use crate::core::Trend;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn metrics(revenue: f64, conversion: f64, drop_off: f64) -> PerformanceMetrics {
        let mut m = MetricAggregator::empty_snapshot("camp-1", None);
        m.total_calls = 100;
        m.total_revenue = revenue;
        m.conversion_rate = conversion;
        m.drop_off_rate = drop_off;
        m.insufficient_data = false;
        m
    }

    fn health(score: u8) -> HealthScore {
        HealthScore {
            overall_score: score,
            components: BTreeMap::new(),
            trend: Trend::Unknown,
            week_over_week_change: 0.0,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap()
    }

    fn system() -> AlertSystem {
        AlertSystem::new(AlertThresholds::default())
    }

    #[test]
    fn revenue_drop_fires_past_ten_percent() {
        let current = metrics(89_000.0, 0.12, 0.05);
        let previous = metrics(100_000.0, 0.12, 0.05);
        let alerts = system().diff(&current, &previous, &health(70), &health(70), now());
        let alert = alerts
            .iter()
            .find(|a| a.alert_type == "revenue_drop")
            .unwrap();
        assert_eq!(alert.severity, Severity::High);
        assert!((alert.percentage_change - -11.0).abs() < 1e-9);
        assert!((alert.threshold_crossed - 90_000.0).abs() < 1e-6);
    }

    #[test]
    fn small_revenue_dip_stays_quiet() {
        let current = metrics(95_000.0, 0.12, 0.05);
        let previous = metrics(100_000.0, 0.12, 0.05);
        let alerts = system().diff(&current, &previous, &health(70), &health(70), now());
        assert!(alerts.iter().all(|a| a.alert_type != "revenue_drop"));
    }

    #[test]
    fn deep_revenue_drop_escalates_to_critical() {
        // 16% past a 10% threshold exceeds the 1.5x overshoot band.
        let current = metrics(84_000.0, 0.12, 0.05);
        let previous = metrics(100_000.0, 0.12, 0.05);
        let alerts = system().diff(&current, &previous, &health(70), &health(70), now());
        let alert = alerts
            .iter()
            .find(|a| a.alert_type == "revenue_drop")
            .unwrap();
        assert_eq!(alert.severity, Severity::Critical);
    }

    #[test]
    fn any_compliance_increase_is_critical() {
        let mut current = metrics(100_000.0, 0.12, 0.05);
        current.compliance_violations = 1;
        let previous = metrics(100_000.0, 0.12, 0.05);
        let alerts = system().diff(&current, &previous, &health(70), &health(70), now());
        let alert = alerts
            .iter()
            .find(|a| a.alert_type == "compliance_increase")
            .unwrap();
        assert_eq!(alert.severity, Severity::Critical);
        assert!((alert.percentage_change - 100.0).abs() < 1e-9);
    }

    #[test]
    fn health_drop_uses_points_not_percent() {
        let alerts = system().diff(
            &metrics(100_000.0, 0.12, 0.05),
            &metrics(100_000.0, 0.12, 0.05),
            &health(54),
            &health(70),
            now(),
        );
        let alert = alerts
            .iter()
            .find(|a| a.alert_type == "health_score_drop")
            .unwrap();
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.current_value, 54.0);

        let quiet = system().diff(
            &metrics(100_000.0, 0.12, 0.05),
            &metrics(100_000.0, 0.12, 0.05),
            &health(57),
            &health(70),
            now(),
        );
        assert!(quiet.iter().all(|a| a.alert_type != "health_score_drop"));
    }

    #[test]
    fn zero_previous_baseline_never_divides() {
        let current = metrics(50_000.0, 0.12, 0.10);
        let previous = metrics(0.0, 0.0, 0.0);
        let alerts = system().diff(&current, &previous, &health(70), &health(70), now());
        assert!(alerts.is_empty());
    }

    #[test]
    fn alerts_sort_critical_first_then_by_type() {
        let mut current = metrics(84_000.0, 0.12, 0.05);
        current.compliance_violations = 2;
        let previous = metrics(100_000.0, 0.12, 0.05);
        let alerts = system().diff(&current, &previous, &health(70), &health(70), now());
        assert!(alerts.len() >= 2);
        assert_eq!(alerts[0].alert_type, "compliance_increase");
        assert!(alerts[0].is_critical());
        let criticals = AlertSystem::get_critical_alerts(&alerts);
        assert!(criticals.len() >= 2);
    }
}
