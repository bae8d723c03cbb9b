//! Analysis configuration: benchmarks, weights, thresholds, recovery rates.
//!
//! Every tunable the engine consumes lives here and is passed explicitly
//! into each component, so behavior is fully determined by inputs and tests
//! can substitute alternate benchmark sets. Values can be overridden from a
//! TOML file; anything omitted falls back to the documented defaults.
//! Validation is strict: weights that do not sum to 1.0 are a fatal
//! configuration error, never renormalized.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{EngineError, Result};

/// Industry-reference values used when no campaign-specific target applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Benchmarks {
    #[serde(default = "default_benchmark_conversion")]
    pub conversion_rate: f64,
    #[serde(default = "default_benchmark_completion")]
    pub completion_rate: f64,
    #[serde(default = "default_benchmark_escalation")]
    pub escalation_rate: f64,
    #[serde(default = "default_benchmark_compliance")]
    pub compliance_rate: f64,
    #[serde(default = "default_benchmark_sentiment")]
    pub sentiment: f64,
}

fn default_benchmark_conversion() -> f64 {
    0.15
}
fn default_benchmark_completion() -> f64 {
    0.70
}
fn default_benchmark_escalation() -> f64 {
    0.10
}
fn default_benchmark_compliance() -> f64 {
    0.98
}
fn default_benchmark_sentiment() -> f64 {
    0.30
}

impl Default for Benchmarks {
    fn default() -> Self {
        Self {
            conversion_rate: default_benchmark_conversion(),
            completion_rate: default_benchmark_completion(),
            escalation_rate: default_benchmark_escalation(),
            compliance_rate: default_benchmark_compliance(),
            sentiment: default_benchmark_sentiment(),
        }
    }
}

/// Weights combining the five health components. Must sum to exactly 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthWeights {
    #[serde(default = "default_weight_conversion")]
    pub conversion: f64,
    #[serde(default = "default_weight_revenue")]
    pub revenue: f64,
    #[serde(default = "default_weight_compliance")]
    pub compliance: f64,
    #[serde(default = "default_weight_efficiency")]
    pub efficiency: f64,
    #[serde(default = "default_weight_quality")]
    pub quality: f64,
}

fn default_weight_conversion() -> f64 {
    0.35
}
fn default_weight_revenue() -> f64 {
    0.25
}
fn default_weight_compliance() -> f64 {
    0.20
}
fn default_weight_efficiency() -> f64 {
    0.12
}
fn default_weight_quality() -> f64 {
    0.08
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            conversion: default_weight_conversion(),
            revenue: default_weight_revenue(),
            compliance: default_weight_compliance(),
            efficiency: default_weight_efficiency(),
            quality: default_weight_quality(),
        }
    }
}

impl HealthWeights {
    fn is_valid_weight(weight: f64) -> bool {
        (0.0..=1.0).contains(&weight)
    }

    pub fn validate(&self) -> Result<()> {
        let named = [
            ("conversion", self.conversion),
            ("revenue", self.revenue),
            ("compliance", self.compliance),
            ("efficiency", self.efficiency),
            ("quality", self.quality),
        ];
        for (name, weight) in named {
            if !Self::is_valid_weight(weight) {
                return Err(EngineError::Configuration(format!(
                    "{name} weight must be between 0.0 and 1.0, got {weight}"
                )));
            }
        }
        let sum: f64 = named.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::Configuration(format!(
                "health weights must sum to 1.0, but sum to {sum:.4}"
            )));
        }
        Ok(())
    }
}

/// Thresholds for issue detection rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectionThresholds {
    /// Low-conversion fires when the rate falls below target times this.
    #[serde(default = "default_low_conversion_ratio")]
    pub low_conversion_ratio: f64,
    /// Relative conversion gap above which severity is Critical.
    #[serde(default = "default_conversion_gap_critical")]
    pub conversion_gap_critical: f64,
    /// Relative conversion gap above which severity is High.
    #[serde(default = "default_conversion_gap_high")]
    pub conversion_gap_high: f64,
    #[serde(default = "default_high_drop_off")]
    pub high_drop_off_rate: f64,
    #[serde(default = "default_critical_drop_off")]
    pub critical_drop_off_rate: f64,
    /// Escalation spike fires above benchmark times this factor.
    #[serde(default = "default_escalation_spike_factor")]
    pub escalation_spike_factor: f64,
    #[serde(default = "default_technical_failure_rate")]
    pub technical_failure_rate: f64,
}

fn default_low_conversion_ratio() -> f64 {
    0.85
}
fn default_conversion_gap_critical() -> f64 {
    0.40
}
fn default_conversion_gap_high() -> f64 {
    0.25
}
fn default_high_drop_off() -> f64 {
    0.20
}
fn default_critical_drop_off() -> f64 {
    0.30
}
fn default_escalation_spike_factor() -> f64 {
    1.5
}
fn default_technical_failure_rate() -> f64 {
    0.05
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            low_conversion_ratio: default_low_conversion_ratio(),
            conversion_gap_critical: default_conversion_gap_critical(),
            conversion_gap_high: default_conversion_gap_high(),
            high_drop_off_rate: default_high_drop_off(),
            critical_drop_off_rate: default_critical_drop_off(),
            escalation_spike_factor: default_escalation_spike_factor(),
            technical_failure_rate: default_technical_failure_rate(),
        }
    }
}

/// Percentage-change thresholds for period-over-period alerts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Revenue decrease, in percent, that triggers an alert.
    #[serde(default = "default_alert_revenue_drop")]
    pub revenue_drop_pct: f64,
    #[serde(default = "default_alert_conversion_drop")]
    pub conversion_drop_pct: f64,
    #[serde(default = "default_alert_drop_off_spike")]
    pub drop_off_spike_pct: f64,
    #[serde(default = "default_alert_escalation_spike")]
    pub escalation_spike_pct: f64,
    /// Health score decrease, in points, that triggers an alert.
    #[serde(default = "default_alert_health_drop")]
    pub health_score_drop: f64,
    #[serde(default = "default_alert_leakage_increase")]
    pub leakage_increase_pct: f64,
}

fn default_alert_revenue_drop() -> f64 {
    10.0
}
fn default_alert_conversion_drop() -> f64 {
    15.0
}
fn default_alert_drop_off_spike() -> f64 {
    20.0
}
fn default_alert_escalation_spike() -> f64 {
    25.0
}
fn default_alert_health_drop() -> f64 {
    15.0
}
fn default_alert_leakage_increase() -> f64 {
    20.0
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            revenue_drop_pct: default_alert_revenue_drop(),
            conversion_drop_pct: default_alert_conversion_drop(),
            drop_off_spike_pct: default_alert_drop_off_spike(),
            escalation_spike_pct: default_alert_escalation_spike(),
            health_score_drop: default_alert_health_drop(),
            leakage_increase_pct: default_alert_leakage_increase(),
        }
    }
}

/// Recovery-rate estimates per leakage source, each in [0, 1].
///
/// These are tunable defaults, not fixed truths: technical failures are
/// mostly fixable, compliance-caused leakage is treated as largely
/// non-recoverable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecoveryRates {
    #[serde(default = "default_recovery_technical")]
    pub technical_failure: f64,
    #[serde(default = "default_recovery_compliance")]
    pub compliance_violation: f64,
    #[serde(default = "default_recovery_drop_off")]
    pub drop_off: f64,
    #[serde(default = "default_recovery_no_conversion")]
    pub no_conversion: f64,
    #[serde(default = "default_recovery_escalation")]
    pub escalation: f64,
    /// Fraction of drops assumed rescuable in the drop-off scenario.
    #[serde(default = "default_drop_off_reduction")]
    pub drop_off_reduction: f64,
    /// Fraction of escalations assumed deflectable in the escalation
    /// scenario.
    #[serde(default = "default_escalation_deflection")]
    pub escalation_deflection: f64,
}

fn default_recovery_technical() -> f64 {
    0.90
}
fn default_recovery_compliance() -> f64 {
    0.15
}
fn default_recovery_drop_off() -> f64 {
    0.60
}
fn default_recovery_no_conversion() -> f64 {
    0.50
}
fn default_recovery_escalation() -> f64 {
    0.40
}
fn default_drop_off_reduction() -> f64 {
    0.50
}
fn default_escalation_deflection() -> f64 {
    0.70
}

impl Default for RecoveryRates {
    fn default() -> Self {
        Self {
            technical_failure: default_recovery_technical(),
            compliance_violation: default_recovery_compliance(),
            drop_off: default_recovery_drop_off(),
            no_conversion: default_recovery_no_conversion(),
            escalation: default_recovery_escalation(),
            drop_off_reduction: default_drop_off_reduction(),
            escalation_deflection: default_escalation_deflection(),
        }
    }
}

impl RecoveryRates {
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("technical_failure", self.technical_failure),
            ("compliance_violation", self.compliance_violation),
            ("drop_off", self.drop_off),
            ("no_conversion", self.no_conversion),
            ("escalation", self.escalation),
            ("drop_off_reduction", self.drop_off_reduction),
            ("escalation_deflection", self.escalation_deflection),
        ];
        for (name, rate) in named {
            if !(0.0..=1.0).contains(&rate) {
                return Err(EngineError::Configuration(format!(
                    "recovery rate {name} must be between 0.0 and 1.0, got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// Complete tunable surface of the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub benchmarks: Benchmarks,
    pub weights: HealthWeights,
    pub detection: DetectionThresholds,
    pub alerts: AlertThresholds,
    pub recovery: RecoveryRates,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.recovery.validate()?;
        if self.benchmarks.conversion_rate <= 0.0 {
            return Err(EngineError::Configuration(
                "benchmark conversion rate must be positive".to_string(),
            ));
        }
        if self.benchmarks.escalation_rate <= 0.0 {
            return Err(EngineError::Configuration(
                "benchmark escalation rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load overrides from a TOML file, falling back to defaults for
    /// anything unspecified.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AnalysisConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Write;

    #[test]
    fn default_weights_sum_to_one() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut config = AnalysisConfig::default();
        config.weights.conversion = 0.50;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn rejects_out_of_range_recovery_rate() {
        let mut config = AnalysisConfig::default();
        config.recovery.drop_off = 1.3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_toml_overrides() {
        let toml_text = indoc! {r#"
            [detection]
            high_drop_off_rate = 0.25

            [recovery]
            drop_off = 0.70
        "#};
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_text.as_bytes()).unwrap();

        let config = AnalysisConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.detection.high_drop_off_rate, 0.25);
        assert_eq!(config.recovery.drop_off, 0.70);
        // Untouched sections keep their defaults.
        assert_eq!(config.weights.conversion, 0.35);
        assert_eq!(config.benchmarks.compliance_rate, 0.98);
    }
}
